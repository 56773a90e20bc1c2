//! Task state machine
//!
//! ```text
//! idle ─┐
//! done ─┼─▶ running ─▶ done | error | terminated
//! error ┤
//! terminated
//! ```
//!
//! Nothing re-enters `idle`. Side effects of a transition (badges, history,
//! change notification) run outside the task lock and never fail it.

use tracing::{debug, warn};

use crate::events::ServerEvent;
use crate::manager::Shared;
use crate::notify::{badge_for, badge_id};
use crate::registry::TaskEntry;
use crate::task::TaskStatus;

/// Whether `from -> to` is an edge of the state machine
pub fn transition_allowed(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
        (from, to),
        (Idle | Done | Error | Terminated, Running) | (Running, Done | Error | Terminated)
    )
}

/// Move `entry` to `to`.
///
/// With `generation` set, the transition only applies to that run; exit
/// events of an older run are dropped. Returns whether the status changed.
pub(crate) async fn update_status(
    shared: &Shared,
    entry: &TaskEntry,
    to: TaskStatus,
    generation: Option<u64>,
) -> bool {
    let (from, run_id) = {
        let mut runtime = entry.runtime();
        if generation.map_or(false, |g| g != runtime.generation) {
            debug!(task = entry.key(), "ignoring status change of a previous run");
            return false;
        }
        let from = runtime.status;
        if from == to || !transition_allowed(from, to) {
            return false;
        }
        runtime.status = to;
        (from, runtime.run_id.clone())
    };
    debug!(task = entry.key(), %from, %to, "task status changed");

    update_badges(shared, from, to);

    if entry.descriptor().need_history {
        if let Err(e) = shared
            .history
            .update_status(entry.key(), run_id.as_deref(), to)
            .await
        {
            warn!(task = entry.key(), error = %e, "failed to update history");
        }
    }

    shared.events.publish(ServerEvent::TaskChanged(entry.snapshot()));
    true
}

fn update_badges(shared: &Shared, from: TaskStatus, to: TaskStatus) {
    let view_id = shared.config.view_id.as_str();
    if let Some(badge) = badge_for(to) {
        if let Err(e) = shared.badges.add_badge(view_id, badge) {
            warn!(view = view_id, error = %e, "failed to add badge");
        }
    }
    if let Some(id) = badge_id(from) {
        if let Err(e) = shared.badges.remove_badge(view_id, id) {
            warn!(view = view_id, error = %e, "failed to remove badge");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryRecord;
    use crate::notify::{BADGE_DONE, BADGE_RUNNING};
    use crate::store::{TaskRecord, TaskStore};
    use crate::task::TaskDescriptor;
    use crate::test_support::Harness;
    use TaskStatus::*;

    const ALL: [TaskStatus; 5] = [Idle, Running, Done, Error, Terminated];

    #[test]
    fn test_running_only_reaches_terminal_states() {
        let reachable: Vec<_> = ALL
            .iter()
            .copied()
            .filter(|to| transition_allowed(Running, *to))
            .collect();
        assert_eq!(reachable, vec![Done, Error, Terminated]);
    }

    #[test]
    fn test_idle_is_never_reentered() {
        for from in ALL {
            assert!(!transition_allowed(from, Idle));
        }
    }

    #[test]
    fn test_finished_tasks_can_rerun() {
        for from in [Idle, Done, Error, Terminated] {
            assert!(transition_allowed(from, Running));
            assert!(!transition_allowed(from, Done));
        }
    }

    #[tokio::test]
    async fn test_update_status_side_effects() {
        let harness = Harness::new();
        let entry = harness.entry(TaskDescriptor::new("deploy", "true").with_need_history(true));
        harness
            .store
            .upsert(TaskRecord::new("web:deploy").with_history(vec![HistoryRecord::new("r1")]))
            .await
            .unwrap();
        entry.runtime().run_id = Some("r1".to_string());
        let mut changes = harness.manager.subscribe_task_changed();

        assert!(update_status(&harness.shared(), &entry, Running, None).await);
        assert!(update_status(&harness.shared(), &entry, Done, None).await);

        assert_eq!(
            harness.notifier.badges(),
            vec![
                format!("+{}", BADGE_RUNNING),
                format!("+{}", BADGE_DONE),
                format!("-{}", BADGE_RUNNING),
            ]
        );
        let record = harness.store.get("web:deploy").await.unwrap().unwrap();
        assert_eq!(record.history.unwrap()[0].status, Some(Done));
        assert_eq!(changes.recv().await.unwrap().status, Running);
        assert_eq!(changes.recv().await.unwrap().status, Done);
    }

    #[tokio::test]
    async fn test_same_or_invalid_transition_is_noop() {
        let harness = Harness::new();
        let entry = harness.entry(TaskDescriptor::new("build", "true"));

        assert!(!update_status(&harness.shared(), &entry, Done, None).await);
        assert!(update_status(&harness.shared(), &entry, Running, None).await);
        assert!(!update_status(&harness.shared(), &entry, Running, None).await);
        assert!(harness.notifier.badges().len() == 1);
    }

    #[tokio::test]
    async fn test_stale_generation_is_dropped() {
        let harness = Harness::new();
        let entry = harness.entry(TaskDescriptor::new("build", "true"));
        entry.runtime().generation = 2;

        assert!(update_status(&harness.shared(), &entry, Running, Some(2)).await);
        assert!(!update_status(&harness.shared(), &entry, Error, Some(1)).await);
        assert_eq!(entry.status(), Running);
    }
}
