//! View badges and desktop notifications

use serde::{Deserialize, Serialize};

use taskdeck_core::Result;

use crate::task::TaskStatus;

/// Severity of a view badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeKind {
    Info,
    Success,
    Error,
}

/// A badge attached to a dashboard view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BadgeKind,
    pub label: String,
    /// Higher priorities are shown first
    pub priority: u8,
    pub hidden: bool,
}

pub const BADGE_RUNNING: &str = "task-running";
pub const BADGE_ERROR: &str = "task-error";
pub const BADGE_DONE: &str = "task-done";

/// Id of the badge that represents `status`, if any
pub fn badge_id(status: TaskStatus) -> Option<&'static str> {
    match status {
        TaskStatus::Running => Some(BADGE_RUNNING),
        TaskStatus::Error => Some(BADGE_ERROR),
        TaskStatus::Done => Some(BADGE_DONE),
        TaskStatus::Idle | TaskStatus::Terminated => None,
    }
}

/// Badge added when a task enters `status`
pub fn badge_for(status: TaskStatus) -> Option<Badge> {
    let (kind, priority, hidden) = match status {
        TaskStatus::Error => (BadgeKind::Error, 3, false),
        TaskStatus::Running => (BadgeKind::Info, 2, false),
        TaskStatus::Done => (BadgeKind::Success, 1, true),
        TaskStatus::Idle | TaskStatus::Terminated => return None,
    };
    let id = badge_id(status)?;
    Some(Badge {
        id: id.to_string(),
        kind,
        label: format!("tasks.{}", status),
        priority,
        hidden,
    })
}

/// Receives badge changes for dashboard views
pub trait BadgeNotifier: Send + Sync {
    fn add_badge(&self, view_id: &str, badge: Badge) -> Result<()>;

    fn remove_badge(&self, view_id: &str, badge_id: &str) -> Result<()>;
}

/// Icon shown next to a desktop notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationIcon {
    Done,
    Error,
    Info,
}

/// A user-facing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub icon: NotificationIcon,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, icon: NotificationIcon) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            icon,
        }
    }
}

/// Shows desktop notifications
pub trait DesktopNotifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Notifier that only logs through tracing
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl BadgeNotifier for TracingNotifier {
    fn add_badge(&self, view_id: &str, badge: Badge) -> Result<()> {
        tracing::debug!(view = view_id, badge = %badge.id, priority = badge.priority, "badge added");
        Ok(())
    }

    fn remove_badge(&self, view_id: &str, badge_id: &str) -> Result<()> {
        tracing::debug!(view = view_id, badge = badge_id, "badge removed");
        Ok(())
    }
}

impl DesktopNotifier for TracingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        match notification.icon {
            NotificationIcon::Error => {
                tracing::error!("{}: {}", notification.title, notification.message)
            }
            _ => tracing::info!("{}: {}", notification.title, notification.message),
        }
        Ok(())
    }
}
