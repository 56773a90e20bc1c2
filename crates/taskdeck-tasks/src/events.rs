//! Publish/subscribe channel for task changes, task logs and console logs

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::task::{TaskLog, TaskSnapshot};

/// Severity of a console log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLogKind {
    Info,
    Warn,
    Error,
    Done,
}

/// Entry of the host's console log panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLog {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ConsoleLogKind,
}

impl ConsoleLog {
    pub fn new(message: impl Into<String>, kind: ConsoleLogKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

/// Everything published to clients
#[derive(Debug, Clone)]
pub enum ServerEvent {
    TaskChanged(TaskSnapshot),
    TaskLogAdded(TaskLog),
    ConsoleLog(ConsoleLog),
}

/// Broadcast bus shared by the engine
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(2048)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers; without subscribers the event is dropped
    pub fn publish(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

type EventFilter<T> = Box<dyn Fn(ServerEvent) -> Option<T> + Send + Sync>;

/// A filtered view of the bus
pub struct Subscription<T> {
    rx: broadcast::Receiver<ServerEvent>,
    filter: EventFilter<T>,
}

impl<T> Subscription<T> {
    pub fn new<F>(rx: broadcast::Receiver<ServerEvent>, filter: F) -> Self
    where
        F: Fn(ServerEvent) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            rx,
            filter: Box::new(filter),
        }
    }

    /// Next matching event, `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if let Some(item) = (self.filter)(event) {
                        return Some(item);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Task changes of every task
pub fn task_changed(bus: &EventBus) -> Subscription<TaskSnapshot> {
    Subscription::new(bus.subscribe(), |event| match event {
        ServerEvent::TaskChanged(task) => Some(task),
        _ => None,
    })
}

/// Log entries of one task
pub fn task_logs(bus: &EventBus, task_id: &str) -> Subscription<TaskLog> {
    let task_id = task_id.to_string();
    Subscription::new(bus.subscribe(), move |event| match event {
        ServerEvent::TaskLogAdded(log) if log.task_id == task_id => Some(log),
        _ => None,
    })
}

/// Console log entries
pub fn console(bus: &EventBus) -> Subscription<ConsoleLog> {
    Subscription::new(bus.subscribe(), |event| match event {
        ServerEvent::ConsoleLog(log) => Some(log),
        _ => None,
    })
}
