//! Tracker lifecycle events and sinks.
//!
//! Every state change a tracker makes is described by a [`TrackerEvent`] and
//! handed to a pluggable [`EventSink`]: registration, settlement,
//! cancellation, timer scheduling and clearing, and teardown. Sinks must
//! never fail; the tracker calls [`EventSink::try_emit`] from its synchronous
//! paths.

use crate::track::{Handle, TimerId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, Level};

/// A lifecycle event emitted by a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerEvent {
    /// An operation was registered and inserted into the store.
    OperationRegistered {
        /// The handle assigned to the operation.
        handle: Handle,
    },
    /// A tracked operation settled and removed its own entry.
    OperationSettled {
        /// The handle of the settled operation.
        handle: Handle,
    },
    /// An outstanding operation was cancelled, individually or by teardown.
    OperationCancelled {
        /// The handle of the cancelled operation.
        handle: Handle,
    },
    /// A timer was scheduled.
    TimerScheduled {
        /// The id assigned to the timer.
        timer: TimerId,
    },
    /// A pending timer was cleared before it fired.
    TimerCleared {
        /// The id of the cleared timer.
        timer: TimerId,
    },
    /// The tracker was torn down.
    TrackerTeardown {
        /// How many outstanding operations the teardown cancelled.
        cancelled: usize,
        /// How many pending timers the teardown cleared.
        timers_cleared: usize,
    },
}

impl TrackerEvent {
    /// Returns the dotted event name, e.g. `operation.registered`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OperationRegistered { .. } => "operation.registered",
            Self::OperationSettled { .. } => "operation.settled",
            Self::OperationCancelled { .. } => "operation.cancelled",
            Self::TimerScheduled { .. } => "timer.scheduled",
            Self::TimerCleared { .. } => "timer.cleared",
            Self::TrackerTeardown { .. } => "tracker.teardown",
        }
    }

    /// Returns the event payload as JSON.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match *self {
            Self::OperationRegistered { handle }
            | Self::OperationSettled { handle }
            | Self::OperationCancelled { handle } => {
                serde_json::json!({ "handle": handle.value() })
            }
            Self::TimerScheduled { timer } | Self::TimerCleared { timer } => {
                serde_json::json!({ "timer": timer.value() })
            }
            Self::TrackerTeardown {
                cancelled,
                timers_cleared,
            } => {
                serde_json::json!({
                    "cancelled": cancelled,
                    "timers_cleared": timers_cleared,
                })
            }
        }
    }

    /// Returns the handle this event concerns, for operation events.
    #[must_use]
    pub fn handle(&self) -> Option<Handle> {
        match *self {
            Self::OperationRegistered { handle }
            | Self::OperationSettled { handle }
            | Self::OperationCancelled { handle } => Some(handle),
            _ => None,
        }
    }
}

/// Trait for sinks receiving tracker lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Receives an event asynchronously.
    async fn emit(&self, event: TrackerEvent);

    /// Receives an event without blocking.
    ///
    /// Must never fail; the tracker calls this from registration,
    /// cancellation, and teardown.
    fn try_emit(&self, event: TrackerEvent);
}

/// A sink that discards every event.
///
/// The default when a tracker is built without a sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: TrackerEvent) {}

    fn try_emit(&self, _event: TrackerEvent) {}
}

/// A sink that logs every event through the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink emitting at the given level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, event: TrackerEvent) {
        if self.level == Level::DEBUG {
            debug!(event = event.kind(), payload = %event.payload(), "tracker event");
        } else {
            info!(event = event.kind(), payload = %event.payload(), "tracker event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: TrackerEvent) {
        self.log(event);
    }

    fn try_emit(&self, event: TrackerEvent) {
        self.log(event);
    }
}

/// A sink that records every event, for test assertions.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<TrackerEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.read().clone()
    }

    /// Returns how many recorded events have the given kind.
    #[must_use]
    pub fn count_of(&self, kind: &str) -> usize {
        self.events
            .read()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: TrackerEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: TrackerEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registered(value: u64) -> TrackerEvent {
        TrackerEvent::OperationRegistered {
            handle: Handle(value),
        }
    }

    #[test]
    fn test_event_kinds_are_dotted_names() {
        assert_eq!(registered(0).kind(), "operation.registered");
        assert_eq!(
            TrackerEvent::TrackerTeardown {
                cancelled: 2,
                timers_cleared: 1,
            }
            .kind(),
            "tracker.teardown"
        );
        assert_eq!(
            TrackerEvent::TimerCleared { timer: TimerId(0) }.kind(),
            "timer.cleared"
        );
    }

    #[test]
    fn test_event_payloads() {
        assert_eq!(
            TrackerEvent::OperationCancelled { handle: Handle(3) }.payload(),
            serde_json::json!({ "handle": 3 })
        );
        assert_eq!(
            TrackerEvent::TrackerTeardown {
                cancelled: 2,
                timers_cleared: 1,
            }
            .payload(),
            serde_json::json!({ "cancelled": 2, "timers_cleared": 1 })
        );
    }

    #[test]
    fn test_event_handle_accessor() {
        assert_eq!(
            TrackerEvent::OperationSettled { handle: Handle(5) }.handle(),
            Some(Handle(5))
        );
        assert_eq!(
            TrackerEvent::TimerScheduled { timer: TimerId(0) }.handle(),
            None
        );
    }

    #[test]
    fn test_event_serde_roundtrip() {
        let event = TrackerEvent::OperationSettled { handle: Handle(9) };
        let json = serde_json::to_string(&event).unwrap();
        let back: TrackerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_noop_sink_discards() {
        NoOpEventSink.try_emit(registered(0));
    }

    #[tokio::test]
    async fn test_collecting_sink_records_in_order() {
        let sink = CollectingEventSink::new();
        sink.try_emit(registered(0));
        sink.emit(TrackerEvent::OperationSettled { handle: Handle(0) })
            .await;

        assert_eq!(
            sink.events(),
            vec![
                registered(0),
                TrackerEvent::OperationSettled { handle: Handle(0) },
            ]
        );
    }

    #[test]
    fn test_collecting_sink_count_of() {
        let sink = CollectingEventSink::new();
        sink.try_emit(registered(0));
        sink.try_emit(registered(1));
        sink.try_emit(TrackerEvent::OperationCancelled { handle: Handle(0) });

        assert_eq!(sink.count_of("operation.registered"), 2);
        assert_eq!(sink.count_of("operation.cancelled"), 1);
        assert_eq!(sink.count_of("operation.settled"), 0);
    }

    #[test]
    fn test_collecting_sink_clear() {
        let sink = CollectingEventSink::new();
        sink.try_emit(registered(0));
        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_logging_sink_levels() {
        LoggingEventSink::debug().try_emit(registered(0));
        LoggingEventSink::default().try_emit(registered(0));
    }
}
