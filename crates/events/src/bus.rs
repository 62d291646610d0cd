//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the session, the
//! generation flow and whichever front end renders the console.

use aimg_core::request::GenerationMode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// A transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Toast {
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Which top-level view is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Login,
    App,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleEvent {
    Toast(Toast),
    ViewChanged {
        view: View,
    },
    /// `active` is true while at least one generation is in flight.
    LoadingChanged {
        active: bool,
    },
    /// Estimated progress of the generation identified by `request`.
    Progress {
        request: u64,
        percent: f64,
    },
    CatalogRefreshed,
    HistoryChanged {
        len: usize,
    },
    GenerationCompleted {
        request: u64,
        mode: GenerationMode,
        images: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`ConsoleEvent`].
///
/// ```rust
/// use aimg_events::{ConsoleEvent, EventBus, ToastLevel};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.toast(ToastLevel::Info, "hello");
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConsoleEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Having no subscribers is normal (a headless run), so send errors are
    /// ignored.
    pub fn publish(&self, event: ConsoleEvent) {
        tracing::trace!(?event, "Publishing console event");
        let _ = self.sender.send(event);
    }

    /// Publish a [`ConsoleEvent::Toast`].
    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.publish(ConsoleEvent::Toast(Toast::new(level, message)));
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
