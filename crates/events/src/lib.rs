//! Console notification bus.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ConsoleEvent`] covers everything a front end reacts to: toasts, view
//!   switches, the loading indicator, progress and refreshed data.

pub mod bus;

pub use bus::{ConsoleEvent, EventBus, Toast, ToastLevel, View};
