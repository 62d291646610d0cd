//! Domain models and pure logic of the image-generation console.
//!
//! Nothing in this crate performs I/O:
//!
//! - [`request`] builds generation requests from form state.
//! - [`catalog`] projects the server status into selector options.
//! - [`history`] keeps the bounded, newest-first generation history.
//! - [`render`] turns models into plain-text views.

pub mod backend_config;
pub mod catalog;
pub mod error;
pub mod history;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod request;
pub mod result;
pub mod seed;
pub mod session;
pub mod settings;
pub mod types;
pub mod workflow;

pub use error::CoreError;
