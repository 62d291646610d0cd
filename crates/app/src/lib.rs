//! The image-generation console: session, resources, generation, history,
//! settings and backend administration behind one [`Console`] object.
//!
//! Front ends drive the console through its async methods and render
//! whatever arrives on [`Console::bus`].

pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod loading;
pub mod resources;
pub mod session;
pub mod settings;

pub use config::ConsoleConfig;
pub use console::{Console, GenerationOutcome, Replay};
pub use error::{AuthError, ConsoleError, ConsoleResult};
