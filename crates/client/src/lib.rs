//! HTTP access to the image-generation backend.
//!
//! [`Transport`] is the single request wrapper: bearer credentials, JSON or
//! multipart bodies, and uniform handling of expired sessions.
//! [`ConsoleApi`] layers one typed method per REST endpoint on top of it.

pub mod api;
pub mod error;
pub mod transport;

pub use api::{AuthReply, ConsoleApi};
pub use error::ClientError;
pub use transport::{Body, CredentialSink, JsonReply, MultipartForm, Transport};
pub use reqwest::Method;
