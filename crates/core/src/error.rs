/// Validation errors raised on the client before any network call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("An input image is required for image-to-image generation")]
    EmptyImage,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
