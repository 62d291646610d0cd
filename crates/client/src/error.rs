/// Errors from the transport and API layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with something that is not JSON.
    #[error("Unexpected non-JSON response ({status}): {body}")]
    NonJson {
        /// HTTP status code.
        status: u16,
        /// Leading part of the raw body, for debugging.
        body: String,
    },

    /// A JSON body did not have the expected shape.
    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend refused the request and explained why.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },
}
