/// Errors from provider clients.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The provider accepted the HTTP exchange but rejected the request in
    /// its payload.
    #[error("provider rejected request: {0}")]
    Rejected(String),

    /// The response body did not have the expected shape.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// No client is registered under this provider identifier.
    #[error("unsupported video provider: {0}")]
    UnknownProvider(String),
}
