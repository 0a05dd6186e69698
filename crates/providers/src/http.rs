//! Shared HTTP plumbing for provider clients.

use crate::error::ProviderError;

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`ProviderError::Api`] containing the status
/// and body text on failure.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
pub async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let response = ensure_success(response).await?;
    let text = response.text().await?;
    serde_json::from_str::<T>(&text)
        .map_err(|e| ProviderError::InvalidResponse(format!("{e}: {text}")))
}

/// Clamp an optional provider-reported float duration to whole seconds.
pub fn whole_seconds(secs: Option<f64>) -> Option<i32> {
    secs.filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| s.round() as i32)
}
