//! HTTP transport seam for model backends.
//!
//! Backends build a JSON body and hand it to a [`Transport`], which performs
//! one blocking POST and returns the raw response body. Status codes are not
//! checked here: providers report errors in the body and the backend decides
//! whether its shape is usable.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, error, trace};

use super::DispatchError;

pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `url`, with `Authorization: Bearer` when
    /// `bearer` is set. Returns the response body text.
    fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<String, DispatchError>;
}

/// `reqwest` blocking client with an explicit per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout_seconds: u64) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| DispatchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<String, DispatchError> {
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(body)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(%url, payload = %json, "full request payload");
        }

        let mut req = self.client.post(url).json(body);
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }

        let response = req.send().map_err(|e| {
            error!(%url, error = %e, timeout = e.is_timeout(), "HTTP request failed (transport)");
            DispatchError::Transport(e.to_string())
        })?;

        let status = response.status();
        debug!(%url, %status, "received response");

        let text = response.text().map_err(|e| {
            error!(%url, error = %e, "failed to read response body");
            DispatchError::Transport(format!("failed to read response body: {e}"))
        })?;
        trace!(%status, body = %text, "full response body");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_connection_is_transport_error() {
        let t = HttpTransport::new(2).unwrap();
        // Port 9 (discard) is closed on test hosts; the loopback connect fails fast.
        let err = t
            .post_json("http://127.0.0.1:9/api/generate", None, &serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
    }

    #[test]
    fn unparseable_url_is_transport_error() {
        let t = HttpTransport::new(1).unwrap();
        let err = t.post_json("not a url", None, &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
    }
}
