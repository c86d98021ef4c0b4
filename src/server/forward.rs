//! Configurable upstream forwarding
//!
//! One forwarding component parameterized by upstream URL, credential
//! source, and header set, instead of per-endpoint near-duplicates.

use axum::http::StatusCode;
use tracing::debug;

use crate::error::{ApexError, ApexResult};

/// A relayed upstream response: status and body, verbatim
#[derive(Debug)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Where one proxied endpoint forwards to
#[derive(Debug, Clone)]
pub struct ForwardTarget {
    /// Upstream base URL
    pub upstream: String,
    /// Credential appended as a query parameter, when required
    pub credential_param: Option<(String, String)>,
    /// Headers attached to every upstream request
    pub headers: Vec<(String, String)>,
}

impl ForwardTarget {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into(),
            credential_param: None,
            headers: Vec::new(),
        }
    }

    pub fn with_credential(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.credential_param = Some((param.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Forward a GET with the given query pairs and relay status and body
pub async fn forward(
    http: &reqwest::Client,
    target: &ForwardTarget,
    query: &[(String, String)],
) -> ApexResult<ForwardedResponse> {
    let mut request = http.get(&target.upstream);
    for (name, value) in &target.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    let mut pairs: Vec<(String, String)> = Vec::new();
    if let Some((name, value)) = &target.credential_param {
        pairs.push((name.clone(), value.clone()));
    }
    pairs.extend_from_slice(query);

    let response = request
        .query(&pairs)
        .send()
        .await
        .map_err(|e| ApexError::UpstreamFailed {
            message: format!("{}: {}", target.upstream, e),
        })?;

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = response
        .bytes()
        .await
        .map_err(|e| ApexError::UpstreamFailed {
            message: format!("{}: {}", target.upstream, e),
        })?
        .to_vec();

    debug!("Forwarded to {} -> {}", target.upstream, status);
    Ok(ForwardedResponse { status, body })
}
