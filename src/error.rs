//! Gateway error taxonomy and its mapping to client-visible statuses.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::hooks::HookError;
use crate::http::director::ForwardError;
use crate::routing::MatchError;

/// Every way a proxied request can fail.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No rule accepts the request.
    #[error("no rule matched {method} {path}")]
    RuleNotMatched { method: Method, path: String },
    /// The matcher failed internally.
    #[error("rule matcher fault: {0}")]
    MatcherFault(String),
    /// The inbound body could not be buffered.
    #[error("failed to buffer request body: {0}")]
    BodyEnrichmentFailed(#[source] axum::Error),
    /// A handler ran without the enrichment middleware in front of it.
    #[error("request context missing: {0}")]
    MissingContext(&'static str),
    /// The director could not build an outbound request.
    #[error("request is not routable: {0}")]
    Preflight(#[from] ForwardError),
    /// The round trip failed at the network or protocol level.
    #[error("upstream round trip failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    /// A response hook rejected the response.
    #[error(transparent)]
    Hook(#[from] HookError),
}

impl From<MatchError> for GatewayError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::NotFound { method, path } => GatewayError::RuleNotMatched { method, path },
            MatchError::Fault(message) => GatewayError::MatcherFault(message),
        }
    }
}

impl GatewayError {
    /// Status returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RuleNotMatched { .. } => StatusCode::BAD_REQUEST,
            GatewayError::MatcherFault(_)
            | GatewayError::BodyEnrichmentFailed(_)
            | GatewayError::MissingContext(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Transport(e) if is_timeout(e) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Preflight(_) | GatewayError::Transport(_) | GatewayError::Hook(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Body text returned to the client. Internal details stay in the logs.
    fn public_message(&self) -> &'static str {
        match self {
            GatewayError::RuleNotMatched { .. } => "No matching rule found",
            GatewayError::MatcherFault(_) | GatewayError::MissingContext(_) => {
                "Internal gateway error"
            }
            GatewayError::BodyEnrichmentFailed(_) => "Failed to read request body",
            GatewayError::Preflight(_) => "Request is not routable",
            GatewayError::Transport(_) => "Upstream request failed",
            GatewayError::Hook(_) => "Upstream response rejected",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}

/// True when the failure was a dial or I/O timeout.
fn is_timeout(err: &hyper_util::client::legacy::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = e.source();
    }
    false
}
