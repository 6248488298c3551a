//! Outbound request construction.
//!
//! # Responsibilities
//! - Point the request at the matched rule's backend
//! - Render the backend path template with captured parameters
//! - Strip hop-by-hop headers, add X-Forwarded-*
//!
//! # Design Decisions
//! - The result is an explicit [`Outbound`]: a request ready to send or a
//!   terminal error the transport must honor without dialing
//! - The inbound query string is always preserved
//! - `Host` is dropped so the upstream client derives it from the target

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Request, Uri};

use crate::routing::MatchResult;

/// Why an outbound request could not be built.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("backend path of rule '{rule}' needs parameter '{param}'")]
    MissingParam { rule: String, param: String },
    #[error("invalid upstream uri for rule '{rule}': {source}")]
    InvalidUri {
        rule: String,
        #[source]
        source: axum::http::Error,
    },
}

/// Input of the transport: what the rewrite stage produced.
#[derive(Debug)]
pub enum Outbound {
    /// A request addressed to the backend.
    Ready(Request<Body>),
    /// The request cannot be routed; no connection may be attempted.
    Unroutable(ForwardError),
}

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

static HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
];

/// Rewrite `request` for the backend of `matched`.
pub fn direct(mut request: Request<Body>, matched: &MatchResult) -> Outbound {
    let rule = &matched.rule;

    let path = match &rule.backend.path {
        Some(template) => match template.render(&matched.params) {
            Ok(path) => path,
            Err(param) => {
                return Outbound::Unroutable(ForwardError::MissingParam {
                    rule: rule.name.clone(),
                    param,
                })
            }
        },
        None => request.uri().path().to_string(),
    };
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    let uri = match Uri::builder()
        .scheme(rule.backend.scheme.clone())
        .authority(rule.backend.authority.clone())
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(source) => {
            return Outbound::Unroutable(ForwardError::InvalidUri {
                rule: rule.name.clone(),
                source,
            })
        }
    };

    // HTTP/2 carries the host in the URI authority, HTTP/1.1 in Host; keep the port either way.
    let original_host = match request.uri().authority() {
        Some(authority) => HeaderValue::from_str(authority.as_str()).ok(),
        None => request.headers().get(header::HOST).cloned(),
    };

    *request.uri_mut() = uri;
    let headers = request.headers_mut();
    strip_hop_by_hop(headers);
    headers.remove(header::HOST);
    if let Some(host) = original_host {
        headers.insert(X_FORWARDED_HOST, host);
    }
    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));

    Outbound::Ready(request)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by Connection are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }

    // gRPC needs `te: trailers`; every other TE value is hop-by-hop.
    let keep_te = headers
        .get(header::TE)
        .map(|v| v.as_bytes().eq_ignore_ascii_case(b"trailers"))
        .unwrap_or(false);
    if !keep_te {
        headers.remove(header::TE);
    }
}
