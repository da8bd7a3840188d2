//! Structured errors for the proxy front end and their HTTP rendering.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use shellcache_core::Error;

/// Header carrying the error tag on responses the proxy produces itself.
pub const ERROR_HEADER: &str = "x-shellcache-error";

/// Errors raised before a request reaches the router.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The request target could not be mapped onto the origin.
    #[error("INVALID_TARGET: {0}")]
    InvalidTarget(String),

    /// The request body could not be read.
    #[error("BODY_READ_FAILED: {0}")]
    BodyRead(String),

    /// The request body exceeded the configured limit.
    #[error("BODY_TOO_LARGE: request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    /// The task serving the request panicked.
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget(_) | ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Empty-bodied response with the error tag in a header.
///
/// The page sees a failed fetch; the header tells an operator why.
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    let tag = message.split(':').next().unwrap_or(message);
    if let Ok(value) = HeaderValue::from_str(tag) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(ERROR_HEADER), value);
    }
    response
}

/// Response for a request that ended in a routing or network error.
pub fn failed_fetch(err: &Error) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    error_response(status, &err.to_string())
}

impl From<&ProxyError> for Response<Full<Bytes>> {
    fn from(err: &ProxyError) -> Self {
        error_response(err.status(), &err.to_string())
    }
}
