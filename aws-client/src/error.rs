/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The closed error surface of the executor.
//!
//! Every failure mode of a call collapses into one [`SdkError`] carrying
//! the client-assigned request id (when one was assigned before the
//! failure).

use crate::credentials::CredentialsError;
use aws_client_http::middleware::MiddlewareError;
use aws_client_http::BuildError;
use aws_client_sigv4::http_request::SigningError;
use http::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed error for transport and decode failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed call.
#[derive(Debug)]
pub struct SdkError {
    request_id: Option<u64>,
    kind: SdkErrorKind,
}

impl SdkError {
    pub(crate) fn new(kind: impl Into<SdkErrorKind>) -> Self {
        Self {
            request_id: None,
            kind: kind.into(),
        }
    }

    pub(crate) fn with_request_id(mut self, request_id: u64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub(crate) fn pagination_limit(pages: usize) -> Self {
        Self::new(SdkErrorKind::PaginationLimit { pages })
    }

    /// The client-assigned request id, when the failure happened after
    /// assignment.
    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    /// What went wrong.
    pub fn kind(&self) -> &SdkErrorKind {
        &self.kind
    }

    /// The service error code, for HTTP-level failures that carried one.
    pub fn code(&self) -> Option<&str> {
        match &self.kind {
            SdkErrorKind::Throttle { code, .. }
            | SdkErrorKind::Http { code, .. }
            | SdkErrorKind::NotFound { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The HTTP status, for failures that reached the service.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            SdkErrorKind::Throttle { status, .. } | SdkErrorKind::Http { status, .. } => {
                Some(*status)
            }
            SdkErrorKind::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }

    /// True for throttling failures.
    pub fn is_throttle(&self) -> bool {
        matches!(self.kind, SdkErrorKind::Throttle { .. })
    }

    /// True when the call was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, SdkErrorKind::Cancelled)
    }
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.request_id {
            Some(request_id) => write!(f, "request {} failed: {}", request_id, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for SdkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<SdkErrorKind> for SdkError {
    fn from(kind: SdkErrorKind) -> Self {
        SdkError::new(kind)
    }
}

impl From<BuildError> for SdkError {
    fn from(err: BuildError) -> Self {
        SdkError::new(SdkErrorKind::from(err))
    }
}

impl From<MiddlewareError> for SdkError {
    fn from(err: MiddlewareError) -> Self {
        SdkError::new(SdkErrorKind::from(err))
    }
}

impl From<SigningError> for SdkError {
    fn from(err: SigningError) -> Self {
        SdkError::new(SdkErrorKind::from(err))
    }
}

/// The failure taxonomy of one call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SdkErrorKind {
    /// Request construction failed: invalid URL, validation, unencodable
    /// member, or missing content length.
    #[error(transparent)]
    Construction(#[from] BuildError),

    /// A middleware aborted the call.
    #[error(transparent)]
    Middleware(#[from] MiddlewareError),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    /// The credential provider produced no credentials. Not retried here;
    /// providers own their own retry behavior.
    #[error("no credentials available: {0}")]
    CredentialsUnavailable(#[source] CredentialsError),

    /// The transport failed to complete the exchange.
    #[error("dispatch failed: {source}")]
    Transport {
        /// Whether the executor may retry the request.
        retryable: bool,
        /// The underlying transport failure.
        #[source]
        source: BoxError,
    },

    /// The service asked us to slow down.
    #[error("throttled by the service (status {status}{})", fmt_code(.code))]
    Throttle {
        /// The response status.
        status: StatusCode,
        /// The throttling error code, when one was returned.
        code: Option<String>,
        /// The service message.
        message: Option<String>,
        /// Server-provided delay before the next attempt.
        retry_after: Option<Duration>,
    },

    /// The requested resource does not exist.
    #[error("not found{}", fmt_code(.code))]
    NotFound {
        /// The error code, when one was returned.
        code: Option<String>,
        /// The service message.
        message: Option<String>,
        /// The request id the service assigned.
        service_request_id: Option<String>,
    },

    /// The service returned an error response.
    #[error("HTTP {status}{}: {}", fmt_code(.code), .message.as_deref().unwrap_or("(no message)"))]
    Http {
        /// The response status.
        status: StatusCode,
        /// The error code, when one was returned.
        code: Option<String>,
        /// The service message.
        message: Option<String>,
        /// The request id the service assigned.
        service_request_id: Option<String>,
    },

    /// The response body failed to decode.
    #[error("failed to decode the response: {0}")]
    Decode(#[source] BoxError),

    /// The call was cancelled through its cancellation token.
    #[error("the call was cancelled")]
    Cancelled,

    /// The client was shut down before the call started.
    #[error("the client is already shut down")]
    AlreadyShutdown,

    /// The paginator hit its safety bound.
    #[error("pagination did not terminate within {pages} pages")]
    PaginationLimit {
        /// The configured page bound.
        pages: usize,
    },
}

fn fmt_code(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(", code {}", code),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{SdkError, SdkErrorKind};
    use http::StatusCode;

    #[test]
    fn display_carries_the_request_id() {
        let err = SdkError::new(SdkErrorKind::Http {
            status: StatusCode::BAD_REQUEST,
            code: Some("InvalidSignature".to_string()),
            message: Some("nope".to_string()),
            service_request_id: None,
        })
        .with_request_id(17);
        assert_eq!(
            err.to_string(),
            "request 17 failed: HTTP 400 Bad Request, code InvalidSignature: nope"
        );
        assert_eq!(err.code(), Some("InvalidSignature"));
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }
}
