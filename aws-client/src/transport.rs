/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The injected transport seam, and a canned-exchange test transport.
//!
//! Connection pooling, TLS, and HTTP version negotiation are the
//! transport's business; the executor only needs `dispatch`.

use async_trait::async_trait;
use aws_client_http::{HttpResponse, SdkBody};
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Boxed error for transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A transport-level failure.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct TransportError {
    /// Whether the request may be replayed (connection-level failures
    /// before any response byte arrived).
    pub retryable: bool,
    /// The underlying failure.
    #[source]
    pub source: BoxError,
}

impl TransportError {
    /// A retryable connection-level failure.
    pub fn retryable(source: impl Into<BoxError>) -> Self {
        Self {
            retryable: true,
            source: source.into(),
        }
    }

    /// A failure that must not be retried.
    pub fn fatal(source: impl Into<BoxError>) -> Self {
        Self {
            retryable: false,
            source: source.into(),
        }
    }
}

/// Dispatches one HTTP exchange.
///
/// Implementations must support concurrent calls. In-flight requests are
/// aborted by dropping the returned future.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and resolves with the response, observing `timeout`
    /// for the whole exchange.
    async fn dispatch(
        &self,
        request: http::Request<SdkBody>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// A request captured by [`TestConnection`], with its body realized.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    /// The request method.
    pub method: Method,
    /// The full request URI.
    pub uri: Uri,
    /// The request headers.
    pub headers: HeaderMap,
    /// The realized body bytes.
    pub body: Bytes,
}

impl RecordedRequest {
    /// Returns a header value as a string.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// A test transport that replays a preloaded series of responses and
/// records every request it sees.
#[derive(Clone, Debug, Default)]
pub struct TestConnection {
    responses: Arc<Mutex<VecDeque<http::Response<Bytes>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestConnection {
    /// Creates a connection that answers with `responses`, in order.
    pub fn new(responses: Vec<http::Response<Bytes>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A connection that always answers `200 OK` with `body`.
    pub fn with_ok_body(body: &str) -> Self {
        let response = http::Response::builder()
            .status(200)
            .body(Bytes::copy_from_slice(body.as_bytes()))
            .unwrap();
        Self::new(vec![response])
    }

    /// The requests dispatched so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for TestConnection {
    async fn dispatch(
        &self,
        request: http::Request<SdkBody>,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let (parts, body) = request.into_parts();
        let body = body
            .collect()
            .await
            .map_err(TransportError::fatal)?;
        self.requests.lock().unwrap().push(RecordedRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        });

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::fatal("no more canned responses"))?;
        let (parts, body) = response.into_parts();
        Ok(HttpResponse {
            status: parts.status,
            headers: parts.headers,
            body: SdkBody::from(body),
        })
    }
}
