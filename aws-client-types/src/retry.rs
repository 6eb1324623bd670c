/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Retry classification vocabulary shared by the response validator and the
//! executor's retry loop.

use std::time::Duration;

/// Broad categories of failure used to decide whether a request may be
/// replayed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The server asked us to slow down. Retried with backoff.
    ThrottlingError,

    /// A connection-level failure or request timeout that is expected to be
    /// short lived. Retried with backoff.
    TransientError,

    /// A 5xx response that is not known to be throttling-related.
    /// Retried with backoff.
    ServerError,

    /// A 4xx response. The request as written will never succeed.
    ClientError,
}

impl ErrorKind {
    /// Returns true if requests failing with this kind may be retried.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::ThrottlingError | ErrorKind::TransientError | ErrorKind::ServerError
        )
    }
}

/// The retry decision for one response.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum RetryKind {
    /// Retry after exactly this delay (from a `Retry-After` style header).
    Explicit(Duration),

    /// Retry (or not) according to the error kind and the backoff policy.
    Error(ErrorKind),

    /// Never retry this response.
    NotRetryable,
}

#[cfg(test)]
mod tests {
    use super::ErrorKind;

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!ErrorKind::ClientError.is_retryable());
        assert!(ErrorKind::ThrottlingError.is_retryable());
        assert!(ErrorKind::TransientError.is_retryable());
        assert!(ErrorKind::ServerError.is_retryable());
    }
}
