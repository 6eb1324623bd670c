/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use thiserror::Error;

/// Errors raised while turning an operation input into an HTTP request.
///
/// Build errors always fail fast: the executor never retries them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The endpoint plus path did not parse as a URL, or the URL has no host.
    #[error("invalid request URL: {reason}")]
    InvalidUrl {
        /// Why the URL was rejected.
        reason: String,
    },

    /// The input failed its declared constraints.
    #[error("validation failed for `{field_path}`: {reason}")]
    Validation {
        /// Dotted path of the offending field.
        field_path: String,
        /// The constraint that was violated.
        reason: String,
    },

    /// A member value cannot be rendered at its declared location.
    #[error("member `{member}` cannot be encoded: {reason}")]
    Unencodable {
        /// The member that could not be encoded.
        member: String,
        /// Why encoding failed.
        reason: String,
    },

    /// A streaming body of unknown length was supplied, but the operation
    /// does not permit chunked streaming.
    #[error("streaming body has no content length and the operation does not allow chunked streaming")]
    MissingContentLength,

    /// A streaming body was supplied to an operation that requires the body
    /// in memory.
    #[error("operation `{operation}` does not accept a streaming body")]
    StreamingNotAllowed {
        /// The operation name.
        operation: String,
    },
}

impl BuildError {
    pub(crate) fn invalid_url(reason: impl Into<String>) -> Self {
        BuildError::InvalidUrl {
            reason: reason.into(),
        }
    }

    /// A validation failure at `field_path`.
    pub fn validation(field_path: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::Validation {
            field_path: field_path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unencodable(member: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::Unencodable {
            member: member.into(),
            reason: reason.into(),
        }
    }
}
