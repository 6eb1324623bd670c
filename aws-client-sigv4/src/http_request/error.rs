/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::error::Error;
use std::fmt;

#[derive(Debug)]
enum SigningErrorKind {
    FailedToCreateCanonicalRequest { source: CanonicalRequestError },
    ExpiresInRequired,
    ChunkTooLarge { size: usize, max: usize },
}

/// Error signing a request.
#[derive(Debug)]
pub struct SigningError {
    kind: SigningErrorKind,
}

impl SigningError {
    pub(crate) fn expires_in_required() -> Self {
        Self {
            kind: SigningErrorKind::ExpiresInRequired,
        }
    }

    pub(crate) fn chunk_too_large(size: usize, max: usize) -> Self {
        Self {
            kind: SigningErrorKind::ChunkTooLarge { size, max },
        }
    }
}

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SigningErrorKind::*;
        match self.kind {
            FailedToCreateCanonicalRequest { .. } => {
                write!(f, "failed to create canonical request")
            }
            ExpiresInRequired => {
                write!(f, "signing via query parameters requires `expires_in` to be set")
            }
            ChunkTooLarge { size, max } => {
                write!(f, "chunk of {size} bytes exceeds the maximum chunk size of {max} bytes")
            }
        }
    }
}

impl Error for SigningError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use SigningErrorKind::*;
        match &self.kind {
            FailedToCreateCanonicalRequest { source } => Some(source),
            ExpiresInRequired | ChunkTooLarge { .. } => None,
        }
    }
}

impl From<CanonicalRequestError> for SigningError {
    fn from(source: CanonicalRequestError) -> Self {
        Self {
            kind: SigningErrorKind::FailedToCreateCanonicalRequest { source },
        }
    }
}

#[derive(Debug)]
enum CanonicalRequestErrorKind {
    InvalidHeaderValue { source: http::header::ToStrError },
    MissingAuthority,
}

#[derive(Debug)]
pub(crate) struct CanonicalRequestError {
    kind: CanonicalRequestErrorKind,
}

impl fmt::Display for CanonicalRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CanonicalRequestErrorKind::*;
        match self.kind {
            InvalidHeaderValue { .. } => write!(f, "header value is not valid UTF-8"),
            MissingAuthority => {
                write!(f, "the request URI must have an authority to derive the host header")
            }
        }
    }
}

impl Error for CanonicalRequestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use CanonicalRequestErrorKind::*;
        match &self.kind {
            InvalidHeaderValue { source } => Some(source),
            MissingAuthority => None,
        }
    }
}

impl CanonicalRequestError {
    pub(crate) fn missing_authority() -> Self {
        Self {
            kind: CanonicalRequestErrorKind::MissingAuthority,
        }
    }
}

impl From<http::header::ToStrError> for CanonicalRequestError {
    fn from(source: http::header::ToStrError) -> Self {
        Self {
            kind: CanonicalRequestErrorKind::InvalidHeaderValue { source },
        }
    }
}
