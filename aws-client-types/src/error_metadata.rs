/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Generic error envelope extracted from failed responses.

use std::fmt;

/// Code, message, and request id parsed from a service error response.
///
/// When the error code cannot be mapped onto a modeled error type, this is
/// all the information the caller gets.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorMetadata {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}

impl ErrorMetadata {
    /// Returns a builder for `ErrorMetadata`.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The error code, e.g. `NoSuchKey`.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The human-readable message sent by the service.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The request id assigned by the service, when one was returned.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

impl fmt::Display for ErrorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code().unwrap_or("Unknown"))?;
        if let Some(message) = self.message() {
            write!(f, ": {}", message)?;
        }
        if let Some(request_id) = self.request_id() {
            write!(f, " (request id: {})", request_id)?;
        }
        Ok(())
    }
}

/// Builder for [`ErrorMetadata`].
#[derive(Debug, Default)]
pub struct Builder {
    inner: ErrorMetadata,
}

impl Builder {
    /// Sets the error code.
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.inner.code = Some(code.into());
        self
    }

    /// Sets the error message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.inner.message = Some(message.into());
        self
    }

    /// Sets the request id.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.inner.request_id = Some(request_id.into());
        self
    }

    /// Sets the request id if one was found.
    pub fn maybe_request_id(mut self, request_id: Option<impl Into<String>>) -> Self {
        self.inner.request_id = request_id.map(Into::into);
        self
    }

    /// Builds the `ErrorMetadata`.
    pub fn build(self) -> ErrorMetadata {
        self.inner
    }
}
