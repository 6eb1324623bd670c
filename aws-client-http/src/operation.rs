/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use http::Method;

/// Static description of one service operation: the name, HTTP method, URI
/// template, and the option flags that steer body handling.
#[derive(Clone, Debug)]
pub struct Operation {
    name: &'static str,
    method: Method,
    request_uri: &'static str,
    host_prefix: Option<&'static str>,
    flags: OperationFlags,
}

impl Operation {
    /// Creates an operation descriptor.
    ///
    /// `request_uri` is a path template; `{name}` placeholders substitute a
    /// single path segment and `{name+}` placeholders substitute a
    /// slash-preserving path suffix.
    pub fn new(name: &'static str, method: Method, request_uri: &'static str) -> Self {
        Self {
            name,
            method,
            request_uri,
            host_prefix: None,
            flags: OperationFlags::default(),
        }
    }

    /// Sets a host prefix template, e.g. `"{AccountId}."`.
    pub fn with_host_prefix(mut self, host_prefix: &'static str) -> Self {
        self.host_prefix = Some(host_prefix);
        self
    }

    /// Sets the option flags.
    pub fn with_flags(mut self, flags: OperationFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The operation name, e.g. `PutItem`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URI path template.
    pub fn request_uri(&self) -> &'static str {
        self.request_uri
    }

    /// The host prefix template, when the operation declares one.
    pub fn host_prefix(&self) -> Option<&'static str> {
        self.host_prefix
    }

    /// The option flags.
    pub fn flags(&self) -> &OperationFlags {
        &self.flags
    }
}

/// Option flags declared per operation.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct OperationFlags {
    /// The operation accepts a streaming body of known length.
    pub allow_streaming: bool,

    /// The operation accepts a streaming body of unknown length, sent as
    /// signed chunks.
    pub allow_chunked_streaming: bool,

    /// The operation requires a body checksum (MD5 unless an algorithm
    /// header selects otherwise).
    pub checksum_required: bool,

    /// The operation honors the `x-amz-sdk-checksum-algorithm` header.
    pub checksum_header: bool,

    /// The operation computes `content-md5` when the service config enables
    /// MD5 calculation.
    pub md5_checksum_header: bool,
}

impl OperationFlags {
    /// Flags for a streaming upload operation.
    pub fn streaming() -> Self {
        OperationFlags {
            allow_streaming: true,
            allow_chunked_streaming: true,
            ..Default::default()
        }
    }
}
