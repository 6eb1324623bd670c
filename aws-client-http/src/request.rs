/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::body::SdkBody;
use crate::protocol::Protocol;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};

/// A built, not-yet-signed request.
///
/// Middlewares receive and return this type; after signing it converts into
/// the `http` request handed to the transport.
#[derive(Debug)]
pub struct AwsRequest {
    /// The operation name.
    pub operation: &'static str,
    /// The wire protocol the body was encoded with.
    pub protocol: Protocol,
    /// The region the request will be signed for.
    pub region: String,
    /// The HTTP method.
    pub method: Method,
    /// The full request URL.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// The request body.
    pub body: SdkBody,
}

impl AwsRequest {
    /// Returns a header value as a string, when present and valid UTF-8.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Inserts a header, replacing any previous value.
    pub fn insert_header(
        &mut self,
        name: &str,
        value: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Clones the request when its body is replayable.
    pub fn try_clone(&self) -> Option<AwsRequest> {
        Some(AwsRequest {
            operation: self.operation,
            protocol: self.protocol,
            region: self.region.clone(),
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
        })
    }

    /// Converts into the `http` request given to the transport.
    pub fn into_http(self) -> http::Request<SdkBody> {
        let mut request = http::Request::builder()
            .method(self.method)
            .uri(self.uri)
            .body(self.body)
            .expect("a built AwsRequest is always a valid http request");
        *request.headers_mut() = self.headers;
        request
    }
}
