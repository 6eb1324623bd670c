/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Response validation: generic error envelopes, retry classification, and
//! response-header binding.

use crate::body::SdkBody;
use crate::protocol::Protocol;
use aws_client_types::retry::{ErrorKind, RetryKind};
use aws_client_types::ErrorMetadata;
use http::{HeaderMap, StatusCode};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Duration;

const REQUEST_ID_HEADERS: [&str; 3] = ["x-amzn-requestid", "x-amz-request-id", "x-amzn-request-id"];

// Error codes the provider family uses to signal throttling.
const THROTTLING_ERRORS: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "PriorRequestNotComplete",
    "EC2ThrottledException",
];

const TRANSIENT_ERRORS: &[&str] = &["RequestTimeout", "RequestTimeoutException"];

/// An HTTP response as handed back by the transport.
///
/// For streamable outputs the body passes through unread; the error path
/// always buffers it first.
#[derive(Debug)]
pub struct HttpResponse {
    /// The response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// The response body.
    pub body: SdkBody,
}

impl HttpResponse {
    /// The request id assigned by the service, read from the well-known
    /// response headers.
    pub fn request_id(&self) -> Option<&str> {
        REQUEST_ID_HEADERS
            .iter()
            .find_map(|name| self.headers.get(*name))
            .and_then(|value| value.to_str().ok())
    }
}

/// Returns a response header value; repeated headers are comma-joined.
///
/// Typed decoders use this to bind output members declared at
/// `header(name)`.
pub fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let mut values = headers.get_all(name).iter();
    let first = values.next()?.to_str().ok()?.to_string();
    Some(values.fold(first, |mut joined, value| {
        if let Ok(value) = value.to_str() {
            joined.push(',');
            joined.push_str(value);
        }
        joined
    }))
}

/// Collects `(suffix, value)` pairs for every header starting with `prefix`.
///
/// Typed decoders use this to bind output members declared at
/// `headerPrefix(prefix)`.
pub fn prefix_header_values(headers: &HeaderMap, prefix: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for name in headers.keys() {
        let name_str = name.as_str();
        if let Some(suffix) = name_str.strip_prefix(prefix) {
            if let Some(value) = header_value(headers, name_str) {
                out.push((suffix.to_string(), value));
            }
        }
    }
    out
}

/// Parses the protocol-specific error envelope of a failed response.
///
/// The request id falls back to the response headers when the envelope does
/// not carry one.
pub fn parse_generic_error(
    protocol: Protocol,
    headers: &HeaderMap,
    body: &[u8],
) -> ErrorMetadata {
    let parts = match protocol {
        Protocol::Json | Protocol::RestJson => parse_json_error(headers, body),
        Protocol::RestXml | Protocol::Query | Protocol::Ec2Query => parse_xml_error(body),
    };
    let request_id = parts.request_id.or_else(|| {
        REQUEST_ID_HEADERS
            .iter()
            .find_map(|name| headers.get(*name))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    });

    let mut builder = ErrorMetadata::builder();
    if let Some(code) = parts.code {
        builder = builder.code(code);
    }
    if let Some(message) = parts.message {
        builder = builder.message(message);
    }
    builder.maybe_request_id(request_id).build()
}

#[derive(Default)]
struct EnvelopeParts {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}

// JSON envelopes carry the code in the `x-amzn-errortype` header, a
// `__type` field, or a `code` field; the namespace prefix and any URI
// suffix are stripped.
fn parse_json_error(headers: &HeaderMap, body: &[u8]) -> EnvelopeParts {
    let document: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
    let code = headers
        .get("x-amzn-errortype")
        .and_then(|value| value.to_str().ok())
        .or_else(|| document.get("__type").and_then(serde_json::Value::as_str))
        .or_else(|| document.get("code").and_then(serde_json::Value::as_str))
        .map(|code| sanitize_error_code(code).to_string());
    let message = document
        .get("message")
        .or_else(|| document.get("Message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    let request_id = document
        .get("requestId")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    EnvelopeParts {
        code,
        message,
        request_id,
    }
}

/// Strips the shape namespace (`ns#Code`) and any URI suffix (`Code:uri`)
/// from a JSON error code.
fn sanitize_error_code(code: &str) -> &str {
    let code = code.split(':').next().unwrap_or(code);
    match code.rsplit_once('#') {
        Some((_namespace, code)) => code,
        None => code,
    }
}

// XML envelopes differ by depth only: `<Error>` at the root (rest-xml),
// `<ErrorResponse><Error>` (query), `<Response><Errors><Error>`
// (ec2-query). A single scan that reads Code/Message inside any `Error`
// element handles all three.
fn parse_xml_error(body: &[u8]) -> EnvelopeParts {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut code = None;
    let mut message = None;
    let mut request_id = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(text)) => {
                let text = match text.unescape() {
                    Ok(text) => text.trim().to_string(),
                    Err(_) => continue,
                };
                if text.is_empty() {
                    continue;
                }
                let in_error = stack.iter().any(|name| name == "Error");
                match stack.last().map(String::as_str) {
                    Some("Code") if in_error && code.is_none() => code = Some(text),
                    Some("Message") if in_error && message.is_none() => message = Some(text),
                    Some("RequestId") | Some("RequestID") if request_id.is_none() => {
                        request_id = Some(text)
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    EnvelopeParts {
        code,
        message,
        request_id,
    }
}

/// Classifies a failed response for the retry loop.
///
/// In priority order: an explicit retry-after header, the known throttling
/// and transient code lists, then the status class (429 throttles, 408 is
/// transient, other 5xx are server errors, remaining 4xx are client
/// errors).
pub fn classify_response(
    status: StatusCode,
    code: Option<&str>,
    headers: &HeaderMap,
) -> RetryKind {
    if let Some(delay) = retry_after(headers) {
        return RetryKind::Explicit(delay);
    }
    if let Some(code) = code {
        if THROTTLING_ERRORS.contains(&code) {
            return RetryKind::Error(ErrorKind::ThrottlingError);
        }
        if TRANSIENT_ERRORS.contains(&code) {
            return RetryKind::Error(ErrorKind::TransientError);
        }
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RetryKind::Error(ErrorKind::ThrottlingError);
    }
    if status == StatusCode::REQUEST_TIMEOUT {
        return RetryKind::Error(ErrorKind::TransientError);
    }
    if status.is_server_error() {
        return RetryKind::Error(ErrorKind::ServerError);
    }
    if status.is_client_error() {
        return RetryKind::Error(ErrorKind::ClientError);
    }
    RetryKind::NotRetryable
}

// `x-amz-retry-after` carries milliseconds; the standard header carries
// seconds.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(millis) = headers
        .get("x-amz-retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
    {
        return Some(Duration::from_millis(millis));
    }
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::{
        classify_response, header_value, parse_generic_error, prefix_header_values,
        sanitize_error_code,
    };
    use crate::protocol::Protocol;
    use aws_client_types::retry::{ErrorKind, RetryKind};
    use http::{HeaderMap, HeaderValue, StatusCode};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn json_error_with_namespaced_type() {
        let body = br#"{"__type":"com.amazonaws.dynamodb.v20120810#ResourceNotFoundException","message":"Requested resource not found"}"#;
        let metadata = parse_generic_error(Protocol::Json, &HeaderMap::new(), body);
        assert_eq!(metadata.code(), Some("ResourceNotFoundException"));
        assert_eq!(metadata.message(), Some("Requested resource not found"));
    }

    #[test]
    fn json_error_header_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-amzn-errortype",
            HeaderValue::from_static("FooError:http://internal.amazon.com/coral/"),
        );
        let metadata = parse_generic_error(Protocol::RestJson, &headers, b"{}");
        assert_eq!(metadata.code(), Some("FooError"));
    }

    #[test]
    fn sanitizes_error_codes() {
        assert_eq!(sanitize_error_code("WouldNotWork"), "WouldNotWork");
        assert_eq!(sanitize_error_code("ns#WouldNotWork"), "WouldNotWork");
        assert_eq!(
            sanitize_error_code("aws.protocoltests#WouldNotWork:http://uri"),
            "WouldNotWork"
        );
    }

    #[test]
    fn rest_xml_error_at_root() {
        let body = br#"<?xml version="1.0"?>
        <Error>
            <Code>NoSuchKey</Code>
            <Message>The resource you requested does not exist</Message>
            <Resource>/mybucket/myfoto.jpg</Resource>
            <RequestId>4442587FB7D0A2F9</RequestId>
        </Error>"#;
        let metadata = parse_generic_error(Protocol::RestXml, &HeaderMap::new(), body);
        assert_eq!(metadata.code(), Some("NoSuchKey"));
        assert_eq!(
            metadata.message(),
            Some("The resource you requested does not exist")
        );
        assert_eq!(metadata.request_id(), Some("4442587FB7D0A2F9"));
    }

    #[test]
    fn query_error_response_envelope() {
        let body = br#"<ErrorResponse>
            <Error>
                <Type>Sender</Type>
                <Code>InvalidParameterValue</Code>
                <Message>Value (quux) for parameter value is invalid.</Message>
            </Error>
            <RequestId>42d59b56-7407-4c4a-be0f-4c88daeea257</RequestId>
        </ErrorResponse>"#;
        let metadata = parse_generic_error(Protocol::Query, &HeaderMap::new(), body);
        assert_eq!(metadata.code(), Some("InvalidParameterValue"));
        assert_eq!(
            metadata.request_id(),
            Some("42d59b56-7407-4c4a-be0f-4c88daeea257")
        );
    }

    #[test]
    fn ec2_query_nested_errors_envelope() {
        let body = br#"<Response>
            <Errors>
                <Error>
                    <Code>InvalidGreeting</Code>
                    <Message>Hi</Message>
                </Error>
            </Errors>
            <RequestID>foo-id</RequestID>
        </Response>"#;
        let metadata = parse_generic_error(Protocol::Ec2Query, &HeaderMap::new(), body);
        assert_eq!(metadata.code(), Some("InvalidGreeting"));
        assert_eq!(metadata.message(), Some("Hi"));
        assert_eq!(metadata.request_id(), Some("foo-id"));
    }

    #[test]
    fn request_id_falls_back_to_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-amzn-requestid", HeaderValue::from_static("abc-123"));
        let metadata =
            parse_generic_error(Protocol::RestJson, &headers, br#"{"__type":"OopsException"}"#);
        assert_eq!(metadata.code(), Some("OopsException"));
        assert_eq!(metadata.request_id(), Some("abc-123"));
    }

    #[test]
    fn classification_table() {
        let no_headers = HeaderMap::new();
        assert_eq!(
            classify_response(StatusCode::SERVICE_UNAVAILABLE, Some("SlowDown"), &no_headers),
            RetryKind::Error(ErrorKind::ThrottlingError)
        );
        assert_eq!(
            classify_response(StatusCode::SERVICE_UNAVAILABLE, None, &no_headers),
            RetryKind::Error(ErrorKind::ServerError)
        );
        assert_eq!(
            classify_response(StatusCode::INTERNAL_SERVER_ERROR, None, &no_headers),
            RetryKind::Error(ErrorKind::ServerError)
        );
        assert_eq!(
            classify_response(StatusCode::TOO_MANY_REQUESTS, None, &no_headers),
            RetryKind::Error(ErrorKind::ThrottlingError)
        );
        assert_eq!(
            classify_response(StatusCode::BAD_REQUEST, Some("InvalidSignature"), &no_headers),
            RetryKind::Error(ErrorKind::ClientError)
        );
        assert_eq!(
            classify_response(StatusCode::REQUEST_TIMEOUT, None, &no_headers),
            RetryKind::Error(ErrorKind::TransientError)
        );
    }

    #[test]
    fn retry_after_headers_win() {
        let mut headers = HeaderMap::new();
        headers.insert("x-amz-retry-after", HeaderValue::from_static("5000"));
        assert_eq!(
            classify_response(StatusCode::SERVICE_UNAVAILABLE, None, &headers),
            RetryKind::Explicit(Duration::from_millis(5000))
        );

        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        assert_eq!(
            classify_response(StatusCode::TOO_MANY_REQUESTS, None, &headers),
            RetryKind::Explicit(Duration::from_secs(3))
        );
    }

    #[test]
    fn binds_response_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-amz-version-id", HeaderValue::from_static("v1"));
        headers.append("x-amz-tag", HeaderValue::from_static("a"));
        headers.append("x-amz-tag", HeaderValue::from_static("b"));
        headers.insert("x-amz-meta-owner", HeaderValue::from_static("team"));
        headers.insert("x-amz-meta-kind", HeaderValue::from_static("report"));

        assert_eq!(header_value(&headers, "x-amz-version-id"), Some("v1".into()));
        assert_eq!(header_value(&headers, "x-amz-tag"), Some("a,b".into()));
        assert_eq!(header_value(&headers, "missing"), None);

        let mut meta = prefix_header_values(&headers, "x-amz-meta-");
        meta.sort();
        assert_eq!(
            meta,
            vec![
                ("kind".to_string(), "report".to_string()),
                ("owner".to_string(), "team".to_string()),
            ]
        );
    }
}
