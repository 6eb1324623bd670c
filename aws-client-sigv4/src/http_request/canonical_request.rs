/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::date_time::{format_date, format_date_time};
use crate::http_request::error::CanonicalRequestError;
use crate::http_request::settings::{
    PayloadChecksumKind, PercentEncodingMode, SignatureLocation, SigningParams,
};
use crate::http_request::sign::{SignableBody, SignableRequest};
use crate::http_request::url_escape::percent_encode_query;
use crate::sign::sha256_hex_string;
use http::Uri;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

pub(crate) const HMAC_256: &str = "AWS4-HMAC-SHA256";

const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const STREAMING_PAYLOAD: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";

pub(crate) mod header {
    pub(crate) const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
    pub(crate) const X_AMZ_DATE: &str = "x-amz-date";
    pub(crate) const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
}

pub(crate) mod param {
    pub(crate) const X_AMZ_ALGORITHM: &str = "X-Amz-Algorithm";
    pub(crate) const X_AMZ_CREDENTIAL: &str = "X-Amz-Credential";
    pub(crate) const X_AMZ_DATE: &str = "X-Amz-Date";
    pub(crate) const X_AMZ_EXPIRES: &str = "X-Amz-Expires";
    pub(crate) const X_AMZ_SECURITY_TOKEN: &str = "X-Amz-Security-Token";
    pub(crate) const X_AMZ_SIGNATURE: &str = "X-Amz-Signature";
    pub(crate) const X_AMZ_SIGNED_HEADERS: &str = "X-Amz-SignedHeaders";
}

// Headers that must never participate in the signature: proxies rewrite the
// user agent, and the authorization header is the signature's own output.
const EXCLUDED_HEADERS: [&str; 2] = ["authorization", "user-agent"];

#[derive(Debug, PartialEq)]
pub(crate) struct CanonicalRequest<'a> {
    pub(crate) method: &'a str,
    pub(crate) path: String,
    pub(crate) params: Option<String>,
    // lowercased name -> comma-joined normalized values
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) values: SignatureValues<'a>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum SignatureValues<'a> {
    Headers(HeaderValues<'a>),
    QueryParams(QueryParamValues<'a>),
}

impl<'a> SignatureValues<'a> {
    pub(crate) fn signed_headers(&self) -> &SignedHeaders {
        match self {
            SignatureValues::Headers(values) => &values.signed_headers,
            SignatureValues::QueryParams(values) => &values.signed_headers,
        }
    }

    fn content_sha256(&self) -> &str {
        match self {
            SignatureValues::Headers(values) => &values.content_sha256,
            SignatureValues::QueryParams(values) => &values.content_sha256,
        }
    }

    pub(crate) fn as_headers(&self) -> Option<&HeaderValues<'_>> {
        match self {
            SignatureValues::Headers(values) => Some(values),
            _ => None,
        }
    }

    pub(crate) fn into_query_params(self) -> Option<QueryParamValues<'a>> {
        match self {
            SignatureValues::QueryParams(values) => Some(values),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct HeaderValues<'a> {
    pub(crate) content_sha256: Cow<'a, str>,
    pub(crate) date_time: String,
    pub(crate) security_token: Option<&'a str>,
    pub(crate) signed_headers: SignedHeaders,
}

#[derive(Debug, PartialEq)]
pub(crate) struct QueryParamValues<'a> {
    pub(crate) algorithm: &'static str,
    pub(crate) content_sha256: Cow<'a, str>,
    pub(crate) credential: String,
    pub(crate) date_time: String,
    pub(crate) expires: String,
    pub(crate) security_token: Option<&'a str>,
    pub(crate) signed_headers: SignedHeaders,
}

impl<'a> CanonicalRequest<'a> {
    /// Constructs a `CanonicalRequest` from a signable request.
    ///
    /// ## Behavior
    /// - The `host` header is derived from the URI authority when absent.
    /// - With `PercentEncodingMode::Double`, `%` in the (already encoded)
    ///   path is re-encoded as `%25`.
    /// - For header signing, `x-amz-date`, `x-amz-security-token`, and
    ///   (per settings) `x-amz-content-sha256` join the signed headers.
    /// - For query signing, the `X-Amz-*` parameters are merged into the
    ///   canonical query string instead.
    pub(crate) fn from<'b>(
        req: &'b SignableRequest<'b>,
        params: &'b SigningParams<'b>,
    ) -> Result<CanonicalRequest<'b>, CanonicalRequestError> {
        let settings = &params.settings;
        let path = req.uri().path();
        let path = match settings.percent_encoding_mode {
            // The path is already encoded once; only `%` needs a second pass.
            PercentEncodingMode::Double => path.replace('%', "%25"),
            PercentEncodingMode::Single => path.to_string(),
        };
        let payload_hash = Self::payload_hash(req.body());
        let date_time = format_date_time(params.time);
        let security_token = params.credentials.session_token();

        let mut headers = Self::headers(req)?;
        if settings.signature_location == SignatureLocation::Headers {
            headers.insert(header::X_AMZ_DATE.to_string(), date_time.clone());
            if let Some(token) = security_token {
                headers.insert(header::X_AMZ_SECURITY_TOKEN.to_string(), token.to_string());
            }
            if settings.payload_checksum_kind == PayloadChecksumKind::XAmzSha256 {
                headers.insert(
                    header::X_AMZ_CONTENT_SHA_256.to_string(),
                    payload_hash.to_string(),
                );
            }
        }
        let signed_headers = SignedHeaders::new(
            headers
                .keys()
                .filter(|name| !EXCLUDED_HEADERS.contains(&name.as_str()))
                .cloned()
                .collect(),
        );

        let values = match settings.signature_location {
            SignatureLocation::Headers => SignatureValues::Headers(HeaderValues {
                content_sha256: payload_hash,
                date_time,
                security_token,
                signed_headers,
            }),
            SignatureLocation::QueryParams => SignatureValues::QueryParams(QueryParamValues {
                algorithm: HMAC_256,
                content_sha256: payload_hash,
                credential: format!(
                    "{}/{}",
                    params.credentials.access_key_id(),
                    Scope::new(params.time, params.region, params.name),
                ),
                date_time,
                expires: settings
                    .expires_in
                    .map(|expires| expires.as_secs().to_string())
                    .unwrap_or_default(),
                security_token,
                signed_headers,
            }),
        };

        Ok(CanonicalRequest {
            method: req.method(),
            path,
            params: Self::params(req.uri(), &values),
            headers,
            values,
        })
    }

    fn headers(req: &SignableRequest<'_>) -> Result<BTreeMap<String, String>, CanonicalRequestError> {
        let mut canonical_headers = BTreeMap::new();
        for (name, value) in req.headers().iter() {
            let name = name.as_str().to_ascii_lowercase();
            let value = normalize_header_value(value.to_str()?);
            match canonical_headers.entry(name) {
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                std::collections::btree_map::Entry::Occupied(mut entry) => {
                    // repeated headers fold into one comma-joined line
                    let joined = entry.get_mut();
                    joined.push(',');
                    joined.push_str(&value);
                }
            }
        }
        if !canonical_headers.contains_key("host") {
            let authority = req
                .uri()
                .authority()
                .ok_or_else(CanonicalRequestError::missing_authority)?;
            canonical_headers.insert("host".to_string(), authority.to_string());
        }
        Ok(canonical_headers)
    }

    fn payload_hash<'b>(body: &'b SignableBody<'b>) -> Cow<'b, str> {
        match body {
            SignableBody::Bytes(data) => Cow::Owned(sha256_hex_string(data)),
            SignableBody::Precomputed(digest) => Cow::Borrowed(digest.as_str()),
            SignableBody::UnsignedPayload => Cow::Borrowed(UNSIGNED_PAYLOAD),
            SignableBody::StreamingChunks => Cow::Borrowed(STREAMING_PAYLOAD),
        }
    }

    fn params(uri: &Uri, values: &SignatureValues<'_>) -> Option<String> {
        let mut params: Vec<(Cow<'_, str>, Cow<'_, str>)> =
            form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes()).collect();
        if let SignatureValues::QueryParams(values) = values {
            params.push((param::X_AMZ_ALGORITHM.into(), values.algorithm.into()));
            params.push((param::X_AMZ_CREDENTIAL.into(), values.credential.as_str().into()));
            params.push((param::X_AMZ_DATE.into(), values.date_time.as_str().into()));
            params.push((param::X_AMZ_EXPIRES.into(), values.expires.as_str().into()));
            params.push((
                param::X_AMZ_SIGNED_HEADERS.into(),
                values.signed_headers.as_str().into(),
            ));
            if let Some(token) = values.security_token {
                params.push((param::X_AMZ_SECURITY_TOKEN.into(), token.into()));
            }
        }
        if params.is_empty() {
            return None;
        }
        // Sort by key, then by value
        params.sort();
        let mut out = String::new();
        let mut first = true;
        for (key, value) in params {
            if !first {
                out.push('&');
            }
            first = false;
            out.push_str(&percent_encode_query(&key));
            out.push('=');
            out.push_str(&percent_encode_query(&value));
        }
        Some(out)
    }
}

impl<'a> fmt::Display for CanonicalRequest<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.params.as_deref().unwrap_or_default())?;
        for name in self.values.signed_headers().iter() {
            // signed headers were derived from this map, so the lookup holds
            writeln!(f, "{}:{}", name, self.headers[name])?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.values.signed_headers().as_str())?;
        write!(f, "{}", self.values.content_sha256())?;
        Ok(())
    }
}

/// Normalizes a header value for the canonical request: leading and trailing
/// whitespace is trimmed, and interior runs of spaces and tabs collapse to a
/// single space, except inside double-quoted sections.
fn normalize_header_value(value: &str) -> String {
    let trimmed = value.trim_matches(|c| c == ' ' || c == '\t');
    let mut out = String::with_capacity(trimmed.len());
    let mut in_quotes = false;
    let mut last_was_space = false;
    for c in trimmed.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        }
        if !in_quotes && (c == ' ' || c == '\t') {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

/// The sorted, `;`-joined list of signed header names.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct SignedHeaders {
    inner: Vec<String>,
    formatted: String,
}

impl SignedHeaders {
    fn new(mut inner: Vec<String>) -> Self {
        inner.sort();
        let formatted = inner.join(";");
        SignedHeaders { inner, formatted }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.formatted
    }

    fn iter(&self) -> impl Iterator<Item = &String> {
        self.inner.iter()
    }
}

impl fmt::Display for SignedHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Scope<'a> {
    pub(crate) date: String,
    pub(crate) region: &'a str,
    pub(crate) service: &'a str,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(time: SystemTime, region: &'a str, service: &'a str) -> Self {
        Scope {
            date: format_date(time),
            region,
            service,
        }
    }
}

impl<'a> fmt::Display for Scope<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/aws4_request", self.date, self.region, self.service)
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct StringToSign<'a> {
    pub(crate) scope: Scope<'a>,
    pub(crate) date_time: String,
    pub(crate) hashed_creq: &'a str,
}

impl<'a> StringToSign<'a> {
    pub(crate) fn new(
        time: SystemTime,
        region: &'a str,
        service: &'a str,
        hashed_creq: &'a str,
    ) -> Self {
        Self {
            scope: Scope::new(time, region, service),
            date_time: format_date_time(time),
            hashed_creq,
        }
    }
}

impl<'a> fmt::Display for StringToSign<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}",
            HMAC_256, self.date_time, self.scope, self.hashed_creq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_header_value, CanonicalRequest, Scope, StringToSign};
    use crate::date_time::parse_date_time;
    use crate::http_request::settings::{
        PayloadChecksumKind, PercentEncodingMode, SignatureLocation, SigningParams,
        SigningSettings,
    };
    use crate::http_request::sign::{SignableBody, SignableRequest};
    use crate::sign::sha256_hex_string;
    use aws_client_types::Credentials;
    use http::{HeaderMap, HeaderValue, Method, Uri};
    use pretty_assertions::assert_eq;

    fn test_params<'a>(
        credentials: &'a Credentials,
        settings: SigningSettings,
    ) -> SigningParams<'a> {
        SigningParams {
            credentials,
            region: "us-east-1",
            name: "iam",
            time: parse_date_time("20150830T123600Z").unwrap(),
            settings,
        }
    }

    #[test]
    fn canonical_request_with_sorted_query() {
        let credentials = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
        let params = test_params(&credentials, SigningSettings::default());
        let uri: Uri = "https://iam.amazonaws.com/?Version=2010-05-08&Action=ListUsers"
            .parse()
            .unwrap();
        let headers = HeaderMap::new();
        let req = SignableRequest::new(&Method::GET, &uri, &headers, SignableBody::Bytes(b""));
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(
            creq.params.as_deref(),
            Some("Action=ListUsers&Version=2010-05-08")
        );
        assert_eq!(creq.values.signed_headers().as_str(), "host;x-amz-date");
    }

    #[test]
    fn payload_checksum_header_joins_signed_headers() {
        let credentials = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
        let settings = SigningSettings {
            payload_checksum_kind: PayloadChecksumKind::XAmzSha256,
            ..Default::default()
        };
        let params = test_params(&credentials, settings);
        let uri: Uri = "https://iam.amazonaws.com/".parse().unwrap();
        let headers = HeaderMap::new();
        let req = SignableRequest::new(&Method::GET, &uri, &headers, SignableBody::Bytes(b""));
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(
            creq.values.signed_headers().as_str(),
            "host;x-amz-content-sha256;x-amz-date"
        );
        assert_eq!(
            creq.values.as_headers().unwrap().content_sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn unsigned_payload_literal() {
        let credentials = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
        let params = test_params(&credentials, SigningSettings::default());
        let uri: Uri = "https://examplebucket.s3.amazonaws.com/test.txt".parse().unwrap();
        let headers = HeaderMap::new();
        let req = SignableRequest::new(&Method::GET, &uri, &headers, SignableBody::UnsignedPayload);
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert!(creq.to_string().ends_with("UNSIGNED-PAYLOAD"));
    }

    #[test]
    fn double_encoding_reencodes_percent() {
        let credentials = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
        let params = test_params(&credentials, SigningSettings::default());
        let uri: Uri = "https://example.amazonaws.com/a%20b".parse().unwrap();
        let headers = HeaderMap::new();
        let req = SignableRequest::new(&Method::GET, &uri, &headers, SignableBody::Bytes(b""));
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(creq.path, "/a%2520b");

        let settings = SigningSettings {
            percent_encoding_mode: PercentEncodingMode::Single,
            ..Default::default()
        };
        let params = test_params(&credentials, settings);
        let req = SignableRequest::new(&Method::GET, &uri, &headers, SignableBody::Bytes(b""));
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(creq.path, "/a%20b");
    }

    #[test]
    fn tilde_and_unreserved_query_values_survive() {
        let credentials = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
        let params = test_params(&credentials, SigningSettings::default());
        let uri: Uri =
            "https://s3.us-east-1.amazonaws.com/my-bucket?list-type=2&prefix=~objprefix&single&k=&unreserved=-_.~"
                .parse()
                .unwrap();
        let headers = HeaderMap::new();
        let req = SignableRequest::new(&Method::GET, &uri, &headers, SignableBody::Bytes(b""));
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(
            creq.params.as_deref(),
            Some("k=&list-type=2&prefix=~objprefix&single=&unreserved=-_.~")
        );
    }

    #[test]
    fn normalizes_header_values() {
        assert_eq!(normalize_header_value("  a   b  "), "a b");
        assert_eq!(normalize_header_value("\ta\t\tb\t"), "a b");
        assert_eq!(normalize_header_value("\"a   b\""), "\"a   b\"");
        assert_eq!(normalize_header_value("x \"a   b\" y"), "x \"a   b\" y");
    }

    #[test]
    fn repeated_headers_fold_into_one_line() {
        let credentials = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
        let params = test_params(&credentials, SigningSettings::default());
        let uri: Uri = "https://example.amazonaws.com/".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.append("x-custom", HeaderValue::from_static("one"));
        headers.append("x-custom", HeaderValue::from_static("two"));
        let req = SignableRequest::new(&Method::GET, &uri, &headers, SignableBody::Bytes(b""));
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(creq.headers["x-custom"], "one,two");
    }

    #[test]
    fn scope_and_string_to_sign_formats() {
        let time = parse_date_time("20150830T123600Z").unwrap();
        let scope = Scope::new(time, "us-east-1", "iam");
        assert_eq!(scope.to_string(), "20150830/us-east-1/iam/aws4_request");

        let hashed = sha256_hex_string(b"");
        let sts = StringToSign::new(time, "us-east-1", "iam", &hashed);
        assert_eq!(
            sts.to_string(),
            format!(
                "AWS4-HMAC-SHA256\n20150830T123600Z\n20150830/us-east-1/iam/aws4_request\n{}",
                hashed
            )
        );
    }

    #[test]
    fn presigned_params_are_signed_sorted_and_encoded() {
        let credentials = Credentials::from_keys("AKIDEXAMPLE", "secret", None);
        let settings = SigningSettings {
            signature_location: SignatureLocation::QueryParams,
            expires_in: Some(std::time::Duration::from_secs(86400)),
            ..Default::default()
        };
        let params = test_params(&credentials, settings);
        let uri: Uri = "https://examplebucket.s3.amazonaws.com/test.txt".parse().unwrap();
        let headers = HeaderMap::new();
        let req = SignableRequest::new(&Method::GET, &uri, &headers, SignableBody::UnsignedPayload);
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(
            creq.params.as_deref(),
            Some(
                "X-Amz-Algorithm=AWS4-HMAC-SHA256\
                 &X-Amz-Credential=AKIDEXAMPLE%2F20150830%2Fus-east-1%2Fiam%2Faws4_request\
                 &X-Amz-Date=20150830T123600Z\
                 &X-Amz-Expires=86400\
                 &X-Amz-SignedHeaders=host"
            )
        );
    }
}
