/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! One-shot transformation of `(operation, input, config)` into an
//! [`AwsRequest`].

use crate::body::SdkBody;
use crate::checksum::apply_checksum;
use crate::config::ServiceConfig;
use crate::error::BuildError;
use crate::operation::Operation;
use crate::protocol::Protocol;
use crate::query::{QueryDialect, QueryMap};
use crate::request::AwsRequest;
use crate::shape::{BodyValue, MemberLocation, MemberValue, OperationInput};
use aws_client_sigv4::http_request::url_escape::{percent_encode_query, PATH_ENCODE_SET, STRICT_ENCODE_SET};
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Uri};
use percent_encoding::utf8_percent_encode;

const LIBRARY_USER_AGENT: &str = concat!("aws-client/", env!("CARGO_PKG_VERSION"));
const RAW_PAYLOAD_CONTENT_TYPE: &str = "binary/octet-stream";

/// Builds the request for one operation call.
///
/// The input is consumed: its body may hold a single-owner stream.
pub fn build_request<I: OperationInput>(
    operation: &Operation,
    input: I,
    config: &ServiceConfig,
) -> Result<AwsRequest, BuildError> {
    input.validate()?;

    let mut headers = HeaderMap::new();
    if let Some(target) = config.amz_target() {
        insert_header(
            &mut headers,
            "x-amz-target",
            &format!("{}.{}", target, operation.name()),
        )?;
    }

    let mut path = operation.request_uri().to_string();
    let mut query: Vec<(String, String)> = Vec::new();
    let mut host_prefix = operation.host_prefix().map(str::to_string);

    for member in input.members() {
        distribute_member(
            member.location,
            member.value,
            &mut headers,
            &mut path,
            &mut query,
            &mut host_prefix,
        )?;
    }
    if path.contains('{') {
        return Err(BuildError::unencodable(
            operation.name(),
            format!("path template `{}` has unsubstituted placeholders", path),
        ));
    }
    if let Some(prefix) = &host_prefix {
        if prefix.contains('{') {
            return Err(BuildError::unencodable(
                operation.name(),
                format!("host prefix `{}` has unsubstituted labels", prefix),
            ));
        }
    }

    let (body, content_type) = realize_body(operation, config, input.into_body()?)?;

    let uri = compose_url(config, &path, &mut query, host_prefix.as_deref())?;

    apply_checksum(operation, config, &mut headers, &body)?;

    // Standard headers. Anything the emitter or a middleware already set wins.
    let authority = uri.authority().expect("compose_url validated the authority");
    if !headers.contains_key(HOST) {
        insert_header(&mut headers, HOST.as_str(), authority.as_str())?;
    }
    if !headers.contains_key(USER_AGENT) {
        insert_header(&mut headers, USER_AGENT.as_str(), LIBRARY_USER_AGENT)?;
    }
    let method = operation.method().clone();
    let body_allowed = method != Method::GET && method != Method::HEAD;
    if body_allowed && !body.is_empty() {
        if !headers.contains_key(CONTENT_TYPE) {
            insert_header(&mut headers, CONTENT_TYPE.as_str(), content_type)?;
        }
        if let Some(length) = body.content_length() {
            if !headers.contains_key(CONTENT_LENGTH) {
                insert_header(&mut headers, CONTENT_LENGTH.as_str(), &length.to_string())?;
            }
        }
    }

    Ok(AwsRequest {
        operation: operation.name(),
        protocol: config.protocol(),
        region: config.region().to_string(),
        method,
        uri,
        headers,
        body,
    })
}

fn distribute_member(
    location: MemberLocation,
    value: MemberValue,
    headers: &mut HeaderMap,
    path: &mut String,
    query: &mut Vec<(String, String)>,
    host_prefix: &mut Option<String>,
) -> Result<(), BuildError> {
    match (location, value) {
        (MemberLocation::Header(name), MemberValue::Single(value)) => {
            insert_header(headers, name, &value)
        }
        (MemberLocation::Header(name), MemberValue::List(values)) => {
            insert_header(headers, name, &values.join(","))
        }
        (MemberLocation::HeaderPrefix(prefix), MemberValue::Map(entries)) => {
            for (key, value) in entries {
                insert_header(headers, &format!("{}{}", prefix, key), &value)?;
            }
            Ok(())
        }
        (MemberLocation::Querystring(name), MemberValue::Single(value)) => {
            query.push((name.to_string(), value));
            Ok(())
        }
        (MemberLocation::Querystring(name), MemberValue::List(values)) => {
            for value in values {
                query.push((name.to_string(), value));
            }
            Ok(())
        }
        (MemberLocation::Querystring(_), MemberValue::Map(entries)) => {
            query.extend(entries);
            Ok(())
        }
        (MemberLocation::Uri(name), MemberValue::Single(value)) => {
            substitute_path(path, name, &value, false)
        }
        (MemberLocation::UriGreedy(name), MemberValue::Single(value)) => {
            substitute_path(path, name, &value, true)
        }
        (MemberLocation::HostLabel(name), MemberValue::Single(value)) => {
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(BuildError::validation(name, "is not a valid host label"));
            }
            match host_prefix {
                Some(prefix) => {
                    *prefix = prefix.replace(&format!("{{{}}}", name), &value);
                    Ok(())
                }
                None => Err(BuildError::unencodable(
                    name,
                    "operation declares no host prefix template",
                )),
            }
        }
        (location, _) => Err(BuildError::unencodable(
            format!("{:?}", location),
            "value shape is not valid at this location",
        )),
    }
}

// `{name}` substitutes one path segment (slashes encoded); `{name+}`
// substitutes a path suffix (slashes preserved). Literal text in the
// template is the author's responsibility and passes through untouched.
fn substitute_path(
    path: &mut String,
    name: &str,
    value: &str,
    greedy: bool,
) -> Result<(), BuildError> {
    if value.is_empty() {
        return Err(BuildError::validation(name, "must not be empty"));
    }
    let placeholder = if greedy {
        format!("{{{}+}}", name)
    } else {
        format!("{{{}}}", name)
    };
    if !path.contains(&placeholder) {
        return Err(BuildError::unencodable(
            name,
            format!("path template has no `{}` placeholder", placeholder),
        ));
    }
    let set = if greedy { PATH_ENCODE_SET } else { STRICT_ENCODE_SET };
    let encoded = utf8_percent_encode(value, set).to_string();
    *path = path.replace(&placeholder, &encoded);
    Ok(())
}

fn realize_body(
    operation: &Operation,
    config: &ServiceConfig,
    body: BodyValue,
) -> Result<(SdkBody, &'static str), BuildError> {
    let protocol = config.protocol();
    let default_content_type = protocol.default_content_type();
    match (protocol, body) {
        (Protocol::Json | Protocol::RestJson, BodyValue::Json(value)) => {
            let encoded = serde_json::to_vec(&value).map_err(|err| {
                BuildError::unencodable(operation.name(), format!("body is not encodable: {}", err))
            })?;
            Ok((SdkBody::from(encoded), default_content_type))
        }
        (Protocol::Json | Protocol::RestJson, BodyValue::None) => {
            // JSON services expect a body on every mutating call
            let body = if matches!(*operation.method(), Method::PUT | Method::POST) {
                SdkBody::from("{}")
            } else {
                SdkBody::empty()
            };
            Ok((body, default_content_type))
        }
        (Protocol::RestJson, BodyValue::Payload(payload)) => {
            check_streaming(operation, config, &payload)?;
            Ok((payload, RAW_PAYLOAD_CONTENT_TYPE))
        }
        (Protocol::RestXml, BodyValue::Xml(node)) => Ok((
            SdkBody::from(node.render(config.xml_namespace())),
            default_content_type,
        )),
        (Protocol::RestXml, BodyValue::Payload(payload)) => {
            check_streaming(operation, config, &payload)?;
            Ok((payload, RAW_PAYLOAD_CONTENT_TYPE))
        }
        (Protocol::RestXml, BodyValue::None) => Ok((SdkBody::empty(), default_content_type)),
        (Protocol::Query | Protocol::Ec2Query, body) => {
            let map = match body {
                BodyValue::Query(map) => map,
                BodyValue::None => QueryMap::new(),
                other => {
                    return Err(BuildError::unencodable(
                        operation.name(),
                        format!("{:?} is not a query-protocol body", other),
                    ))
                }
            };
            let dialect = match protocol {
                Protocol::Ec2Query => QueryDialect::Ec2,
                _ => QueryDialect::Query,
            };
            let mut pairs = map.flatten(dialect);
            pairs.push(("Action".to_string(), operation.name().to_string()));
            pairs.push(("Version".to_string(), config.api_version().to_string()));
            pairs.sort();
            let mut body = String::new();
            for (i, (key, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    body.push('&');
                }
                body.push_str(&percent_encode_query(key));
                body.push('=');
                body.push_str(&percent_encode_query(value));
            }
            Ok((SdkBody::from(body), default_content_type))
        }
        (_, other) => Err(BuildError::unencodable(
            operation.name(),
            format!("{:?} is not valid under this protocol", other),
        )),
    }
}

fn check_streaming(
    operation: &Operation,
    config: &ServiceConfig,
    payload: &SdkBody,
) -> Result<(), BuildError> {
    if !payload.is_streaming() {
        return Ok(());
    }
    if !operation.flags().allow_streaming {
        return Err(BuildError::StreamingNotAllowed {
            operation: operation.name().to_string(),
        });
    }
    if payload.content_length().is_none()
        && (!operation.flags().allow_chunked_streaming
            || config.options().s3_disable_chunked_uploads)
    {
        return Err(BuildError::MissingContentLength);
    }
    Ok(())
}

fn compose_url(
    config: &ServiceConfig,
    path: &str,
    query: &mut Vec<(String, String)>,
    host_prefix: Option<&str>,
) -> Result<Uri, BuildError> {
    let endpoint = config.endpoint();
    let scheme = endpoint.scheme_str().unwrap_or("https");
    let authority = endpoint
        .authority()
        .ok_or_else(|| BuildError::invalid_url("endpoint has no host"))?;
    let authority = match host_prefix {
        Some(prefix) => format!("{}{}", prefix, authority),
        None => authority.to_string(),
    };

    // Split off query items the path template carried and merge them in.
    let mut path = path.to_string();
    if let Some(idx) = path.find('?') {
        let raw_query = path.split_off(idx);
        for (key, value) in form_urlencoded::parse(raw_query[1..].as_bytes()) {
            query.push((key.into_owned(), value.into_owned()));
        }
    }
    let base_path = endpoint.path().trim_end_matches('/');
    let mut full_path = format!("{}{}", base_path, path);
    if full_path.is_empty() {
        full_path.push('/');
    }

    // Sorted by (key, value); values already strings, encoding is strict and
    // assigned directly to the URI, never re-encoded.
    query.sort();
    let mut uri = format!("{}://{}{}", scheme, authority, full_path);
    if !query.is_empty() {
        uri.push('?');
        for (i, (key, value)) in query.iter().enumerate() {
            if i > 0 {
                uri.push('&');
            }
            uri.push_str(&percent_encode_query(key));
            uri.push('=');
            uri.push_str(&percent_encode_query(value));
        }
    }
    uri.parse().map_err(|err| {
        BuildError::invalid_url(format!("`{}` does not parse as a URL: {}", uri, err))
    })
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), BuildError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| BuildError::unencodable(name, format!("invalid header name: {}", err)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|err| BuildError::unencodable(name.as_str(), format!("invalid header value: {}", err)))?;
    headers.insert(name, value);
    Ok(())
}
