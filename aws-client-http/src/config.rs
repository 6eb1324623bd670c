/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Per-service configuration.

use crate::error::BuildError;
use crate::middleware::Middleware;
use crate::protocol::Protocol;
use http::Uri;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(500);

/// Feature toggles that alter request construction.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct ServiceOptions {
    /// Disables signed chunked uploads for the object-storage service;
    /// streaming bodies of known length are signed as unsigned payloads
    /// instead.
    pub s3_disable_chunked_uploads: bool,

    /// Computes `content-md5` for operations that declare the MD5 checksum
    /// header.
    pub calculate_md5: bool,
}

/// Immutable description of one service endpoint: who to talk to, which
/// protocol to speak, and how to sign.
///
/// A `ServiceConfig` is built once and shared for the life of the client.
#[derive(Clone)]
pub struct ServiceConfig {
    service_id: String,
    signing_name: String,
    region: String,
    endpoint: Uri,
    api_version: String,
    protocol: Protocol,
    amz_target: Option<String>,
    xml_namespace: Option<String>,
    timeout: Duration,
    max_attempts: u32,
    retry_base: Duration,
    options: ServiceOptions,
    error_log_level: tracing::Level,
    request_log_level: tracing::Level,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("service_id", &self.service_id)
            .field("signing_name", &self.signing_name)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("protocol", &self.protocol)
            .field("amz_target", &self.amz_target)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl ServiceConfig {
    /// Returns a builder. `service_id`, `region`, `endpoint`, `protocol`,
    /// and `api_version` are required.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The service identifier, e.g. `dynamodb`.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// The name used in the credential scope. Defaults to the service id.
    pub fn signing_name(&self) -> &str {
        &self.signing_name
    }

    /// The region requests are signed for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// The API version, sent as `Version` under the query protocols.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// The wire protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The `x-amz-target` prefix for JSON-RPC style services.
    pub fn amz_target(&self) -> Option<&str> {
        self.amz_target.as_deref()
    }

    /// The default XML namespace for `rest-xml` bodies.
    pub fn xml_namespace(&self) -> Option<&str> {
        self.xml_namespace.as_deref()
    }

    /// Per-attempt dispatch timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upper bound on attempts (first try included).
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base delay for exponential backoff.
    pub fn retry_base(&self) -> Duration {
        self.retry_base
    }

    /// Feature toggles.
    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    /// Level at which request failures are logged.
    pub fn error_log_level(&self) -> tracing::Level {
        self.error_log_level
    }

    /// Level at which dispatched requests are logged.
    pub fn request_log_level(&self) -> tracing::Level {
        self.request_log_level
    }

    /// Service-declared middlewares, run before client-declared ones.
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Default)]
pub struct Builder {
    service_id: Option<String>,
    signing_name: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    api_version: Option<String>,
    protocol: Option<Protocol>,
    amz_target: Option<String>,
    xml_namespace: Option<String>,
    timeout: Option<Duration>,
    max_attempts: Option<u32>,
    retry_base: Option<Duration>,
    options: ServiceOptions,
    error_log_level: Option<tracing::Level>,
    request_log_level: Option<tracing::Level>,
    middlewares: Vec<Arc<dyn Middleware>>,
    allow_http: bool,
}

impl Builder {
    /// Sets the service identifier (required).
    pub fn service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    /// Sets the signing name when it differs from the service id.
    pub fn signing_name(mut self, signing_name: impl Into<String>) -> Self {
        self.signing_name = Some(signing_name.into());
        self
    }

    /// Sets the region (required).
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the endpoint URL (required).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the API version (required).
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Sets the wire protocol (required).
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Sets the `x-amz-target` prefix.
    pub fn amz_target(mut self, amz_target: impl Into<String>) -> Self {
        self.amz_target = Some(amz_target.into());
        self
    }

    /// Sets the default XML namespace.
    pub fn xml_namespace(mut self, xml_namespace: impl Into<String>) -> Self {
        self.xml_namespace = Some(xml_namespace.into());
        self
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the attempt bound.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Sets the backoff base delay.
    pub fn retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = Some(retry_base);
        self
    }

    /// Sets the feature toggles.
    pub fn options(mut self, options: ServiceOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the level for failure logs.
    pub fn error_log_level(mut self, level: tracing::Level) -> Self {
        self.error_log_level = Some(level);
        self
    }

    /// Sets the level for request logs.
    pub fn request_log_level(mut self, level: tracing::Level) -> Self {
        self.request_log_level = Some(level);
        self
    }

    /// Appends a service middleware.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Permits `http://` endpoints (local stacks, tests).
    pub fn allow_http(mut self, allow_http: bool) -> Self {
        self.allow_http = allow_http;
        self
    }

    /// Validates and builds the `ServiceConfig`.
    pub fn build(self) -> Result<ServiceConfig, BuildError> {
        let service_id = self
            .service_id
            .ok_or_else(|| BuildError::validation("service_id", "is required"))?;
        let region = self
            .region
            .ok_or_else(|| BuildError::validation("region", "is required"))?;
        let protocol = self
            .protocol
            .ok_or_else(|| BuildError::validation("protocol", "is required"))?;
        let api_version = self
            .api_version
            .ok_or_else(|| BuildError::validation("api_version", "is required"))?;
        let endpoint = self
            .endpoint
            .ok_or_else(|| BuildError::validation("endpoint", "is required"))?;

        let endpoint = if endpoint.contains("://") {
            endpoint
        } else {
            format!("https://{}", endpoint)
        };
        let endpoint: Uri = endpoint
            .parse()
            .map_err(|err| BuildError::InvalidUrl {
                reason: format!("endpoint does not parse: {}", err),
            })?;
        if endpoint.host().map(str::is_empty).unwrap_or(true) {
            return Err(BuildError::invalid_url("endpoint has no host"));
        }
        match endpoint.scheme_str() {
            Some("https") => {}
            Some("http") if self.allow_http => {}
            Some(other) => {
                return Err(BuildError::invalid_url(format!(
                    "endpoint scheme must be https, got {}",
                    other
                )))
            }
            None => return Err(BuildError::invalid_url("endpoint has no scheme")),
        }

        Ok(ServiceConfig {
            signing_name: self.signing_name.unwrap_or_else(|| service_id.clone()),
            service_id,
            region,
            endpoint,
            api_version,
            protocol,
            amz_target: self.amz_target,
            xml_namespace: self.xml_namespace,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            retry_base: self.retry_base.unwrap_or(DEFAULT_RETRY_BASE),
            options: self.options,
            error_log_level: self.error_log_level.unwrap_or(tracing::Level::ERROR),
            request_log_level: self.request_log_level.unwrap_or(tracing::Level::DEBUG),
            middlewares: self.middlewares,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceConfig;
    use crate::protocol::Protocol;

    fn base_builder() -> super::Builder {
        ServiceConfig::builder()
            .service_id("sqs")
            .region("us-east-1")
            .endpoint("https://sqs.us-east-1.amazonaws.com")
            .api_version("2012-11-05")
            .protocol(Protocol::Query)
    }

    #[test]
    fn defaults_are_applied() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.signing_name(), "sqs");
        assert_eq!(config.max_attempts(), 4);
        assert_eq!(config.endpoint().scheme_str(), Some("https"));
    }

    #[test]
    fn schemeless_endpoints_become_https() {
        let config = base_builder()
            .endpoint("sqs.us-east-1.amazonaws.com")
            .build()
            .unwrap();
        assert_eq!(config.endpoint().scheme_str(), Some("https"));
    }

    #[test]
    fn http_requires_opt_in() {
        base_builder()
            .endpoint("http://localhost:9000")
            .build()
            .expect_err("plain http must be opted into");
        base_builder()
            .endpoint("http://localhost:9000")
            .allow_http(true)
            .build()
            .expect("http allowed after opt-in");
    }

    #[test]
    fn missing_required_fields_fail() {
        ServiceConfig::builder()
            .region("us-east-1")
            .build()
            .expect_err("service_id is required");
    }
}
