/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The executor: credentials → build → middleware → sign → dispatch →
//! decode, with bounded, jittered retries.

use crate::credentials::{ProvideCredentials, SharedCredentialsProvider, StaticCredentialsProvider};
use crate::error::{BoxError, SdkError, SdkErrorKind};
use crate::metrics::Metrics;
use crate::transport::{Transport, TransportError};
use aws_client_http::body::ChunkedSigningStream;
use aws_client_http::builder::build_request;
use aws_client_http::middleware::{run_chain, Middleware, MiddlewareContext};
use aws_client_http::response::{classify_response, parse_generic_error};
use aws_client_http::shape::OperationInput;
use aws_client_http::{AwsRequest, BuildError, HttpResponse, Operation, SdkBody, ServiceConfig};
use aws_client_sigv4::chunked::{signed_body_length, ChunkSigner, DEFAULT_CHUNK_SIZE};
use aws_client_sigv4::http_request::{
    sign, PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest,
    SignatureLocation, SigningParams, SigningSettings,
};
use aws_client_types::retry::RetryKind;
use aws_client_types::Credentials;
use http::{StatusCode, Uri};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level};

const MAX_BACKOFF: Duration = Duration::from_secs(20);

/// Per-call options.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct CallOptions {
    /// Cooperative cancellation for this call. The executor checks the
    /// token at every suspension point and aborts in-flight dispatches.
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    /// Options carrying a cancellation token.
    pub fn cancellable(token: CancellationToken) -> Self {
        Self {
            cancellation: Some(token),
        }
    }
}

/// A client for one service.
///
/// Holds the immutable [`ServiceConfig`], the credential provider, the
/// injected transport, a per-client request-id counter, and the shutdown
/// flag. Cheap to share behind an `Arc`; all per-call state is owned by
/// the call itself.
#[derive(Debug)]
pub struct Client {
    config: Arc<ServiceConfig>,
    credentials_provider: SharedCredentialsProvider,
    transport: Arc<dyn Transport>,
    middlewares: Vec<Arc<dyn Middleware>>,
    next_request_id: AtomicU64,
    shutdown: AtomicBool,
    metrics: Metrics,
    backoff_base: fn() -> f64,
}

impl Client {
    /// Returns a builder. `config`, a credential source, and a transport
    /// are required.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The client's metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Executes one operation and decodes the typed output.
    pub async fn call<I, T, F>(
        &self,
        operation: &Operation,
        input: I,
        decode: F,
    ) -> Result<T, SdkError>
    where
        I: OperationInput,
        F: Fn(HttpResponse) -> Result<T, BoxError>,
    {
        self.call_with_options(operation, input, decode, CallOptions::default())
            .await
    }

    /// Executes one operation with per-call options.
    pub async fn call_with_options<I, T, F>(
        &self,
        operation: &Operation,
        input: I,
        decode: F,
        options: CallOptions,
    ) -> Result<T, SdkError>
    where
        I: OperationInput,
        F: Fn(HttpResponse) -> Result<T, BoxError>,
    {
        self.ensure_active()?;
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let span = tracing::info_span!(
            "request",
            request_id,
            service = self.config.service_id(),
            operation = operation.name(),
        );
        async {
            self.metrics
                .record_request(self.config.service_id(), operation.name());
            let started = Instant::now();
            let result = self.run_attempts(operation, input, &decode, &options).await;
            self.metrics.observe_duration(
                self.config.service_id(),
                operation.name(),
                started.elapsed().as_secs_f64(),
            );
            if let Err(err) = &result {
                self.metrics
                    .record_error(self.config.service_id(), operation.name());
                log_failure(self.config.error_log_level(), err);
            }
            result
        }
        .instrument(span)
        .await
        .map_err(|err| err.with_request_id(request_id))
    }

    /// Produces a presigned URL for the operation, valid for `expires_in`.
    pub async fn presign_url<I: OperationInput>(
        &self,
        operation: &Operation,
        input: I,
        expires_in: Duration,
    ) -> Result<Uri, SdkError> {
        self.ensure_active()?;
        let credentials = self
            .credentials_provider
            .provide_credentials()
            .await
            .map_err(|err| SdkError::new(SdkErrorKind::CredentialsUnavailable(err)))?;

        let request = build_request(operation, input, &self.config)?;
        let context = MiddlewareContext {
            operation,
            config: &self.config,
        };
        let request = run_chain(
            request,
            &context,
            self.config.middlewares().iter().chain(self.middlewares.iter()),
        )?;

        let mut settings = SigningSettings::default();
        settings.signature_location = SignatureLocation::QueryParams;
        settings.expires_in = Some(expires_in);
        settings.percent_encoding_mode = self.percent_encoding_mode();
        let params = SigningParams {
            credentials: &credentials,
            region: &request.region,
            name: self.config.signing_name(),
            time: SystemTime::now(),
            settings,
        };
        let instructions = {
            let signable = SignableRequest::new(
                &request.method,
                &request.uri,
                &request.headers,
                SignableBody::UnsignedPayload,
            );
            sign(signable, &params)?.into_parts().0
        };
        let mut http_request = request.into_http();
        instructions.apply_to_request(&mut http_request);
        Ok(http_request.into_parts().0.uri)
    }

    /// Shuts the client down.
    ///
    /// Idempotent at the flag level: the first call wins and shuts down the
    /// credential provider; later calls (and later `call`s) fail with
    /// `AlreadyShutdown`. Calls already in flight run to completion.
    pub async fn shutdown(&self) -> Result<(), SdkError> {
        if self
            .shutdown
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SdkError::new(SdkErrorKind::AlreadyShutdown));
        }
        self.credentials_provider.shutdown().await;
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), SdkError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(SdkError::new(SdkErrorKind::AlreadyShutdown));
        }
        Ok(())
    }

    fn percent_encoding_mode(&self) -> PercentEncodingMode {
        // The object-storage service signs the encoded path verbatim.
        if self.config.signing_name() == "s3" {
            PercentEncodingMode::Single
        } else {
            PercentEncodingMode::Double
        }
    }

    async fn run_attempts<I, T, F>(
        &self,
        operation: &Operation,
        input: I,
        decode: &F,
        options: &CallOptions,
    ) -> Result<T, SdkError>
    where
        I: OperationInput,
        F: Fn(HttpResponse) -> Result<T, BoxError>,
    {
        let cancel = options.cancellation.clone().unwrap_or_default();
        check_cancel(&cancel)?;
        let credentials = self
            .credentials_provider
            .provide_credentials()
            .await
            .map_err(|err| SdkError::new(SdkErrorKind::CredentialsUnavailable(err)))?;
        check_cancel(&cancel)?;

        let request = build_request(operation, input, &self.config)?;
        let context = MiddlewareContext {
            operation,
            config: &self.config,
        };
        let request = run_chain(
            request,
            &context,
            self.config.middlewares().iter().chain(self.middlewares.iter()),
        )?;

        // Streams cannot be replayed; they get exactly one attempt.
        let replayable = request.body.try_clone().is_some();
        let max_attempts = if replayable {
            self.config.max_attempts()
        } else {
            1
        };
        let mut original = Some(request);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let request = if attempt < max_attempts {
                original
                    .as_ref()
                    .and_then(AwsRequest::try_clone)
                    .expect("replayable request can be cloned")
            } else {
                original.take().expect("the final attempt consumes the request")
            };
            check_cancel(&cancel)?;

            let (retry, err) = match self
                .single_attempt(operation, request, &credentials, &cancel)
                .await
            {
                Ok(response) if response.status.as_u16() < 300 => {
                    check_cancel(&cancel)?;
                    log_response(self.config.request_log_level(), response.status);
                    return decode(response)
                        .map_err(|err| SdkError::new(SdkErrorKind::Decode(err)));
                }
                Ok(response) => self.response_error(response, &cancel).await?,
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Transport(err)) => {
                    let retry = if err.retryable {
                        RetryKind::Error(aws_client_types::retry::ErrorKind::TransientError)
                    } else {
                        RetryKind::NotRetryable
                    };
                    (
                        retry,
                        SdkError::new(SdkErrorKind::Transport {
                            retryable: err.retryable,
                            source: err.source,
                        }),
                    )
                }
            };

            let delay = match retry {
                RetryKind::Explicit(delay) => Some(delay),
                RetryKind::Error(kind) if kind.is_retryable() => Some(self.backoff(attempt)),
                _ => None,
            };
            match delay {
                Some(delay) if attempt < max_attempts => {
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after backoff"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => {
                            return Err(SdkError::new(SdkErrorKind::Cancelled));
                        }
                    }
                }
                _ => return Err(err),
            }
        }
    }

    // Buffers and parses a failed response, producing the retry decision
    // and the typed error for when retries run out.
    async fn response_error(
        &self,
        response: HttpResponse,
        cancel: &CancellationToken,
    ) -> Result<(RetryKind, SdkError), SdkError> {
        check_cancel(cancel)?;
        let status = response.status;
        let headers = response.headers;
        let body = response
            .body
            .collect()
            .await
            .map_err(|err| SdkError::new(SdkErrorKind::Decode(err)))?;
        let metadata = parse_generic_error(self.config.protocol(), &headers, &body);
        let retry = classify_response(status, metadata.code(), &headers);

        let kind = if status == StatusCode::NOT_FOUND {
            SdkErrorKind::NotFound {
                code: metadata.code().map(str::to_string),
                message: metadata.message().map(str::to_string),
                service_request_id: metadata.request_id().map(str::to_string),
            }
        } else {
            match &retry {
                RetryKind::Explicit(delay) => SdkErrorKind::Throttle {
                    status,
                    code: metadata.code().map(str::to_string),
                    message: metadata.message().map(str::to_string),
                    retry_after: Some(*delay),
                },
                RetryKind::Error(aws_client_types::retry::ErrorKind::ThrottlingError) => {
                    SdkErrorKind::Throttle {
                        status,
                        code: metadata.code().map(str::to_string),
                        message: metadata.message().map(str::to_string),
                        retry_after: None,
                    }
                }
                _ => SdkErrorKind::Http {
                    status,
                    code: metadata.code().map(str::to_string),
                    message: metadata.message().map(str::to_string),
                    service_request_id: metadata.request_id().map(str::to_string),
                },
            }
        };
        Ok((retry, SdkError::new(kind)))
    }

    async fn single_attempt(
        &self,
        operation: &Operation,
        request: AwsRequest,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, AttemptError> {
        let http_request = self
            .sign_request(operation, request, credentials)
            .map_err(AttemptError::Fatal)?;
        log_dispatch(
            self.config.request_log_level(),
            http_request.method(),
            http_request.uri(),
        );
        if cancel.is_cancelled() {
            return Err(AttemptError::Fatal(SdkError::new(SdkErrorKind::Cancelled)));
        }
        tokio::select! {
            result = self.transport.dispatch(http_request, self.config.timeout()) => {
                result.map_err(AttemptError::Transport)
            }
            _ = cancel.cancelled() => {
                Err(AttemptError::Fatal(SdkError::new(SdkErrorKind::Cancelled)))
            }
        }
    }

    // Signs the request headers; for chunked uploads, also seeds the chunk
    // signature chain and wraps the body into the framed stream.
    fn sign_request(
        &self,
        operation: &Operation,
        mut request: AwsRequest,
        credentials: &Credentials,
    ) -> Result<http::Request<SdkBody>, SdkError> {
        // Empty credentials disable signing entirely.
        if credentials.is_empty() {
            return Ok(request.into_http());
        }
        let config = &self.config;
        let chunked = request.body.is_streaming()
            && operation.flags().allow_chunked_streaming
            && !config.options().s3_disable_chunked_uploads;
        let now = SystemTime::now();

        if chunked {
            // These headers participate in the signature, so they go in
            // before signing.
            request
                .insert_header("content-encoding", "aws-chunked")
                .expect("static header");
            if let Some(decoded) = request.body.content_length() {
                request
                    .insert_header("x-amz-decoded-content-length", &decoded.to_string())
                    .expect("numeric header");
                request
                    .insert_header(
                        "content-length",
                        &signed_body_length(decoded, DEFAULT_CHUNK_SIZE as u64).to_string(),
                    )
                    .expect("numeric header");
            }
        }

        let is_s3 = config.signing_name() == "s3";
        let mut settings = SigningSettings::default();
        settings.percent_encoding_mode = self.percent_encoding_mode();
        if is_s3 || chunked {
            settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
        }
        let params = SigningParams {
            credentials,
            region: &request.region,
            name: config.signing_name(),
            time: now,
            settings,
        };
        let (instructions, signature) = {
            let signable_body = if chunked {
                SignableBody::StreamingChunks
            } else if request.body.is_streaming() {
                SignableBody::UnsignedPayload
            } else {
                SignableBody::Bytes(request.body.bytes().unwrap_or_default())
            };
            let signable = SignableRequest::new(
                &request.method,
                &request.uri,
                &request.headers,
                signable_body,
            );
            sign(signable, &params)?.into_parts()
        };

        if chunked {
            let body = std::mem::replace(&mut request.body, SdkBody::empty());
            let stream = body
                .try_into_stream()
                .expect("chunked signing only wraps streaming bodies");
            let signer = ChunkSigner::new(
                credentials,
                now,
                &request.region,
                config.signing_name(),
                signature,
            );
            request.body = SdkBody::from_stream(ChunkedSigningStream::new(stream, signer));
        }

        let mut http_request = request.into_http();
        instructions.apply_to_request(&mut http_request);
        Ok(http_request)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let jitter = (self.backoff_base)();
        let factor = 2f64.powi(attempt.saturating_sub(1) as i32);
        self.config
            .retry_base()
            .mul_f64(jitter * factor)
            .min(MAX_BACKOFF)
    }
}

enum AttemptError {
    Fatal(SdkError),
    Transport(TransportError),
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), SdkError> {
    if cancel.is_cancelled() {
        return Err(SdkError::new(SdkErrorKind::Cancelled));
    }
    Ok(())
}

fn log_failure(level: Level, err: &SdkError) {
    if level == Level::ERROR {
        tracing::error!(error = %err, "request failed");
    } else if level == Level::WARN {
        tracing::warn!(error = %err, "request failed");
    } else if level == Level::INFO {
        tracing::info!(error = %err, "request failed");
    } else if level == Level::DEBUG {
        tracing::debug!(error = %err, "request failed");
    } else {
        tracing::trace!(error = %err, "request failed");
    }
}

fn log_dispatch(level: Level, method: &http::Method, uri: &Uri) {
    if level == Level::ERROR {
        tracing::error!(%method, %uri, "dispatching request");
    } else if level == Level::WARN {
        tracing::warn!(%method, %uri, "dispatching request");
    } else if level == Level::INFO {
        tracing::info!(%method, %uri, "dispatching request");
    } else if level == Level::DEBUG {
        tracing::debug!(%method, %uri, "dispatching request");
    } else {
        tracing::trace!(%method, %uri, "dispatching request");
    }
}

fn log_response(level: Level, status: StatusCode) {
    if level == Level::DEBUG {
        tracing::debug!(status = status.as_u16(), "request succeeded");
    } else if level == Level::TRACE {
        tracing::trace!(status = status.as_u16(), "request succeeded");
    } else {
        tracing::info!(status = status.as_u16(), "request succeeded");
    }
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct Builder {
    config: Option<ServiceConfig>,
    credentials_provider: Option<SharedCredentialsProvider>,
    transport: Option<Arc<dyn Transport>>,
    middlewares: Vec<Arc<dyn Middleware>>,
    backoff_base: Option<fn() -> f64>,
}

impl Builder {
    /// Sets the service configuration (required).
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the credential provider (this or [`credentials`](Self::credentials)
    /// is required).
    pub fn credentials_provider(mut self, provider: SharedCredentialsProvider) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    /// Uses fixed credentials.
    pub fn credentials(self, credentials: Credentials) -> Self {
        self.credentials_provider(SharedCredentialsProvider::new(
            StaticCredentialsProvider::new(credentials),
        ))
    }

    /// Sets the transport (required).
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Appends a client middleware. Client middlewares run after the
    /// service-declared ones.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Replaces the random backoff jitter with a static base, for
    /// deterministic tests.
    pub fn with_static_backoff_base(mut self, base: fn() -> f64) -> Self {
        self.backoff_base = Some(base);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<Client, SdkError> {
        let config = self
            .config
            .ok_or_else(|| BuildError::validation("config", "is required"))?;
        let credentials_provider = self
            .credentials_provider
            .ok_or_else(|| BuildError::validation("credentials_provider", "is required"))?;
        let transport = self
            .transport
            .ok_or_else(|| BuildError::validation("transport", "is required"))?;
        Ok(Client {
            config: Arc::new(config),
            credentials_provider,
            transport,
            middlewares: self.middlewares,
            next_request_id: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            metrics: Metrics::new(),
            backoff_base: self.backoff_base.unwrap_or(fastrand::f64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Client;
    use crate::transport::TestConnection;
    use aws_client_http::{Protocol, ServiceConfig};
    use aws_client_types::Credentials;

    fn test_client(conn: TestConnection) -> Client {
        let config = ServiceConfig::builder()
            .service_id("testsvc")
            .region("us-east-1")
            .endpoint("https://testsvc.us-east-1.amazonaws.com")
            .api_version("2020-01-01")
            .protocol(Protocol::RestJson)
            .build()
            .unwrap();
        Client::builder()
            .config(config)
            .credentials(Credentials::from_keys("AKID", "secret", None))
            .transport(conn)
            .build()
            .unwrap()
    }

    #[test]
    fn backoff_is_bounded_and_exponential() {
        let config = ServiceConfig::builder()
            .service_id("testsvc")
            .region("us-east-1")
            .endpoint("https://testsvc.us-east-1.amazonaws.com")
            .api_version("2020-01-01")
            .protocol(Protocol::RestJson)
            .build()
            .unwrap();
        let base = config.retry_base();
        let client = Client::builder()
            .config(config)
            .credentials(Credentials::from_keys("AKID", "secret", None))
            .transport(TestConnection::default())
            .with_static_backoff_base(|| 1.0)
            .build()
            .unwrap();
        assert_eq!(client.backoff(1), base);
        assert_eq!(client.backoff(2), base * 2);
        assert_eq!(client.backoff(3), base * 4);
        assert_eq!(client.backoff(32), super::MAX_BACKOFF);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_at_the_flag() {
        let client = test_client(TestConnection::default());
        client.shutdown().await.unwrap();
        client
            .shutdown()
            .await
            .expect_err("second shutdown reports AlreadyShutdown");
        client.ensure_active().expect_err("calls fail after shutdown");
    }
}
