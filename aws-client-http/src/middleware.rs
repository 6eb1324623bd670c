/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Ordered request transformations applied between building and signing.
//!
//! Because the chain runs before the signer, anything a middleware changes
//! is covered by the signature.

use crate::config::ServiceConfig;
use crate::operation::Operation;
use crate::request::AwsRequest;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by middlewares.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Read-only context handed to each middleware.
#[derive(Debug)]
pub struct MiddlewareContext<'a> {
    /// The operation being dispatched.
    pub operation: &'a Operation,
    /// The service configuration.
    pub config: &'a ServiceConfig,
}

/// A composable transformation of a built request.
pub trait Middleware: Send + Sync + fmt::Debug {
    /// A short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Transforms the request. Returning an error aborts the call.
    fn apply(
        &self,
        request: AwsRequest,
        context: &MiddlewareContext<'_>,
    ) -> Result<AwsRequest, BoxError>;
}

/// A middleware failure, annotated with the middleware that raised it.
#[derive(Debug, Error)]
#[error("middleware `{middleware}` failed: {source}")]
pub struct MiddlewareError {
    /// The failing middleware's name.
    pub middleware: &'static str,
    /// The underlying failure.
    #[source]
    pub source: BoxError,
}

/// Runs `middlewares` over `request` in order, stopping at the first
/// failure. Callers pass service-declared middlewares first, then
/// client-declared ones.
pub fn run_chain<'a>(
    mut request: AwsRequest,
    context: &MiddlewareContext<'_>,
    middlewares: impl IntoIterator<Item = &'a Arc<dyn Middleware>>,
) -> Result<AwsRequest, MiddlewareError> {
    for middleware in middlewares {
        tracing::trace!(middleware = middleware.name(), "applying middleware");
        request = middleware
            .apply(request, context)
            .map_err(|source| MiddlewareError {
                middleware: middleware.name(),
                source,
            })?;
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::{run_chain, BoxError, Middleware, MiddlewareContext};
    use crate::body::SdkBody;
    use crate::config::ServiceConfig;
    use crate::operation::Operation;
    use crate::protocol::Protocol;
    use crate::request::AwsRequest;
    use http::Method;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Stamp(&'static str, &'static str);

    impl Middleware for Stamp {
        fn name(&self) -> &'static str {
            "stamp"
        }

        fn apply(
            &self,
            mut request: AwsRequest,
            _context: &MiddlewareContext<'_>,
        ) -> Result<AwsRequest, BoxError> {
            request.insert_header(self.0, self.1)?;
            Ok(request)
        }
    }

    #[derive(Debug)]
    struct Fails;

    impl Middleware for Fails {
        fn name(&self) -> &'static str {
            "fails"
        }

        fn apply(
            &self,
            _request: AwsRequest,
            _context: &MiddlewareContext<'_>,
        ) -> Result<AwsRequest, BoxError> {
            Err("nope".into())
        }
    }

    fn test_request() -> AwsRequest {
        AwsRequest {
            operation: "TestOperation",
            protocol: Protocol::RestJson,
            region: "us-east-1".to_string(),
            method: Method::GET,
            uri: "https://example.amazonaws.com/".parse().unwrap(),
            headers: http::HeaderMap::new(),
            body: SdkBody::empty(),
        }
    }

    fn test_config() -> ServiceConfig {
        ServiceConfig::builder()
            .service_id("example")
            .region("us-east-1")
            .endpoint("https://example.amazonaws.com")
            .api_version("2020-01-01")
            .protocol(Protocol::RestJson)
            .build()
            .unwrap()
    }

    #[test]
    fn chain_runs_in_order() {
        let config = test_config();
        let operation = Operation::new("TestOperation", Method::GET, "/");
        let context = MiddlewareContext {
            operation: &operation,
            config: &config,
        };
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Stamp("x-first", "1")),
            Arc::new(Stamp("x-first", "2")),
        ];
        let request = run_chain(test_request(), &context, chain.iter()).unwrap();
        // later middlewares see (and override) earlier output
        assert_eq!(request.header_str("x-first"), Some("2"));
    }

    #[test]
    fn failure_aborts_the_chain() {
        let config = test_config();
        let operation = Operation::new("TestOperation", Method::GET, "/");
        let context = MiddlewareContext {
            operation: &operation,
            config: &config,
        };
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(Fails)];
        let err = run_chain(test_request(), &context, chain.iter()).unwrap_err();
        assert_eq!(err.middleware, "fails");
    }
}
