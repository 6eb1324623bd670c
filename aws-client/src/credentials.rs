/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The credential-provider seam.
//!
//! Discovery mechanics (environment, instance metadata, assumed roles)
//! live behind this interface; implementations may cache and refresh
//! transparently. The executor fetches once per call and never retries a
//! provider failure.

use async_trait::async_trait;
use aws_client_types::Credentials;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by credential providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CredentialsError {
    /// The provider had nothing to offer.
    #[error("no credentials were loaded")]
    NotLoaded,

    /// Provider-specific failure.
    #[error("{0}")]
    Unhandled(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// An asynchronous credential provider.
#[async_trait]
pub trait ProvideCredentials: Send + Sync + fmt::Debug {
    /// Produces credentials for the next request. May suspend (network
    /// fetch, cache refresh).
    async fn provide_credentials(&self) -> Result<Credentials, CredentialsError>;

    /// Releases provider resources. Called once, from `Client::shutdown`.
    async fn shutdown(&self) {}
}

/// A cheaply cloneable, shared credential provider.
#[derive(Clone, Debug)]
pub struct SharedCredentialsProvider(Arc<dyn ProvideCredentials>);

impl SharedCredentialsProvider {
    /// Wraps `provider`.
    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        Self(Arc::new(provider))
    }
}

#[async_trait]
impl ProvideCredentials for SharedCredentialsProvider {
    async fn provide_credentials(&self) -> Result<Credentials, CredentialsError> {
        self.0.provide_credentials().await
    }

    async fn shutdown(&self) {
        self.0.shutdown().await
    }
}

/// Serves a fixed set of credentials forever.
#[derive(Clone, Debug)]
pub struct StaticCredentialsProvider {
    credentials: Credentials,
}

impl StaticCredentialsProvider {
    /// Creates a provider that always returns `credentials`.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl ProvideCredentials for StaticCredentialsProvider {
    async fn provide_credentials(&self) -> Result<Credentials, CredentialsError> {
        Ok(self.credentials.clone())
    }
}

#[async_trait]
impl ProvideCredentials for Credentials {
    async fn provide_credentials(&self) -> Result<Credentials, CredentialsError> {
        Ok(self.clone())
    }
}
