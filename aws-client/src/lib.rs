/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Execution pipeline for the aws-client runtime.
//!
//! The [`Client`] acquires credentials, builds and signs requests, runs the
//! middleware chain, dispatches through an injected [`Transport`], decodes
//! typed responses, and retries throttled and transient failures with
//! jittered exponential backoff. The [`paginator`] module drives
//! continuation-token pagination on top of it.

pub mod client;
pub mod credentials;
pub mod error;
pub mod metrics;
pub mod paginator;
pub mod transport;

pub use aws_client_http::{
    AwsRequest, BuildError, HttpResponse, Operation, Protocol, SdkBody, ServiceConfig,
};
pub use aws_client_types::Credentials;
pub use client::{CallOptions, Client};
pub use credentials::{ProvideCredentials, SharedCredentialsProvider, StaticCredentialsProvider};
pub use error::{SdkError, SdkErrorKind};
pub use transport::{TestConnection, Transport, TransportError};
