/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Request shaping for the aws-client runtime.
//!
//! This crate turns `(operation, input, config)` into a signed-ready
//! [`AwsRequest`](request::AwsRequest) under one of the five wire protocols,
//! computes integrity checksums, runs the middleware chain, and decodes
//! responses and error envelopes.

pub mod body;
pub mod builder;
pub mod checksum;
pub mod config;
pub mod error;
pub mod middleware;
pub mod operation;
pub mod protocol;
pub mod query;
pub mod request;
pub mod response;
pub mod shape;
pub mod xml;

pub use body::SdkBody;
pub use builder::build_request;
pub use config::ServiceConfig;
pub use error::BuildError;
pub use operation::Operation;
pub use protocol::Protocol;
pub use request::AwsRequest;
pub use response::HttpResponse;
