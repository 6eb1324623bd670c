/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! SigV4 request signing.
//!
//! This crate implements the provider's Signature Version 4 protocol for
//! HTTP requests: header-based signing, presigned URLs (signature in the
//! query string), and chained chunk signatures for `aws-chunked` streaming
//! uploads.

pub mod chunked;
pub mod date_time;
pub mod http_request;
pub mod sign;
mod types;

pub use types::SigningOutput;
