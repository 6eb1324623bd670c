/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Utilities to sign HTTP requests.
//!
//! Header signing augments the request with `x-amz-date`, optional
//! `x-amz-content-sha256`/`x-amz-security-token`, and `authorization`.
//! Query signing produces the `X-Amz-*` parameters of a presigned URL,
//! with `X-Amz-Signature` appended last.

pub(crate) mod canonical_request;
mod error;
mod query_writer;
mod settings;
mod sign;
pub mod url_escape;

pub use error::SigningError;
pub use query_writer::QueryWriter;
pub use settings::{
    PayloadChecksumKind, PercentEncodingMode, SignatureLocation, SigningParams, SigningSettings,
};
pub use sign::{sign, Header, SignableBody, SignableRequest, SigningInstructions};
