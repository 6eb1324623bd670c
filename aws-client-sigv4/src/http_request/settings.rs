/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_client_types::Credentials;
use std::time::{Duration, SystemTime};

/// HTTP-specific signing settings.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct SigningSettings {
    /// Whether the canonical URI should be double percent-encoded.
    ///
    /// The object-storage service signs the (already encoded) path verbatim;
    /// every other service requires a second encoding pass.
    pub percent_encoding_mode: PercentEncodingMode,

    /// Whether to add an `x-amz-content-sha256` header carrying the payload
    /// hash. Required by the object-storage service.
    pub payload_checksum_kind: PayloadChecksumKind,

    /// Where the signature is placed: request headers, or the query string
    /// (presigned URLs).
    pub signature_location: SignatureLocation,

    /// How long a presigned URL stays valid. Required for query signing.
    pub expires_in: Option<Duration>,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            percent_encoding_mode: PercentEncodingMode::Double,
            payload_checksum_kind: PayloadChecksumKind::NoHeader,
            signature_location: SignatureLocation::Headers,
            expires_in: None,
        }
    }
}

/// Whether the canonical URI is encoded once or twice.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PercentEncodingMode {
    /// The path is used as-is (single encoding pass, done by the builder).
    Single,

    /// `%` in the already-encoded path is re-encoded as `%25`.
    Double,
}

/// Whether the payload hash is surfaced as a header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PayloadChecksumKind {
    /// Add an `x-amz-content-sha256` header with the canonical payload hash.
    XAmzSha256,

    /// The payload hash appears only inside the canonical request.
    NoHeader,
}

/// Where to place the signature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureLocation {
    /// Sign via the `authorization` header.
    Headers,

    /// Sign via `X-Amz-*` query parameters (presigned URLs).
    QueryParams,
}

/// Parameters for one signing operation.
#[derive(Debug)]
pub struct SigningParams<'a> {
    /// The credentials to sign with. Must not be empty; callers skip the
    /// signer entirely for empty credentials.
    pub credentials: &'a Credentials,

    /// The region to sign for.
    pub region: &'a str,

    /// The signing name of the service.
    pub name: &'a str,

    /// The timestamp embedded in the signature.
    pub time: SystemTime,

    /// Additional settings.
    pub settings: SigningSettings,
}
