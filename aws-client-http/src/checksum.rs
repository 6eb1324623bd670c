/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Body integrity checksums.
//!
//! The engine runs over realized body bytes only. Streaming bodies are
//! skipped here: their integrity comes from chunked signing.

use crate::body::SdkBody;
use crate::config::ServiceConfig;
use crate::error::BuildError;
use crate::operation::Operation;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use md5::Digest;

/// The request header that selects a checksum algorithm by name.
pub const CHECKSUM_ALGORITHM_HEADER: &str = "x-amz-sdk-checksum-algorithm";

/// A supported checksum algorithm.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChecksumAlgorithm {
    /// CRC32, base64 of the four big-endian digest bytes.
    Crc32,
    /// CRC32C (Castagnoli), base64 of the four big-endian digest bytes.
    Crc32c,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// MD5, placed in `content-md5` rather than an `x-amz-checksum-*` header.
    Md5,
}

impl ChecksumAlgorithm {
    /// Parses an algorithm name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("crc32") {
            Some(ChecksumAlgorithm::Crc32)
        } else if name.eq_ignore_ascii_case("crc32c") {
            Some(ChecksumAlgorithm::Crc32c)
        } else if name.eq_ignore_ascii_case("sha1") {
            Some(ChecksumAlgorithm::Sha1)
        } else if name.eq_ignore_ascii_case("sha256") {
            Some(ChecksumAlgorithm::Sha256)
        } else if name.eq_ignore_ascii_case("md5") {
            Some(ChecksumAlgorithm::Md5)
        } else {
            None
        }
    }

    /// The header the digest is written into.
    pub fn header_name(self) -> HeaderName {
        match self {
            ChecksumAlgorithm::Crc32 => HeaderName::from_static("x-amz-checksum-crc32"),
            ChecksumAlgorithm::Crc32c => HeaderName::from_static("x-amz-checksum-crc32c"),
            ChecksumAlgorithm::Sha1 => HeaderName::from_static("x-amz-checksum-sha1"),
            ChecksumAlgorithm::Sha256 => HeaderName::from_static("x-amz-checksum-sha256"),
            ChecksumAlgorithm::Md5 => HeaderName::from_static("content-md5"),
        }
    }

    /// Computes the base64-encoded digest of `data`.
    pub fn compute(self, data: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Crc32 => {
                let mut hasher = crc32fast::Hasher::new();
                hasher.update(data);
                BASE64.encode(hasher.finalize().to_be_bytes())
            }
            ChecksumAlgorithm::Crc32c => BASE64.encode(crc32c::crc32c(data).to_be_bytes()),
            ChecksumAlgorithm::Sha1 => BASE64.encode(sha1::Sha1::digest(data)),
            ChecksumAlgorithm::Sha256 => BASE64.encode(sha2::Sha256::digest(data)),
            ChecksumAlgorithm::Md5 => BASE64.encode(md5::Md5::digest(data)),
        }
    }
}

/// Selects the checksum algorithm for one request, if any.
///
/// Order: the `x-amz-sdk-checksum-algorithm` header (when the operation
/// honors it), then `checksum_required`, then the MD5 header flag combined
/// with the MD5 config option.
fn select_algorithm(
    operation: &Operation,
    config: &ServiceConfig,
    headers: &HeaderMap,
) -> Result<Option<ChecksumAlgorithm>, BuildError> {
    if operation.flags().checksum_header {
        if let Some(name) = headers.get(CHECKSUM_ALGORITHM_HEADER) {
            let name = name.to_str().map_err(|_| {
                BuildError::unencodable(CHECKSUM_ALGORITHM_HEADER, "header value is not UTF-8")
            })?;
            let algorithm = ChecksumAlgorithm::from_name(name).ok_or_else(|| {
                BuildError::unencodable(
                    CHECKSUM_ALGORITHM_HEADER,
                    format!("unknown checksum algorithm `{}`", name),
                )
            })?;
            return Ok(Some(algorithm));
        }
    }
    if operation.flags().checksum_required {
        return Ok(Some(ChecksumAlgorithm::Md5));
    }
    if operation.flags().md5_checksum_header && config.options().calculate_md5 {
        return Ok(Some(ChecksumAlgorithm::Md5));
    }
    Ok(None)
}

/// Computes and attaches the request checksum header.
///
/// No-op when: the operation selects no algorithm, the body is a stream, or
/// the target header is already present (which also makes this idempotent).
pub fn apply_checksum(
    operation: &Operation,
    config: &ServiceConfig,
    headers: &mut HeaderMap,
    body: &SdkBody,
) -> Result<(), BuildError> {
    let algorithm = match select_algorithm(operation, config, headers)? {
        Some(algorithm) => algorithm,
        None => return Ok(()),
    };
    let data = match body.bytes() {
        Some(data) => data,
        None => return Ok(()),
    };
    let header_name = algorithm.header_name();
    if headers.contains_key(&header_name) {
        return Ok(());
    }
    let digest = algorithm.compute(data);
    let value = HeaderValue::from_str(&digest).expect("base64 digests are valid header values");
    headers.insert(header_name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_checksum, ChecksumAlgorithm, CHECKSUM_ALGORITHM_HEADER};
    use crate::body::SdkBody;
    use crate::config::ServiceConfig;
    use crate::operation::{Operation, OperationFlags};
    use crate::protocol::Protocol;
    use http::{HeaderMap, HeaderValue, Method};
    use pretty_assertions::assert_eq;

    fn config(calculate_md5: bool) -> ServiceConfig {
        ServiceConfig::builder()
            .service_id("s3")
            .region("us-east-1")
            .endpoint("https://s3.us-east-1.amazonaws.com")
            .api_version("2006-03-01")
            .protocol(Protocol::RestXml)
            .options(crate::config::ServiceOptions {
                calculate_md5,
                ..Default::default()
            })
            .build()
            .unwrap()
    }

    #[test]
    fn known_digests() {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine as _;

        // Standard check values: CRC catalog inputs and the FIPS "abc"
        // vectors. CRC digests are the four big-endian bytes of the sum.
        let cases: [(ChecksumAlgorithm, &str, &str); 5] = [
            (ChecksumAlgorithm::Crc32, "123456789", "cbf43926"),
            (ChecksumAlgorithm::Crc32c, "123456789", "e3069283"),
            (
                ChecksumAlgorithm::Sha1,
                "abc",
                "a9993e364706816aba3e25717850c26c9cd0d89d",
            ),
            (
                ChecksumAlgorithm::Sha256,
                "abc",
                "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            ),
            (
                ChecksumAlgorithm::Md5,
                "abc",
                "900150983cd24fb0d6963f7d28e17f72",
            ),
        ];
        for (algorithm, input, expected_hex) in cases {
            let encoded = algorithm.compute(input.as_bytes());
            assert_eq!(
                BASE64.decode(encoded).unwrap(),
                hex_to_bytes(expected_hex),
                "{algorithm:?} digest mismatch"
            );
        }
    }

    fn hex_to_bytes(hex: &str) -> Vec<u8> {
        hex.as_bytes()
            .chunks(2)
            .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
            .collect()
    }

    #[test]
    fn algorithm_header_selects_the_algorithm() {
        let operation = Operation::new("PutObject", Method::PUT, "/{Key+}").with_flags(
            OperationFlags {
                checksum_header: true,
                ..Default::default()
            },
        );
        let mut headers = HeaderMap::new();
        headers.insert(
            CHECKSUM_ALGORITHM_HEADER,
            HeaderValue::from_static("crc32c"),
        );
        let body = SdkBody::from("Hello world");
        apply_checksum(&operation, &config(false), &mut headers, &body).unwrap();
        assert_eq!(
            headers.get("x-amz-checksum-crc32c").unwrap(),
            ChecksumAlgorithm::Crc32c.compute(b"Hello world").as_str()
        );
    }

    #[test]
    fn checksum_required_defaults_to_md5() {
        let operation = Operation::new("DeleteObjects", Method::POST, "/").with_flags(
            OperationFlags {
                checksum_required: true,
                ..Default::default()
            },
        );
        let mut headers = HeaderMap::new();
        let body = SdkBody::from("Hello world");
        apply_checksum(&operation, &config(false), &mut headers, &body).unwrap();
        assert_eq!(
            headers.get("content-md5").unwrap(),
            ChecksumAlgorithm::Md5.compute(b"Hello world").as_str()
        );
    }

    #[test]
    fn md5_header_needs_config_opt_in() {
        let operation = Operation::new("PutObject", Method::PUT, "/").with_flags(OperationFlags {
            md5_checksum_header: true,
            ..Default::default()
        });
        let body = SdkBody::from("Hello world");

        let mut headers = HeaderMap::new();
        apply_checksum(&operation, &config(false), &mut headers, &body).unwrap();
        assert!(headers.get("content-md5").is_none());

        let mut headers = HeaderMap::new();
        apply_checksum(&operation, &config(true), &mut headers, &body).unwrap();
        assert!(headers.get("content-md5").is_some());
    }

    #[test]
    fn existing_header_is_preserved_and_engine_is_idempotent() {
        let operation = Operation::new("DeleteObjects", Method::POST, "/").with_flags(
            OperationFlags {
                checksum_required: true,
                ..Default::default()
            },
        );
        let mut headers = HeaderMap::new();
        headers.insert("content-md5", HeaderValue::from_static("preset"));
        let body = SdkBody::from("Hello world");
        apply_checksum(&operation, &config(false), &mut headers, &body).unwrap();
        assert_eq!(headers.get("content-md5").unwrap(), "preset");

        let mut headers = HeaderMap::new();
        apply_checksum(&operation, &config(false), &mut headers, &body).unwrap();
        let first = headers.clone();
        apply_checksum(&operation, &config(false), &mut headers, &body).unwrap();
        assert_eq!(first, headers);
    }

    #[test]
    fn streams_are_not_checksummed() {
        struct Never;
        #[async_trait::async_trait]
        impl crate::body::ChunkStream for Never {
            fn size_hint(&self) -> Option<u64> {
                Some(11)
            }
            async fn next_chunk(
                &mut self,
            ) -> Result<Option<bytes::Bytes>, crate::body::BoxError> {
                Ok(None)
            }
        }
        let operation = Operation::new("PutObject", Method::PUT, "/").with_flags(OperationFlags {
            checksum_required: true,
            ..Default::default()
        });
        let mut headers = HeaderMap::new();
        let body = SdkBody::from_stream(Never);
        apply_checksum(&operation, &config(false), &mut headers, &body).unwrap();
        assert!(headers.is_empty());
    }
}
