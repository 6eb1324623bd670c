/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Percent-encoding sets shared by the signer and the request builder.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that survive percent-encoding anywhere in a canonical
/// request: the RFC 3986 unreserved set `A-Za-z0-9-._~`.
pub const STRICT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The strict set with `/` passed through. Used for whole URI paths and for
/// greedy (`{name+}`) path placeholders.
pub const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Encodes a query key or value with the strict set.
pub fn percent_encode_query(value: &str) -> String {
    utf8_percent_encode(value, STRICT_ENCODE_SET).to_string()
}

/// Encodes a URI path, preserving `/` separators.
pub fn percent_encode_path(value: &str) -> String {
    utf8_percent_encode(value, PATH_ENCODE_SET).to_string()
}
