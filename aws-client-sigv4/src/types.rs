/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Container for the signed output and the signature itself.
///
/// The signature is returned separately from the output because chunked
/// uploads seed their chunk-signature chain from the request signature.
#[derive(Debug)]
pub struct SigningOutput<T> {
    output: T,
    signature: String,
}

impl<T> SigningOutput<T> {
    /// Creates a new `SigningOutput`.
    pub fn new(output: T, signature: String) -> Self {
        Self { output, signature }
    }

    /// Returns the output of the signing operation.
    pub fn output(&self) -> &T {
        &self.output
    }

    /// Returns the hex-encoded signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Decomposes into `(output, signature)`.
    pub fn into_parts(self) -> (T, String) {
        (self.output, self.signature)
    }
}
