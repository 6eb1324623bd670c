/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::http_request::url_escape::percent_encode_query;
use http::Uri;

/// Appends percent-encoded query parameters to an existing URI without
/// disturbing parameters that are already present.
#[derive(Debug)]
pub struct QueryWriter {
    base_uri: Uri,
    new_path_and_query: String,
    prefix: Option<char>,
}

impl QueryWriter {
    /// Creates a `QueryWriter` based on the given `uri`.
    pub fn new(uri: &Uri) -> Self {
        let new_path_and_query = uri
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_default();
        let prefix = if uri.query().is_none() {
            Some('?')
        } else if !uri.query().unwrap_or_default().is_empty() {
            Some('&')
        } else {
            None
        };
        QueryWriter {
            base_uri: uri.clone(),
            new_path_and_query,
            prefix,
        }
    }

    /// Appends `k=v`, percent-encoding both sides with the strict set.
    pub fn insert(&mut self, k: &str, v: &str) {
        if let Some(prefix) = self.prefix {
            self.new_path_and_query.push(prefix);
        }
        self.prefix = Some('&');
        self.new_path_and_query.push_str(&percent_encode_query(k));
        self.new_path_and_query.push('=');
        self.new_path_and_query.push_str(&percent_encode_query(v));
    }

    /// Builds the final URI.
    pub fn build_uri(self) -> Uri {
        let mut parts = self.base_uri.into_parts();
        parts.path_and_query = Some(
            self.new_path_and_query
                .parse()
                .expect("adding a percent-encoded query cannot invalidate the URI"),
        );
        Uri::from_parts(parts).expect("a valid URI in produces a valid URI out")
    }
}

#[cfg(test)]
mod tests {
    use super::QueryWriter;
    use http::Uri;

    #[test]
    fn appends_to_empty_query() {
        let uri = Uri::from_static("https://www.example.com");
        let mut writer = QueryWriter::new(&uri);
        writer.insert("key", "val%ue");
        writer.insert("another", "value");
        assert_eq!(
            writer.build_uri(),
            Uri::from_static("https://www.example.com?key=val%25ue&another=value")
        );
    }

    #[test]
    fn appends_to_existing_query() {
        let uri = Uri::from_static("https://www.example.com/path?original=here");
        let mut writer = QueryWriter::new(&uri);
        writer.insert("key", "val/ue");
        assert_eq!(
            writer.build_uri(),
            Uri::from_static("https://www.example.com/path?original=here&key=val%2Fue")
        );
    }
}
