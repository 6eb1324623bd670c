/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// The wire protocol a service speaks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Protocol {
    /// JSON-RPC style: every operation POSTs to the service root with an
    /// `x-amz-target` header.
    Json,

    /// RESTful with JSON bodies.
    RestJson,

    /// RESTful with XML bodies.
    RestXml,

    /// Form-urlencoded `Action`/`Version` bodies.
    Query,

    /// The compute service's dialect of the query protocol: lists flatten
    /// without the `.member` infix.
    Ec2Query,
}

impl Protocol {
    /// The content type used when the operation does not override it.
    pub fn default_content_type(self) -> &'static str {
        match self {
            Protocol::Json => "application/x-amz-json-1.0",
            Protocol::RestJson => "application/json",
            Protocol::RestXml => "application/xml",
            Protocol::Query | Protocol::Ec2Query => {
                "application/x-www-form-urlencoded; charset=utf-8"
            }
        }
    }

    /// True for the two query-protocol dialects.
    pub fn is_query(self) -> bool {
        matches!(self, Protocol::Query | Protocol::Ec2Query)
    }
}
