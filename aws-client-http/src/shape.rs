/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The compile-time encoding map: operation inputs describe where each of
//! their members lands on the wire by yielding rendered
//! `(location, value)` bindings, and hand the body over as a tagged value.
//!
//! Per-operation emitters (normally generated from the service schemas)
//! implement [`OperationInput`]; nothing in the builder inspects values at
//! runtime beyond these bindings.

use crate::body::SdkBody;
use crate::error::BuildError;
use crate::query::QueryMap;
use crate::xml::XmlNode;

/// Where a member lands on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum MemberLocation {
    /// A single named header.
    Header(&'static str),

    /// One header per map entry, named `prefix` + key.
    HeaderPrefix(&'static str),

    /// A query-string parameter.
    Querystring(&'static str),

    /// A `{name}` path placeholder: the value is a single path segment.
    Uri(&'static str),

    /// A `{name+}` path placeholder: slashes in the value survive encoding.
    UriGreedy(&'static str),

    /// A label substituted into the operation's host prefix template.
    HostLabel(&'static str),
}

/// A rendered member value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberValue {
    /// A scalar, already rendered to its wire string.
    Single(String),

    /// A list of rendered values (repeated query parameters, comma-joined
    /// headers).
    List(Vec<String>),

    /// Rendered key/value pairs (prefix headers, query maps).
    Map(Vec<(String, String)>),
}

/// One binding from the encoding map.
#[derive(Clone, Debug)]
pub struct Member {
    /// Where the value goes.
    pub location: MemberLocation,
    /// The rendered value.
    pub value: MemberValue,
}

impl Member {
    /// Creates a binding.
    pub fn new(location: MemberLocation, value: MemberValue) -> Self {
        Self { location, value }
    }

    /// Shorthand for a scalar binding.
    pub fn single(location: MemberLocation, value: impl Into<String>) -> Self {
        Self::new(location, MemberValue::Single(value.into()))
    }
}

/// The body of a request, tagged by how the builder must realize it.
///
/// Raw payloads and structured shapes are distinct variants; the builder
/// never type-tests a payload at runtime.
#[derive(Debug)]
#[non_exhaustive]
pub enum BodyValue {
    /// No body members. JSON-protocol PUT/POST requests fall back to `{}`.
    None,

    /// Body members encoded as a JSON document (the `json`/`rest-json`
    /// protocols).
    Json(serde_json::Value),

    /// Body members encoded as an XML document with the given root
    /// (the `rest-xml` protocol).
    Xml(XmlNode),

    /// Body members as a query value tree, flattened and form-urlencoded
    /// together with `Action` and `Version` (the query protocols).
    Query(QueryMap),

    /// A raw payload member, passed through byte-for-byte.
    Payload(SdkBody),
}

/// An operation input that knows how to place itself on the wire.
pub trait OperationInput {
    /// Validates declared constraints (ranges, lengths, patterns) before any
    /// encoding happens. The default accepts everything.
    fn validate(&self) -> Result<(), BuildError> {
        Ok(())
    }

    /// Yields the rendered non-body member bindings, in declaration order.
    fn members(&self) -> Vec<Member> {
        Vec::new()
    }

    /// Consumes the input, yielding its body.
    fn into_body(self) -> Result<BodyValue, BuildError>
    where
        Self: Sized,
    {
        Ok(BodyValue::None)
    }
}

/// An input with no members at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyInput;

impl OperationInput for EmptyInput {}
