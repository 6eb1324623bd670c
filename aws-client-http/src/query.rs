/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Value tree and flattener for the two query protocols.
//!
//! The `query` dialect nests list items under a `.member.N` infix; the
//! compute dialect (`ec2-query`) flattens them as `.N` directly. Maps
//! flatten one entry per index with emitter-chosen key/value names, so a
//! map member named `Attribute` with entry names `Name`/`Value` renders as
//! `Attribute.1.Name=...&Attribute.1.Value=...`.

/// An ordered set of named query values, as emitted by an operation input.
#[derive(Debug, Default)]
pub struct QueryMap {
    entries: Vec<(String, QueryValue)>,
}

impl QueryMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named value.
    pub fn push(&mut self, name: impl Into<String>, value: QueryValue) -> &mut Self {
        self.entries.push((name.into(), value));
        self
    }

    /// True when no members were emitted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattens the tree into `(key, value)` pairs using the given dialect.
    pub fn flatten(&self, dialect: QueryDialect) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (name, value) in &self.entries {
            flatten_value(name, value, dialect, &mut out);
        }
        out
    }
}

/// Which flattening dialect to use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryDialect {
    /// Lists nest under `.member.N`; maps under `.entry.N` unless flattened.
    Query,

    /// Lists and maps flatten as `.N` with no infix.
    Ec2,
}

/// A node in the query value tree.
#[derive(Debug)]
pub enum QueryValue {
    /// A scalar, rendered verbatim.
    Value(String),

    /// A list of values, flattened 1-based.
    List(Vec<QueryValue>),

    /// A map of entries, flattened 1-based with named key/value leaves.
    Map {
        /// The entries, in emitter order.
        entries: Vec<(String, QueryValue)>,
        /// The leaf name for keys, e.g. `Name`.
        key_name: &'static str,
        /// The leaf name for values, e.g. `Value`.
        value_name: &'static str,
        /// Whether the `entry` infix is omitted.
        flattened: bool,
    },
}

impl QueryValue {
    /// A scalar leaf.
    pub fn value(value: impl Into<String>) -> Self {
        QueryValue::Value(value.into())
    }

    /// A list of scalar leaves.
    pub fn list_of(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        QueryValue::List(values.into_iter().map(|v| QueryValue::value(v)).collect())
    }
}

fn flatten_value(prefix: &str, value: &QueryValue, dialect: QueryDialect, out: &mut Vec<(String, String)>) {
    match value {
        QueryValue::Value(value) => out.push((prefix.to_string(), value.clone())),
        QueryValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                let prefix = match dialect {
                    QueryDialect::Query => format!("{}.member.{}", prefix, i + 1),
                    QueryDialect::Ec2 => format!("{}.{}", prefix, i + 1),
                };
                flatten_value(&prefix, item, dialect, out);
            }
        }
        QueryValue::Map {
            entries,
            key_name,
            value_name,
            flattened,
        } => {
            for (i, (key, value)) in entries.iter().enumerate() {
                let entry_prefix = match (dialect, flattened) {
                    (QueryDialect::Query, false) => format!("{}.entry.{}", prefix, i + 1),
                    _ => format!("{}.{}", prefix, i + 1),
                };
                out.push((format!("{}.{}", entry_prefix, key_name), key.clone()));
                flatten_value(&format!("{}.{}", entry_prefix, value_name), value, dialect, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{QueryDialect, QueryMap, QueryValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn scalars_render_verbatim() {
        let mut map = QueryMap::new();
        map.push("QueueName", QueryValue::value("q"));
        assert_eq!(
            map.flatten(QueryDialect::Query),
            vec![("QueueName".to_string(), "q".to_string())]
        );
    }

    #[test]
    fn query_lists_nest_under_member() {
        let mut map = QueryMap::new();
        map.push("AttributeName", QueryValue::list_of(["All", "Policy"]));
        assert_eq!(
            map.flatten(QueryDialect::Query),
            vec![
                ("AttributeName.member.1".to_string(), "All".to_string()),
                ("AttributeName.member.2".to_string(), "Policy".to_string()),
            ]
        );
    }

    #[test]
    fn ec2_lists_have_no_member_infix() {
        let mut map = QueryMap::new();
        map.push("InstanceId", QueryValue::list_of(["i-1", "i-2"]));
        assert_eq!(
            map.flatten(QueryDialect::Ec2),
            vec![
                ("InstanceId.1".to_string(), "i-1".to_string()),
                ("InstanceId.2".to_string(), "i-2".to_string()),
            ]
        );
    }

    #[test]
    fn flattened_maps_use_named_leaves() {
        let mut map = QueryMap::new();
        map.push(
            "Attribute",
            QueryValue::Map {
                entries: vec![("DelaySeconds".to_string(), QueryValue::value("5"))],
                key_name: "Name",
                value_name: "Value",
                flattened: true,
            },
        );
        assert_eq!(
            map.flatten(QueryDialect::Query),
            vec![
                ("Attribute.1.Name".to_string(), "DelaySeconds".to_string()),
                ("Attribute.1.Value".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn nested_maps_use_entry_infix() {
        let mut map = QueryMap::new();
        map.push(
            "Tags",
            QueryValue::Map {
                entries: vec![("env".to_string(), QueryValue::value("prod"))],
                key_name: "key",
                value_name: "value",
                flattened: false,
            },
        );
        assert_eq!(
            map.flatten(QueryDialect::Query),
            vec![
                ("Tags.entry.1.key".to_string(), "env".to_string()),
                ("Tags.entry.1.value".to_string(), "prod".to_string()),
            ]
        );
    }
}
