/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! SigV4 date formats: `yyyyMMdd'T'HHmmss'Z'` for `x-amz-date` and
//! `yyyyMMdd` for the credential scope.

use std::time::SystemTime;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year][month][day]");
const DATE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

/// Formats `time` as `yyyyMMdd` (credential scope date).
pub fn format_date(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&DATE_FORMAT)
        .expect("date format is infallible for valid times")
}

/// Formats `time` as `yyyyMMdd'T'HHmmss'Z'` (the `x-amz-date` value).
pub fn format_date_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&DATE_TIME_FORMAT)
        .expect("date-time format is infallible for valid times")
}

/// Parses a `yyyyMMdd'T'HHmmss'Z'` timestamp.
///
/// Primarily a test helper: production signing always formats, never parses.
pub fn parse_date_time(value: &str) -> Result<SystemTime, time::error::Parse> {
    Ok(PrimitiveDateTime::parse(value, DATE_TIME_FORMAT)?
        .assume_utc()
        .into())
}
