/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Continuation-token pagination.
//!
//! The paginator re-issues a call with the previous page's token until the
//! token runs out, flattening page contents (or streaming whole pages).
//! Failures are terminal; there is no partial-result retry across pages.
//! A page-count bound guards against services that echo tokens forever.

use crate::error::SdkError;
use futures::stream::{self, Stream};
use std::future::Future;

/// Default upper bound on pages fetched by one pagination.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// An input that can carry a continuation token into the next call.
pub trait PaginatedInput: Clone {
    /// Returns this input with the continuation token replaced.
    fn with_token(self, token: &str) -> Self;
}

/// Fetches every page and returns the flattened contents.
///
/// `contents` extracts the page's items; `next_token` extracts the
/// continuation token (`None` or empty ends the walk).
pub async fn collect_all<I, O, Item, F, Fut>(
    input: I,
    call: F,
    contents: impl Fn(&O) -> Vec<Item>,
    next_token: impl Fn(&O) -> Option<String>,
) -> Result<Vec<Item>, SdkError>
where
    I: PaginatedInput,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O, SdkError>>,
{
    collect_bounded(input, call, contents, next_token, DEFAULT_MAX_PAGES).await
}

/// [`collect_all`] with an explicit page bound.
pub async fn collect_bounded<I, O, Item, F, Fut>(
    mut input: I,
    call: F,
    contents: impl Fn(&O) -> Vec<Item>,
    next_token: impl Fn(&O) -> Option<String>,
    max_pages: usize,
) -> Result<Vec<Item>, SdkError>
where
    I: PaginatedInput,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<O, SdkError>>,
{
    let mut items = Vec::new();
    let mut pages = 0usize;
    loop {
        if pages == max_pages {
            return Err(SdkError::pagination_limit(max_pages));
        }
        pages += 1;
        let output = call(input.clone()).await?;
        items.extend(contents(&output));
        match next_token(&output).filter(|token| !token.is_empty()) {
            Some(token) => input = input.with_token(&token),
            None => return Ok(items),
        }
    }
}

/// Streams whole pages to the consumer instead of flattening.
pub fn pages<I, O, F, Fut, T>(
    input: I,
    call: F,
    next_token: T,
    max_pages: usize,
) -> impl Stream<Item = Result<O, SdkError>>
where
    I: PaginatedInput,
    F: Fn(I) -> Fut + Clone,
    Fut: Future<Output = Result<O, SdkError>>,
    T: Fn(&O) -> Option<String> + Clone,
{
    stream::try_unfold((Some(input), 0usize), move |(state, pages_fetched)| {
        let call = call.clone();
        let next_token = next_token.clone();
        async move {
            let input = match state {
                Some(input) => input,
                None => return Ok(None),
            };
            if pages_fetched == max_pages {
                return Err(SdkError::pagination_limit(max_pages));
            }
            let output = call(input.clone()).await?;
            let next = next_token(&output)
                .filter(|token| !token.is_empty())
                .map(|token| input.with_token(&token));
            Ok(Some((output, (next, pages_fetched + 1))))
        }
    })
}
