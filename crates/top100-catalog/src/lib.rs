// SPDX-License-Identifier: GPL-3.0-or-later

//! Streaming catalog search client.
//!
//! Wraps the catalog's track search endpoint behind the [`CatalogSearch`]
//! trait. Every attempt is paced by a shared [`RateLimiter`], and transient
//! failures (429, 5xx gateway errors, connection problems) are retried with
//! exponential backoff and jitter.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod rate_limiter;
pub mod search;

pub use auth::{StaticToken, TokenProvider};
pub use client::{CatalogClient, CatalogClientBuilder};
pub use error::{CatalogError, RequestFailure, Result};
pub use rate_limiter::RateLimiter;
pub use search::CatalogSearch;
