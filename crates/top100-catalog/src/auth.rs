// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use std::fmt;

/// Source of bearer tokens for catalog requests.
///
/// Called before every attempt; implementations must be cheap to call
/// repeatedly and return a token valid for at least one request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn access_token(&self) -> Result<String>;
}

impl fmt::Debug for dyn TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("name", &self.name())
            .finish()
    }
}

/// A pre-issued access token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn access_token(&self) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(CatalogError::Authentication(
                "access token is empty".to_string(),
            ));
        }
        Ok(self.token.clone())
    }
}
