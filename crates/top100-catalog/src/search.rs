// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use top100_domain::CatalogCandidate;

/// The two lookups track resolution needs from a catalog.
///
/// Results come back in catalog order. Errors are already final: the
/// implementation has applied its own retry policy before returning one.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Look up recordings by ISRC.
    async fn search_by_exact_id(&self, isrc: &str) -> Result<Vec<CatalogCandidate>>;

    /// Free-text artist/title search returning at most `limit` candidates.
    async fn search_by_artist_title(
        &self,
        artist: &str,
        title: &str,
        limit: u32,
    ) -> Result<Vec<CatalogCandidate>>;
}

impl fmt::Debug for dyn CatalogSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CatalogSearch")
    }
}
