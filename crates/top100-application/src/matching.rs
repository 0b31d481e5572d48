// SPDX-License-Identifier: GPL-3.0-or-later

use crate::normalizer::DurationTolerance;
use std::sync::Arc;
use thiserror::Error;
use top100_catalog::{CatalogError, CatalogSearch};
use top100_config::MatchingConfig;
use top100_domain::{CatalogCandidate, LocalTrackMetadata, MatchResult};
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.85;
pub const DEFAULT_CANDIDATE_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),
    #[error("confidence threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("candidate limit must be greater than zero")]
    InvalidCandidateLimit,
}

pub type Result<T> = std::result::Result<T, MatchingError>;

/// Resolves local tracks to catalog entries.
///
/// An ISRC lookup is tried first; when the track has no usable ISRC or the
/// lookup finds nothing, a bounded artist/title search is scored with the
/// normalizer and the best candidate is accepted only at or above the
/// confidence threshold.
#[derive(Debug, Clone)]
pub struct Matcher {
    catalog: Arc<dyn CatalogSearch>,
    confidence_threshold: f64,
    candidate_limit: u32,
    tolerance: DurationTolerance,
}

impl Matcher {
    pub fn new(
        catalog: Arc<dyn CatalogSearch>,
        confidence_threshold: f64,
        candidate_limit: u32,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(MatchingError::InvalidThreshold(confidence_threshold));
        }
        if candidate_limit == 0 {
            return Err(MatchingError::InvalidCandidateLimit);
        }

        Ok(Self {
            catalog,
            confidence_threshold,
            candidate_limit,
            tolerance: DurationTolerance::default(),
        })
    }

    pub fn from_config(catalog: Arc<dyn CatalogSearch>, config: &MatchingConfig) -> Result<Self> {
        Ok(
            Self::new(catalog, config.confidence_threshold, config.candidate_limit)?
                .with_tolerance(DurationTolerance::from_config(config)),
        )
    }

    pub fn with_tolerance(mut self, tolerance: DurationTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub async fn find_match(&self, metadata: &LocalTrackMetadata) -> Result<MatchResult> {
        if let Some(isrc) = metadata.usable_isrc() {
            if let Some(result) = self.match_by_isrc(isrc).await? {
                return Ok(result);
            }
            debug!(target: "matching", isrc, "no ISRC hit, falling back to artist/title search");
        }

        self.match_by_artist_title(metadata).await
    }

    async fn match_by_isrc(&self, isrc: &str) -> Result<Option<MatchResult>> {
        let candidates = self.catalog.search_by_exact_id(isrc).await?;
        let Some(first) = candidates.first() else {
            return Ok(None);
        };

        if candidates.len() > 1 {
            warn!(
                target: "matching",
                isrc,
                count = candidates.len(),
                "multiple catalog tracks share one ISRC, taking the first"
            );
        }

        info!(target: "matching", isrc, catalog_id = %first.catalog_id, "matched by ISRC");
        Ok(Some(MatchResult::identifier_match(first, candidates.len())))
    }

    async fn match_by_artist_title(&self, metadata: &LocalTrackMetadata) -> Result<MatchResult> {
        let candidates = self
            .catalog
            .search_by_artist_title(&metadata.artist, &metadata.title, self.candidate_limit)
            .await?;

        let Some((best, score)) = self.best_candidate(metadata, &candidates) else {
            info!(
                target: "matching",
                artist = %metadata.artist,
                title = %metadata.title,
                "no catalog candidates"
            );
            return Ok(MatchResult::no_match(0.0, 0, None));
        };

        if score < self.confidence_threshold {
            info!(
                target: "matching",
                artist = %metadata.artist,
                title = %metadata.title,
                score,
                best = %best.label(),
                "best candidate below confidence threshold"
            );
            return Ok(MatchResult::no_match(
                score,
                candidates.len(),
                Some(best.label()),
            ));
        }

        info!(
            target: "matching",
            artist = %metadata.artist,
            title = %metadata.title,
            score,
            catalog_id = %best.catalog_id,
            "auto-picked fuzzy match"
        );
        Ok(MatchResult::auto_picked(best, score, candidates.len()))
    }

    /// Highest-scoring candidate; the earliest one wins a tie.
    pub fn best_candidate<'a>(
        &self,
        metadata: &LocalTrackMetadata,
        candidates: &'a [CatalogCandidate],
    ) -> Option<(&'a CatalogCandidate, f64)> {
        let mut best: Option<(&CatalogCandidate, f64)> = None;

        for candidate in candidates {
            let score = self.score(metadata, candidate);
            debug!(target: "matching", candidate = %candidate.label(), score, "scored candidate");

            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }

        best
    }

    fn score(&self, metadata: &LocalTrackMetadata, candidate: &CatalogCandidate) -> f64 {
        self.tolerance.match_score(
            &metadata.artist,
            &candidate.artist,
            &metadata.title,
            &candidate.title,
            metadata.duration_seconds,
            Some(candidate.duration_seconds()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use top100_catalog::RequestFailure;
    use top100_domain::{MatchStatus, MatchedVia};

    #[derive(Default)]
    struct StubCatalog {
        by_isrc: Vec<CatalogCandidate>,
        by_artist_title: Vec<CatalogCandidate>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CatalogSearch for StubCatalog {
        async fn search_by_exact_id(
            &self,
            isrc: &str,
        ) -> top100_catalog::Result<Vec<CatalogCandidate>> {
            self.calls.lock().unwrap().push(format!("isrc:{isrc}"));
            Ok(self.by_isrc.clone())
        }

        async fn search_by_artist_title(
            &self,
            artist: &str,
            title: &str,
            limit: u32,
        ) -> top100_catalog::Result<Vec<CatalogCandidate>> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("search:{artist}/{title}/{limit}"));
            Ok(self.by_artist_title.clone())
        }
    }

    struct FailingCatalog;

    #[async_trait]
    impl CatalogSearch for FailingCatalog {
        async fn search_by_exact_id(&self, _: &str) -> top100_catalog::Result<Vec<CatalogCandidate>> {
            Err(unavailable())
        }

        async fn search_by_artist_title(
            &self,
            _: &str,
            _: &str,
            _: u32,
        ) -> top100_catalog::Result<Vec<CatalogCandidate>> {
            Err(unavailable())
        }
    }

    fn unavailable() -> CatalogError {
        CatalogError::RequestFailed {
            attempts: 5,
            cause: RequestFailure::Status {
                status: 503,
                message: "unavailable".to_string(),
            },
        }
    }

    fn candidate(id: &str, artist: &str, title: &str, duration_ms: u64) -> CatalogCandidate {
        CatalogCandidate {
            catalog_id: id.to_string(),
            artist: artist.to_string(),
            title: title.to_string(),
            album_name: None,
            release_date: Some("2001-01-01".to_string()),
            duration_ms,
            popularity: 50,
            isrc: None,
            external_url: None,
            preview_url: None,
        }
    }

    fn matcher(catalog: StubCatalog) -> (Matcher, Arc<StubCatalog>) {
        let catalog = Arc::new(catalog);
        let matcher = Matcher::new(
            catalog.clone(),
            DEFAULT_CONFIDENCE_THRESHOLD,
            DEFAULT_CANDIDATE_LIMIT,
        )
        .unwrap();
        (matcher, catalog)
    }

    #[tokio::test]
    async fn isrc_hit_is_an_exact_match() {
        let (matcher, catalog) = matcher(StubCatalog {
            by_isrc: vec![candidate("id-1", "Someone Else", "Different", 1000)],
            ..StubCatalog::default()
        });
        let metadata = LocalTrackMetadata::new("The Beatles", "Hey Jude").with_isrc("GBAYE0601498");

        let result = matcher.find_match(&metadata).await.unwrap();

        assert_eq!(result.status, MatchStatus::Ok);
        assert_eq!(result.match_confidence, 1.0);
        assert_eq!(result.matched_via, MatchedVia::Isrc);
        assert_eq!(result.catalog_id.as_deref(), Some("id-1"));
        assert_eq!(*catalog.calls.lock().unwrap(), vec!["isrc:GBAYE0601498"]);
    }

    #[tokio::test]
    async fn multiple_isrc_hits_take_the_first() {
        let (matcher, _) = matcher(StubCatalog {
            by_isrc: vec![
                candidate("first", "A", "B", 1000),
                candidate("second", "A", "B", 1000),
            ],
            ..StubCatalog::default()
        });
        let metadata = LocalTrackMetadata::new("A", "B").with_isrc("USAAA0000001");

        let result = matcher.find_match(&metadata).await.unwrap();

        assert_eq!(result.catalog_id.as_deref(), Some("first"));
        assert_eq!(result.candidates_found, 2);
    }

    #[tokio::test]
    async fn empty_isrc_lookup_falls_back_to_search() {
        let (matcher, catalog) = matcher(StubCatalog {
            by_artist_title: vec![candidate("fuzzy", "The Beatles", "Hey Jude", 425_653)],
            ..StubCatalog::default()
        });
        let metadata = LocalTrackMetadata::new("Beatles", "Hey Jude (Remastered 2015)")
            .with_isrc("GBAYE0601498")
            .with_duration(425.0);

        let result = matcher.find_match(&metadata).await.unwrap();

        assert_eq!(result.status, MatchStatus::AutoPicked);
        assert_eq!(result.matched_via, MatchedVia::ArtistTitle);
        assert!((result.match_confidence - 1.0).abs() < 1e-9);
        assert_eq!(
            *catalog.calls.lock().unwrap(),
            vec![
                "isrc:GBAYE0601498".to_string(),
                "search:Beatles/Hey Jude (Remastered 2015)/10".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn blank_isrc_skips_identifier_lookup() {
        let (matcher, catalog) = matcher(StubCatalog::default());
        let metadata = LocalTrackMetadata::new("A", "B").with_isrc("  ");

        matcher.find_match(&metadata).await.unwrap();

        assert_eq!(*catalog.calls.lock().unwrap(), vec!["search:A/B/10"]);
    }

    #[tokio::test]
    async fn no_candidates_is_no_match_with_zero_confidence() {
        let (matcher, _) = matcher(StubCatalog::default());
        let metadata = LocalTrackMetadata::new("Nobody", "Nothing");

        let result = matcher.find_match(&metadata).await.unwrap();

        assert_eq!(result.status, MatchStatus::NoMatch);
        assert_eq!(result.match_confidence, 0.0);
        assert_eq!(result.candidates_found, 0);
        assert_eq!(result.best_candidate_label, None);
    }

    #[tokio::test]
    async fn below_threshold_is_never_promoted() {
        // Same title and duration, unrelated artist: 0.5 + 0.0 + 0.1.
        let (matcher, _) = matcher(StubCatalog {
            by_artist_title: vec![candidate("id-blur", "Blur", "Song 2", 121_000)],
            ..StubCatalog::default()
        });
        let metadata = LocalTrackMetadata::new("Muse", "Song 2").with_duration(120.0);

        let result = matcher.find_match(&metadata).await.unwrap();

        assert_eq!(result.status, MatchStatus::NoMatch);
        assert!((result.match_confidence - 0.60).abs() < 1e-9);
        assert_eq!(result.catalog_id, None);
        assert_eq!(result.candidates_found, 1);
        assert_eq!(result.best_candidate_label.as_deref(), Some("Blur - Song 2"));
    }

    #[tokio::test]
    async fn best_scoring_candidate_wins() {
        let (matcher, _) = matcher(StubCatalog {
            by_artist_title: vec![
                candidate("cover", "Tribute Band", "Creep", 238_000),
                candidate("album-cut", "Radiohead", "Creep", 238_640),
            ],
            ..StubCatalog::default()
        });
        let metadata = LocalTrackMetadata::new("Radiohead", "Creep").with_duration(238.0);

        let result = matcher.find_match(&metadata).await.unwrap();

        assert_eq!(result.catalog_id.as_deref(), Some("album-cut"));
    }

    #[test]
    fn ties_keep_catalog_order() {
        let (matcher, _) = matcher(StubCatalog::default());
        let metadata = LocalTrackMetadata::new("Radiohead", "Creep");
        let candidates = vec![
            candidate("first", "Radiohead", "Creep", 238_000),
            candidate("second", "Radiohead", "Creep", 238_000),
        ];

        let (best, _) = matcher.best_candidate(&metadata, &candidates).unwrap();

        assert_eq!(best.catalog_id, "first");
    }

    #[tokio::test]
    async fn catalog_errors_propagate() {
        let matcher = Matcher::new(Arc::new(FailingCatalog), 0.85, 10).unwrap();
        let metadata = LocalTrackMetadata::new("A", "B").with_isrc("USAAA0000001");

        let err = matcher.find_match(&metadata).await.unwrap_err();

        assert!(matches!(err, MatchingError::Catalog(_)));
    }

    #[test]
    fn rejects_invalid_settings() {
        let catalog: Arc<dyn CatalogSearch> = Arc::new(StubCatalog::default());
        assert!(matches!(
            Matcher::new(catalog.clone(), 1.5, 10),
            Err(MatchingError::InvalidThreshold(_))
        ));
        assert!(matches!(
            Matcher::new(catalog, 0.85, 0),
            Err(MatchingError::InvalidCandidateLimit)
        ));
    }

    #[test]
    fn from_config_uses_configured_tolerance() {
        let config = MatchingConfig {
            confidence_threshold: 0.9,
            candidate_limit: 5,
            strict_duration_tolerance_secs: 1,
            loose_duration_tolerance_secs: 2,
        };
        let matcher = Matcher::from_config(Arc::new(StubCatalog::default()), &config).unwrap();

        assert_eq!(matcher.confidence_threshold(), 0.9);
        assert_eq!(matcher.tolerance, DurationTolerance::new(1.0, 2.0));
    }
}
