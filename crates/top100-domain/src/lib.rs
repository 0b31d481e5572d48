// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Fallback used for ordering and eligibility when a track has no release date.
pub const MISSING_RELEASE_DATE: &str = "1900-01-01";
/// Fallback used for ordering and eligibility when a file has no modification time.
pub const MISSING_MODIFIED_AT: &str = "1900-01-01 00:00:00";

// ============================================================================
// Local library
// ============================================================================

/// Metadata read from a local audio file's tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalTrackMetadata {
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    /// 12-character ISRC, already uppercased and stripped of separators.
    pub isrc: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl LocalTrackMetadata {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_isrc(mut self, isrc: impl Into<String>) -> Self {
        self.isrc = Some(isrc.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// The ISRC if one is present and non-blank.
    pub fn usable_isrc(&self) -> Option<&str> {
        self.isrc
            .as_deref()
            .map(str::trim)
            .filter(|isrc| !isrc.is_empty())
    }
}

/// A scanned audio file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    /// Modification time formatted `YYYY-MM-DD HH:MM:SS` (UTC).
    pub modified_at: Option<String>,
}

impl TrackFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            size_bytes,
            modified_at: None,
        }
    }

    pub fn with_modified_at(mut self, modified_at: impl Into<String>) -> Self {
        self.modified_at = Some(modified_at.into());
        self
    }

    pub fn modified_at_or_default(&self) -> &str {
        self.modified_at.as_deref().unwrap_or(MISSING_MODIFIED_AT)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// One search-result row from the streaming catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    pub catalog_id: String,
    pub artist: String,
    pub title: String,
    pub album_name: Option<String>,
    pub release_date: Option<String>,
    pub duration_ms: u64,
    /// Catalog popularity, 0..=100.
    pub popularity: u8,
    pub isrc: Option<String>,
    pub external_url: Option<String>,
    pub preview_url: Option<String>,
}

impl CatalogCandidate {
    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// `Artist - Title`, used in diagnostics.
    pub fn label(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

// ============================================================================
// Matching
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedVia {
    Isrc,
    ArtistTitle,
}

impl fmt::Display for MatchedVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedVia::Isrc => write!(f, "isrc"),
            MatchedVia::ArtistTitle => write!(f, "artist_title"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Exact identifier match.
    Ok,
    /// Fuzzy match at or above the confidence threshold.
    AutoPicked,
    NoMatch,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Ok => write!(f, "ok"),
            MatchStatus::AutoPicked => write!(f, "auto_picked"),
            MatchStatus::NoMatch => write!(f, "no_match"),
        }
    }
}

/// Outcome of resolving one local track against the catalog.
///
/// `Ok` and `AutoPicked` always carry a catalog id; `NoMatch` never does, even
/// when a confidence value is reported for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub catalog_id: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album_name: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<u8>,
    pub duration_ms: Option<u64>,
    pub external_url: Option<String>,
    pub match_confidence: f64,
    pub matched_via: MatchedVia,
    pub status: MatchStatus,
    pub candidates_found: usize,
    pub best_candidate_label: Option<String>,
}

impl MatchResult {
    pub fn identifier_match(candidate: &CatalogCandidate, candidates_found: usize) -> Self {
        Self::accepted(candidate, 1.0, MatchedVia::Isrc, MatchStatus::Ok, candidates_found)
    }

    pub fn auto_picked(candidate: &CatalogCandidate, score: f64, candidates_found: usize) -> Self {
        Self::accepted(
            candidate,
            score,
            MatchedVia::ArtistTitle,
            MatchStatus::AutoPicked,
            candidates_found,
        )
    }

    pub fn no_match(
        confidence: f64,
        candidates_found: usize,
        best_candidate_label: Option<String>,
    ) -> Self {
        Self {
            catalog_id: None,
            artist: None,
            title: None,
            album_name: None,
            release_date: None,
            popularity: None,
            duration_ms: None,
            external_url: None,
            match_confidence: confidence,
            matched_via: MatchedVia::ArtistTitle,
            status: MatchStatus::NoMatch,
            candidates_found,
            best_candidate_label,
        }
    }

    fn accepted(
        candidate: &CatalogCandidate,
        confidence: f64,
        matched_via: MatchedVia,
        status: MatchStatus,
        candidates_found: usize,
    ) -> Self {
        Self {
            catalog_id: Some(candidate.catalog_id.clone()),
            artist: Some(candidate.artist.clone()),
            title: Some(candidate.title.clone()),
            album_name: candidate.album_name.clone(),
            release_date: candidate.release_date.clone(),
            popularity: Some(candidate.popularity),
            duration_ms: Some(candidate.duration_ms),
            external_url: candidate.external_url.clone(),
            match_confidence: confidence,
            matched_via,
            status,
            candidates_found,
            best_candidate_label: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status != MatchStatus::NoMatch && self.catalog_id.is_some()
    }
}

/// A scanned file, its tag metadata and how it resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackObservation {
    pub file: TrackFile,
    pub metadata: LocalTrackMetadata,
    pub result: MatchResult,
    /// Set when resolution failed with an error and was recorded as unmatched.
    pub error: Option<String>,
}

// ============================================================================
// Ranking
// ============================================================================

/// An accepted match merged with its local file, positioned in the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTrack {
    /// Competition rank, 1-based.
    pub rank: usize,
    pub catalog_id: String,
    pub artist: String,
    pub title: String,
    pub album_name: Option<String>,
    pub release_date: Option<String>,
    pub popularity: u8,
    pub isrc: Option<String>,
    pub match_confidence: f64,
    pub matched_via: MatchedVia,
    pub file_path: PathBuf,
    pub modified_at: Option<String>,
}

impl RankedTrack {
    /// Build an unranked entry; `None` when the observation did not match.
    pub fn from_observation(observation: &TrackObservation) -> Option<Self> {
        let result = &observation.result;
        if !result.is_matched() {
            return None;
        }

        Some(Self {
            rank: 0,
            catalog_id: result.catalog_id.clone()?,
            artist: result
                .artist
                .clone()
                .unwrap_or_else(|| observation.metadata.artist.clone()),
            title: result
                .title
                .clone()
                .unwrap_or_else(|| observation.metadata.title.clone()),
            album_name: result.album_name.clone(),
            release_date: result.release_date.clone(),
            popularity: result.popularity.unwrap_or(0),
            isrc: observation.metadata.isrc.clone(),
            match_confidence: result.match_confidence,
            matched_via: result.matched_via,
            file_path: observation.file.path.clone(),
            modified_at: observation.file.modified_at.clone(),
        })
    }

    pub fn release_date_or_default(&self) -> &str {
        self.release_date.as_deref().unwrap_or(MISSING_RELEASE_DATE)
    }

    pub fn modified_at_or_default(&self) -> &str {
        self.modified_at.as_deref().unwrap_or(MISSING_MODIFIED_AT)
    }
}
