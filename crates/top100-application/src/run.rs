// SPDX-License-Identifier: GPL-3.0-or-later

use crate::eligibility::{parse_label_month, EligibilityError, EligibilityWindow};
use crate::library::{scan_audio_files, LibraryError, LoftyTagReader, TrackMetadataReader};
use crate::matching::Matcher;
use crate::ranking::RankingEngine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use top100_domain::{MatchResult, RankedTrack, TrackFile, TrackObservation};
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Counters for one ranking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_files: usize,
    pub matched: usize,
    /// Includes failed tracks.
    pub unmatched: usize,
    pub failed: usize,
    pub eligible: usize,
    /// Mean catalog popularity over matched tracks, `0.0` when none matched.
    pub average_popularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub label_month: String,
    pub observations: Vec<TrackObservation>,
    pub ranked: Vec<RankedTrack>,
    pub summary: RunSummary,
}

/// Resolves a batch of files against the catalog and builds the leaderboard.
#[derive(Debug)]
pub struct RankingRun {
    matcher: Matcher,
    engine: RankingEngine,
    reader: Arc<dyn TrackMetadataReader>,
    eligibility_months: u32,
    process_limit: usize,
}

impl RankingRun {
    pub fn new(matcher: Matcher, engine: RankingEngine) -> Self {
        Self {
            matcher,
            engine,
            reader: Arc::new(LoftyTagReader),
            eligibility_months: 0,
            process_limit: 0,
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn TrackMetadataReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Months before the label month that count; `0` disables the filter.
    pub fn with_eligibility_months(mut self, months: u32) -> Self {
        self.eligibility_months = months;
        self
    }

    /// Maximum number of files to process; `0` means no limit.
    pub fn with_process_limit(mut self, limit: usize) -> Self {
        self.process_limit = limit;
        self
    }

    /// Scan `root` and run over every audio file found.
    pub async fn run_library(&self, root: &Path, label_month: &str) -> Result<RunReport, RunError> {
        parse_label_month(label_month)?;
        let files = scan_audio_files(root)?;
        self.run(files, label_month).await
    }

    pub async fn run(
        &self,
        mut files: Vec<TrackFile>,
        label_month: &str,
    ) -> Result<RunReport, RunError> {
        parse_label_month(label_month)?;
        let window = match self.eligibility_months {
            0 => None,
            months => Some(EligibilityWindow::for_label_month(label_month, months)?),
        };

        if self.process_limit > 0 && files.len() > self.process_limit {
            files.truncate(self.process_limit);
            info!(target: "run", limit = self.process_limit, "limited number of files");
        }

        let total_files = files.len();
        info!(target: "run", label_month, total_files, "processing files");

        let mut observations = Vec::with_capacity(total_files);
        for (index, file) in files.into_iter().enumerate() {
            info!(
                target: "run",
                progress = %format!("{}/{}", index + 1, total_files),
                file = %file.file_name,
                "processing"
            );
            observations.push(self.observe(file).await);
        }

        let matched: Vec<TrackObservation> = observations
            .iter()
            .filter(|observation| observation.result.is_matched())
            .cloned()
            .collect();

        let eligible = match &window {
            Some(window) => {
                let eligible = window.filter(&matched);
                info!(
                    target: "run",
                    months = self.eligibility_months,
                    eligible = eligible.len(),
                    matched = matched.len(),
                    "eligibility filter applied"
                );
                eligible
            }
            None => {
                info!(target: "run", "eligibility filter disabled");
                matched.clone()
            }
        };

        let ranked = self.engine.rank_observations(&eligible);
        let summary = summarize(&observations, eligible.len());

        info!(
            target: "run",
            matched = summary.matched,
            unmatched = summary.unmatched,
            failed = summary.failed,
            ranked = ranked.len(),
            "run complete"
        );

        Ok(RunReport {
            label_month: label_month.to_string(),
            observations,
            ranked,
            summary,
        })
    }

    async fn observe(&self, file: TrackFile) -> TrackObservation {
        let metadata = match self.reader.read(&file.path) {
            Ok(metadata) => metadata,
            Err(err) => {
                error!(target: "run", file = %file.path.display(), error = %err, "failed to read track metadata");
                return TrackObservation {
                    metadata: Default::default(),
                    result: MatchResult::no_match(0.0, 0, None),
                    error: Some(err.to_string()),
                    file,
                };
            }
        };

        match self.matcher.find_match(&metadata).await {
            Ok(result) => {
                if !result.is_matched() {
                    info!(
                        target: "run",
                        artist = %metadata.artist,
                        title = %metadata.title,
                        confidence = result.match_confidence,
                        "no match found"
                    );
                }
                TrackObservation {
                    file,
                    metadata,
                    result,
                    error: None,
                }
            }
            Err(err) => {
                warn!(target: "run", file = %file.path.display(), error = %err, "failed to match track");
                TrackObservation {
                    file,
                    metadata,
                    result: MatchResult::no_match(0.0, 0, None),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

fn summarize(observations: &[TrackObservation], eligible: usize) -> RunSummary {
    let popularity: Vec<u8> = observations
        .iter()
        .filter(|observation| observation.result.is_matched())
        .filter_map(|observation| observation.result.popularity)
        .collect();
    let matched = popularity.len();
    let failed = observations
        .iter()
        .filter(|observation| observation.error.is_some())
        .count();

    let average_popularity = if matched == 0 {
        0.0
    } else {
        popularity.iter().map(|value| f64::from(*value)).sum::<f64>() / matched as f64
    };

    RunSummary {
        total_files: observations.len(),
        matched,
        unmatched: observations.len() - matched,
        failed,
        eligible,
        average_popularity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::DEFAULT_CONFIDENCE_THRESHOLD;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use top100_catalog::{CatalogError, CatalogSearch, RequestFailure};
    use top100_domain::{CatalogCandidate, LocalTrackMetadata};

    struct MapReader(HashMap<PathBuf, LocalTrackMetadata>);

    impl TrackMetadataReader for MapReader {
        fn read(&self, path: &Path) -> Result<LocalTrackMetadata, LibraryError> {
            self.0.get(path).cloned().ok_or_else(|| LibraryError::Tags {
                path: path.display().to_string(),
                message: "no tags".to_string(),
            })
        }
    }

    /// Answers ISRC lookups from a table; "Broken" artists fail the search.
    struct TableCatalog(HashMap<String, CatalogCandidate>);

    #[async_trait]
    impl CatalogSearch for TableCatalog {
        async fn search_by_exact_id(
            &self,
            isrc: &str,
        ) -> top100_catalog::Result<Vec<CatalogCandidate>> {
            Ok(self.0.get(isrc).cloned().into_iter().collect())
        }

        async fn search_by_artist_title(
            &self,
            artist: &str,
            _: &str,
            _: u32,
        ) -> top100_catalog::Result<Vec<CatalogCandidate>> {
            if artist == "Broken" {
                return Err(CatalogError::RequestFailed {
                    attempts: 5,
                    cause: RequestFailure::Status {
                        status: 503,
                        message: "down".to_string(),
                    },
                });
            }
            Ok(Vec::new())
        }
    }

    fn candidate(id: &str, popularity: u8) -> CatalogCandidate {
        CatalogCandidate {
            catalog_id: id.to_string(),
            artist: format!("Artist {id}"),
            title: format!("Title {id}"),
            album_name: None,
            release_date: Some("2020-01-01".to_string()),
            duration_ms: 180_000,
            popularity,
            isrc: None,
            external_url: None,
            preview_url: None,
        }
    }

    struct Fixture {
        files: Vec<TrackFile>,
        run: RankingRun,
    }

    fn fixture() -> Fixture {
        let entries = [
            ("/music/a.mp3", "2025-02-10 08:00:00", Some("USAAA0000001"), "A"),
            ("/music/b.mp3", "2025-03-05 09:30:00", Some("USAAA0000002"), "B"),
            ("/music/old.mp3", "2023-06-01 12:00:00", Some("USAAA0000003"), "Old"),
            ("/music/unknown.mp3", "2025-03-01 00:00:00", None, "Nobody"),
            ("/music/broken.mp3", "2025-03-01 00:00:00", None, "Broken"),
        ];

        let mut files = Vec::new();
        let mut tags = HashMap::new();
        for (path, modified_at, isrc, artist) in entries {
            files.push(TrackFile::new(path, 100).with_modified_at(modified_at));
            let mut metadata = LocalTrackMetadata::new(artist, "Song");
            metadata.isrc = isrc.map(str::to_string);
            tags.insert(PathBuf::from(path), metadata);
        }
        files.push(TrackFile::new("/music/untagged.mp3", 100));

        let catalog = TableCatalog(HashMap::from([
            ("USAAA0000001".to_string(), candidate("a", 70)),
            ("USAAA0000002".to_string(), candidate("b", 90)),
            ("USAAA0000003".to_string(), candidate("old", 95)),
        ]));
        let matcher = Matcher::new(Arc::new(catalog), DEFAULT_CONFIDENCE_THRESHOLD, 10).unwrap();
        let run = RankingRun::new(matcher, RankingEngine::default())
            .with_reader(Arc::new(MapReader(tags)))
            .with_eligibility_months(3);

        Fixture { files, run }
    }

    #[tokio::test]
    async fn run_ranks_eligible_matches_and_records_failures() {
        let Fixture { files, run } = fixture();

        let report = run.run(files, "2025-03").await.unwrap();

        let ranked: Vec<(&str, usize)> = report
            .ranked
            .iter()
            .map(|track| (track.catalog_id.as_str(), track.rank))
            .collect();
        assert_eq!(ranked, vec![("b", 1), ("a", 2)]);

        assert_eq!(
            report.summary,
            RunSummary {
                total_files: 6,
                matched: 3,
                unmatched: 3,
                failed: 2,
                eligible: 2,
                average_popularity: (70.0 + 90.0 + 95.0) / 3.0,
            }
        );

        let broken = report
            .observations
            .iter()
            .find(|observation| observation.file.file_name == "broken.mp3")
            .unwrap();
        assert!(broken.error.as_deref().unwrap().contains("catalog lookup failed"));
        assert!(!broken.result.is_matched());
    }

    #[tokio::test]
    async fn disabled_eligibility_keeps_every_match() {
        let Fixture { files, run } = fixture();

        let report = run
            .with_eligibility_months(0)
            .run(files, "2025-03")
            .await
            .unwrap();

        assert_eq!(report.summary.eligible, 3);
        assert_eq!(report.ranked[0].catalog_id, "old");
    }

    #[tokio::test]
    async fn process_limit_truncates_input() {
        let Fixture { files, run } = fixture();

        let report = run
            .with_process_limit(2)
            .run(files, "2025-03")
            .await
            .unwrap();

        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.observations.len(), 2);
    }

    #[tokio::test]
    async fn invalid_label_month_fails_before_matching() {
        let Fixture { files, run } = fixture();

        let err = run.run(files, "March").await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Eligibility(EligibilityError::InvalidLabelMonth(_))
        ));
    }

    #[tokio::test]
    async fn label_month_is_validated_without_eligibility_window() {
        let Fixture { files, run } = fixture();

        let err = run
            .with_eligibility_months(0)
            .run(files, "../../etc")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RunError::Eligibility(EligibilityError::InvalidLabelMonth(_))
        ));
    }

    #[test]
    fn empty_run_has_zero_average() {
        assert_eq!(summarize(&[], 0), RunSummary::default());
    }
}
