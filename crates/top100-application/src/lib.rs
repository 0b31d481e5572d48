// SPDX-License-Identifier: GPL-3.0-or-later
pub mod eligibility;
pub mod library;
pub mod matching;
pub mod normalizer;
pub mod ranking;
pub mod report;
pub mod run;

pub use eligibility::{parse_label_month, EligibilityError, EligibilityWindow};
pub use library::{
    read_track_metadata, scan_audio_files, LibraryError, LoftyTagReader, TrackMetadataReader,
};
pub use matching::{Matcher, MatchingError};
pub use normalizer::{
    duration_match, match_score, normalize_artist, normalize_title, similarity, DurationTolerance,
};
pub use ranking::{compare_tracks, RankingEngine, RankingError};
pub use report::{render_csv, report_path, write_csv, ReportError};
pub use run::{RankingRun, RunError, RunReport, RunSummary};
