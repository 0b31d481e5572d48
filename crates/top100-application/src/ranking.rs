// SPDX-License-Identifier: GPL-3.0-or-later

use std::cmp::Ordering;
use thiserror::Error;
use top100_domain::{RankedTrack, TrackObservation};
use tracing::{debug, info};

pub const DEFAULT_TOP_N: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankingError {
    #[error("top_n must be greater than zero")]
    InvalidTopN,
}

/// Orders matched tracks into a competition-ranked leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingEngine {
    top_n: usize,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl RankingEngine {
    pub fn new(top_n: usize) -> Result<Self, RankingError> {
        if top_n == 0 {
            return Err(RankingError::InvalidTopN);
        }
        Ok(Self { top_n })
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Rank the matched observations; unmatched ones are ignored.
    pub fn rank_observations(&self, observations: &[TrackObservation]) -> Vec<RankedTrack> {
        let tracks = observations
            .iter()
            .filter_map(RankedTrack::from_observation)
            .collect();
        self.rank(tracks)
    }

    /// Sort, truncate to `top_n` and assign ranks.
    ///
    /// Equal popularity shares a rank; the next distinct popularity takes its
    /// 1-based position, so `[90, 90, 80]` ranks as `[1, 1, 3]`.
    pub fn rank(&self, mut tracks: Vec<RankedTrack>) -> Vec<RankedTrack> {
        let input_len = tracks.len();
        tracks.sort_by(compare_tracks);
        tracks.truncate(self.top_n);

        let mut previous: Option<(u8, usize)> = None;
        for (index, track) in tracks.iter_mut().enumerate() {
            let rank = match previous {
                Some((popularity, rank)) if popularity == track.popularity => rank,
                _ => index + 1,
            };
            track.rank = rank;
            previous = Some((track.popularity, rank));
        }

        debug!(target: "ranking", input_len, kept = tracks.len(), top_n = self.top_n, "ranked tracks");
        if let Some(leader) = tracks.first() {
            info!(
                target: "ranking",
                artist = %leader.artist,
                title = %leader.title,
                popularity = leader.popularity,
                "leaderboard built"
            );
        }
        tracks
    }
}

/// Leaderboard order: popularity, release date and file mtime descending,
/// then artist and title ascending ignoring ASCII case.
pub fn compare_tracks(left: &RankedTrack, right: &RankedTrack) -> Ordering {
    right
        .popularity
        .cmp(&left.popularity)
        .then_with(|| {
            right
                .release_date_or_default()
                .cmp(left.release_date_or_default())
        })
        .then_with(|| {
            right
                .modified_at_or_default()
                .cmp(left.modified_at_or_default())
        })
        .then_with(|| compare_ignore_ascii_case(&left.artist, &right.artist))
        .then_with(|| compare_ignore_ascii_case(&left.title, &right.title))
}

fn compare_ignore_ascii_case(left: &str, right: &str) -> Ordering {
    left.bytes()
        .map(|byte| byte.to_ascii_lowercase())
        .cmp(right.bytes().map(|byte| byte.to_ascii_lowercase()))
}
