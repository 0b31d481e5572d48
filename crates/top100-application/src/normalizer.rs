// SPDX-License-Identifier: GPL-3.0-or-later

//! Text normalization and similarity scoring for artist/title matching.

use lazy_static::lazy_static;
use regex::Regex;
use top100_config::MatchingConfig;

const TITLE_WEIGHT: f64 = 0.5;
const ARTIST_WEIGHT: f64 = 0.4;
const DURATION_WEIGHT: f64 = 0.1;
const TITLE_WEIGHT_NO_DURATION: f64 = 0.55;
const ARTIST_WEIGHT_NO_DURATION: f64 = 0.45;

lazy_static! {
    static ref ARTIST_FEATURE_PATTERNS: Vec<Regex> = compile_all(&[
        r"(?i)\s+feat\.?\s+.*",
        r"(?i)\s+ft\.?\s+.*",
        r"(?i)\s+featuring\s+.*",
        r"(?i)\s+with\s+.*",
        r"(?i)\s+&\s+.*",
        r"(?i)\s+and\s+.*",
        r"(?i)\s+vs\.?\s+.*",
    ]);
    static ref TITLE_FEATURE_PATTERNS: Vec<Regex> = compile_all(&[
        r"(?i)\s+feat\.?\s+.*",
        r"(?i)\s+ft\.?\s+.*",
        r"(?i)\s+featuring\s+.*",
    ]);
    static ref TITLE_EDITION_PATTERNS: Vec<Regex> = compile_all(&[
        r"(?i)\s*-?\s*(remastered|remaster)\s*\d*",
        r"(?i)\s*[\(\[](remastered|remaster).*?[\)\]]",
        r"(?i)\s*[\(\[](live|acoustic|radio edit|single version|album version).*?[\)\]]",
        r"(?i)\s*[\(\[](deluxe|bonus track|demo).*?[\)\]]",
        r"(?i)\s*-\s*(live|acoustic|radio edit|single version)",
    ]);
    static ref BRACKETED: Regex =
        Regex::new(r"\s*[\(\[].*?[\)\]]").expect("bracket regex is valid");
    static ref LEADING_ARTICLE: Regex =
        Regex::new(r"(?i)^(the|a|an)\s+").expect("article regex is valid");
    static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s\-]").expect("punctuation regex is valid");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("whitespace regex is valid");
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("normalizer pattern is valid"))
        .collect()
}

fn strip_all(value: String, patterns: &[Regex]) -> String {
    patterns.iter().fold(value, |acc, pattern| {
        pattern.replace_all(&acc, "").into_owned()
    })
}

fn collapse_and_lowercase(value: &str) -> String {
    WHITESPACE.replace_all(value, " ").trim().to_lowercase()
}

const MAX_NORMALIZATION_PASSES: usize = 4;

/// Re-apply `pass` until the output is stable, so that normalizing a
/// normalized value is a no-op.
fn until_stable(value: &str, pass: fn(&str) -> String) -> String {
    let mut current = pass(value);
    for _ in 1..MAX_NORMALIZATION_PASSES {
        let next = pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Canonical form of an artist credit.
///
/// Drops featured/collaborating artists, bracketed qualifiers, a leading
/// article and punctuation other than hyphens.
pub fn normalize_artist(artist: &str) -> String {
    until_stable(artist, artist_pass)
}

fn artist_pass(artist: &str) -> String {
    let value = strip_all(artist.to_string(), &ARTIST_FEATURE_PATTERNS);
    let value = BRACKETED.replace_all(&value, "");
    let value = LEADING_ARTICLE.replace(&value, "");
    let value = PUNCTUATION.replace_all(&value, "");
    collapse_and_lowercase(&value)
}

/// Canonical form of a track title.
///
/// Edition markers (remasters, live cuts, radio edits) go first, then
/// feature credits, then the same cleanup the artist pipeline applies.
/// A credit hidden behind an unclosed bracket only surfaces once the
/// punctuation is gone, hence the repeated passes.
pub fn normalize_title(title: &str) -> String {
    until_stable(title, title_pass)
}

fn title_pass(title: &str) -> String {
    let value = strip_all(title.to_string(), &TITLE_EDITION_PATTERNS);
    let value = strip_all(value, &TITLE_FEATURE_PATTERNS);
    let value = BRACKETED.replace_all(&value, "");
    let value = PUNCTUATION.replace_all(&value, "");
    collapse_and_lowercase(&value)
}

/// Levenshtein similarity in `[0, 1]`, case-insensitive, on code points.
pub fn similarity(left: &str, right: &str) -> f64 {
    if left == right {
        return 1.0;
    }
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let max_len = left.chars().count().max(right.chars().count());
    let distance = levenshtein_distance(&left.to_lowercase(), &right.to_lowercase());

    (1.0 - distance as f64 / max_len as f64).clamp(0.0, 1.0)
}

fn levenshtein_distance(left: &str, right: &str) -> usize {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();

    if left_chars.is_empty() {
        return right_chars.len();
    }
    if right_chars.is_empty() {
        return left_chars.len();
    }

    let mut previous_row: Vec<usize> = (0..=right_chars.len()).collect();
    let mut current_row: Vec<usize> = vec![0; right_chars.len() + 1];

    for (left_index, left_char) in left_chars.iter().enumerate() {
        current_row[0] = left_index + 1;
        for (right_index, right_char) in right_chars.iter().enumerate() {
            let insert_cost = current_row[right_index] + 1;
            let delete_cost = previous_row[right_index + 1] + 1;
            let replace_cost = previous_row[right_index] + usize::from(left_char != right_char);
            current_row[right_index + 1] = insert_cost.min(delete_cost).min(replace_cost);
        }
        std::mem::swap(&mut previous_row, &mut current_row);
    }

    previous_row[right_chars.len()]
}

/// Duration agreement bands, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationTolerance {
    pub strict_secs: f64,
    pub loose_secs: f64,
}

impl Default for DurationTolerance {
    fn default() -> Self {
        Self {
            strict_secs: 5.0,
            loose_secs: 10.0,
        }
    }
}

impl DurationTolerance {
    pub fn new(strict_secs: f64, loose_secs: f64) -> Self {
        Self {
            strict_secs,
            loose_secs,
        }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(
            f64::from(config.strict_duration_tolerance_secs),
            f64::from(config.loose_duration_tolerance_secs),
        )
    }

    /// `1.0` within the strict band, `0.5` within the loose band, else `0.0`.
    pub fn score(&self, first: f64, second: f64) -> f64 {
        let diff = (first - second).abs();
        if diff <= self.strict_secs {
            1.0
        } else if diff <= self.loose_secs {
            0.5
        } else {
            0.0
        }
    }

    /// Weighted artist/title/duration score of two tracks.
    ///
    /// When either duration is missing the duration term is dropped and its
    /// weight is shared between title and artist.
    pub fn match_score(
        &self,
        first_artist: &str,
        second_artist: &str,
        first_title: &str,
        second_title: &str,
        first_duration: Option<f64>,
        second_duration: Option<f64>,
    ) -> f64 {
        let title_sim = similarity(&normalize_title(first_title), &normalize_title(second_title));
        let artist_sim = similarity(
            &normalize_artist(first_artist),
            &normalize_artist(second_artist),
        );

        match (first_duration, second_duration) {
            (Some(first), Some(second)) => {
                title_sim * TITLE_WEIGHT
                    + artist_sim * ARTIST_WEIGHT
                    + self.score(first, second) * DURATION_WEIGHT
            }
            _ => title_sim * TITLE_WEIGHT_NO_DURATION + artist_sim * ARTIST_WEIGHT_NO_DURATION,
        }
    }
}

/// [`DurationTolerance::score`] with the default 5s/10s bands.
pub fn duration_match(first: f64, second: f64) -> f64 {
    DurationTolerance::default().score(first, second)
}

/// [`DurationTolerance::match_score`] with the default bands.
pub fn match_score(
    first_artist: &str,
    second_artist: &str,
    first_title: &str,
    second_title: &str,
    first_duration: Option<f64>,
    second_duration: Option<f64>,
) -> f64 {
    DurationTolerance::default().match_score(
        first_artist,
        second_artist,
        first_title,
        second_title,
        first_duration,
        second_duration,
    )
}
