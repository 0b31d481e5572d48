// SPDX-License-Identifier: GPL-3.0-or-later

use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use top100_domain::RankedTrack;
use tracing::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CSV_COLUMNS: [&str; 9] = [
    "rank",
    "artist",
    "title",
    "isrc",
    "catalog_id",
    "popularity",
    "release_date",
    "match_confidence",
    "file_path",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// `<output_dir>/<label>/Top100_<label>.csv`
pub fn report_path(output_dir: &Path, label_month: &str) -> PathBuf {
    output_dir
        .join(label_month)
        .join(format!("Top100_{label_month}.csv"))
}

fn row(track: &RankedTrack) -> [String; 9] {
    [
        track.rank.to_string(),
        track.artist.clone(),
        track.title.clone(),
        track.isrc.clone().unwrap_or_default(),
        track.catalog_id.clone(),
        track.popularity.to_string(),
        track.release_date.clone().unwrap_or_default(),
        format!("{:.4}", track.match_confidence),
        track.file_path.to_string_lossy().into_owned(),
    ]
}

/// Excel-friendly CSV: BOM, CRLF line endings, quoting only where needed.
fn write_records<W: Write>(mut out: W, tracks: &[RankedTrack]) -> Result<W, ReportError> {
    out.write_all(UTF8_BOM).map_err(csv::Error::from)?;

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(out);
    writer.write_record(CSV_COLUMNS)?;
    for track in tracks {
        writer.write_record(row(track))?;
    }

    writer
        .into_inner()
        .map_err(|err| ReportError::Csv(err.into_error().into()))
}

/// Render the leaderboard into an in-memory CSV document.
pub fn render_csv(tracks: &[RankedTrack]) -> Result<Vec<u8>, ReportError> {
    write_records(Vec::new(), tracks)
}

/// Write the CSV to `path`, creating parent directories.
pub fn write_csv(tracks: &[RankedTrack], path: &Path) -> Result<(), ReportError> {
    let io_error = |source: io::Error| ReportError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;
    write_records(file, tracks)?
        .sync_all()
        .map_err(io_error)?;

    info!(target: "report", path = %path.display(), tracks = tracks.len(), "wrote CSV report");
    Ok(())
}
