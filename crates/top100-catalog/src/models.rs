// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use top100_domain::CatalogCandidate;

/// Envelope returned by `GET /search?type=track`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<TrackPage>,
}

impl SearchResponse {
    /// Track rows in catalog order, skipping null entries.
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
            .map(|page| page.items.into_iter().flatten().collect())
            .unwrap_or_default()
    }
}

/// One page of track search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPage {
    #[serde(default)]
    pub items: Vec<Option<Track>>,
    #[serde(default)]
    pub total: u32,
}

/// Track object as returned by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Catalog track ID.
    pub id: String,
    /// Track title.
    pub name: String,
    /// Credited artists, lead artist first.
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub duration_ms: u64,
    /// Popularity, 0-100.
    #[serde(default)]
    pub popularity: u8,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlbumRef {
    pub name: String,
    /// Release date (YYYY, YYYY-MM, or YYYY-MM-DD).
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExternalIds {
    #[serde(default)]
    pub isrc: Option<String>,
}

impl From<Track> for CatalogCandidate {
    fn from(track: Track) -> Self {
        let artist = track
            .artists
            .into_iter()
            .next()
            .map(|artist| artist.name)
            .unwrap_or_default();
        let (album_name, release_date) = match track.album {
            Some(album) => (Some(album.name), album.release_date),
            None => (None, None),
        };

        CatalogCandidate {
            catalog_id: track.id,
            artist,
            title: track.name,
            album_name,
            release_date,
            duration_ms: track.duration_ms,
            popularity: track.popularity.min(100),
            isrc: track.external_ids.isrc,
            external_url: track.external_urls.spotify,
            preview_url: track.preview_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_maps_to_candidate_with_lead_artist() {
        let json = serde_json::json!({
            "id": "0VjIjW4GlUZAMYd2vXMi3b",
            "name": "Blinding Lights",
            "artists": [{"id": "1Xyo4u8uXC1ZmMpatF05PJ", "name": "The Weeknd"}, {"name": "Guest"}],
            "album": {"name": "After Hours", "release_date": "2020-03-20"},
            "duration_ms": 200040,
            "popularity": 91,
            "external_urls": {"spotify": "https://open.spotify.com/track/0VjIjW4GlUZAMYd2vXMi3b"},
            "external_ids": {"isrc": "USUG11904206"},
            "preview_url": null
        });

        let track: Track = serde_json::from_value(json).unwrap();
        let candidate = CatalogCandidate::from(track);

        assert_eq!(candidate.artist, "The Weeknd");
        assert_eq!(candidate.title, "Blinding Lights");
        assert_eq!(candidate.album_name.as_deref(), Some("After Hours"));
        assert_eq!(candidate.release_date.as_deref(), Some("2020-03-20"));
        assert_eq!(candidate.duration_ms, 200_040);
        assert_eq!(candidate.popularity, 91);
        assert_eq!(candidate.isrc.as_deref(), Some("USUG11904206"));
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = serde_json::json!({"id": "x", "name": "Untitled"});
        let candidate = CatalogCandidate::from(serde_json::from_value::<Track>(json).unwrap());

        assert_eq!(candidate.artist, "");
        assert_eq!(candidate.duration_ms, 0);
        assert_eq!(candidate.popularity, 0);
        assert_eq!(candidate.album_name, None);
    }

    #[test]
    fn null_items_are_skipped() {
        let json = serde_json::json!({
            "tracks": {"items": [null, {"id": "a", "name": "A"}], "total": 2}
        });
        let response: SearchResponse = serde_json::from_value(json).unwrap();
        let tracks = response.into_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "a");
    }
}
