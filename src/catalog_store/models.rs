//! Catalog entities and the grouped artist/album projection.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Fixed-point money amount with 2 decimal places, stored as integer cents.
///
/// Serialized on the wire as a decimal string (e.g. `"19.99"`) so clients
/// never see float rounding artifacts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cost(i64);

/// At most 6 significant digits (9999.99).
const MAX_COST_CENTS: i64 = 999_999;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CostParseError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimals,
    #[error("Ensure that there are no more than 6 digits in total.")]
    TooManyDigits,
}

impl Cost {
    pub fn from_cents(cents: i64) -> Self {
        Cost(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Parses the wire representation: a decimal string or a JSON number.
    ///
    /// Handlers call this on a raw `serde_json::Value` so a malformed cost
    /// surfaces as a field-scoped validation error instead of a body-level
    /// deserialization rejection.
    pub fn from_json(value: &serde_json::Value) -> Result<Cost, CostParseError> {
        match value {
            serde_json::Value::String(s) => s.parse(),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.to_string().parse()
                } else if let Some(f) = n.as_f64() {
                    format!("{:.2}", f).parse()
                } else {
                    Err(CostParseError::Invalid)
                }
            }
            _ => Err(CostParseError::Invalid),
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Cost {
    type Err = CostParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CostParseError::Invalid);
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CostParseError::Invalid);
        }
        if frac.len() > 2 {
            return Err(CostParseError::TooManyDecimals);
        }
        let whole: i64 = whole.parse().map_err(|_| CostParseError::TooManyDigits)?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().expect("digits checked above") * 10,
            _ => frac.parse().expect("digits checked above"),
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or(CostParseError::TooManyDigits)?;
        if cents > MAX_COST_CENTS {
            return Err(CostParseError::TooManyDigits);
        }
        Ok(Cost(cents))
    }
}

impl Serialize for Cost {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cost {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Cost, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Cost::from_json(&value).map_err(de::Error::custom)
    }
}

// =============================================================================
// Core entities
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: i64,
    pub stage_name: String,
    pub social_link: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Album {
    pub id: i64,
    pub artist_id: i64,
    pub album_name: String,
    pub released_at: i64,
    pub cost: Cost,
    pub is_approved: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Song {
    pub id: i64,
    pub album_id: i64,
    pub name: String,
    pub image_uri: Option<String>,
    pub audio_uri: String,
    pub created_at: i64,
    pub updated_at: i64,
}

// =============================================================================
// Write inputs
// =============================================================================

#[derive(Clone, Debug)]
pub struct NewArtist {
    pub stage_name: String,
    pub social_link: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewAlbum {
    pub artist_id: i64,
    pub album_name: String,
    pub released_at: i64,
    pub cost: Cost,
}

pub const DEFAULT_ALBUM_NAME: &str = "New Album";

#[derive(Clone, Debug)]
pub struct NewSong {
    pub album_id: i64,
    /// Falls back to the album's name when `None`.
    pub name: Option<String>,
    pub image_uri: Option<String>,
    pub audio_uri: String,
}

#[derive(Clone, Debug, Default)]
pub struct AlbumPatch {
    pub album_name: Option<String>,
    pub released_at: Option<i64>,
    pub cost: Option<Cost>,
}

// =============================================================================
// Computed projections
// =============================================================================

/// Live per-artist aggregates, never stored.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ArtistAlbumCounts {
    pub albums: usize,
    pub approved_albums: usize,
}

/// One flat row of the artist LEFT JOIN album query, in join order.
#[derive(Clone, Debug, PartialEq)]
pub struct ArtistAlbumRow {
    pub artist_id: i64,
    pub stage_name: String,
    pub social_link: Option<String>,
    pub album: Option<AlbumSummary>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AlbumSummary {
    pub id: i64,
    pub album_name: String,
    pub created_at: i64,
    pub released_at: i64,
    pub cost: Cost,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ArtistAlbums {
    pub id: i64,
    pub social_link: Option<String>,
    pub albums: Vec<AlbumSummary>,
}

/// Fold the flat join rows into one entry per artist, keyed by stage name.
///
/// The join emits one row per (artist, album) pair plus a single NULL-album
/// row for artists without albums; rows arrive ordered by artist id then
/// album id and that order is preserved in the output.
pub fn group_artist_albums(rows: Vec<ArtistAlbumRow>) -> Vec<(String, ArtistAlbums)> {
    let mut grouped: Vec<(String, ArtistAlbums)> = Vec::new();
    for row in rows {
        let matches_last = grouped
            .last()
            .map(|(_, entry)| entry.id == row.artist_id)
            .unwrap_or(false);
        if !matches_last {
            grouped.push((
                row.stage_name,
                ArtistAlbums {
                    id: row.artist_id,
                    social_link: row.social_link,
                    albums: Vec::new(),
                },
            ));
        }
        if let Some(album) = row.album {
            grouped
                .last_mut()
                .expect("pushed above when missing")
                .1
                .albums
                .push(album);
        }
    }
    grouped
}
