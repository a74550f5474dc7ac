//! CatalogStore trait definition.
//!
//! Abstracts the catalog storage backend so handlers and tests depend on the
//! operations rather than on SQLite directly.

use super::models::*;
use anyhow::Result;

/// Failures with meaning at the request boundary. Anything else is wrapped
/// in `Other` and surfaces as an internal error.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Cannot delete the song {song} because it is the only one belonging to the album {album}")]
    LastSongOfAlbum { song: String, album: String },

    #[error("Cannot delete the selected songs because that would leave albums with no songs")]
    BatchWouldEmptyAlbum,

    #[error("artist {0} does not exist")]
    UnknownArtist(i64),

    #[error("album {0} does not exist")]
    UnknownAlbum(i64),

    #[error("song {0} does not exist")]
    UnknownSong(i64),

    #[error("an artist with this stage name already exists")]
    DuplicateStageName,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Trait for catalog storage backends.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Artists
    // =========================================================================

    fn list_artists(&self) -> Result<Vec<Artist>>;

    fn get_artist(&self, id: i64) -> Result<Option<Artist>>;

    fn create_artist(&self, new_artist: NewArtist) -> CatalogResult<Artist>;

    /// Cascades to albums and songs through the schema's foreign keys.
    fn delete_artist(&self, id: i64) -> CatalogResult<()>;

    /// Live `albums` / `approved_albums` aggregates for one artist.
    fn artist_album_counts(&self, id: i64) -> Result<Option<ArtistAlbumCounts>>;

    /// Flat `artist LEFT JOIN album` rows ordered by artist id then album id,
    /// input to [`group_artist_albums`].
    fn list_artist_album_rows(&self) -> Result<Vec<ArtistAlbumRow>>;

    // =========================================================================
    // Albums
    // =========================================================================

    fn get_album(&self, id: i64) -> Result<Option<Album>>;

    fn create_album(&self, new_album: NewAlbum) -> CatalogResult<Album>;

    fn update_album(&self, id: i64, patch: AlbumPatch) -> CatalogResult<Album>;

    /// Cascades to songs, bypassing the song deletion guard.
    fn delete_album(&self, id: i64) -> CatalogResult<()>;

    /// Marks the given albums approved, returning how many rows changed.
    /// Unknown ids are ignored.
    fn approve_albums(&self, ids: &[i64]) -> Result<usize>;

    // =========================================================================
    // Songs
    // =========================================================================

    fn get_song(&self, id: i64) -> Result<Option<Song>>;

    fn create_song(&self, new_song: NewSong) -> CatalogResult<Song>;

    fn rename_song(&self, id: i64, name: &str) -> CatalogResult<Song>;

    /// Rejects with [`CatalogError::LastSongOfAlbum`] when the song is the
    /// only one left on its album.
    fn delete_song(&self, id: i64) -> CatalogResult<()>;

    /// All-or-nothing batch delete; rejects with
    /// [`CatalogError::BatchWouldEmptyAlbum`] when the batch would leave any
    /// album without songs.
    fn delete_songs(&self, ids: &[i64]) -> CatalogResult<()>;

    // =========================================================================
    // Counts (for startup logging and the stats endpoint)
    // =========================================================================

    fn get_artists_count(&self) -> usize;

    fn get_albums_count(&self) -> usize;

    fn get_songs_count(&self) -> usize;
}
