//! Test fixture creation for the catalog database and media directory
//!
//! Seeds three artists, three albums and four songs through the store so
//! every test starts from the same known state. Users are not seeded here,
//! they register through the HTTP API.

use super::constants::*;
use anyhow::Result;
use discograph_server::catalog_store::{
    CatalogStore, Cost, NewAlbum, NewArtist, NewSong, SqliteCatalogStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stand-in audio payload, the server sniffs content type when serving so
/// the bytes don't need to be a real encoder output.
const TEST_AUDIO_BYTES: &[u8] = b"fixture-audio-bytes-not-a-real-mp3";

const TEST_IMAGE_BYTES: &[u8] = b"fixture-image-bytes-not-a-real-jpg";

/// Creates a temporary directory holding the catalog database and the media
/// tree. Returns (temp_dir, catalog_db_path, media_path).
pub fn create_test_dirs() -> Result<(TempDir, PathBuf, PathBuf)> {
    let dir = TempDir::new()?;
    let catalog_db_path = dir.path().join("catalog.db");
    let media_path = dir.path().join("media");
    fs::create_dir_all(media_path.join("song_audio"))?;
    fs::create_dir_all(media_path.join("song_images"))?;
    Ok((dir, catalog_db_path, media_path))
}

fn write_audio_fixture(media_path: &Path, file_name: &str) -> Result<String> {
    let uri = format!("song_audio/{}", file_name);
    fs::write(media_path.join(&uri), TEST_AUDIO_BYTES)?;
    Ok(uri)
}

fn write_image_fixture(media_path: &Path, file_name: &str) -> Result<String> {
    let uri = format!("song_images/{}", file_name);
    fs::write(media_path.join(&uri), TEST_IMAGE_BYTES)?;
    Ok(uri)
}

/// Seeds the fixed catalog described by the constants module. Insert order
/// matters, the tests rely on the resulting autoincrement ids.
pub fn seed_catalog(store: &SqliteCatalogStore, media_path: &Path) -> Result<()> {
    store.create_artist(NewArtist {
        stage_name: ARTIST_1_NAME.to_string(),
        social_link: Some(ARTIST_1_SOCIAL_LINK.to_string()),
    })?;
    store.create_artist(NewArtist {
        stage_name: ARTIST_2_NAME.to_string(),
        social_link: None,
    })?;
    store.create_artist(NewArtist {
        stage_name: ARTIST_3_NAME.to_string(),
        social_link: None,
    })?;

    store.create_album(NewAlbum {
        artist_id: ARTIST_1_ID,
        album_name: ALBUM_1_NAME.to_string(),
        released_at: 1_577_836_800, // 2020-01-01
        cost: Cost::from_cents(999),
    })?;
    store.create_album(NewAlbum {
        artist_id: ARTIST_1_ID,
        album_name: ALBUM_2_NAME.to_string(),
        released_at: 1_609_459_200, // 2021-01-01
        cost: Cost::from_cents(1450),
    })?;
    store.create_album(NewAlbum {
        artist_id: ARTIST_2_ID,
        album_name: ALBUM_3_NAME.to_string(),
        released_at: 1_640_995_200, // 2022-01-01
        cost: Cost::from_cents(500),
    })?;

    let song_1_audio = write_audio_fixture(media_path, "fixture-1.mp3")?;
    let song_1_image = write_image_fixture(media_path, "fixture-1.jpg")?;
    store.create_song(NewSong {
        album_id: ALBUM_1_ID,
        name: Some(SONG_1_NAME.to_string()),
        image_uri: Some(song_1_image),
        audio_uri: song_1_audio,
    })?;
    store.create_song(NewSong {
        album_id: ALBUM_1_ID,
        name: Some(SONG_2_NAME.to_string()),
        image_uri: None,
        audio_uri: write_audio_fixture(media_path, "fixture-2.mp3")?,
    })?;
    store.create_song(NewSong {
        album_id: ALBUM_2_ID,
        name: Some(SONG_3_NAME.to_string()),
        image_uri: None,
        audio_uri: write_audio_fixture(media_path, "fixture-3.mp3")?,
    })?;
    store.create_song(NewSong {
        album_id: ALBUM_3_ID,
        name: Some(SONG_4_NAME.to_string()),
        image_uri: None,
        audio_uri: write_audio_fixture(media_path, "fixture-4.mp3")?,
    })?;

    Ok(())
}
