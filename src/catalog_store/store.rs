//! SQLite-backed catalog store.
//!
//! Writes go through a single connection behind a mutex; reads are served
//! from a small pool of read-only connections picked round-robin. The song
//! deletion guard runs inside one immediate transaction on the write
//! connection, so concurrent deletes serialize and can never leave an album
//! without songs.

use super::models::*;
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::trait_def::{CatalogError, CatalogResult, CatalogStore};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

const SET_UPDATED_AT: &str = "updated_at = cast(strftime('%s','now') as int)";

#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let latest_version = CATALOG_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &CATALOG_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating catalog db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let mut current_version = db_version as usize;

    if current_version < latest_version {
        let tx = conn.transaction()?;
        for schema in CATALOG_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating catalog db from version {} to {}",
                    current_version, schema.version
                );
                migration_fn(&tx)?;
                current_version = schema.version;
            }
        }
        tx.pragma_update(None, "user_version", current_version)?;
        tx.commit()?;
    }

    latest_schema.validate(conn)
}

fn artist_from_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        stage_name: row.get(1)?,
        social_link: row.get(2)?,
    })
}

fn album_from_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        artist_id: row.get(1)?,
        album_name: row.get(2)?,
        released_at: row.get(3)?,
        cost: Cost::from_cents(row.get(4)?),
        is_approved: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const ALBUM_COLUMNS: &str =
    "id, artist_id, album_name, released_at, cost_cents, is_approved, created_at, updated_at";

fn song_from_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        album_id: row.get(1)?,
        name: row.get(2)?,
        image_uri: row.get(3)?,
        audio_uri: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const SONG_COLUMNS: &str = "id, album_id, name, image_uri, audio_uri, created_at, updated_at";

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open catalog database")?;

        migrate_if_needed(&mut write_conn)?;

        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        // Per-connection pragma, required for the ON DELETE CASCADE chains.
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "journal_mode", "WAL")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn count_table(&self, table: &str) -> usize {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get::<_, i64>(0)
        })
        .map(|c| c as usize)
        .unwrap_or(0)
    }

    /// Runs `body` inside a BEGIN IMMEDIATE transaction on the write
    /// connection, committing on success and rolling back on any error.
    fn with_write_tx<T>(
        &self,
        body: impl FnOnce(&Connection) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute("BEGIN IMMEDIATE", [])
            .map_err(anyhow::Error::from)?;

        match body(&conn) {
            Ok(value) => {
                conn.execute("COMMIT", []).map_err(anyhow::Error::from)?;
                Ok(value)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn get_album_on(conn: &Connection, id: i64) -> Result<Option<Album>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM album WHERE id = ?1",
            ALBUM_COLUMNS
        ))?;
        match stmt.query_row(params![id], album_from_row) {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_song_on(conn: &Connection, id: i64) -> Result<Option<Song>> {
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {} FROM song WHERE id = ?1", SONG_COLUMNS))?;
        match stmt.query_row(params![id], song_from_row) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn album_song_count_on(conn: &Connection, album_id: i64) -> Result<i64> {
        let mut stmt = conn.prepare_cached("SELECT COUNT(*) FROM song WHERE album_id = ?1")?;
        Ok(stmt.query_row(params![album_id], |r| r.get(0))?)
    }
}

impl CatalogStore for SqliteCatalogStore {
    // =========================================================================
    // Artists
    // =========================================================================

    fn list_artists(&self) -> Result<Vec<Artist>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached("SELECT id, stage_name, social_link FROM artist ORDER BY id ASC")?;
        let artists = stmt
            .query_map([], artist_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn get_artist(&self, id: i64) -> Result<Option<Artist>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT id, stage_name, social_link FROM artist WHERE id = ?1")?;
        match stmt.query_row(params![id], artist_from_row) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create_artist(&self, new_artist: NewArtist) -> CatalogResult<Artist> {
        self.with_write_tx(|conn| {
            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM artist WHERE stage_name = ?1)",
                    params![&new_artist.stage_name],
                    |r| r.get(0),
                )
                .map_err(anyhow::Error::from)?;
            if exists {
                return Err(CatalogError::DuplicateStageName);
            }

            conn.execute(
                "INSERT INTO artist (stage_name, social_link) VALUES (?1, ?2)",
                params![&new_artist.stage_name, &new_artist.social_link],
            )
            .map_err(anyhow::Error::from)?;

            Ok(Artist {
                id: conn.last_insert_rowid(),
                stage_name: new_artist.stage_name,
                social_link: new_artist.social_link,
            })
        })
    }

    fn delete_artist(&self, id: i64) -> CatalogResult<()> {
        self.with_write_tx(|conn| {
            let deleted = conn
                .execute("DELETE FROM artist WHERE id = ?1", params![id])
                .map_err(anyhow::Error::from)?;
            if deleted == 0 {
                return Err(CatalogError::UnknownArtist(id));
            }
            Ok(())
        })
    }

    fn artist_album_counts(&self, id: i64) -> Result<Option<ArtistAlbumCounts>> {
        if self.get_artist(id)?.is_none() {
            return Ok(None);
        }
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT COUNT(*), COALESCE(SUM(is_approved), 0) FROM album WHERE artist_id = ?1",
        )?;
        let counts = stmt.query_row(params![id], |r| {
            Ok(ArtistAlbumCounts {
                albums: r.get::<_, i64>(0)? as usize,
                approved_albums: r.get::<_, i64>(1)? as usize,
            })
        })?;
        Ok(Some(counts))
    }

    fn list_artist_album_rows(&self) -> Result<Vec<ArtistAlbumRow>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.stage_name, a.social_link, \
                    al.id, al.album_name, al.created_at, al.released_at, al.cost_cents \
             FROM artist a LEFT JOIN album al ON al.artist_id = a.id \
             ORDER BY a.id ASC, al.id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let album = match row.get::<_, Option<i64>>(3)? {
                    Some(album_id) => Some(AlbumSummary {
                        id: album_id,
                        album_name: row.get(4)?,
                        created_at: row.get(5)?,
                        released_at: row.get(6)?,
                        cost: Cost::from_cents(row.get(7)?),
                    }),
                    None => None,
                };
                Ok(ArtistAlbumRow {
                    artist_id: row.get(0)?,
                    stage_name: row.get(1)?,
                    social_link: row.get(2)?,
                    album,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // =========================================================================
    // Albums
    // =========================================================================

    fn get_album(&self, id: i64) -> Result<Option<Album>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        Self::get_album_on(&conn, id)
    }

    fn create_album(&self, new_album: NewAlbum) -> CatalogResult<Album> {
        self.with_write_tx(|conn| {
            let artist_exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM artist WHERE id = ?1)",
                    params![new_album.artist_id],
                    |r| r.get(0),
                )
                .map_err(anyhow::Error::from)?;
            if !artist_exists {
                return Err(CatalogError::UnknownArtist(new_album.artist_id));
            }

            conn.execute(
                "INSERT INTO album (artist_id, album_name, released_at, cost_cents) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    new_album.artist_id,
                    &new_album.album_name,
                    new_album.released_at,
                    new_album.cost.cents()
                ],
            )
            .map_err(anyhow::Error::from)?;

            let id = conn.last_insert_rowid();
            Self::get_album_on(conn, id)?.ok_or_else(|| CatalogError::UnknownAlbum(id))
        })
    }

    fn update_album(&self, id: i64, patch: AlbumPatch) -> CatalogResult<Album> {
        self.with_write_tx(|conn| {
            let album = Self::get_album_on(conn, id)?.ok_or(CatalogError::UnknownAlbum(id))?;

            let album_name = patch.album_name.unwrap_or(album.album_name);
            let released_at = patch.released_at.unwrap_or(album.released_at);
            let cost = patch.cost.unwrap_or(album.cost);

            conn.execute(
                &format!(
                    "UPDATE album SET album_name = ?1, released_at = ?2, cost_cents = ?3, {} \
                     WHERE id = ?4",
                    SET_UPDATED_AT
                ),
                params![&album_name, released_at, cost.cents(), id],
            )
            .map_err(anyhow::Error::from)?;

            Self::get_album_on(conn, id)?.ok_or(CatalogError::UnknownAlbum(id))
        })
    }

    fn delete_album(&self, id: i64) -> CatalogResult<()> {
        self.with_write_tx(|conn| {
            let deleted = conn
                .execute("DELETE FROM album WHERE id = ?1", params![id])
                .map_err(anyhow::Error::from)?;
            if deleted == 0 {
                return Err(CatalogError::UnknownAlbum(id));
            }
            Ok(())
        })
    }

    fn approve_albums(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = std::iter::repeat("?")
            .take(ids.len())
            .collect::<Vec<_>>()
            .join(", ");
        let conn = self.write_conn.lock().unwrap();
        let changed = conn.execute(
            &format!(
                "UPDATE album SET is_approved = 1, {} WHERE id IN ({}) AND is_approved = 0",
                SET_UPDATED_AT, placeholders
            ),
            rusqlite::params_from_iter(ids.iter()),
        )?;
        Ok(changed)
    }

    // =========================================================================
    // Songs
    // =========================================================================

    fn get_song(&self, id: i64) -> Result<Option<Song>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        Self::get_song_on(&conn, id)
    }

    fn create_song(&self, new_song: NewSong) -> CatalogResult<Song> {
        self.with_write_tx(|conn| {
            let album = Self::get_album_on(conn, new_song.album_id)?
                .ok_or(CatalogError::UnknownAlbum(new_song.album_id))?;

            let name = new_song.name.unwrap_or(album.album_name);

            conn.execute(
                "INSERT INTO song (album_id, name, image_uri, audio_uri) VALUES (?1, ?2, ?3, ?4)",
                params![
                    new_song.album_id,
                    &name,
                    &new_song.image_uri,
                    &new_song.audio_uri
                ],
            )
            .map_err(anyhow::Error::from)?;

            let id = conn.last_insert_rowid();
            Self::get_song_on(conn, id)?.ok_or(CatalogError::UnknownSong(id))
        })
    }

    fn rename_song(&self, id: i64, name: &str) -> CatalogResult<Song> {
        self.with_write_tx(|conn| {
            let changed = conn
                .execute(
                    &format!("UPDATE song SET name = ?1, {} WHERE id = ?2", SET_UPDATED_AT),
                    params![name, id],
                )
                .map_err(anyhow::Error::from)?;
            if changed == 0 {
                return Err(CatalogError::UnknownSong(id));
            }
            Self::get_song_on(conn, id)?.ok_or(CatalogError::UnknownSong(id))
        })
    }

    fn delete_song(&self, id: i64) -> CatalogResult<()> {
        self.with_write_tx(|conn| {
            let song = Self::get_song_on(conn, id)?.ok_or(CatalogError::UnknownSong(id))?;

            if Self::album_song_count_on(conn, song.album_id)? == 1 {
                let album = Self::get_album_on(conn, song.album_id)?
                    .ok_or(CatalogError::UnknownAlbum(song.album_id))?;
                return Err(CatalogError::LastSongOfAlbum {
                    song: song.name,
                    album: album.album_name,
                });
            }

            conn.execute("DELETE FROM song WHERE id = ?1", params![id])
                .map_err(anyhow::Error::from)?;
            Ok(())
        })
    }

    fn delete_songs(&self, ids: &[i64]) -> CatalogResult<()> {
        // A song named twice in one batch still dies only once.
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }
        self.with_write_tx(|conn| {
            // Tally deletions per album against the current counts before
            // touching anything, so a rejected batch leaves no partial state.
            let mut remaining: HashMap<i64, i64> = HashMap::new();
            for id in &ids {
                let song = Self::get_song_on(conn, *id)?.ok_or(CatalogError::UnknownSong(*id))?;
                let left = match remaining.get(&song.album_id) {
                    Some(count) => count - 1,
                    None => Self::album_song_count_on(conn, song.album_id)? - 1,
                };
                if left == 0 {
                    return Err(CatalogError::BatchWouldEmptyAlbum);
                }
                remaining.insert(song.album_id, left);
            }

            for id in &ids {
                conn.execute("DELETE FROM song WHERE id = ?1", params![id])
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    // =========================================================================
    // Counts
    // =========================================================================

    fn get_artists_count(&self) -> usize {
        self.count_table("artist")
    }

    fn get_albums_count(&self) -> usize {
        self.count_table("album")
    }

    fn get_songs_count(&self) -> usize {
        self.count_table("song")
    }
}
