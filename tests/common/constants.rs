//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When test data changes (user credentials, catalog ids, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Primary test user
pub const TEST_USER: &str = "testuser";

/// Primary test user password
pub const TEST_PASS: &str = "testpass123";

/// Primary test user email
pub const TEST_EMAIL: &str = "testuser@example.com";

/// Secondary test user for permission checks
pub const OTHER_USER: &str = "otheruser";

/// Secondary test user password
pub const OTHER_PASS: &str = "otherpass123";

// ============================================================================
// Seeded Catalog Ids
// ============================================================================
//
// The catalog is seeded into a fresh SQLite file in a fixed order, so the
// autoincrement ids are deterministic.

/// Artist with two albums
pub const ARTIST_1_ID: i64 = 1;

/// Artist with one album
pub const ARTIST_2_ID: i64 = 2;

/// Artist with no albums
pub const ARTIST_3_ID: i64 = 3;

/// First album of artist 1, holds two songs
pub const ALBUM_1_ID: i64 = 1;

/// Second album of artist 1, holds one song
pub const ALBUM_2_ID: i64 = 2;

/// Only album of artist 2, holds one song
pub const ALBUM_3_ID: i64 = 3;

/// Song on album 1, has a cover image
pub const SONG_1_ID: i64 = 1;

/// Song on album 1, no cover image
pub const SONG_2_ID: i64 = 2;

/// The only song on album 2
pub const SONG_3_ID: i64 = 3;

/// The only song on album 3
pub const SONG_4_ID: i64 = 4;

// ============================================================================
// Seeded Catalog Metadata
// ============================================================================

pub const ARTIST_1_NAME: &str = "The Gradient";

pub const ARTIST_1_SOCIAL_LINK: &str = "https://gradient.example.com";

pub const ARTIST_2_NAME: &str = "Night Parcel";

pub const ARTIST_3_NAME: &str = "Hollow Pines";

pub const ALBUM_1_NAME: &str = "Debut Lines";

pub const ALBUM_2_NAME: &str = "Second Pass";

pub const ALBUM_3_NAME: &str = "Lone Signal";

pub const SONG_1_NAME: &str = "Opening Track";

pub const SONG_2_NAME: &str = "Middle Track";

pub const SONG_3_NAME: &str = "Closing Track";

pub const SONG_4_NAME: &str = "Solo Cut";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
