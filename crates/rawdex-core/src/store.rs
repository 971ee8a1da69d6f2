//! SQLite sink for indexed images.
//!
//! One connection, owned by the coordinator. Rows are inserted one at a time
//! in autocommit mode.

use rusqlite::{params, Connection};
use std::path::Path;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::types::ImageRecord;

const INSERT_IMAGE: &str = "INSERT INTO image (
        filename, project, timestamp, artist, copyright, make, model, lens_model, aperture,
        focal_length, exposure_time_n, exposure_time_d, iso, exposure_program, flash, rank, preview
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)";

const CREATE_IMAGE_TABLE: &str = "CREATE TABLE IF NOT EXISTS image (
        id                  INTEGER PRIMARY KEY,
        filename            TEXT NOT NULL,
        project             TEXT NOT NULL,
        timestamp           INTEGER NOT NULL,
        artist              TEXT NOT NULL,
        copyright           TEXT NOT NULL,
        make                TEXT NOT NULL,
        model               TEXT NOT NULL,
        lens_model          TEXT NOT NULL,
        aperture            REAL NOT NULL,
        focal_length        REAL NOT NULL,
        exposure_time_n     INTEGER NOT NULL,
        exposure_time_d     INTEGER NOT NULL,
        iso                 REAL NOT NULL,
        exposure_program    INTEGER NOT NULL,
        flash               INTEGER NOT NULL,
        rank                INTEGER NOT NULL,
        preview             BLOB NOT NULL
    )";

/// Connection to the image database.
pub struct ImageStore {
    conn: Connection,
}

impl ImageStore {
    /// Open (or create) the database file and apply the journal mode.
    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn, config)
    }

    /// Use an existing connection, e.g. an in-memory database.
    pub fn with_connection(conn: Connection, config: &StoreConfig) -> Result<Self, StoreError> {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", &config.journal_mode, |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "Opened image database");
        Ok(Self { conn })
    }

    /// Create the `image` table if it does not exist yet.
    pub fn create_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(CREATE_IMAGE_TABLE, [])?;
        Ok(())
    }

    /// Insert one row.
    pub fn insert(&self, record: &ImageRecord<'_>) -> Result<(), StoreError> {
        let exif = record.exif;
        let mut stmt = self.conn.prepare_cached(INSERT_IMAGE)?;
        stmt.execute(params![
            record.filename,
            record.project,
            exif.timestamp as i64,
            exif.artist,
            exif.copyright,
            exif.make,
            exif.model,
            exif.lens_model,
            f64::from(exif.aperture),
            f64::from(exif.focal_length),
            exif.exposure_time.0,
            exif.exposure_time.1,
            f64::from(exif.iso_speed),
            exif.exposure_program,
            exif.flash,
            record.dop.rank,
            record.preview,
        ])?;
        Ok(())
    }

    /// Number of rows in the `image` table.
    pub fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM image", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Underlying connection, for queries outside the indexing path.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
