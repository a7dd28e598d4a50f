mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Raw column values of a `gearsets` row.
struct GearsetRow {
    id: String,
    position: u32,
    name: String,
    job: String,
    is_active: bool,
    pieces: String,
    created_at: String,
    updated_at: String,
}

impl GearsetRow {
    fn into_gearset(self) -> Result<Gearset> {
        let pieces: Vec<Gearpiece> = serde_json::from_str(&self.pieces)
            .with_context(|| format!("Corrupt gearpieces for gearset {}", self.id))?;
        Ok(Gearset {
            id: parse_uuid(self.id),
            name: self.name,
            job: self.job,
            is_active: self.is_active,
            position: self.position,
            pieces,
            created_at: parse_datetime(self.created_at),
            updated_at: parse_datetime(self.updated_at),
        })
    }
}

const GEARSET_COLUMNS: &str =
    "id, position, name, job, is_active, pieces, created_at, updated_at";

fn read_gearset_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GearsetRow> {
    Ok(GearsetRow {
        id: row.get(0)?,
        position: row.get(1)?,
        name: row.get(2)?,
        job: row.get(3)?,
        is_active: row.get::<_, i32>(4)? != 0,
        pieces: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    // ============================================================
    // Connection
    // ============================================================

    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        // Ensure the data directory exists
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        // WAL lets the CLI read while the server writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "gearset-tracker")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("gearsets.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Database lock poisoned"))
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Gearset operations
    // ============================================================

    /// All gearsets of `player`, in creation order.
    pub fn load_gearsets(&self, player: PlayerId) -> Result<Vec<Gearset>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM gearsets WHERE player_id = ? ORDER BY position",
            GEARSET_COLUMNS
        ))?;

        let rows = stmt
            .query_map([player.to_string()], read_gearset_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(GearsetRow::into_gearset).collect()
    }

    pub fn get_gearset(&self, player: PlayerId, id: Uuid) -> Result<Option<Gearset>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM gearsets WHERE player_id = ? AND id = ?",
            GEARSET_COLUMNS
        ))?;

        let mut rows = stmt.query((player.to_string(), id.to_string()))?;
        match rows.next()? {
            Some(row) => Ok(Some(read_gearset_row(row)?.into_gearset()?)),
            None => Ok(None),
        }
    }

    /// Replace every stored gearset of `player` with `gearsets`.
    pub fn save_gearsets(&self, player: PlayerId, gearsets: &[Gearset]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let player = player.to_string();

        // Drop the old rows first so removed gearsets disappear too
        tx.execute("DELETE FROM gearsets WHERE player_id = ?", [&player])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO gearsets (id, player_id, position, name, job, is_active, pieces, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for gearset in gearsets {
                // Trees are stored whole, including locks and active indices
                let pieces = serde_json::to_string(&gearset.pieces)
                    .context("Failed to serialize gearpieces")?;
                insert.execute((
                    gearset.id.to_string(),
                    &player,
                    gearset.position,
                    &gearset.name,
                    &gearset.job,
                    if gearset.is_active { 1 } else { 0 },
                    pieces,
                    gearset.created_at.to_rfc3339(),
                    gearset.updated_at.to_rfc3339(),
                ))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete one of `player`'s gearsets. Returns whether it existed.
    pub fn delete_gearset(&self, player: PlayerId, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM gearsets WHERE player_id = ? AND id = ?",
            (player.to_string(), id.to_string()),
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Player operations
    // ============================================================

    pub fn record_login(&self, player: PlayerId) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO players (player_id, last_login_at) VALUES (?, ?)
             ON CONFLICT(player_id) DO UPDATE SET last_login_at = excluded.last_login_at",
            (player.to_string(), Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    /// Known players, most recent login first.
    pub fn list_players(&self) -> Result<Vec<PlayerId>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT player_id FROM players ORDER BY last_login_at DESC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        // Player ids are stored as TEXT to keep the full u64 range
        ids.into_iter()
            .map(|id| {
                id.parse::<PlayerId>()
                    .with_context(|| format!("Invalid player id {}", id))
            })
            .collect()
    }
}

// ============================================================
// Column parsing
// ============================================================

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
