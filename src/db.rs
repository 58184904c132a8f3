use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, ErrorCode, OptionalExtension};

use crate::record::Pokemon;

pub const DB_PATH: &str = "data/pokedex.sqlite";

/// Outcome of persisting one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    /// Unique index on `id` rejected the write; nothing was stored.
    Duplicate,
}

pub trait Sink {
    fn upsert(&mut self, record: &Pokemon) -> Result<Upsert>;
}

/// Document collection on SQLite: one JSON document per Pokémon id.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn get(&self, id: u32) -> Result<Option<Pokemon>> {
        let doc: Option<String> = self
            .conn
            .query_row("SELECT doc FROM pokemon WHERE id = ?1", [id], |r| r.get(0))
            .optional()?;
        doc.map(|d| serde_json::from_str(&d).context("Corrupt document"))
            .transpose()
    }

    pub fn count(&self) -> Result<usize> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM pokemon", [], |r| r.get(0))?;
        Ok(n)
    }

    /// Stored records ordered by id, optionally only those carrying `type_`.
    pub fn overview(&self, type_: Option<&str>, limit: Option<usize>) -> Result<Vec<Pokemon>> {
        let mut sql = String::from("SELECT doc FROM pokemon");
        if type_.is_some() {
            sql.push_str(
                " WHERE EXISTS (SELECT 1 FROM json_each(pokemon.doc, '$.types') t WHERE t.value = ?1)",
            );
        }
        sql.push_str(" ORDER BY id");
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let docs = match type_ {
            Some(t) => stmt
                .query_map([t], |r| r.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], |r| r.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?,
        };
        docs.iter()
            .map(|d| serde_json::from_str(d).context("Corrupt document"))
            .collect()
    }

    /// Number of stored records per type tag, most common first.
    pub fn type_counts(&self) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.value, COUNT(*) AS n
             FROM pokemon, json_each(pokemon.doc, '$.types') t
             GROUP BY t.value
             ORDER BY n DESC, t.value",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl Sink for Store {
    fn upsert(&mut self, record: &Pokemon) -> Result<Upsert> {
        let doc = serde_json::to_string(record)?;
        let now = chrono::Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM pokemon WHERE id = ?1)",
            [record.id],
            |r| r.get(0),
        )?;
        let written = tx.execute(
            "INSERT INTO pokemon (id, doc, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET doc = excluded.doc, updated_at = excluded.updated_at",
            rusqlite::params![record.id, doc, now],
        );
        match written {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Ok(Upsert::Duplicate),
            Err(e) => return Err(e).context(format!("Failed to upsert id {}", record.id)),
        }
        tx.commit()?;

        Ok(if exists { Upsert::Updated } else { Upsert::Inserted })
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pokemon (
            id         INTEGER NOT NULL,
            doc        TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_pokemon_id ON pokemon(id);
        ",
    )?;
    Ok(())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ── Tests ──
