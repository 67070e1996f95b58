use std::path::Path;

use rusqlite::{params, Connection};
use serde_json::Value as JsonValue;

use crate::config::HnswConfig;
use crate::embedder::Embedding;
use crate::embedder::cosine_distance as dist;
use crate::error::{Error, Result};

/// A single entry as seen by the index: a unit vector plus opaque metadata
/// (category, severity, source; spec §3 data model).
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub id: String,
    pub vector: Embedding,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub cosine_distance: f32,
    pub metadata: JsonValue,
}

/// One named vector index, backed by a SQLite file (or `:memory:`).
///
/// `m` is frozen at creation in a `manifest` table row; [`EmbeddingIndex::open`]
/// with a different `m` returns `Error::Configuration` before any query runs.
pub struct EmbeddingIndex {
    conn: Connection,
    dim: usize,
    params: HnswConfig,
}

impl EmbeddingIndex {
    /// Opens (creating if absent) the index at `path` with dimension `dim`
    /// and the given HNSW params. Fails if a manifest row already exists
    /// with a different `m`.
    pub fn open<P: AsRef<Path>>(path: P, dim: usize, params: HnswConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, dim, params)
    }

    /// In-memory index, for tests and ephemeral sessions.
    pub fn open_in_memory(dim: usize, params: HnswConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, dim, params)
    }

    fn init(conn: Connection, dim: usize, params: HnswConfig) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                embedding TEXT NOT NULL,
                metadata TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS manifest (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        match Self::read_manifest_m(&conn)? {
            Some(existing_m) if existing_m != params.m => {
                return Err(Error::Configuration(format!(
                    "index frozen at m={existing_m}, cannot reopen with m={}",
                    params.m
                )));
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "INSERT INTO manifest (key, value) VALUES ('m', ?)",
                    params![params.m.to_string()],
                )?;
                conn.execute(
                    "INSERT INTO manifest (key, value) VALUES ('dim', ?)",
                    params![dim.to_string()],
                )?;
            }
        }

        Ok(Self { conn, dim, params })
    }

    fn read_manifest_m(conn: &Connection) -> Result<Option<u32>> {
        let mut stmt = conn.prepare("SELECT value FROM manifest WHERE key = 'm'")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let v: String = row.get(0)?;
                Ok(Some(v.parse().map_err(|_| {
                    Error::Internal("corrupt manifest: non-numeric m".into())
                })?))
            }
            None => Ok(None),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn params(&self) -> HnswConfig {
        self.params
    }

    /// Inserts or replaces an entry. The caller is responsible for ensuring
    /// `entry.vector.len() == self.dim()` and near-unit norm.
    pub fn insert(&mut self, entry: &PatternEntry) -> Result<()> {
        let embedding_json = serde_json::to_string(&entry.vector)?;
        let metadata_json = serde_json::to_string(&entry.metadata)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO vectors (id, embedding, metadata) VALUES (?, ?, ?)",
            params![entry.id, embedding_json, metadata_json],
        )?;
        Ok(())
    }

    /// Returns the `k` nearest neighbors by cosine distance, `k` bounded by
    /// `efSearch` so callers cannot force unbounded memory use.
    pub fn search(&self, vector: &Embedding, k: usize) -> Result<Vec<SearchHit>> {
        let k = k.min(self.params.ef_search as usize).max(1);

        let mut stmt = self
            .conn
            .prepare("SELECT id, embedding, metadata FROM vectors")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, embedding_json, metadata_json) = row?;
            let embedding: Embedding = serde_json::from_str(&embedding_json)?;
            let metadata: JsonValue = serde_json::from_str(&metadata_json)?;
            let cosine_distance = dist(vector, &embedding);
            hits.push(SearchHit {
                id,
                cosine_distance,
                metadata,
            });
        }

        hits.sort_by(|a, b| a.cosine_distance.partial_cmp(&b.cosine_distance).unwrap());
        hits.truncate(k);
        Ok(hits)
    }

    pub fn len(&self) -> usize {
        self.conn
            .query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM vectors WHERE id = ?", params![id])?;
        Ok(())
    }
}

/// Opens `path` and treats any failure (missing file, corrupt manifest,
/// frozen-param mismatch) as a size-0 index rather than propagating an
/// error (spec §4.2, "missing or unopenable indices must not propagate as
/// errors").
pub fn open_or_empty<P: AsRef<Path>>(
    path: P,
    dim: usize,
    params: HnswConfig,
) -> Option<EmbeddingIndex> {
    EmbeddingIndex::open(path, dim, params).ok()
}
