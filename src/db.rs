use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::warn;

use crate::record::ListingRecord;
use crate::sink::{CollectionPath, Sink};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS listings (
            id           INTEGER PRIMARY KEY,
            collection   TEXT NOT NULL,
            source       TEXT NOT NULL,
            title        TEXT,
            link         TEXT,
            status       TEXT,
            prize        TEXT,
            participants TEXT,
            host         TEXT,
            dates        TEXT,
            tags         TEXT NOT NULL DEFAULT '[]',
            image_url    TEXT,
            event_type   TEXT,
            event_mode   TEXT,
            page         INTEGER,
            scraped_at   TEXT NOT NULL,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_listings_collection ON listings(collection);
        CREATE INDEX IF NOT EXISTS idx_listings_source ON listings(source);
        ",
    )?;
    Ok(())
}

// ── Sink ──

/// Every write is its own implicit transaction; nothing spans records.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path)?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Sink for SqliteSink {
    fn write(&mut self, collection: &CollectionPath, r: &ListingRecord) -> Result<String> {
        let tags = serde_json::to_string(&r.tags)?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO listings
             (collection, source, title, link, status, prize, participants, host, dates,
              tags, image_url, event_type, event_mode, page, scraped_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
        )?;
        stmt.execute(rusqlite::params![
            collection.to_string(), r.source, r.title, r.link, r.status, r.prize,
            r.participants, r.host, r.dates, tags, r.image_url, r.event_type,
            r.event_mode, r.page, r.scraped_at.to_rfc3339(),
        ])?;
        Ok(self.conn.last_insert_rowid().to_string())
    }
}

// ── Overview ──

pub struct OverviewRow {
    pub id: i64,
    pub title: Option<String>,
    pub host: Option<String>,
    pub status: Option<String>,
    pub prize: Option<String>,
    pub participants: Option<String>,
    pub dates: Option<String>,
    pub tags: Vec<String>,
    pub link: Option<String>,
}

pub fn fetch_overview(
    conn: &Connection,
    collection: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let where_clause = match collection {
        Some(_) => " WHERE collection = ?1",
        None => "",
    };
    let sql = format!(
        "SELECT id, title, host, status, prize, participants, dates, tags, link
         FROM listings{}
         ORDER BY id DESC
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<OverviewRow> {
        let id: i64 = row.get(0)?;
        let tags: String = row.get(7)?;
        let tags = match serde_json::from_str(&tags) {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Listing {} has unreadable tags {:?}: {}", id, tags, e);
                Vec::new()
            }
        };
        Ok(OverviewRow {
            id,
            title: row.get(1)?,
            host: row.get(2)?,
            status: row.get(3)?,
            prize: row.get(4)?,
            participants: row.get(5)?,
            dates: row.get(6)?,
            tags,
            link: row.get(8)?,
        })
    };
    let rows = match collection {
        Some(c) => stmt.query_map([c], map_row)?.collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

// ── Stats ──

pub struct CollectionStats {
    pub collection: String,
    pub documents: i64,
    pub with_link: i64,
    pub last_scraped: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Vec<CollectionStats>> {
    let mut stmt = conn.prepare(
        "SELECT collection, COUNT(*), COUNT(link), MAX(scraped_at)
         FROM listings
         GROUP BY collection
         ORDER BY collection",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CollectionStats {
                collection: row.get(0)?,
                documents: row.get(1)?,
                with_link: row.get(2)?,
                last_scraped: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
