use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            html       TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS policies (
            id         INTEGER PRIMARY KEY,
            page_id    INTEGER UNIQUE NOT NULL REFERENCES pages(id),
            url        TEXT NOT NULL,
            title      TEXT,
            sections   INTEGER NOT NULL DEFAULT 0,
            text_nodes INTEGER NOT NULL DEFAULT 0,
            json       TEXT,
            parsed_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_policies_url ON policies(url);
        ",
    )?;
    Ok(())
}

// ── Fetching ──

pub struct PageRow {
    pub url: String,
    pub html: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

/// Upsert fetched pages by URL. A re-fetch replaces the stored page and
/// drops its parsed policy so it gets processed again.
pub fn save_fetched(conn: &Connection, rows: &[PageRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut clear = tx.prepare(
            "DELETE FROM policies WHERE page_id IN (SELECT id FROM pages WHERE url = ?1)",
        )?;
        let mut upsert = tx.prepare(
            "INSERT INTO pages (url, html, status, error, latency_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO UPDATE SET
                html = excluded.html,
                status = excluded.status,
                error = excluded.error,
                latency_ms = excluded.latency_ms,
                fetched_at = datetime('now')",
        )?;
        for row in rows {
            clear.execute(rusqlite::params![row.url])?;
            count += upsert.execute(rusqlite::params![
                row.url,
                row.html,
                row.status,
                row.error,
                row.latency_ms,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Processing ──

pub struct StoredPage {
    pub page_id: i64,
    pub url: String,
    pub html: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<StoredPage>> {
    let sql = format!(
        "SELECT p.id, p.url, p.html
         FROM pages p
         LEFT JOIN policies pol ON pol.page_id = p.id
         WHERE p.html IS NOT NULL AND pol.id IS NULL
         ORDER BY p.id{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StoredPage {
                page_id: row.get(0)?,
                url: row.get(1)?,
                html: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct PolicyRow {
    pub page_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub sections: i64,
    pub text_nodes: i64,
    /// `None` when the page had no content region.
    pub json: Option<String>,
}

pub fn save_policies(conn: &Connection, rows: &[PolicyRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO policies (page_id, url, title, sections, text_nodes, json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.page_id,
                r.url,
                r.title,
                r.sections,
                r.text_nodes,
                r.json,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Stored policy JSON for a URL. Outer `None`: never processed; inner `None`: no content.
pub fn fetch_policy(conn: &Connection, url: &str) -> Result<Option<Option<String>>> {
    let mut stmt = conn.prepare("SELECT json FROM policies WHERE url = ?1")?;
    let mut rows = stmt.query_map([url], |row| row.get::<_, Option<String>>(0))?;
    Ok(rows.next().transpose()?)
}

// ── Stats ──

pub struct Stats {
    pub pages: i64,
    pub fetched: i64,
    pub errors: i64,
    pub processed: i64,
    pub parsed: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(Stats {
        pages: count("SELECT COUNT(*) FROM pages")?,
        fetched: count("SELECT COUNT(*) FROM pages WHERE html IS NOT NULL")?,
        errors: count("SELECT COUNT(*) FROM pages WHERE error IS NOT NULL")?,
        processed: count("SELECT COUNT(*) FROM policies")?,
        parsed: count("SELECT COUNT(*) FROM policies WHERE json IS NOT NULL")?,
    })
}

// ── Tests ──
