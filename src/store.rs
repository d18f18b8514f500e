// src/store.rs
// =============================================================================
// SQLite storage for submitted URLs and their analysis.
//
// Two tables:
// - urls: one row per submitted URL, its status and the last analysis
// - broken_links: the broken external links of each URL
//
// The crawl loop only needs four operations (fetch_queued, set_status,
// save_analysis, replace_broken_links). The rest serve the CLI.
// =============================================================================

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::error::Result;
use crate::model::{AnalysisResult, BrokenLink, HtmlVersion, UrlRecord, UrlStatus};

const CREATE_URLS: &str = "CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'queued',
    html_version TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    h1_count INTEGER NOT NULL DEFAULT 0,
    h2_count INTEGER NOT NULL DEFAULT 0,
    h3_count INTEGER NOT NULL DEFAULT 0,
    h4_count INTEGER NOT NULL DEFAULT 0,
    h5_count INTEGER NOT NULL DEFAULT 0,
    h6_count INTEGER NOT NULL DEFAULT 0,
    internal_links INTEGER NOT NULL DEFAULT 0,
    external_links INTEGER NOT NULL DEFAULT 0,
    broken_links INTEGER NOT NULL DEFAULT 0,
    has_login_form BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

const CREATE_BROKEN_LINKS: &str = "CREATE TABLE IF NOT EXISTS broken_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL REFERENCES urls(id),
    broken_url TEXT NOT NULL,
    status_code INTEGER NOT NULL
)";

const SELECT_URLS: &str = "SELECT id, url, status, html_version, title,
    h1_count, h2_count, h3_count, h4_count, h5_count, h6_count,
    internal_links, external_links, broken_links, has_login_form, created_at
    FROM urls";

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (or creates) the database file and makes sure the tables exist
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!("Opened database {}", path.display());

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    /// A private in-memory database, mostly useful for tests
    pub async fn in_memory() -> Result<Self> {
        // Every new connection to :memory: would see an empty database,
        // so the pool must never open a second one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.create_tables().await?;
        Ok(store)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(CREATE_URLS).execute(&self.pool).await?;
        sqlx::query(CREATE_BROKEN_LINKS).execute(&self.pool).await?;
        Ok(())
    }

    /// Submits a URL for crawling; it starts out queued
    pub async fn add_url(&self, url: &str) -> Result<i64> {
        let id = sqlx::query("INSERT INTO urls (url, status) VALUES (?, ?)")
            .bind(url)
            .bind(UrlStatus::Queued.as_str())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    /// Every URL currently waiting to be processed, oldest first
    pub async fn fetch_queued(&self) -> Result<Vec<(i64, String)>> {
        let rows = sqlx::query("SELECT id, url FROM urls WHERE status = ? ORDER BY id")
            .bind(UrlStatus::Queued.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<(i64, String)> { Ok((row.try_get("id")?, row.try_get("url")?)) })
            .collect()
    }

    pub async fn set_status(&self, id: i64, status: UrlStatus) -> Result<()> {
        sqlx::query("UPDATE urls SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // Moves a URL to `to`, but only if its current status is one of `from`
    //
    // Returns false when the URL does not exist or is in another state.
    pub async fn transition(&self, id: i64, from: &[UrlStatus], to: UrlStatus) -> Result<bool> {
        if from.is_empty() {
            return Ok(false);
        }

        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE urls SET status = ? WHERE id = ? AND status IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(to.as_str()).bind(id);
        for status in from {
            query = query.bind(status.as_str());
        }

        let affected = query.execute(&self.pool).await?.rows_affected();
        Ok(affected > 0)
    }

    /// Puts a URL back in the queue whatever its status; false if unknown
    pub async fn requeue(&self, id: i64) -> Result<bool> {
        let affected = sqlx::query("UPDATE urls SET status = ? WHERE id = ?")
            .bind(UrlStatus::Queued.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    // Writes every structural field of the analysis and marks the URL done
    //
    // Only applies while the URL is still running. Returns false when the
    // user moved it elsewhere (stop-url, requeue, delete) in the meantime.
    pub async fn save_analysis(&self, id: i64, result: &AnalysisResult) -> Result<bool> {
        let affected = sqlx::query(
            "UPDATE urls SET
                status = ?,
                html_version = ?,
                title = ?,
                h1_count = ?,
                h2_count = ?,
                h3_count = ?,
                h4_count = ?,
                h5_count = ?,
                h6_count = ?,
                internal_links = ?,
                external_links = ?,
                broken_links = ?,
                has_login_form = ?
            WHERE id = ? AND status = ?",
        )
        .bind(UrlStatus::Done.as_str())
        .bind(result.html_version.map(|v| v.as_str()).unwrap_or(""))
        .bind(result.title.as_str())
        .bind(result.heading_count(1) as i64)
        .bind(result.heading_count(2) as i64)
        .bind(result.heading_count(3) as i64)
        .bind(result.heading_count(4) as i64)
        .bind(result.heading_count(5) as i64)
        .bind(result.heading_count(6) as i64)
        .bind(result.internal_links as i64)
        .bind(result.external_links as i64)
        .bind(result.broken_links as i64)
        .bind(result.has_login_form)
        .bind(id)
        .bind(UrlStatus::Running.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    /// Swaps the stored broken links of a URL for `links` in one transaction
    pub async fn replace_broken_links(&self, id: i64, links: &[BrokenLink]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM broken_links WHERE url_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for link in links {
            sqlx::query("INSERT INTO broken_links (url_id, broken_url, status_code) VALUES (?, ?, ?)")
                .bind(id)
                .bind(link.url.as_str())
                .bind(link.status_code as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn broken_links(&self, id: i64) -> Result<Vec<BrokenLink>> {
        let rows = sqlx::query(
            "SELECT broken_url, status_code FROM broken_links WHERE url_id = ? ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<BrokenLink> {
                let status_code: i64 = row.try_get("status_code")?;
                Ok(BrokenLink {
                    url: row.try_get("broken_url")?,
                    status_code: status_code as u16,
                })
            })
            .collect()
    }

    pub async fn get_url(&self, id: i64) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_URLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut record = record_from_row(&row)?;
                record.analysis.broken_links_list = self.broken_links(record.id).await?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// All URLs, newest first, each with its broken links
    pub async fn list_urls(&self) -> Result<Vec<UrlRecord>> {
        let rows = sqlx::query(&format!("{} ORDER BY id DESC", SELECT_URLS))
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = record_from_row(row)?;
            record.analysis.broken_links_list = self.broken_links(record.id).await?;
            records.push(record);
        }
        Ok(records)
    }

    /// Removes a URL and its broken links; false if it did not exist
    pub async fn delete_url(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM broken_links WHERE url_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let affected = sqlx::query("DELETE FROM urls WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(affected > 0)
    }

    /// Drops the broken_links table so that writes to it fail
    #[cfg(test)]
    pub(crate) async fn break_broken_links_table(&self) {
        sqlx::query("DROP TABLE broken_links")
            .execute(&self.pool)
            .await
            .unwrap();
    }

    #[cfg(test)]
    pub(crate) async fn restore_tables(&self) {
        self.create_tables().await.unwrap();
    }

    /// Reads only the status column, which works even while broken_links is gone
    #[cfg(test)]
    pub(crate) async fn status_of(&self, id: i64) -> UrlStatus {
        let status: String = sqlx::query("SELECT status FROM urls WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
            .get("status");
        status.parse().unwrap()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<UrlRecord> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<UrlStatus>()
        .map_err(|e| sqlx::Error::Decode(e.into()))?;
    let html_version: String = row.try_get("html_version")?;

    let mut analysis = AnalysisResult {
        html_version: HtmlVersion::parse_label(&html_version),
        title: row.try_get("title")?,
        internal_links: count(row, "internal_links")?,
        external_links: count(row, "external_links")?,
        broken_links: count(row, "broken_links")?,
        has_login_form: row.try_get("has_login_form")?,
        ..AnalysisResult::default()
    };

    // Only levels that actually occur go into the map
    for level in 1..=6 {
        let n = count(row, &format!("h{}_count", level))?;
        if n > 0 {
            analysis.headings.insert(format!("h{}", level), n);
        }
    }

    Ok(UrlRecord {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        status,
        created_at: row.try_get("created_at")?,
        analysis,
    })
}

fn count(row: &SqliteRow, column: &str) -> Result<usize> {
    let value: i64 = row.try_get(column)?;
    Ok(value.max(0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_analysis() -> AnalysisResult {
        let mut result = AnalysisResult {
            html_version: Some(HtmlVersion::Html5),
            title: "Home".to_string(),
            internal_links: 4,
            external_links: 2,
            broken_links: 1,
            has_login_form: true,
            ..AnalysisResult::default()
        };
        result.headings.insert("h1".to_string(), 1);
        result.headings.insert("h3".to_string(), 2);
        result
    }

    #[tokio::test]
    async fn test_new_urls_are_queued() {
        let store = Store::in_memory().await.unwrap();
        let a = store.add_url("https://a.example").await.unwrap();
        let b = store.add_url("https://b.example").await.unwrap();

        let queued = store.fetch_queued().await.unwrap();
        assert_eq!(
            queued,
            vec![
                (a, "https://a.example".to_string()),
                (b, "https://b.example".to_string())
            ]
        );

        store.set_status(a, UrlStatus::Running).await.unwrap();
        assert_eq!(store.fetch_queued().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_analysis_marks_done() {
        let store = Store::in_memory().await.unwrap();
        let id = store.add_url("https://a.example").await.unwrap();
        let mut analysis = sample_analysis();
        analysis.broken_links_list = vec![BrokenLink {
            url: "https://dead.example".to_string(),
            status_code: 0,
        }];

        store.set_status(id, UrlStatus::Running).await.unwrap();
        store
            .replace_broken_links(id, &analysis.broken_links_list)
            .await
            .unwrap();
        assert!(store.save_analysis(id, &analysis).await.unwrap());

        let record = store.get_url(id).await.unwrap().unwrap();
        assert_eq!(record.status, UrlStatus::Done);
        assert_eq!(record.analysis, analysis);
    }

    #[tokio::test]
    async fn test_save_analysis_keeps_user_status() {
        let store = Store::in_memory().await.unwrap();
        let stopped = store.add_url("https://a.example").await.unwrap();
        let queued = store.add_url("https://b.example").await.unwrap();
        store.set_status(stopped, UrlStatus::Stopped).await.unwrap();

        for id in [stopped, queued] {
            assert!(!store.save_analysis(id, &sample_analysis()).await.unwrap());
        }

        let record = store.get_url(stopped).await.unwrap().unwrap();
        assert_eq!(record.status, UrlStatus::Stopped);
        assert_eq!(record.analysis, AnalysisResult::default());
        let record = store.get_url(queued).await.unwrap().unwrap();
        assert_eq!(record.status, UrlStatus::Queued);
        assert_eq!(record.analysis.title, "");
    }

    #[tokio::test]
    async fn test_replace_broken_links_drops_old_entries() {
        let store = Store::in_memory().await.unwrap();
        let id = store.add_url("https://a.example").await.unwrap();
        let old = vec![
            BrokenLink { url: "https://x.example".to_string(), status_code: 404 },
            BrokenLink { url: "https://y.example".to_string(), status_code: 500 },
        ];
        let new = vec![BrokenLink { url: "https://z.example".to_string(), status_code: 410 }];

        store.replace_broken_links(id, &old).await.unwrap();
        store.replace_broken_links(id, &new).await.unwrap();

        assert_eq!(store.broken_links(id).await.unwrap(), new);
    }

    #[tokio::test]
    async fn test_transition_only_from_allowed_states() {
        let store = Store::in_memory().await.unwrap();
        let id = store.add_url("https://a.example").await.unwrap();

        // queued -> stopped is not a valid stop
        assert!(!store
            .transition(id, &[UrlStatus::Running], UrlStatus::Stopped)
            .await
            .unwrap());
        assert!(store
            .transition(id, &[UrlStatus::Queued, UrlStatus::Stopped], UrlStatus::Running)
            .await
            .unwrap());
        assert!(store
            .transition(id, &[UrlStatus::Running], UrlStatus::Stopped)
            .await
            .unwrap());
        assert!(!store
            .transition(999, &[UrlStatus::Running], UrlStatus::Stopped)
            .await
            .unwrap());

        let record = store.get_url(id).await.unwrap().unwrap();
        assert_eq!(record.status, UrlStatus::Stopped);
    }

    #[tokio::test]
    async fn test_requeue_and_delete() {
        let store = Store::in_memory().await.unwrap();
        let id = store.add_url("https://a.example").await.unwrap();
        store.set_status(id, UrlStatus::Error).await.unwrap();
        store
            .replace_broken_links(id, &[BrokenLink { url: "https://x".to_string(), status_code: 0 }])
            .await
            .unwrap();

        assert!(store.requeue(id).await.unwrap());
        assert_eq!(store.fetch_queued().await.unwrap().len(), 1);

        assert!(store.delete_url(id).await.unwrap());
        assert!(!store.delete_url(id).await.unwrap());
        assert!(store.get_url(id).await.unwrap().is_none());
        assert!(store.broken_links(id).await.unwrap().is_empty());
        assert!(!store.requeue(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = Store::in_memory().await.unwrap();
        store.add_url("https://first.example").await.unwrap();
        store.add_url("https://second.example").await.unwrap();

        let urls: Vec<String> = store
            .list_urls()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(urls, vec!["https://second.example", "https://first.example"]);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawler.db");

        let id = {
            let store = Store::open(&path).await.unwrap();
            store.add_url("https://a.example").await.unwrap()
        };

        let store = Store::open(&path).await.unwrap();
        let record = store.get_url(id).await.unwrap().unwrap();
        assert_eq!(record.url, "https://a.example");
        assert_eq!(record.status, UrlStatus::Queued);
        assert_eq!(record.analysis.html_version, None);
    }
}
