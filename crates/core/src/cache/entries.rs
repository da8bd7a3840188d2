//! Stored response CRUD operations.
//!
//! Entries are keyed by bucket and request key (see [`compute_request_key`]).
//! Writes are upserts, so a bucket holds at most one response per request
//! URL and the latest write wins.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::http::{HttpResponse, Request};
use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};

/// A response as persisted in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub bucket: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub response: HttpResponse,
    pub stored_at: String,
}

impl StoredEntry {
    /// Build an entry for `request` in `bucket`, stamped with the current time.
    pub fn new(bucket: &str, request: &Request, response: HttpResponse) -> Self {
        let method = request.method.to_ascii_uppercase();
        let url = request.url.to_string();
        Self {
            bucket: bucket.to_string(),
            key_hash: compute_request_key(&method, &url),
            method,
            url,
            response,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

const UPSERT_SQL: &str = "INSERT INTO entries (
        bucket, key_hash, method, url, status, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(bucket, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status = excluded.status,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

fn upsert(conn: &rusqlite::Connection, entry: &StoredEntry) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.response.headers)?;
    conn.execute(
        "INSERT INTO buckets (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![&entry.bucket, &entry.stored_at],
    )?;
    conn.execute(
        UPSERT_SQL,
        params![
            &entry.bucket,
            &entry.key_hash,
            &entry.method,
            &entry.url,
            entry.response.status,
            headers_json,
            &entry.response.body[..],
            &entry.stored_at,
        ],
    )?;
    Ok(())
}

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StoredEntry, String)> {
    let body: Vec<u8> = row.get(6)?;
    let entry = StoredEntry {
        bucket: row.get(0)?,
        key_hash: row.get(1)?,
        method: row.get(2)?,
        url: row.get(3)?,
        response: HttpResponse { status: row.get(4)?, headers: Vec::new(), body: Bytes::from(body) },
        stored_at: row.get(7)?,
    };
    Ok((entry, row.get(5)?))
}

impl CacheDb {
    /// Store a response for a request, replacing any previous one.
    ///
    /// Creates the bucket if it does not exist yet.
    pub async fn put(&self, bucket: &str, request: &Request, response: &HttpResponse) -> Result<(), Error> {
        let entry = StoredEntry::new(bucket, request, response.clone());
        self.conn
            .call(move |conn| -> Result<(), Error> { upsert(conn, &entry) })
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction. Either all are written or none.
    pub async fn put_all(&self, entries: Vec<StoredEntry>) -> Result<usize, Error> {
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    upsert(&tx, entry)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the stored response for a request.
    ///
    /// Returns None if the bucket has no entry for this request.
    pub async fn match_request(&self, bucket: &str, request: &Request) -> Result<Option<HttpResponse>, Error> {
        let entry = self.get_entry(bucket, request).await?;
        Ok(entry.map(|e| e.response))
    }

    /// Get the full stored entry for a request.
    pub async fn get_entry(&self, bucket: &str, request: &Request) -> Result<Option<StoredEntry>, Error> {
        let bucket = bucket.to_string();
        let key_hash = compute_request_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT bucket, key_hash, method, url, status, headers_json, body, stored_at
                     FROM entries WHERE bucket = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![bucket, key_hash], read_entry);

                match result {
                    Ok((mut entry, headers_json)) => {
                        entry.response.headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(entry))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a bucket, sorted.
    #[cfg(test)]
    pub async fn entry_urls(&self, bucket: &str) -> Result<Vec<String>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE bucket = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![bucket], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a bucket.
    pub async fn entry_count(&self, bucket: &str) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE bucket = ?1", params![bucket], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
