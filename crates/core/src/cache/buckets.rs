//! Named cache buckets.
//!
//! A bucket groups stored responses under a version name. Buckets are only
//! created and deleted as a whole; deleting one drops all of its entries.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Open a bucket, creating it if absent.
    ///
    /// Returns `true` if the bucket was created by this call.
    pub async fn open_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let created = conn.execute(
                    "INSERT INTO buckets (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                Ok(created == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Check whether a bucket exists.
    pub async fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List bucket names in creation order.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and everything stored in it.
    ///
    /// Returns `false` if there was no such bucket.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE bucket = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every bucket except `keep`.
    ///
    /// Returns the names of the deleted buckets.
    pub async fn delete_buckets_except(&self, keep: &str) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.bucket_names().await? {
            if name != keep && self.delete_bucket(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}
