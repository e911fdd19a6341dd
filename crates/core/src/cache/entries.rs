//! Cache entry reads and writes.
//!
//! An entry is an immutable snapshot of a response captured at write time,
//! keyed inside its store by method + absolute URL. Writing the same request
//! again replaces the snapshot as a whole.

use super::connection::CacheDb;
use super::generation::{Generation, StoreName};
use super::generations::ensure_writable;
use super::hash::compute_request_key;
use super::stores::create_store;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A captured response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedResponse {
    pub fn new(
        method: impl Into<String>, url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: Vec<u8>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            status,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// First header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn request_key(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

type EntryRow = (String, String, i64, String, Vec<u8>, String);

fn decode(row: EntryRow) -> Result<CachedResponse, Error> {
    let (method, url, status, headers_json, body, stored_at) = row;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)
        .map_err(|e| Error::CorruptEntry(format!("headers for {url}: {e}")))?;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status} for {url}")))?;

    Ok(CachedResponse { method, url, status, headers, body, stored_at })
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
}

impl CacheDb {
    /// Look up a request in one store.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn match_entry(&self, store: &StoreName, method: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let store_name = store.name();
        let key = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, stored_at
                    FROM entries WHERE store_name = ?1 AND request_key = ?2",
                )?;

                match stmt.query_row(params![store_name, key], read_row) {
                    Ok(row) => decode(row).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request across every store of a generation.
    ///
    /// Static stores are consulted first, then dynamic, then images.
    pub async fn match_in_generation(
        &self, generation: &Generation, method: &str, url: &str,
    ) -> Result<Option<CachedResponse>, Error> {
        let generation = generation.clone();
        let key = compute_request_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.method, e.url, e.status, e.headers_json, e.body, e.stored_at
                    FROM entries e JOIN stores s ON s.name = e.store_name
                    WHERE s.namespace = ?1 AND s.version = ?2 AND e.request_key = ?3
                    ORDER BY CASE s.purpose WHEN 'static' THEN 0 WHEN 'dynamic' THEN 1 ELSE 2 END
                    LIMIT 1",
                )?;

                match stmt.query_row(params![generation.namespace, generation.version, key], read_row) {
                    Ok(row) => decode(row).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry, creating the store on first write.
    ///
    /// The generation check, store creation and upsert run as one database
    /// call, so a write can never recreate a store that activation deleted.
    pub async fn put_entry(&self, store: &StoreName, entry: &CachedResponse) -> Result<(), Error> {
        let store = store.clone();
        let entry = entry.clone();
        let headers_json =
            serde_json::to_string(&entry.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_writable(conn, &store.generation.namespace, &store.generation.version)?;
                create_store(conn, &store)?;
                conn.execute(
                    "INSERT INTO entries (
                        store_name, request_key, method, url, status, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(store_name, request_key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        store.name(),
                        entry.request_key(),
                        &entry.method,
                        &entry.url,
                        entry.status as i64,
                        headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
