//! Store management.
//!
//! Stores are created lazily on first access and deleted wholesale; their
//! entries go with them through the `ON DELETE CASCADE` foreign key.

use super::connection::CacheDb;
use super::generation::{StoreName, StorePurpose};
use super::generations::ensure_writable;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Summary of one physical store.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreInfo {
    pub name: String,
    pub namespace: String,
    pub version: String,
    pub purpose: StorePurpose,
    pub entries: u64,
    pub created_at: String,
}

impl CacheDb {
    /// Create the store if it does not exist yet.
    ///
    /// Fails with `GenerationRetired` when the store's generation has been
    /// superseded.
    pub async fn open_store(&self, store: &StoreName) -> Result<(), Error> {
        let store = store.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_writable(conn, &store.generation.namespace, &store.generation.version)?;
                create_store(conn, &store)
            })
            .await
            .map_err(Error::from)
    }

    /// List every store with its entry count, ordered by name.
    pub async fn list_stores(&self) -> Result<Vec<StoreInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<StoreInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, s.namespace, s.version, s.purpose, s.created_at,
                        (SELECT COUNT(*) FROM entries e WHERE e.store_name = s.name)
                    FROM stores s ORDER BY s.name",
                )?;

                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;

                rows.into_iter()
                    .map(|(name, namespace, version, purpose, created_at, entries)| {
                        Ok(StoreInfo {
                            name,
                            namespace,
                            version,
                            purpose: purpose.parse()?,
                            entries: entries as u64,
                            created_at,
                        })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }
}

pub(crate) fn create_store(conn: &rusqlite::Connection, store: &StoreName) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO stores (name, namespace, version, purpose, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            store.name(),
            &store.generation.namespace,
            &store.generation.version,
            store.purpose.as_str(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::generation::Generation;

    #[tokio::test]
    async fn test_open_store_is_lazy_and_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.list_stores().await.unwrap().is_empty());

        let store = Generation::new("cyberpuzzle", "v2").store(StorePurpose::Static);
        db.open_store(&store).await.unwrap();
        db.open_store(&store).await.unwrap();

        let stores = db.list_stores().await.unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].name, "cyberpuzzle-v2-static");
        assert_eq!(stores[0].purpose, StorePurpose::Static);
        assert_eq!(stores[0].entries, 0);
    }
}
