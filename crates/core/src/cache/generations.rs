//! Generation registry.
//!
//! Tracks which generation of a namespace is current. Promotion swaps the
//! pointer in a single transaction; pruning removes every other generation's
//! stores and marks those generations superseded, after which they can be
//! neither written to nor promoted again.
//!
//! Pruning is driven by the registry columns rather than by store-name
//! prefixes, so `cyberpuzzle-v2` never matches `cyberpuzzle-v20` and stores of
//! other namespaces are left alone.

use super::connection::CacheDb;
use super::generation::{Generation, GenerationState};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Fail with `GenerationRetired` if the generation was superseded.
pub(crate) fn ensure_writable(conn: &rusqlite::Connection, namespace: &str, version: &str) -> Result<(), Error> {
    match read_state(conn, namespace, version)? {
        Some(GenerationState::Superseded) => Err(Error::GenerationRetired(format!("{namespace}-{version}"))),
        _ => Ok(()),
    }
}

fn read_state(conn: &rusqlite::Connection, namespace: &str, version: &str) -> Result<Option<GenerationState>, Error> {
    let result = conn.query_row(
        "SELECT state FROM generations WHERE namespace = ?1 AND version = ?2",
        params![namespace, version],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(state) => state.parse().map(Some),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl CacheDb {
    /// Record a generation as installing.
    ///
    /// Re-registering an existing generation resets it to installing, except
    /// that an active generation stays active (a restart reinstalling the
    /// version in service) and a superseded one is rejected.
    pub async fn register_generation(&self, generation: &Generation) -> Result<(), Error> {
        let generation = generation.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_writable(conn, &generation.namespace, &generation.version)?;
                conn.execute(
                    "INSERT INTO generations (namespace, version, state, installed_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(namespace, version) DO UPDATE SET
                        state = CASE WHEN state = 'active' THEN state ELSE excluded.state END,
                        installed_at = excluded.installed_at",
                    params![
                        generation.namespace,
                        generation.version,
                        GenerationState::Installing.as_str(),
                        chrono::Utc::now().to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Update the recorded state of a registered generation.
    ///
    /// Promotion to active goes through [`CacheDb::promote_generation`] and a
    /// superseded generation's state is final. An active generation keeps its
    /// state until another one is promoted.
    pub async fn set_generation_state(&self, generation: &Generation, state: GenerationState) -> Result<(), Error> {
        if matches!(state, GenerationState::Active | GenerationState::Superseded) {
            return Err(Error::Lifecycle(format!("{state} is set by promotion, not directly")));
        }

        let generation = generation.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                ensure_writable(conn, &generation.namespace, &generation.version)?;
                let updated = conn.execute(
                    "UPDATE generations SET state = CASE WHEN state = 'active' THEN state ELSE ?3 END
                    WHERE namespace = ?1 AND version = ?2",
                    params![generation.namespace, generation.version, state.as_str()],
                )?;
                if updated == 0 {
                    return Err(Error::Lifecycle(format!("generation {generation} is not registered")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Recorded state of a generation, if registered.
    pub async fn generation_state(&self, generation: &Generation) -> Result<Option<GenerationState>, Error> {
        let generation = generation.clone();
        self.conn
            .call(move |conn| -> Result<Option<GenerationState>, Error> {
                read_state(conn, &generation.namespace, &generation.version)
            })
            .await
            .map_err(Error::from)
    }

    /// The current generation of a namespace.
    pub async fn active_generation(&self, namespace: &str) -> Result<Option<Generation>, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Generation>, Error> {
                let result = conn.query_row(
                    "SELECT version FROM generations WHERE namespace = ?1 AND state = 'active'",
                    params![namespace],
                    |row| row.get::<_, String>(0),
                );

                match result {
                    Ok(version) => Ok(Some(Generation::new(namespace, version))),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Make `generation` the current one of its namespace.
    ///
    /// The previously active generation (if any, and if different) becomes
    /// superseded in the same transaction and is returned.
    pub async fn promote_generation(&self, generation: &Generation) -> Result<Option<Generation>, Error> {
        let generation = generation.clone();
        self.conn
            .call(move |conn| -> Result<Option<Generation>, Error> {
                let tx = conn.unchecked_transaction()?;
                ensure_writable(&tx, &generation.namespace, &generation.version)?;

                let previous = match tx.query_row(
                    "SELECT version FROM generations
                    WHERE namespace = ?1 AND state = 'active' AND version != ?2",
                    params![generation.namespace, generation.version],
                    |row| row.get::<_, String>(0),
                ) {
                    Ok(version) => Some(Generation::new(generation.namespace.clone(), version)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                };

                let now = chrono::Utc::now().to_rfc3339();
                tx.execute(
                    "UPDATE generations SET state = 'superseded'
                    WHERE namespace = ?1 AND state = 'active' AND version != ?2",
                    params![generation.namespace, generation.version],
                )?;
                tx.execute(
                    "INSERT INTO generations (namespace, version, state, installed_at, activated_at)
                    VALUES (?1, ?2, 'active', ?3, ?3)
                    ON CONFLICT(namespace, version) DO UPDATE SET
                        state = 'active',
                        activated_at = excluded.activated_at",
                    params![generation.namespace, generation.version, now],
                )?;
                tx.commit()?;

                Ok(previous)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every store of the namespace that does not belong to `current`.
    ///
    /// Returns the deleted store names. The other generations of the namespace
    /// are marked superseded.
    pub async fn prune_superseded(&self, current: &Generation) -> Result<Vec<String>, Error> {
        let current = current.clone();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.unchecked_transaction()?;

                let names = {
                    let mut stmt = tx.prepare(
                        "SELECT name FROM stores WHERE namespace = ?1 AND version != ?2 ORDER BY name",
                    )?;
                    stmt.query_map(params![current.namespace, current.version], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?
                };

                tx.execute(
                    "DELETE FROM stores WHERE namespace = ?1 AND version != ?2",
                    params![current.namespace, current.version],
                )?;
                tx.execute(
                    "UPDATE generations SET state = 'superseded'
                    WHERE namespace = ?1 AND version != ?2 AND state != 'superseded'",
                    params![current.namespace, current.version],
                )?;
                tx.commit()?;

                Ok(names)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entries::CachedResponse;
    use crate::cache::generation::StorePurpose;

    fn entry(url: &str) -> CachedResponse {
        CachedResponse::new("GET", url, 200, Vec::new(), b"x".to_vec())
    }

    #[tokio::test]
    async fn test_register_and_state() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = Generation::new("cyberpuzzle", "v2");
        assert_eq!(db.generation_state(&generation).await.unwrap(), None);

        db.register_generation(&generation).await.unwrap();
        assert_eq!(db.generation_state(&generation).await.unwrap(), Some(GenerationState::Installing));

        db.set_generation_state(&generation, GenerationState::Installed).await.unwrap();
        assert_eq!(db.generation_state(&generation).await.unwrap(), Some(GenerationState::Installed));
    }

    #[tokio::test]
    async fn test_reinstalling_active_generation_keeps_it_active() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = Generation::new("cyberpuzzle", "v2");
        db.register_generation(&generation).await.unwrap();
        db.promote_generation(&generation).await.unwrap();

        db.register_generation(&generation).await.unwrap();
        assert_eq!(db.active_generation("cyberpuzzle").await.unwrap(), Some(generation.clone()));

        db.set_generation_state(&generation, GenerationState::Installed).await.unwrap();
        assert_eq!(db.generation_state(&generation).await.unwrap(), Some(GenerationState::Active));
    }

    #[tokio::test]
    async fn test_set_state_rejects_promotion_states() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = Generation::new("cyberpuzzle", "v2");
        db.register_generation(&generation).await.unwrap();

        let result = db.set_generation_state(&generation, GenerationState::Active).await;
        assert!(matches!(result, Err(Error::Lifecycle(_))));
    }

    #[tokio::test]
    async fn test_promote_swaps_pointer() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = Generation::new("cyberpuzzle", "v1");
        let v2 = Generation::new("cyberpuzzle", "v2");

        assert_eq!(db.promote_generation(&v1).await.unwrap(), None);
        assert_eq!(db.active_generation("cyberpuzzle").await.unwrap(), Some(v1.clone()));

        assert_eq!(db.promote_generation(&v2).await.unwrap(), Some(v1.clone()));
        assert_eq!(db.active_generation("cyberpuzzle").await.unwrap(), Some(v2.clone()));
        assert_eq!(db.generation_state(&v1).await.unwrap(), Some(GenerationState::Superseded));
    }

    #[tokio::test]
    async fn test_superseded_generation_is_never_revived() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = Generation::new("cyberpuzzle", "v1");
        let v2 = Generation::new("cyberpuzzle", "v2");
        db.promote_generation(&v1).await.unwrap();
        db.promote_generation(&v2).await.unwrap();

        assert!(matches!(db.promote_generation(&v1).await, Err(Error::GenerationRetired(_))));
        assert!(matches!(db.register_generation(&v1).await, Err(Error::GenerationRetired(_))));
        assert_eq!(db.active_generation("cyberpuzzle").await.unwrap(), Some(v2));
    }

    #[tokio::test]
    async fn test_prune_keeps_current_and_foreign_namespaces() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = Generation::new("cyberpuzzle", "v1");
        let v2 = Generation::new("cyberpuzzle", "v2");
        let v20 = Generation::new("cyberpuzzle", "v20");
        let foreign = Generation::new("cyberpuzzle-admin", "v1");

        for purpose in StorePurpose::ALL {
            db.open_store(&v1.store(purpose)).await.unwrap();
            db.open_store(&v2.store(purpose)).await.unwrap();
        }
        db.open_store(&v20.store(StorePurpose::Static)).await.unwrap();
        db.open_store(&foreign.store(StorePurpose::Static)).await.unwrap();

        db.promote_generation(&v2).await.unwrap();
        let deleted = db.prune_superseded(&v2).await.unwrap();
        assert_eq!(deleted.len(), 4);
        assert!(deleted.contains(&"cyberpuzzle-v20-static".to_string()));

        let remaining: Vec<String> = db.list_stores().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(
            remaining,
            vec![
                "cyberpuzzle-admin-v1-static",
                "cyberpuzzle-v2-dynamic",
                "cyberpuzzle-v2-images",
                "cyberpuzzle-v2-static",
            ]
        );
    }

    #[tokio::test]
    async fn test_write_into_retired_generation_is_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = Generation::new("cyberpuzzle", "v1");
        let v2 = Generation::new("cyberpuzzle", "v2");
        db.promote_generation(&v1).await.unwrap();
        db.put_entry(&v1.store(StorePurpose::Static), &entry("http://localhost:8080/a.js"))
            .await
            .unwrap();

        db.promote_generation(&v2).await.unwrap();
        db.prune_superseded(&v2).await.unwrap();

        let late = db
            .put_entry(&v1.store(StorePurpose::Static), &entry("http://localhost:8080/b.js"))
            .await;
        assert!(matches!(late, Err(Error::GenerationRetired(_))));
        assert!(db.list_stores().await.unwrap().is_empty());
    }
}
