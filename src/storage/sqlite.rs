//! SQLite store implementation.
//!
//! Favorites and search hints live in one database file. The schema version
//! is kept in `PRAGMA user_version`; when it does not match the tables are
//! dropped and recreated, no data is carried over.

use std::path::Path;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::watch;

use crate::error::Result;
use crate::models::{FavoritePost, SearchHint};
use crate::storage::PostStore;

const SCHEMA_VERSION: i64 = 1;

/// SQLite-backed local store.
pub struct SqliteStore {
    pool: SqlitePool,
    favorites_tx: watch::Sender<u64>,
    hints_tx: watch::Sender<u64>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        log::info!("Opened local store at {}", path.as_ref().display());
        Self::with_pool(pool).await
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        // A single connection that never expires, so the in-memory database lives
        // as long as the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self {
            pool,
            favorites_tx: watch::Sender::new(0),
            hints_tx: watch::Sender::new(0),
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create tables, recreating them when the stored schema version differs.
    async fn ensure_schema(&self) -> Result<()> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;

        if version != SCHEMA_VERSION {
            if version != 0 {
                log::info!(
                    "Local store schema {} does not match {}, recreating tables",
                    version,
                    SCHEMA_VERSION
                );
            }
            sqlx::query("DROP TABLE IF EXISTS post")
                .execute(&self.pool)
                .await?;
            sqlx::query("DROP TABLE IF EXISTS hint")
                .execute(&self.pool)
                .await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS post (\
                id INTEGER PRIMARY KEY NOT NULL, \
                title TEXT NOT NULL DEFAULT '', \
                body TEXT NOT NULL DEFAULT ''\
             )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS hint (\
                text TEXT PRIMARY KEY NOT NULL, \
                time INTEGER NOT NULL\
             )",
        )
        .execute(&self.pool)
        .await?;

        // PRAGMA does not accept bound parameters.
        sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Close all connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn insert_favorite(&self, post: &FavoritePost) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO post (id, title, body) VALUES (?, ?, ?)")
            .bind(post.id)
            .bind(&post.title)
            .bind(&post.body)
            .execute(&self.pool)
            .await?;
        self.favorites_tx.send_modify(|v| *v += 1);
        Ok(())
    }

    async fn delete_favorite(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM post WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            self.favorites_tx.send_modify(|v| *v += 1);
        }
        Ok(())
    }

    async fn favorite(&self, id: i64) -> Result<Option<FavoritePost>> {
        let row = sqlx::query_as::<_, FavoritePost>("SELECT id, title, body FROM post WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn favorites(&self) -> Result<Vec<FavoritePost>> {
        let rows = sqlx::query_as::<_, FavoritePost>("SELECT id, title, body FROM post")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_hint(&self, hint: &SearchHint) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO hint (text, time) VALUES (?, ?)")
            .bind(&hint.text)
            .bind(hint.time)
            .execute(&self.pool)
            .await?;
        self.hints_tx.send_modify(|v| *v += 1);
        Ok(())
    }

    async fn delete_hints(&self) -> Result<()> {
        sqlx::query("DELETE FROM hint").execute(&self.pool).await?;
        self.hints_tx.send_modify(|v| *v += 1);
        Ok(())
    }

    async fn hints(&self) -> Result<Vec<SearchHint>> {
        let rows = sqlx::query_as::<_, SearchHint>("SELECT text, time FROM hint ORDER BY time ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    fn favorites_changed(&self) -> watch::Receiver<u64> {
        self.favorites_tx.subscribe()
    }

    fn hints_changed(&self) -> watch::Receiver<u64> {
        self.hints_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use futures::StreamExt;
    use tempfile::TempDir;

    use crate::storage::{watch_favorites, watch_hints};

    fn favorite(id: i64, title: &str) -> FavoritePost {
        FavoritePost {
            id,
            title: title.to_string(),
            body: format!("body {id}"),
        }
    }

    #[tokio::test]
    async fn test_insert_replaces_same_id() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.insert_favorite(&favorite(1, "first")).await.unwrap();
        store.insert_favorite(&favorite(1, "second")).await.unwrap();

        let all = store.favorites().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "second");
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert!(store.delete_favorite(99).await.is_ok());
        assert_eq!(store.favorite(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hints_ordered_by_time() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        for (text, time) in [("b", 20), ("a", 10), ("c", 30)] {
            store
                .insert_hint(&SearchHint {
                    text: text.to_string(),
                    time,
                })
                .await
                .unwrap();
        }
        let texts: Vec<String> = store
            .hints()
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.text)
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);

        store.delete_hints().await.unwrap();
        assert!(store.hints().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_favorites_reemit_on_change() {
        let store: Arc<dyn PostStore> = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        let mut live = watch_favorites(Arc::clone(&store));

        assert!(live.next().await.unwrap().unwrap().is_empty());

        store.insert_favorite(&favorite(3, "three")).await.unwrap();
        let after_insert = live.next().await.unwrap().unwrap();
        assert_eq!(after_insert, vec![favorite(3, "three")]);

        store.delete_favorite(3).await.unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_hints_reemit_on_clear() {
        let store: Arc<dyn PostStore> = Arc::new(SqliteStore::open_in_memory().await.unwrap());
        store
            .insert_hint(&SearchHint {
                text: "x".to_string(),
                time: 1,
            })
            .await
            .unwrap();

        let mut live = watch_hints(Arc::clone(&store));
        assert_eq!(live.next().await.unwrap().unwrap().len(), 1);

        store.delete_hints().await.unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_open() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posts.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store.insert_favorite(&favorite(5, "kept")).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.favorite(5).await.unwrap(),
            Some(favorite(5, "kept"))
        );
    }

    #[tokio::test]
    async fn test_schema_mismatch_recreates_tables() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("posts.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store.insert_favorite(&favorite(5, "dropped")).await.unwrap();
        sqlx::query("PRAGMA user_version = 99")
            .execute(store.pool())
            .await
            .unwrap();
        store.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert!(reopened.favorites().await.unwrap().is_empty());
    }
}
