//! Folder repository trait and implementation

use crate::error::{classify_write_error, LibraryError, Result};
use crate::models::Folder;
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

/// Folder repository interface for data access operations
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// Insert a folder, or update it when the id already exists.
    ///
    /// # Errors
    /// - [`LibraryError::ParentMissing`] if `parent_id` is not stored yet
    /// - [`LibraryError::InvalidInput`] if validation fails
    /// - [`LibraryError::Database`] for anything else
    async fn upsert(&self, folder: &Folder) -> Result<()>;

    /// Upsert every folder in one transaction. The first failure rolls the
    /// whole batch back.
    async fn upsert_batch(&self, folders: &[Folder]) -> Result<usize>;

    /// Find a folder by its ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Folder>>;

    /// Direct children of a folder, ordered by name
    async fn list_children(&self, parent_id: &str) -> Result<Vec<Folder>>;

    /// Count total folders
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of FolderRepository
pub struct SqliteFolderRepository {
    pool: SqlitePool,
}

impl SqliteFolderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn validate_folder(folder: &Folder) -> Result<()> {
        folder.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "Folder".to_string(),
            message: msg,
        })
    }

    async fn write(conn: &mut SqliteConnection, folder: &Folder) -> Result<()> {
        Self::validate_folder(folder)?;

        sqlx::query(
            r#"
            INSERT INTO folders (
                id, parent_id, folder_type, name, description, icon_type,
                last_updated, created_by, synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                parent_id = excluded.parent_id,
                folder_type = excluded.folder_type,
                name = excluded.name,
                description = excluded.description,
                icon_type = excluded.icon_type,
                last_updated = excluded.last_updated,
                synced_at = excluded.synced_at
            "#,
        )
        .bind(&folder.id)
        .bind(&folder.parent_id)
        .bind(&folder.folder_type)
        .bind(&folder.name)
        .bind(&folder.description)
        .bind(&folder.icon_type)
        .bind(folder.last_updated)
        .bind(folder.created_by)
        .bind(folder.synced_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_write_error(e, "Folder", &folder.id, folder.parent_id.as_deref()))?;

        Ok(())
    }
}

#[async_trait]
impl FolderRepository for SqliteFolderRepository {
    #[instrument(skip(self, folder), fields(folder_id = %folder.id))]
    async fn upsert(&self, folder: &Folder) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::write(&mut conn, folder).await?;
        debug!("Folder upserted");
        Ok(())
    }

    #[instrument(skip(self, folders), fields(count = folders.len()))]
    async fn upsert_batch(&self, folders: &[Folder]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for folder in folders {
            Self::write(&mut tx, folder).await?;
        }

        tx.commit().await?;
        debug!("Folder batch committed");
        Ok(folders.len())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(folder)
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE parent_id = ? ORDER BY name ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(folders)
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM folders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
