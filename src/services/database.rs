//! Database service over a bounded PostgreSQL connection pool.
//!
//! The pool is created exactly once, in [`Database::connect`], and handlers
//! reach it only through the shared application state -- there is no way to
//! issue a query against an uninitialized pool. Every statement is
//! parameterized; user input never reaches SQL text. Each query checks a
//! connection out of the pool for the duration of the statement and the
//! pool reclaims it on every exit path.
//!
//! Schema creation ([`Database::ensure_schema`]) is idempotent
//! (`CREATE TABLE IF NOT EXISTS` / `CREATE INDEX IF NOT EXISTS`) and safe
//! to run repeatedly: once at startup and again via `/api/admin/init-db`.

use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{MediaRecord, MediaType, NewMedia};

/// Column list for `media` queries
const MEDIA_COLUMNS: &str = "id, title, category, url, media_type, views, visible, created_at, updated_at";

/// Database service for media metadata
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool", &"<PgPool>")
            .finish()
    }
}

impl Database {
    /// Connect a bounded pool against the configured connection string
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database pool initialized"
        );

        Ok(Self { pool })
    }

    /// Create the media table and its indexes if absent
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS media (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                category TEXT NOT NULL,
                url TEXT NOT NULL,
                media_type TEXT NOT NULL,
                views BIGINT NOT NULL DEFAULT 0,
                visible BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_media_category ON media (category)",
            "CREATE INDEX IF NOT EXISTS idx_media_type ON media (media_type)",
            "CREATE INDEX IF NOT EXISTS idx_media_visible ON media (visible)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Media schema ensured");
        Ok(())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a new media row and return it
    pub async fn insert_media(&self, media: &NewMedia) -> Result<MediaRecord> {
        let query = format!(
            "INSERT INTO media (title, category, url, media_type) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {MEDIA_COLUMNS}"
        );
        let record = sqlx::query_as::<_, MediaRecord>(&query)
            .bind(&media.title)
            .bind(&media.category)
            .bind(&media.url)
            .bind(media.media_type.as_str())
            .fetch_one(&self.pool)
            .await?;

        debug!(id = record.id, title = %record.title, "Inserted media record");
        Ok(record)
    }

    /// Atomically bump the view counter for a row.
    ///
    /// Runs as a single `views = views + 1` statement so concurrent
    /// increments never lose updates. Also refreshes `updated_at`.
    pub async fn increment_views(&self, id: i64) -> Result<u64> {
        let result =
            sqlx::query("UPDATE media SET views = views + 1, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Public reads
    // =========================================================================

    /// Visible rows of one type, newest first
    pub async fn list_by_type(
        &self,
        media_type: MediaType,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MediaRecord>> {
        let query = format!(
            "SELECT {MEDIA_COLUMNS} FROM media \
             WHERE visible AND media_type = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, MediaRecord>(&query)
            .bind(media_type.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Total visible rows of one type
    pub async fn count_by_type(&self, media_type: MediaType) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM media WHERE visible AND media_type = $1")
                .bind(media_type.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// One uniformly random visible row matching the optional filters
    pub async fn random(
        &self,
        media_type: Option<MediaType>,
        category: Option<&str>,
    ) -> Result<Option<MediaRecord>> {
        let mut conditions = vec!["visible".to_string()];
        let mut bind_idx = 1u32;

        if media_type.is_some() {
            conditions.push(format!("media_type = ${bind_idx}"));
            bind_idx += 1;
        }
        if category.is_some() {
            conditions.push(format!("category = ${bind_idx}"));
        }

        let query = format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE {} ORDER BY random() LIMIT 1",
            conditions.join(" AND ")
        );

        let mut q = sqlx::query_as::<_, MediaRecord>(&query);
        if let Some(media_type) = media_type {
            q = q.bind(media_type.as_str());
        }
        if let Some(category) = category {
            q = q.bind(category);
        }

        Ok(q.fetch_optional(&self.pool).await?)
    }

    /// The visible row with the given id and type
    pub async fn find_visible_by_id(
        &self,
        id: i64,
        media_type: MediaType,
    ) -> Result<Option<MediaRecord>> {
        let query = format!(
            "SELECT {MEDIA_COLUMNS} FROM media \
             WHERE visible AND media_type = $1 AND id = $2"
        );
        let row = sqlx::query_as::<_, MediaRecord>(&query)
            .bind(media_type.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Case-insensitive substring search against title or category,
    /// most-viewed first
    pub async fn search(
        &self,
        media_type: MediaType,
        term: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MediaRecord>> {
        let pattern = format!("%{term}%");
        let query = format!(
            "SELECT {MEDIA_COLUMNS} FROM media \
             WHERE visible AND media_type = $1 AND (title ILIKE $2 OR category ILIKE $2) \
             ORDER BY views DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, MediaRecord>(&query)
            .bind(media_type.as_str())
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Total rows matching a search
    pub async fn search_count(&self, media_type: MediaType, term: &str) -> Result<i64> {
        let pattern = format!("%{term}%");
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM media \
             WHERE visible AND media_type = $1 AND (title ILIKE $2 OR category ILIKE $2)",
        )
        .bind(media_type.as_str())
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Visible rows of one type in one category, newest first
    pub async fn list_by_category(
        &self,
        media_type: MediaType,
        category: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MediaRecord>> {
        let query = format!(
            "SELECT {MEDIA_COLUMNS} FROM media \
             WHERE visible AND media_type = $1 AND category = $2 \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, MediaRecord>(&query)
            .bind(media_type.as_str())
            .bind(category)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Total visible rows of one type in one category
    pub async fn count_by_category(&self, media_type: MediaType, category: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM media \
             WHERE visible AND media_type = $1 AND category = $2",
        )
        .bind(media_type.as_str())
        .bind(category)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Record counts by type, over all rows (hidden included)
    pub async fn type_counts(&self) -> Result<TypeCounts> {
        let (total, images, gifs): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE media_type = 'image'), \
                    COUNT(*) FILTER (WHERE media_type = 'gif') \
             FROM media",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TypeCounts {
            total,
            images,
            gifs,
        })
    }

    /// Full aggregate breakdown for the admin stats endpoint
    pub async fn stats(&self) -> Result<GalleryStats> {
        let (total, images, gifs, visible, hidden, total_views): (i64, i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*), \
                        COUNT(*) FILTER (WHERE media_type = 'image'), \
                        COUNT(*) FILTER (WHERE media_type = 'gif'), \
                        COUNT(*) FILTER (WHERE visible), \
                        COUNT(*) FILTER (WHERE NOT visible), \
                        COALESCE(SUM(views), 0)::BIGINT \
                 FROM media",
            )
            .fetch_one(&self.pool)
            .await?;

        let categories: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM media GROUP BY category ORDER BY COUNT(*) DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(GalleryStats {
            total,
            images,
            gifs,
            visible,
            hidden,
            total_views,
            categories: categories
                .into_iter()
                .map(|(category, count)| CategoryCount { category, count })
                .collect(),
        })
    }
}

/// Record counts by type
#[derive(Debug, Serialize)]
pub struct TypeCounts {
    pub total: i64,
    pub images: i64,
    pub gifs: i64,
}

/// Aggregate statistics over the media table
#[derive(Debug, Serialize)]
pub struct GalleryStats {
    pub total: i64,
    pub images: i64,
    pub gifs: i64,
    pub visible: i64,
    pub hidden: i64,
    pub total_views: i64,
    pub categories: Vec<CategoryCount>,
}

/// Row count for one category
#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}
