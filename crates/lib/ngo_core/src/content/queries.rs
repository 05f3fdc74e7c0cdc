//! PostgreSQL-backed content store over the `documents` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{ContentError, ContentQuery, ContentStore, Document, Resource};
use crate::uuid::new_document_id;

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            data: row.data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn list_query<'a>(resource: Resource, query: &'a ContentQuery) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT id, data, created_at, updated_at FROM documents WHERE collection = ",
    );
    qb.push_bind(resource.slug());
    if let Some(home) = query.home_filter() {
        qb.push(" AND COALESCE(data->'showOnHome' = 'true'::jsonb, false) = ")
            .push_bind(home);
    }
    if let Some(ref category) = query.category {
        qb.push(" AND data->>'category' = ").push_bind(category);
    }
    if let Some(ref status) = query.status {
        qb.push(" AND data->>'status' = ").push_bind(status);
    }
    qb.push(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    qb
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn list(
        &self,
        resource: Resource,
        query: &ContentQuery,
    ) -> Result<Vec<Document>, ContentError> {
        let rows = list_query(resource, query)
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn get(&self, resource: Resource, id: &str) -> Result<Option<Document>, ContentError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, data, created_at, updated_at FROM documents \
             WHERE collection = $1 AND id = $2",
        )
        .bind(resource.slug())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn insert(
        &self,
        resource: Resource,
        data: Map<String, Value>,
    ) -> Result<Document, ContentError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, DocumentRow>(
            "INSERT INTO documents (collection, id, data, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             RETURNING id, data, created_at, updated_at",
        )
        .bind(resource.slug())
        .bind(new_document_id())
        .bind(Json(&data))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(
        &self,
        resource: Resource,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, ContentError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "UPDATE documents SET data = data || $3, updated_at = $4 \
             WHERE collection = $1 AND id = $2 \
             RETURNING id, data, created_at, updated_at",
        )
        .bind(resource.slug())
        .bind(id)
        .bind(Json(&patch))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn delete(&self, resource: Resource, id: &str) -> Result<bool, ContentError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(resource.slug())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The pool is shared with other sessions and outlives this handle.
    async fn close(&self) -> Result<(), ContentError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::Execute;

    use super::*;

    #[test]
    fn list_query_without_filters() {
        let q = ContentQuery::default();
        let mut qb = list_query(Resource::Blogs, &q);
        let sql = qb.build().sql().to_string();
        assert_eq!(
            sql,
            "SELECT id, data, created_at, updated_at FROM documents WHERE collection = $1 \
             ORDER BY created_at DESC, id DESC"
        );
    }

    #[test]
    fn list_query_binds_every_filter() {
        let q = ContentQuery {
            limit: Some(3),
            homepage: Some(true),
            category: Some("health".into()),
            status: Some("published".into()),
            ..Default::default()
        };
        let mut qb = list_query(Resource::Programs, &q);
        let sql = qb.build().sql().to_string();
        assert!(sql.contains("data->'showOnHome'"), "{sql}");
        assert!(sql.contains("data->>'category' = $3"), "{sql}");
        assert!(sql.contains("data->>'status' = $4"), "{sql}");
        assert!(sql.ends_with("LIMIT $5"), "{sql}");
    }
}
