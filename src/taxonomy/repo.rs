use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::PgStore;
use crate::taxonomy::repo_types::{TaxonomyItem, TaxonomyKind, TaxonomyQuery};

#[async_trait]
pub trait TaxonomyRepo: Send + Sync {
    /// Owner's items matching `query`, each once, ordered by name descending.
    async fn list(
        &self,
        kind: TaxonomyKind,
        query: &TaxonomyQuery,
    ) -> anyhow::Result<Vec<TaxonomyItem>>;

    /// The subset of `ids` that exist and belong to `owner`.
    async fn find_owned(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        ids: &[Uuid],
    ) -> anyhow::Result<Vec<TaxonomyItem>>;

    async fn insert(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        name: &str,
    ) -> anyhow::Result<TaxonomyItem>;

    async fn rename(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<TaxonomyItem>>;

    /// Returns `true` if a row was deleted.
    async fn delete(&self, kind: TaxonomyKind, owner: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
impl TaxonomyRepo for PgStore {
    async fn list(
        &self,
        kind: TaxonomyKind,
        query: &TaxonomyQuery,
    ) -> anyhow::Result<Vec<TaxonomyItem>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT t.id, t.user_id, t.name, t.created_at FROM {} t WHERE t.user_id = ",
            kind.table()
        ));
        qb.push_bind(query.owner);

        if query.assigned_only {
            // EXISTS instead of a join keeps each item once.
            qb.push(format!(
                " AND EXISTS (SELECT 1 FROM {} l JOIN recipes r ON r.id = l.recipe_id \
                 WHERE l.{} = t.id AND r.user_id = ",
                kind.link_table(),
                kind.link_column()
            ));
            qb.push_bind(query.owner);
            qb.push(")");
        }
        qb.push(" ORDER BY t.name DESC, t.id");

        let rows = qb
            .build_query_as::<TaxonomyItem>()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("list {}", kind.table()))?;
        Ok(rows)
    }

    async fn find_owned(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        ids: &[Uuid],
    ) -> anyhow::Result<Vec<TaxonomyItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, TaxonomyItem>(&format!(
            r#"
            SELECT id, user_id, name, created_at
              FROM {}
             WHERE user_id = $1 AND id = ANY($2)
             ORDER BY name
            "#,
            kind.table()
        ))
        .bind(owner)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("find owned {}", kind.table()))?;
        Ok(rows)
    }

    async fn insert(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        name: &str,
    ) -> anyhow::Result<TaxonomyItem> {
        let row = sqlx::query_as::<_, TaxonomyItem>(&format!(
            r#"
            INSERT INTO {} (id, user_id, name)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, created_at
            "#,
            kind.table()
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("insert into {}", kind.table()))?;
        Ok(row)
    }

    async fn rename(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<TaxonomyItem>> {
        let row = sqlx::query_as::<_, TaxonomyItem>(&format!(
            r#"
            UPDATE {} SET name = $3
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, created_at
            "#,
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("rename in {}", kind.table()))?;
        Ok(row)
    }

    async fn delete(&self, kind: TaxonomyKind, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        // Link rows go with it via ON DELETE CASCADE.
        let res = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .with_context(|| format!("delete from {}", kind.table()))?;
        Ok(res.rows_affected() > 0)
    }
}
