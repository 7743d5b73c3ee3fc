use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::db::PgStore;
use crate::recipes::repo_types::{NewRecipe, Recipe, RecipeChanges, RecipeQuery, RecipeWithLinks};
use crate::taxonomy::repo_types::{TaxonomyItem, TaxonomyKind};

#[async_trait]
pub trait RecipeRepo: Send + Sync {
    /// Owner's recipes matching `query`, newest first, each once.
    async fn list(&self, query: &RecipeQuery) -> anyhow::Result<Vec<RecipeWithLinks>>;
    async fn get(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<RecipeWithLinks>>;
    async fn insert(&self, recipe: NewRecipe) -> anyhow::Result<RecipeWithLinks>;
    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: RecipeChanges,
    ) -> anyhow::Result<Option<RecipeWithLinks>>;
    /// Returns `true` if a row was deleted.
    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<bool>;
    /// Returns `true` if the recipe exists and now points at `image`.
    async fn set_image(&self, owner: Uuid, id: Uuid, image: &str) -> anyhow::Result<bool>;
}

const RECIPE_COLUMNS: &str =
    "r.id, r.user_id, r.title, r.time_minutes, r.price, r.link, r.image, r.created_at";

#[derive(FromRow)]
struct LinkRow {
    recipe_id: Uuid,
    #[sqlx(flatten)]
    item: TaxonomyItem,
}

impl PgStore {
    async fn links_for(
        &self,
        kind: TaxonomyKind,
        recipe_ids: &[Uuid],
    ) -> anyhow::Result<HashMap<Uuid, Vec<TaxonomyItem>>> {
        let rows = sqlx::query_as::<_, LinkRow>(&format!(
            r#"
            SELECT l.recipe_id, t.id, t.user_id, t.name, t.created_at
              FROM {link} l
              JOIN {table} t ON t.id = l.{column}
             WHERE l.recipe_id = ANY($1)
             ORDER BY t.name, t.id
            "#,
            link = kind.link_table(),
            table = kind.table(),
            column = kind.link_column(),
        ))
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("load {}", kind.link_table()))?;

        let mut grouped: HashMap<Uuid, Vec<TaxonomyItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.recipe_id).or_default().push(row.item);
        }
        Ok(grouped)
    }

    async fn with_links(&self, recipes: Vec<Recipe>) -> anyhow::Result<Vec<RecipeWithLinks>> {
        let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
        let mut tags = self.links_for(TaxonomyKind::Tag, &ids).await?;
        let mut ingredients = self.links_for(TaxonomyKind::Ingredient, &ids).await?;

        Ok(recipes
            .into_iter()
            .map(|recipe| RecipeWithLinks {
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                recipe,
            })
            .collect())
    }
}

async fn replace_links_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: TaxonomyKind,
    recipe_id: Uuid,
    ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.link_table()
    ))
    .bind(recipe_id)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("clear {}", kind.link_table()))?;

    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(&format!(
        "INSERT INTO {} (recipe_id, {}) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        kind.link_table(),
        kind.link_column()
    ))
    .bind(recipe_id)
    .bind(ids)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("insert {}", kind.link_table()))?;
    Ok(())
}

#[async_trait]
impl RecipeRepo for PgStore {
    async fn list(&self, query: &RecipeQuery) -> anyhow::Result<Vec<RecipeWithLinks>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.user_id = "
        ));
        qb.push_bind(query.owner);

        for (kind, ids) in [
            (TaxonomyKind::Tag, &query.tag_ids),
            (TaxonomyKind::Ingredient, &query.ingredient_ids),
        ] {
            if ids.is_empty() {
                continue;
            }
            qb.push(format!(
                " AND EXISTS (SELECT 1 FROM {} l WHERE l.recipe_id = r.id AND l.{} = ANY(",
                kind.link_table(),
                kind.link_column()
            ));
            qb.push_bind(ids.clone());
            qb.push("))");
        }
        qb.push(" ORDER BY r.created_at DESC, r.id DESC");

        let recipes = qb
            .build_query_as::<Recipe>()
            .fetch_all(&self.pool)
            .await
            .context("list recipes")?;
        self.with_links(recipes).await
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<RecipeWithLinks>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1 AND r.user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .context("get recipe")?;

        match recipe {
            Some(r) => Ok(self.with_links(vec![r]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert(&self, new: NewRecipe) -> anyhow::Result<RecipeWithLinks> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes AS r (id, user_id, title, time_minutes, price, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING r.id, r.user_id, r.title, r.time_minutes, r.price, r.link, r.image, r.created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.owner)
        .bind(&new.title)
        .bind(new.time_minutes)
        .bind(new.price)
        .bind(&new.link)
        .fetch_one(&mut *tx)
        .await
        .context("insert recipe")?;

        replace_links_tx(&mut tx, TaxonomyKind::Tag, recipe.id, &new.tag_ids).await?;
        replace_links_tx(&mut tx, TaxonomyKind::Ingredient, recipe.id, &new.ingredient_ids)
            .await?;
        tx.commit().await.context("commit tx")?;

        let mut out = self.with_links(vec![recipe]).await?;
        out.pop().context("inserted recipe vanished")
    }

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: RecipeChanges,
    ) -> anyhow::Result<Option<RecipeWithLinks>> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes AS r
               SET title = COALESCE($3, r.title),
                   time_minutes = COALESCE($4, r.time_minutes),
                   price = COALESCE($5, r.price),
                   link = COALESCE($6, r.link)
             WHERE r.id = $1 AND r.user_id = $2
            RETURNING r.id, r.user_id, r.title, r.time_minutes, r.price, r.link, r.image, r.created_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.time_minutes)
        .bind(changes.price)
        .bind(changes.link)
        .fetch_optional(&mut *tx)
        .await
        .context("update recipe")?;

        let Some(recipe) = recipe else {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        };

        if let Some(ids) = &changes.tag_ids {
            replace_links_tx(&mut tx, TaxonomyKind::Tag, recipe.id, ids).await?;
        }
        if let Some(ids) = &changes.ingredient_ids {
            replace_links_tx(&mut tx, TaxonomyKind::Ingredient, recipe.id, ids).await?;
        }
        tx.commit().await.context("commit tx")?;

        Ok(self.with_links(vec![recipe]).await?.pop())
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .context("delete recipe")?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_image(&self, owner: Uuid, id: Uuid, image: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .bind(image)
            .execute(&self.pool)
            .await
            .context("set recipe image")?;
        Ok(res.rows_affected() > 0)
    }
}
