use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::taxonomy::repo_types::TaxonomyItem;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>, // storage key, see images::services
    pub created_at: OffsetDateTime,
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// A recipe together with its tags and ingredients, each ordered by name.
#[derive(Debug, Clone)]
pub struct RecipeWithLinks {
    pub recipe: Recipe,
    pub tags: Vec<TaxonomyItem>,
    pub ingredients: Vec<TaxonomyItem>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub owner: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tag_ids: Vec<Uuid>,
    pub ingredient_ids: Vec<Uuid>,
}

/// Partial update. `Some` link sets replace the whole association.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tag_ids: Option<Vec<Uuid>>,
    pub ingredient_ids: Option<Vec<Uuid>>,
}

/// Listing predicate. Non-empty id lists keep recipes carrying any of them;
/// both lists given means both must match.
#[derive(Debug, Clone)]
pub struct RecipeQuery {
    pub owner: Uuid,
    pub tag_ids: Vec<Uuid>,
    pub ingredient_ids: Vec<Uuid>,
}
