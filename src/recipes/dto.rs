use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recipes::repo_types::RecipeWithLinks;
use crate::taxonomy::dto::TaxonomyResponse;

/// Body of POST (create) and PUT (full replace).
#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub ingredients: Vec<Uuid>,
}

/// Body of PATCH; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct PatchRecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<Uuid>>,
}

/// `?tags=<id>,<id>&ingredients=<id>`
#[derive(Debug, Default, Deserialize)]
pub struct RecipeFilter {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub title: String,
    pub ingredients: Vec<Uuid>,
    pub tags: Vec<Uuid>,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
}

impl From<RecipeWithLinks> for RecipeResponse {
    fn from(r: RecipeWithLinks) -> Self {
        Self {
            id: r.recipe.id,
            title: r.recipe.title,
            ingredients: r.ingredients.into_iter().map(|i| i.id).collect(),
            tags: r.tags.into_iter().map(|t| t.id).collect(),
            time_minutes: r.recipe.time_minutes,
            price: r.recipe.price,
            link: r.recipe.link,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RecipeDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub ingredients: Vec<TaxonomyResponse>,
    pub tags: Vec<TaxonomyResponse>,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

impl From<RecipeWithLinks> for RecipeDetailResponse {
    fn from(r: RecipeWithLinks) -> Self {
        Self {
            id: r.recipe.id,
            title: r.recipe.title,
            ingredients: r.ingredients.into_iter().map(Into::into).collect(),
            tags: r.tags.into_iter().map(Into::into).collect(),
            time_minutes: r.recipe.time_minutes,
            price: r.recipe.price,
            link: r.recipe.link,
            image: r.recipe.image,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: Uuid,
    pub image: String,
}
