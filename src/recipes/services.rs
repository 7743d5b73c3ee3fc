use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::images::services::{presign_image, store_recipe_image, UploadItem};
use crate::recipes::{
    dto::{PatchRecipeRequest, RecipeFilter, RecipeRequest},
    repo::RecipeRepo,
    repo_types::{NewRecipe, RecipeChanges, RecipeQuery, RecipeWithLinks},
};
use crate::storage::StorageClient;
use crate::taxonomy::{repo::TaxonomyRepo, repo_types::TaxonomyKind, services::resolve_owned};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_LINK_LEN: usize = 255;
/// NUMERIC(5, 2): three integer digits, two decimals.
const PRICE_LIMIT: i64 = 1000;

/// Parses a comma-separated id list from a query parameter.
pub fn parse_id_list(raw: Option<&str>, field: &'static str) -> Result<Vec<Uuid>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| AppError::validation(field, format!("\"{s}\" is not a valid id")))
        })
        .collect()
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title", "this field may not be blank"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::validation(
            "title",
            format!("ensure this field has no more than {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(title.to_string())
}

fn validate_time(minutes: i32) -> Result<i32, AppError> {
    if minutes < 0 {
        return Err(AppError::validation(
            "time_minutes",
            "ensure this value is greater than or equal to 0",
        ));
    }
    Ok(minutes)
}

/// Rejects more than 2 decimals or 5 digits; returns the price at scale 2.
pub fn normalize_price(price: Decimal) -> Result<Decimal, AppError> {
    if price.normalize().scale() > 2 {
        return Err(AppError::validation(
            "price",
            "ensure that there are no more than 2 decimal places",
        ));
    }
    if price.abs() >= Decimal::from(PRICE_LIMIT) {
        return Err(AppError::validation(
            "price",
            "ensure that there are no more than 5 digits in total",
        ));
    }
    let mut price = price;
    price.rescale(2);
    Ok(price)
}

fn validate_link(link: &str) -> Result<String, AppError> {
    let link = link.trim();
    if link.chars().count() > MAX_LINK_LEN {
        return Err(AppError::validation(
            "link",
            format!("ensure this field has no more than {MAX_LINK_LEN} characters"),
        ));
    }
    Ok(link.to_string())
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::validation(field, "this field is required"))
}

/// Validated form of a full recipe body.
struct RecipeFields {
    title: String,
    time_minutes: i32,
    price: Decimal,
    link: String,
    tag_ids: Vec<Uuid>,
    ingredient_ids: Vec<Uuid>,
}

async fn validate_full(
    taxonomy: &dyn TaxonomyRepo,
    owner: Uuid,
    req: RecipeRequest,
) -> Result<RecipeFields, AppError> {
    let title = validate_title(&required(req.title, "title")?)?;
    let time_minutes = validate_time(required(req.time_minutes, "time_minutes")?)?;
    let price = normalize_price(required(req.price, "price")?)?;
    let link = validate_link(req.link.as_deref().unwrap_or_default())?;
    let tag_ids = resolve_owned(taxonomy, TaxonomyKind::Tag, owner, &req.tags).await?;
    let ingredient_ids =
        resolve_owned(taxonomy, TaxonomyKind::Ingredient, owner, &req.ingredients).await?;
    Ok(RecipeFields {
        title,
        time_minutes,
        price,
        link,
        tag_ids,
        ingredient_ids,
    })
}

pub async fn list(
    recipes: &dyn RecipeRepo,
    owner: Uuid,
    filter: &RecipeFilter,
) -> Result<Vec<RecipeWithLinks>, AppError> {
    let query = RecipeQuery {
        owner,
        tag_ids: parse_id_list(filter.tags.as_deref(), "tags")?,
        ingredient_ids: parse_id_list(filter.ingredients.as_deref(), "ingredients")?,
    };
    Ok(recipes.list(&query).await?)
}

pub async fn detail(
    recipes: &dyn RecipeRepo,
    owner: Uuid,
    id: Uuid,
) -> Result<RecipeWithLinks, AppError> {
    recipes.get(owner, id).await?.ok_or(AppError::NotFound)
}

pub async fn create(
    recipes: &dyn RecipeRepo,
    taxonomy: &dyn TaxonomyRepo,
    owner: Uuid,
    req: RecipeRequest,
) -> Result<RecipeWithLinks, AppError> {
    let fields = validate_full(taxonomy, owner, req).await?;
    let created = recipes
        .insert(NewRecipe {
            owner,
            title: fields.title,
            time_minutes: fields.time_minutes,
            price: fields.price,
            link: fields.link,
            tag_ids: fields.tag_ids,
            ingredient_ids: fields.ingredient_ids,
        })
        .await?;
    info!(recipe_id = %created.recipe.id, user_id = %owner, "recipe created");
    Ok(created)
}

/// PUT: every field is rewritten, omitted link sets become empty.
pub async fn replace(
    recipes: &dyn RecipeRepo,
    taxonomy: &dyn TaxonomyRepo,
    owner: Uuid,
    id: Uuid,
    req: RecipeRequest,
) -> Result<RecipeWithLinks, AppError> {
    let fields = validate_full(taxonomy, owner, req).await?;
    let changes = RecipeChanges {
        title: Some(fields.title),
        time_minutes: Some(fields.time_minutes),
        price: Some(fields.price),
        link: Some(fields.link),
        tag_ids: Some(fields.tag_ids),
        ingredient_ids: Some(fields.ingredient_ids),
    };
    recipes
        .update(owner, id, changes)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn update(
    recipes: &dyn RecipeRepo,
    taxonomy: &dyn TaxonomyRepo,
    owner: Uuid,
    id: Uuid,
    req: PatchRecipeRequest,
) -> Result<RecipeWithLinks, AppError> {
    let mut changes = RecipeChanges::default();
    if let Some(title) = req.title {
        changes.title = Some(validate_title(&title)?);
    }
    if let Some(minutes) = req.time_minutes {
        changes.time_minutes = Some(validate_time(minutes)?);
    }
    if let Some(price) = req.price {
        changes.price = Some(normalize_price(price)?);
    }
    if let Some(link) = req.link {
        changes.link = Some(validate_link(&link)?);
    }
    if let Some(ids) = req.tags {
        changes.tag_ids = Some(resolve_owned(taxonomy, TaxonomyKind::Tag, owner, &ids).await?);
    }
    if let Some(ids) = req.ingredients {
        changes.ingredient_ids =
            Some(resolve_owned(taxonomy, TaxonomyKind::Ingredient, owner, &ids).await?);
    }

    recipes
        .update(owner, id, changes)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn delete(
    recipes: &dyn RecipeRepo,
    storage: &dyn StorageClient,
    owner: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    let existing = detail(recipes, owner, id).await?;
    if !recipes.delete(owner, id).await? {
        return Err(AppError::NotFound);
    }
    if let Some(image) = existing.recipe.image {
        discard_image(storage, &image).await;
    }
    info!(recipe_id = %id, user_id = %owner, "recipe deleted");
    Ok(())
}

/// Stores a new image for the recipe and drops the one it replaces.
pub async fn upload_image(
    recipes: &dyn RecipeRepo,
    storage: &dyn StorageClient,
    owner: Uuid,
    id: Uuid,
    item: UploadItem<'_>,
) -> Result<String, AppError> {
    let existing = detail(recipes, owner, id).await?;
    if item.body.is_empty() {
        return Err(AppError::validation("image", "no file was submitted"));
    }

    let key = store_recipe_image(storage, item).await?;
    match recipes.set_image(owner, id, &key).await {
        Ok(true) => {}
        Ok(false) => {
            // Deleted between the lookup and the update.
            discard_image(storage, &key).await;
            return Err(AppError::NotFound);
        }
        Err(e) => {
            discard_image(storage, &key).await;
            return Err(e.into());
        }
    }
    if let Some(previous) = existing.recipe.image.filter(|p| *p != key) {
        discard_image(storage, &previous).await;
    }

    info!(recipe_id = %id, image = %key, "recipe image stored");
    Ok(key)
}

pub async fn image_url(
    recipes: &dyn RecipeRepo,
    storage: &dyn StorageClient,
    owner: Uuid,
    id: Uuid,
    ttl_secs: u64,
) -> Result<String, AppError> {
    let recipe = detail(recipes, owner, id).await?;
    let key = recipe.recipe.image.ok_or(AppError::NotFound)?;
    Ok(presign_image(storage, &key, ttl_secs).await?)
}

async fn discard_image(storage: &dyn StorageClient, key: &str) {
    if let Err(e) = storage.delete_object(key).await {
        warn!(error = %e, key, "failed to delete stored image");
    }
}
