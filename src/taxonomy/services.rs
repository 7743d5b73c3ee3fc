use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::taxonomy::{
    repo::TaxonomyRepo,
    repo_types::{TaxonomyItem, TaxonomyKind, TaxonomyQuery},
};

pub const MAX_NAME_LEN: usize = 255;

/// Interprets the `assigned_only` query flag: integers (non-zero is set) or `true`/`false`.
pub fn parse_assigned_only(raw: Option<&str>) -> Result<bool, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(false);
    };
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n != 0);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::validation(
            "assigned_only",
            "expected an integer or a boolean",
        )),
    }
}

pub fn validate_name(name: Option<&str>) -> Result<String, AppError> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(AppError::validation("name", "this field may not be blank"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(
            "name",
            format!("ensure this field has no more than {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name.to_string())
}

pub async fn list(
    repo: &dyn TaxonomyRepo,
    kind: TaxonomyKind,
    owner: Uuid,
    assigned_only: bool,
) -> Result<Vec<TaxonomyItem>, AppError> {
    let query = TaxonomyQuery {
        owner,
        assigned_only,
    };
    Ok(repo.list(kind, &query).await?)
}

pub async fn create(
    repo: &dyn TaxonomyRepo,
    kind: TaxonomyKind,
    owner: Uuid,
    name: Option<&str>,
) -> Result<TaxonomyItem, AppError> {
    let name = validate_name(name)?;
    let item = repo.insert(kind, owner, &name).await?;
    info!(?kind, id = %item.id, user_id = %owner, "created");
    Ok(item)
}

pub async fn rename(
    repo: &dyn TaxonomyRepo,
    kind: TaxonomyKind,
    owner: Uuid,
    id: Uuid,
    name: Option<&str>,
) -> Result<TaxonomyItem, AppError> {
    let name = validate_name(name)?;
    repo.rename(kind, owner, id, &name)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn delete(
    repo: &dyn TaxonomyRepo,
    kind: TaxonomyKind,
    owner: Uuid,
    id: Uuid,
) -> Result<(), AppError> {
    if !repo.delete(kind, owner, id).await? {
        return Err(AppError::NotFound);
    }
    info!(?kind, %id, user_id = %owner, "deleted");
    Ok(())
}

/// Checks that every id names an item of `owner`; returns the ids deduplicated.
pub async fn resolve_owned(
    repo: &dyn TaxonomyRepo,
    kind: TaxonomyKind,
    owner: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Uuid>, AppError> {
    let mut wanted = ids.to_vec();
    wanted.sort();
    wanted.dedup();

    let found = repo.find_owned(kind, owner, &wanted).await?;
    if let Some(missing) = wanted.iter().find(|id| !found.iter().any(|f| f.id == **id)) {
        return Err(AppError::validation(
            kind.plural(),
            format!("invalid pk \"{missing}\" - object does not exist"),
        ));
    }
    Ok(wanted)
}
