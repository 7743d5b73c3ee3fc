use std::fmt::Display;

use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::StorageClient;

const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

pub struct UploadItem<'a> {
    pub body: Bytes,
    pub file_name: Option<&'a str>,
    pub content_type: &'a str,
}

/// `uploads/recipe/<id>.<ext>`; the original base name is discarded.
pub fn recipe_image_path(id: impl Display, file_name: Option<&str>, content_type: &str) -> String {
    let ext = file_name
        .and_then(ext_from_file_name)
        .or_else(|| ext_from_mime(content_type).map(str::to_string))
        .unwrap_or_else(|| "bin".into());
    format!("{RECIPE_IMAGE_DIR}/{id}.{ext}")
}

fn ext_from_file_name(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    Some(if ext == "jpeg" { "jpg".into() } else { ext })
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Stores the upload under a fresh key and returns that key.
pub async fn store_recipe_image(
    storage: &dyn StorageClient,
    item: UploadItem<'_>,
) -> anyhow::Result<String> {
    anyhow::ensure!(!item.body.is_empty(), "empty image");
    let key = recipe_image_path(Uuid::new_v4(), item.file_name, item.content_type);
    storage
        .put_object(&key, item.body, item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

pub async fn presign_image(
    storage: &dyn StorageClient,
    key: &str,
    ttl_secs: u64,
) -> anyhow::Result<String> {
    storage
        .presign_get(key, ttl_secs)
        .await
        .with_context(|| format!("presign url for {}", key))
}
