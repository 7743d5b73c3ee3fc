use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::taxonomy::repo_types::TaxonomyItem;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub assigned_only: Option<String>,
}

/// Body of create and rename requests.
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<TaxonomyItem> for TaxonomyResponse {
    fn from(item: TaxonomyItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}
