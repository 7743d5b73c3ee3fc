use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// The two user-scoped label kinds a recipe can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Tag,
    Ingredient,
}

impl TaxonomyKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Tag => "tags",
            Self::Ingredient => "ingredients",
        }
    }

    /// Join table linking recipes to this kind.
    pub fn link_table(self) -> &'static str {
        match self {
            Self::Tag => "recipe_tags",
            Self::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            Self::Tag => "tag_id",
            Self::Ingredient => "ingredient_id",
        }
    }

    /// Field name used for this kind in recipe payloads and URLs.
    pub fn plural(self) -> &'static str {
        self.table()
    }
}

/// A tag or ingredient row. Both tables share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TaxonomyItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}

impl std::fmt::Display for TaxonomyItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Listing predicate: always owner-scoped, optionally restricted to items in use.
#[derive(Debug, Clone, Copy)]
pub struct TaxonomyQuery {
    pub owner: Uuid,
    /// Keep only items attached to at least one of the owner's recipes.
    pub assigned_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_displays_as_its_name() {
        let item = TaxonomyItem {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Vegan".to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        assert_eq!(item.to_string(), item.name);
    }

    #[test]
    fn kind_tables() {
        assert_eq!(TaxonomyKind::Tag.plural(), "tags");
        assert_eq!(TaxonomyKind::Ingredient.link_table(), "recipe_ingredients");
        assert_eq!(TaxonomyKind::Ingredient.link_column(), "ingredient_id");
    }
}
