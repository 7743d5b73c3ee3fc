//! In-process store with the same observable behaviour as [`super::PgStore`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    repo::{TokenRepo, UserRepo},
    repo_types::{AuthToken, NewUser, User, UserChanges},
};
use crate::recipes::{
    repo::RecipeRepo,
    repo_types::{NewRecipe, Recipe, RecipeChanges, RecipeQuery, RecipeWithLinks},
};
use crate::taxonomy::{
    repo::TaxonomyRepo,
    repo_types::{TaxonomyItem, TaxonomyKind, TaxonomyQuery},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tokens: Vec<AuthToken>,
    items: HashMap<TaxonomyKind, Vec<TaxonomyItem>>,
    /// Insertion order; newest last.
    recipes: Vec<Recipe>,
    /// (recipe_id, item_id) pairs per kind.
    links: HashMap<TaxonomyKind, Vec<(Uuid, Uuid)>>,
}

impl Tables {
    fn items(&self, kind: TaxonomyKind) -> &[TaxonomyItem] {
        self.items.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    fn links(&self, kind: TaxonomyKind) -> &[(Uuid, Uuid)] {
        self.links.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    fn linked_items(&self, kind: TaxonomyKind, recipe_id: Uuid) -> Vec<TaxonomyItem> {
        let mut out: Vec<TaxonomyItem> = self
            .links(kind)
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, item)| self.items(kind).iter().find(|i| i.id == *item).cloned())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        out
    }

    fn with_links(&self, recipe: &Recipe) -> RecipeWithLinks {
        RecipeWithLinks {
            tags: self.linked_items(TaxonomyKind::Tag, recipe.id),
            ingredients: self.linked_items(TaxonomyKind::Ingredient, recipe.id),
            recipe: recipe.clone(),
        }
    }

    fn replace_links(&mut self, kind: TaxonomyKind, recipe_id: Uuid, ids: &[Uuid]) {
        let links = self.links.entry(kind).or_default();
        links.retain(|(r, _)| *r != recipe_id);
        for id in ids {
            if !links.contains(&(recipe_id, *id)) {
                links.push((recipe_id, *id));
            }
        }
    }

    fn has_link(&self, kind: TaxonomyKind, recipe_id: Uuid, ids: &[Uuid]) -> bool {
        self.links(kind)
            .iter()
            .any(|(r, item)| *r == recipe_id && ids.contains(item))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_active(&self, id: Uuid, active: bool) {
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.id == id) {
            user.is_active = active;
        }
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.email == user.email) {
            return Ok(None);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(created.clone());
        Ok(Some(created))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> anyhow::Result<Option<User>> {
        let mut t = self.lock();
        if let Some(email) = &changes.email {
            if t.users.iter().any(|u| u.id != id && u.email == *email) {
                return Ok(None);
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl TokenRepo for MemoryStore {
    async fn get_or_create(&self, user_id: Uuid, candidate: &str) -> anyhow::Result<AuthToken> {
        let mut t = self.lock();
        if let Some(token) = t.tokens.iter().find(|k| k.user_id == user_id) {
            return Ok(token.clone());
        }
        let token = AuthToken {
            key: candidate.to_string(),
            user_id,
        };
        t.tokens.push(token.clone());
        Ok(token)
    }

    async fn find_user(&self, key: &str) -> anyhow::Result<Option<User>> {
        let t = self.lock();
        let Some(token) = t.tokens.iter().find(|k| k.key == key) else {
            return Ok(None);
        };
        Ok(t.users.iter().find(|u| u.id == token.user_id).cloned())
    }
}

#[async_trait]
impl TaxonomyRepo for MemoryStore {
    async fn list(
        &self,
        kind: TaxonomyKind,
        query: &TaxonomyQuery,
    ) -> anyhow::Result<Vec<TaxonomyItem>> {
        let t = self.lock();
        let mut out: Vec<TaxonomyItem> = t
            .items(kind)
            .iter()
            .filter(|i| i.user_id == query.owner)
            .filter(|i| {
                !query.assigned_only
                    || t.links(kind).iter().any(|(recipe_id, item)| {
                        *item == i.id
                            && t.recipes
                                .iter()
                                .any(|r| r.id == *recipe_id && r.user_id == query.owner)
                    })
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.name.cmp(&a.name).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn find_owned(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        ids: &[Uuid],
    ) -> anyhow::Result<Vec<TaxonomyItem>> {
        let t = self.lock();
        let mut out: Vec<TaxonomyItem> = t
            .items(kind)
            .iter()
            .filter(|i| i.user_id == owner && ids.contains(&i.id))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn insert(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        name: &str,
    ) -> anyhow::Result<TaxonomyItem> {
        let item = TaxonomyItem {
            id: Uuid::new_v4(),
            user_id: owner,
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock().items.entry(kind).or_default().push(item.clone());
        Ok(item)
    }

    async fn rename(
        &self,
        kind: TaxonomyKind,
        owner: Uuid,
        id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<TaxonomyItem>> {
        let mut t = self.lock();
        let item = t
            .items
            .entry(kind)
            .or_default()
            .iter_mut()
            .find(|i| i.id == id && i.user_id == owner);
        Ok(item.map(|i| {
            i.name = name.to_string();
            i.clone()
        }))
    }

    async fn delete(&self, kind: TaxonomyKind, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.lock();
        let items = t.items.entry(kind).or_default();
        let before = items.len();
        items.retain(|i| !(i.id == id && i.user_id == owner));
        if items.len() == before {
            return Ok(false);
        }
        t.links.entry(kind).or_default().retain(|(_, item)| *item != id);
        Ok(true)
    }
}

#[async_trait]
impl RecipeRepo for MemoryStore {
    async fn list(&self, query: &RecipeQuery) -> anyhow::Result<Vec<RecipeWithLinks>> {
        let t = self.lock();
        Ok(t.recipes
            .iter()
            .rev()
            .filter(|r| r.user_id == query.owner)
            .filter(|r| {
                query.tag_ids.is_empty() || t.has_link(TaxonomyKind::Tag, r.id, &query.tag_ids)
            })
            .filter(|r| {
                query.ingredient_ids.is_empty()
                    || t.has_link(TaxonomyKind::Ingredient, r.id, &query.ingredient_ids)
            })
            .map(|r| t.with_links(r))
            .collect())
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<RecipeWithLinks>> {
        let t = self.lock();
        Ok(t.recipes
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .map(|r| t.with_links(r)))
    }

    async fn insert(&self, new: NewRecipe) -> anyhow::Result<RecipeWithLinks> {
        let mut t = self.lock();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: new.owner,
            title: new.title,
            time_minutes: new.time_minutes,
            price: new.price,
            link: new.link,
            image: None,
            created_at: OffsetDateTime::now_utc(),
        };
        t.replace_links(TaxonomyKind::Tag, recipe.id, &new.tag_ids);
        t.replace_links(TaxonomyKind::Ingredient, recipe.id, &new.ingredient_ids);
        t.recipes.push(recipe.clone());
        Ok(t.with_links(&recipe))
    }

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: RecipeChanges,
    ) -> anyhow::Result<Option<RecipeWithLinks>> {
        let mut t = self.lock();
        let Some(recipe) = t
            .recipes
            .iter_mut()
            .find(|r| r.id == id && r.user_id == owner)
        else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            recipe.title = title;
        }
        if let Some(minutes) = changes.time_minutes {
            recipe.time_minutes = minutes;
        }
        if let Some(price) = changes.price {
            recipe.price = price;
        }
        if let Some(link) = changes.link {
            recipe.link = link;
        }
        let recipe = recipe.clone();

        if let Some(ids) = &changes.tag_ids {
            t.replace_links(TaxonomyKind::Tag, id, ids);
        }
        if let Some(ids) = &changes.ingredient_ids {
            t.replace_links(TaxonomyKind::Ingredient, id, ids);
        }
        Ok(Some(t.with_links(&recipe)))
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.lock();
        let before = t.recipes.len();
        t.recipes.retain(|r| !(r.id == id && r.user_id == owner));
        if t.recipes.len() == before {
            return Ok(false);
        }
        for links in t.links.values_mut() {
            links.retain(|(r, _)| *r != id);
        }
        Ok(true)
    }

    async fn set_image(&self, owner: Uuid, id: Uuid, image: &str) -> anyhow::Result<bool> {
        let mut t = self.lock();
        let Some(recipe) = t
            .recipes
            .iter_mut()
            .find(|r| r.id == id && r.user_id == owner)
        else {
            return Ok(false);
        };
        recipe.image = Some(image.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    async fn user(store: &MemoryStore, email: &str) -> User {
        UserRepo::insert(
            store,
            NewUser {
                email: email.into(),
                name: String::new(),
                password_hash: "x".into(),
                is_staff: false,
                is_superuser: false,
            },
        )
        .await
        .unwrap()
        .unwrap()
    }

    fn recipe(owner: Uuid, title: &str, tags: Vec<Uuid>) -> NewRecipe {
        NewRecipe {
            owner,
            title: title.into(),
            time_minutes: 5,
            price: Decimal::new(500, 2),
            link: String::new(),
            tag_ids: tags,
            ingredient_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_refused() {
        let store = MemoryStore::default();
        user(&store, "a@example.com").await;
        let again = UserRepo::insert(
            &store,
            NewUser {
                email: "a@example.com".into(),
                name: String::new(),
                password_hash: "y".into(),
                is_staff: false,
                is_superuser: false,
            },
        )
        .await
        .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn deleting_tag_detaches_it_from_recipes() {
        let store = MemoryStore::default();
        let owner = user(&store, "a@example.com").await.id;
        let tag = TaxonomyRepo::insert(&store, TaxonomyKind::Tag, owner, "Quick")
            .await
            .unwrap();
        let created = RecipeRepo::insert(&store, recipe(owner, "Toast", vec![tag.id]))
            .await
            .unwrap();
        assert_eq!(created.tags.len(), 1);

        assert!(TaxonomyRepo::delete(&store, TaxonomyKind::Tag, owner, tag.id)
            .await
            .unwrap());
        let fetched = RecipeRepo::get(&store, owner, created.recipe.id)
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.tags.is_empty());
    }

    #[tokio::test]
    async fn assigned_only_ignores_other_owners_recipes() {
        let store = MemoryStore::default();
        let owner = user(&store, "a@example.com").await.id;
        let tag = TaxonomyRepo::insert(&store, TaxonomyKind::Tag, owner, "Quick")
            .await
            .unwrap();
        let query = TaxonomyQuery {
            owner,
            assigned_only: true,
        };
        assert!(TaxonomyRepo::list(&store, TaxonomyKind::Tag, &query)
            .await
            .unwrap()
            .is_empty());

        RecipeRepo::insert(&store, recipe(owner, "One", vec![tag.id]))
            .await
            .unwrap();
        RecipeRepo::insert(&store, recipe(owner, "Two", vec![tag.id]))
            .await
            .unwrap();
        let listed = TaxonomyRepo::list(&store, TaxonomyKind::Tag, &query)
            .await
            .unwrap();
        assert_eq!(listed, vec![tag]);
    }

    #[tokio::test]
    async fn recipes_listed_newest_first() {
        let store = MemoryStore::default();
        let owner = user(&store, "a@example.com").await.id;
        for title in ["First", "Second", "Third"] {
            RecipeRepo::insert(&store, recipe(owner, title, Vec::new()))
                .await
                .unwrap();
        }
        let query = RecipeQuery {
            owner,
            tag_ids: Vec::new(),
            ingredient_ids: Vec::new(),
        };
        let titles: Vec<String> = RecipeRepo::list(&store, &query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.recipe.title)
            .collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);
    }
}
