//! In-memory `Store` used by tests; mirrors the constraints of the Postgres
//! schema. Names sort by byte order, which only matches the database
//! collation for names of a single case.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{
    error::StoreError,
    schema::{
        Attribute, AttributeKind, Id, NewUser, Recipe, RecipeChanges, RecipeDraft, RecipeFilter,
        User, UserChanges,
    },
    store::{unique_names, Store},
};

#[derive(Debug, Clone)]
struct AttributeRecord {
    owner: Id,
    kind: AttributeKind,
    name: String,
}

#[derive(Default)]
struct Tables {
    next_id: Id,
    users: BTreeMap<Id, User>,
    tokens: BTreeMap<Id, String>,
    recipes: BTreeMap<Id, Recipe>,
    attributes: BTreeMap<Id, AttributeRecord>,
    links: BTreeSet<(Id, AttributeKind, Id)>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<Id>) -> bool {
        self.users
            .values()
            .any(|user| user.email == email && Some(user.id) != except)
    }

    fn find_attribute(&self, kind: AttributeKind, owner: Id, name: &str) -> Option<Id> {
        self.attributes
            .iter()
            .find(|(_, record)| record.kind == kind && record.owner == owner && record.name == name)
            .map(|(id, _)| *id)
    }

    fn link(&mut self, kind: AttributeKind, owner: Id, recipe_id: Id, names: &[String]) {
        for name in unique_names(names) {
            let attribute_id = match self.find_attribute(kind, owner, name) {
                Some(id) => id,
                None => {
                    let id = self.next_id();
                    self.attributes.insert(
                        id,
                        AttributeRecord {
                            owner,
                            kind,
                            name: name.to_string(),
                        },
                    );
                    id
                }
            };
            self.links.insert((recipe_id, kind, attribute_id));
        }
    }

    fn hydrate(&self, recipe: &Recipe) -> Recipe {
        let mut recipe = recipe.clone();
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            *recipe.attributes_mut(kind) = self
                .links
                .iter()
                .filter(|(recipe_id, link_kind, _)| *recipe_id == recipe.id && *link_kind == kind)
                .filter_map(|(_, _, attribute_id)| {
                    self.attributes.get(attribute_id).map(|record| Attribute {
                        id: *attribute_id,
                        name: record.name.to_owned(),
                    })
                })
                .collect();
        }
        recipe
    }

    fn linked_to_any(&self, recipe_id: Id, kind: AttributeKind, ids: &[Id]) -> bool {
        self.links.iter().any(|(linked_recipe, link_kind, attribute_id)| {
            *linked_recipe == recipe_id && *link_kind == kind && ids.contains(attribute_id)
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deactivate(&self, user_id: Id) {
        if let Some(user) = self.tables.lock().await.users.get_mut(&user_id) {
            user.is_active = false;
        }
    }

    /// Attribute ids as `(kind, owner, name)` tuples, for asserting on rows
    /// the API never lists directly.
    pub async fn attribute_rows(&self) -> Vec<(AttributeKind, Id, String)> {
        self.tables
            .lock()
            .await
            .attributes
            .values()
            .map(|record| (record.kind, record.owner, record.name.to_owned()))
            .collect()
    }

    pub async fn recipe_count(&self) -> usize {
        self.tables.lock().await.recipes.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::Conflict {
                entity: "user",
                field: "email",
            });
        }

        let id = tables.next_id();
        let row = User {
            id,
            email: user.email,
            name: user.name,
            password: user.password,
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            date_joined: Utc::now(),
        };
        tables.users.insert(id, row.clone());
        Ok(row)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }

    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict {
                    entity: "user",
                    field: "email",
                });
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(password) = changes.password {
            user.password = password;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Id) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.tokens.remove(&id);

        let recipes: Vec<Id> = tables
            .recipes
            .values()
            .filter(|recipe| recipe.user_id == id)
            .map(|recipe| recipe.id)
            .collect();
        let attributes: Vec<Id> = tables
            .attributes
            .iter()
            .filter(|(_, record)| record.owner == id)
            .map(|(attribute_id, _)| *attribute_id)
            .collect();

        for recipe_id in &recipes {
            tables.recipes.remove(recipe_id);
        }
        for attribute_id in &attributes {
            tables.attributes.remove(attribute_id);
        }
        tables.links.retain(|(recipe_id, _, attribute_id)| {
            !recipes.contains(recipe_id) && !attributes.contains(attribute_id)
        });
        Ok(true)
    }

    async fn replace_token(&self, user_id: Id, digest: &str) -> Result<(), StoreError> {
        self.tables
            .lock()
            .await
            .tokens
            .insert(user_id, digest.to_string());
        Ok(())
    }

    async fn user_by_token(&self, digest: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tokens
            .iter()
            .find(|(_, stored)| stored.as_str() == digest)
            .and_then(|(user_id, _)| tables.users.get(user_id))
            .cloned())
    }

    async fn list_recipes(
        &self,
        owner: Id,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .recipes
            .values()
            .rev()
            .filter(|recipe| recipe.user_id == owner)
            .filter(|recipe| {
                [AttributeKind::Tag, AttributeKind::Ingredient]
                    .into_iter()
                    .all(|kind| match filter.ids(kind) {
                        Some(ids) => tables.linked_to_any(recipe.id, kind, ids),
                        None => true,
                    })
            })
            .map(|recipe| tables.hydrate(recipe))
            .collect())
    }

    async fn get_recipe(&self, owner: Id, id: Id) -> Result<Option<Recipe>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .recipes
            .get(&id)
            .filter(|recipe| recipe.user_id == owner)
            .map(|recipe| tables.hydrate(recipe)))
    }

    async fn create_recipe(&self, owner: Id, draft: RecipeDraft) -> Result<Recipe, StoreError> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        let recipe = Recipe {
            id,
            user_id: owner,
            title: draft.title.to_owned(),
            time_minutes: draft.time_minutes,
            price: draft.price,
            description: draft.description.to_owned(),
            link: draft.link.to_owned(),
            tags: vec![],
            ingredients: vec![],
        };
        tables.recipes.insert(id, recipe.clone());
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            tables.link(kind, owner, id, draft.names(kind));
        }
        Ok(tables.hydrate(&recipe))
    }

    async fn update_recipe(
        &self,
        owner: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(recipe) = tables
            .recipes
            .get_mut(&id)
            .filter(|recipe| recipe.user_id == owner)
        else {
            return Ok(None);
        };

        if let Some(title) = &changes.title {
            recipe.title = title.to_owned();
        }
        if let Some(time_minutes) = changes.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = changes.price {
            recipe.price = price;
        }
        if let Some(description) = &changes.description {
            recipe.description = description.to_owned();
        }
        if let Some(link) = &changes.link {
            recipe.link = link.to_owned();
        }
        let recipe = recipe.clone();

        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            if let Some(names) = changes.names(kind) {
                tables
                    .links
                    .retain(|(recipe_id, link_kind, _)| !(*recipe_id == id && *link_kind == kind));
                tables.link(kind, owner, id, names);
            }
        }
        Ok(Some(tables.hydrate(&recipe)))
    }

    async fn delete_recipe(&self, owner: Id, id: Id) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .recipes
            .get(&id)
            .is_some_and(|recipe| recipe.user_id == owner);
        if !owned {
            return Ok(false);
        }
        tables.recipes.remove(&id);
        tables.links.retain(|(recipe_id, _, _)| *recipe_id != id);
        Ok(true)
    }

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: Id,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError> {
        let tables = self.tables.lock().await;
        let mut list: Vec<Attribute> = tables
            .attributes
            .iter()
            .filter(|(_, record)| record.kind == kind && record.owner == owner)
            .filter(|(id, _)| {
                !assigned_only
                    || tables
                        .links
                        .iter()
                        .any(|(_, link_kind, attribute_id)| *link_kind == kind && attribute_id == *id)
            })
            .map(|(id, record)| Attribute {
                id: *id,
                name: record.name.to_owned(),
            })
            .collect();
        list.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(list)
    }

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
    ) -> Result<Option<Attribute>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .attributes
            .get(&id)
            .filter(|record| record.kind == kind && record.owner == owner)
            .map(|record| Attribute {
                id,
                name: record.name.to_owned(),
            }))
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .attributes
            .get(&id)
            .is_some_and(|record| record.kind == kind && record.owner == owner);
        if !owned {
            return Ok(None);
        }
        if tables
            .find_attribute(kind, owner, name)
            .is_some_and(|existing| existing != id)
        {
            return Err(StoreError::Conflict {
                entity: kind.entity(),
                field: "name",
            });
        }

        let Some(record) = tables.attributes.get_mut(&id) else {
            return Ok(None);
        };
        record.name = name.to_string();
        Ok(Some(Attribute {
            id,
            name: record.name.to_owned(),
        }))
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .attributes
            .get(&id)
            .is_some_and(|record| record.kind == kind && record.owner == owner);
        if !owned {
            return Ok(false);
        }
        tables.attributes.remove(&id);
        tables
            .links
            .retain(|(_, link_kind, attribute_id)| !(*link_kind == kind && *attribute_id == id));
        Ok(true)
    }
}
