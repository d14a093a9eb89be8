use async_trait::async_trait;

use super::{
    error::StoreError,
    schema::{
        Attribute, AttributeKind, Id, NewUser, Recipe, RecipeChanges, RecipeDraft, RecipeFilter,
        User, UserChanges,
    },
};

/// Persistence port. Every recipe, tag and ingredient operation is scoped to
/// `owner`; rows of other users are indistinguishable from missing ones.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<Option<User>, StoreError>;
    /// Removes the user together with everything they own.
    async fn delete_user(&self, id: Id) -> Result<bool, StoreError>;

    /// Stores `digest` as the user's only token, dropping any previous one.
    async fn replace_token(&self, user_id: Id, digest: &str) -> Result<(), StoreError>;
    async fn user_by_token(&self, digest: &str) -> Result<Option<User>, StoreError>;

    async fn list_recipes(&self, owner: Id, filter: &RecipeFilter)
        -> Result<Vec<Recipe>, StoreError>;
    async fn get_recipe(&self, owner: Id, id: Id) -> Result<Option<Recipe>, StoreError>;
    async fn create_recipe(&self, owner: Id, draft: RecipeDraft) -> Result<Recipe, StoreError>;
    async fn update_recipe(
        &self,
        owner: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>, StoreError>;
    async fn delete_recipe(&self, owner: Id, id: Id) -> Result<bool, StoreError>;

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: Id,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError>;
    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
    ) -> Result<Option<Attribute>, StoreError>;
    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>, StoreError>;
    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
    ) -> Result<bool, StoreError>;
}

/// Names in first-seen order with duplicates dropped, so one payload never
/// links the same tag twice.
pub fn unique_names(names: &[String]) -> Vec<&str> {
    let mut seen = Vec::with_capacity(names.len());
    for name in names {
        if !seen.contains(&name.as_str()) {
            seen.push(name.as_str());
        }
    }
    seen
}
