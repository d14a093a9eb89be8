use std::time::Duration;

use async_trait::async_trait;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, Pool, Postgres};

use super::{
    error::StoreError,
    schema::{
        Attribute, AttributeKind, Id, NewUser, Recipe, RecipeChanges, RecipeDraft, RecipeFilter,
        User, UserChanges,
    },
    store::Store,
};

mod attributes;
mod recipes;
mod tokens;
mod users;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL-backed implementation of the `Store` port.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Query(format!("Migration failed: {e}")))?;

        log::info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        users::insert_user(&self.pool, &user).await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        users::get_user_by_email(&self.pool, email).await
    }

    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<Option<User>, StoreError> {
        users::update_user(&self.pool, id, &changes).await
    }

    async fn delete_user(&self, id: Id) -> Result<bool, StoreError> {
        users::delete_user(&self.pool, id).await
    }

    async fn replace_token(&self, user_id: Id, digest: &str) -> Result<(), StoreError> {
        tokens::replace_token(&self.pool, user_id, digest).await
    }

    async fn user_by_token(&self, digest: &str) -> Result<Option<User>, StoreError> {
        tokens::get_token_user(&self.pool, digest).await
    }

    async fn list_recipes(
        &self,
        owner: Id,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, StoreError> {
        recipes::list_recipes(&self.pool, owner, filter).await
    }

    async fn get_recipe(&self, owner: Id, id: Id) -> Result<Option<Recipe>, StoreError> {
        recipes::get_recipe(&self.pool, owner, id).await
    }

    async fn create_recipe(&self, owner: Id, draft: RecipeDraft) -> Result<Recipe, StoreError> {
        recipes::create_recipe(&self.pool, owner, &draft).await
    }

    async fn update_recipe(
        &self,
        owner: Id,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Option<Recipe>, StoreError> {
        recipes::update_recipe(&self.pool, owner, id, &changes).await
    }

    async fn delete_recipe(&self, owner: Id, id: Id) -> Result<bool, StoreError> {
        recipes::delete_recipe(&self.pool, owner, id).await
    }

    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: Id,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError> {
        attributes::list_attributes(&self.pool, kind, owner, assigned_only).await
    }

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
    ) -> Result<Option<Attribute>, StoreError> {
        attributes::get_attribute(&self.pool, kind, owner, id).await
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        attributes::rename_attribute(&self.pool, kind, owner, id, name).await
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: Id,
        id: Id,
    ) -> Result<bool, StoreError> {
        attributes::delete_attribute(&self.pool, kind, owner, id).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    use super::*;

    async fn user(store: &PgStore, email: &str) -> Result<User, StoreError> {
        store
            .create_user(NewUser {
                email: email.to_string(),
                name: String::from("Cook"),
                password: String::from("$argon2id$placeholder"),
                is_staff: false,
                is_superuser: false,
            })
            .await
    }

    fn draft(title: &str, tags: &[&str], ingredients: &[&str]) -> RecipeDraft {
        RecipeDraft {
            title: title.to_string(),
            time_minutes: 10,
            price: Decimal::new(525, 2),
            description: String::new(),
            link: String::new(),
            tags: tags.iter().map(|name| name.to_string()).collect(),
            ingredients: ingredients.iter().map(|name| name.to_string()).collect(),
        }
    }

    fn id_of(list: &[Attribute], name: &str) -> Id {
        list.iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.id)
            .unwrap()
    }

    fn titles(recipes: &[Recipe]) -> Vec<&str> {
        recipes.iter().map(|recipe| recipe.title.as_str()).collect()
    }

    #[sqlx::test(migrator = "crate::actions::MIGRATOR")]
    async fn tags_are_created_once_per_owner(pool: PgPool) -> Result<(), StoreError> {
        let store = PgStore::new(pool);
        let cook = user(&store, "cook@example.com").await?;
        let other = user(&store, "other@example.com").await?;

        let first = store
            .create_recipe(cook.id, draft("Cake", &["Vegan", "Dessert", "Vegan"], &[]))
            .await?;
        let second = store
            .create_recipe(cook.id, draft("Salad", &["Vegan"], &[]))
            .await?;
        store
            .create_recipe(other.id, draft("Soup", &["Vegan"], &[]))
            .await?;

        assert_eq!(first.tags.len(), 2);
        assert_eq!(id_of(&first.tags, "Vegan"), id_of(&second.tags, "Vegan"));

        let tags = store.list_attributes(AttributeKind::Tag, cook.id, false).await?;
        let names: Vec<&str> = tags.iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(names, ["Vegan", "Dessert"]);
        assert_eq!(
            store.list_attributes(AttributeKind::Tag, other.id, false).await?.len(),
            1
        );
        Ok(())
    }

    #[sqlx::test(migrator = "crate::actions::MIGRATOR")]
    async fn other_owners_rows_are_missing(pool: PgPool) -> Result<(), StoreError> {
        let store = PgStore::new(pool);
        let cook = user(&store, "cook@example.com").await?;
        let other = user(&store, "other@example.com").await?;
        let recipe = store
            .create_recipe(cook.id, draft("Pie", &["Baking"], &["Flour"]))
            .await?;
        let tag = recipe.tags[0].id;

        assert!(store.get_recipe(other.id, recipe.id).await?.is_none());
        assert!(store
            .update_recipe(other.id, recipe.id, RecipeChanges::default())
            .await?
            .is_none());
        assert!(!store.delete_recipe(other.id, recipe.id).await?);
        assert!(store.get_attribute(AttributeKind::Tag, other.id, tag).await?.is_none());
        assert!(store
            .rename_attribute(AttributeKind::Tag, other.id, tag, "Mine")
            .await?
            .is_none());
        assert!(!store.delete_attribute(AttributeKind::Tag, other.id, tag).await?);

        let kept = store.get_recipe(cook.id, recipe.id).await?.unwrap();
        assert_eq!(kept.tags, recipe.tags);
        assert_eq!(
            store.get_attribute(AttributeKind::Tag, cook.id, tag).await?,
            Some(recipe.tags[0].clone())
        );
        Ok(())
    }

    #[sqlx::test(migrator = "crate::actions::MIGRATOR")]
    async fn unique_violations_become_conflicts(pool: PgPool) -> Result<(), StoreError> {
        let store = PgStore::new(pool);
        let cook = user(&store, "cook@example.com").await?;
        let recipe = store
            .create_recipe(cook.id, draft("Cake", &["Sweet", "Dessert"], &[]))
            .await?;
        let sweet = id_of(&recipe.tags, "Sweet");

        let renamed = store
            .rename_attribute(AttributeKind::Tag, cook.id, sweet, "Dessert")
            .await;
        assert!(matches!(
            renamed,
            Err(StoreError::Conflict {
                entity: "tag",
                field: "name"
            })
        ));

        let duplicate = user(&store, "cook@example.com").await;
        assert!(matches!(
            duplicate,
            Err(StoreError::Conflict {
                entity: "user",
                field: "email"
            })
        ));
        Ok(())
    }

    #[sqlx::test(migrator = "crate::actions::MIGRATOR")]
    async fn recipes_filter_by_linked_ids(pool: PgPool) -> Result<(), StoreError> {
        let store = PgStore::new(pool);
        let cook = user(&store, "cook@example.com").await?;
        let curry = store
            .create_recipe(cook.id, draft("Curry", &["Vegan"], &["Rice"]))
            .await?;
        let steak = store
            .create_recipe(cook.id, draft("Steak", &["Dinner"], &["Beef"]))
            .await?;
        store
            .create_recipe(cook.id, draft("Toast", &[], &["Bread"]))
            .await?;

        let by_tags = RecipeFilter {
            tags: Some(vec![curry.tags[0].id, steak.tags[0].id]),
            ingredients: None,
        };
        assert_eq!(
            titles(&store.list_recipes(cook.id, &by_tags).await?),
            ["Steak", "Curry"]
        );

        let by_ingredient = RecipeFilter {
            tags: None,
            ingredients: Some(vec![steak.ingredients[0].id]),
        };
        assert_eq!(
            titles(&store.list_recipes(cook.id, &by_ingredient).await?),
            ["Steak"]
        );

        let unfiltered = store.list_recipes(cook.id, &RecipeFilter::default()).await?;
        assert_eq!(titles(&unfiltered), ["Toast", "Steak", "Curry"]);
        Ok(())
    }

    #[sqlx::test(migrator = "crate::actions::MIGRATOR")]
    async fn assigned_only_skips_unlinked_rows(pool: PgPool) -> Result<(), StoreError> {
        let store = PgStore::new(pool);
        let cook = user(&store, "cook@example.com").await?;
        let crumble = store
            .create_recipe(cook.id, draft("Crumble", &[], &["Apples", "Turkey"]))
            .await?;
        store
            .create_recipe(cook.id, draft("Pie", &[], &["Apples"]))
            .await?;

        let changes = RecipeChanges {
            ingredients: Some(vec![String::from("Apples")]),
            ..RecipeChanges::default()
        };
        store.update_recipe(cook.id, crumble.id, changes).await?;

        let assigned = store
            .list_attributes(AttributeKind::Ingredient, cook.id, true)
            .await?;
        let names: Vec<&str> = assigned.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, ["Apples"]);

        let all = store
            .list_attributes(AttributeKind::Ingredient, cook.id, false)
            .await?;
        assert_eq!(all.len(), 2);
        Ok(())
    }

    #[sqlx::test(migrator = "crate::actions::MIGRATOR")]
    async fn deleting_a_user_cascades(pool: PgPool) -> Result<(), StoreError> {
        let store = PgStore::new(pool);
        let cook = user(&store, "cook@example.com").await?;
        let other = user(&store, "other@example.com").await?;
        store
            .create_recipe(cook.id, draft("Pie", &["Baking"], &["Flour"]))
            .await?;
        store
            .create_recipe(other.id, draft("Bread", &["Baking"], &["Flour"]))
            .await?;
        store.replace_token(cook.id, "digest").await?;

        assert!(store.delete_user(cook.id).await?);

        assert!(store.user_by_email("cook@example.com").await?.is_none());
        assert!(store.user_by_token("digest").await?.is_none());
        assert!(store
            .list_recipes(cook.id, &RecipeFilter::default())
            .await?
            .is_empty());
        for kind in [AttributeKind::Tag, AttributeKind::Ingredient] {
            assert!(store.list_attributes(kind, cook.id, false).await?.is_empty());
            assert_eq!(store.list_attributes(kind, other.id, true).await?.len(), 1);
        }
        assert!(!store.delete_user(cook.id).await?);
        Ok(())
    }
}
