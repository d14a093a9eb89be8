use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::constants::PRICE_DECIMAL_PLACES;

pub type Id = i32;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub name: String,
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

/// Public view of a user, never carries the password hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            name: user.name.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Tags and ingredients share one shape and differ only in where they live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    pub fn link_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    pub fn entity(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag",
            AttributeKind::Ingredient => "ingredient",
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Attribute {
    pub id: Id,
    pub name: String,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedAttribute {
    pub recipe_id: Id,
    pub id: Id,
    pub name: String,
}

impl From<LinkedAttribute> for Attribute {
    fn from(value: LinkedAttribute) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct Recipe {
    pub id: Id,
    #[serde(skip)]
    pub user_id: Id,
    pub title: String,
    pub time_minutes: i32,
    #[serde(serialize_with = "serialize_price")]
    pub price: Decimal,
    pub description: String,
    pub link: String,

    #[sqlx(skip)]
    pub tags: Vec<Attribute>,
    #[sqlx(skip)]
    pub ingredients: Vec<Attribute>,
}

impl Recipe {
    pub fn attributes_mut(&mut self, kind: AttributeKind) -> &mut Vec<Attribute> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Ingredient => &mut self.ingredients,
        }
    }
}

/// List representation of a recipe; the description is only sent on detail views.
#[derive(Debug, Serialize)]
pub struct RecipeSummary<'a> {
    pub id: Id,
    pub title: &'a str,
    pub time_minutes: i32,
    #[serde(serialize_with = "serialize_price")]
    pub price: Decimal,
    pub link: &'a str,
    pub tags: &'a [Attribute],
    pub ingredients: &'a [Attribute],
}

impl<'a> From<&'a Recipe> for RecipeSummary<'a> {
    fn from(recipe: &'a Recipe) -> Self {
        Self {
            id: recipe.id,
            title: &recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: &recipe.link,
            tags: &recipe.tags,
            ingredients: &recipe.ingredients,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// Partial update; `None` leaves the column (or the link set) untouched.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn names(&self, kind: AttributeKind) -> Option<&[String]> {
        match kind {
            AttributeKind::Tag => self.tags.as_deref(),
            AttributeKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

impl RecipeDraft {
    pub fn names(&self, kind: AttributeKind) -> &[String] {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Ingredient => &self.ingredients,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeFilter {
    pub fn ids(&self, kind: AttributeKind) -> Option<&[Id]> {
        match kind {
            AttributeKind::Tag => self.tags.as_deref(),
            AttributeKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

pub fn serialize_price<S: Serializer>(price: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    let mut price = price.round_dp(PRICE_DECIMAL_PLACES);
    price.rescale(PRICE_DECIMAL_PLACES);
    serializer.serialize_str(&price.to_string())
}
