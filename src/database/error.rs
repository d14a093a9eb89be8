use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} with this {field} already exists.")]
    Conflict {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{0}")]
    Query(String),
}

impl StoreError {
    fn from_constraint(constraint: &str) -> Option<Self> {
        let (entity, field) = match constraint {
            "users_email_key" => ("user", "email"),
            "tags_user_id_name_key" => ("tag", "name"),
            "ingredients_user_id_name_key" => ("ingredient", "name"),
            _ => return None,
        };
        Some(Self::Conflict { entity, field })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                if e.is_unique_violation() {
                    if let Some(conflict) = e.constraint().and_then(Self::from_constraint) {
                        return conflict;
                    }
                }
                Self::Query(format!("{e}"))
            }
            sqlx::Error::RowNotFound => Self::Query(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::Query(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::Query(String::from("Pool closed")),
            e => Self::Query(format!("{e}")),
        }
    }
}

/// Field name to messages, serialized as the body of a 400 response.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Error)]
#[error("invalid input: {}", .errors.keys().cloned().collect::<Vec<_>>().join(", "))]
#[serde(transparent)]
pub struct ValidationError {
    errors: FieldErrors,
}

impl ValidationError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut error = Self::default();
        error.push(field, message);
        error
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}
