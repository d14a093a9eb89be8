use crate::{
    error::StoreError,
    schema::{Id, NewUser, User, UserChanges},
};

use sqlx::{Pool, Postgres};

const USER_COLUMNS: &str = "id, email, name, password, is_active, is_staff, is_superuser, date_joined";

/// Inserts a user whose `password` is already hashed
pub async fn insert_user(pool: &Pool<Postgres>, user: &NewUser) -> Result<User, StoreError> {
    let row: User = sqlx::query_as(&format!(
        "
        INSERT INTO users (email, name, password, is_staff, is_superuser)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
    "
    ))
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password)
    .bind(user.is_staff)
    .bind(user.is_superuser)
    .fetch_one(pool)
    .await?;

    log::info!("Created user {} ({})", row.email, row.id);
    Ok(row)
}

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, StoreError> {
    let row: Option<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await?;

    Ok(row)
}

pub async fn update_user(
    pool: &Pool<Postgres>,
    user_id: Id,
    changes: &UserChanges,
) -> Result<Option<User>, StoreError> {
    let row: Option<User> = sqlx::query_as(&format!(
        "
        UPDATE users
        SET email = COALESCE($2, email),
            name = COALESCE($3, name),
            password = COALESCE($4, password)
        WHERE id = $1
        RETURNING {USER_COLUMNS}
    "
    ))
    .bind(user_id)
    .bind(changes.email.as_deref())
    .bind(changes.name.as_deref())
    .bind(changes.password.as_deref())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_user(pool: &Pool<Postgres>, user_id: Id) -> Result<bool, StoreError> {
    let query = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(query.rows_affected() > 0)
}
