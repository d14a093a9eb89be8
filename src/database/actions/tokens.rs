use crate::{
    error::StoreError,
    schema::{Id, User},
};

use sqlx::{Pool, Postgres};

pub async fn replace_token(
    pool: &Pool<Postgres>,
    user_id: Id,
    digest: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        "
        INSERT INTO auth_tokens (user_id, digest)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE
        SET digest = EXCLUDED.digest, created = NOW();
    ",
    )
    .bind(user_id)
    .bind(digest)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_token_user(pool: &Pool<Postgres>, digest: &str) -> Result<Option<User>, StoreError> {
    let row: Option<User> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.name, u.password, u.is_active, u.is_staff, u.is_superuser, u.date_joined
        FROM auth_tokens t
        INNER JOIN users u ON u.id = t.user_id
        WHERE t.digest = $1
    ",
    )
    .bind(digest)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
