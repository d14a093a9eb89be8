use crate::{
    error::StoreError,
    schema::{Attribute, AttributeKind, Id},
};

use sqlx::{Pool, Postgres};

pub async fn list_attributes(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    owner: Id,
    assigned_only: bool,
) -> Result<Vec<Attribute>, StoreError> {
    let list: Vec<Attribute> = sqlx::query_as(&format!(
        "
        SELECT a.id, a.name
        FROM {} a
        WHERE a.user_id = $1
        AND (NOT $2 OR EXISTS (SELECT 1 FROM {} l WHERE l.{} = a.id))
        ORDER BY a.name DESC
    ",
        kind.table(),
        kind.link_table(),
        kind.link_column()
    ))
    .bind(owner)
    .bind(assigned_only)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

pub async fn get_attribute(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    owner: Id,
    attribute_id: Id,
) -> Result<Option<Attribute>, StoreError> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "SELECT id, name FROM {} WHERE user_id = $1 AND id = $2",
        kind.table()
    ))
    .bind(owner)
    .bind(attribute_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn rename_attribute(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    owner: Id,
    attribute_id: Id,
    name: &str,
) -> Result<Option<Attribute>, StoreError> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "UPDATE {} SET name = $3 WHERE user_id = $1 AND id = $2 RETURNING id, name",
        kind.table()
    ))
    .bind(owner)
    .bind(attribute_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_attribute(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    owner: Id,
    attribute_id: Id,
) -> Result<bool, StoreError> {
    let query = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND id = $2",
        kind.table()
    ))
    .bind(owner)
    .bind(attribute_id)
    .execute(pool)
    .await?;

    if query.rows_affected() > 0 {
        log::debug!("User {owner} deleted {} {attribute_id}", kind.entity());
    }

    Ok(query.rows_affected() > 0)
}
