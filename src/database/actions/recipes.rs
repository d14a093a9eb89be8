use std::collections::HashMap;

use crate::{
    error::StoreError,
    schema::{
        Attribute, AttributeKind, Id, LinkedAttribute, Recipe, RecipeChanges, RecipeDraft,
        RecipeFilter,
    },
    store::unique_names,
};

use sqlx::{PgConnection, Pool, Postgres};

const KINDS: [AttributeKind; 2] = [AttributeKind::Tag, AttributeKind::Ingredient];

const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price, description, link";

pub async fn list_recipes(
    pool: &Pool<Postgres>,
    owner: Id,
    filter: &RecipeFilter,
) -> Result<Vec<Recipe>, StoreError> {
    let mut conn = pool.acquire().await?;

    let mut rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT r.id, r.user_id, r.title, r.time_minutes, r.price, r.description, r.link
        FROM recipes r
        WHERE r.user_id = $1
        AND ($2::INTEGER[] IS NULL OR EXISTS (
            SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)
        ))
        AND ($3::INTEGER[] IS NULL OR EXISTS (
            SELECT 1 FROM recipe_ingredients ri WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)
        ))
        ORDER BY r.id DESC
    ",
    )
    .bind(owner)
    .bind(filter.tags.clone())
    .bind(filter.ingredients.clone())
    .fetch_all(&mut *conn)
    .await?;

    load_attributes(&mut conn, &mut rows).await?;

    Ok(rows)
}

pub async fn get_recipe(
    pool: &Pool<Postgres>,
    owner: Id,
    recipe_id: Id,
) -> Result<Option<Recipe>, StoreError> {
    let mut conn = pool.acquire().await?;

    let row: Option<Recipe> = sqlx::query_as(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = $1 AND id = $2"
    ))
    .bind(owner)
    .bind(recipe_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(mut recipe) = row else {
        return Ok(None);
    };
    load_attributes(&mut conn, std::slice::from_mut(&mut recipe)).await?;

    Ok(Some(recipe))
}

pub async fn create_recipe(
    pool: &Pool<Postgres>,
    owner: Id,
    draft: &RecipeDraft,
) -> Result<Recipe, StoreError> {
    let mut tx = pool.begin().await?;

    let mut recipe: Recipe = sqlx::query_as(&format!(
        "
        INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {RECIPE_COLUMNS}
    "
    ))
    .bind(owner)
    .bind(&draft.title)
    .bind(draft.time_minutes)
    .bind(draft.price)
    .bind(&draft.description)
    .bind(&draft.link)
    .fetch_one(&mut *tx)
    .await?;

    for kind in KINDS {
        link_attributes(&mut tx, kind, owner, recipe.id, draft.names(kind)).await?;
    }
    load_attributes(&mut tx, std::slice::from_mut(&mut recipe)).await?;

    tx.commit().await?;

    log::debug!("User {owner} created recipe {}", recipe.id);
    Ok(recipe)
}

pub async fn update_recipe(
    pool: &Pool<Postgres>,
    owner: Id,
    recipe_id: Id,
    changes: &RecipeChanges,
) -> Result<Option<Recipe>, StoreError> {
    let mut tx = pool.begin().await?;

    let row: Option<Recipe> = sqlx::query_as(&format!(
        "
        UPDATE recipes
        SET title = COALESCE($3, title),
            time_minutes = COALESCE($4, time_minutes),
            price = COALESCE($5, price),
            description = COALESCE($6, description),
            link = COALESCE($7, link)
        WHERE user_id = $1 AND id = $2
        RETURNING {RECIPE_COLUMNS}
    "
    ))
    .bind(owner)
    .bind(recipe_id)
    .bind(changes.title.as_deref())
    .bind(changes.time_minutes)
    .bind(changes.price)
    .bind(changes.description.as_deref())
    .bind(changes.link.as_deref())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(mut recipe) = row else {
        return Ok(None);
    };

    for kind in KINDS {
        if let Some(names) = changes.names(kind) {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE recipe_id = $1",
                kind.link_table()
            ))
            .bind(recipe.id)
            .execute(&mut *tx)
            .await?;

            link_attributes(&mut tx, kind, owner, recipe.id, names).await?;
        }
    }
    load_attributes(&mut tx, std::slice::from_mut(&mut recipe)).await?;

    tx.commit().await?;

    Ok(Some(recipe))
}

pub async fn delete_recipe(
    pool: &Pool<Postgres>,
    owner: Id,
    recipe_id: Id,
) -> Result<bool, StoreError> {
    let query = sqlx::query("DELETE FROM recipes WHERE user_id = $1 AND id = $2")
        .bind(owner)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    Ok(query.rows_affected() > 0)
}

/// Get-or-creates each named attribute for `owner` and links it to the recipe.
async fn link_attributes(
    conn: &mut PgConnection,
    kind: AttributeKind,
    owner: Id,
    recipe_id: Id,
    names: &[String],
) -> Result<(), StoreError> {
    for name in unique_names(names) {
        let attribute: (Id,) = sqlx::query_as(&format!(
            "
            INSERT INTO {} (user_id, name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
        ",
            kind.table()
        ))
        .bind(owner)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.link_table(),
            kind.link_column()
        ))
        .bind(recipe_id)
        .bind(attribute.0)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn load_attributes(conn: &mut PgConnection, recipes: &mut [Recipe]) -> Result<(), StoreError> {
    if recipes.is_empty() {
        return Ok(());
    }
    let recipe_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();

    for kind in KINDS {
        let rows: Vec<LinkedAttribute> = sqlx::query_as(&format!(
            "
            SELECT l.recipe_id AS recipe_id, a.id AS id, a.name AS name
            FROM {} l
            INNER JOIN {} a ON a.id = l.{}
            WHERE l.recipe_id = ANY($1)
            ORDER BY a.id
        ",
            kind.link_table(),
            kind.table(),
            kind.link_column()
        ))
        .bind(&recipe_ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut grouped: HashMap<Id, Vec<Attribute>> = HashMap::new();
        rows.into_iter()
            .for_each(|row| grouped.entry(row.recipe_id).or_default().push(row.into()));

        for recipe in recipes.iter_mut() {
            *recipe.attributes_mut(kind) = grouped.remove(&recipe.id).unwrap_or_default();
        }
    }

    Ok(())
}
