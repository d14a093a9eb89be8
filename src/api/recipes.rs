use std::collections::HashMap;

use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reply::{self, Reply, Response},
    Filter,
};

use crate::{
    constants::MAX_CHAR_LENGTH,
    form::{Form, FormData, Text},
    middleware::with_auth,
    schema::{Id, RecipeChanges, RecipeDraft, RecipeFilter, RecipeSummary, User},
    state::{with_state, AppState},
};

use super::{
    error::ApiError,
    extract::{form_body, id_list, incomplete, respond},
};

type Query = HashMap<String, String>;

/// Reads every recipe field from `form`. Absent optional fields come back
/// as `None` and are defaulted by the caller.
fn read_recipe(form: &mut Form) -> RecipeChanges {
    RecipeChanges {
        title: form.text("title", Text::required().max(MAX_CHAR_LENGTH)),
        time_minutes: form.integer("time_minutes", true),
        price: form.decimal("price", true),
        description: form.text("description", Text::optional()),
        link: form.text("link", Text::optional().max(MAX_CHAR_LENGTH)),
        tags: form.named_list("tags"),
        ingredients: form.named_list("ingredients"),
    }
}

async fn list_recipes(user: User, query: Query, state: AppState) -> Result<Response, ApiError> {
    let filter = RecipeFilter {
        tags: id_list("tags", query.get("tags"))?,
        ingredients: id_list("ingredients", query.get("ingredients"))?,
    };

    let recipes = state.store.list_recipes(user.id, &filter).await?;
    let summaries: Vec<RecipeSummary> = recipes.iter().map(RecipeSummary::from).collect();
    Ok(reply::json(&summaries).into_response())
}

async fn create_recipe(user: User, data: FormData, state: AppState) -> Result<Response, ApiError> {
    let mut form = Form::from_data(data);
    let fields = read_recipe(&mut form);
    form.finish()?;

    let RecipeChanges {
        title: Some(title),
        time_minutes: Some(time_minutes),
        price: Some(price),
        description,
        link,
        tags,
        ingredients,
    } = fields
    else {
        return Err(incomplete());
    };
    let draft = RecipeDraft {
        title,
        time_minutes,
        price,
        description: description.unwrap_or_default(),
        link: link.unwrap_or_default(),
        tags: tags.unwrap_or_default(),
        ingredients: ingredients.unwrap_or_default(),
    };

    let recipe = state.store.create_recipe(user.id, draft).await?;
    log::info!("User {} created recipe {}", user.id, recipe.id);
    Ok(reply::with_status(reply::json(&recipe), StatusCode::CREATED).into_response())
}

async fn recipe_detail(user: User, id: Id, state: AppState) -> Result<Response, ApiError> {
    let recipe = state
        .store
        .get_recipe(user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(reply::json(&recipe).into_response())
}

async fn update_recipe(
    partial: bool,
    user: User,
    id: Id,
    data: FormData,
    state: AppState,
) -> Result<Response, ApiError> {
    if state.store.get_recipe(user.id, id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let mut form = if partial {
        Form::partial(data)
    } else {
        Form::from_data(data)
    };
    let changes = read_recipe(&mut form);
    form.finish()?;

    let recipe = state
        .store
        .update_recipe(user.id, id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(reply::json(&recipe).into_response())
}

async fn delete_recipe(user: User, id: Id, state: AppState) -> Result<Response, ApiError> {
    if !state.store.delete_recipe(user.id, id).await? {
        return Err(ApiError::NotFound);
    }

    log::info!("User {} deleted recipe {id}", user.id);
    Ok(reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response())
}

pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    let list_path = warp::path!("api" / "recipe" / "recipes");
    let detail_path = warp::path!("api" / "recipe" / "recipes" / Id);

    let list = list_path
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(warp::query::<Query>())
        .and(with_state(state.clone()))
        .and_then(|user: User, query: Query, state: AppState| {
            respond(list_recipes(user, query, state))
        });
    let create = list_path
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(|user: User, data: FormData, state: AppState| {
            respond(create_recipe(user, data, state))
        });

    let detail = detail_path
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(|id: Id, user: User, state: AppState| respond(recipe_detail(user, id, state)));
    let put = detail_path
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(|id: Id, user: User, data: FormData, state: AppState| {
            respond(update_recipe(false, user, id, data, state))
        });
    let patch = detail_path
        .and(warp::patch())
        .and(with_auth(state.clone()))
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(|id: Id, user: User, data: FormData, state: AppState| {
            respond(update_recipe(true, user, id, data, state))
        });
    let delete = detail_path
        .and(warp::delete())
        .and(with_auth(state.clone()))
        .and(with_state(state))
        .and_then(|id: Id, user: User, state: AppState| respond(delete_recipe(user, id, state)));

    list.or(create)
        .unify()
        .or(detail)
        .unify()
        .or(put)
        .unify()
        .or(patch)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}
