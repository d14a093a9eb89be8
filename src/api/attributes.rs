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
    schema::{AttributeKind, Id, User},
    state::{with_state, AppState},
};

use super::{
    error::ApiError,
    extract::{flag, form_body, respond},
};

type Query = HashMap<String, String>;

async fn list_attributes(
    kind: AttributeKind,
    user: User,
    query: Query,
    state: AppState,
) -> Result<Response, ApiError> {
    let assigned_only = flag("assigned_only", query.get("assigned_only"))?;

    let list = state
        .store
        .list_attributes(kind, user.id, assigned_only)
        .await?;
    Ok(reply::json(&list).into_response())
}

async fn rename_attribute(
    kind: AttributeKind,
    partial: bool,
    user: User,
    id: Id,
    data: FormData,
    state: AppState,
) -> Result<Response, ApiError> {
    let current = state
        .store
        .get_attribute(kind, user.id, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let mut form = if partial {
        Form::partial(data)
    } else {
        Form::from_data(data)
    };
    let name = form.text("name", Text::required().max(MAX_CHAR_LENGTH));
    form.finish()?;

    let Some(name) = name else {
        return Ok(reply::json(&current).into_response());
    };
    let renamed = state
        .store
        .rename_attribute(kind, user.id, id, &name)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(reply::json(&renamed).into_response())
}

async fn delete_attribute(
    kind: AttributeKind,
    user: User,
    id: Id,
    state: AppState,
) -> Result<Response, ApiError> {
    if !state.store.delete_attribute(kind, user.id, id).await? {
        return Err(ApiError::NotFound);
    }
    Ok(reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response())
}

/// Routes for one attribute collection. Rows are only listed, renamed and
/// deleted here; they are created through recipe writes.
pub fn routes(kind: AttributeKind, state: AppState) -> BoxedFilter<(Response,)> {
    let base = warp::path("api")
        .and(warp::path("recipe"))
        .and(warp::path(kind.table()));
    let list_path = base.and(warp::path::end());
    let detail_path = base.and(warp::path::param::<Id>()).and(warp::path::end());

    let list = list_path
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(warp::query::<Query>())
        .and(with_state(state.clone()))
        .and_then(move |user: User, query: Query, state: AppState| {
            respond(list_attributes(kind, user, query, state))
        });
    let put = detail_path
        .and(warp::put())
        .and(with_auth(state.clone()))
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(move |id: Id, user: User, data: FormData, state: AppState| {
            respond(rename_attribute(kind, false, user, id, data, state))
        });
    let patch = detail_path
        .and(warp::patch())
        .and(with_auth(state.clone()))
        .and(form_body())
        .and(with_state(state.clone()))
        .and_then(move |id: Id, user: User, data: FormData, state: AppState| {
            respond(rename_attribute(kind, true, user, id, data, state))
        });
    let delete = detail_path
        .and(warp::delete())
        .and(with_auth(state.clone()))
        .and(with_state(state))
        .and_then(move |id: Id, user: User, state: AppState| {
            respond(delete_attribute(kind, user, id, state))
        });

    list.or(put)
        .unify()
        .or(patch)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}
