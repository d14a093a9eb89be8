use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::{
    api::error::ApiError,
    schema::User,
    state::{with_state, AppState},
};

/// Resolves the `Authorization` header to an active user or rejects with a
/// 401 carrying the reason.
pub fn with_auth(state: AppState) -> impl Filter<Extract = (User,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: AppState| async move {
            state
                .signer
                .authenticate(state.store.as_ref(), header.as_deref())
                .await
                .map_err(|e| reject::custom(ApiError::from(e)))
        })
}
