use std::{convert::Infallible, sync::Arc};

use warp::Filter;

use crate::{store::Store, token::TokenSigner};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub signer: TokenSigner,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, signer: TokenSigner) -> Self {
        Self { store, signer }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
