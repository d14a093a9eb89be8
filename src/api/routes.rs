use std::convert::Infallible;

use warp::{Filter, Reply};

use crate::{schema::AttributeKind, state::AppState};

use super::{attributes, error::handle_rejection, recipes, users};

/// The whole HTTP surface, with every rejection rendered as a JSON response.
pub fn api(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    users::routes(state.clone())
        .or(recipes::routes(state.clone()))
        .unify()
        .or(attributes::routes(AttributeKind::Tag, state.clone()))
        .unify()
        .or(attributes::routes(AttributeKind::Ingredient, state))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("recipes::api"))
}

#[cfg(test)]
pub mod testing {
    use std::sync::Arc;

    use serde_json::Value;
    use warp::http::StatusCode;

    use crate::{
        accounts::create_user, memory::MemoryStore, schema::User, state::AppState, store::Store,
        token::TokenSigner,
    };

    /// Drives the full filter tree against an in-memory store.
    pub struct TestApp {
        pub store: Arc<MemoryStore>,
        state: AppState,
    }

    impl TestApp {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let signer = TokenSigner::new("test-secret").unwrap();
            let state = AppState::new(store.clone(), signer);
            Self { store, state }
        }

        /// Registers a user with the default test password and returns a
        /// token for them.
        pub async fn user(&self, email: &str) -> (User, String) {
            let user = create_user(self.store.as_ref(), email, "testpass123", "Test Name")
                .await
                .unwrap();
            let token = self
                .state
                .signer
                .issue(self.store.as_ref(), &user)
                .await
                .unwrap();
            (user, token)
        }

        pub fn state(&self) -> AppState {
            self.state.clone()
        }

        pub async fn find_user(&self, email: &str) -> Option<User> {
            self.store.user_by_email(email).await.unwrap()
        }

        pub async fn send(
            &self,
            method: &str,
            path: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = warp::test::request().method(method).path(path);
            if let Some(token) = token {
                request = request.header("authorization", format!("Token {token}"));
            }
            if let Some(body) = body {
                request = request.json(&body);
            }

            let response = request.reply(&super::api(self.state())).await;
            let body = if response.body().is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(response.body()).unwrap()
            };
            (response.status(), body)
        }

        pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
            self.send("GET", path, token, None).await
        }

        pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
            self.send("DELETE", path, token, None).await
        }

        pub async fn post(
            &self,
            path: &str,
            token: Option<&str>,
            body: Value,
        ) -> (StatusCode, Value) {
            self.send("POST", path, token, Some(body)).await
        }

        pub async fn put(
            &self,
            path: &str,
            token: Option<&str>,
            body: Value,
        ) -> (StatusCode, Value) {
            self.send("PUT", path, token, Some(body)).await
        }

        pub async fn patch(
            &self,
            path: &str,
            token: Option<&str>,
            body: Value,
        ) -> (StatusCode, Value) {
            self.send("PATCH", path, token, Some(body)).await
        }
    }
}
