mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    #[cfg(test)]
    pub mod memory;
    pub mod schema;
    pub mod store;
    pub mod wait;
}
mod authentication {
    pub mod accounts;
    pub mod cryptography;
    pub mod middleware;
    pub mod token;
}
mod api {
    pub mod attributes;
    pub mod error;
    pub mod extract;
    pub mod recipes;
    pub mod routes;
    pub mod users;
}
pub mod config;
mod constants;
mod server;
mod state;

pub use api::routes::api;
pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use server::serve;
pub use state::AppState;
