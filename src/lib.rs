#![doc = "The `planner` library crate."]
#![doc = ""]
#![doc = "A personal task service: users register and log in with a password, then manage"]
#![doc = "their own dated, categorized tasks through a bearer-token protected JSON API."]
#![doc = "The binary (`main.rs`) wires these modules into an actix-web server backed by Postgres;"]
#![doc = "tests wire the same routes to the in-memory repository."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;

pub use crate::config::Config;
pub use crate::error::AppError;
pub use crate::state::AppState;
