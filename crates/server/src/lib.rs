pub mod app;
pub mod errors;
pub mod models;
pub mod rpc;

pub use app::{create_app, AppState};
