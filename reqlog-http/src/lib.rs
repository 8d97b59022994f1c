pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{AppState, HttpServer, build_router};
