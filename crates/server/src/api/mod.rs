pub mod export;
pub mod handlers;
pub mod items;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod runs;
pub mod selection;
pub mod system;
pub mod ws;

pub use routes::{create_router, ARTIFACT_URL};
