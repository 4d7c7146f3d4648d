pub mod config;
pub mod orchestrator;
pub mod routes;
pub mod validation;
pub mod vendor;

pub use config::{AppConfig, RunMode};
pub use orchestrator::{Artifact, Detector};
pub use routes::configure_routes;
