pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use errors::*;
pub use pipeline::AskResult;
pub use pipeline::AskStatus;
pub use pipeline::Orchestrator;
pub use session::SessionStore;
