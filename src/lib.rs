pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod workers;

pub use config::TutorConfig;
pub use engine::TutorEngine;
