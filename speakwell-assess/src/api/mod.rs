//! HTTP API handlers for speakwell-assess

pub mod assess;
pub mod health;
pub mod level;

pub use assess::assess_routes;
pub use health::health_routes;
pub use level::level_routes;
