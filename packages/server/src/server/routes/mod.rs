mod health;
mod interactions;

pub use health::health_handler;
pub use interactions::interactions_handler;
