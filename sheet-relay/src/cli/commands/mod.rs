pub mod auth;
pub mod serve;

pub use auth::AuthCommands;
pub use serve::ServeArgs;
