pub mod auth;
pub mod parse;
pub mod repository;

pub use auth::{build_auth_env, AuthEnv};
pub use repository::GitRepository;
