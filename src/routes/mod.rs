mod auth;
mod health_check;

pub use auth::{account, login, logout, refresh, register};
pub use health_check::health_check;
