mod auth;
mod health_check;
mod password;

pub use auth::{get_current_user, login, logout, refresh};
pub use health_check::health_check;
pub use password::{forgot_password, reset_password};
