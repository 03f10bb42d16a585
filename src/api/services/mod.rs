pub mod auth;
pub mod health;
pub mod redirect;

pub use auth::{AuthService, auth_routes};
pub use health::{HealthService, health_routes};
pub use redirect::{ClickOutcome, Redirect, RedirectService, redirect_routes};
