pub mod auth_dtos;
pub mod draft_dtos;
pub mod post_dtos;
// short alias used by the handlers: `crate::dtos::auth`
pub use auth_dtos as auth;
