pub mod auth_services;
pub mod identity;
