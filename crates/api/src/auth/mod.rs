//! Authentication for the administrative API

pub mod admin_token;

pub use admin_token::require_admin;
