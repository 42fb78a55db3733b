pub mod auth;
pub mod cart;
pub mod rate_limit;
