pub mod jwt;
pub mod order;
pub mod refresh_token;
pub mod user;
