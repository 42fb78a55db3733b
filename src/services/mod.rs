pub mod auth_service;
pub mod cookie_service;
pub mod jwt_service;
pub mod password;
pub mod refresh_token_store;
pub mod tracking_service;
