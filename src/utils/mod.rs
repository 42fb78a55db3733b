pub mod cart_id;
pub mod jwt;
