pub mod customer;
pub mod refresh_token;
pub mod role;
pub mod user;
