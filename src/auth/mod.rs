pub mod middleware;
pub mod password;
pub mod principal;
pub mod session;
pub mod validate;
