pub mod auth;
pub mod error;
pub mod extract;
pub mod health;
pub mod lookup;
pub mod pet;
pub mod term;
pub mod user;
