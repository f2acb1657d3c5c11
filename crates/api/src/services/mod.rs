//! Business services built on the repositories.

pub mod audit;
pub mod auth;
pub mod cart;
pub mod mail;
pub mod push;
pub mod tokens;
