pub mod config;
pub mod generate;
pub mod health;
pub mod validate;
