pub mod collector;
pub mod models;
