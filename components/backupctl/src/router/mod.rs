pub mod commands;
pub mod router;
