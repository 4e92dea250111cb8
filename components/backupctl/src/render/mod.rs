pub mod renderer;
pub mod templates;
