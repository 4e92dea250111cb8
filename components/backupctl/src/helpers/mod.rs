pub mod build_info;
pub mod converters;
pub mod errors;
pub mod load_config;
pub mod shutdown;
