pub mod annotate;
pub mod config;
pub mod constants;
pub mod logging;
pub mod pipeline;
pub mod source;
