pub mod api;
pub mod cli;
pub mod core;
pub mod format;
pub mod insights;
pub mod state;
