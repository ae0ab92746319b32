pub mod arguments;
pub mod catalog;
pub mod config;
pub mod error;
pub mod launch;
pub mod usage;
