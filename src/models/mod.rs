pub mod config;
pub mod update;

pub use config::*;
pub use update::*;
