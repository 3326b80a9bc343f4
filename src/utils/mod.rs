pub mod app_info;
pub mod env_expand;
pub mod environment;
pub mod file_helpers;

pub use app_info::*;
pub use env_expand::*;
pub use environment::*;
pub use file_helpers::*;
