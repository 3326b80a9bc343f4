//! 后台自动更新

pub mod transport;
pub mod updater;

pub use transport::{UpdateExeTransport, UpdateTransport, UPDATE_EXE_NAME};
pub use updater::{Updater, LAST_UPDATE_FILE_NAME};
