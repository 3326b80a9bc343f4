// 核心基础设施层
//
// - error: 统一错误类型
// - logger: 日志系统

pub mod error;
pub mod logger;

pub use error::{
    flatten_causes, InstallerError, InstallerResult, UpdaterError, UpdaterResult,
};
pub use logger::{init_logger, update_log_level};
