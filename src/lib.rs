// lib.rs - 安装事件处理与后台自动更新

pub mod core;
pub mod http_client;
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;
pub use services::installer::steps::{
    AddDirectoryToPathStep, CompositeStep, CreateBatchFileStep, EmbeddedResource,
    ExceptionCallbackStep, InstallationFlagFileStep, SaveResourceToFileStep,
};
pub use services::installer::{
    EventOutcome, Installer, InstallerBuilder, InstallerStep, LifecycleEvent, PathResolver,
};
pub use services::update::{UpdateExeTransport, UpdateTransport, Updater};
pub use utils::app_info::{AppLocation, SpecialDirectory};
pub use utils::environment::{EnvironmentStore, MemoryEnvironment, UserEnvironment};

// 重新导出常用类型
pub use anyhow::{Context, Result};

pub use crate::core::{
    flatten_causes, init_logger, update_log_level, InstallerError, InstallerResult,
    UpdaterError, UpdaterResult,
};
