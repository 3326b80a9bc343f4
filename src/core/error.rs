//! 统一错误类型定义
//!
//! 使用 `thiserror` 定义安装步骤与更新器的错误类型，内部后台任务仍使用 `anyhow`。

use std::path::PathBuf;
use thiserror::Error;

/// 安装步骤的统一错误类型
#[derive(Error, Debug)]
pub enum InstallerError {
    /// 构建器参数无效（空值、空白字符串等）
    #[error("参数 {name} 无效: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 用户环境变量读写失败
    #[error("环境变量操作失败: {0}")]
    Environment(String),

    /// 生命周期事件携带的版本号无法解析
    #[error("无效的版本号: {0}")]
    InvalidVersion(String),

    /// 安装步骤执行过程中发生 panic
    #[error("安装步骤 panic: {0}")]
    Panicked(String),

    /// 自定义步骤返回的其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 安装步骤结果类型
pub type InstallerResult<T> = std::result::Result<T, InstallerError>;

impl InstallerError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 空白参数错误
    pub fn blank(name: &'static str) -> Self {
        Self::InvalidArgument {
            name,
            reason: "Value must not be null or empty".to_string(),
        }
    }
}

/// 更新器错误类型
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// 更新器已经启动过，不允许重复启动
    #[error("更新器已启动，不能重复启动")]
    AlreadyStarted,

    /// 后台运行时创建失败
    #[error("创建后台运行时失败: {0}")]
    Runtime(#[source] std::io::Error),

    /// 更新配置文件无效
    #[error("更新配置无效: {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 更新器结果类型
pub type UpdaterResult<T> = std::result::Result<T, UpdaterError>;

impl UpdaterError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// 将错误及其全部嵌套原因展开为按换行连接的消息
pub fn flatten_causes(error: &anyhow::Error) -> String {
    error
        .chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_blank_argument_display() {
        let err = InstallerError::blank("command");
        assert!(err.to_string().contains("command"));
        assert!(err.to_string().contains("must not be null or empty"));
    }

    #[test]
    fn test_io_error_construction() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = InstallerError::io("/path/to/file", io_err);
        assert!(err.to_string().contains("/path/to/file"));
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: InstallerError = anyhow::anyhow!("custom step failed").into();
        assert!(matches!(err, InstallerError::Other(_)));
        assert_eq!(err.to_string(), "custom step failed");
    }

    #[test]
    fn test_flatten_causes_joins_chain() {
        let root: anyhow::Result<()> = Err(anyhow::anyhow!("connection refused"));
        let err = root
            .context("download failed")
            .context("update failed")
            .unwrap_err();

        assert_eq!(
            flatten_causes(&err),
            "update failed\ndownload failed\nconnection refused"
        );
    }

    #[test]
    fn test_already_started_display() {
        assert!(UpdaterError::AlreadyStarted.to_string().contains("重复启动"));
    }
}
