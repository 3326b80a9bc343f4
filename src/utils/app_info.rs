//! 应用程序位置信息
//!
//! Squirrel 安装布局：`%LOCALAPPDATA%\<应用名>\app-<版本>\<可执行文件>`，
//! 可执行文件旁的 `IsInstalled` 标记文件表示当前运行于安装环境中。

use crate::core::error::{InstallerError, InstallerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 安装标记文件名
pub const INSTALLATION_FLAG_FILE_NAME: &str = "IsInstalled";

/// 常用目录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialDirectory {
    /// 应用根目录
    ///
    /// 安装环境下为 `%LOCALAPPDATA%\<应用名>`，否则为可执行文件所在目录
    ApplicationRootDirectory,
    /// 当前版本根目录（可执行文件所在目录）
    CurrentVersionRootDirectory,
}

/// 应用程序位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLocation {
    executable: PathBuf,
}

impl AppLocation {
    /// 当前进程的可执行文件位置
    pub fn current() -> InstallerResult<Self> {
        let executable = std::env::current_exe()
            .map_err(|e| InstallerError::io("<current executable>", e))?;
        Ok(Self { executable })
    }

    pub fn from_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// 应用名称（可执行文件名去掉扩展名）
    pub fn application_name(&self) -> String {
        self.executable
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn executable_dir(&self) -> PathBuf {
        self.executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    pub fn installation_flag_path(&self) -> PathBuf {
        self.executable_dir().join(INSTALLATION_FLAG_FILE_NAME)
    }

    /// 是否运行于安装环境
    ///
    /// 每次调用都会检查标记文件；安装流程中标记步骤执行前返回 false。
    pub fn is_installed(&self) -> bool {
        self.installation_flag_path().is_file()
    }

    pub fn directory(&self, directory: SpecialDirectory) -> PathBuf {
        let executable_dir = self.executable_dir();
        match directory {
            SpecialDirectory::ApplicationRootDirectory if self.is_installed() => executable_dir
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or(executable_dir),
            SpecialDirectory::ApplicationRootDirectory
            | SpecialDirectory::CurrentVersionRootDirectory => executable_dir,
        }
    }
}
