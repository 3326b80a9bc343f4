use crate::core::error::{InstallerError, InstallerResult};
use crate::services::installer::step::{InstallerStep, PathResolver};
use crate::utils::file_helpers::remove_file_if_exists;
use semver::Version;
use std::fs;

/// 创建启动批处理文件的安装步骤
pub struct CreateBatchFileStep {
    file: PathResolver,
    command: String,
}

impl CreateBatchFileStep {
    pub fn new(file: PathResolver, command: impl Into<String>) -> Self {
        Self {
            file,
            command: command.into(),
        }
    }

    fn create_batch_file(&self) -> InstallerResult<()> {
        let path = (self.file)();
        fs::write(&path, batch_file_contents(&self.command))
            .map_err(|e| InstallerError::io(&path, e))?;
        tracing::info!(path = ?path, "已生成启动脚本");
        Ok(())
    }

    fn remove_batch_file(&self) -> InstallerResult<()> {
        let path = (self.file)();
        remove_file_if_exists(&path).map_err(|e| InstallerError::io(&path, e))
    }
}

impl InstallerStep for CreateBatchFileStep {
    fn on_initial_install(&self, _version: &Version) -> InstallerResult<()> {
        self.create_batch_file()
    }

    fn on_app_update(&self, _version: &Version) -> InstallerResult<()> {
        self.create_batch_file()
    }

    fn on_app_uninstall(&self, _version: &Version) -> InstallerResult<()> {
        self.remove_batch_file()
    }
}

/// 关闭回显并把所有参数转发给命令
pub fn batch_file_contents(command: &str) -> String {
    format!("@ECHO OFF\r\n\"{command}\" %*\r\n")
}
