use crate::core::error::{InstallerError, InstallerResult};
use crate::services::installer::step::InstallerStep;
use crate::utils::app_info::AppLocation;
use crate::utils::file_helpers::remove_file_if_exists;
use semver::Version;
use std::fs;

/// 在可执行文件旁写入 `IsInstalled` 标记文件
///
/// 其他步骤通过 [`AppLocation::is_installed`] 解析目录，因此该步骤必须排在第一位。
pub struct InstallationFlagFileStep {
    app: AppLocation,
}

impl InstallationFlagFileStep {
    pub fn new(app: AppLocation) -> Self {
        Self { app }
    }

    fn create_flag_file(&self) -> InstallerResult<()> {
        let path = self.app.installation_flag_path();
        fs::write(&path, "").map_err(|e| InstallerError::io(&path, e))
    }
}

impl InstallerStep for InstallationFlagFileStep {
    fn on_initial_install(&self, _version: &Version) -> InstallerResult<()> {
        self.create_flag_file()
    }

    fn on_app_update(&self, _version: &Version) -> InstallerResult<()> {
        self.create_flag_file()
    }

    fn on_app_uninstall(&self, _version: &Version) -> InstallerResult<()> {
        let path = self.app.installation_flag_path();
        remove_file_if_exists(&path).map_err(|e| InstallerError::io(&path, e))
    }
}
