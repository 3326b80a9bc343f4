use crate::core::error::{InstallerError, InstallerResult};
use crate::services::installer::step::{InstallerStep, PathResolver};
use crate::utils::file_helpers::remove_file_if_exists;
use semver::Version;
use std::borrow::Cow;
use std::fs;

/// 嵌入到可执行文件中的文本资源
///
/// ```ignore
/// let resource = EmbeddedResource::new("config.default.toml", include_str!("../config.default.toml"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedResource {
    pub name: String,
    pub contents: Cow<'static, str>,
}

impl EmbeddedResource {
    pub fn new(name: impl Into<String>, contents: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// 将嵌入资源保存为文件的安装步骤
pub struct SaveResourceToFileStep {
    resource: EmbeddedResource,
    file: PathResolver,
    overwrite_on_update: bool,
}

impl SaveResourceToFileStep {
    pub fn new(resource: EmbeddedResource, file: PathResolver, overwrite_on_update: bool) -> Self {
        Self {
            resource,
            file,
            overwrite_on_update,
        }
    }

    fn save_resource(&self, overwrite: bool) -> InstallerResult<()> {
        let path = (self.file)();
        if path.exists() && !overwrite {
            tracing::debug!(resource = %self.resource.name, path = ?path, "文件已存在，保留现有内容");
            return Ok(());
        }

        fs::write(&path, self.resource.contents.as_bytes())
            .map_err(|e| InstallerError::io(&path, e))?;
        tracing::info!(resource = %self.resource.name, path = ?path, "已保存资源文件");
        Ok(())
    }
}

impl InstallerStep for SaveResourceToFileStep {
    fn on_initial_install(&self, _version: &Version) -> InstallerResult<()> {
        self.save_resource(true)
    }

    fn on_app_update(&self, _version: &Version) -> InstallerResult<()> {
        self.save_resource(self.overwrite_on_update)
    }

    fn on_app_uninstall(&self, _version: &Version) -> InstallerResult<()> {
        let path = (self.file)();
        remove_file_if_exists(&path).map_err(|e| InstallerError::io(&path, e))
    }
}
