use crate::core::error::{UpdaterError, UpdaterResult};
use crate::utils::env_expand::expand_environment_variables;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 默认检查间隔：1 小时
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// 更新源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSource {
    /// 未配置
    #[default]
    #[serde(alias = "none")]
    NotConfigured,
    /// GitHub Releases
    GitHub,
    /// 本地文件系统或网络共享目录
    FileSystem,
}

/// 更新器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UpdaterStatus {
    /// 尚未启动
    #[default]
    Initialized,
    /// 正在运行
    Running,
    /// 已完成（包括被跳过的检查）
    Completed,
    /// 失败
    Failed,
}

/// 更新选项
///
/// `path` 在赋值时展开 `%VAR%` 环境变量：
/// - `FileSystem` 时为存放发布包的目录
/// - `GitHub` 时为仓库地址（如 `https://github.com/owner/repo`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    pub enable: bool,
    pub source: UpdateSource,
    path: String,
    pub install_prerelease_versions: bool,
    pub interval: Duration,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            enable: false,
            source: UpdateSource::NotConfigured,
            path: String::new(),
            install_prerelease_versions: false,
            interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

impl UpdateOptions {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 设置更新路径（立即展开环境变量）
    pub fn set_path(&mut self, path: impl AsRef<str>) {
        self.path = expand_environment_variables(path.as_ref());
    }

    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.set_path(path);
        self
    }

    /// 从配置文件加载（按扩展名识别 `.json` / `.toml`）
    pub fn load(path: &Path) -> UpdaterResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| UpdaterError::io(path.to_path_buf(), e))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let raw: UpdateOptionsFile = match extension.as_deref() {
            Some("json") => serde_json::from_str(&content).map_err(|e| UpdaterError::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?,
            Some("toml") => toml::from_str(&content).map_err(|e| UpdaterError::Config {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?,
            _ => {
                return Err(UpdaterError::Config {
                    path: path.to_path_buf(),
                    reason: "不支持的配置文件格式（仅支持 .json / .toml）".to_string(),
                })
            }
        };

        tracing::debug!(path = ?path, "已加载更新配置");
        Ok(raw.into())
    }
}

/// 配置文件中的更新选项
#[derive(Debug, Deserialize)]
#[serde(default)]
struct UpdateOptionsFile {
    enable: bool,
    source: UpdateSource,
    path: String,
    install_prerelease_versions: bool,
    interval_secs: u64,
}

impl Default for UpdateOptionsFile {
    fn default() -> Self {
        Self {
            enable: false,
            source: UpdateSource::NotConfigured,
            path: String::new(),
            install_prerelease_versions: false,
            interval_secs: DEFAULT_UPDATE_INTERVAL.as_secs(),
        }
    }
}

impl From<UpdateOptionsFile> for UpdateOptions {
    fn from(raw: UpdateOptionsFile) -> Self {
        UpdateOptions {
            enable: raw.enable,
            source: raw.source,
            path: String::new(),
            install_prerelease_versions: raw.install_prerelease_versions,
            interval: Duration::from_secs(raw.interval_secs),
        }
        .with_path(raw.path)
    }
}
