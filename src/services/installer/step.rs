use crate::core::error::InstallerResult;
use semver::Version;
use std::path::PathBuf;
use std::sync::Arc;

/// 安装步骤接口
///
/// 安装、更新、卸载时分别调用对应方法，参数为触发事件的应用版本。
pub trait InstallerStep: Send + Sync {
    /// 首次安装
    fn on_initial_install(&self, version: &Version) -> InstallerResult<()>;

    /// 应用更新
    fn on_app_update(&self, version: &Version) -> InstallerResult<()>;

    /// 卸载
    fn on_app_uninstall(&self, version: &Version) -> InstallerResult<()>;

    /// 步骤名称（用于日志）
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("InstallerStep")
    }
}

/// 延迟解析的路径（每次执行步骤时重新计算）
pub type PathResolver = Arc<dyn Fn() -> PathBuf + Send + Sync>;

/// 固定路径的解析器
pub fn fixed_path(path: impl Into<PathBuf>) -> PathResolver {
    let path = path.into();
    Arc::new(move || path.clone())
}
