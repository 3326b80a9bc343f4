//! 控制台示例程序
//!
//! 处理部署程序传入的安装事件后，按可执行文件旁的 `update.toml` 执行一次后台更新检查。
//! 传入 `--verbose` 时输出调试日志。

use installkit::{
    init_logger, update_log_level, AppLocation, InstallerBuilder, LogConfig, LogLevel,
    UpdateOptions, Updater, UpdaterStatus,
};
use std::path::Path;

const UPDATE_CONFIG_FILE_NAME: &str = "update.toml";
const VERBOSE_FLAG: &str = "--verbose";

fn main() -> anyhow::Result<()> {
    init_logger(&LogConfig::default())?;
    if std::env::args().skip(1).any(|arg| arg == VERBOSE_FLAG) {
        update_log_level(LogLevel::Debug)?;
    }

    let app = AppLocation::current()?;
    InstallerBuilder::console_application(app.clone())?
        .build()
        .handle_installation_events();

    let options = load_update_options(&app.executable_dir().join(UPDATE_CONFIG_FILE_NAME));
    let mut updater = Updater::new(options)?;
    updater.start()?;

    println!("Hello from {}!", app.application_name());

    updater.wait_for_completion();
    match updater.status() {
        UpdaterStatus::Failed => {
            tracing::warn!(error = ?updater.error(), "自动更新失败");
        }
        status => tracing::info!(status = ?status, "自动更新结束"),
    }
    Ok(())
}

/// 读取更新配置，文件不存在或无效时使用默认配置（不更新）
fn load_update_options(path: &Path) -> UpdateOptions {
    if !path.is_file() {
        tracing::debug!(path = ?path, "未找到更新配置");
        return UpdateOptions::default();
    }

    UpdateOptions::load(path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "加载更新配置失败，已禁用自动更新");
        UpdateOptions::default()
    })
}
