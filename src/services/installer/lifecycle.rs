//! 部署程序传给应用的生命周期事件参数
//!
//! `Update.exe` 在安装、更新、卸载时以特定参数启动应用：
//! `--squirrel-install 1.0.0`、`--squirrel-updated 1.1.0`、`--squirrel-obsolete 1.0.0`、
//! `--squirrel-uninstall 1.1.0`，首次启动时传入 `--squirrel-firstrun`。

use crate::core::error::{InstallerError, InstallerResult};
use semver::Version;

/// 生命周期事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Install(Version),
    Updated(Version),
    /// 旧版本被新版本替代
    Obsolete(Version),
    Uninstall(Version),
    FirstRun,
}

/// 事件处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// 已处理安装类事件，进程应立即退出
    Handled,
    /// 已执行首次运行回调，应用继续正常启动
    FirstRun,
    /// 参数不是生命周期事件
    NotHandled,
}

impl LifecycleEvent {
    /// 从命令行参数（不含程序名）解析事件
    pub fn parse<I, S>(args: I) -> InstallerResult<Option<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        let Some(flag) = args.next() else {
            return Ok(None);
        };

        let constructor: fn(Version) -> LifecycleEvent = match flag.as_ref() {
            "--squirrel-firstrun" => return Ok(Some(LifecycleEvent::FirstRun)),
            "--squirrel-install" => LifecycleEvent::Install,
            "--squirrel-updated" => LifecycleEvent::Updated,
            "--squirrel-obsolete" => LifecycleEvent::Obsolete,
            "--squirrel-uninstall" => LifecycleEvent::Uninstall,
            _ => return Ok(None),
        };

        let version = args
            .next()
            .ok_or_else(|| InstallerError::InvalidVersion(format!("{} 缺少版本号", flag.as_ref())))?;
        Ok(Some(constructor(parse_version(version.as_ref())?)))
    }
}

/// 宽松解析版本号：允许 `1`、`1.2` 这类省略补丁号的写法
pub fn parse_version(value: &str) -> InstallerResult<Version> {
    let value = value.trim();
    if let Ok(version) = Version::parse(value) {
        return Ok(version);
    }

    let parts: Vec<&str> = value.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(InstallerError::InvalidVersion(value.to_string()));
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| InstallerError::InvalidVersion(value.to_string()))?;
    }
    Ok(Version::new(numbers[0], numbers[1], numbers[2]))
}
