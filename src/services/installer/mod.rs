//! 安装事件处理
//!
//! 部署程序（`Update.exe`）在安装、更新、卸载应用时以特定命令行参数启动应用，
//! [`Installer`] 解析这些参数并依次执行配置好的安装步骤。

pub mod builder;
#[allow(clippy::module_inception)]
pub mod installer;
pub mod lifecycle;
pub mod step;
pub mod steps;

pub use builder::InstallerBuilder;
pub use installer::{FirstRunAction, Installer};
pub use lifecycle::{parse_version, EventOutcome, LifecycleEvent};
pub use step::{fixed_path, InstallerStep, PathResolver};
pub use steps::EmbeddedResource;
