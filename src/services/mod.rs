// 服务层模块
//
// - installer: 安装、更新、卸载事件的步骤流水线
// - update: 后台自动更新

pub mod installer;
pub mod update;

pub use installer::{Installer, InstallerBuilder, InstallerStep};
pub use update::{UpdateTransport, Updater};
