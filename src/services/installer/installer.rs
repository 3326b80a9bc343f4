use super::lifecycle::{EventOutcome, LifecycleEvent};
use super::step::InstallerStep;
use super::steps::ExceptionCallbackStep;
use crate::core::error::InstallerResult;
use semver::Version;

/// 首次运行回调
pub type FirstRunAction = Box<dyn Fn() + Send + Sync>;

/// 安装、更新、卸载时执行的步骤集合
///
/// 由 [`InstallerBuilder::build`](super::InstallerBuilder::build) 创建，创建后不可修改。
pub struct Installer {
    step: ExceptionCallbackStep,
    on_first_run: Option<FirstRunAction>,
}

impl Installer {
    pub(crate) fn new(step: ExceptionCallbackStep, on_first_run: Option<FirstRunAction>) -> Self {
        Self { step, on_first_run }
    }

    /// 执行首次运行回调（未配置时为空操作）
    pub fn on_first_run(&self) {
        if let Some(action) = &self.on_first_run {
            tracing::debug!("执行首次运行回调");
            action();
        }
    }

    /// 将生命周期事件分发给对应的步骤
    pub fn dispatch(&self, event: &LifecycleEvent) -> InstallerResult<EventOutcome> {
        tracing::info!(event = ?event, "处理生命周期事件");
        match event {
            LifecycleEvent::Install(version) => self.on_initial_install(version)?,
            LifecycleEvent::Updated(version) => self.on_app_update(version)?,
            LifecycleEvent::Uninstall(version) => self.on_app_uninstall(version)?,
            LifecycleEvent::Obsolete(version) => {
                tracing::debug!(%version, "旧版本已被替代，无需处理");
            }
            LifecycleEvent::FirstRun => {
                self.on_first_run();
                return Ok(EventOutcome::FirstRun);
            }
        }
        Ok(EventOutcome::Handled)
    }

    /// 解析命令行参数（不含程序名）并处理生命周期事件
    pub fn handle_events_from<I, S>(&self, args: I) -> InstallerResult<EventOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match LifecycleEvent::parse(args)? {
            Some(event) => self.dispatch(&event),
            None => Ok(EventOutcome::NotHandled),
        }
    }

    /// 处理当前进程的生命周期事件
    ///
    /// 应在 `main` 中尽早调用。安装类事件处理完后直接退出进程
    /// （成功退出码 0，失败记录日志后退出码 1）；首次运行事件执行回调后返回。
    pub fn handle_installation_events(&self) {
        match self.handle_events_from(std::env::args().skip(1)) {
            Ok(EventOutcome::Handled) => std::process::exit(0),
            Ok(EventOutcome::FirstRun | EventOutcome::NotHandled) => {}
            Err(e) => {
                tracing::error!(error = %e, "处理安装事件失败");
                std::process::exit(1);
            }
        }
    }
}

impl InstallerStep for Installer {
    fn on_initial_install(&self, version: &Version) -> InstallerResult<()> {
        self.step.on_initial_install(version)
    }

    fn on_app_update(&self, version: &Version) -> InstallerResult<()> {
        self.step.on_app_update(version)
    }

    fn on_app_uninstall(&self, version: &Version) -> InstallerResult<()> {
        self.step.on_app_uninstall(version)
    }
}
