use crate::core::error::InstallerResult;
use crate::services::installer::step::InstallerStep;
use semver::Version;

/// 由多个步骤组成的安装步骤
///
/// 安装和更新按添加顺序执行，卸载按相反顺序执行。
/// 不捕获单个步骤的错误：出错即中止本轮剩余步骤。
pub struct CompositeStep {
    steps: Vec<Box<dyn InstallerStep>>,
}

impl CompositeStep {
    pub fn new(steps: Vec<Box<dyn InstallerStep>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 按配置顺序列出步骤名称
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }
}

impl InstallerStep for CompositeStep {
    fn on_initial_install(&self, version: &Version) -> InstallerResult<()> {
        for step in &self.steps {
            tracing::debug!(step = step.name(), %version, "执行安装步骤");
            step.on_initial_install(version)?;
        }
        Ok(())
    }

    fn on_app_update(&self, version: &Version) -> InstallerResult<()> {
        for step in &self.steps {
            tracing::debug!(step = step.name(), %version, "执行更新步骤");
            step.on_app_update(version)?;
        }
        Ok(())
    }

    fn on_app_uninstall(&self, version: &Version) -> InstallerResult<()> {
        for step in self.steps.iter().rev() {
            tracing::debug!(step = step.name(), %version, "执行卸载步骤");
            step.on_app_uninstall(version)?;
        }
        Ok(())
    }
}
