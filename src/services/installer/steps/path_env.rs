use crate::core::error::InstallerResult;
use crate::services::installer::step::{InstallerStep, PathResolver};
use crate::utils::environment::EnvironmentStore;
use semver::Version;
use std::collections::HashSet;
use std::sync::Arc;

const PATH_VARIABLE: &str = "PATH";
const PATH_SEPARATOR: char = ';';

/// 将目录添加到用户 PATH 环境变量的安装步骤
pub struct AddDirectoryToPathStep {
    directory: PathResolver,
    environment: Arc<dyn EnvironmentStore>,
}

impl AddDirectoryToPathStep {
    pub fn new(directory: PathResolver, environment: Arc<dyn EnvironmentStore>) -> Self {
        Self {
            directory,
            environment,
        }
    }

    fn resolve_directory(&self) -> String {
        (self.directory)().to_string_lossy().into_owned()
    }

    fn current_path(&self) -> InstallerResult<String> {
        Ok(self.environment.get(PATH_VARIABLE)?.unwrap_or_default())
    }
}

impl InstallerStep for AddDirectoryToPathStep {
    fn on_initial_install(&self, _version: &Version) -> InstallerResult<()> {
        let directory = self.resolve_directory();
        let value = self.current_path()?;

        match append_directory(&value, &directory) {
            Some(updated) => {
                self.environment.set(PATH_VARIABLE, &updated)?;
                tracing::info!(directory = %directory, "已添加到用户 PATH");
            }
            None => tracing::debug!(directory = %directory, "用户 PATH 已包含该目录"),
        }
        Ok(())
    }

    fn on_app_update(&self, _version: &Version) -> InstallerResult<()> {
        Ok(())
    }

    fn on_app_uninstall(&self, _version: &Version) -> InstallerResult<()> {
        let directory = self.resolve_directory();
        let value = self.current_path()?;
        let updated = remove_directory(&value, &directory);

        self.environment.set(PATH_VARIABLE, &updated)?;
        tracing::info!(directory = %directory, "已从用户 PATH 移除");
        Ok(())
    }
}

/// 目录不在 PATH 中时返回追加后的新值（不区分大小写）
pub fn append_directory(value: &str, directory: &str) -> Option<String> {
    let existing: HashSet<String> = value
        .split(PATH_SEPARATOR)
        .map(str::to_lowercase)
        .collect();

    if existing.contains(&directory.to_lowercase()) {
        return None;
    }

    if value.is_empty() || value.ends_with(PATH_SEPARATOR) {
        Some(format!("{value}{directory}"))
    } else {
        Some(format!("{value}{PATH_SEPARATOR}{directory}"))
    }
}

/// 移除所有与目录相同的条目（不区分大小写），并去除多余的分隔符
pub fn remove_directory(value: &str, directory: &str) -> String {
    let directory = directory.to_lowercase();
    value
        .split(PATH_SEPARATOR)
        .filter(|entry| !entry.is_empty() && entry.to_lowercase() != directory)
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::installer::step::fixed_path;
    use crate::utils::environment::MemoryEnvironment;

    const APP_DIR: &str = r"C:\Users\me\AppData\Local\MyApp";

    fn step(env: &MemoryEnvironment) -> AddDirectoryToPathStep {
        AddDirectoryToPathStep::new(fixed_path(APP_DIR), Arc::new(env.clone()))
    }

    #[test]
    fn install_appends_directory() {
        let env = MemoryEnvironment::new().with_var("PATH", r"C:\Windows;C:\Tools");
        step(&env).on_initial_install(&Version::new(1, 0, 0)).unwrap();

        assert_eq!(
            env.get("PATH").unwrap().unwrap(),
            format!(r"C:\Windows;C:\Tools;{APP_DIR}")
        );
    }

    #[test]
    fn install_into_missing_variable() {
        let env = MemoryEnvironment::new();
        step(&env).on_initial_install(&Version::new(1, 0, 0)).unwrap();
        assert_eq!(env.get("PATH").unwrap().unwrap(), APP_DIR);
    }

    #[test]
    fn install_is_idempotent_and_case_insensitive() {
        let env = MemoryEnvironment::new().with_var("PATH", r"C:\Windows");
        let step = step(&env);
        let version = Version::new(1, 0, 0);

        step.on_initial_install(&version).unwrap();
        step.on_initial_install(&version).unwrap();
        assert_eq!(
            env.get("PATH").unwrap().unwrap(),
            format!(r"C:\Windows;{APP_DIR}")
        );

        assert_eq!(append_directory(&APP_DIR.to_uppercase(), APP_DIR), None);
    }

    #[test]
    fn update_does_not_touch_path() {
        let env = MemoryEnvironment::new().with_var("PATH", r"C:\Windows");
        step(&env).on_app_update(&Version::new(1, 1, 0)).unwrap();
        assert_eq!(env.get("PATH").unwrap().unwrap(), r"C:\Windows");
    }

    #[test]
    fn uninstall_removes_every_occurrence() {
        let value = format!(
            r"{APP_DIR};C:\Windows;{};C:\Tools;{APP_DIR}",
            APP_DIR.to_lowercase()
        );
        let env = MemoryEnvironment::new().with_var("PATH", &value);
        step(&env).on_app_uninstall(&Version::new(1, 0, 0)).unwrap();

        let updated = env.get("PATH").unwrap().unwrap();
        assert_eq!(updated, r"C:\Windows;C:\Tools");
        assert!(!updated.contains(";;"));
    }

    #[test]
    fn remove_collapses_separators() {
        assert_eq!(remove_directory(r"a;;b;X;;c;", "x"), "a;b;c");
        assert_eq!(remove_directory("x", "x"), "");
        assert_eq!(remove_directory("", "x"), "");
    }

    #[test]
    fn remove_keeps_entries_containing_directory_as_prefix() {
        let value = format!(r"{APP_DIR}\bin;{APP_DIR}");
        assert_eq!(remove_directory(&value, APP_DIR), format!(r"{APP_DIR}\bin"));
    }

    #[test]
    fn append_after_trailing_separator() {
        assert_eq!(append_directory("a;", "b").as_deref(), Some("a;b"));
    }
}
