use super::installer::{FirstRunAction, Installer};
use super::step::{fixed_path, InstallerStep, PathResolver};
use super::steps::{
    default_exception_handler, AddDirectoryToPathStep, CompositeStep, CreateBatchFileStep,
    EmbeddedResource, ExceptionCallbackStep, ExceptionHandler, InstallationFlagFileStep,
    SaveResourceToFileStep,
};
use crate::core::error::{InstallerError, InstallerResult};
use crate::utils::app_info::{AppLocation, SpecialDirectory};
use crate::utils::environment::{EnvironmentStore, UserEnvironment};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// [`Installer`] 构建器
///
/// 步骤按添加顺序执行（卸载时逆序）。安装标记步骤固定为第一个步骤，
/// 因为其他步骤的目录解析依赖 [`AppLocation::is_installed`]。
pub struct InstallerBuilder {
    app: AppLocation,
    steps: Vec<Box<dyn InstallerStep>>,
    on_first_run: Option<FirstRunAction>,
    on_exception: ExceptionHandler,
    environment: Arc<dyn EnvironmentStore>,
}

impl InstallerBuilder {
    pub fn new(app: AppLocation) -> Self {
        Self {
            steps: vec![Box::new(InstallationFlagFileStep::new(app.clone()))],
            on_first_run: None,
            // 宿主程序会吞掉安装事件中的错误，默认先写入诊断文件
            on_exception: default_exception_handler(app.clone()),
            environment: Arc::new(UserEnvironment),
            app,
        }
    }

    /// 基于当前进程可执行文件创建空构建器
    pub fn create() -> InstallerResult<Self> {
        Ok(Self::new(AppLocation::current()?))
    }

    /// 控制台应用的默认配置
    ///
    /// - 在应用根目录生成 `<应用名>.bat` 启动脚本
    /// - 将应用根目录加入用户 PATH
    /// - 首次运行时提示安装成功，按键后退出
    pub fn console_application(app: AppLocation) -> InstallerResult<Self> {
        Self::new(app).with_console_defaults()
    }

    /// 在当前构建器上追加控制台应用默认配置
    pub fn with_console_defaults(self) -> InstallerResult<Self> {
        let name = self.app.application_name();
        let command = self.app.executable().to_string_lossy().into_owned();

        let builder = self
            .create_batch_file(
                SpecialDirectory::ApplicationRootDirectory,
                &format!("{name}.bat"),
                &command,
            )?
            .add_directory_to_path(SpecialDirectory::ApplicationRootDirectory);

        Ok(builder.on_first_run(move || {
            println!("{name} was installed");
            println!("Press any key to continue...");
            let _ = std::io::stdin().read(&mut [0u8; 1]);
            std::process::exit(0);
        }))
    }

    pub fn app(&self) -> &AppLocation {
        &self.app
    }

    /// 之后添加的 PATH 步骤使用的环境变量存储
    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentStore>) -> Self {
        self.environment = environment;
        self
    }

    pub fn add_custom_step(mut self, step: impl InstallerStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// 将指定目录加入用户 PATH
    pub fn add_directory_to_path(self, directory: SpecialDirectory) -> Self {
        let resolver = self.special_directory(directory);
        self.push_path_step(resolver)
    }

    pub fn add_directory_to_path_str(self, directory: &str) -> InstallerResult<Self> {
        let directory = non_blank("directory", directory)?;
        Ok(self.push_path_step(fixed_path(directory)))
    }

    /// 在指定目录生成执行 `command` 的批处理文件
    pub fn create_batch_file(
        mut self,
        directory: SpecialDirectory,
        file_name: &str,
        command: &str,
    ) -> InstallerResult<Self> {
        let file_name = non_blank("file_name", file_name)?.to_string();
        let command = non_blank("command", command)?;

        let resolver = self.file_in(directory, file_name);
        self.steps
            .push(Box::new(CreateBatchFileStep::new(resolver, command)));
        Ok(self)
    }

    /// 在完整路径生成执行 `command` 的批处理文件
    pub fn create_batch_file_at(mut self, path: &str, command: &str) -> InstallerResult<Self> {
        let path = non_blank("batch_file_path", path)?;
        let command = non_blank("command", command)?;

        self.steps
            .push(Box::new(CreateBatchFileStep::new(fixed_path(path), command)));
        Ok(self)
    }

    /// 将嵌入资源保存到完整路径
    ///
    /// `overwrite_on_update` 决定应用更新时是否覆盖已有文件。
    pub fn save_resource_to_file(
        mut self,
        resource: EmbeddedResource,
        path: &str,
        overwrite_on_update: bool,
    ) -> InstallerResult<Self> {
        non_blank("resource_name", &resource.name)?;
        let path = non_blank("file_path", path)?;

        self.steps.push(Box::new(SaveResourceToFileStep::new(
            resource,
            fixed_path(path),
            overwrite_on_update,
        )));
        Ok(self)
    }

    /// 将嵌入资源保存到指定目录
    pub fn save_resource_to_special_dir(
        mut self,
        resource: EmbeddedResource,
        directory: SpecialDirectory,
        file_name: &str,
        overwrite_on_update: bool,
    ) -> InstallerResult<Self> {
        non_blank("resource_name", &resource.name)?;
        let file_name = non_blank("file_name", file_name)?.to_string();

        let resolver = self.file_in(directory, file_name);
        self.steps.push(Box::new(SaveResourceToFileStep::new(
            resource,
            resolver,
            overwrite_on_update,
        )));
        Ok(self)
    }

    /// 应用首次启动后执行的回调
    pub fn on_first_run(mut self, action: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_first_run = Some(Box::new(action));
        self
    }

    /// 安装步骤出错时执行的回调（替换默认的诊断文件回调）
    pub fn on_exception(
        mut self,
        handler: impl Fn(&InstallerError) + Send + Sync + 'static,
    ) -> Self {
        self.on_exception = Arc::new(handler);
        self
    }

    pub fn build(self) -> Installer {
        let composite = CompositeStep::new(self.steps);
        tracing::debug!(steps = ?composite.step_names(), "安装器已构建");

        Installer::new(
            ExceptionCallbackStep::new(Box::new(composite), self.on_exception),
            self.on_first_run,
        )
    }

    fn push_path_step(mut self, resolver: PathResolver) -> Self {
        self.steps.push(Box::new(AddDirectoryToPathStep::new(
            resolver,
            self.environment.clone(),
        )));
        self
    }

    fn special_directory(&self, directory: SpecialDirectory) -> PathResolver {
        let app = self.app.clone();
        Arc::new(move || app.directory(directory))
    }

    fn file_in(&self, directory: SpecialDirectory, file_name: String) -> PathResolver {
        let app = self.app.clone();
        Arc::new(move || -> PathBuf { app.directory(directory).join(&file_name) })
    }
}

fn non_blank<'a>(name: &'static str, value: &'a str) -> InstallerResult<&'a str> {
    if value.trim().is_empty() {
        return Err(InstallerError::blank(name));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::installer::lifecycle::EventOutcome;
    use crate::services::installer::steps::batch_file::batch_file_contents;
    use crate::utils::environment::MemoryEnvironment;
    use semver::Version;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Layout {
        _dir: TempDir,
        root: PathBuf,
        version_dir: PathBuf,
        app: AppLocation,
    }

    fn layout() -> Layout {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("MyApp");
        let version_dir = root.join("app-1.0.0");
        std::fs::create_dir_all(&version_dir).unwrap();
        let app = AppLocation::from_executable(version_dir.join("MyApp.exe"));
        Layout {
            _dir: dir,
            root,
            version_dir,
            app,
        }
    }

    /// 记录执行时是否已处于安装环境
    struct ProbeStep {
        app: AppLocation,
        seen: Arc<Mutex<Vec<bool>>>,
    }

    impl InstallerStep for ProbeStep {
        fn on_initial_install(&self, _version: &Version) -> InstallerResult<()> {
            self.seen.lock().unwrap().push(self.app.is_installed());
            Ok(())
        }

        fn on_app_update(&self, _version: &Version) -> InstallerResult<()> {
            Ok(())
        }

        fn on_app_uninstall(&self, _version: &Version) -> InstallerResult<()> {
            self.seen.lock().unwrap().push(self.app.is_installed());
            Ok(())
        }
    }

    #[test]
    fn marker_step_runs_first_and_last() {
        let layout = layout();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let installer = InstallerBuilder::new(layout.app.clone())
            .add_custom_step(ProbeStep {
                app: layout.app.clone(),
                seen: seen.clone(),
            })
            .build();
        let version = Version::new(1, 0, 0);

        installer.on_initial_install(&version).unwrap();
        installer.on_app_uninstall(&version).unwrap();

        // 安装时标记文件已先写入，卸载时标记文件最后删除
        assert_eq!(*seen.lock().unwrap(), vec![true, true]);
        assert!(!layout.app.is_installed());
    }

    #[test]
    fn console_preset_installs_into_application_root() {
        let layout = layout();
        let env = MemoryEnvironment::new().with_var("PATH", r"C:\Windows");
        let installer = InstallerBuilder::new(layout.app.clone())
            .with_environment(Arc::new(env.clone()))
            .with_console_defaults()
            .unwrap()
            .build();

        installer.on_initial_install(&Version::new(1, 0, 0)).unwrap();

        let batch_file = layout.root.join("MyApp.bat");
        assert_eq!(
            std::fs::read_to_string(&batch_file).unwrap(),
            batch_file_contents(&layout.app.executable().to_string_lossy())
        );
        let root = layout.root.to_string_lossy().into_owned();
        assert_eq!(
            env.get("PATH").unwrap().unwrap(),
            format!(r"C:\Windows;{root}")
        );

        installer.on_app_uninstall(&Version::new(1, 0, 0)).unwrap();
        assert!(!batch_file.exists());
        assert_eq!(env.get("PATH").unwrap().unwrap(), r"C:\Windows");
        assert!(!layout.app.is_installed());
    }

    #[test]
    fn resources_resolve_against_special_directories() {
        let layout = layout();
        let installer = InstallerBuilder::new(layout.app.clone())
            .save_resource_to_special_dir(
                EmbeddedResource::new("defaults.toml", "enable = true\n"),
                SpecialDirectory::CurrentVersionRootDirectory,
                "defaults.toml",
                false,
            )
            .unwrap()
            .build();

        installer.on_initial_install(&Version::new(1, 0, 0)).unwrap();
        assert!(layout.version_dir.join("defaults.toml").exists());
    }

    #[test]
    fn blank_arguments_are_rejected() {
        let layout = layout();
        let builder = || InstallerBuilder::new(layout.app.clone());

        assert!(matches!(
            builder().add_directory_to_path_str("  "),
            Err(InstallerError::InvalidArgument { name: "directory", .. })
        ));
        assert!(matches!(
            builder().create_batch_file(SpecialDirectory::ApplicationRootDirectory, "", "x.exe"),
            Err(InstallerError::InvalidArgument { name: "file_name", .. })
        ));
        assert!(matches!(
            builder().create_batch_file_at("x.bat", " "),
            Err(InstallerError::InvalidArgument { name: "command", .. })
        ));
        assert!(matches!(
            builder().save_resource_to_file(EmbeddedResource::new("", "x"), "x.txt", false),
            Err(InstallerError::InvalidArgument { name: "resource_name", .. })
        ));
        assert!(matches!(
            builder().save_resource_to_file(EmbeddedResource::new("r", "x"), "", false),
            Err(InstallerError::InvalidArgument { name: "file_path", .. })
        ));
    }

    #[test]
    fn custom_exception_handler_replaces_default() {
        let layout = layout();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let missing = layout.root.join("missing").join("launcher.bat");
        let installer = InstallerBuilder::new(layout.app.clone())
            .create_batch_file_at(&missing.to_string_lossy(), "MyApp.exe")
            .unwrap()
            .on_exception(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let err = installer
            .on_initial_install(&Version::new(1, 0, 0))
            .unwrap_err();
        assert!(matches!(err, InstallerError::Io { .. }));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // 默认诊断文件未写入
        let reports = std::fs::read_dir(&layout.version_dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("Exception_"))
            .count();
        assert_eq!(reports, 0);
    }

    #[test]
    fn dispatch_routes_events() {
        let layout = layout();
        let first_runs = Arc::new(AtomicUsize::new(0));
        let counter = first_runs.clone();
        let installer = InstallerBuilder::new(layout.app.clone())
            .on_first_run(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        assert_eq!(
            installer
                .handle_events_from(["--squirrel-install", "1.0.0"])
                .unwrap(),
            EventOutcome::Handled
        );
        assert!(layout.app.is_installed());

        assert_eq!(
            installer
                .handle_events_from(["--squirrel-obsolete", "1.0.0"])
                .unwrap(),
            EventOutcome::Handled
        );
        assert!(layout.app.is_installed());

        assert_eq!(
            installer.handle_events_from(["--squirrel-firstrun"]).unwrap(),
            EventOutcome::FirstRun
        );
        assert_eq!(first_runs.load(Ordering::SeqCst), 1);

        assert_eq!(
            installer.handle_events_from(["--verbose"]).unwrap(),
            EventOutcome::NotHandled
        );

        assert_eq!(
            installer
                .handle_events_from(["--squirrel-uninstall", "1.0.0"])
                .unwrap(),
            EventOutcome::Handled
        );
        assert!(!layout.app.is_installed());
    }
}
