use crate::core::error::{InstallerError, InstallerResult};
use crate::services::installer::step::InstallerStep;
use crate::utils::app_info::{AppLocation, SpecialDirectory};
use semver::Version;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

/// 安装步骤出错时的回调
pub type ExceptionHandler = Arc<dyn Fn(&InstallerError) + Send + Sync>;

/// 包装内部步骤：出错时先调用回调，再原样返回错误
///
/// panic 同样会通知回调（以 [`InstallerError::Panicked`] 描述），随后继续展开。
pub struct ExceptionCallbackStep {
    inner: Box<dyn InstallerStep>,
    on_exception: ExceptionHandler,
}

impl ExceptionCallbackStep {
    pub fn new(inner: Box<dyn InstallerStep>, on_exception: ExceptionHandler) -> Self {
        Self {
            inner,
            on_exception,
        }
    }

    fn execute<F>(&self, action: F) -> InstallerResult<()>
    where
        F: FnOnce() -> InstallerResult<()>,
    {
        match panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => {
                tracing::error!(error = %error, "安装步骤执行失败");
                (self.on_exception)(&error);
                Err(error)
            }
            Err(payload) => {
                let error = InstallerError::Panicked(panic_message(payload.as_ref()));
                tracing::error!(error = %error, "安装步骤 panic");
                (self.on_exception)(&error);
                panic::resume_unwind(payload)
            }
        }
    }
}

impl InstallerStep for ExceptionCallbackStep {
    fn on_initial_install(&self, version: &Version) -> InstallerResult<()> {
        self.execute(|| self.inner.on_initial_install(version))
    }

    fn on_app_update(&self, version: &Version) -> InstallerResult<()> {
        self.execute(|| self.inner.on_app_update(version))
    }

    fn on_app_uninstall(&self, version: &Version) -> InstallerResult<()> {
        self.execute(|| self.inner.on_app_uninstall(version))
    }
}

/// panic 负载中的消息文本
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// 默认回调：在可执行文件旁写入 `Exception_<uuid>.txt`
///
/// 宿主程序通常会吞掉安装事件中的错误，因此先落盘留档；写入失败时忽略。
pub fn default_exception_handler(app: AppLocation) -> ExceptionHandler {
    Arc::new(move |error| match write_exception_report(&app, error) {
        Ok(path) => tracing::info!(path = ?path, "已写入异常诊断文件"),
        Err(e) => tracing::warn!(error = %e, "写入异常诊断文件失败"),
    })
}

fn write_exception_report(app: &AppLocation, error: &InstallerError) -> std::io::Result<PathBuf> {
    let path = app
        .directory(SpecialDirectory::CurrentVersionRootDirectory)
        .join(format!("Exception_{}.txt", uuid::Uuid::new_v4()));

    let content = format!(
        "{}\n{}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"),
        describe_error(error)
    );
    std::fs::write(&path, content)?;
    Ok(path)
}

/// 错误描述（包含完整的原因链）
pub fn describe_error(error: &(dyn StdError + 'static)) -> String {
    let mut description = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(description, "\nCaused by: {cause}");
        source = cause.source();
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::installer::steps::composite::tests::RecordingStep;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn counting_handler() -> (Arc<AtomicUsize>, ExceptionHandler) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handler: ExceptionHandler = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    struct PanickingStep;

    impl InstallerStep for PanickingStep {
        fn on_initial_install(&self, _version: &Version) -> InstallerResult<()> {
            panic!("boom");
        }

        fn on_app_update(&self, _version: &Version) -> InstallerResult<()> {
            Ok(())
        }

        fn on_app_uninstall(&self, _version: &Version) -> InstallerResult<()> {
            Ok(())
        }
    }

    #[test]
    fn success_does_not_invoke_callback() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (count, handler) = counting_handler();
        let step = ExceptionCallbackStep::new(Box::new(RecordingStep::new("a", &log)), handler);

        step.on_initial_install(&Version::new(1, 0, 0)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn error_invokes_callback_once_and_propagates() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut inner = RecordingStep::new("a", &log);
        inner.fail_on = Some("uninstall");
        let (count, handler) = counting_handler();
        let step = ExceptionCallbackStep::new(Box::new(inner), handler);

        let err = step.on_app_uninstall(&Version::new(1, 0, 0)).unwrap_err();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(err.to_string(), "a failed during uninstall");
    }

    #[test]
    fn panic_invokes_callback_and_resumes() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let recorder = seen.clone();
        let handler: ExceptionHandler = Arc::new(move |error| {
            recorder.lock().unwrap().push(error.to_string());
        });
        let step = ExceptionCallbackStep::new(Box::new(PanickingStep), handler);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            step.on_initial_install(&Version::new(1, 0, 0))
        }));

        assert!(result.is_err());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("boom"));
    }

    #[test]
    fn default_handler_writes_report_beside_executable() {
        let dir = TempDir::new().unwrap();
        let app = AppLocation::from_executable(dir.path().join("MyApp.exe"));
        let handler = default_exception_handler(app);

        let error = InstallerError::io(
            dir.path().join("settings.toml"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
        );
        handler(&error);

        let reports: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.starts_with("Exception_") && name.ends_with(".txt")
            })
            .collect();
        assert_eq!(reports.len(), 1);

        let content = std::fs::read_to_string(reports[0].path()).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().is_some_and(|line| !line.is_empty()));
        assert!(content.contains("settings.toml"));
        assert!(content.contains("Caused by: access denied"));
    }

    #[test]
    fn default_handler_failure_does_not_hide_original_error() {
        let dir = TempDir::new().unwrap();
        let app = AppLocation::from_executable(dir.path().join("missing").join("MyApp.exe"));
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut inner = RecordingStep::new("a", &log);
        inner.fail_on = Some("install");
        let step = ExceptionCallbackStep::new(Box::new(inner), default_exception_handler(app));

        let err = step.on_initial_install(&Version::new(1, 0, 0)).unwrap_err();
        assert_eq!(err.to_string(), "a failed during install");
    }
}
