use super::transport::{UpdateExeTransport, UpdateTransport};
use crate::core::error::{flatten_causes, UpdaterError, UpdaterResult};
use crate::models::update::{UpdateOptions, UpdateSource, UpdaterStatus};
use crate::services::installer::steps::exception_callback::panic_message;
use crate::utils::app_info::{AppLocation, SpecialDirectory};
use crate::utils::file_helpers::{modified_time, touch};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;
use std::time::SystemTime;

/// 上次检查时间记录文件（仅使用其修改时间）
pub const LAST_UPDATE_FILE_NAME: &str = "lastUpdate.timestamp";

#[derive(Debug, Default)]
struct UpdaterState {
    status: UpdaterStatus,
    error: Option<String>,
}

type SharedState = Arc<RwLock<UpdaterState>>;

fn read_state(state: &SharedState) -> RwLockReadGuard<'_, UpdaterState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_state(state: &SharedState) -> RwLockWriteGuard<'_, UpdaterState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

fn record_outcome(state: &SharedState, result: Result<()>) {
    let mut state = write_state(state);
    match result {
        Ok(()) => {
            state.status = UpdaterStatus::Completed;
            tracing::info!("更新检查完成");
        }
        Err(e) => {
            let message = flatten_causes(&e);
            tracing::error!(error = %message, "更新检查失败");
            state.status = UpdaterStatus::Failed;
            state.error = Some(message);
        }
    }
}

/// 后台更新器
///
/// 每个实例只运行一次更新检查：[`start`](Self::start) 在专用后台线程的 tokio 运行时上
/// 执行检查，[`wait_for_completion`](Self::wait_for_completion) 等待其结束。
/// 失败不会向调用方传播，而是记录在 [`status`](Self::status) 与 [`error`](Self::error) 中。
///
/// 运行时由后台线程持有，因此可以在异步上下文中创建和释放更新器；
/// `wait_for_completion` 与 `Drop` 会阻塞当前线程直到检查结束。
pub struct Updater {
    options: UpdateOptions,
    app: AppLocation,
    transport: Arc<dyn UpdateTransport>,
    worker: Option<JoinHandle<()>>,
    state: SharedState,
}

impl Updater {
    /// 基于当前进程可执行文件与 `Update.exe` 创建更新器
    pub fn new(options: UpdateOptions) -> UpdaterResult<Self> {
        let executable = std::env::current_exe()
            .map_err(|e| UpdaterError::io("<current executable>", e))?;
        let app = AppLocation::from_executable(executable);
        let transport = Arc::new(UpdateExeTransport::new(app.clone()));
        Self::with_transport(options, app, transport)
    }

    pub fn with_transport(
        options: UpdateOptions,
        app: AppLocation,
        transport: Arc<dyn UpdateTransport>,
    ) -> UpdaterResult<Self> {
        Ok(Self {
            options,
            app,
            transport,
            worker: None,
            state: Arc::new(RwLock::new(UpdaterState::default())),
        })
    }

    pub fn options(&self) -> &UpdateOptions {
        &self.options
    }

    pub fn status(&self) -> UpdaterStatus {
        read_state(&self.state).status
    }

    /// 失败时的完整错误信息（各级原因按换行连接）
    pub fn error(&self) -> Option<String> {
        read_state(&self.state).error.clone()
    }

    /// 启动更新检查
    ///
    /// 未处于安装环境、未启用、未配置更新源或路径为空时直接完成，不执行更新。
    pub fn start(&mut self) -> UpdaterResult<()> {
        {
            let mut state = write_state(&self.state);
            if state.status != UpdaterStatus::Initialized {
                return Err(UpdaterError::AlreadyStarted);
            }
            state.status = UpdaterStatus::Running;
        }

        if let Some(reason) = self.skip_reason() {
            tracing::info!(reason, "跳过更新检查");
            write_state(&self.state).status = UpdaterStatus::Completed;
            return Ok(());
        }

        let job = UpdateJob {
            options: self.options.clone(),
            timestamp_path: self.timestamp_path(),
            transport: self.transport.clone(),
        };
        let state = self.state.clone();

        tracing::debug!(source = ?self.options.source, path = %self.options.path(), "启动后台更新任务");
        match spawn_worker(job, state) {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                let mut state = write_state(&self.state);
                state.status = UpdaterStatus::Failed;
                state.error = Some(e.to_string());
                Err(UpdaterError::Runtime(e))
            }
        }
    }

    /// 等待后台任务结束（未启动时直接返回）
    pub fn wait_for_completion(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        if let Err(payload) = worker.join() {
            let error = anyhow::anyhow!("{}", panic_message(payload.as_ref()))
                .context("后台更新任务异常终止");
            record_outcome(&self.state, Err(error));
        }
    }

    fn skip_reason(&self) -> Option<&'static str> {
        if !self.app.is_installed() {
            Some("应用未安装")
        } else if !self.options.enable {
            Some("自动更新未启用")
        } else if self.options.source == UpdateSource::NotConfigured {
            Some("未配置更新源")
        } else if self.options.path().trim().is_empty() {
            Some("更新路径为空")
        } else {
            None
        }
    }

    fn timestamp_path(&self) -> PathBuf {
        self.app
            .directory(SpecialDirectory::ApplicationRootDirectory)
            .join(LAST_UPDATE_FILE_NAME)
    }
}

impl Drop for Updater {
    fn drop(&mut self) {
        if self.status() == UpdaterStatus::Running {
            self.wait_for_completion();
        }
    }
}

/// 在专用线程上创建单线程运行时并执行检查，运行时随线程一起释放
fn spawn_worker(job: UpdateJob, state: SharedState) -> std::io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("installkit-updater".to_string())
        .spawn(move || {
            let result = runtime.block_on(job.run());
            record_outcome(&state, result);
        })
}

/// 一次更新检查
struct UpdateJob {
    options: UpdateOptions,
    timestamp_path: PathBuf,
    transport: Arc<dyn UpdateTransport>,
}

impl UpdateJob {
    async fn run(self) -> Result<()> {
        if let Some(last_check) = modified_time(&self.timestamp_path)
            .with_context(|| format!("读取 {} 失败", self.timestamp_path.display()))?
        {
            // 时钟回拨时视为刚检查过
            let elapsed = SystemTime::now()
                .duration_since(last_check)
                .unwrap_or_default();
            if elapsed < self.options.interval {
                tracing::debug!(
                    elapsed_secs = elapsed.as_secs(),
                    interval_secs = self.options.interval.as_secs(),
                    "距上次检查未超过间隔，跳过"
                );
                return Ok(());
            }
        }

        let path = self.options.path();
        match self.options.source {
            UpdateSource::GitHub => self
                .transport
                .update_from_repository(path, self.options.install_prerelease_versions)
                .await
                .with_context(|| format!("从 {path} 更新失败"))?,
            UpdateSource::FileSystem => self
                .transport
                .update_from_path(path)
                .await
                .with_context(|| format!("从 {path} 更新失败"))?,
            UpdateSource::NotConfigured => bail!("未配置更新源"),
        }

        touch(&self.timestamp_path, SystemTime::now())
            .with_context(|| format!("写入 {} 失败", self.timestamp_path.display()))?;
        Ok(())
    }
}
