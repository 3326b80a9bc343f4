use crate::models::config::{LogConfig, LogFormat, LogLevel, LogOutput};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

const LOG_TARGET: &str = env!("CARGO_CRATE_NAME");
const LOG_FILE_PREFIX: &str = "installkit";

/// 全局日志级别 reload handle
static LOG_LEVEL_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// 初始化日志系统
///
/// - 日志级别（trace/debug/info/warn/error）
/// - 输出格式（JSON/纯文本）
/// - 输出目标（控制台/文件/both）
/// - 文件路径（未指定时为本地数据目录下的 `<应用名>/logs`）
///
/// 日志级别可以通过 [`update_log_level`] 动态调整；格式、输出目标、文件路径只在初始化时生效。
///
/// # 示例
/// ```no_run
/// use installkit::core::init_logger;
/// use installkit::models::config::LogConfig;
///
/// init_logger(&LogConfig::default()).expect("初始化日志系统失败");
/// ```
pub fn init_logger(config: &LogConfig) -> anyhow::Result<()> {
    // 1. 创建可重载的过滤层
    let filter = create_env_filter(&config.level);
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    // 2. 保存 reload handle（用于后续动态调整级别）
    if LOG_LEVEL_HANDLE.set(reload_handle).is_err() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    // 3. 根据配置添加输出层并初始化
    match (&config.output, &config.format) {
        (LogOutput::Console, LogFormat::Text) => {
            Registry::default()
                .with(filter_layer)
                .with(create_console_text_layer())
                .init();
        }
        (LogOutput::Console, LogFormat::Json) => {
            Registry::default()
                .with(filter_layer)
                .with(create_console_json_layer())
                .init();
        }
        (LogOutput::File, LogFormat::Text) => {
            let file_layer = create_file_text_layer(config.file_path.as_deref())?;
            Registry::default()
                .with(filter_layer)
                .with(file_layer)
                .init();
        }
        (LogOutput::File, LogFormat::Json) => {
            let file_layer = create_file_json_layer(config.file_path.as_deref())?;
            Registry::default()
                .with(filter_layer)
                .with(file_layer)
                .init();
        }
        (LogOutput::Both, LogFormat::Text) => {
            let file_layer = create_file_text_layer(config.file_path.as_deref())?;
            Registry::default()
                .with(filter_layer)
                .with(create_console_text_layer())
                .with(file_layer)
                .init();
        }
        (LogOutput::Both, LogFormat::Json) => {
            let file_layer = create_file_json_layer(config.file_path.as_deref())?;
            Registry::default()
                .with(filter_layer)
                .with(create_console_json_layer())
                .with(file_layer)
                .init();
        }
    }

    tracing::info!(
        level = config.level.as_str(),
        format = ?config.format,
        output = ?config.output,
        file_path = ?config.file_path,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 创建环境过滤器
fn create_env_filter(level: &LogLevel) -> EnvFilter {
    // RUST_LOG 优先，例如 RUST_LOG=installkit=trace,reqwest=warn
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// 默认过滤规则：本库使用指定级别，HTTP 相关依赖只输出 WARN 以上
fn default_directives(level: &LogLevel) -> String {
    format!(
        "{LOG_TARGET}={},reqwest=warn,hyper=warn,h2=warn",
        level.as_str()
    )
}

/// 创建控制台文本格式输出层
fn create_console_text_layer<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false)
        .with_ansi(true)
        .with_span_events(if cfg!(debug_assertions) {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .boxed()
}

/// 创建控制台 JSON 格式输出层
fn create_console_json_layer<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_writer(std::io::stdout)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false)
        .with_ansi(true)
        .boxed()
}

/// 创建文件文本格式输出层
fn create_file_text_layer<S>(
    file_path: Option<&str>,
) -> anyhow::Result<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let log_dir = get_log_dir(file_path)?;
    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = non_blocking(file_appender);

    // guard 释放后后台写线程退出
    Box::leak(Box::new(guard));

    Ok(fmt::layer()
        .with_writer(non_blocking)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false)
        .with_ansi(false)
        .boxed())
}

/// 创建文件 JSON 格式输出层
fn create_file_json_layer<S>(
    file_path: Option<&str>,
) -> anyhow::Result<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let log_dir = get_log_dir(file_path)?;
    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = non_blocking(file_appender);

    Box::leak(Box::new(guard));

    Ok(fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(false)
        .boxed())
}

/// 获取日志目录（不存在时创建）
fn get_log_dir(file_path: Option<&str>) -> anyhow::Result<PathBuf> {
    let log_dir = match file_path {
        Some(path) => PathBuf::from(path),
        None => default_log_dir()?,
    };
    std::fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}

fn default_log_dir() -> anyhow::Result<PathBuf> {
    let app_name = std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| LOG_TARGET.to_string());

    Ok(dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("无法获取本地数据目录"))?
        .join(app_name)
        .join("logs"))
}

/// 动态更新日志级别（热重载）
///
/// 仅调整级别；设置了 `RUST_LOG` 时仍以环境变量为准。
pub fn update_log_level(new_level: LogLevel) -> anyhow::Result<()> {
    let handle = LOG_LEVEL_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("日志系统未初始化"))?;

    let new_filter = create_env_filter(&new_level);
    handle
        .reload(new_filter)
        .map_err(|e| anyhow::anyhow!("重载日志级别失败: {}", e))?;

    tracing::info!(new_level = new_level.as_str(), "日志级别已动态更新");
    Ok(())
}
