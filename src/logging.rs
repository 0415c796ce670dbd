//! 日志系统模块
//!
//! 提供结构化日志配置和初始化功能

use log::LevelFilter;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化结果
    init_result: Option<Result<(), String>>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// 从配置的日志级别字符串创建
    pub fn from_level_str(level: &str, json_format: bool) -> Self {
        let level = match level {
            "debug" => LevelFilter::Debug,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Info,
        };

        Self { level, json_format }
    }
}

/// 初始化日志系统
///
/// 线程安全的单次初始化：重复调用返回首次初始化的结果，不会重复
/// 设置全局subscriber。
///
/// # 参数
/// * `config` - 日志配置
///
/// # 返回
/// * `Result<(), anyhow::Error>` - 初始化结果
pub fn setup_logging(config: &LogConfig) -> anyhow::Result<()> {
    let state_mutex = GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));

    let mut state = state_mutex.lock().unwrap();
    if state.initialized {
        return match &state.init_result {
            Some(Ok(())) | None => Ok(()),
            Some(Err(e)) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
        };
    }

    let init_result = perform_initialization(config);
    state.initialized = true;
    state.init_result = Some(init_result.as_ref().map(|_| ()).map_err(|e| e.to_string()));

    init_result
}

/// 检查日志系统是否已初始化
pub fn is_initialized() -> bool {
    GLOBAL_LOGGING_STATE
        .get()
        .map(|state| state.lock().unwrap().initialized)
        .unwrap_or(false)
}

/// 执行实际的日志系统初始化
fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
    init_log_tracer()?;
    init_tracing_subscriber(config)
}

/// 初始化 LogTracer（log crate 到 tracing 的桥接）
fn init_log_tracer() -> anyhow::Result<()> {
    use tracing_log::LogTracer;

    static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

    result
        .as_ref()
        .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
    Ok(())
}

/// 初始化 tracing subscriber
fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::from_default_env().add_directive(convert_level_to_directive(config.level));

    let fmt_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .boxed()
    } else {
        fmt::layer()
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_ansi(true)
            .boxed()
    };

    let result = registry().with(env_filter).with(fmt_layer).try_init();

    match result {
        Ok(()) => {
            tracing::info!("日志系统初始化完成");
            Ok(())
        }
        Err(e) => {
            let error_msg = e.to_string();
            if error_msg.contains("a global default trace dispatcher has already been set") {
                // 已经初始化过了
                tracing::debug!("日志系统已经初始化过了");
                Ok(())
            } else {
                Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", error_msg))
            }
        }
    }
}

/// 将 log::LevelFilter 转换为 tracing 的指令
fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
    use tracing_subscriber::filter::Directive;
    match level {
        LevelFilter::Off => "off".parse().unwrap(),
        LevelFilter::Error => Directive::from(tracing::Level::ERROR),
        LevelFilter::Warn => Directive::from(tracing::Level::WARN),
        LevelFilter::Info => Directive::from(tracing::Level::INFO),
        LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
        LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_from_level_str() {
        assert_eq!(
            LogConfig::from_level_str("debug", false).level,
            LevelFilter::Debug
        );
        assert_eq!(
            LogConfig::from_level_str("warn", false).level,
            LevelFilter::Warn
        );
        // 未知级别回退到info
        assert_eq!(
            LogConfig::from_level_str("verbose", false).level,
            LevelFilter::Info
        );
    }

    #[test]
    fn test_setup_logging_is_idempotent() {
        let config = LogConfig::default();

        let first = setup_logging(&config);
        assert!(first.is_ok());
        assert!(is_initialized());

        let second = setup_logging(&config);
        assert!(second.is_ok());
    }
}
