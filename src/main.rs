//! Cluster Vitals 主程序入口
//!
//! 集群内网络可达性探测工具

use anyhow::{Context, Result};
use clap::Parser;
use cluster_vitals::check::metrics::CheckMetrics;
use cluster_vitals::check::{Checker, HttpProber};
use cluster_vitals::config::{apply_env_overrides, Config, ConfigLoader, TomlConfigLoader};
use cluster_vitals::discovery::KubePeerDirectory;
use cluster_vitals::logging::{setup_logging, LogConfig};
use prometheus::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "cluster-vitals", version, about)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, env = "CLUSTER_VITALS_CONFIG")]
    config: Option<PathBuf>,

    /// 日志级别（覆盖配置文件）
    #[arg(long)]
    log_level: Option<String>,

    /// 检测间隔秒数（覆盖配置文件）
    #[arg(long)]
    interval: Option<u64>,

    /// 是否使用JSON日志格式
    #[arg(long)]
    json_log: bool,

    /// 只执行一轮检测并以JSON输出快照
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).await?;

    let log_config = LogConfig::from_level_str(
        args.log_level.as_deref().unwrap_or(&config.checker.log_level),
        args.json_log,
    );
    setup_logging(&log_config).context("初始化日志系统失败")?;

    info!("Cluster Vitals v{} 启动", cluster_vitals::VERSION);

    if let Err(e) = run(args, config).await {
        error!("运行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 加载并校验配置
///
/// 未提供配置文件时使用默认配置，环境变量覆盖始终生效。
async fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let loader = TomlConfigLoader::new(true);
            loader
                .load_from_file(path)
                .await
                .with_context(|| format!("加载配置文件失败: {}", path.display()))?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config);

    if let Some(interval) = args.interval {
        config.checker.interval_seconds = interval;
    }

    cluster_vitals::config::validate_config(&config)
        .map_err(|e| anyhow::anyhow!("配置验证失败: {}", e))?;

    Ok(config)
}

/// 构建组件并进入调度循环
async fn run(args: Args, config: Config) -> Result<()> {
    let registry = Registry::new();
    let metrics = Arc::new(
        CheckMetrics::new(&registry, &config.checker.histogram_buckets)
            .context("注册检测指标失败")?,
    );

    let prober = Arc::new(HttpProber::new(&config.checker, metrics).context("构建HTTP探测器失败")?);

    let kube_client = kube::Client::try_default()
        .await
        .context("创建Kubernetes客户端失败")?;
    let directory = Arc::new(KubePeerDirectory::new(
        kube_client,
        config.cluster.node_name.clone(),
    ));

    let interval = Duration::from_secs(config.checker.interval_seconds);
    let checker = Arc::new(Checker::new(config, prober, directory));

    if args.once {
        checker.run().await;
        let snapshot = checker.last_check_result();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    // 设置Ctrl+C信号处理
    let stopper = Arc::clone(&checker);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("收到中断信号，正在停止检测调度...");
                stopper.stop_scheduled();
            }
            Err(err) => {
                error!("监听中断信号失败: {}", err);
            }
        }
    });

    info!("检测调度已启动，间隔 {:?}", interval);
    checker.run_scheduled(interval).await;

    info!("服务已停止");
    Ok(())
}
