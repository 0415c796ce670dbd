//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::check::metrics::default_histogram_buckets;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 主配置结构，包含探测器、集群与检测开关配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 探测器配置项
    #[serde(default)]
    pub checker: CheckerConfig,
    /// 集群端点配置项
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// 各项检测的启用开关
    #[serde(default)]
    pub checks: CheckToggles,
}

/// 探测器配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckerConfig {
    /// 检测间隔（秒）
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// 邻居探测上限，0表示不限制
    #[serde(default = "default_neighbour_limit")]
    pub neighbour_limit: usize,
    /// 邻居探测是否使用TLS（HTTPS:8443，否则HTTP:8080）
    #[serde(default)]
    pub use_tls: bool,
    /// 是否跳过TLS证书校验
    #[serde(default)]
    pub insecure: bool,
    /// 是否复用HTTP连接（默认关闭，每次探测完整建连）
    #[serde(default)]
    pub reuse_connections: bool,
    /// 额外CA证书PEM文件路径
    pub extra_ca_path: Option<PathBuf>,
    /// 耗时直方图桶边界（秒）
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// 集群端点配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterConfig {
    /// API Server直连地址
    #[serde(default)]
    pub api_server_host: String,
    /// API Server端口
    #[serde(default = "default_api_server_port")]
    pub api_server_port: u16,
    /// 自身Ingress入口URL
    #[serde(default)]
    pub ingress_url: String,
    /// 自身Service入口URL
    #[serde(default)]
    pub service_url: String,
    /// 邻居所在命名空间
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// 邻居标签过滤器
    #[serde(default = "default_neighbour_filter")]
    pub neighbour_filter: String,
    /// 自身所在节点名称，邻居发现时被排除
    pub node_name: Option<String>,
}

/// 各项检测的启用开关
///
/// 被禁用的检测在每次运行的快照中以`skipped`出现，从不缺失。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckToggles {
    /// API Server直连检测
    #[serde(default = "default_enabled")]
    pub api_server_direct: bool,
    /// API Server集群DNS检测
    #[serde(default = "default_enabled")]
    pub api_server_dns: bool,
    /// Ingress自探测
    #[serde(default = "default_enabled")]
    pub me_ingress: bool,
    /// Service自探测
    #[serde(default = "default_enabled")]
    pub me_service: bool,
    /// 邻居发现与邻居探测
    #[serde(default = "default_enabled")]
    pub neighbourhood: bool,
}

// 默认值函数
fn default_interval() -> u64 {
    5
}
fn default_timeout() -> u64 {
    5
}
fn default_neighbour_limit() -> usize {
    10
}
fn default_api_server_port() -> u16 {
    443
}
fn default_namespace() -> String {
    "kube-system".to_string()
}
fn default_neighbour_filter() -> String {
    "app.kubernetes.io/name=cluster-vitals".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_enabled() -> bool {
    true
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            request_timeout_seconds: default_timeout(),
            neighbour_limit: default_neighbour_limit(),
            use_tls: false,
            insecure: false,
            reuse_connections: false,
            extra_ca_path: None,
            histogram_buckets: default_histogram_buckets(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_server_host: String::new(),
            api_server_port: default_api_server_port(),
            ingress_url: String::new(),
            service_url: String::new(),
            namespace: default_namespace(),
            neighbour_filter: default_neighbour_filter(),
            node_name: None,
        }
    }
}

impl Default for CheckToggles {
    fn default() -> Self {
        Self {
            api_server_direct: true,
            api_server_dns: true,
            me_ingress: true,
            me_service: true,
            neighbourhood: true,
        }
    }
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.checker.interval_seconds == 0 {
        return Err("检测间隔不能为0".to_string());
    }

    if config.checker.request_timeout_seconds == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    if config.checker.histogram_buckets.is_empty() {
        return Err("直方图桶边界不能为空".to_string());
    }

    let mut previous = f64::NEG_INFINITY;
    for bucket in &config.checker.histogram_buckets {
        if *bucket <= previous {
            return Err("直方图桶边界必须严格递增".to_string());
        }
        previous = *bucket;
    }

    // 验证日志级别
    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.checker.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.checker.log_level, valid_log_levels
        ));
    }

    if config.checks.api_server_direct && config.cluster.api_server_host.is_empty() {
        return Err("启用api_server_direct检测时必须配置api_server_host".to_string());
    }

    if config.checks.me_ingress && config.cluster.ingress_url.is_empty() {
        return Err("启用me_ingress检测时必须配置ingress_url".to_string());
    }

    if config.checks.me_service && config.cluster.service_url.is_empty() {
        return Err("启用me_service检测时必须配置service_url".to_string());
    }

    Ok(())
}
