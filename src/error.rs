//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Cluster Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum ClusterVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 邻居发现相关错误
    #[error("邻居发现错误: {0}")]
    Discovery(#[from] DiscoveryError),

    /// HTTP传输层相关错误
    #[error("传输层错误: {0}")]
    Transport(#[from] TransportError),

    /// 指标注册错误
    #[error("指标注册失败: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 邻居发现错误类型
///
/// Display输出即目录查询失败的原始消息，`neighbourhood_state`
/// 键直接存储该字符串。
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Kubernetes API错误
    #[error("{0}")]
    Kube(#[from] kube::Error),

    /// 目录服务查询失败
    #[error("{0}")]
    Query(String),
}

/// HTTP传输层错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// CA证书读取失败
    #[error("CA证书读取失败: {0}")]
    CaRead(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ClusterVitalsError>;
