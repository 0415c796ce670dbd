//! Cluster Vitals - 集群内网络可达性探测工具
//!
//! 这是一个用Rust编写的集群内网络可达性探测工具，支持：
//! - API Server直连与DNS路径探测
//! - Ingress与Service自身可达性探测
//! - 邻居节点动态发现与并发探测
//! - Prometheus指标记录
//! - 结构化日志记录

pub mod check;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;

// 重新导出主要类型
pub use check::{CheckOutcome, Checker, LastCheckResult, Peer, ResultEntry};
pub use config::{CheckToggles, CheckerConfig, ClusterConfig, Config};
pub use discovery::PeerDirectory;
pub use error::ClusterVitalsError;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
