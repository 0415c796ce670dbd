//! 检测编排模块
//!
//! 提供固定检测与邻居检测的并发编排、结果聚合和定时调度功能

pub mod checker;
pub mod metrics;
pub mod result;
pub mod selector;
pub mod transport;

// 重新导出主要类型
pub use checker::Checker;
pub use metrics::CheckMetrics;
pub use result::{CheckOutcome, LastCheckResult, Peer, ResultEntry, RunResults};
pub use selector::select_peers;
pub use transport::HttpProber;
