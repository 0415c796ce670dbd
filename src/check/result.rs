//! 检测结果数据结构
//!
//! 定义检测结果的状态类型、快照条目和单次运行的共享结果容器

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// API Server直连检测的标识符
pub const API_SERVER_DIRECT: &str = "api_server_direct";

/// API Server集群DNS检测的标识符
pub const API_SERVER_DNS: &str = "api_server_dns";

/// Ingress自探测的标识符
pub const ME_INGRESS: &str = "me_ingress";

/// Service自探测的标识符
pub const ME_SERVICE: &str = "me_service";

/// 邻居发现元检测的标识符
pub const NEIGHBOURHOOD_STATE: &str = "neighbourhood_state";

/// 快照中邻居列表的专用键
pub const NEIGHBOURHOOD: &str = "neighbourhood";

/// 生成单个邻居探测的标识符
///
/// 该标识符仅在一次运行的生命周期内有效，邻居成员变化后不跨运行稳定。
pub fn path_check_id(node_name: &str) -> String {
    format!("path_{node_name}")
}

/// 单个检测的终态结果
///
/// 序列化为纯字符串：`ok`、`skipped`或错误详情本身。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckOutcome {
    /// 检测成功
    Ok,
    /// 检测被配置跳过
    Skipped,
    /// 检测失败，携带错误详情
    Error(String),
}

impl CheckOutcome {
    /// 从错误详情创建失败结果
    pub fn error(detail: impl Into<String>) -> Self {
        CheckOutcome::Error(detail.into())
    }

    /// 判断是否检测成功
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckOutcome::Ok)
    }

    /// 判断是否被跳过
    pub fn is_skipped(&self) -> bool {
        matches!(self, CheckOutcome::Skipped)
    }

    /// 指标outcome标签值
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Ok => "ok",
            CheckOutcome::Skipped => "skipped",
            CheckOutcome::Error(_) => "error",
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Ok => write!(f, "ok"),
            CheckOutcome::Skipped => write!(f, "skipped"),
            CheckOutcome::Error(detail) => write!(f, "{detail}"),
        }
    }
}

impl From<CheckOutcome> for String {
    fn from(outcome: CheckOutcome) -> Self {
        outcome.to_string()
    }
}

impl From<String> for CheckOutcome {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ok" => CheckOutcome::Ok,
            "skipped" => CheckOutcome::Skipped,
            _ => CheckOutcome::Error(value),
        }
    }
}

/// 集群内的邻居节点
///
/// 每次运行从目录服务实时查询重建，除快照的邻居列表外不跨运行缓存。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// 所在节点名称
    pub node_name: String,
    /// Pod IP地址
    pub pod_ip: String,
}

impl Peer {
    /// 根据集群TLS开关推导邻居探测URL
    ///
    /// 启用TLS时为`https://<ip>:8443/alwayshappy`，否则为
    /// `http://<ip>:8080/alwayshappy`。
    pub fn probe_url(&self, use_tls: bool) -> String {
        if use_tls {
            format!("https://{}:8443/alwayshappy", self.pod_ip)
        } else {
            format!("http://{}:8080/alwayshappy", self.pod_ip)
        }
    }
}

/// 快照条目：检测结果或邻居列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultEntry {
    /// 单个检测的终态结果
    Outcome(CheckOutcome),
    /// 本次运行发现的完整邻居列表
    Peers(Vec<Peer>),
}

impl ResultEntry {
    /// 取出检测结果（条目为邻居列表时返回None）
    pub fn as_outcome(&self) -> Option<&CheckOutcome> {
        match self {
            ResultEntry::Outcome(outcome) => Some(outcome),
            ResultEntry::Peers(_) => None,
        }
    }

    /// 取出邻居列表（条目为检测结果时返回None）
    pub fn as_peers(&self) -> Option<&[Peer]> {
        match self {
            ResultEntry::Outcome(_) => None,
            ResultEntry::Peers(peers) => Some(peers),
        }
    }
}

/// 对外读取的快照类型：检测标识符到条目的映射
pub type LastCheckResult = HashMap<String, ResultEntry>;

/// 单次运行的共享结果容器
///
/// 同一次运行内每个键只写入一次，不同任务写入的键互不相交。
/// 容器在`run()`返回时整体发布；提前返回路径下，仍在执行的探测任务
/// 继续写入已发布的容器，各单元独立落定，读取方在读取时刻做快照。
#[derive(Debug, Default)]
pub struct RunResults {
    /// 结果条目映射
    entries: RwLock<LastCheckResult>,
}

impl RunResults {
    /// 创建空的结果容器
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入单个检测结果
    pub fn store_outcome(&self, check_id: &str, outcome: CheckOutcome) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(check_id.to_string(), ResultEntry::Outcome(outcome));
    }

    /// 写入完整邻居列表
    pub fn store_peers(&self, peers: Vec<Peer>) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(NEIGHBOURHOOD.to_string(), ResultEntry::Peers(peers));
    }

    /// 读取时刻的快照副本
    pub fn snapshot(&self) -> LastCheckResult {
        self.entries.read().unwrap().clone()
    }
}
