//! 邻居发现模块
//!
//! 定义目录服务的查询契约并提供Kubernetes实现

pub mod kube;

use crate::check::result::Peer;
use crate::error::DiscoveryError;
use async_trait::async_trait;

pub use self::kube::KubePeerDirectory;

/// 目录服务客户端trait，定义邻居查询接口
///
/// 每次调用都是一次独立的实时查询，失败时返回的错误消息即
/// `neighbourhood_state`键的结果值。
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    /// 查询当前邻居集合
    ///
    /// # 参数
    /// * `namespace` - 查询的命名空间
    /// * `label_selector` - 标签过滤器
    ///
    /// # 返回
    /// * `Result<Vec<Peer>, DiscoveryError>` - 邻居列表或查询错误
    async fn discover(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Peer>, DiscoveryError>;
}
