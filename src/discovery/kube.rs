//! Kubernetes目录服务实现
//!
//! 通过列举命名空间内匹配标签的Pod发现邻居节点

use crate::check::result::Peer;
use crate::discovery::PeerDirectory;
use crate::error::DiscoveryError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::debug;

/// 基于Kubernetes API的目录服务客户端
pub struct KubePeerDirectory {
    /// Kubernetes客户端
    client: Client,
    /// 需要排除的节点名称（探测器自身所在节点）
    exclude_node: Option<String>,
}

impl KubePeerDirectory {
    /// 创建新的目录服务客户端
    ///
    /// # 参数
    /// * `client` - Kubernetes客户端
    /// * `exclude_node` - 自身所在节点名称，发现结果中会被排除
    pub fn new(client: Client, exclude_node: Option<String>) -> Self {
        Self {
            client,
            exclude_node,
        }
    }

    /// 从Pod提取邻居信息
    ///
    /// 未调度或尚未分配IP的Pod不构成可探测的邻居。
    fn peer_from_pod(pod: &Pod) -> Option<Peer> {
        let node_name = pod.spec.as_ref()?.node_name.clone()?;
        let pod_ip = pod.status.as_ref()?.pod_ip.clone()?;

        Some(Peer { node_name, pod_ip })
    }
}

#[async_trait]
impl PeerDirectory for KubePeerDirectory {
    async fn discover(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Peer>, DiscoveryError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(label_selector);

        let pod_list = pods.list(&params).await?;

        let peers: Vec<Peer> = pod_list
            .items
            .iter()
            .filter_map(Self::peer_from_pod)
            .filter(|peer| {
                self.exclude_node
                    .as_deref()
                    .map_or(true, |own| own != peer.node_name)
            })
            .collect();

        debug!(
            "邻居发现完成，命名空间: {}，过滤器: {}，邻居数: {}",
            namespace,
            label_selector,
            peers.len()
        );

        Ok(peers)
    }
}
