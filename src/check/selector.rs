//! 邻居选择器
//!
//! 将任意规模的邻居集合收敛到配置的上限以内

use crate::check::result::Peer;

/// 按上限筛选邻居
///
/// 选择策略：按节点名称排序后截断，保证同一邻居集合在任何节点上
/// 产生相同的选择结果，便于测试与排障。
///
/// # 参数
/// * `peers` - 本次运行发现的邻居列表
/// * `limit` - 配置的邻居上限，0表示不限制
///
/// # 返回
/// * `Vec<Peer>` - 至多`limit`个邻居；`limit`为0或列表未超限时原样返回
pub fn select_peers(mut peers: Vec<Peer>, limit: usize) -> Vec<Peer> {
    if limit == 0 || peers.len() <= limit {
        return peers;
    }

    peers.sort_by(|a, b| a.node_name.cmp(&b.node_name));
    peers.truncate(limit);
    peers
}
