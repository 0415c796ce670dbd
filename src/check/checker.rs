//! 检测编排器实现
//!
//! 执行一轮完整检测并发布结果快照，支持固定间隔调度

use crate::check::result::{
    path_check_id, CheckOutcome, LastCheckResult, RunResults, API_SERVER_DIRECT, API_SERVER_DNS,
    ME_INGRESS, ME_SERVICE, NEIGHBOURHOOD_STATE,
};
use crate::check::selector::select_peers;
use crate::check::transport::HttpProber;
use crate::config::Config;
use crate::discovery::PeerDirectory;
use futures::future;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

/// 检测编排器
///
/// 持有固定检测集与邻居派生的动态检测集，每轮运行产出一份
/// 结果快照。调度停止后不可重启，重新调度需要构造新的实例。
pub struct Checker {
    /// 静态配置
    config: Config,
    /// HTTP探测器
    prober: Arc<HttpProber>,
    /// 目录服务客户端
    directory: Arc<dyn PeerDirectory>,
    /// 当前已发布的结果容器
    last_result: RwLock<Arc<RunResults>>,
    /// 一次性停止信号发送端
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    /// 一次性停止信号接收端
    stop_rx: Mutex<Option<oneshot::Receiver<()>>>,
}

impl Checker {
    /// 创建新的检测编排器
    ///
    /// # 参数
    /// * `config` - 静态配置（检测开关、邻居上限、命名空间等）
    /// * `prober` - 进程级共享的HTTP探测器
    /// * `directory` - 目录服务客户端
    pub fn new(config: Config, prober: Arc<HttpProber>, directory: Arc<dyn PeerDirectory>) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();

        Self {
            config,
            prober,
            directory,
            last_result: RwLock::new(Arc::new(RunResults::new())),
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx: Mutex::new(Some(stop_rx)),
        }
    }

    /// 执行一轮完整检测
    ///
    /// 四个固定检测无条件并发启动。邻居发现被禁用或查询失败时记录
    /// 对应的`neighbourhood_state`结果并提前返回，此时不等待固定检测
    /// 结束：固定检测任务继续向已发布的结果容器写入，各单元独立落定。
    /// 完整路径下等待所有任务结束后再发布快照。
    pub async fn run(&self) {
        let run_id = Uuid::new_v4();
        debug!("检测运行开始: {run_id}");

        let results = Arc::new(RunResults::new());
        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(4);

        self.spawn_check(
            &results,
            &mut tasks,
            API_SERVER_DIRECT,
            self.api_server_direct_check(),
        );
        self.spawn_check(
            &results,
            &mut tasks,
            API_SERVER_DNS,
            self.api_server_dns_check(),
        );
        self.spawn_check(&results, &mut tasks, ME_INGRESS, self.me_ingress_check());
        self.spawn_check(&results, &mut tasks, ME_SERVICE, self.me_service_check());

        if !self.config.checks.neighbourhood {
            results.store_outcome(NEIGHBOURHOOD_STATE, CheckOutcome::Skipped);
            self.publish(results);
            return;
        }

        let neighbours = match self
            .directory
            .discover(
                &self.config.cluster.namespace,
                &self.config.cluster.neighbour_filter,
            )
            .await
        {
            Ok(neighbours) => neighbours,
            Err(e) => {
                warn!("邻居发现失败: {e}");
                results.store_outcome(NEIGHBOURHOOD_STATE, CheckOutcome::error(e.to_string()));
                self.publish(results);
                return;
            }
        };

        // 先记录完整邻居列表与ok状态，上限只决定哪些邻居获得探测
        results.store_outcome(NEIGHBOURHOOD_STATE, CheckOutcome::Ok);
        results.store_peers(neighbours.clone());

        let selected = select_peers(neighbours, self.config.checker.neighbour_limit);

        for peer in selected {
            let check_id = path_check_id(&peer.node_name);
            let url = peer.probe_url(self.config.checker.use_tls);
            let prober = Arc::clone(&self.prober);
            let probe_id = check_id.clone();

            self.spawn_check(&results, &mut tasks, &check_id, async move {
                prober.probe(&probe_id, &url).await
            });
        }

        future::join_all(tasks).await;
        self.publish(results);
        debug!("检测运行完成: {run_id}");
    }

    /// 按固定间隔调度检测
    ///
    /// 每个间隔滴答同步执行一轮`run()`；慢运行会推迟下一轮但不会
    /// 排队补跑，运行期间错过的滴答被合并丢弃。收到停止信号后返回，
    /// 本函数只能调用一次。
    ///
    /// # 参数
    /// * `period` - 检测间隔
    pub async fn run_scheduled(&self, period: Duration) {
        let mut stop_rx = self
            .stop_rx
            .lock()
            .unwrap()
            .take()
            .expect("run_scheduled只能调用一次");

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run().await,
                _ = &mut stop_rx => return,
            }
        }
    }

    /// 停止定时调度
    ///
    /// 一次性信号：重复调用属于调用方编程错误，直接panic。停止后
    /// 无法重启，需要构造新的`Checker`实例。
    pub fn stop_scheduled(&self) {
        let stop_tx = self
            .stop_tx
            .lock()
            .unwrap()
            .take()
            .expect("stop_scheduled只能调用一次");

        let _ = stop_tx.send(());
    }

    /// 读取最近一次运行的结果快照
    ///
    /// 可在检测运行期间被任意数量的读取方并发调用。提前返回路径下
    /// 快照可能短暂缺少仍在途的固定检测结果，相应单元随任务完成陆续
    /// 落定。
    pub fn last_check_result(&self) -> LastCheckResult {
        let current = Arc::clone(&self.last_result.read().unwrap());
        current.snapshot()
    }

    /// 发布本轮运行的结果容器
    fn publish(&self, results: Arc<RunResults>) {
        *self.last_result.write().unwrap() = results;
    }

    /// 启动单个检测任务
    ///
    /// 任务结束时将终态结果写入本轮共享容器。句柄被收集用于完整
    /// 路径的汇合等待；提前返回路径下句柄被丢弃，任务保持运行。
    fn spawn_check(
        &self,
        results: &Arc<RunResults>,
        tasks: &mut Vec<JoinHandle<()>>,
        check_id: &str,
        check: impl Future<Output = CheckOutcome> + Send + 'static,
    ) {
        let results = Arc::clone(results);
        let check_id = check_id.to_string();

        tasks.push(tokio::spawn(async move {
            let outcome = check.await;
            results.store_outcome(&check_id, outcome);
        }));
    }

    /// API Server直连检测
    fn api_server_direct_check(&self) -> impl Future<Output = CheckOutcome> + Send + 'static {
        let enabled = self.config.checks.api_server_direct;
        let prober = Arc::clone(&self.prober);
        let url = format!(
            "https://{}:{}/version",
            self.config.cluster.api_server_host, self.config.cluster.api_server_port
        );

        async move {
            if !enabled {
                return CheckOutcome::Skipped;
            }

            prober.probe(API_SERVER_DIRECT, &url).await
        }
    }

    /// API Server集群DNS检测
    fn api_server_dns_check(&self) -> impl Future<Output = CheckOutcome> + Send + 'static {
        let enabled = self.config.checks.api_server_dns;
        let prober = Arc::clone(&self.prober);
        let url = format!(
            "https://kubernetes.default.svc.cluster.local:{}/version",
            self.config.cluster.api_server_port
        );

        async move {
            if !enabled {
                return CheckOutcome::Skipped;
            }

            prober.probe(API_SERVER_DNS, &url).await
        }
    }

    /// Ingress自探测
    fn me_ingress_check(&self) -> impl Future<Output = CheckOutcome> + Send + 'static {
        let enabled = self.config.checks.me_ingress;
        let prober = Arc::clone(&self.prober);
        let url = format!("{}/alwayshappy", self.config.cluster.ingress_url);

        async move {
            if !enabled {
                return CheckOutcome::Skipped;
            }

            prober.probe(ME_INGRESS, &url).await
        }
    }

    /// Service自探测
    fn me_service_check(&self) -> impl Future<Output = CheckOutcome> + Send + 'static {
        let enabled = self.config.checks.me_service;
        let prober = Arc::clone(&self.prober);
        let url = format!("{}/alwayshappy", self.config.cluster.service_url);

        async move {
            if !enabled {
                return CheckOutcome::Skipped;
            }

            prober.probe(ME_SERVICE, &url).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::metrics::{default_histogram_buckets, CheckMetrics};
    use crate::check::result::Peer;
    use crate::error::DiscoveryError;
    use async_trait::async_trait;
    use prometheus::Registry;

    /// 返回固定邻居列表的目录服务
    struct StaticDirectory {
        peers: Vec<Peer>,
    }

    #[async_trait]
    impl PeerDirectory for StaticDirectory {
        async fn discover(
            &self,
            _namespace: &str,
            _label_selector: &str,
        ) -> Result<Vec<Peer>, DiscoveryError> {
            Ok(self.peers.clone())
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        // 测试中关闭全部固定检测，探测立即以skipped落定，不产生网络请求
        config.checks.api_server_direct = false;
        config.checks.api_server_dns = false;
        config.checks.me_ingress = false;
        config.checks.me_service = false;
        config.checker.request_timeout_seconds = 1;
        config
    }

    fn make_checker(config: Config, directory: Arc<dyn PeerDirectory>) -> Checker {
        let registry = Registry::new();
        let metrics =
            Arc::new(CheckMetrics::new(&registry, &default_histogram_buckets()).unwrap());
        let prober = Arc::new(HttpProber::new(&config.checker, metrics).unwrap());

        Checker::new(config, prober, directory)
    }

    /// 等待快照满足断言条件，提前返回路径下各单元异步落定
    async fn wait_for_snapshot(
        checker: &Checker,
        predicate: impl Fn(&LastCheckResult) -> bool,
    ) -> LastCheckResult {
        let deadline = std::time::Instant::now() + Duration::from_secs(2);

        loop {
            let snapshot = checker.last_check_result();
            if predicate(&snapshot) {
                return snapshot;
            }
            if std::time::Instant::now() > deadline {
                panic!("等待快照落定超时: {snapshot:?}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_disabled_fixed_checks_are_skipped_not_absent() {
        let mut config = test_config();
        config.checks.neighbourhood = false;

        let checker = make_checker(config, Arc::new(StaticDirectory { peers: vec![] }));
        checker.run().await;

        let snapshot = wait_for_snapshot(&checker, |s| s.len() == 5).await;
        for id in [API_SERVER_DIRECT, API_SERVER_DNS, ME_INGRESS, ME_SERVICE] {
            assert_eq!(
                snapshot[id].as_outcome(),
                Some(&CheckOutcome::Skipped),
                "检测 {id} 缺失或状态错误"
            );
        }
        assert_eq!(
            snapshot[NEIGHBOURHOOD_STATE].as_outcome(),
            Some(&CheckOutcome::Skipped)
        );
    }

    #[tokio::test]
    async fn test_discovery_failure_records_error_message() {
        struct FailingDirectory;

        #[async_trait]
        impl PeerDirectory for FailingDirectory {
            async fn discover(
                &self,
                _namespace: &str,
                _label_selector: &str,
            ) -> Result<Vec<Peer>, DiscoveryError> {
                Err(DiscoveryError::Query("connection refused".to_string()))
            }
        }

        let checker = make_checker(test_config(), Arc::new(FailingDirectory));
        checker.run().await;

        let snapshot = wait_for_snapshot(&checker, |s| s.len() == 5).await;
        assert_eq!(
            snapshot[NEIGHBOURHOOD_STATE].as_outcome(),
            Some(&CheckOutcome::error("connection refused"))
        );
        // 发现失败时不发布邻居列表，也没有任何邻居探测
        assert!(!snapshot.contains_key(crate::check::result::NEIGHBOURHOOD));
        assert!(!snapshot.keys().any(|k| k.starts_with("path_")));
    }

    #[tokio::test]
    async fn test_peer_limit_bounds_fanout_but_not_published_list() {
        let peers: Vec<Peer> = (0..10)
            .map(|i| Peer {
                node_name: format!("node-{i:02}"),
                pod_ip: "127.0.0.1".to_string(),
            })
            .collect();

        let mut config = test_config();
        config.checker.neighbour_limit = 3;

        let checker = make_checker(config, Arc::new(StaticDirectory { peers }));
        checker.run().await;

        // 完整路径在发布前等待所有任务，返回后快照即完整
        let snapshot = checker.last_check_result();
        assert_eq!(
            snapshot[NEIGHBOURHOOD_STATE].as_outcome(),
            Some(&CheckOutcome::Ok)
        );
        assert_eq!(
            snapshot[crate::check::result::NEIGHBOURHOOD]
                .as_peers()
                .unwrap()
                .len(),
            10
        );

        let path_keys: Vec<&String> =
            snapshot.keys().filter(|k| k.starts_with("path_")).collect();
        assert_eq!(path_keys.len(), 3);
    }

    #[tokio::test]
    async fn test_limit_zero_probes_every_peer() {
        let peers: Vec<Peer> = (0..4)
            .map(|i| Peer {
                node_name: format!("node-{i}"),
                pod_ip: "127.0.0.1".to_string(),
            })
            .collect();

        let mut config = test_config();
        config.checker.neighbour_limit = 0;

        let checker = make_checker(config, Arc::new(StaticDirectory { peers }));
        checker.run().await;

        let snapshot = checker.last_check_result();
        let path_keys = snapshot.keys().filter(|k| k.starts_with("path_")).count();
        assert_eq!(path_keys, 4);
    }

    #[tokio::test]
    async fn test_run_twice_yields_same_key_set() {
        let peers = vec![Peer {
            node_name: "node-a".to_string(),
            pod_ip: "127.0.0.1".to_string(),
        }];

        let checker = make_checker(test_config(), Arc::new(StaticDirectory { peers }));

        checker.run().await;
        let mut first: Vec<String> = checker.last_check_result().into_keys().collect();
        first.sort();

        checker.run().await;
        let mut second: Vec<String> = checker.last_check_result().into_keys().collect();
        second.sort();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stop_scheduled_terminates_run_scheduled() {
        let mut config = test_config();
        config.checks.neighbourhood = false;

        let checker = Arc::new(make_checker(
            config,
            Arc::new(StaticDirectory { peers: vec![] }),
        ));

        let stopper = Arc::clone(&checker);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.stop_scheduled();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            checker.run_scheduled(Duration::from_millis(20)),
        )
        .await;

        assert!(result.is_ok(), "run_scheduled未在停止信号后返回");
    }

    #[tokio::test]
    #[should_panic(expected = "stop_scheduled只能调用一次")]
    async fn test_double_stop_panics() {
        let checker = make_checker(test_config(), Arc::new(StaticDirectory { peers: vec![] }));
        checker.stop_scheduled();
        checker.stop_scheduled();
    }
}
