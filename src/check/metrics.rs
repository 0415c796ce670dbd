//! Prometheus指标模块
//!
//! 按检测标识符记录探测耗时直方图与结果计数器

use crate::check::result::CheckOutcome;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::time::Duration;

/// 指标命名空间
pub const METRICS_NAMESPACE: &str = "cluster_vitals";

/// 默认的耗时直方图桶边界（秒）
pub fn default_histogram_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// 检测指标收集器
///
/// 每个出站探测请求以自身的检测标识符打标，耗时与结果都归因到该标识符。
#[derive(Debug)]
pub struct CheckMetrics {
    /// 探测耗时直方图
    check_duration: HistogramVec,
    /// 探测结果计数器
    check_total: CounterVec,
    /// 探测错误计数器
    check_errors_total: CounterVec,
}

impl CheckMetrics {
    /// 创建指标收集器并注册到给定的注册表
    ///
    /// # 参数
    /// * `registry` - 调用方持有的Prometheus注册表
    /// * `buckets` - 耗时直方图桶边界（秒）
    ///
    /// # 返回
    /// * `Result<Self, prometheus::Error>` - 收集器实例或注册错误
    pub fn new(registry: &Registry, buckets: &[f64]) -> Result<Self, prometheus::Error> {
        let check_duration = HistogramVec::new(
            HistogramOpts::new(
                format!("{METRICS_NAMESPACE}_check_duration_seconds"),
                "Duration of reachability checks in seconds",
            )
            .buckets(buckets.to_vec()),
            &["check"],
        )?;

        let check_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_check_total"),
                "Total number of reachability checks by outcome",
            ),
            &["check", "outcome"],
        )?;

        let check_errors_total = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_check_errors_total"),
                "Total number of failed reachability checks",
            ),
            &["check"],
        )?;

        registry.register(Box::new(check_duration.clone()))?;
        registry.register(Box::new(check_total.clone()))?;
        registry.register(Box::new(check_errors_total.clone()))?;

        Ok(Self {
            check_duration,
            check_total,
            check_errors_total,
        })
    }

    /// 记录一次探测的耗时与结果
    pub fn observe(&self, check_id: &str, duration: Duration, outcome: &CheckOutcome) {
        self.check_duration
            .with_label_values(&[check_id])
            .observe(duration.as_secs_f64());

        self.check_total
            .with_label_values(&[check_id, outcome.label()])
            .inc();

        if let CheckOutcome::Error(_) = outcome {
            self.check_errors_total.with_label_values(&[check_id]).inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::result::API_SERVER_DIRECT;

    #[test]
    fn test_metrics_creation_and_registration() {
        let registry = Registry::new();
        let metrics = CheckMetrics::new(&registry, &default_histogram_buckets());
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        let _first = CheckMetrics::new(&registry, &default_histogram_buckets()).unwrap();
        let second = CheckMetrics::new(&registry, &default_histogram_buckets());
        assert!(second.is_err());
    }

    #[test]
    fn test_observe_records_duration_and_outcome() {
        let registry = Registry::new();
        let metrics = CheckMetrics::new(&registry, &default_histogram_buckets()).unwrap();

        metrics.observe(
            API_SERVER_DIRECT,
            Duration::from_millis(42),
            &CheckOutcome::Ok,
        );
        metrics.observe(
            API_SERVER_DIRECT,
            Duration::from_millis(120),
            &CheckOutcome::error("connection refused"),
        );

        let families = registry.gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert!(names.contains(&"cluster_vitals_check_duration_seconds"));
        assert!(names.contains(&"cluster_vitals_check_total"));
        assert!(names.contains(&"cluster_vitals_check_errors_total"));

        let errors = families
            .iter()
            .find(|f| f.get_name() == "cluster_vitals_check_errors_total")
            .unwrap();
        assert_eq!(errors.get_metric()[0].get_counter().get_value(), 1.0);
    }

    #[test]
    fn test_skipped_outcome_not_counted_as_error() {
        let registry = Registry::new();
        let metrics = CheckMetrics::new(&registry, &default_histogram_buckets()).unwrap();

        metrics.observe(
            API_SERVER_DIRECT,
            Duration::from_millis(1),
            &CheckOutcome::Skipped,
        );

        let families = registry.gather();
        let errors = families
            .iter()
            .find(|f| f.get_name() == "cluster_vitals_check_errors_total")
            .unwrap();
        assert!(errors.get_metric().is_empty());
    }
}
