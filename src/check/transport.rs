//! HTTP探测执行层
//!
//! 提供共享HTTP客户端的构建与单次探测请求的执行，探测耗时与结果
//! 按检测标识符记录到Prometheus指标

use crate::check::metrics::CheckMetrics;
use crate::check::result::CheckOutcome;
use crate::config::CheckerConfig;
use crate::error::{Result, TransportError};
use reqwest::{Certificate, Client};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// HTTP探测器
///
/// 持有进程级共享的HTTP客户端（连接池在构建时初始化一次，编排器
/// 不负责销毁）与指标收集器。
#[derive(Debug)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
    /// 指标收集器
    metrics: Arc<CheckMetrics>,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// 额外CA证书加载失败时记录警告并降级到默认TLS配置，不会失败。
    ///
    /// # 参数
    /// * `config` - 探测器配置
    /// * `metrics` - 指标收集器
    ///
    /// # 返回
    /// * `Result<Self>` - 探测器实例
    pub fn new(config: &CheckerConfig, metrics: Arc<CheckMetrics>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .min_tls_version(reqwest::tls::Version::TLS_1_2);

        if let Some(ref ca_path) = config.extra_ca_path {
            match load_extra_ca(ca_path) {
                Ok(certificates) => {
                    for certificate in certificates {
                        builder = builder.add_root_certificate(certificate);
                    }
                }
                Err(e) => {
                    warn!(
                        "无法加载额外CA证书 {}，继续使用默认TLS配置: {}",
                        ca_path.display(),
                        e
                    );
                }
            }
        }

        if config.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if !config.reuse_connections {
            builder = builder.pool_max_idle_per_host(0);
        }

        let client = builder.build().map_err(TransportError::ClientBuild)?;

        Ok(Self { client, metrics })
    }

    /// 执行单次探测请求
    ///
    /// 单次请求失败立即产生错误结果，不做内部重试；超时由共享客户端
    /// 的固定超时强制执行。
    ///
    /// # 参数
    /// * `check_id` - 检测标识符，用于指标归因
    /// * `url` - 探测目标URL
    ///
    /// # 返回
    /// * `CheckOutcome` - 终态结果
    pub async fn probe(&self, check_id: &str, url: &str) -> CheckOutcome {
        let start = Instant::now();
        let response = self.client.get(url).send().await;
        let elapsed = start.elapsed();

        let outcome = match response {
            Ok(response) if response.status().is_success() => CheckOutcome::Ok,
            Ok(response) => {
                let status = response.status();
                CheckOutcome::error(format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ))
            }
            Err(e) => CheckOutcome::error(format_request_error(&e)),
        };

        self.metrics.observe(check_id, elapsed, &outcome);
        outcome
    }
}

/// 从PEM文件加载额外CA证书
fn load_extra_ca(path: &std::path::Path) -> std::result::Result<Vec<Certificate>, TransportError> {
    let pem = std::fs::read(path)
        .map_err(|e| TransportError::CaRead(format!("{}: {}", path.display(), e)))?;

    let certificates = Certificate::from_pem_bundle(&pem)
        .map_err(|e| TransportError::CaRead(format!("{}: {}", path.display(), e)))?;

    if certificates.is_empty() {
        return Err(TransportError::CaRead(format!(
            "{}: 文件中不包含任何证书",
            path.display()
        )));
    }

    Ok(certificates)
}

/// 格式化请求错误信息，使其更加清晰易读
fn format_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_request() {
        "Invalid request".to_string()
    } else if let Some(status) = error.status() {
        format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
    } else {
        let error_str = error.to_string();
        if error_str.contains("dns") || error_str.contains("DNS") {
            "DNS resolution failed".to_string()
        } else if error_str.contains("certificate")
            || error_str.contains("tls")
            || error_str.contains("ssl")
        {
            "SSL/TLS certificate error".to_string()
        } else {
            format!("Request failed: {error_str}")
        }
    }
}
