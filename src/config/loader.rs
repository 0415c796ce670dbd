//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换与环境变量覆盖功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;

/// 环境变量覆盖的统一前缀
pub const ENV_PREFIX: &str = "CLUSTER_VITALS_";

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    ///
    /// # 参数
    /// * `config` - 要验证的配置
    ///
    /// # 返回
    /// * `Result<()>` - 验证结果
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    ///
    /// 匹配 `${VAR_NAME}` 格式的环境变量引用。
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {e}")))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析TOML内容
    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {e}")))?;

        Ok(config)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {e}")))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        log::info!("成功加载配置文件: {}", path.display());
        log::debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        log::debug!("成功解析配置字符串");

        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 应用环境变量覆盖
///
/// 支持以`CLUSTER_VITALS_`为前缀的部署期覆盖；API Server地址缺省时
/// 回退到平台注入的`KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT`。
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(value) = env_string("INGRESS_URL") {
        config.cluster.ingress_url = value;
    }
    if let Some(value) = env_string("SERVICE_URL") {
        config.cluster.service_url = value;
    }
    if let Some(value) = env_string("NAMESPACE") {
        config.cluster.namespace = value;
    }
    if let Some(value) = env_string("NEIGHBOUR_FILTER") {
        config.cluster.neighbour_filter = value;
    }
    if let Some(value) = env_string("NODE_NAME") {
        config.cluster.node_name = Some(value);
    }

    if let Some(value) = env_parse::<u64>("INTERVAL_SECONDS") {
        config.checker.interval_seconds = value;
    }
    if let Some(value) = env_parse::<u64>("REQUEST_TIMEOUT_SECONDS") {
        config.checker.request_timeout_seconds = value;
    }
    if let Some(value) = env_parse::<usize>("NEIGHBOUR_LIMIT") {
        config.checker.neighbour_limit = value;
    }
    if let Some(value) = env_bool("USE_TLS") {
        config.checker.use_tls = value;
    }
    if let Some(value) = env_bool("INSECURE") {
        config.checker.insecure = value;
    }
    if let Some(value) = env_bool("REUSE_CONNECTIONS") {
        config.checker.reuse_connections = value;
    }
    if let Some(value) = env_string("EXTRA_CA") {
        config.checker.extra_ca_path = Some(value.into());
    }

    if let Some(value) = env_bool("CHECK_API_SERVER_DIRECT") {
        config.checks.api_server_direct = value;
    }
    if let Some(value) = env_bool("CHECK_API_SERVER_DNS") {
        config.checks.api_server_dns = value;
    }
    if let Some(value) = env_bool("CHECK_ME_INGRESS") {
        config.checks.me_ingress = value;
    }
    if let Some(value) = env_bool("CHECK_ME_SERVICE") {
        config.checks.me_service = value;
    }
    if let Some(value) = env_bool("CHECK_NEIGHBOURHOOD") {
        config.checks.neighbourhood = value;
    }

    // 平台注入的API Server端点
    if config.cluster.api_server_host.is_empty() {
        if let Ok(host) = std::env::var("KUBERNETES_SERVICE_HOST") {
            config.cluster.api_server_host = host;
        }
    }
    if let Ok(port) = std::env::var("KUBERNETES_SERVICE_PORT") {
        if let Ok(port) = port.parse() {
            config.cluster.api_server_port = port;
        }
    }
}

/// 读取带前缀的字符串环境变量
fn env_string(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

/// 读取带前缀的布尔环境变量（"true"/"1"为真）
fn env_bool(name: &str) -> Option<bool> {
    env_string(name).map(|value| value == "true" || value == "1")
}

/// 读取带前缀的可解析环境变量
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const TEST_CONFIG_TOML: &str = r#"
[checker]
interval_seconds = 10
request_timeout_seconds = 3
neighbour_limit = 5
use_tls = true

[cluster]
api_server_host = "10.96.0.1"
api_server_port = 443
ingress_url = "https://vitals.example.com"
service_url = "http://cluster-vitals.kube-system.svc:8080"
namespace = "monitoring"
neighbour_filter = "app=cluster-vitals"

[checks]
me_ingress = false
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[cluster]
api_server_host = "10.96.0.1"
ingress_url = "${VITALS_INGRESS_URL}"
service_url = "http://cluster-vitals.kube-system.svc:8080"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.checker.interval_seconds, 10);
        assert_eq!(config.checker.neighbour_limit, 5);
        assert!(config.checker.use_tls);
        assert_eq!(config.cluster.namespace, "monitoring");
        assert!(!config.checks.me_ingress);
        // 未出现的开关保持默认启用
        assert!(config.checks.api_server_direct);
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("VITALS_INGRESS_URL", "https://probe.example.com");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        assert_eq!(config.cluster.ingress_url, "https://probe.example.com");

        env::remove_var("VITALS_INGRESS_URL");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        let config_with_missing_var = r#"
[cluster]
ingress_url = "${VITALS_MISSING_VAR}"
"#;

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(config_with_missing_var).await;

        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("VITALS_MISSING_VAR"));
        }
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, TEST_CONFIG_TOML).await.unwrap();

        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_file(&path).await.unwrap();
        assert_eq!(config.cluster.api_server_host, "10.96.0.1");
    }

    #[tokio::test]
    async fn test_load_from_missing_file() {
        let loader = TomlConfigLoader::new(false);
        let result = loader.load_from_file("/nonexistent/config.toml").await;
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_apply_env_overrides() {
        env::set_var("CLUSTER_VITALS_NEIGHBOUR_LIMIT", "3");
        env::set_var("CLUSTER_VITALS_USE_TLS", "true");
        env::set_var("CLUSTER_VITALS_CHECK_ME_SERVICE", "false");
        env::set_var("CLUSTER_VITALS_NODE_NAME", "node-a");

        let mut config = Config::default();
        apply_env_overrides(&mut config);

        assert_eq!(config.checker.neighbour_limit, 3);
        assert!(config.checker.use_tls);
        assert!(!config.checks.me_service);
        assert_eq!(config.cluster.node_name.as_deref(), Some("node-a"));

        env::remove_var("CLUSTER_VITALS_NEIGHBOUR_LIMIT");
        env::remove_var("CLUSTER_VITALS_USE_TLS");
        env::remove_var("CLUSTER_VITALS_CHECK_ME_SERVICE");
        env::remove_var("CLUSTER_VITALS_NODE_NAME");
    }

    #[test]
    #[serial]
    fn test_platform_api_server_fallback() {
        env::set_var("KUBERNETES_SERVICE_HOST", "10.96.0.1");
        env::set_var("KUBERNETES_SERVICE_PORT", "6443");

        let mut config = Config::default();
        apply_env_overrides(&mut config);

        assert_eq!(config.cluster.api_server_host, "10.96.0.1");
        assert_eq!(config.cluster.api_server_port, 6443);

        env::remove_var("KUBERNETES_SERVICE_HOST");
        env::remove_var("KUBERNETES_SERVICE_PORT");
    }
}
