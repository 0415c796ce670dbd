//! 配置管理模块
//!
//! 提供配置文件解析、验证和环境变量覆盖功能

pub mod loader;
pub mod types;

// 重新导出主要类型
pub use loader::{apply_env_overrides, ConfigLoader, TomlConfigLoader, ENV_PREFIX};
pub use types::{validate_config, CheckToggles, CheckerConfig, ClusterConfig, Config};
