use anyhow::Result;
use serde::Deserialize;

use crate::common::ServerSpec;

#[derive(Debug, Deserialize)]
pub struct PoolConfig {
    /// 服务器描述符列表：`host:port` 或 `@srv-name`
    pub servers: Vec<ServerSpec>,
    /// 是否按 RFC 2782 查询 `_service._tcp.name`
    #[serde(default)]
    pub rfc2782: bool,
    #[serde(default)]
    pub rfc2782_service: String,
    /// DNS 上游，缺省时使用系统配置
    #[serde(default)]
    pub dns: Option<String>,
    #[serde(default)]
    pub log: LogConfig,
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() {
            anyhow::bail!("at least one server is required");
        }
        if self.rfc2782 && self.rfc2782_service.is_empty() {
            anyhow::bail!("rfc2782_service is required when rfc2782 is enabled");
        }
        Ok(())
    }

    /// 服务器列表的文本形式，供 [`AddressPool`](crate::pool::AddressPool) 使用
    pub fn server_list(&self) -> Vec<String> {
        self.servers.iter().map(|s| s.to_string()).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
