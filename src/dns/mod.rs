pub mod resolver;
pub mod srv;

use std::net::IpAddr;

use anyhow::Result;
use async_trait::async_trait;

pub use resolver::{build_resolver, HickoryResolver, SystemResolver};
pub use srv::{order_srv_targets, srv_query_name, SrvTarget};

/// DNS 解析器 trait
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// 将域名解析为 IP 地址列表（A/AAAA）
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>>;

    /// 查询 SRV 记录
    ///
    /// `service`/`proto` 为空时直接查询 `name` 本身，否则查询
    /// `_service._proto.name`。返回顺序即调用方使用目标的顺序。
    async fn lookup_srv(&self, service: &str, proto: &str, name: &str) -> Result<Vec<SrvTarget>> {
        anyhow::bail!(
            "SRV lookup not supported by this resolver: {}",
            srv_query_name(service, proto, name)
        )
    }
}
