use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig,
    ResolverOpts,
};
use hickory_resolver::TokioAsyncResolver;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::types::PoolConfig;

use super::srv::{order_srv_targets, srv_query_name, SrvTarget};
use super::DnsResolver;

/// 系统 DNS 解析器（使用 tokio::net::lookup_host），不支持 SRV
pub struct SystemResolver;

#[async_trait]
impl DnsResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        let addrs: Vec<IpAddr> = tokio::net::lookup_host(format!("{}:0", host))
            .await?
            .map(|a| a.ip())
            .collect();
        if addrs.is_empty() {
            anyhow::bail!("no addresses for {}", host);
        }
        debug!(host = host, count = addrs.len(), "system DNS resolved");
        Ok(addrs)
    }
}

/// 基于 hickory-resolver 的 DNS 解析器
///
/// 同时查询 A 与 AAAA，且不缓存结果：地址池每轮都会重新解析。
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
    /// SRV 同优先级内按权重排序用
    rng: Mutex<StdRng>,
}

impl HickoryResolver {
    /// 使用指定上游，格式见 [`parse_dns_address`]
    pub fn new(address: &str) -> Result<Self> {
        let (config, opts) = parse_dns_address(address)?;
        info!(address = address, "Hickory DNS resolver created");
        Ok(Self::from_parts(config, opts))
    }

    /// 使用系统配置（/etc/resolv.conf 等）
    pub fn from_system_conf() -> Result<Self> {
        let (config, opts) = hickory_resolver::system_conf::read_system_conf()?;
        info!("Hickory DNS resolver created from system configuration");
        Ok(Self::from_parts(config, lookup_opts(opts)))
    }

    fn from_parts(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// 替换 SRV 排序使用的随机数源
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }
}

/// 双栈查询，关闭内部缓存
fn lookup_opts(mut opts: ResolverOpts) -> ResolverOpts {
    opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
    opts.cache_size = 0;
    opts
}

#[async_trait]
impl DnsResolver for HickoryResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        let response = self.resolver.lookup_ip(host).await?;
        let addrs: Vec<IpAddr> = response.iter().collect();
        if addrs.is_empty() {
            anyhow::bail!("no addresses for {}", host);
        }
        debug!(host = host, count = addrs.len(), "hickory DNS resolved");
        Ok(addrs)
    }

    async fn lookup_srv(&self, service: &str, proto: &str, name: &str) -> Result<Vec<SrvTarget>> {
        let query = srv_query_name(service, proto, name);
        let response = self.resolver.srv_lookup(query.as_str()).await?;
        let mut targets: Vec<SrvTarget> = response
            .iter()
            .map(|srv| SrvTarget {
                target: srv.target().to_utf8().trim_end_matches('.').to_string(),
                port: srv.port(),
                priority: srv.priority(),
                weight: srv.weight(),
            })
            .collect();
        {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            order_srv_targets(&mut targets, &mut *rng);
        }
        debug!(query = query.as_str(), count = targets.len(), "hickory SRV resolved");
        Ok(targets)
    }
}

/// 解析 DNS 上游地址字符串：`ip`、`ip:port`、`[ipv6]:port` 走 UDP，
/// `tls://` 前缀走 DNS over TLS
fn parse_dns_address(address: &str) -> Result<(ResolverConfig, ResolverOpts)> {
    let mut opts = lookup_opts(ResolverOpts::default());
    opts.use_hosts_file = false;

    if let Some(tls_addr) = address.strip_prefix("tls://") {
        let (ip, port) = parse_ip_port(tls_addr, 853)?;
        let ns = NameServerConfig {
            socket_addr: std::net::SocketAddr::new(ip, port),
            protocol: Protocol::Tls,
            tls_dns_name: Some(ip.to_string()),
            trust_negative_responses: true,
            tls_config: None,
            bind_addr: None,
        };
        let config =
            ResolverConfig::from_parts(None, vec![], NameServerConfigGroup::from(vec![ns]));
        Ok((config, opts))
    } else {
        let (ip, port) = parse_ip_port(address, 53)?;
        let group = NameServerConfigGroup::from_ips_clear(&[ip], port, true);
        let config = ResolverConfig::from_parts(None, vec![], group);
        Ok((config, opts))
    }
}

/// 解析 "ip" 或 "ip:port" 或 "[ipv6]" 或 "[ipv6]:port" 格式
fn parse_ip_port(s: &str, default_port: u16) -> Result<(IpAddr, u16)> {
    if let Ok(ip) = s.parse::<IpAddr>() {
        return Ok((ip, default_port));
    }
    if let Ok(addr) = s.parse::<std::net::SocketAddr>() {
        return Ok((addr.ip(), addr.port()));
    }
    let stripped = s.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = stripped.parse::<IpAddr>() {
        return Ok((ip, default_port));
    }
    anyhow::bail!("invalid DNS address: {}", s)
}

/// 根据配置构建 DNS 解析器
///
/// 未指定上游时使用系统配置；系统配置不可用时退回 [`SystemResolver`]，
/// 此时 `@name` 形式的服务器无法解析。
pub fn build_resolver(config: &PoolConfig) -> Result<Arc<dyn DnsResolver>> {
    if let Some(address) = config.dns.as_deref() {
        return Ok(Arc::new(HickoryResolver::new(address)?));
    }
    match HickoryResolver::from_system_conf() {
        Ok(resolver) => Ok(Arc::new(resolver)),
        Err(e) => {
            warn!(error = %e, "system DNS configuration unavailable, SRV lookups disabled");
            Ok(Arc::new(SystemResolver))
        }
    }
}
