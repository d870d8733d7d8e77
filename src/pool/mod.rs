//! 服务器地址池
//!
//! 把配置的服务器描述符（`host:port` 或 `@srv-name`）解析为具体的
//! `SocketAddr`，每次取出一个。服务器之间轮询，当前服务器的全部地址
//! 用完之后才解析下一个；每轮结束重新打乱服务器顺序。

use std::collections::VecDeque;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::common::{join_host_port, Address, PoolError, ServerSpec};
use crate::dns::{DnsResolver, SrvTarget};

/// RFC 2782 模式下 SRV 查询使用的协议
const SRV_PROTO: &str = "tcp";

/// 一个待连接的地址及其诊断描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: SocketAddr,
    /// 字面 IP 时为地址本身，否则为 "address (hostname)"
    pub description: String,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// 服务器地址池
///
/// 不做内部同步，设计上由单个连接循环独占并顺序调用。解析失败时
/// 轮询游标已经前进，下次调用会跳过失败的服务器；池本身从不重试。
pub struct AddressPool<R = StdRng> {
    servers: Arc<[String]>,
    cursor: usize,
    rfc2782: bool,
    rfc2782_service: String,
    resolver: Arc<dyn DnsResolver>,
    rng: R,
    host: String,
    host_is_ip: bool,
    pending: VecDeque<SocketAddr>,
}

impl AddressPool<StdRng> {
    /// 使用操作系统熵源初始化随机数
    pub fn from_entropy(
        servers: Vec<String>,
        resolver: Arc<dyn DnsResolver>,
    ) -> Result<Self, PoolError> {
        Self::new(servers, resolver, StdRng::from_entropy())
    }
}

impl<R: Rng> AddressPool<R> {
    pub fn new(
        servers: Vec<String>,
        resolver: Arc<dyn DnsResolver>,
        rng: R,
    ) -> Result<Self, PoolError> {
        if servers.is_empty() {
            return Err(PoolError::EmptyServerList);
        }
        let mut pool = Self {
            servers: servers.into(),
            cursor: 0,
            rfc2782: false,
            rfc2782_service: String::new(),
            resolver,
            rng,
            host: String::new(),
            host_is_ip: false,
            pending: VecDeque::new(),
        };
        pool.reshuffle();
        Ok(pool)
    }

    pub fn set_rfc2782(&mut self, enabled: bool, service: &str) {
        self.rfc2782 = enabled;
        self.rfc2782_service = service.to_string();
    }

    pub fn with_rfc2782(mut self, enabled: bool, service: &str) -> Self {
        self.set_rfc2782(enabled, service);
        self
    }

    /// 当前轮次的服务器顺序。重新打乱时会换成新的序列，已取得的不受影响。
    pub fn servers(&self) -> Arc<[String]> {
        self.servers.clone()
    }

    /// 最近一次解析的主机名（SRV 时为记录名）
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 当前服务器的地址已全部取出，下一次调用会解析下一个服务器
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }

    /// 游标回到第一个服务器，即刚好完成一整轮
    pub fn is_first_server_in_cycle(&self) -> bool {
        self.cycle_position() == 0
    }

    fn cycle_position(&self) -> usize {
        self.cursor % self.servers.len()
    }

    fn reshuffle(&mut self) {
        let mut order = self.servers.to_vec();
        order.shuffle(&mut self.rng);
        self.servers = order.into();
        debug!(count = self.servers.len(), "server list reshuffled");
    }

    /// 取下一个地址，必要时解析下一个服务器
    pub async fn next_address(&mut self) -> Result<Endpoint, PoolError> {
        if self.pending.is_empty() {
            self.pending = self.populate().await?;
        }

        let addr = self
            .pending
            .pop_front()
            .ok_or_else(|| PoolError::NoAddresses(self.host.clone()))?;

        let description = if self.host_is_ip {
            addr.to_string()
        } else {
            format!("{} ({})", addr, self.host)
        };

        Ok(Endpoint { addr, description })
    }

    /// 取下一个服务器的 `host:port`，不展开地址
    ///
    /// 与 [`next_address`](Self::next_address) 共用游标，但不会触发重新打乱。
    /// `@name` 取第一个 SRV 目标。
    pub async fn next_server(&mut self) -> Result<String, PoolError> {
        let selected = self.servers[self.cycle_position()].clone();
        self.cursor += 1;

        match selected.strip_prefix('@') {
            Some(name) => {
                let targets = self.lookup_srv(name).await?;
                let first = targets
                    .first()
                    .ok_or_else(|| PoolError::NoSrvTargets(name.to_string()))?;
                Ok(join_host_port(&first.target, first.port))
            }
            None => Ok(selected),
        }
    }

    async fn populate(&mut self) -> Result<VecDeque<SocketAddr>, PoolError> {
        if self.cursor >= self.servers.len() {
            self.reshuffle();
            self.cursor = 0;
        }

        let selected = self.servers[self.cursor].clone();
        self.cursor += 1;

        let result = self.resolve_server(&selected).await;
        match &result {
            Ok(addrs) => debug!(server = selected.as_str(), count = addrs.len(), "server resolved"),
            Err(e) => debug!(server = selected.as_str(), error = %e, "server resolution failed"),
        }
        result
    }

    async fn resolve_server(&mut self, selected: &str) -> Result<VecDeque<SocketAddr>, PoolError> {
        let mut addrs = VecDeque::new();

        self.host.clear();
        self.host_is_ip = false;
        match ServerSpec::parse(selected)? {
            ServerSpec::Srv(name) => {
                let targets = self.lookup_srv(&name).await?;
                for target in &targets {
                    addrs.extend(self.lookup_addresses(&target.target, target.port).await?);
                }
            }
            ServerSpec::Direct(Address::Ip(addr)) => {
                self.host = addr.ip().to_string();
                self.host_is_ip = true;
                addrs.push_back(addr);
            }
            ServerSpec::Direct(Address::Domain(host, port)) => {
                self.host = host;
                self.host_is_ip = false;
                addrs.extend(self.lookup_addresses(&self.host, port).await?);
            }
        }

        Ok(addrs)
    }

    async fn lookup_srv(&mut self, name: &str) -> Result<Vec<SrvTarget>, PoolError> {
        self.host = name.to_string();
        self.host_is_ip = false;

        let (service, proto) = if self.rfc2782 {
            (self.rfc2782_service.as_str(), SRV_PROTO)
        } else {
            ("", "")
        };

        let targets = self
            .resolver
            .lookup_srv(service, proto, name)
            .await
            .map_err(|e| PoolError::srv_lookup(name, &e))?;
        if targets.is_empty() {
            return Err(PoolError::NoSrvTargets(name.to_string()));
        }
        debug!(name = name, count = targets.len(), "SRV targets found");
        Ok(targets)
    }

    async fn lookup_addresses(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, PoolError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        let ips = self
            .resolver
            .resolve(host)
            .await
            .map_err(|e| PoolError::address_lookup(host, &e))?;
        if ips.is_empty() {
            return Err(PoolError::NoAddresses(host.to_string()));
        }
        Ok(ips.into_iter().map(|ip| SocketAddr::new(ip, port)).collect())
    }
}
