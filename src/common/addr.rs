use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;

use super::error::PoolError;

/// 已拆分的连接目标：字面 IP 或待解析的域名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Ip(SocketAddr),
    Domain(String, u16),
}

impl Address {
    /// 由 host 与端口构造，host 为字面 IP 时直接得到 `Address::Ip`
    pub fn new(host: &str, port: u16) -> Self {
        match host.parse::<IpAddr>() {
            Ok(ip) => Address::Ip(SocketAddr::new(ip, port)),
            Err(_) => Address::Domain(host.to_string(), port),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Address::Ip(addr) => addr.port(),
            Address::Domain(_, port) => *port,
        }
    }

    pub fn host(&self) -> String {
        match self {
            Address::Ip(addr) => addr.ip().to_string(),
            Address::Domain(domain, _) => domain.clone(),
        }
    }

    pub fn is_ip(&self) -> bool {
        matches!(self, Address::Ip(_))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ip(addr) => write!(f, "{}", addr),
            Address::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

/// 服务器描述符
///
/// `@name` 表示通过 SRV 记录间接给出目标，其余一律按 `host:port` 处理。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServerSpec {
    Direct(Address),
    Srv(String),
}

impl ServerSpec {
    pub fn parse(s: &str) -> Result<Self, PoolError> {
        if let Some(name) = s.strip_prefix('@') {
            return Ok(ServerSpec::Srv(name.to_string()));
        }
        let (host, port_str) = split_host_port(s)?;
        let port = port_str
            .parse::<u16>()
            .ok()
            .filter(|_| !port_str.starts_with('+'))
            .ok_or_else(|| PoolError::InvalidPort(port_str.to_string()))?;
        Ok(ServerSpec::Direct(Address::new(host, port)))
    }

    pub fn is_srv(&self) -> bool {
        matches!(self, ServerSpec::Srv(_))
    }
}

impl fmt::Display for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerSpec::Direct(addr) => write!(f, "{}", addr),
            ServerSpec::Srv(name) => write!(f, "@{}", name),
        }
    }
}

impl std::str::FromStr for ServerSpec {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServerSpec::parse(s)
    }
}

impl<'de> Deserialize<'de> for ServerSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ServerSpec::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// 拆分 "host:port" 或 "[ipv6]:port"
///
/// 不带方括号的 host 中不允许出现冒号，端口部分原样返回，由调用方校验。
pub fn split_host_port(s: &str) -> Result<(&str, &str), PoolError> {
    let invalid = || PoolError::InvalidHostPort(s.to_string());

    if let Some(rest) = s.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
        let port = after.strip_prefix(':').ok_or_else(invalid)?;
        if host.contains('[') || port.contains(['[', ']']) {
            return Err(invalid());
        }
        return Ok((host, port));
    }

    let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
    if host.contains([':', '[', ']']) || port.contains(['[', ']']) {
        return Err(invalid());
    }
    Ok((host, port))
}

/// 组合 host 与端口，IPv6 字面地址加方括号
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
