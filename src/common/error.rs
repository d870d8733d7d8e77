use thiserror::Error;

/// 地址池错误。每一种错误都终止当前这一次解析，池内部不做重试。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("invalid hostport given: {0}")]
    InvalidHostPort(String),

    #[error("invalid port given: {0}")]
    InvalidPort(String),

    #[error("DNS SRV lookup failure \"{host}\": {reason}")]
    SrvLookup { host: String, reason: String },

    #[error("DNS SRV lookup failure \"{0}\": no targets found")]
    NoSrvTargets(String),

    #[error("DNS lookup failure \"{host}\": {reason}")]
    AddressLookup { host: String, reason: String },

    #[error("DNS lookup failure \"{0}\": no addresses found")]
    NoAddresses(String),

    #[error("server list is empty")]
    EmptyServerList,
}

impl PoolError {
    pub(crate) fn srv_lookup(host: &str, err: &anyhow::Error) -> Self {
        PoolError::SrvLookup {
            host: host.to_string(),
            reason: format!("{:#}", err),
        }
    }

    pub(crate) fn address_lookup(host: &str, err: &anyhow::Error) -> Self {
        PoolError::AddressLookup {
            host: host.to_string(),
            reason: format!("{:#}", err),
        }
    }

    /// Get the kind/category of this error.
    pub fn kind(&self) -> PoolErrorKind {
        match self {
            PoolError::InvalidHostPort(_) | PoolError::InvalidPort(_) => PoolErrorKind::Format,
            PoolError::SrvLookup { .. } | PoolError::NoSrvTargets(_) => PoolErrorKind::SrvLookup,
            PoolError::AddressLookup { .. } | PoolError::NoAddresses(_) => {
                PoolErrorKind::AddressLookup
            }
            PoolError::EmptyServerList => PoolErrorKind::Config,
        }
    }

    /// Whether this error points at the configured server list rather than DNS.
    pub fn is_config_error(&self) -> bool {
        self.kind().is_config_error()
    }
}

/// Lightweight error category for pattern matching without borrowing the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorKind {
    /// 服务器描述符格式错误（host:port 无法拆分或端口非法）
    Format,
    /// SRV 查询失败或没有记录
    SrvLookup,
    /// A/AAAA 查询失败或没有地址
    AddressLookup,
    Config,
}

impl PoolErrorKind {
    pub fn is_config_error(self) -> bool {
        matches!(self, PoolErrorKind::Format | PoolErrorKind::Config)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolErrorKind::Format => "FORMAT",
            PoolErrorKind::SrvLookup => "SRV_FAILED",
            PoolErrorKind::AddressLookup => "DNS_FAILED",
            PoolErrorKind::Config => "CONFIG",
        }
    }
}

impl From<PoolError> for std::io::Error {
    fn from(e: PoolError) -> Self {
        let kind = match e.kind() {
            PoolErrorKind::Format | PoolErrorKind::Config => std::io::ErrorKind::InvalidInput,
            _ => std::io::ErrorKind::NotFound,
        };
        std::io::Error::new(kind, e.to_string())
    }
}
