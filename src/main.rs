use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use addrpool::config::{load_config, PoolConfig};
use addrpool::dns::build_resolver;
use addrpool::{AddressPool, PoolError, ServerSpec};

/// 依次列出地址池给出的连接地址
#[derive(Debug, Parser)]
#[command(name = "addrpool", version)]
struct Args {
    /// YAML 配置文件
    #[arg(short, long)]
    config: Option<String>,

    /// 服务器描述符（host:port 或 @srv-name），与 --config 互斥
    #[arg(conflicts_with = "config")]
    servers: Vec<String>,

    /// 启用 RFC 2782 查询并指定服务名
    #[arg(long)]
    rfc2782_service: Option<String>,

    /// DNS 上游（ip、ip:port 或 tls://ip）
    #[arg(long)]
    dns: Option<String>,

    /// 取出的条目数
    #[arg(short = 'n', long, default_value_t = 10)]
    count: usize,

    /// 只输出服务器的 host:port，不展开地址
    #[arg(long)]
    servers_only: bool,

    /// 固定随机种子，便于复现顺序
    #[arg(long)]
    seed: Option<u64>,

    /// 完成一整轮后的等待时间（毫秒）
    #[arg(long, default_value_t = 0)]
    cycle_delay_ms: u64,
}

fn config_from_args(args: &Args) -> Result<PoolConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let servers = args
                .servers
                .iter()
                .map(|s| s.parse::<ServerSpec>())
                .collect::<Result<Vec<_>, PoolError>>()?;
            PoolConfig {
                servers,
                rfc2782: false,
                rfc2782_service: String::new(),
                dns: None,
                log: Default::default(),
            }
        }
    };
    if let Some(service) = &args.rfc2782_service {
        config.rfc2782 = true;
        config.rfc2782_service = service.clone();
    }
    if args.dns.is_some() {
        config.dns = args.dns.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config_from_args(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .init();

    let resolver = build_resolver(&config)?;
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut pool = AddressPool::new(config.server_list(), resolver, rng)?
        .with_rfc2782(config.rfc2782, &config.rfc2782_service);
    info!(servers = config.servers.len(), "address pool ready");

    for _ in 0..args.count {
        if args.servers_only {
            match pool.next_server().await {
                Ok(server) => println!("{}", server),
                Err(e) => warn!(error = %e, kind = e.kind().as_str(), "server lookup failed"),
            }
        } else {
            match pool.next_address().await {
                Ok(endpoint) => println!("{}", endpoint),
                Err(e) => warn!(error = %e, kind = e.kind().as_str(), "address lookup failed"),
            }
        }

        if args.cycle_delay_ms > 0 && pool.is_exhausted() && pool.is_first_server_in_cycle() {
            info!(delay_ms = args.cycle_delay_ms, "server cycle complete");
            tokio::time::sleep(Duration::from_millis(args.cycle_delay_ms)).await;
        }
    }

    Ok(())
}
