//! 地址池集成测试：SRV 展开、轮询与失败后的跳过

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use addrpool::dns::srv_query_name;
use addrpool::{AddressPool, DnsResolver, PoolError, PoolErrorKind, SrvTarget};

struct MockResolver {
    hosts: HashMap<&'static str, Vec<IpAddr>>,
    srv: HashMap<String, Vec<SrvTarget>>,
    lookups: Arc<AtomicUsize>,
}

impl MockResolver {
    fn logs_cluster(lookups: Arc<AtomicUsize>) -> Self {
        let mut hosts = HashMap::new();
        hosts.insert("a.logs.example.com", vec!["10.0.1.1".parse().unwrap()]);
        hosts.insert("b.logs.example.com", vec!["10.0.1.2".parse().unwrap()]);
        hosts.insert("backup", vec!["10.0.2.1".parse().unwrap()]);

        let mut srv = HashMap::new();
        srv.insert(
            "logs.example.com".to_string(),
            vec![
                SrvTarget::new("a.logs.example.com", 5043),
                SrvTarget::new("b.logs.example.com", 5044),
            ],
        );
        Self { hosts, srv, lookups }
    }
}

#[async_trait]
impl DnsResolver for MockResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.hosts
            .get(host)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("NXDOMAIN"))
    }

    async fn lookup_srv(&self, service: &str, proto: &str, name: &str) -> Result<Vec<SrvTarget>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.srv
            .get(&srv_query_name(service, proto, name))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("NXDOMAIN"))
    }
}

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

#[tokio::test]
async fn srv_and_plain_servers_share_one_cycle() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let resolver = Arc::new(MockResolver::logs_cluster(lookups.clone()));
    let mut pool = AddressPool::new(
        vec!["@logs.example.com".into(), "backup:9000".into()],
        resolver,
        StdRng::seed_from_u64(2014),
    )
    .unwrap();

    for _ in 0..3 {
        assert!(pool.is_first_server_in_cycle());

        let mut batches: Vec<Vec<SocketAddr>> = Vec::new();
        let mut batch = Vec::new();
        for _ in 0..3 {
            batch.push(pool.next_address().await.unwrap().addr);
            if pool.is_exhausted() {
                batches.push(std::mem::take(&mut batch));
            }
        }
        assert!(batch.is_empty());
        batches.sort_by_key(|b| b.len());
        assert_eq!(batches[0], vec![addr("10.0.2.1:9000")]);
        assert_eq!(
            batches[1],
            vec![addr("10.0.1.1:5043"), addr("10.0.1.2:5044")]
        );
    }
    assert!(pool.is_first_server_in_cycle());
    // 每轮：1 次 SRV + 2 次目标解析 + 1 次 backup
    assert_eq!(lookups.load(Ordering::SeqCst), 12);
}

#[tokio::test]
async fn failed_server_is_skipped_on_the_next_call() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let resolver = Arc::new(MockResolver::logs_cluster(lookups));
    let mut pool = AddressPool::new(
        vec!["@missing.example.com".into(), "backup:9000".into()],
        resolver,
        StdRng::seed_from_u64(7),
    )
    .unwrap();

    let mut failures = 0;
    let mut successes = 0;
    for _ in 0..6 {
        match pool.next_address().await {
            Ok(endpoint) => {
                assert_eq!(endpoint.description, "10.0.2.1:9000 (backup)");
                successes += 1;
            }
            Err(e) => {
                assert_eq!(e.kind(), PoolErrorKind::SrvLookup);
                assert_eq!(
                    e,
                    PoolError::SrvLookup {
                        host: "missing.example.com".into(),
                        reason: "NXDOMAIN".into(),
                    }
                );
                failures += 1;
            }
        }
    }
    assert_eq!(failures, 3);
    assert_eq!(successes, 3);
}

#[tokio::test]
async fn rfc2782_mode_queries_service_name() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let mut resolver = MockResolver::logs_cluster(lookups);
    resolver.srv.insert(
        "_courier._tcp.logs.example.com".to_string(),
        vec![SrvTarget::new("b.logs.example.com", 7000)],
    );
    let mut pool = AddressPool::from_entropy(vec!["@logs.example.com".into()], Arc::new(resolver))
        .unwrap()
        .with_rfc2782(true, "courier");

    let endpoint = pool.next_address().await.unwrap();
    assert_eq!(endpoint.addr, addr("10.0.1.2:7000"));
    assert_eq!(endpoint.to_string(), "10.0.1.2:7000 (logs.example.com)");
    assert_eq!(
        pool.next_server().await.unwrap(),
        "b.logs.example.com:7000"
    );
}
