use rand::Rng;

/// SRV 记录中的一个目标
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SrvTarget {
    /// 目标主机，不带结尾的根点
    pub target: String,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
}

impl SrvTarget {
    pub fn new(target: impl Into<String>, port: u16) -> Self {
        Self {
            target: target.into(),
            port,
            priority: 0,
            weight: 0,
        }
    }

    pub fn with_priority(mut self, priority: u16, weight: u16) -> Self {
        self.priority = priority;
        self.weight = weight;
        self
    }
}

/// 构造 SRV 查询名：RFC 2782 形式 `_service._proto.name`，否则为裸名
pub fn srv_query_name(service: &str, proto: &str, name: &str) -> String {
    if service.is_empty() && proto.is_empty() {
        name.to_string()
    } else {
        format!("_{}._{}.{}", service, proto, name)
    }
}

/// 按 RFC 2782 排序：priority 升序，同一 priority 内按 weight 加权随机
pub fn order_srv_targets(targets: &mut [SrvTarget], rng: &mut impl Rng) {
    targets.sort_by_key(|t| t.priority);

    let mut start = 0;
    while start < targets.len() {
        let priority = targets[start].priority;
        let end = targets[start..]
            .iter()
            .position(|t| t.priority != priority)
            .map_or(targets.len(), |n| start + n);
        shuffle_by_weight(&mut targets[start..end], rng);
        start = end;
    }
}

fn shuffle_by_weight(group: &mut [SrvTarget], rng: &mut impl Rng) {
    let mut sum: u32 = group.iter().map(|t| u32::from(t.weight)).sum();
    let mut head = 0;
    while sum > 0 && group.len() - head > 1 {
        let pick = rng.gen_range(0..sum);
        let mut acc = 0u32;
        for i in head..group.len() {
            acc += u32::from(group[i].weight);
            if acc > pick {
                group.swap(head, i);
                break;
            }
        }
        sum -= u32::from(group[head].weight);
        head += 1;
    }
}
