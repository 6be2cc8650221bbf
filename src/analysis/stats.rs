use crate::packet::{classify, PacketRecord, ProtocolCategory};
use serde::Serialize;

/// カテゴリ別とトータルのパケット数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: u64,
    pub http: u64,
    pub dns: u64,
    pub tcp: u64,
    pub udp: u64,
    pub icmp: u64,
    pub icmpv6: u64,
    pub arp: u64,
    pub other: u64,
}

impl Stats {
    pub fn get(&self, category: ProtocolCategory) -> u64 {
        match category {
            ProtocolCategory::Http => self.http,
            ProtocolCategory::Dns => self.dns,
            ProtocolCategory::Tcp => self.tcp,
            ProtocolCategory::Udp => self.udp,
            ProtocolCategory::Icmp => self.icmp,
            ProtocolCategory::Icmpv6 => self.icmpv6,
            ProtocolCategory::Arp => self.arp,
            ProtocolCategory::Other => self.other,
        }
    }

    fn counter_mut(&mut self, category: ProtocolCategory) -> &mut u64 {
        match category {
            ProtocolCategory::Http => &mut self.http,
            ProtocolCategory::Dns => &mut self.dns,
            ProtocolCategory::Tcp => &mut self.tcp,
            ProtocolCategory::Udp => &mut self.udp,
            ProtocolCategory::Icmp => &mut self.icmp,
            ProtocolCategory::Icmpv6 => &mut self.icmpv6,
            ProtocolCategory::Arp => &mut self.arp,
            ProtocolCategory::Other => &mut self.other,
        }
    }
}

#[derive(Debug, Default)]
pub struct StatsAggregator {
    stats: Stats,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, record: &PacketRecord) {
        let category = classify(record);
        self.stats.total += 1;
        *self.stats.counter_mut(category) += 1;
    }

    pub fn reset(&mut self) {
        self.stats = Stats::default();
    }

    pub fn snapshot(&self) -> Stats {
        self.stats.clone()
    }
}
