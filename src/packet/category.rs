use crate::packet::PacketRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolCategory {
    Http,
    Dns,
    Tcp,
    Udp,
    Icmp,
    Icmpv6,
    Arp,
    Other,
}

impl ProtocolCategory {
    /// 分類の優先順位順
    pub const ALL: [ProtocolCategory; 8] = [
        ProtocolCategory::Http,
        ProtocolCategory::Dns,
        ProtocolCategory::Tcp,
        ProtocolCategory::Udp,
        ProtocolCategory::Icmp,
        ProtocolCategory::Icmpv6,
        ProtocolCategory::Arp,
        ProtocolCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolCategory::Http => "http",
            ProtocolCategory::Dns => "dns",
            ProtocolCategory::Tcp => "tcp",
            ProtocolCategory::Udp => "udp",
            ProtocolCategory::Icmp => "icmp",
            ProtocolCategory::Icmpv6 => "icmpv6",
            ProtocolCategory::Arp => "arp",
            ProtocolCategory::Other => "other",
        }
    }

    /// 一覧のバッジに使う大文字表記
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for ProtocolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// レコードを一つのカテゴリに分類する。
/// http > dns > tcp > udp > icmp > icmpv6 > arp > other の順で最初に存在する層が勝つ。
pub fn classify(record: &PacketRecord) -> ProtocolCategory {
    record.layer().category()
}
