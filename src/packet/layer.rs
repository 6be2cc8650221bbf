use crate::packet::ProtocolCategory;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IpEnvelope {
    pub source_ip: Option<Value>,
    pub destination_ip: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpLayer {
    pub method: Option<Value>,
    pub path: Option<Value>,
    pub status: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DnsQuestion {
    pub qname: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DnsLayer {
    pub questions: Vec<DnsQuestion>,
}

/// TCP/UDPの送信元・宛先ポート
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PortPair {
    pub source_port: Option<Value>,
    pub destination_port: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IcmpLayer {
    pub code: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArpLayer {
    pub opcode: Option<Value>,
    #[serde(rename = "sender_IP")]
    pub sender_ip: Option<Value>,
    #[serde(rename = "sender_MAC")]
    pub sender_mac: Option<Value>,
    #[serde(rename = "target_IP")]
    pub target_ip: Option<Value>,
}

/// 分類境界で決まる、レコードの代表プロトコル層
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolLayer {
    Http(HttpLayer),
    Dns(DnsLayer),
    Tcp(PortPair),
    Udp(PortPair),
    Icmp(IcmpLayer),
    Icmpv6(Value),
    Arp(ArpLayer),
    Other,
}

impl ProtocolLayer {
    pub fn category(&self) -> ProtocolCategory {
        match self {
            ProtocolLayer::Http(_) => ProtocolCategory::Http,
            ProtocolLayer::Dns(_) => ProtocolCategory::Dns,
            ProtocolLayer::Tcp(_) => ProtocolCategory::Tcp,
            ProtocolLayer::Udp(_) => ProtocolCategory::Udp,
            ProtocolLayer::Icmp(_) => ProtocolCategory::Icmp,
            ProtocolLayer::Icmpv6(_) => ProtocolCategory::Icmpv6,
            ProtocolLayer::Arp(_) => ProtocolCategory::Arp,
            ProtocolLayer::Other => ProtocolCategory::Other,
        }
    }

    pub(crate) fn detect(raw: &serde_json::Map<String, Value>) -> Self {
        if let Some(v) = present(raw, "HTTP") {
            return ProtocolLayer::Http(lenient(v));
        }
        if let Some(v) = present(raw, "DNS") {
            return ProtocolLayer::Dns(lenient(v));
        }
        if let Some(v) = present(raw, "TCP") {
            return ProtocolLayer::Tcp(lenient(v));
        }
        if let Some(v) = present(raw, "UDP") {
            return ProtocolLayer::Udp(lenient(v));
        }
        if let Some(v) = present(raw, "ICMP") {
            return ProtocolLayer::Icmp(lenient(v));
        }
        if let Some(v) = present(raw, "ICMPv6") {
            return ProtocolLayer::Icmpv6(v.clone());
        }
        if let Some(v) = present(raw, "ARP") {
            return ProtocolLayer::Arp(lenient(v));
        }
        ProtocolLayer::Other
    }
}

/// キーが存在し、値がnullでもfalseでもなければその層があるとみなす
pub(crate) fn present<'a>(raw: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    raw.get(key)
        .filter(|v| !v.is_null() && **v != Value::Bool(false))
}

/// 形が合わない層は空の投影として扱う
pub(crate) fn lenient<T: DeserializeOwned + Default>(value: &Value) -> T {
    T::deserialize(value).unwrap_or_default()
}

/// 表示用の文字列化。文字列はそのまま、欠損は "-"。
pub fn display_value(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// 空文字やnullを欠損とみなす
pub fn is_truthy(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(_) => true,
    }
}

/// 数値または数値文字列を整数として読む
pub fn loose_int(value: &Option<Value>) -> Option<i64> {
    match value.as_ref()? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mismatched_layer_shapes_fall_back_to_empty() {
        let layer: PortPair = lenient(&json!("not an object"));
        assert_eq!(layer, PortPair::default());

        let layer: PortPair = lenient(&json!({"source_port": "443", "flags": {"syn": true}}));
        assert_eq!(layer.source_port, Some(json!("443")));
        assert_eq!(layer.destination_port, None);
    }

    #[test]
    fn arp_fields_keep_wire_names() {
        let layer: ArpLayer = lenient(&json!({
            "opcode": 1,
            "sender_IP": "10.0.0.5",
            "sender_MAC": "aa:bb:cc:dd:ee:ff",
            "target_IP": "10.0.0.9"
        }));

        assert_eq!(layer.sender_ip, Some(json!("10.0.0.5")));
        assert_eq!(layer.sender_mac, Some(json!("aa:bb:cc:dd:ee:ff")));
        assert_eq!(layer.target_ip, Some(json!("10.0.0.9")));
    }

    #[test]
    fn loose_int_accepts_numeric_strings() {
        assert_eq!(loose_int(&Some(json!(1))), Some(1));
        assert_eq!(loose_int(&Some(json!("2"))), Some(2));
        assert_eq!(loose_int(&Some(json!(0.0))), Some(0));
        assert_eq!(loose_int(&Some(json!("request"))), None);
        assert_eq!(loose_int(&None), None);
    }
}
