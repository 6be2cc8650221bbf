use crate::packet::layer::{display_value, is_truthy, loose_int, ProtocolLayer};
use crate::packet::{PacketRecord, ProtocolCategory};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;
use serde_json::Value;

/// 一覧の1行分の表示内容
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketView {
    pub seq: u64,
    pub category: ProtocolCategory,
    pub badge: String,
    pub time: String,
    pub connection: String,
    pub details: String,
}

impl PacketView {
    pub fn new(seq: u64, record: &PacketRecord) -> Self {
        let category = record.layer().category();
        Self {
            seq,
            category,
            badge: category.label(),
            time: format_timestamp(record.timestamp()),
            connection: connection_text(record),
            details: details_text(record),
        }
    }
}

/// "送信元 → 宛先"。IPv4を優先し、どちらもなければ空。
pub fn connection_text(record: &PacketRecord) -> String {
    match record.network() {
        Some(envelope) => format!(
            "{} → {}",
            display_value(&envelope.source_ip),
            display_value(&envelope.destination_ip)
        ),
        None => String::new(),
    }
}

pub fn details_text(record: &PacketRecord) -> String {
    match record.layer() {
        ProtocolLayer::Http(http) => {
            let method = if is_truthy(&http.method) {
                display_value(&http.method)
            } else {
                "Response".to_string()
            };
            let target = if is_truthy(&http.path) {
                display_value(&http.path)
            } else {
                display_value(&http.status)
            };
            format!("{} {}", method, target)
        }
        ProtocolLayer::Dns(dns) => match dns.questions.first() {
            Some(question) => display_value(&question.qname),
            None => "DNS Query".to_string(),
        },
        ProtocolLayer::Tcp(ports) | ProtocolLayer::Udp(ports) => format!(
            "Port {} → {}",
            display_value(&ports.source_port),
            display_value(&ports.destination_port)
        ),
        ProtocolLayer::Icmp(icmp) => {
            if loose_int(&icmp.code) == Some(0) {
                "echo reply".to_string()
            } else {
                "echo request".to_string()
            }
        }
        ProtocolLayer::Arp(arp) => match loose_int(&arp.opcode) {
            Some(1) => format!(
                "who has {} tell {}",
                display_value(&arp.target_ip),
                display_value(&arp.sender_ip)
            ),
            Some(2) => format!(
                "{} is at {}",
                display_value(&arp.sender_ip),
                display_value(&arp.sender_mac)
            ),
            _ => String::new(),
        },
        ProtocolLayer::Icmpv6(_) | ProtocolLayer::Other => String::new(),
    }
}

/// タイムスタンプをローカル時刻の HH:MM:SS にする。
/// 数値はエポックミリ秒、文字列はRFC 3339かタイムゾーンなしのISO 8601(ローカル時刻)。
pub fn format_timestamp(value: Option<&Value>) -> String {
    let local = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Local.timestamp_millis_opt(ms).single()),
        Some(Value::String(s)) => parse_time_str(s),
        _ => None,
    };

    local
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn parse_time_str(s: &str) -> Option<DateTime<Local>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local.from_local_datetime(&naive).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> PacketRecord {
        PacketRecord::from_value(value).unwrap()
    }

    #[test]
    fn tcp_row() {
        let packet = record(json!({
            "timestamp": 1700000000000u64,
            "IPv4": {"source_ip": "10.0.0.1", "destination_ip": "10.0.0.2"},
            "TCP": {"source_port": 443, "destination_port": 51000}
        }));

        let view = PacketView::new(7, &packet);
        let expected_time = Local
            .timestamp_millis_opt(1700000000000)
            .unwrap()
            .format("%H:%M:%S")
            .to_string();

        assert_eq!(view.seq, 7);
        assert_eq!(view.badge, "TCP");
        assert_eq!(view.connection, "10.0.0.1 → 10.0.0.2");
        assert_eq!(view.details, "Port 443 → 51000");
        assert_eq!(view.time, expected_time);
    }

    #[test]
    fn arp_request_and_reply() {
        let request = record(json!({
            "ARP": {"opcode": 1, "sender_IP": "10.0.0.5", "sender_MAC": "aa:bb:cc:dd:ee:ff", "target_IP": "10.0.0.9"}
        }));
        assert_eq!(details_text(&request), "who has 10.0.0.9 tell 10.0.0.5");

        let reply = record(json!({
            "ARP": {"opcode": "2", "sender_IP": "10.0.0.9", "sender_MAC": "11:22:33:44:55:66", "target_IP": "10.0.0.5"}
        }));
        assert_eq!(details_text(&reply), "10.0.0.9 is at 11:22:33:44:55:66");

        let unknown = record(json!({"ARP": {"opcode": 3}}));
        assert_eq!(details_text(&unknown), "");
    }

    #[test]
    fn http_request_and_response() {
        let req = record(json!({"TCP": {}, "HTTP": {"method": "GET", "path": "/index.html"}}));
        assert_eq!(details_text(&req), "GET /index.html");

        let resp = record(json!({"TCP": {}, "HTTP": {"version": "HTTP/1.1", "status": "200", "reason": "OK"}}));
        assert_eq!(details_text(&resp), "Response 200");
    }

    #[test]
    fn dns_uses_first_question() {
        let query = record(json!({"DNS": {"questions": [{"qname": "example.com"}, {"qname": "other.org"}]}}));
        assert_eq!(details_text(&query), "example.com");

        let empty = record(json!({"DNS": {"questions": []}}));
        assert_eq!(details_text(&empty), "DNS Query");
    }

    #[test]
    fn icmp_code_selects_echo_kind() {
        assert_eq!(details_text(&record(json!({"ICMP": {"code": 0}}))), "echo reply");
        assert_eq!(details_text(&record(json!({"ICMP": {"code": 8}}))), "echo request");
    }

    #[test]
    fn other_rows_have_no_connection_or_details() {
        let packet = record(json!({"ethernet": {"protocol": 2048}}));
        let view = PacketView::new(1, &packet);
        assert_eq!(view.badge, "OTHER");
        assert_eq!(view.connection, "");
        assert_eq!(view.details, "");
        assert_eq!(view.time, "-");
    }

    #[test]
    fn naive_iso_timestamps_are_local_time() {
        assert_eq!(format_timestamp(Some(&json!("2024-03-01T12:34:56.789123"))), "12:34:56");
        assert_eq!(format_timestamp(Some(&json!("2024-03-01T08:00:01"))), "08:00:01");
        assert_eq!(format_timestamp(Some(&json!("yesterday"))), "-");
        assert_eq!(format_timestamp(None), "-");
    }
}
