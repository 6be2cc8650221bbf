use crate::core::{MonitorError, MonitorResult};
use crate::packet::layer::{lenient, present, IpEnvelope, ProtocolLayer};
use serde_json::{Map, Value};

/// プロデューサーから受信した1パケット分のレコード。受信後は変更しない。
///
/// 受信したままのJSONオブジェクトを保持し、既知の層だけを型付きで投影しておく。
#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    raw: Map<String, Value>,
    layer: ProtocolLayer,
    ipv4: Option<IpEnvelope>,
    ipv6: Option<IpEnvelope>,
    search_text: String,
}

impl PacketRecord {
    /// テキストフレームをレコードとして解析する
    pub fn parse(text: &str) -> MonitorResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> MonitorResult<Self> {
        let raw = match value {
            Value::Object(map) => map,
            other => {
                return Err(MonitorError::MessageParse(format!(
                    "パケットレコードはJSONオブジェクトである必要があります: {}",
                    type_name(&other)
                )))
            }
        };

        let layer = ProtocolLayer::detect(&raw);
        let ipv4 = present(&raw, "IPv4").map(lenient::<IpEnvelope>);
        let ipv6 = present(&raw, "IPv6").map(lenient::<IpEnvelope>);
        // 検索は受信したキー順のシリアライズ結果に対して行う
        let search_text = serde_json::to_string(&raw)?.to_lowercase();

        Ok(Self {
            raw,
            layer,
            ipv4,
            ipv6,
            search_text,
        })
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn layer(&self) -> &ProtocolLayer {
        &self.layer
    }

    pub fn timestamp(&self) -> Option<&Value> {
        self.raw.get("timestamp")
    }

    /// IPv4があればIPv4、なければIPv6のエンベロープ
    pub fn network(&self) -> Option<&IpEnvelope> {
        self.ipv4.as_ref().or(self.ipv6.as_ref())
    }

    /// 小文字化済みの正規化文字列
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// プロデューサーが送ってくる `{"error": "..."}` 形式のエラー報告
    pub fn producer_error(&self) -> Option<&str> {
        if self.raw.len() != 1 {
            return None;
        }
        self.raw.get("error")?.as_str()
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.search_text.clone())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
