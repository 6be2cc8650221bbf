use crate::packet::{classify, PacketRecord, ProtocolCategory};
use crate::storage::{HistoryStore, StoredRecord};
use serde::Serialize;

/// カテゴリごとの表示可否と検索語。
///
/// `loopback` はキャプチャ側の除外設定を表示層と共有するための値で、表示判定には使わない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    included: [bool; 8],
    loopback: bool,
    search: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            included: [true; 8],
            loopback: false,
            search: String::new(),
        }
    }
}

impl FilterConfig {
    pub fn is_included(&self, category: ProtocolCategory) -> bool {
        self.included[slot(category)]
    }

    pub fn set_included(&mut self, category: ProtocolCategory, included: bool) {
        self.included[slot(category)] = included;
    }

    pub fn loopback(&self) -> bool {
        self.loopback
    }

    pub fn set_loopback(&mut self, included: bool) {
        self.loopback = included;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }
}

// ProtocolCategory::ALL の並びと一致する
fn slot(category: ProtocolCategory) -> usize {
    category as usize
}

pub struct FilterEngine;

impl FilterEngine {
    /// レコードが現在の設定で表示対象かどうか
    pub fn matches(record: &PacketRecord, config: &FilterConfig) -> bool {
        Self::matches_lowered(record, config, &config.search().to_lowercase())
    }

    /// 履歴の順序(新しい順)を保ったまま表示対象だけを返す
    pub fn visible(history: &HistoryStore, config: &FilterConfig) -> Vec<StoredRecord> {
        let needle = config.search().to_lowercase();
        history
            .all()
            .filter(|stored| Self::matches_lowered(&stored.record, config, &needle))
            .cloned()
            .collect()
    }

    fn matches_lowered(record: &PacketRecord, config: &FilterConfig, needle: &str) -> bool {
        config.is_included(classify(record))
            && (needle.is_empty() || record.search_text().contains(needle))
    }
}
