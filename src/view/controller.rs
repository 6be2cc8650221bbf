use crate::analysis::{Stats, StatsAggregator};
use crate::core::config::HistoryConfig;
use crate::packet::{PacketRecord, PacketView, ProtocolCategory};
use crate::storage::{HistoryStore, StoredRecord};
use crate::view::filter::{FilterConfig, FilterEngine};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_DISPLAY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 表示層に渡すユーザー向けの通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// 1セッション分の状態(統計・履歴・フィルタ・表示中の一覧)を持つコンテキスト。
///
/// 表示中の一覧は常に「フィルタを通った履歴の先頭 `display_limit` 件」に保たれる。
#[derive(Debug)]
pub struct ViewController {
    stats: StatsAggregator,
    history: HistoryStore,
    filter: FilterConfig,
    display_limit: usize,
    visible: Vec<StoredRecord>,
    notifications: VecDeque<Notification>,
}

impl ViewController {
    pub fn new(capacity: usize, display_limit: usize) -> Self {
        Self {
            stats: StatsAggregator::new(),
            history: HistoryStore::new(capacity),
            filter: FilterConfig::default(),
            display_limit,
            visible: Vec::with_capacity(display_limit.min(DEFAULT_DISPLAY_LIMIT)),
            notifications: VecDeque::new(),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.capacity, config.display_limit)
    }

    /// 受信したレコードを統計と履歴に反映し、表示中の一覧を更新する
    pub fn ingest(&mut self, record: PacketRecord) -> u64 {
        self.stats.update(&record);
        let passes = FilterEngine::matches(&record, &self.filter);
        let seq = self.history.insert(record);

        if passes {
            if let Some(stored) = self.history.get(seq) {
                self.visible.insert(0, stored.clone());
                self.visible.truncate(self.display_limit);
            }
        }

        // 追い出された末尾のレコードが表示中なら外す
        if let Some(oldest) = self.history.oldest_seq() {
            self.visible.retain(|stored| stored.seq >= oldest);
        }
        seq
    }

    pub fn set_filter(&mut self, category: ProtocolCategory, included: bool) {
        self.filter.set_included(category, included);
        self.refresh();
    }

    pub fn set_loopback(&mut self, included: bool) {
        self.filter.set_loopback(included);
        self.refresh();
    }

    pub fn set_search(&mut self, term: &str) {
        self.filter.set_search(term);
        self.refresh();
    }

    /// 履歴と統計だけを消す。フィルタ設定はそのまま
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.stats.reset();
        self.refresh();
        self.notify(NotificationLevel::Info, "パケット履歴をクリアしました");
    }

    /// 表示中の一覧を作り直す
    pub fn refresh(&mut self) {
        let mut visible = FilterEngine::visible(&self.history, &self.filter);
        visible.truncate(self.display_limit);
        self.visible = visible;
    }

    pub fn visible(&self) -> &[StoredRecord] {
        &self.visible
    }

    pub fn rows(&self) -> Vec<PacketView> {
        self.visible
            .iter()
            .map(|stored| PacketView::new(stored.seq, &stored.record))
            .collect()
    }

    pub fn record(&self, seq: u64) -> Option<Arc<PacketRecord>> {
        self.history.get(seq).map(|stored| Arc::clone(&stored.record))
    }

    /// 詳細表示用の整形済みJSON
    pub fn details(&self, seq: u64) -> Option<String> {
        self.history.get(seq).map(|stored| stored.record.to_pretty_json())
    }

    pub fn stats(&self) -> Stats {
        self.stats.snapshot()
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Error => error!("{}", message),
            NotificationLevel::Warning => warn!("{}", message),
            NotificationLevel::Info | NotificationLevel::Success => info!("{}", message),
        }
        self.notifications.push_back(Notification { level, message });
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }
}

impl Default for ViewController {
    fn default() -> Self {
        Self::new(crate::storage::history::DEFAULT_CAPACITY, DEFAULT_DISPLAY_LIMIT)
    }
}
