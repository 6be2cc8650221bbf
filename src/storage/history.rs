use crate::packet::PacketRecord;
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_CAPACITY: usize = 1000;
/// 設定で指定できる履歴件数の上限
pub const MAX_CAPACITY: usize = 100_000;

/// 履歴に格納されたレコード。`seq` は挿入時に振られ、セッション中は再利用されない。
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub seq: u64,
    pub record: Arc<PacketRecord>,
}

/// 新しい順に並んだ上限付きの履歴。上限を超えると最も古いものから捨てる。
///
/// 位置による参照は次の挿入で無効になるので、詳細表示などは `seq` で引くこと。
#[derive(Debug)]
pub struct HistoryStore {
    records: VecDeque<StoredRecord>,
    capacity: usize,
    next_seq: u64,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            // 確保は既定件数までにとどめ、それ以上は挿入に合わせて伸ばす
            records: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            next_seq: 1,
        }
    }

    /// 先頭に追加し、振った `seq` を返す
    pub fn insert(&mut self, record: PacketRecord) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.records.push_front(StoredRecord {
            seq,
            record: Arc::new(record),
        });
        while self.records.len() > self.capacity {
            self.records.pop_back();
        }
        seq
    }

    /// 中身だけを空にする。`seq` のカウンタは戻さない
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn all(&self) -> impl Iterator<Item = &StoredRecord> {
        self.records.iter()
    }

    pub fn get(&self, seq: u64) -> Option<&StoredRecord> {
        // 新しい順なのでseqは降順に並んでいる
        let head = self.records.front()?.seq;
        let offset = head.checked_sub(seq)? as usize;
        self.records.get(offset).filter(|stored| stored.seq == seq)
    }

    pub fn oldest_seq(&self) -> Option<u64> {
        self.records.back().map(|stored| stored.seq)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
