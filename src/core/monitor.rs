use crate::analysis::Stats;
use crate::core::config::Configuration;
use crate::core::MonitorResult;
use crate::network::connection::{ConnectAbortHandle, ConnectionState, Inbound, StreamConnection};
use crate::network::supervisor::ProcessSupervisor;
use crate::network::websocket::WebSocketTransport;
use crate::packet::{PacketRecord, PacketView, ProtocolCategory};
use crate::storage::StoredRecord;
use crate::view::{FilterConfig, Notification, NotificationLevel, ViewController};
use log::debug;
use std::sync::Arc;

/// 受信1件を処理した結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// 履歴に追加した。値はシーケンス番号
    Ingested(u64),
    /// 一時停止中のため捨てた
    Dropped,
    /// 解析できずに捨てた
    Discarded,
    /// プロデューサーがエラーを報告した
    ProducerError(String),
    /// 接続が閉じられた
    Disconnected,
}

/// 表示層に公開する操作をまとめたもの。
///
/// 接続(`StreamConnection`)とセッション状態(`ViewController`)を所有し、
/// 受信したレコードを統計・履歴・表示中の一覧へ流す。
pub struct Monitor {
    connection: StreamConnection,
    view: ViewController,
}

impl Monitor {
    pub fn new(connection: StreamConnection, view: ViewController) -> Self {
        Self { connection, view }
    }

    pub fn from_config(config: &Configuration) -> Self {
        let transport = Arc::new(WebSocketTransport::new(config.transport.endpoint.clone()));
        let supervisor = Arc::new(ProcessSupervisor::from_config(&config.producer));
        let connection = StreamConnection::new(transport, supervisor, config.transport.retry);
        Self::new(connection, ViewController::from_config(&config.history))
    }

    pub async fn connect(&mut self) -> MonitorResult<()> {
        match self.connection.connect().await {
            Ok(()) => {
                self.view.notify(NotificationLevel::Success, "パケットスニッファーに接続しました");
                Ok(())
            }
            Err(e) => {
                self.view.notify(NotificationLevel::Error, format!("接続に失敗しました: {}", e));
                Err(e)
            }
        }
    }

    pub async fn disconnect(&mut self) -> MonitorResult<()> {
        self.connection.disconnect().await?;
        self.view.notify(NotificationLevel::Warning, "パケットスニッファーから切断しました");
        Ok(())
    }

    pub fn pause(&mut self) -> MonitorResult<()> {
        self.connection.pause()?;
        self.view.notify(NotificationLevel::Info, "パケットキャプチャを一時停止しました");
        Ok(())
    }

    pub fn resume(&mut self) -> MonitorResult<()> {
        self.connection.resume()?;
        self.view.notify(NotificationLevel::Success, "パケットキャプチャを再開しました");
        Ok(())
    }

    /// 次の受信を待って処理する。接続していなければ `None`。
    pub async fn next_event(&mut self) -> Option<MonitorEvent> {
        let inbound = self.connection.next_event().await?;

        let event = match inbound {
            Inbound::Record(record) => MonitorEvent::Ingested(self.view.ingest(record)),
            Inbound::Dropped => MonitorEvent::Dropped,
            Inbound::Discarded(reason) => {
                debug!("破棄: {}", reason);
                MonitorEvent::Discarded
            }
            Inbound::ProducerError(message) => {
                self.view.notify(
                    NotificationLevel::Error,
                    format!("キャプチャプロセスがエラーを報告しました: {}", message),
                );
                MonitorEvent::ProducerError(message)
            }
            Inbound::Closed(_) => {
                self.view.notify(NotificationLevel::Warning, "パケットスニッファーから切断されました");
                MonitorEvent::Disconnected
            }
        };
        Some(event)
    }

    /// 履歴と統計を消す。フィルタと接続状態には触れない
    pub fn clear_history(&mut self) {
        self.view.clear_history();
    }

    pub fn set_filter(&mut self, category: ProtocolCategory, included: bool) {
        self.view.set_filter(category, included);
    }

    pub fn set_loopback(&mut self, included: bool) {
        self.view.set_loopback(included);
    }

    pub fn set_search(&mut self, term: &str) {
        self.view.set_search(term);
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// 受信待ちができる状態か
    pub fn is_streaming(&self) -> bool {
        matches!(self.state(), ConnectionState::Connected | ConnectionState::Paused)
    }

    pub fn stats(&self) -> Stats {
        self.view.stats()
    }

    pub fn visible(&self) -> &[StoredRecord] {
        self.view.visible()
    }

    pub fn rows(&self) -> Vec<PacketView> {
        self.view.rows()
    }

    pub fn record(&self, seq: u64) -> Option<Arc<PacketRecord>> {
        self.view.record(seq)
    }

    pub fn details(&self, seq: u64) -> Option<String> {
        self.view.details(seq)
    }

    pub fn filter(&self) -> &FilterConfig {
        self.view.filter()
    }

    pub fn history_len(&self) -> usize {
        self.view.history().len()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.view.take_notifications()
    }

    pub fn abort_handle(&self) -> ConnectAbortHandle {
        self.connection.abort_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MonitorError;
    use crate::network::connection::tests::{FakeSupervisor, Script, ScriptedTransport};
    use crate::network::retry::RetryPolicy;
    use crate::network::transport::TransportEvent;

    const TCP_RECORD: &str = r#"{"timestamp":1700000000000,"IPv4":{"source_ip":"10.0.0.1","destination_ip":"10.0.0.2"},"TCP":{"source_port":443,"destination_port":51000}}"#;

    fn monitor(script: Vec<Script>) -> (Monitor, Arc<ScriptedTransport>) {
        let transport = ScriptedTransport::new(script);
        let supervisor = Arc::new(FakeSupervisor::default());
        let connection = StreamConnection::new(transport.clone(), supervisor, RetryPolicy::default());
        (Monitor::new(connection, ViewController::default()), transport)
    }

    async fn connected() -> (Monitor, Arc<ScriptedTransport>) {
        let (mut monitor, transport) = monitor(vec![Script::Open]);
        monitor.connect().await.unwrap();
        monitor.take_notifications();
        (monitor, transport)
    }

    #[tokio::test]
    async fn tcp_record_updates_stats_and_rows() {
        let (mut monitor, transport) = connected().await;

        transport.send_text(TCP_RECORD);
        let event = monitor.next_event().await;

        assert!(matches!(event, Some(MonitorEvent::Ingested(_))));
        let stats = monitor.stats();
        assert_eq!(stats.tcp, 1);
        assert_eq!(stats.total, 1);
        let rows = monitor.rows();
        assert_eq!(rows[0].connection, "10.0.0.1 → 10.0.0.2");
        assert_eq!(rows[0].details, "Port 443 → 51000");
    }

    #[tokio::test]
    async fn pause_freezes_stats_and_history() {
        let (mut monitor, transport) = connected().await;
        transport.send_text(TCP_RECORD);
        monitor.next_event().await;
        let stats = monitor.stats();
        let len = monitor.history_len();

        monitor.pause().unwrap();
        for _ in 0..10 {
            transport.send_text(TCP_RECORD);
        }
        for _ in 0..10 {
            assert_eq!(monitor.next_event().await, Some(MonitorEvent::Dropped));
        }
        monitor.resume().unwrap();

        assert_eq!(monitor.stats(), stats);
        assert_eq!(monitor.history_len(), len);

        // 再開しても一時停止中の分は再生されない
        transport.send_text(TCP_RECORD);
        monitor.next_event().await;
        assert_eq!(monitor.stats().total, stats.total + 1);
    }

    #[tokio::test]
    async fn clear_history_leaves_filter_and_state() {
        let (mut monitor, transport) = connected().await;
        monitor.set_filter(ProtocolCategory::Udp, false);
        monitor.set_search("10.0.0");
        for _ in 0..3 {
            transport.send_text(TCP_RECORD);
            monitor.next_event().await;
        }
        let filter = monitor.filter().clone();

        monitor.clear_history();

        assert_eq!(monitor.stats(), Stats::default());
        assert_eq!(monitor.history_len(), 0);
        assert!(monitor.visible().is_empty());
        assert_eq!(monitor.filter(), &filter);
        assert_eq!(monitor.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn garbage_does_not_touch_counters() {
        let (mut monitor, transport) = connected().await;

        transport.send_text("{\"TCP\": ");
        assert_eq!(monitor.next_event().await, Some(MonitorEvent::Discarded));

        assert_eq!(monitor.stats().total, 0);
        assert_eq!(monitor.history_len(), 0);
        assert_eq!(monitor.state(), ConnectionState::Connected);
        assert!(monitor.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn producer_error_reports_are_surfaced_not_stored() {
        let (mut monitor, transport) = connected().await;

        transport.send_text(r#"{"error":"Socket error: no such device"}"#);
        let event = monitor.next_event().await;

        assert_eq!(event, Some(MonitorEvent::ProducerError("Socket error: no such device".to_string())));
        assert_eq!(monitor.history_len(), 0);
        let notes = monitor.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn remote_close_surfaces_a_single_notification() {
        let (mut monitor, transport) = connected().await;

        transport.send(TransportEvent::Closed);
        assert_eq!(monitor.next_event().await, Some(MonitorEvent::Disconnected));

        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert!(!monitor.is_streaming());
        let notes = monitor.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Warning);
        assert_eq!(monitor.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connect_notifies_once() {
        let (mut monitor, _transport) = monitor(Vec::new());

        let result = monitor.connect().await;

        assert!(matches!(result, Err(MonitorError::ConnectionFailed { attempts: 5, .. })));
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        let notes = monitor.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn details_follow_the_record_not_its_position() {
        let (mut monitor, transport) = connected().await;
        transport.send_text(TCP_RECORD);
        let seq = match monitor.next_event().await {
            Some(MonitorEvent::Ingested(seq)) => seq,
            other => panic!("unexpected event: {:?}", other),
        };

        for _ in 0..5 {
            transport.send_text(r#"{"UDP":{"source_port":53}}"#);
            monitor.next_event().await;
        }

        let details = monitor.details(seq).unwrap();
        assert!(details.contains("\"source_port\": 443"));
        assert_eq!(monitor.visible().last().map(|r| r.seq), Some(seq));
    }
}
