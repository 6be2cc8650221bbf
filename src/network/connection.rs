use crate::core::{MonitorError, MonitorResult};
use crate::network::retry::{retry_with_policy, RetryPolicy};
use crate::network::supervisor::ProducerSupervisor;
use crate::network::transport::{MessageStream, Transport, TransportEvent};
use crate::packet::PacketRecord;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Paused,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// 受信処理の結果
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// 解析済みのレコード
    Record(PacketRecord),
    /// 一時停止中だったので捨てた
    Dropped,
    /// 解析できなかったので捨てた
    Discarded(String),
    /// プロデューサーからのエラー報告
    ProducerError(String),
    /// 接続が閉じられた
    Closed(Option<String>),
}

/// 進行中の `connect()` を別タスクから中断するためのハンドル
#[derive(Debug, Clone, Default)]
pub struct ConnectAbortHandle {
    aborted: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ConnectAbortHandle {
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.aborted.store(false, Ordering::SeqCst);
    }

    async fn aborted(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // フラグを見る前に待機を登録しておく
        notified.as_mut().enable();
        if self.is_aborted() {
            return;
        }
        notified.await;
    }
}

/// トランスポートの接続状態を持つ。状態はこの型の操作を通してだけ遷移する。
///
/// ```text
/// disconnected -> connecting -> connected <-> paused
///                      |             |          |
///                      +-------------+----------+--> disconnected
/// ```
pub struct StreamConnection {
    transport: Arc<dyn Transport>,
    supervisor: Arc<dyn ProducerSupervisor>,
    policy: RetryPolicy,
    state: ConnectionState,
    stream: Option<Box<dyn MessageStream>>,
    abort: ConnectAbortHandle,
}

impl StreamConnection {
    pub fn new(
        transport: Arc<dyn Transport>,
        supervisor: Arc<dyn ProducerSupervisor>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            supervisor,
            policy,
            state: ConnectionState::Disconnected,
            stream: None,
            abort: ConnectAbortHandle::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn abort_handle(&self) -> ConnectAbortHandle {
        self.abort.clone()
    }

    /// プロデューサーを起動し、リトライ付きでトランスポートを開く
    pub async fn connect(&mut self) -> MonitorResult<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(MonitorError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }

        self.state = ConnectionState::Connecting;
        self.abort.reset();
        info!("{}への接続を開始します", self.transport.endpoint());

        let transport = Arc::clone(&self.transport);
        let supervisor = Arc::clone(&self.supervisor);
        let policy = self.policy;
        let abort = self.abort.clone();

        let outcome = tokio::select! {
            biased;
            _ = abort.aborted() => None,
            result = Self::establish(transport, supervisor, policy) => Some(result),
        };

        match outcome {
            Some(Ok(stream)) => {
                self.stream = Some(stream);
                self.state = ConnectionState::Connected;
                info!("{}に接続しました", self.transport.endpoint());
                Ok(())
            }
            Some(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                // 起動に成功したプロデューサーだけを止める
                if let MonitorError::ConnectionFailed { attempts, .. } = &e {
                    if *attempts > 0 {
                        self.stop_producer().await;
                    }
                }
                Err(e)
            }
            None => {
                info!("接続処理が中断されました");
                self.state = ConnectionState::Disconnected;
                self.stop_producer().await;
                Err(MonitorError::ConnectAborted)
            }
        }
    }

    async fn establish(
        transport: Arc<dyn Transport>,
        supervisor: Arc<dyn ProducerSupervisor>,
        policy: RetryPolicy,
    ) -> MonitorResult<Box<dyn MessageStream>> {
        supervisor
            .start_capture()
            .await
            .map_err(|e| MonitorError::ConnectionFailed {
                attempts: 0,
                source: Box::new(e),
            })?;
        info!("キャプチャプロセスを起動しました。WebSocketの待ち受けを待機します");

        retry_with_policy(&policy, |_| {
            let transport = Arc::clone(&transport);
            async move { transport.open().await }
        })
        .await
    }

    pub fn pause(&mut self) -> MonitorResult<()> {
        match self.state {
            ConnectionState::Connected => {
                self.state = ConnectionState::Paused;
                Ok(())
            }
            state => Err(MonitorError::InvalidState {
                operation: "pause",
                state,
            }),
        }
    }

    pub fn resume(&mut self) -> MonitorResult<()> {
        match self.state {
            ConnectionState::Paused => {
                self.state = ConnectionState::Connected;
                Ok(())
            }
            state => Err(MonitorError::InvalidState {
                operation: "resume",
                state,
            }),
        }
    }

    /// トランスポートを閉じてプロデューサーを止める。
    /// `connecting` のまま残っている場合は中断して `disconnected` に戻す。
    pub async fn disconnect(&mut self) -> MonitorResult<()> {
        match self.state {
            ConnectionState::Disconnected => {
                return Err(MonitorError::InvalidState {
                    operation: "disconnect",
                    state: self.state,
                })
            }
            ConnectionState::Connecting => {
                self.abort.abort();
            }
            ConnectionState::Connected | ConnectionState::Paused => {
                if let Some(mut stream) = self.stream.take() {
                    if let Err(e) = stream.close().await {
                        warn!("トランスポートのクローズに失敗しました: {}", e);
                    }
                }
            }
        }

        self.stream = None;
        self.state = ConnectionState::Disconnected;
        info!("切断しました");
        self.stop_producer().await;
        Ok(())
    }

    async fn stop_producer(&self) {
        if let Err(e) = self.supervisor.stop_capture().await {
            warn!("{}", e);
        }
    }

    /// 次の受信イベントを待って処理する。接続していなければ `None`。
    ///
    /// キャンセルしても受信済みのフレームは失われないので `select!` で使える。
    pub async fn next_event(&mut self) -> Option<Inbound> {
        let stream = self.stream.as_mut()?;
        let event = stream.next_event().await;

        let inbound = match event {
            TransportEvent::Text(text) => match self.state {
                ConnectionState::Connected => Self::handle_text(&text),
                _ => Inbound::Dropped,
            },
            TransportEvent::Malformed(reason) => match self.state {
                ConnectionState::Connected => {
                    debug!("受信メッセージを破棄しました: {}", reason);
                    Inbound::Discarded(reason)
                }
                _ => Inbound::Dropped,
            },
            TransportEvent::Closed => {
                self.on_closed();
                Inbound::Closed(None)
            }
            TransportEvent::Error(e) => {
                warn!("トランスポートエラー: {}", e);
                self.on_closed();
                Inbound::Closed(Some(e))
            }
        };
        Some(inbound)
    }

    fn handle_text(text: &str) -> Inbound {
        match PacketRecord::parse(text) {
            Ok(record) => match record.producer_error() {
                Some(message) => Inbound::ProducerError(message.to_string()),
                None => Inbound::Record(record),
            },
            Err(e) => {
                debug!("受信メッセージを破棄しました: {}", e);
                Inbound::Discarded(e.to_string())
            }
        }
    }

    fn on_closed(&mut self) {
        self.stream = None;
        self.state = ConnectionState::Disconnected;
    }
}
