use crate::core::MonitorResult;
use async_trait::async_trait;

/// 受信専用ストリームから届くイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// 1メッセージ分のテキストフレーム
    Text(String),
    /// テキストとして読めないフレーム。内容は理由
    Malformed(String),
    /// 相手側から閉じられた
    Closed,
    /// トランスポートのエラー。以降ストリームは使えない
    Error(String),
}

/// 接続を開くトランスポート
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self) -> MonitorResult<Box<dyn MessageStream>>;

    fn endpoint(&self) -> &str;
}

/// 開かれた接続
#[async_trait]
pub trait MessageStream: Send {
    /// 次のイベントを待つ。キャンセルしてもフレームは失われない
    async fn next_event(&mut self) -> TransportEvent;

    async fn close(&mut self) -> MonitorResult<()>;
}
