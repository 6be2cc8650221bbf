use crate::network::connection::ConnectionState;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ロガーのセットアップに失敗しました: {0}")]
    Logger(String),

    #[error("接続がタイムアウトしました ({0:?})")]
    TransportTimeout(Duration),

    #[error("トランスポートエラー: {0}")]
    Transport(String),

    #[error("{attempts}回の試行後も接続できませんでした: {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: Box<MonitorError>,
    },

    #[error("接続処理が中断されました")]
    ConnectAborted,

    #[error("メッセージの解析に失敗しました: {0}")]
    MessageParse(String),

    #[error("キャプチャプロセスの起動に失敗しました: {0}")]
    ProducerStart(String),

    #[error("キャプチャプロセスの停止に失敗しました: {0}")]
    ProducerStop(String),

    #[error("{state}状態では{operation}を実行できません")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },
}

impl From<serde_json::Error> for MonitorError {
    fn from(e: serde_json::Error) -> Self {
        MonitorError::MessageParse(e.to_string())
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
