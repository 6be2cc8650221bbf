//! パケットモニタのデータプレーン。
//!
//! キャプチャプロセスからWebSocketで届くパケットレコードを分類し、統計と
//! 上限付きの履歴を保ち、フィルタ・検索済みの一覧を表示層に提供する。

pub mod analysis;
pub mod core;
pub mod network;
pub mod packet;
pub mod setup_logger;
pub mod storage;
pub mod view;

pub use crate::core::{Configuration, Monitor, MonitorError, MonitorEvent, MonitorResult};
pub use crate::network::ConnectionState;
pub use crate::packet::{classify, PacketRecord, ProtocolCategory};
