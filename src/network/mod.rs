pub mod connection;
pub mod retry;
pub mod supervisor;
pub mod transport;
pub mod websocket;

pub use connection::{ConnectAbortHandle, ConnectionState, Inbound, StreamConnection};
pub use retry::{retry_with_policy, RetryPolicy};
pub use supervisor::{ProcessSupervisor, ProducerSupervisor};
pub use transport::{MessageStream, Transport, TransportEvent};
pub use websocket::WebSocketTransport;
