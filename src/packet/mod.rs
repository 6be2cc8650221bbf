pub mod category;
pub mod layer;
pub mod record;
pub mod summary;

pub use category::{classify, ProtocolCategory};
pub use layer::ProtocolLayer;
pub use record::PacketRecord;
pub use summary::PacketView;
