pub mod session;
pub mod status;
pub mod transport;

pub use session::ChatSession;
pub use status::{ExchangeOutcome, ExchangeStatus, FailureReason, ResponseClass};
pub use transport::{ByteStream, ChatTransport, HttpTransport, TransportError, TransportResponse};
