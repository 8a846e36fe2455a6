pub mod endpoint;
pub mod socket;
pub mod transport;

#[cfg(test)]
pub mod test_support;

pub use endpoint::{Endpoint, SessionCredential};
pub use socket::{RECONNECT_DELAY, ReconnectingEventSocket};
pub use transport::{Connector, WebSocketConnector};
