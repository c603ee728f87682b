// Port Layer - Interfaces for external collaborators

pub mod peer_handler;
pub mod readiness;
pub mod redirect;
pub mod transport;

// Re-exports
pub use peer_handler::{HandlerError, PeerHandler};
pub use readiness::{ReadinessFlag, ReadinessProbe};
pub use redirect::Redirector;
pub use transport::ResponseTransport;
