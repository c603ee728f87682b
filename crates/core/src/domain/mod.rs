// Domain Layer - Peer messages and status codes

pub mod message;
pub mod status;

// Re-exports
pub use message::{
    ConfigTableReq, ConfigVnodeReq, GrantReq, ItemKind, MsgType, PeerMsg, PeerRequest, RpcHandle,
    RpcMsg, RpcResponse, StatusReq,
};
pub use status::StatusCode;
