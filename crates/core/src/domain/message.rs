// Peer Message Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Peer message kinds served by the mnode peer queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgType {
    ConfigTable,
    ConfigVnode,
    Status,
    Grant,
}

impl MsgType {
    /// Stable wire code
    pub fn code(self) -> u16 {
        match self {
            MsgType::ConfigTable => 11,
            MsgType::ConfigVnode => 13,
            MsgType::Status => 15,
            MsgType::Grant => 17,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            11 => Some(MsgType::ConfigTable),
            13 => Some(MsgType::ConfigVnode),
            15 => Some(MsgType::Status),
            17 => Some(MsgType::Grant),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MsgType::ConfigTable => "config-table",
            MsgType::ConfigVnode => "config-vnode",
            MsgType::Status => "status",
            MsgType::Grant => "grant",
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation handle of the inbound connection. Opaque to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcHandle(pub u64);

impl fmt::Display for RpcHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Queue-level tag stored next to every queued item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Request received from the RPC layer
    Rpc,
    /// Request forwarded by another node
    Forward,
}

/// Raw message as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcMsg {
    pub msg_type: MsgType,
    pub handle: RpcHandle,
    /// Caller-side handle, only used for tracing
    #[serde(default)]
    pub ahandle: u64,
    #[serde(default)]
    pub content: Vec<u8>,
}

/// Response handed to the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub handle: RpcHandle,
    pub content: Vec<u8>,
    pub code: super::StatusCode,
}

impl RpcResponse {
    /// Empty-bodied response carrying only a status
    pub fn error(handle: RpcHandle, code: super::StatusCode) -> Self {
        Self {
            handle,
            content: Vec::new(),
            code,
        }
    }

    /// Response built from a processed item, moving its response buffer out
    pub fn from_item(item: &mut PeerMsg, code: super::StatusCode) -> Self {
        Self {
            handle: item.handle,
            content: item.take_response(),
            code,
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigTableReq {
    pub vgroup_id: i32,
    pub sid: i32,
    pub table_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigVnodeReq {
    pub dnode_id: i32,
    pub vgroup_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReq {
    pub dnode_id: i32,
    pub num_of_vnodes: u32,
    #[serde(default)]
    pub online_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantReq {
    pub dnode_id: i32,
    pub item: String,
}

/// Decoded request payload, one variant per `MsgType`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerRequest {
    ConfigTable(ConfigTableReq),
    ConfigVnode(ConfigVnodeReq),
    Status(StatusReq),
    Grant(GrantReq),
}

impl PeerRequest {
    pub fn msg_type(&self) -> MsgType {
        match self {
            PeerRequest::ConfigTable(_) => MsgType::ConfigTable,
            PeerRequest::ConfigVnode(_) => MsgType::ConfigVnode,
            PeerRequest::Status(_) => MsgType::Status,
            PeerRequest::Grant(_) => MsgType::Grant,
        }
    }

    /// Decode a JSON body whose shape is selected by `msg_type`
    pub fn decode(msg_type: MsgType, body: &[u8]) -> serde_json::Result<Self> {
        let req = match msg_type {
            MsgType::ConfigTable => PeerRequest::ConfigTable(serde_json::from_slice(body)?),
            MsgType::ConfigVnode => PeerRequest::ConfigVnode(serde_json::from_slice(body)?),
            MsgType::Status => PeerRequest::Status(serde_json::from_slice(body)?),
            MsgType::Grant => PeerRequest::Grant(serde_json::from_slice(body)?),
        };
        Ok(req)
    }
}

/// Message item travelling through the peer queue.
///
/// Exactly one component owns a `PeerMsg` at any time: the gateway that
/// allocated it, the queue holding it, then the worker serving it. It is
/// consumed by `PeerHandler::release`, which makes a second release
/// impossible.
#[derive(Debug)]
pub struct PeerMsg {
    pub msg_type: MsgType,
    pub handle: RpcHandle,
    pub ahandle: u64,
    request: Option<PeerRequest>,
    rsp: Vec<u8>,
    received_at: Instant,
}

impl PeerMsg {
    /// Allocate an empty item for `raw`; the payload is filled in by the
    /// handler's constructor step.
    pub fn allocate(raw: &RpcMsg) -> Self {
        Self {
            msg_type: raw.msg_type,
            handle: raw.handle,
            ahandle: raw.ahandle,
            request: None,
            rsp: Vec::new(),
            received_at: Instant::now(),
        }
    }

    pub fn request(&self) -> Option<&PeerRequest> {
        self.request.as_ref()
    }

    pub fn set_request(&mut self, request: PeerRequest) {
        self.request = Some(request);
    }

    pub fn set_response(&mut self, content: Vec<u8>) {
        self.rsp = content;
    }

    pub fn response(&self) -> &[u8] {
        &self.rsp
    }

    pub fn take_response(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.rsp)
    }

    /// Time elapsed since the gateway allocated the item
    pub fn age(&self) -> Duration {
        self.received_at.elapsed()
    }
}
