//! Stand-in collaborators for running the peer queue on its own:
//! JSON lines in, JSON lines out, and a minimal mnode handler.

use anyhow::anyhow;
use peerq_core::domain::{
    MsgType, PeerMsg, PeerRequest, RpcHandle, RpcMsg, RpcResponse, StatusCode,
};
use peerq_core::port::{PeerHandler, Redirector, ResponseTransport};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tracing::{error, info};

/// Message type on the wire: its name or its numeric code
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum WireMsgType {
    Name(MsgType),
    Code(u16),
}

impl WireMsgType {
    fn resolve(self) -> anyhow::Result<MsgType> {
        match self {
            WireMsgType::Name(msg_type) => Ok(msg_type),
            WireMsgType::Code(code) => MsgType::from_code(code)
                .ok_or_else(|| anyhow!("unknown msg type code {}", code)),
        }
    }
}

/// One inbound line on stdin
#[derive(Debug, Deserialize)]
pub struct InboundLine {
    pub msg_type: WireMsgType,
    pub handle: RpcHandle,
    #[serde(default)]
    pub ahandle: u64,
    #[serde(default)]
    pub body: Value,
}

impl InboundLine {
    pub fn into_rpc_msg(self) -> anyhow::Result<RpcMsg> {
        let content = if self.body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&self.body)?
        };
        Ok(RpcMsg {
            msg_type: self.msg_type.resolve()?,
            handle: self.handle,
            ahandle: self.ahandle,
            content,
        })
    }
}

/// One outbound line on stdout
#[derive(Debug, Serialize)]
struct OutboundLine {
    handle: RpcHandle,
    code: i32,
    status: String,
    len: usize,
    body: Value,
}

impl From<RpcResponse> for OutboundLine {
    fn from(rsp: RpcResponse) -> Self {
        let body = serde_json::from_slice(&rsp.content).unwrap_or(Value::Null);
        Self {
            handle: rsp.handle,
            code: rsp.code.0,
            status: rsp.code.to_string(),
            len: rsp.len(),
            body,
        }
    }
}

/// Writes every response as a JSON line on stdout
#[derive(Debug, Default)]
pub struct StdoutTransport;

impl ResponseTransport for StdoutTransport {
    fn send_response(&self, rsp: RpcResponse) {
        let line = OutboundLine::from(rsp);
        let mut out = std::io::stdout().lock();
        let written = serde_json::to_writer(&mut out, &line)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(out))
            .and_then(|()| out.flush());
        if let Err(e) = written {
            error!(error = %e, handle = %line.handle, "Failed to write response");
        }
    }
}

/// Answers rejected messages with a `REDIRECT` response
pub struct ResponseRedirector {
    transport: Arc<dyn ResponseTransport>,
}

impl ResponseRedirector {
    pub fn new(transport: Arc<dyn ResponseTransport>) -> Self {
        Self { transport }
    }
}

impl Redirector for ResponseRedirector {
    fn redirect(&self, msg_type: MsgType, handle: RpcHandle, is_retry: bool) {
        info!(
            msg = %msg_type,
            code = msg_type.code(),
            handle = %handle,
            is_retry,
            "Redirecting peer msg"
        );
        let body = json!({ "redirect": "mnode is not serving peer messages" });
        self.transport.send_response(RpcResponse {
            handle,
            content: body.to_string().into_bytes(),
            code: StatusCode::REDIRECT,
        });
    }
}

/// Minimal mnode: acknowledges every decoded request
#[derive(Debug, Default)]
pub struct AckHandler;

impl PeerHandler for AckHandler {
    fn process(&self, item: &mut PeerMsg) -> StatusCode {
        let ack = match item.request() {
            Some(PeerRequest::ConfigTable(req)) => json!({
                "vgroup_id": req.vgroup_id,
                "sid": req.sid,
                "table_id": req.table_id,
            }),
            Some(PeerRequest::ConfigVnode(req)) => json!({
                "dnode_id": req.dnode_id,
                "vgroup_id": req.vgroup_id,
            }),
            Some(PeerRequest::Status(req)) => json!({
                "dnode_id": req.dnode_id,
                "num_of_vnodes": req.num_of_vnodes,
            }),
            Some(PeerRequest::Grant(req)) if req.item.is_empty() => {
                return StatusCode::INVALID_MSG_CONTENT;
            }
            Some(PeerRequest::Grant(req)) => json!({
                "dnode_id": req.dnode_id,
                "item": req.item,
            }),
            None => return StatusCode::INVALID_MSG_CONTENT,
        };

        item.set_response(ack.to_string().into_bytes());
        StatusCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_line_body_becomes_content() {
        let line: InboundLine = serde_json::from_str(
            r#"{"msg_type":"status","handle":5,"body":{"dnode_id":1,"num_of_vnodes":2}}"#,
        )
        .unwrap();
        let msg = line.into_rpc_msg().unwrap();
        assert_eq!(msg.msg_type, MsgType::Status);
        assert_eq!(msg.handle, RpcHandle(5));
        assert_eq!(msg.ahandle, 0);
        assert!(PeerRequest::decode(msg.msg_type, &msg.content).is_ok());
    }

    #[test]
    fn test_numeric_msg_type_is_resolved() {
        let line: InboundLine = serde_json::from_str(
            r#"{"msg_type":13,"handle":9,"body":{"dnode_id":1,"vgroup_id":2}}"#,
        )
        .unwrap();
        assert_eq!(line.into_rpc_msg().unwrap().msg_type, MsgType::ConfigVnode);
    }

    #[test]
    fn test_unknown_msg_type_code_is_rejected() {
        let line: InboundLine = serde_json::from_str(r#"{"msg_type":12,"handle":9}"#).unwrap();
        let err = line.into_rpc_msg().unwrap_err();
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_missing_body_is_empty_content() {
        let line: InboundLine = serde_json::from_str(r#"{"msg_type":"grant","handle":1}"#).unwrap();
        assert!(line.into_rpc_msg().unwrap().content.is_empty());
    }

    #[test]
    fn test_ack_handler_answers_decoded_request() {
        let raw = RpcMsg {
            msg_type: MsgType::ConfigVnode,
            handle: RpcHandle(2),
            ahandle: 0,
            content: br#"{"dnode_id": 4, "vgroup_id": 9}"#.to_vec(),
        };
        let handler = AckHandler;
        let mut item = PeerMsg::allocate(&raw);
        handler.create_msg(&mut item, &raw).unwrap();

        assert_eq!(handler.process(&mut item), StatusCode::SUCCESS);
        let body: Value = serde_json::from_slice(item.response()).unwrap();
        assert_eq!(body["vgroup_id"], 9);
    }

    #[test]
    fn test_ack_handler_rejects_empty_grant() {
        let raw = RpcMsg {
            msg_type: MsgType::Grant,
            handle: RpcHandle(3),
            ahandle: 0,
            content: br#"{"dnode_id": 1, "item": ""}"#.to_vec(),
        };
        let mut item = PeerMsg::allocate(&raw);
        AckHandler.create_msg(&mut item, &raw).unwrap();
        assert_eq!(AckHandler.process(&mut item), StatusCode::INVALID_MSG_CONTENT);
    }

    #[test]
    fn test_outbound_line_parses_json_body() {
        let line = OutboundLine::from(RpcResponse {
            handle: RpcHandle(1),
            content: br#"{"ok":true}"#.to_vec(),
            code: StatusCode::SUCCESS,
        });
        assert_eq!(line.body["ok"], true);
        assert_eq!(line.len, 11);
        assert_eq!(line.code, 0);
    }
}
