// Response path shared by workers and the dispatch gateway

use crate::domain::{PeerMsg, RpcResponse, StatusCode};
use crate::port::ResponseTransport;
use tracing::{debug, trace};

/// Hand a response to the transport
pub fn respond(transport: &dyn ResponseTransport, rsp: RpcResponse) {
    debug!(
        handle = %rsp.handle,
        code = %rsp.code,
        len = rsp.len(),
        "Sending peer response"
    );
    transport.send_response(rsp);
}

/// Answer a processed item unless the handler reported it still in progress.
///
/// Returns whether a response was sent. The item is left to the caller to
/// release in both cases.
pub fn send_peer_rsp(
    transport: &dyn ResponseTransport,
    item: &mut PeerMsg,
    code: StatusCode,
) -> bool {
    if code.is_in_progress() {
        trace!(
            ahandle = item.ahandle,
            msg = %item.msg_type,
            "Response deferred, handler still in progress"
        );
        return false;
    }

    respond(transport, RpcResponse::from_item(item, code));
    true
}
