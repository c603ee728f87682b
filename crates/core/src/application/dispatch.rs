// Dispatch Gateway - entry point for peer messages

use crate::application::response;
use crate::domain::{ItemKind, PeerMsg, RpcMsg, RpcResponse, StatusCode};
use crate::error::{AppError, Result};
use crate::port::{PeerHandler, ReadinessProbe, Redirector, ResponseTransport};
use crate::queue::{Queue, QueueError};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{trace, warn};

/// Slot holding the service queue while it is allocated
#[derive(Debug, Default)]
pub struct QueueSlot(RwLock<Option<Arc<Queue<PeerMsg>>>>);

impl QueueSlot {
    pub fn get(&self) -> Option<Arc<Queue<PeerMsg>>> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, queue: Option<Arc<Queue<PeerMsg>>>) -> Option<Arc<Queue<PeerMsg>>> {
        let mut slot = self.0.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, queue)
    }
}

/// External collaborators of the peer queue
#[derive(Clone)]
pub struct PeerPorts {
    pub readiness: Arc<dyn ReadinessProbe>,
    pub redirector: Arc<dyn Redirector>,
    pub handler: Arc<dyn PeerHandler>,
    pub transport: Arc<dyn ResponseTransport>,
}

/// Validates, wraps and enqueues peer messages. Never blocks beyond the
/// queue's lock hold time.
pub struct DispatchGateway {
    ports: PeerPorts,
    queue: Arc<QueueSlot>,
}

impl DispatchGateway {
    pub fn new(ports: PeerPorts, queue: Arc<QueueSlot>) -> Self {
        Self { ports, queue }
    }

    /// Submit one message for asynchronous processing.
    ///
    /// # Errors
    /// - `AppError::SubsystemUnavailable` if the mnode is not running or
    ///   its queue is gone; the redirector has been invoked
    /// - `AppError::InvalidMessage` if the item cannot be built; an error
    ///   response has been sent
    /// - `AppError::OutOfMemory` if the queue cannot grow; an error
    ///   response has been sent
    pub fn dispatch(&self, msg: RpcMsg) -> Result<()> {
        let queue = match self.queue.get() {
            Some(queue) if self.ports.readiness.is_running() => queue,
            _ => return self.reject(&msg),
        };

        let handler = self.ports.handler.as_ref();
        let mut item = PeerMsg::allocate(&msg);
        if let Err(e) = handler.create_msg(&mut item, &msg) {
            warn!(
                ahandle = msg.ahandle,
                msg = %msg.msg_type,
                error = %e,
                "Failed to create peer msg"
            );
            response::respond(
                self.ports.transport.as_ref(),
                RpcResponse::error(msg.handle, e.status_code()),
            );
            handler.release(item);
            return Err(e.into());
        }

        match queue.enqueue(item, ItemKind::Rpc) {
            Ok(()) => {
                trace!(
                    ahandle = msg.ahandle,
                    msg = %msg.msg_type,
                    "Msg is put into mpeer queue"
                );
                Ok(())
            }
            Err(rejected) => {
                let reason = rejected.reason;
                handler.release(rejected.into_item());
                match reason {
                    // Freed between the slot lookup and the enqueue
                    QueueError::Closed => self.reject(&msg),
                    QueueError::OutOfMemory => {
                        response::respond(
                            self.ports.transport.as_ref(),
                            RpcResponse::error(msg.handle, StatusCode::OUT_OF_MEMORY),
                        );
                        Err(reason.into())
                    }
                    QueueError::AlreadyMember => Err(reason.into()),
                }
            }
        }
    }

    fn reject(&self, msg: &RpcMsg) -> Result<()> {
        warn!(
            ahandle = msg.ahandle,
            msg = %msg.msg_type,
            handle = %msg.handle,
            "mnode not running, redirecting peer msg"
        );
        self.ports
            .redirector
            .redirect(msg.msg_type, msg.handle, false);
        Err(AppError::SubsystemUnavailable {
            msg_type: msg.msg_type,
        })
    }
}
