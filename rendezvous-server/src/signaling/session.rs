use crate::engine::{Coordinator, Dispatch};
use crate::error::SignalingError;
use crate::transport::{ConnectionRegistry, frame};
use rendezvous_core::{ConnectionId, SignalingMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

/// One client connection as the engine and the transport adapter see it.
///
/// Every inbound frame is dispatched on its own tracked task. The dispatch
/// timeout only bounds how long the caller waits for the outcome: a frame
/// whose handling outlives it gets an internal error reply, but its work
/// still runs to completion and its membership change is still applied to
/// the registry. [`Session::end`] waits for all such work before running
/// disconnect cleanup.
#[derive(Clone)]
pub struct Session {
    coordinator: Arc<Coordinator>,
    registry: Arc<dyn ConnectionRegistry>,
    connection_id: ConnectionId,
    dispatch_timeout: Duration,
    in_flight: TaskTracker,
}

impl Session {
    /// Registers a new connection with the adapter. The receiver yields the
    /// frames addressed to it.
    pub fn open(
        coordinator: Arc<Coordinator>,
        registry: Arc<dyn ConnectionRegistry>,
        dispatch_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (connection_id, outbox) = registry.open();
        let session = Self {
            coordinator,
            registry,
            connection_id,
            dispatch_timeout,
            in_flight: TaskTracker::new(),
        };
        (session, outbox)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Feeds one inbound text frame to the engine.
    ///
    /// A frame that does not decode gets a validation error reply.
    pub async fn relay_frame(&self, text: &str) -> Dispatch {
        let message = match frame::decode(text) {
            Ok(message) => message,
            Err(e) => {
                self.coordinator
                    .reject(&self.connection_id, &SignalingError::from(e))
                    .await;
                return Dispatch::Rejected;
            }
        };

        let handled = self.in_flight.spawn({
            let session = self.clone();
            async move { session.dispatch(message).await }
        });

        match tokio::time::timeout(self.dispatch_timeout, handled).await {
            Ok(Ok(dispatch)) => dispatch,
            Ok(Err(e)) => {
                error!("Dispatch task for {} failed: {}", self.connection_id, e);
                self.coordinator
                    .reject(&self.connection_id, &SignalingError::Internal)
                    .await;
                Dispatch::Rejected
            }
            Err(_) => {
                warn!(
                    "Dispatch for {} timed out after {:?}, finishing in background",
                    self.connection_id, self.dispatch_timeout
                );
                self.coordinator
                    .reject(&self.connection_id, &SignalingError::Timeout)
                    .await;
                Dispatch::Rejected
            }
        }
    }

    /// Waits for in-flight frames, runs disconnect cleanup in the engine,
    /// then forgets the connection in the adapter.
    pub async fn end(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;

        self.coordinator.handle_disconnect(&self.connection_id).await;
        self.registry.close(&self.connection_id);
    }

    async fn dispatch(&self, message: SignalingMessage) -> Dispatch {
        let dispatch = self
            .coordinator
            .handle_message(&self.connection_id, message)
            .await;

        match &dispatch {
            Dispatch::Joined { room_id, .. } => self.registry.join_room(&self.connection_id, room_id),
            Dispatch::Left { room_id, .. } => self.registry.leave_room(&self.connection_id, room_id),
            Dispatch::Relayed | Dispatch::Rejected => {}
        }
        debug!("Frame from {} handled: {:?}", self.connection_id, dispatch);

        dispatch
    }
}
