use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::{HostId, HostMessage, ImeMessage, RouterError};

new_key_type! {
    /// Token returned by [`HostChannel::register_handler`].
    pub struct HandlerId;
}

/// Receives what the host channel delivers.
pub trait MessageHandler {
    fn on_channel_established(&self, _host_id: HostId) {}

    fn on_channel_destroyed(&self, _host_id: HostId) {}

    fn on_message_received(&self, message: &ImeMessage);
}

/// Host side of the bridge: a place to send outbound messages and to
/// subscribe for inbound ones. Handlers are held weakly.
pub trait HostChannel {
    fn register_handler(&self, handler: Weak<dyn MessageHandler>) -> HandlerId;

    fn unregister_handler(&self, id: HandlerId);

    fn send(&self, message: HostMessage) -> Result<(), RouterError>;
}

/// In-process channel. Inbound messages are injected with [`deliver`];
/// outbound messages collect in an outbox.
///
/// [`deliver`]: LoopbackHost::deliver
#[derive(Default)]
pub struct LoopbackHost {
    handlers: RefCell<SlotMap<HandlerId, Weak<dyn MessageHandler>>>,
    sent: RefCell<Vec<HostMessage>>,
    closed: Cell<bool>,
}

impl LoopbackHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_handlers(&self) -> Vec<Rc<dyn MessageHandler>> {
        self.handlers
            .borrow()
            .values()
            .filter_map(|w| w.upgrade())
            .collect()
    }

    /// Hands `message` to every live handler. Returns how many got it.
    pub fn deliver(&self, message: &ImeMessage) -> usize {
        let handlers = self.live_handlers();
        for h in &handlers {
            h.on_message_received(message);
        }
        handlers.len()
    }

    pub fn establish(&self, host_id: HostId) {
        self.closed.set(false);
        for h in self.live_handlers() {
            h.on_channel_established(host_id);
        }
    }

    /// Tears the channel down: handlers are told, later sends fail.
    pub fn destroy(&self, host_id: HostId) {
        self.closed.set(true);
        for h in self.live_handlers() {
            h.on_channel_destroyed(host_id);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn take_sent(&self) -> Vec<HostMessage> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }
}

impl HostChannel for LoopbackHost {
    fn register_handler(&self, handler: Weak<dyn MessageHandler>) -> HandlerId {
        self.handlers.borrow_mut().insert(handler)
    }

    fn unregister_handler(&self, id: HandlerId) {
        if self.handlers.borrow_mut().remove(id).is_none() {
            log::debug!("unregister_handler: {id:?} was not registered");
        }
    }

    fn send(&self, message: HostMessage) -> Result<(), RouterError> {
        if self.closed.get() {
            return Err(RouterError::ChannelClosed);
        }
        self.sent.borrow_mut().push(message);
        Ok(())
    }
}

/// Thread-safe mailbox between a transport thread and the thread that owns
/// the router. Cloning shares the same mailbox.
#[derive(Clone, Default)]
pub struct InboundQueue {
    inner: Arc<Mutex<Mailbox>>,
}

#[derive(Default)]
struct Mailbox {
    messages: VecDeque<ImeMessage>,
    closed: bool,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: ImeMessage) -> Result<(), RouterError> {
        let mut mb = self.inner.lock();
        if mb.closed {
            return Err(RouterError::ChannelClosed);
        }
        mb.messages.push_back(message);
        Ok(())
    }

    /// Decodes a JSON frame and queues it.
    pub fn push_json(&self, frame: &str) -> Result<(), RouterError> {
        self.push(ImeMessage::from_json(frame)?)
    }

    /// Delivers everything queued so far, in arrival order. Call from the
    /// thread that owns `handler`. Returns the number of messages delivered.
    pub fn pump(&self, handler: &dyn MessageHandler) -> usize {
        let batch = std::mem::take(&mut self.inner.lock().messages);
        let n = batch.len();
        for message in &batch {
            handler.on_message_received(message);
        }
        n
    }

    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
