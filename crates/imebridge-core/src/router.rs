use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::{
    ContextRef, ContextRegistry, HandlerId, HostChannel, HostId, HostMessage, ImeMessage,
    InputContext, MessageHandler, RouterConfig, RouterError, TaskRunner, WindowHandle,
};

/// Delivery counters. Dispatch itself never reports failure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Demultiplexes input-method events by window handle.
///
/// Every `dispatch_*` call posts a forwarding task onto the router's
/// [`TaskRunner`] and returns. The context is looked up when the task runs,
/// so a context torn down in between just turns the event into a logged
/// drop. Tasks hold a `Weak` to the router; if the router is gone they do
/// nothing.
///
/// Construction registers the router with its host channel as a
/// [`MessageHandler`]; drop unregisters it.
pub struct InputContextRouter {
    inner: Rc<RouterInner>,
    handler_id: HandlerId,
}

struct RouterInner {
    weak_self: Weak<RouterInner>,
    host: Rc<dyn HostChannel>,
    runner: TaskRunner,
    config: RouterConfig,
    registry: RefCell<ContextRegistry>,
    focused: Cell<Option<WindowHandle>>,
    stats: Cell<RouterStats>,
}

impl InputContextRouter {
    pub fn new(host: Rc<dyn HostChannel>, runner: TaskRunner, config: RouterConfig) -> Self {
        let inner = Rc::new_cyclic(|weak_self| RouterInner {
            weak_self: weak_self.clone(),
            host: host.clone(),
            runner,
            config,
            registry: RefCell::new(ContextRegistry::new()),
            focused: Cell::new(None),
            stats: Cell::new(RouterStats::default()),
        });
        let weak_inner: Weak<RouterInner> = Rc::downgrade(&inner);
        let as_handler: Weak<dyn MessageHandler> = weak_inner;
        let handler_id = host.register_handler(as_handler);
        Self { inner, handler_id }
    }

    /// Router on the calling thread's default runner.
    pub fn on_current_thread(host: Rc<dyn HostChannel>, config: RouterConfig) -> Self {
        Self::new(host, TaskRunner::current(), config)
    }

    pub fn register(&self, context: &ContextRef) -> Result<(), RouterError> {
        let handle = self.inner.registry.borrow_mut().insert(context)?;
        log::debug!("registered input context for {handle}");
        Ok(())
    }

    /// Removes `context`. Unknown contexts are ignored.
    pub fn unregister(&self, context: &ContextRef) {
        let removed = self.inner.registry.borrow_mut().remove(context);
        let Some(handle) = removed else {
            return;
        };
        log::debug!("unregistered input context for {handle}");
        if self.inner.focused.get() == Some(handle) {
            self.inner.focused.set(None);
        }
        if self.inner.config.reset_on_unregister {
            self.ime_reset(handle);
        }
    }

    /// Window whose context receives preedit start/end. Those events bind to
    /// the focus at the moment they are dispatched.
    pub fn set_focus(&self, handle: WindowHandle) {
        self.inner.focused.set(Some(handle));
    }

    /// Clears focus if `handle` currently holds it.
    pub fn clear_focus(&self, handle: WindowHandle) {
        if self.inner.focused.get() == Some(handle) {
            self.inner.focused.set(None);
        }
    }

    pub fn focused(&self) -> Option<WindowHandle> {
        self.inner.focused.get()
    }

    pub fn is_registered(&self, handle: WindowHandle) -> bool {
        self.inner.registry.borrow().contains(handle)
    }

    pub fn registered_handles(&self) -> Vec<WindowHandle> {
        self.inner.registry.borrow().handles()
    }

    pub fn dispatch_commit(&self, handle: WindowHandle, text: impl Into<String>) {
        self.inner.post(ImeMessage::Commit {
            handle,
            text: text.into(),
        });
    }

    pub fn dispatch_preedit_changed(
        &self,
        handle: WindowHandle,
        text: impl Into<String>,
        commit: impl Into<String>,
    ) {
        self.inner.post(ImeMessage::PreeditChanged {
            handle,
            text: text.into(),
            commit: commit.into(),
        });
    }

    pub fn dispatch_delete_range(&self, handle: WindowHandle, index: i32, length: u32) {
        self.inner.post(ImeMessage::DeleteRange {
            handle,
            index,
            length,
        });
    }

    pub fn dispatch_preedit_start(&self) {
        self.inner.post(ImeMessage::PreeditStart);
    }

    pub fn dispatch_preedit_end(&self) {
        self.inner.post(ImeMessage::PreeditEnd);
    }

    /// Tells the host to reset input-method state for `handle`.
    pub fn ime_reset(&self, handle: WindowHandle) {
        if let Err(e) = self.inner.host.send(HostMessage::ImeReset { handle }) {
            log::warn!("ime_reset for {handle} not sent: {e}");
        }
    }

    /// Runs queued deliveries until the runner is idle.
    pub fn flush(&self) -> usize {
        self.inner.runner.run_until_idle()
    }

    pub fn runner(&self) -> &TaskRunner {
        &self.inner.runner
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> RouterStats {
        self.inner.stats.get()
    }
}

impl MessageHandler for InputContextRouter {
    fn on_channel_established(&self, host_id: HostId) {
        self.inner.on_channel_established(host_id);
    }

    fn on_channel_destroyed(&self, host_id: HostId) {
        self.inner.on_channel_destroyed(host_id);
    }

    fn on_message_received(&self, message: &ImeMessage) {
        self.inner.on_message_received(message);
    }
}

impl Drop for InputContextRouter {
    fn drop(&mut self) {
        self.inner.host.unregister_handler(self.handler_id);
    }
}

impl RouterInner {
    fn post(&self, message: ImeMessage) {
        // handle-less events target whoever is focused now, not when the task runs
        let focused = match message {
            ImeMessage::PreeditStart | ImeMessage::PreeditEnd => self.focused.get(),
            _ => None,
        };
        let weak = self.weak_self.clone();
        self.runner.post_task(move || {
            if let Some(router) = weak.upgrade() {
                router.deliver(message, focused);
            }
        });
    }

    fn deliver(&self, message: ImeMessage, focused: Option<WindowHandle>) {
        let result = match &message {
            ImeMessage::Commit { handle, text } => self.with_context(*handle, |cx| cx.commit(text)),
            ImeMessage::PreeditChanged {
                handle,
                text,
                commit,
            } => self.with_context(*handle, |cx| cx.preedit_changed(text, commit)),
            ImeMessage::DeleteRange {
                handle,
                index,
                length,
            } => self.with_context(*handle, |cx| cx.delete_range(*index, *length)),
            ImeMessage::PreeditStart => self.with_focused(focused, |cx| cx.preedit_start()),
            ImeMessage::PreeditEnd => self.with_focused(focused, |cx| cx.preedit_end()),
        };

        let mut stats = self.stats.get();
        match result {
            Ok(()) => stats.delivered += 1,
            Err(e) => {
                stats.dropped += 1;
                if e.is_expected_drop() {
                    log::log!(
                        self.config.missing_context_level,
                        "dropping {}: {e}",
                        message.kind()
                    );
                } else {
                    log::warn!("dropping {}: {e}", message.kind());
                }
            }
        }
        self.stats.set(stats);
    }

    fn with_context(
        &self,
        handle: WindowHandle,
        f: impl FnOnce(&mut dyn InputContext),
    ) -> Result<(), RouterError> {
        // registry borrow ends here, so the context may (un)register from inside `f`
        let context = self
            .registry
            .borrow_mut()
            .lookup(handle)
            .ok_or(RouterError::HandleNotFound(handle))?;
        let mut cx = context
            .try_borrow_mut()
            .map_err(|_| RouterError::ContextBusy(handle))?;
        f(&mut *cx);
        Ok(())
    }

    fn with_focused(
        &self,
        focused: Option<WindowHandle>,
        f: impl FnOnce(&mut dyn InputContext),
    ) -> Result<(), RouterError> {
        let handle = focused.ok_or(RouterError::NoFocusedContext)?;
        self.with_context(handle, f)
    }
}

impl MessageHandler for RouterInner {
    fn on_channel_established(&self, host_id: HostId) {
        log::info!("input method channel established ({host_id})");
    }

    fn on_channel_destroyed(&self, host_id: HostId) {
        log::info!("input method channel destroyed ({host_id})");
        if self.config.clear_focus_on_channel_loss {
            self.focused.set(None);
        }
    }

    fn on_message_received(&self, message: &ImeMessage) {
        log::trace!("received {} for {:?}", message.kind(), message.handle());
        self.post(message.clone());
    }
}
