use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::WindowHandle;

/// One window's input-method session.
///
/// The router never owns a context. Whoever creates the window keeps the
/// `Rc`; the router holds a `Weak` and stops delivering once it is gone.
pub trait InputContext {
    /// Routing key. Must not change while the context is registered.
    fn handle(&self) -> WindowHandle;

    fn commit(&mut self, text: &str);

    /// `commit` is text the input method finalised together with this
    /// update; it may be empty.
    fn preedit_changed(&mut self, text: &str, commit: &str);

    /// `index` is a byte offset relative to the caret, `length` a byte count.
    fn delete_range(&mut self, index: i32, length: u32);

    fn preedit_start(&mut self) {}

    fn preedit_end(&mut self) {}
}

pub type ContextRef = Rc<RefCell<dyn InputContext>>;
pub type WeakContextRef = Weak<RefCell<dyn InputContext>>;
