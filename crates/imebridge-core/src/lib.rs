//! # Input-method routing
//!
//! `imebridge-core` sits between a host channel (the process that owns the
//! real input method) and the windows that want text. There are three main
//! pieces:
//!
//! - `InputContext`: one window's input-method session.
//! - `InputContextRouter`: looks up the context for a window handle and
//!   forwards events to it.
//! - `TaskRunner`: single-thread FIFO queue the router posts deliveries onto.
//!
//! ## Routing
//!
//! Contexts are shared as `Rc<RefCell<dyn InputContext>>`; the router only
//! keeps a `Weak` to each, so dropping a context is enough to stop delivery:
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use imebridge_core::*;
//!
//! let host = Rc::new(LoopbackHost::new());
//! let runner = TaskRunner::new();
//! let router = InputContextRouter::new(host.clone(), runner.clone(), RouterConfig::default());
//!
//! let field = Rc::new(RefCell::new(TextInputState::new(WindowHandle(7))));
//! let context: ContextRef = field.clone();
//! router.register(&context).unwrap();
//!
//! router.dispatch_commit(WindowHandle(7), "hello");
//! assert_eq!(field.borrow().text(), ""); // nothing runs until the queue is drained
//!
//! runner.run_until_idle();
//! assert_eq!(field.borrow().text(), "hello");
//! ```
//!
//! ## Failure mode
//!
//! An event for a handle with no live context is logged and dropped. The
//! context may legitimately have gone away between the host sending the
//! message and the task running. `RouterStats` counts deliveries and drops
//! for callers that want to observe this.
//!
//! ## Threads
//!
//! The router is `!Send`. Transport threads hand messages over through an
//! `InboundQueue`, which the owning thread drains with `pump`.

pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod handle;
pub mod host;
pub mod message;
pub mod registry;
pub mod router;
pub mod task;
pub mod text_state;


pub use capture::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use handle::*;
pub use host::*;
pub use message::*;
pub use registry::*;
pub use router::*;
pub use task::*;
pub use text_state::*;
