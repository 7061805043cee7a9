//! Terminal UI for palaver
//!
//! A thin shell over [`palaver_console::Driver`] that provides
//! terminal-specific I/O. All orchestration logic lives in the generic
//! [`palaver_console::Runtime`].
//!
//! This crate handles terminal rendering, the loopback transport and the
//! on-disk configuration.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod loopback;
pub mod store;
pub mod terminal;
pub mod ui;

pub use loopback::{Loopback, LoopbackHandle};
pub use palaver_console::{Driver, KeyInput, Runtime, Session, SessionEvent};
pub use store::FileStore;
pub use terminal::{TerminalDriver, TerminalError};
