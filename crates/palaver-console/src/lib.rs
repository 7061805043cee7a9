//! Terminal session core for palaver.
//!
//! Pure state machines and a generic runtime for a multi-conversation chat
//! console. Nothing in this crate touches a terminal or a socket: input comes
//! in as [`SessionEvent`]s, side effects go out as [`SessionAction`]s, and
//! drawing goes through the [`Surface`] trait. Frontends provide a
//! [`Driver`].
//!
//! # Components
//!
//! - [`LineEditor`]: input line, history and nick completion
//! - [`ScrollbackBuffer`] and [`Viewport`]: per-tab history and its window
//! - [`TabRegistry`]: ordered, focus-tracking collection of tabs
//! - [`CommandDispatcher`]: argument grammars and tab-then-global routing
//! - [`Session`]: composes the above with the transport and the store
//! - [`Runtime`]: event loop over a [`Driver`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
pub mod bookmark;
pub mod command;
pub mod config;
mod driver;
pub mod editor;
pub mod env;
pub mod error;
mod event;
mod input;
pub mod participant;
pub mod plugin;
mod runtime;
pub mod scrollback;
mod session;
pub mod stanza;
pub mod store;
pub mod tabs;
pub mod transport;
pub mod viewport;

pub use action::SessionAction;
pub use bookmark::{Bookmark, BookmarkList, BookmarkMethod};
pub use command::{ArgGrammar, Args, CommandDispatcher, CommandSpec};
pub use config::Config;
pub use driver::Driver;
pub use editor::{CompletionMode, LineEditor};
pub use env::{Clock, ManualClock, SystemClock};
pub use error::{ArgumentError, CommandError, PluginError, RegistryError, StanzaError, StoreError};
pub use event::SessionEvent;
pub use input::KeyInput;
pub use runtime::Runtime;
pub use scrollback::{ScrollbackBuffer, ScrollbackLine};
pub use session::Session;
pub use store::{MemoryStore, Store};
pub use tabs::{FocusChange, Tab, TabId, TabKind, TabRegistry, TabState};
pub use transport::{RequestId, TransportEvent, TransportRequest};
pub use viewport::{Layout, Rect, StyleId, Surface, TextGrid, Viewport};
