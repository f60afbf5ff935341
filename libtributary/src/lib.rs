//! Tributary - a reactive state container for UIs
//!
//! One canonical, arbitrarily nested state object, fed by two kinds of
//! update source: direct field commits (form input) and named actions
//! (clicks) that run synchronously, as a single future, or as a stream
//! of several updates over time. Every mutation funnels through one
//! commit choke point (sanitize, deep-merge, notify) so merge and
//! sanitization semantics are uniform regardless of where an update came
//! from, and subscribers hear about each committed change exactly once.

pub mod action;
pub mod app;
pub mod error;
pub mod event;
pub mod extract;
pub mod logging;
pub mod merge;
pub mod path;
pub mod sanitize;
pub mod view;

// Re-export commonly used types
pub use action::{run_action, Action, ActionOutput, Actions};
pub use app::{changed, App, AppConfig, AppEvent, CommitPayload, DispatchHandle, DispatchTarget};
pub use error::{ActionError, PathError, Result, TributaryError};
pub use event::{listen, EventCallback, EventSource, EventStream, ListenerId};
pub use extract::{extract, to_data, to_name, Control, Element, InputEvent};
pub use merge::{merge, merge_all};
pub use path::{expand, get_path, Path};
pub use sanitize::{emptize, sanitize, Sanitizers};
pub use view::StateView;
