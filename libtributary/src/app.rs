//! The state container.
//!
//! An [`App`] owns the canonical state object, the sanitizer tree, and
//! the action registry. Every mutation, whether it originates from a
//! form change, an action's emission, or a pre-start seed, funnels
//! through [`App::commit`], which applies sanitize → merge → notify as
//! one unit. Listeners observe the result through live [`StateView`]s,
//! never through the canonical tree itself.
//!
//! Commit is synchronous; the state write lock makes the merge atomic
//! with respect to every other commit. Notification happens after the
//! lock is released, so listeners may read freely (and may even commit
//! again). Dispatched actions run as spawned tasks and route each of
//! their emissions back through commit; ordering across concurrent
//! dispatches is scheduler order, and an in-flight action keeps running
//! and committing after [`App::stop`]; stop only silences notification.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures::StreamExt;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use crate::action::{run_action, Actions};
use crate::error::ActionError;
use crate::event::{EventCallback, EventSource, ListenerId};
use crate::extract::{to_data, to_name, InputEvent};
use crate::merge::merge;
use crate::path::Path;
use crate::sanitize::{sanitize, Sanitizers};
use crate::view::{SharedState, StateView};

/// Notifications emitted by an [`App`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppEvent {
    /// A commit landed; listeners should recompute what they show.
    Render,
    /// Follows `Render` for work that runs after the paint pass.
    Rendered,
    /// The container transitioned to running.
    Started,
    /// The container is about to clear its listeners and go quiet.
    Stopped,
}

/// Construction input for [`App::new`] and overlay input for
/// [`App::extend`]. All fields default to empty.
#[derive(Default)]
pub struct AppConfig {
    pub initial_state: Value,
    pub sanitizers: Sanitizers,
    pub actions: Actions,
}

/// What [`App::commit`] accepts: a ready partial update, or an input
/// event to extract one from.
pub enum CommitPayload {
    Data(Value),
    Event(InputEvent),
}

impl From<Value> for CommitPayload {
    fn from(value: Value) -> Self {
        CommitPayload::Data(value)
    }
}

impl From<InputEvent> for CommitPayload {
    fn from(event: InputEvent) -> Self {
        CommitPayload::Event(event)
    }
}

impl From<&InputEvent> for CommitPayload {
    fn from(event: &InputEvent) -> Self {
        CommitPayload::Event(event.clone())
    }
}

/// What [`App::dispatch`] accepts: an action name, or a click event to
/// resolve one from.
pub enum DispatchTarget {
    Name(String),
    Event(InputEvent),
}

impl From<&str> for DispatchTarget {
    fn from(name: &str) -> Self {
        DispatchTarget::Name(name.to_string())
    }
}

impl From<String> for DispatchTarget {
    fn from(name: String) -> Self {
        DispatchTarget::Name(name)
    }
}

impl From<InputEvent> for DispatchTarget {
    fn from(event: InputEvent) -> Self {
        DispatchTarget::Event(event)
    }
}

impl From<&InputEvent> for DispatchTarget {
    fn from(event: &InputEvent) -> Self {
        DispatchTarget::Event(event.clone())
    }
}

/// Handle to one dispatched action.
///
/// Awaiting it surfaces the action's terminal result; dropping it leaves
/// the action running to completion (failures still reach the log).
pub struct DispatchHandle {
    handle: JoinHandle<Result<(), ActionError>>,
}

impl DispatchHandle {
    /// Wait for the dispatched action to finish.
    pub async fn join(self) -> Result<(), ActionError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(ActionError::Aborted(err.to_string())),
        }
    }
}

struct AppInner {
    state: SharedState,
    sanitizers: RwLock<Sanitizers>,
    actions: RwLock<Actions>,
    listeners: Mutex<HashMap<AppEvent, Vec<(ListenerId, EventCallback<StateView>)>>>,
    running: AtomicBool,
}

/// The state container. Cheap to clone; clones share one state.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl App {
    /// Build a container. The initial state is sanitized once before it
    /// is stored; a non-object initial state is replaced by an empty one.
    pub fn new(config: AppConfig) -> Self {
        let AppConfig {
            initial_state,
            sanitizers,
            actions,
        } = config;
        let mut initial = match initial_state {
            value @ Value::Object(_) => value,
            _ => Value::Object(Map::new()),
        };
        sanitize(&mut initial, &sanitizers);
        Self {
            inner: Arc::new(AppInner {
                state: Arc::new(RwLock::new(initial)),
                sanitizers: RwLock::new(sanitizers),
                actions: RwLock::new(actions),
                listeners: Mutex::new(HashMap::new()),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Sanitize a partial update, merge it into state, and (when
    /// running) notify listeners with `Render` then `Rendered`.
    ///
    /// Events whose target carries no name, and non-object partials, are
    /// silent no-ops: most UI events carry nothing actionable. Commits
    /// before [`App::start`] mutate state without notifying, which is how
    /// callers pre-seed state.
    pub fn commit(&self, payload: impl Into<CommitPayload>) {
        let partial = match payload.into() {
            CommitPayload::Data(value) => value,
            CommitPayload::Event(event) => match to_data(&event) {
                Some(value) => value,
                None => {
                    debug!("commit event carries no named data");
                    return;
                }
            },
        };
        self.commit_value(partial);
    }

    fn commit_value(&self, mut partial: Value) {
        if !partial.is_object() {
            debug!("ignoring non-object partial update");
            return;
        }
        {
            let sanitizers = self
                .inner
                .sanitizers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            sanitize(&mut partial, &sanitizers);
        }
        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            merge(&mut state, partial);
        }
        if self.is_running() {
            self.emit(AppEvent::Render);
            self.emit(AppEvent::Rendered);
        }
    }

    /// Resolve and run a named action, routing every update it emits
    /// back through commit.
    ///
    /// Execution is deferred to the next scheduler turn so the
    /// dispatching turn finishes first. Unknown and unresolvable names
    /// are silent no-ops. The returned handle surfaces the action's
    /// failure to callers who await it; failures are also logged, so a
    /// dropped handle does not swallow them.
    ///
    /// Must be called within a tokio runtime.
    pub fn dispatch(&self, target: impl Into<DispatchTarget>) -> DispatchHandle {
        let name = match target.into() {
            DispatchTarget::Name(name) => (!name.is_empty()).then_some(name),
            DispatchTarget::Event(event) => to_name(&event),
        };
        let app = self.clone();
        let handle = tokio::spawn(async move {
            // Let the dispatching turn finish before the action begins.
            tokio::task::yield_now().await;
            let Some(name) = name else {
                debug!("dispatch event carries no action name");
                return Ok(());
            };
            let action = app
                .inner
                .actions
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&name);
            let Some(action) = action else {
                debug!(action = %name, "dispatch of unregistered action ignored");
                return Ok(());
            };
            let state = StateView::root(Arc::clone(&app.inner.state));
            let mut updates = run_action(&name, &action, state);
            while let Some(item) = updates.next().await {
                match item {
                    Ok(update) => app.commit_value(update),
                    Err(err) => {
                        error!(action = %name, error = %err, "dispatched action failed");
                        return Err(err);
                    }
                }
            }
            Ok(())
        });
        DispatchHandle { handle }
    }

    /// Transition to running. Idempotent. Fires an immediate
    /// `Render`/`Rendered` with the current state (the first paint
    /// reflects every commit made before start), then `Started`.
    pub fn start(&self) {
        if self.is_running() {
            return;
        }
        self.emit(AppEvent::Render);
        self.emit(AppEvent::Rendered);
        self.inner.running.store(true, Ordering::SeqCst);
        self.emit(AppEvent::Started);
    }

    /// Transition to stopped: emit `Stopped`, then clear every listener.
    ///
    /// State keeps accepting commits afterwards, silently; in-flight
    /// actions run to completion.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            self.emit(AppEvent::Stopped);
        }
        self.listeners().clear();
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Overlay additional sanitizers and actions (same-name registration
    /// overwrites) and commit the supplied state seed through the normal
    /// commit path.
    pub fn extend(&self, config: AppConfig) {
        let AppConfig {
            initial_state,
            sanitizers,
            actions,
        } = config;
        self.inner
            .sanitizers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(sanitizers);
        self.inner
            .actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(actions);
        self.commit_value(initial_state);
    }

    /// Register a change listener for the value at `path`, composed from
    /// [`changed`] over `Rendered`.
    pub fn on_change<F>(&self, path: Path, callback: F) -> ListenerId
    where
        F: Fn(Option<Value>) + Send + Sync + 'static,
    {
        self.add_event_listener(AppEvent::Rendered, changed(path, callback))
    }

    /// A live read-only view of the current state.
    pub fn state(&self) -> StateView {
        StateView::root(Arc::clone(&self.inner.state))
    }

    fn emit(&self, event: AppEvent) {
        // Snapshot the callback list so listeners can re-enter the App
        // (commit, subscribe, unsubscribe) without deadlocking.
        let callbacks: Vec<EventCallback<StateView>> = self
            .listeners()
            .get(&event)
            .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        for callback in callbacks {
            callback(StateView::root(Arc::clone(&self.inner.state)));
        }
    }

    fn listeners(
        &self,
    ) -> MutexGuard<'_, HashMap<AppEvent, Vec<(ListenerId, EventCallback<StateView>)>>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSource for App {
    type Kind = AppEvent;
    type Payload = StateView;

    fn add_event_listener(
        &self,
        kind: AppEvent,
        callback: EventCallback<StateView>,
    ) -> ListenerId {
        let id = Uuid::new_v4();
        self.listeners().entry(kind).or_default().push((id, callback));
        id
    }

    fn remove_event_listener(&self, kind: AppEvent, id: ListenerId) {
        if let Some(entries) = self.listeners().get_mut(&kind) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }
}

/// Wrap `callback` so it fires only when the serialized value at `path`
/// changes between invocations.
///
/// Register the result on [`AppEvent::Rendered`]. Detection compares
/// compact JSON serializations, so deep content changes in arrays and
/// objects count; the first observation fires iff the path currently
/// resolves. A pure composition layer; the listener registry knows
/// nothing about it.
pub fn changed<F>(path: Path, callback: F) -> EventCallback<StateView>
where
    F: Fn(Option<Value>) + Send + Sync + 'static,
{
    let last: Mutex<Option<String>> = Mutex::new(None);
    Arc::new(move |state: StateView| {
        let current = state.get_at(&path);
        let serialized = current.as_ref().map(Value::to_string).unwrap_or_default();
        let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
        let fire = match last.as_ref() {
            None => current.is_some(),
            Some(previous) => *previous != serialized,
        };
        *last = Some(serialized);
        if fire {
            callback(current);
        }
    })
}
