//! Named actions and the runner that normalizes their output.
//!
//! An action is a function from a live [`StateView`] to an
//! [`ActionOutput`]: a partial update produced right away, a future
//! resolving to one, or a stream yielding several over time. The runner
//! flattens all three shapes into a single stream of partial updates so
//! the dispatcher has exactly one loop, and tags any failure with the
//! action's registered name.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream};
use futures::{Future, FutureExt, Stream, StreamExt};
use serde_json::Value;

use crate::error::ActionError;
use crate::view::StateView;

/// What an action produces when invoked.
///
/// One tagged type instead of runtime shape-sniffing: the dispatcher
/// treats every variant as "a stream of zero or more partial updates".
pub enum ActionOutput {
    /// A partial update (or nothing) computed synchronously.
    Immediate(anyhow::Result<Option<Value>>),

    /// A single partial update resolved later.
    Deferred(BoxFuture<'static, anyhow::Result<Option<Value>>>),

    /// Several partial updates yielded over time.
    Stream(BoxStream<'static, anyhow::Result<Value>>),
}

impl ActionOutput {
    /// An immediate partial update.
    pub fn update(value: Value) -> Self {
        Self::Immediate(Ok(Some(value)))
    }

    /// No update at all.
    pub fn none() -> Self {
        Self::Immediate(Ok(None))
    }

    /// A synchronous failure.
    pub fn fail(error: impl Into<anyhow::Error>) -> Self {
        Self::Immediate(Err(error.into()))
    }

    /// A single update resolved by a future.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    /// A sequence of updates yielded by a stream.
    pub fn stream<S>(updates: S) -> Self
    where
        S: Stream<Item = anyhow::Result<Value>> + Send + 'static,
    {
        Self::Stream(updates.boxed())
    }
}

/// A registered action body.
#[derive(Clone)]
pub struct Action {
    f: Arc<dyn Fn(StateView) -> ActionOutput + Send + Sync>,
}

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(StateView) -> ActionOutput + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub fn invoke(&self, state: StateView) -> ActionOutput {
        (self.f)(state)
    }
}

/// Registry mapping dotted action names to action bodies.
///
/// Names are opaque keys; registering at an existing name overwrites.
#[derive(Clone, Default)]
pub struct Actions {
    entries: HashMap<String, Action>,
}

impl Actions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action body under `name`.
    pub fn with<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(StateView) -> ActionOutput + Send + Sync + 'static,
    {
        self.entries.insert(name.to_string(), Action::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<Action> {
        self.entries.get(name).cloned()
    }

    /// Overlay another registry; `other`'s entries win on name collisions.
    pub fn extend(&mut self, other: Actions) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Run one action against a live state view, normalized to a stream of
/// partial updates.
///
/// Null updates are skipped (a multi-step action may yield nothing for a
/// step). The first failure terminates the stream; updates emitted before
/// it stand; committed state is never rolled back.
pub fn run_action(
    name: &str,
    action: &Action,
    state: StateView,
) -> BoxStream<'static, Result<Value, ActionError>> {
    let name = name.to_string();
    match action.invoke(state) {
        ActionOutput::Immediate(result) => match result {
            Ok(Some(update)) if !update.is_null() => {
                stream::once(future::ready(Ok(update))).boxed()
            }
            Ok(_) => stream::empty().boxed(),
            Err(source) => {
                stream::once(future::ready(Err(ActionError::Failed { name, source }))).boxed()
            }
        },
        ActionOutput::Deferred(update) => stream::once(update)
            .filter_map(move |result| {
                future::ready(match result {
                    Ok(Some(update)) if !update.is_null() => Some(Ok(update)),
                    Ok(_) => None,
                    Err(source) => Some(Err(ActionError::Failed {
                        name: name.clone(),
                        source,
                    })),
                })
            })
            .boxed(),
        ActionOutput::Stream(updates) => updates
            .map(move |result| {
                result.map_err(|source| ActionError::Failed {
                    name: name.clone(),
                    source,
                })
            })
            .filter(|result| future::ready(!matches!(result, Ok(Value::Null))))
            .scan(false, |errored, item| {
                // Fuse after the first failure; later yields are dropped.
                if *errored {
                    return future::ready(None);
                }
                *errored = item.is_err();
                future::ready(Some(item))
            })
            .boxed(),
    }
}
