//! End-to-end container behavior
//!
//! Drives the App through the commit and dispatch paths and checks what
//! listeners observe: sanitized merges, exactly-once notification per
//! committed change, and the ordering of multi-step action emissions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{future, stream, StreamExt};
use libtributary::{
    Actions, ActionError, ActionOutput, App, AppConfig, AppEvent, EventSource, Sanitizers,
    StateView,
};
use serde_json::{json, Value};

fn record_rendered(app: &App) -> Arc<Mutex<Vec<Value>>> {
    let log: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    app.add_event_listener(
        AppEvent::Rendered,
        Arc::new(move |state: StateView| {
            sink.lock().unwrap().push(state.snapshot());
        }),
    );
    log
}

fn upper(value: Value) -> Value {
    json!(value.as_str().unwrap_or_default().to_uppercase())
}

#[tokio::test]
async fn test_commit_sanitizes_then_merges() {
    let app = App::new(AppConfig {
        initial_state: json!({"person": {"first": "", "last": ""}, "city": ""}),
        sanitizers: Sanitizers::new().with("person.first", upper),
        ..Default::default()
    });
    app.start();

    app.commit(json!({"person": {"first": "john"}}));

    assert_eq!(
        app.state().snapshot(),
        json!({"person": {"first": "JOHN", "last": ""}, "city": ""})
    );
}

#[tokio::test]
async fn test_count_up_dispatch_commits_exactly_once() {
    let app = App::new(AppConfig {
        initial_state: json!({"count": 0}),
        actions: Actions::new().with("countUp", |state: StateView| {
            let count = state.get_i64("count").unwrap_or(0);
            ActionOutput::update(json!({"count": count + 1}))
        }),
        ..Default::default()
    });
    app.start();
    let rendered = record_rendered(&app);
    let before = rendered.lock().unwrap().len();

    app.dispatch("countUp").join().await.unwrap();

    assert_eq!(app.state().get_i64("count"), Some(1));
    assert_eq!(rendered.lock().unwrap().len(), before + 1);
}

#[tokio::test]
async fn test_dispatch_returns_before_the_action_runs() {
    let app = App::new(AppConfig {
        initial_state: json!({"count": 0}),
        actions: Actions::new().with("countUp", |state: StateView| {
            let count = state.get_i64("count").unwrap_or(0);
            ActionOutput::update(json!({"count": count + 1}))
        }),
        ..Default::default()
    });
    app.start();

    let handle = app.dispatch("countUp");
    // The dispatching turn is still running; the deferred action has not
    // committed yet.
    assert_eq!(app.state().get_i64("count"), Some(0));

    handle.join().await.unwrap();
    assert_eq!(app.state().get_i64("count"), Some(1));
}

#[tokio::test]
async fn test_multi_step_action_emits_ordered_rendered_notifications() {
    let app = App::new(AppConfig {
        initial_state: json!({"count": 0, "waiting": false}),
        actions: Actions::new().with("countUp3", |state: StateView| {
            let count = state.get_i64("count").unwrap_or(0);
            let first = stream::once(future::ready(Ok(
                json!({"waiting": true, "count": count + 1}),
            )));
            let second = stream::once(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(json!({"waiting": false, "count": count + 1}))
            });
            ActionOutput::stream(first.chain(second))
        }),
        ..Default::default()
    });
    app.start();
    let rendered = record_rendered(&app);

    app.dispatch("countUp3").join().await.unwrap();

    let rendered = rendered.lock().unwrap();
    assert_eq!(rendered.len(), 2, "one notification per emission, no extras");
    assert_eq!(rendered[0], json!({"count": 1, "waiting": true}));
    assert_eq!(rendered[1], json!({"count": 1, "waiting": false}));
}

#[tokio::test]
async fn test_unknown_action_is_a_silent_noop() {
    let app = App::new(AppConfig {
        initial_state: json!({"count": 0}),
        ..Default::default()
    });
    app.start();
    let rendered = record_rendered(&app);

    app.dispatch("nope").join().await.unwrap();

    assert!(rendered.lock().unwrap().is_empty());
    assert_eq!(app.state().snapshot(), json!({"count": 0}));
}

#[tokio::test]
async fn test_failing_action_keeps_prior_emissions() {
    let app = App::new(AppConfig {
        initial_state: json!({}),
        actions: Actions::new().with("flaky", |_| {
            ActionOutput::stream(stream::iter([
                Ok(json!({"step": 1})),
                Err(anyhow::anyhow!("boom")),
                Ok(json!({"step": 2})),
            ]))
        }),
        ..Default::default()
    });
    app.start();

    let result = app.dispatch("flaky").join().await;

    match result {
        Err(ActionError::Failed { name, .. }) => assert_eq!(name, "flaky"),
        other => panic!("expected named failure, got {other:?}"),
    }
    // The first emission was committed before the failure; nothing is
    // rolled back and the aborted step never lands.
    assert_eq!(app.state().snapshot(), json!({"step": 1}));
}

#[tokio::test]
async fn test_deferred_action_observes_state_at_resolution_time() {
    let app = App::new(AppConfig {
        initial_state: json!({"count": 0}),
        actions: Actions::new().with("lateRead", |state: StateView| {
            ActionOutput::deferred(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                // The view is live, so this read sees commits that landed
                // after dispatch.
                let count = state.get_i64("count").unwrap_or(0);
                Ok(Some(json!({"doubled": count * 2})))
            })
        }),
        ..Default::default()
    });
    app.start();

    let handle = app.dispatch("lateRead");
    app.commit(json!({"count": 21}));
    handle.join().await.unwrap();

    assert_eq!(app.state().get_i64("doubled"), Some(42));
}

#[tokio::test]
async fn test_actions_keep_committing_after_stop() {
    let app = App::new(AppConfig {
        initial_state: json!({"count": 0}),
        actions: Actions::new().with("slowCount", |_| {
            ActionOutput::deferred(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Some(json!({"count": 1})))
            })
        }),
        ..Default::default()
    });
    app.start();
    let rendered = record_rendered(&app);

    let handle = app.dispatch("slowCount");
    app.stop();
    handle.join().await.unwrap();

    // Stop silenced notification but not execution.
    assert!(rendered.lock().unwrap().is_empty());
    assert_eq!(app.state().get_i64("count"), Some(1));
}

#[tokio::test]
async fn test_null_in_partial_deletes_the_key() {
    let app = App::new(AppConfig {
        initial_state: json!({"person": {"first": "John", "last": "Doe"}}),
        ..Default::default()
    });
    app.start();

    app.commit(json!({"person": {"last": null}}));

    assert_eq!(app.state().snapshot(), json!({"person": {"first": "John"}}));
}
