//! trib-demo - Interactive driver for the Tributary state container
//!
//! Feeds a small person/counter state with simulated form input and
//! click dispatches read from stdin, and prints the state each time the
//! container renders.

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use libtributary::logging::{LogFormat, LoggingConfig};
use libtributary::{
    listen, Actions, ActionOutput, App, AppConfig, AppEvent, Element, InputEvent, Sanitizers,
    StateView,
};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "trib-demo")]
#[command(version)]
#[command(about = "Interactive driver for the Tributary state container")]
#[command(long_about = "\
trib-demo - Interactive driver for the Tributary state container

DESCRIPTION:
    Runs a small App with a person/counter state, uppercase name
    sanitizers, and three counter actions (synchronous, delayed, and
    two-step streaming). Commands are read from stdin; the current state
    is printed on every render.

COMMANDS:
    set <name> <value>   Commit a field change (dotted names allowed),
                         e.g. `set person.first john`
    do <action>          Dispatch an action:
                         countUp, countUp2, countUp3, stamp
    state                Print the current state
    quit                 Stop the container and exit

EXAMPLE SESSION:
    set person.first john
    set city OSLO
    do countUp3
    quit
")]
struct Cli {
    /// Log output format: text, json, or pretty
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn upper(value: Value) -> Value {
    json!(value.as_str().unwrap_or_default().to_uppercase())
}

fn lower(value: Value) -> Value {
    json!(value.as_str().unwrap_or_default().to_lowercase())
}

fn build_app() -> App {
    App::new(AppConfig {
        initial_state: json!({
            "person": {"first": "", "last": ""},
            "city": "",
            "count": 0,
            "waiting": false
        }),
        sanitizers: Sanitizers::new()
            .with("person.first", upper)
            .with("person.last", upper)
            .with("city", lower),
        actions: Actions::new()
            .with("countUp", |state: StateView| {
                let count = state.get_i64("count").unwrap_or(0);
                ActionOutput::update(json!({"count": count + 1}))
            })
            .with("countUp2", |state: StateView| {
                let count = state.get_i64("count").unwrap_or(0);
                ActionOutput::deferred(async move {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok(Some(json!({"count": count + 1})))
                })
            })
            .with("countUp3", |state: StateView| {
                let count = state.get_i64("count").unwrap_or(0);
                let first = futures::stream::once(futures::future::ready(Ok(
                    json!({"waiting": true, "count": count + 1}),
                )));
                let second = futures::stream::once(async move {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok(json!({"waiting": false, "count": count + 2}))
                });
                ActionOutput::stream(first.chain(second))
            })
            .with("stamp", |_| {
                ActionOutput::update(json!({"stamp": chrono::Utc::now().to_rfc3339()}))
            }),
    })
}

fn handle_command(app: &App, line: &str) -> bool {
    let mut words = line.split_whitespace();
    match words.next() {
        Some("set") => {
            let (Some(name), Some(value)) = (words.next(), words.next()) else {
                eprintln!("usage: set <name> <value>");
                return true;
            };
            app.commit(InputEvent::new(Element::text(name, value)));
        }
        Some("do") => {
            let Some(name) = words.next() else {
                eprintln!("usage: do <action>");
                return true;
            };
            // Fire-and-forget: failures reach the log through dispatch.
            let _ = app.dispatch(InputEvent::new(Element::button(name)));
        }
        Some("state") => println!("state: {}", app.state().snapshot()),
        Some("quit") => {
            app.stop();
            return false;
        }
        Some(other) => eprintln!("unknown command: {other}"),
        None => {}
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    LoggingConfig::new(cli.log_format, cli.log_level, cli.verbose).init();

    let app = build_app();
    // Subscribe before start so the initial paint lands in the stream.
    let mut rendered = listen(&app, AppEvent::Rendered);
    app.start();

    info!("trib-demo started; type commands (try `do countUp3`)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(state) = rendered.next() => {
                println!("state: {}", state.snapshot());
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        debug!(command = line.trim(), "stdin command");
                        if !handle_command(&app, line.trim()) {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    info!("trib-demo stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_app_sanitizes_field_commits() {
        let app = build_app();
        app.commit(InputEvent::new(Element::text("person.first", "john")));
        app.commit(InputEvent::new(Element::text("city", "OSLO")));

        assert_eq!(app.state().get_str("person.first").as_deref(), Some("JOHN"));
        assert_eq!(app.state().get_str("city").as_deref(), Some("oslo"));
    }

    #[tokio::test]
    async fn test_demo_count_up_action() {
        let app = build_app();
        app.dispatch("countUp").join().await.unwrap();
        assert_eq!(app.state().get_i64("count"), Some(1));
    }

    #[test]
    fn test_quit_stops_the_container() {
        let app = build_app();
        app.start();
        assert!(app.is_running());
        assert!(!handle_command(&app, "quit"));
        assert!(!app.is_running());
    }
}
