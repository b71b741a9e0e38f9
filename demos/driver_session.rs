//! Driver session demonstration.
//!
//! Demonstrates:
//! - Property reads and method calls under each calling convention
//! - Host errors coming back as command failures
//! - Subscribing to and unsubscribing from an event
//!
//! Start `relay_server` first, then:
//!   cargo run --example driver_session
//!   cargo run --example driver_session -- --port 9333
//!   cargo run --example driver_session -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use browser_ext_relay::{CommandMessage, Connection, RelayOptions, Result, ReturnType};
use common::Args;

// ============================================================================
// Constants
// ============================================================================

const EVENT_COUNT: usize = 2;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Driver Session ===\n");

    let options = RelayOptions::new().with_request_timeout(Duration::from_secs(5));
    let connection = Connection::connect_with_options(&args.url(), &options).await?;
    println!("[Setup] Connected to {}", args.url());

    // ========================================================================
    // Commands
    // ========================================================================

    let id = connection
        .command(CommandMessage::new("runtime.id").debug(args.debug))
        .await?;
    println!("[Read] runtime.id = {id}");

    connection
        .command(
            CommandMessage::new("storage.local")
                .method("set")
                .return_type(ReturnType::Promise)
                .arg(json!({ "greeting": "hello" })),
        )
        .await?;

    let stored = connection
        .command(
            CommandMessage::new("storage.local")
                .method("get")
                .return_type(ReturnType::Promise)
                .arg(json!(["greeting"])),
        )
        .await?;
    println!("[Call] storage.local.get = {stored}");

    match connection
        .command(
            CommandMessage::new("alarms")
                .method("create")
                .return_type(ReturnType::Callback),
        )
        .await
    {
        Ok(value) => println!("[Call] alarms.create = {value}"),
        Err(e) => println!("[Call] alarms.create failed as expected: {e}"),
    }

    if let Err(e) = connection.command(CommandMessage::new("tabs.missing")).await {
        println!("[Read] tabs.missing failed as expected: {e}");
    }

    // ========================================================================
    // Events
    // ========================================================================

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let listener_id = connection.subscribe("tabs.onUpdated", move |event| {
        let _ = event_tx.send(event.payload);
    })?;
    println!("[Subscribe] tabs.onUpdated as {listener_id}");

    for _ in 0..EVENT_COUNT {
        match event_rx.recv().await {
            Some(payload) => println!("[Event] tabs.onUpdated {payload}"),
            None => break,
        }
    }

    connection.unsubscribe(&listener_id)?;
    println!("[Unsubscribe] {listener_id}");

    connection.shutdown();
    println!("\n=== Done ===");
    Ok(())
}
