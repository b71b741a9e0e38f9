//! Relay server demonstration.
//!
//! Demonstrates:
//! - Registering a host API (values, promise and callback methods, events)
//! - Reporting failures through the last-error slot
//! - Serving drivers until Ctrl+C
//!
//! Usage:
//!   cargo run --example relay_server
//!   cargo run --example relay_server -- --port 9333
//!   cargo run --example relay_server -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use browser_ext_relay::{EventTarget, HostApi, HostMethod, RelayOptions, RelayServer, Result};
use common::Args;

// ============================================================================
// Constants
// ============================================================================

const TICK_INTERVAL: Duration = Duration::from_secs(2);

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
    println!("=== Relay Server ===\n");

    // ========================================================================
    // Host API
    // ========================================================================

    let storage = Arc::new(Mutex::new(Map::new()));
    let on_updated = EventTarget::new();

    let builder = HostApi::builder();
    let last_error = builder.last_error_handle();

    let api = builder
        .value("runtime.id", json!("relay-demo@example.com"))
        .method("storage.local.get", storage_get(Arc::clone(&storage)))
        .method("storage.local.set", storage_set(Arc::clone(&storage)))
        .method(
            "alarms.create",
            HostMethod::callback(move |args, completion| {
                match args.first().and_then(Value::as_str) {
                    Some(name) if !name.is_empty() => completion.complete(json!(name)),
                    _ => {
                        last_error.set(json!({ "message": "alarm name required" }));
                        completion.complete(Value::Null);
                    }
                }
            }),
        )
        .event("tabs.onUpdated", on_updated.clone())
        .build()?;

    // ========================================================================
    // Event Source
    // ========================================================================

    tokio::spawn(async move {
        let mut tab_id = 0_u64;
        loop {
            tokio::time::sleep(TICK_INTERVAL).await;
            tab_id += 1;
            let delivered = on_updated.dispatch(json!({ "tabId": tab_id, "status": "complete" }));
            if delivered > 0 {
                println!("[Event] tabs.onUpdated -> {delivered} listener(s)");
            }
        }
    });

    // ========================================================================
    // Serve
    // ========================================================================

    let mut options = RelayOptions::new().with_port(args.port);
    if args.debug {
        options = options.with_debug();
    }

    let server = RelayServer::bind(Arc::new(api), options).await?;
    println!("[Setup] Listening on {}", server.ws_url());

    server
        .serve_with_shutdown(common::wait_for_exit(args.no_wait))
        .await?;

    println!("\n=== Done ===");
    Ok(())
}

// ============================================================================
// Host Methods
// ============================================================================

/// `storage.local.get(keys)` resolving to the stored subset.
fn storage_get(storage: Arc<Mutex<Map<String, Value>>>) -> HostMethod {
    HostMethod::promise(move |args| {
        let storage = Arc::clone(&storage);
        async move {
            let store = storage.lock();
            let selected: Map<String, Value> = match args.first() {
                Some(Value::Array(keys)) => keys
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|k| store.get(k).map(|v| (k.to_string(), v.clone())))
                    .collect(),
                Some(Value::String(key)) => store
                    .get(key)
                    .map(|v| (key.clone(), v.clone()))
                    .into_iter()
                    .collect(),
                _ => store.clone(),
            };
            Ok(Value::Object(selected))
        }
    })
}

/// `storage.local.set(items)` merging an object into the store.
fn storage_set(storage: Arc<Mutex<Map<String, Value>>>) -> HostMethod {
    HostMethod::promise(move |args| {
        let storage = Arc::clone(&storage);
        async move {
            let Some(Value::Object(items)) = args.into_iter().next() else {
                return Err(json!({ "message": "storage.local.set expects an object" }));
            };
            storage.lock().extend(items);
            Ok(Value::Null)
        }
    })
}
