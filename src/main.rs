// llama-chat binary: sync the model catalog once and print it
//
// Usage: llama-chat [--reload]

use std::sync::Arc;

use anyhow::{Context, Result};
use llama_chat::catalog::{CatalogSnapshot, FetchState, Outcome};
use llama_chat::gateway::types::{capabilities, ModelLongData};
use llama_chat::{AppState, ClientConfig, OllamaConfig, OllamaGateway};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let reload = std::env::args().skip(1).any(|arg| arg == "--reload");

    let config = ClientConfig::from_env();
    let gateway = OllamaGateway::new(OllamaConfig {
        timeout_secs: config.request_timeout_secs,
    })
    .context("Failed to create model gateway")?;

    let state = AppState::start(config, Arc::new(gateway)).context("Failed to start llama-chat")?;

    if reload {
        state.reload_models();
    } else {
        state.trigger_sync();
    }
    state.wait_idle().await;

    print_catalog(&state.catalog.snapshot());

    state.shutdown().await;
    Ok(())
}

fn print_catalog(snapshot: &CatalogSnapshot) {
    let mut hosts: Vec<&String> = snapshot.hosts.keys().collect();
    hosts.sort();

    for host in hosts {
        match snapshot.host_state(host) {
            FetchState::Settled(Outcome::Failed(error)) => {
                println!("{}: error: {}", host, error);
                continue;
            }
            FetchState::Settled(Outcome::Ok) => println!("{}:", host),
            other => println!("{}: {:?}", host, other),
        }

        let Some(entry) = snapshot.host(host) else {
            continue;
        };
        for name in entry.model_names() {
            let Some(record) = entry.model(&name) else {
                continue;
            };
            match (&record.detail_info, &record.error) {
                (_, Some(error)) => println!("  {} (error: {})", name, error),
                (Some(detail), None) => println!("  {} {}", name, describe(detail)),
                (None, None) => println!("  {}", name),
            }
        }
    }
}

fn describe(detail: &ModelLongData) -> String {
    let mut parts = vec![detail.details.parameter_size.clone()];
    if let Some(ctx) = detail.context_length() {
        parts.push(format!("ctx {}", ctx));
    }
    if !detail.has_capability(capabilities::COMPLETION) {
        parts.push("no chat".to_string());
    }
    for capability in [capabilities::VISION, capabilities::TOOLS] {
        if detail.has_capability(capability) {
            parts.push(capability.to_string());
        }
    }
    parts.retain(|p| !p.is_empty());
    format!("[{}]", parts.join(", "))
}
