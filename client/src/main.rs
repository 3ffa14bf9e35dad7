mod args;

use anyhow::{Context, Result};
use args::{Cli, Command};
use botproxy::logging::init_tracing;
use botproxy::{LocalApiProxy, Method, ProxyConfig, RequestForwarder, RequestSpec};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    info!("Starting bot proxy client...");

    match run(cli).await {
        Ok(body) => {
            println!("{}", body);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Request failed: {:#}", e);
            eprintln!("\nERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let config = ProxyConfig::from_env().context("failed to load configuration")?;

    let body = match cli.command {
        Command::Ports => {
            let ports = config.registry().resolve()?;
            serde_json::to_value(ports)?
        }
        Command::Bots {
            method,
            endpoint,
            bots,
            data,
            query,
            policy,
        } => {
            let mut forwarder = RequestForwarder::from_config(&config)?;
            if let Some(policy) = policy {
                forwarder = forwarder.with_policy(policy);
            }

            let mut spec = RequestSpec::new(method, endpoint);
            if !bots.is_empty() {
                spec = spec.with_targets(bots);
            }
            if let Some(data) = data {
                spec = spec.with_payload(data);
            }
            for (key, value) in query {
                spec = spec.with_query(key, value);
            }

            forwarder.request(&spec).await?
        }
        Command::Local {
            method,
            endpoint,
            data,
            query,
        } => {
            let proxy = LocalApiProxy::from_config(&config)?;
            let result = match method {
                Method::Get => proxy.get(&endpoint, &query).await,
                Method::Post => proxy.post(&endpoint, data.as_ref()).await,
                Method::Put => proxy.put(&endpoint, data.as_ref()).await,
                Method::Delete => proxy.delete(&endpoint).await,
            };
            proxy.close();
            result?
        }
    };

    Ok(serde_json::to_string_pretty(&body)?)
}
