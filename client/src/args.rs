use botproxy::{DispatchPolicy, Method};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "botproxy-client", version, about = "Send JSON requests to bots and the local API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved bot-to-port mapping
    Ports,
    /// Forward a request to the bots, returning the first answer
    Bots {
        /// GET, POST, PUT or DELETE
        method: Method,
        endpoint: String,
        /// Only contact these bots (repeatable; default: all)
        #[arg(short, long = "bot")]
        bots: Vec<String>,
        /// JSON body for POST and PUT
        #[arg(short, long)]
        data: Option<Value>,
        /// Extra query parameter as KEY=VALUE (repeatable)
        #[arg(short, long, value_parser = parse_key_val)]
        query: Vec<(String, String)>,
        /// Overrides DISPATCH_POLICY
        #[arg(short, long)]
        policy: Option<DispatchPolicy>,
    },
    /// Send a request to the local API service
    Local {
        method: Method,
        endpoint: String,
        #[arg(short, long)]
        data: Option<Value>,
        /// Query parameter as KEY=VALUE, GET only (repeatable)
        #[arg(short, long, value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
