//! rpcgate: JSON-RPC 2.0 over HTTP
//!
//! Serves a small set of demo methods so the engine can be exercised with
//! any HTTP client.
//!
//! Usage:
//!   rpcgate                                   # Default port 7070 on 127.0.0.1
//!   rpcgate --port 8080 --path /rpc           # Custom port and endpoint path
//!   rpcgate --allow-origin '*'                # Answer browsers from any origin
//!   rpcgate --token mysecret                  # Require `Authorization: Bearer mysecret`
//!
//!   curl -s localhost:7070 -H 'Content-Type: application/json' \
//!     -d '{"jsonrpc":"2.0","method":"add","params":[2,3],"id":1}'

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rpcgate_protocol::{HandlerResult, RpcError};
use rpcgate_server::{MethodRegistry, ParamSpec, RpcServer};
use rpcgate_transport::{BearerTokenCheck, CheckChain, CorsPolicy, TransportConfig, TransportServer};
use serde_json::{Number, Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rpcgate", about = "rpcgate: JSON-RPC 2.0 over HTTP")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "7070")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// URL path serving JSON-RPC calls
    #[arg(long, default_value = "/")]
    path: String,

    /// Origin allowed to read responses from a browser (repeatable, `*` for any)
    #[arg(long = "allow-origin")]
    allow_origin: Vec<String>,

    /// Require this bearer token on every call
    #[arg(long)]
    token: Option<String>,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value = "1048576")]
    max_body_bytes: usize,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if let Some(ref log_path) = cli.log_file {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("opening log file {}", log_path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();

        eprintln!("Logging to {}", log_path.display());
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// The demo method table.
fn demo_registry() -> anyhow::Result<MethodRegistry> {
    let registry = MethodRegistry::builder()
        .method("add", [ParamSpec::required("a"), ParamSpec::required("b")], |_, p| {
            add(&p.required::<Number>("a")?, &p.required::<Number>("b")?)
        })
        .method("echo", [ParamSpec::required("value")], |_, p| {
            p.required::<Value>("value")
        })
        .method(
            "greet",
            [ParamSpec::required("name"), ParamSpec::optional("greeting")],
            |_, p| {
                let name: String = p.required("name")?;
                let greeting = p.get_or("greeting", "Hello".to_string())?;
                Ok(json!(format!("{greeting}, {name}!")))
            },
        )
        .method("caller", [], |ctx, _| {
            Ok(ctx.caller.map_or(Value::Null, |addr| json!(addr.as_bytes())))
        })
        .method(
            "fail",
            [ParamSpec::required("code"), ParamSpec::required("message")],
            |_, p| Err(RpcError::custom(p.required("code")?, p.required::<String>("message")?)),
        )
        .method("panic", [], |ctx, _| panic!("{} was asked to panic", ctx.method))
        .build()?;
    Ok(registry)
}

/// Integer operands add exactly; anything else goes through `f64`.
fn add(a: &Number, b: &Number) -> HandlerResult {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Ok(json!(sum));
        }
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(json!(x + y)),
        _ => Err(RpcError::invalid_params()),
    }
}


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let server = Arc::new(RpcServer::new(demo_registry()?));

    let mut checks = CheckChain::new();
    if let Some(ref token) = cli.token {
        checks.add(BearerTokenCheck::new(token.clone()));
    }

    let config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        path: cli.path.clone(),
        cors: CorsPolicy::from_origins(cli.allow_origin.iter().cloned()),
        max_body_bytes: cli.max_body_bytes,
    };

    let mut transport = TransportServer::start_with_checks(config, server.clone(), checks)
        .await
        .context("starting HTTP transport")?;

    info!(
        "Serving {} methods: {}",
        server.registry().len(),
        server.registry().names().collect::<Vec<_>>().join(", ")
    );

    println!();
    println!("  rpcgate listening on http://{}{}", transport.local_addr(), cli.path);
    if cli.token.is_some() {
        println!("  Bearer token required.");
    }
    println!("  Press Ctrl+C to stop.");
    println!();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;

    println!();
    println!("  Shutting down...");
    transport.stop().await;
    println!("  Server stopped.");
    Ok(())
}
