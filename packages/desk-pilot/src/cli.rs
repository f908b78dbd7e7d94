//! Command-line entrypoint.

use clap::{Parser, Subcommand};

use desk_pilot_error::PilotError;

use crate::config::Config;
use crate::router::{build_router, AppState};
use crate::telemetry;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 4466;

#[derive(Debug, Parser)]
#[command(name = "desk-pilot", version, about = "Model-driven remote desktop sessions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve {
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

pub fn run_desk_pilot() -> Result<(), PilotError> {
    let cli = Cli::parse();
    telemetry::init_tracing();

    match cli.command.unwrap_or(Command::Serve {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_PORT,
    }) {
        Command::Serve { host, port } => serve(&host, port),
    }
}

fn serve(host: &str, port: u16) -> Result<(), PilotError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| PilotError::config(format!("failed to start runtime: {err}")))?;

    runtime.block_on(async {
        let config = Config::from_env();
        let app = build_router(AppState::new(config));

        let addr = format!("{host}:{port}");
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|err| PilotError::config(format!("failed to bind {addr}: {err}")))?;
        tracing::info!(%addr, "desk-pilot listening");

        axum::serve(listener, app)
            .await
            .map_err(|err| PilotError::stream(format!("server failed: {err}")))
    })
}
