use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI, mirroring the teacher's `render`/`lsp` subcommand split.
#[derive(Debug, Parser)]
#[command(
    name = "invision-mirror",
    version,
    about = "Mirrors an InVision account into a local archive and serves it read-only"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the mirroring engine once and exit.
    Mirror {
        #[command(flatten)]
        config: MirrorConfig,
    },
    /// Serve an already-populated archive over HTTP.
    Serve {
        #[command(flatten)]
        config: ServeConfig,
    },
}

/// How an existing, non-empty `docs_root` should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunOption {
    /// Remove `docs_root` entirely before starting.
    Overwrite,
    /// Reconcile against the existing archive, skipping up-to-date projects/screens.
    Update,
}

impl std::fmt::Display for RunOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOption::Overwrite => f.write_str("overwrite"),
            RunOption::Update => f.write_str("update"),
        }
    }
}

/// Configuration for a single mirroring run.
///
/// Every field is also readable from the environment, matching the original
/// scraper's reliance on `os.getenv` for every one of these.
#[derive(Debug, Clone, Parser)]
pub struct MirrorConfig {
    /// Account email used for the classic + API login.
    #[arg(long, env = "INVISION_EMAIL")]
    pub invision_email: String,

    /// Account password used for the classic + API login.
    #[arg(long, env = "INVISION_PASSWORD")]
    pub invision_password: String,

    /// Root directory the mirror is written under.
    #[arg(long, env = "DOCS_ROOT", default_value = "./docs")]
    pub docs_root: PathBuf,

    /// Restricts the run to one project per type. Accepts `true`/`1`.
    #[arg(long, env = "TEST_MODE", default_value_t = false)]
    pub test_mode: bool,

    /// Filename under the system CA directory to append to the trust store.
    #[arg(long, env = "CUSTOM_CA_FILE")]
    pub custom_ca_file: Option<String>,

    /// How to treat a non-empty, pre-existing `docs_root`.
    #[arg(long, value_enum)]
    pub option: Option<RunOption>,

    #[command(flatten)]
    pub telemetry: TelemetryArgs,
}

/// Configuration for the read-only serving layer.
#[derive(Debug, Clone, Parser)]
pub struct ServeConfig {
    /// Root directory the archive is read from.
    #[arg(long, env = "DOCS_ROOT", default_value = "./docs")]
    pub docs_root: PathBuf,

    /// Address the HTTP server binds to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:4000")]
    pub bind: String,

    /// Credentials used when `/scrape` triggers a mirroring run.
    #[arg(long, env = "INVISION_EMAIL")]
    pub invision_email: Option<String>,
    #[arg(long, env = "INVISION_PASSWORD")]
    pub invision_password: Option<String>,

    #[command(flatten)]
    pub telemetry: TelemetryArgs,
}

#[derive(Debug, Clone, Parser)]
pub struct TelemetryArgs {
    /// OTLP endpoint for exporting traces, e.g. "http://localhost:4317".
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}
