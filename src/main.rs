use clap::Parser;

use invision_mirror::config::{Cli, Commands};
use invision_mirror::http::HttpClient;
use invision_mirror::layout::Layout;
use invision_mirror::orchestrator::Orchestrator;
use invision_mirror::telemetry::{self, TelemetryConfig};
use invision_mirror::{metrics, serve};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Mirror { config } => {
            let provider = telemetry::init_tracing(TelemetryConfig {
                otlp_endpoint: config.telemetry.otlp_endpoint.clone(),
                service_name: "invision-mirror".to_string(),
            });
            metrics::init_metrics();

            let client = HttpClient::new(config.custom_ca_file.as_deref())?;
            let layout = Layout::new(config.docs_root.clone());
            let orchestrator = Orchestrator::new(client, layout);

            let result = orchestrator.run(&config).await;
            telemetry::shutdown_tracing(provider);

            let summary = result?;
            println!(
                "{{\"successful\": {}, \"ignored\": {}, \"failed\": {}}}",
                summary.successful, summary.ignored, summary.failed
            );
            if !summary.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Serve { config } => {
            let provider = telemetry::init_tracing(TelemetryConfig {
                otlp_endpoint: config.telemetry.otlp_endpoint.clone(),
                service_name: "invision-mirror".to_string(),
            });

            let result = serve::run(config).await;
            telemetry::shutdown_tracing(provider);
            result
        }
    }
}
