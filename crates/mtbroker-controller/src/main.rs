//! mtbroker controller - reconciles Triggers of multi-tenant channel-based Brokers

use clap::Parser;
use kube::{Client, CustomResourceExt};

use mtbroker_common::crd::{Broker, Subscription, Trigger};
use mtbroker_common::telemetry::{init_telemetry, TelemetryConfig};
use mtbroker_controller::controller_runner::build_trigger_controllers;
use mtbroker_controller::ControllerConfig;

/// Multi-tenant broker Trigger controller
#[derive(Parser, Debug)]
#[command(name = "mtbroker-controller", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    config: ControllerConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        for crd in [Trigger::crd(), Broker::crd(), Subscription::crd()] {
            let yaml = serde_yaml::to_string(&crd)
                .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
            println!("---\n{yaml}");
        }
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        service_name: "mtbroker-controller".to_string(),
        ..Default::default()
    })?;

    run_controller(cli.config).await
}

async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    tracing::info!(
        system_namespace = %config.system_namespace,
        cluster_domain = %config.cluster_domain,
        "Starting mtbroker controller"
    );

    let controllers = build_trigger_controllers(client, &config);
    futures::future::join_all(controllers).await;

    tracing::info!("Shutting down");
    Ok(())
}
