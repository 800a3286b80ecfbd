//! Flowgate server CLI
//!
//! Wires the adapter registry, gateway, orchestrator runtime, and
//! monitoring service into a single process behind the admin API.

mod admin_api;

use admin_api::{run_admin_server, AdminState};
use clap::Parser;
use flowgate_adapters::AdapterRegistry;
use flowgate_core::prelude::*;
use flowgate_gateway::IntegrationGateway;
use flowgate_monitor::MonitorService;
use flowgate_orchestrator::{MessageOrchestrator, OrchestratorRuntime, SimulatedProcessor};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "flowgated")]
#[command(about = "Tenant-scoped integration gateway and message orchestrator")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(long, env = "FLOWGATE_CONFIG")]
    config: Option<String>,

    /// Tenant served by this process
    #[arg(long, env = "FLOWGATE_TENANT", default_value = "default")]
    tenant: String,

    /// Admin API listen address (overrides configuration)
    #[arg(long, env = "ADMIN_LISTEN")]
    admin_listen: Option<String>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = FlowgateConfig::load(args.config.as_deref())?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    if config.observability.log_format == "pretty" {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        tenant = %args.tenant,
        "Starting flowgated"
    );

    let prometheus = PrometheusBuilder::new().install_recorder()?;

    // ─────────────────────────────────────────────────────────────────────────
    // Monitoring service
    // ─────────────────────────────────────────────────────────────────────────
    let (monitor_service, monitor_handle, monitor_core) =
        MonitorService::new(config.monitor.clone());
    let monitor_task = tokio::spawn(monitor_service.run());

    // ─────────────────────────────────────────────────────────────────────────
    // Gateway and orchestrator
    // ─────────────────────────────────────────────────────────────────────────
    let tenants: Arc<dyn TenantProvider> = Arc::new(StaticTenant::new(args.tenant.as_str()));

    let adapters = Arc::new(AdapterRegistry::with_defaults()?);
    let gateway = Arc::new(IntegrationGateway::new(
        config.gateway.clone(),
        adapters,
        tenants.clone(),
        monitor_handle.clone(),
    ));

    let processor = Arc::new(SimulatedProcessor::new(config.orchestrator.simulation.clone()));
    let orchestrator = Arc::new(MessageOrchestrator::new(
        config.orchestrator.clone(),
        processor,
        tenants.clone(),
        monitor_handle.clone(),
    ));
    let runtime = OrchestratorRuntime::spawn(orchestrator.clone());

    // ─────────────────────────────────────────────────────────────────────────
    // Admin API
    // ─────────────────────────────────────────────────────────────────────────
    let admin_task = if config.admin.enabled {
        let listen = args.admin_listen.unwrap_or_else(|| config.admin.listen.clone());
        let state = AdminState {
            gateway: gateway.clone(),
            orchestrator: orchestrator.clone(),
            monitor: monitor_core.clone(),
            tenants: tenants.clone(),
            prometheus,
        };
        Some(tokio::spawn(async move {
            if let Err(e) = run_admin_server(listen, state).await {
                error!(error = %e, "Admin server failed");
            }
        }))
    } else {
        None
    };

    // ─────────────────────────────────────────────────────────────────────────
    // Run until shutdown
    // ─────────────────────────────────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown();
    if let Some(task) = admin_task {
        task.abort();
    }
    drop(gateway);
    drop(orchestrator);
    drop(monitor_handle);
    monitor_task.abort();

    info!("flowgated stopped");
    Ok(())
}
