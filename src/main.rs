use anyhow::{Context, Result};
use cc_driver::api::{ColorSwitchApi, LevelChangeOptions};
use cc_driver::transport::{SimulatedNode, SimulatedNodeConfig};
use cc_driver::{set_value, Driver, DriverConfig, Orchestrator};
use cc_protocol::cc::color_switch::{self, ColorComponent, ColorTable, LevelChangeDirection};
use cc_protocol::{Duration, InterviewKind, Value};

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = DriverConfig::default();
    let node_config = SimulatedNodeConfig::default();
    info!("Driver starting");
    info!("  Response timeout: {:?}", config.response_timeout);
    info!("  Simulated node: {}", node_config.address());

    let endpoint = node_config.describe_endpoint();
    let (node, events) = SimulatedNode::new(node_config, config.event_queue_capacity);
    let driver = Driver::start(config, node, events);
    let endpoint = driver.add_endpoint(endpoint);

    let orchestrator = Orchestrator::new(driver.clone());
    for report in orchestrator
        .interview_endpoint(&endpoint, InterviewKind::Complete)
        .await
    {
        match &report.error {
            None => info!("{} {}: {:?}", report.endpoint, report.class, report.state),
            Some(e) => warn!("{} {}: {}", report.endpoint, report.class, e),
        }
    }

    let colors = ColorSwitchApi::new(driver.clone(), endpoint.clone());
    colors
        .set(
            ColorTable::new()
                .with(ColorComponent::Red, 255)
                .with(ColorComponent::Blue, 64),
            Some(Duration::seconds(2)),
        )
        .await
        .context("Color set failed")?;
    let red = colors
        .get(ColorComponent::Red)
        .await
        .context("Color get failed")?;
    info!("Red is now {:?}", red);

    colors
        .start_level_change(
            ColorComponent::Green,
            LevelChangeOptions {
                direction: LevelChangeDirection::Up,
                ..Default::default()
            },
        )
        .await
        .context("Level change failed")?;
    colors
        .stop_level_change(ColorComponent::Green)
        .await
        .context("Stop level change failed")?;

    let warm_white = color_switch::target_value_id(endpoint.address().index, ColorComponent::WarmWhite);
    set_value(&driver, &endpoint, &warm_white, Value::Number(128))
        .await
        .context("Writing warm white failed")?;

    let node_id = endpoint.address().node_id;
    info!("Cached values for node {}:", node_id);
    for (id, value) in driver.cache().values_for_node(node_id) {
        info!("  {} = {:?}", id, value);
    }

    let cancelled = driver.shutdown().await;
    info!("Driver stopped ({} pending cancelled)", cancelled);
    Ok(())
}
