//! Simulated device
//!
//! Runs the full configuration workflow against an in-process device with
//! a virtual clock, including a confirmed commit that is allowed to expire.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example simulated
//! ```

use std::time::Duration;

use chrono::Local;
use junos::sim::{ManualClock, SimulatedDevice};
use junos::{ConfigFormat, ConfigSource, OutputFormat, RollbackTarget};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let clock = ManualClock::new(Local::now().naive_local());
    let device = SimulatedDevice::builder("lab-srx")
        .model("SRX240H2")
        .version("12.1X47-D10.4")
        .config("set system host-name lab-srx\nset system services netconf ssh")
        .clock(clock.clone())
        .build()?;

    let mut session = device.open_session("admin").await?;
    print!("{}", session.facts());

    session.lock().await?;
    session
        .load_config(
            ConfigSource::inline("system {\n    name-server {\n        1.1.1.1;\n    }\n}\n"),
            ConfigFormat::Text,
            false,
        )
        .await?;
    println!("check: {:?}", session.commit_check().await?);
    session.commit_confirm(10).await?;
    println!("state: {}", session.tx_state());
    println!("{}", session.config_diff(1).await?);

    println!("\n... 10 minutes pass without confirmation ...\n");
    clock.advance(Duration::from_secs(10 * 60));

    println!("{}", session.get_config("system", OutputFormat::Text).await?);
    let history = session.commit_history().await?;
    println!("{}", serde_json::to_string_pretty(&history)?);

    // Reapply the change from history and keep it this time
    session.rollback_config(RollbackTarget::Index(1)).await?;
    session.commit().await?;
    session.unlock().await?;
    println!("\nactive:\n{}", device.active_config().to_set());

    session.close().await?;
    Ok(())
}
