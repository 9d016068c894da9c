//! Junos Space
//!
//! Lists managed devices and, optionally, stages and deploys a software
//! image to one of them, printing the job id Space assigns to each step.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example space -- space.company.com admin juniper123
//! cargo run --example space -- space.company.com admin juniper123 sdubs-fw junos-srxsme-12.1X46-D30.2-domestic.tgz
//! ```

use std::env;

use junos::space::{SoftwareUpgrade, SpaceServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: space <host> <user> <password> [device image]");
        std::process::exit(1);
    }

    let space = SpaceServer::new(&args[0], &args[1], args[2].as_str())?;

    for device in space.devices().await? {
        println!(
            "Name: {}, IP Address: {}, Platform: {}, Version: {}, Status: {}",
            device.name, device.ip, device.platform, device.version, device.managed_status
        );
    }

    let (Some(device), Some(image)) = (args.get(3), args.get(4)) else {
        return Ok(());
    };

    let job = space.stage_software(device, image, false).await?;
    println!("staging {image} on {device}: job {job}");

    let options = SoftwareUpgrade {
        use_downloaded: true,
        reboot: true,
        ..SoftwareUpgrade::default()
    };
    let job = space.deploy_software(device, image, &options).await?;
    println!("deploying: job {job}");

    Ok(())
}
