//! Kit board example
//!
//! Talks to a kit board exposed as a byte stream on a TCP bridge (for example
//! a HID-to-TCP relay) and prints the chip identity and lock state.

use anyhow::Context;
use atecc::{Device, DeviceConfig, KitConfig, KitType};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let addr = std::env::var("KIT_ADDR").unwrap_or_else(|_| "127.0.0.1:7000".to_string());

    println!("Connecting to kit board at {}...", addr);
    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("connecting to {}", addr))?;

    let cancel = CancellationToken::new();
    let kit = KitConfig::default().with_kit_type(KitType::I2c);
    let mut device = Device::open_kit(stream, kit, DeviceConfig::kit_default(), &cancel).await?;
    println!("✓ Connected!");

    println!("Revision:      {}", device.revision(&cancel).await?);
    println!("Serial number: {}", device.serial_number(&cancel).await?);
    println!(
        "Config zone:   {}",
        if device.is_config_zone_locked(&cancel).await? { "locked" } else { "unlocked" }
    );
    println!(
        "Data zone:     {}",
        if device.is_data_zone_locked(&cancel).await? { "locked" } else { "unlocked" }
    );

    let config = device.read_config_zone(&cancel).await?;
    for (i, chunk) in config.chunks(16).enumerate() {
        println!("  {:03}: {}", i * 16, hex_line(chunk));
    }

    device.close().await?;
    println!("✓ Closed");

    Ok(())
}

fn hex_line(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
