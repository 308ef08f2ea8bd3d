//! Sign and verify example
//!
//! Uses a raw link (an I²C bridge exposed over TCP) to sign a digest with the
//! key in slot 0 and verify the signature on the chip. Ctrl-C cancels the
//! running command.

use atecc::{Device, DeviceConfig};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("DEVICE_ADDR").unwrap_or_else(|_| "127.0.0.1:7001".to_string());
    let slot: u8 = std::env::var("KEY_SLOT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let stream = TcpStream::connect(&addr).await?;
    let mut device = Device::open_raw(stream, DeviceConfig::i2c_default(), &cancel).await?;

    let public_key = device.public_key(slot, &cancel).await?;
    println!("Public key: {}", public_key);

    let mut digest = [0u8; 32];
    device.fill_random(&mut digest, &cancel).await?;

    let signature = match device.sign(u16::from(slot), &digest, &cancel).await {
        Err(e) if e.is_cancelled() => {
            println!("Cancelled");
            device.close().await?;
            return Ok(());
        }
        result => result?,
    };
    println!("Signature:  {}", signature);

    let valid = device
        .verify_extern(&digest, &signature, &public_key, &cancel)
        .await?;
    println!("Verified:   {}", valid);

    device.close().await?;
    Ok(())
}
