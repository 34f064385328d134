use tracing::debug;
use zbus::{proxy, Connection};

#[proxy(
    default_service = "org.freedesktop.UPower",
    default_path = "/org/freedesktop/UPower",
    interface = "org.freedesktop.UPower",
    gen_blocking = false
)]
trait UPower {
    #[zbus(property)]
    fn on_battery(&self) -> zbus::Result<bool>;
}

/// Machines without UPower are treated as plugged in.
pub async fn on_battery(system: &Connection) -> bool {
    let proxy = match UPowerProxy::new(system).await {
        Ok(proxy) => proxy,
        Err(e) => {
            debug!("UPower unavailable: {}", e);
            return false;
        }
    };
    proxy.on_battery().await.unwrap_or_else(|e| {
        debug!("Failed to read OnBattery: {}", e);
        false
    })
}
