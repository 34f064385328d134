//! Logging out and rebooting through whichever session manager is running.

use anyhow::{Context, Result};
use tracing::{debug, info};
use zbus::fdo::DBusProxy;
use zbus::names::BusName;
use zbus::{proxy, Connection};

use crate::error::Error;

#[proxy(
    default_service = "org.gnome.SessionManager",
    default_path = "/org/gnome/SessionManager",
    interface = "org.gnome.SessionManager",
    gen_blocking = false
)]
trait GnomeSession {
    /// 0 asks for confirmation, 1 skips it, 2 forces.
    fn logout(&self, mode: u32) -> zbus::Result<()>;

    fn reboot(&self) -> zbus::Result<()>;
}

#[proxy(
    default_service = "org.xfce.SessionManager",
    default_path = "/org/xfce/SessionManager",
    interface = "org.xfce.Session.Manager",
    gen_blocking = false
)]
trait XfceSession {
    fn logout(&self, show_dialog: bool, allow_save: bool) -> zbus::Result<()>;

    fn restart(&self, allow_save: bool) -> zbus::Result<()>;
}

#[proxy(
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1",
    interface = "org.freedesktop.login1.Manager",
    gen_blocking = false
)]
trait Login1Manager {
    fn reboot(&self, interactive: bool) -> zbus::Result<()>;

    fn can_reboot(&self) -> zbus::Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gnome,
    Xfce,
    Logind,
}

impl Provider {
    fn bus_name(self) -> &'static str {
        match self {
            Provider::Gnome => "org.gnome.SessionManager",
            Provider::Xfce => "org.xfce.SessionManager",
            Provider::Logind => "org.freedesktop.login1",
        }
    }

    fn can_logout(self) -> bool {
        !matches!(self, Provider::Logind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Logout,
    Reboot,
}

/// First provider in preference order that can perform `action`.
pub fn pick(available: &[Provider], action: SessionAction) -> Option<Provider> {
    [Provider::Gnome, Provider::Xfce, Provider::Logind]
        .into_iter()
        .filter(|p| available.contains(p))
        .find(|p| action == SessionAction::Reboot || p.can_logout())
}

pub struct SessionManager {
    session: Connection,
    system: Connection,
    available: Vec<Provider>,
}

async fn has_owner(connection: &Connection, name: &'static str) -> bool {
    let Ok(dbus) = DBusProxy::new(connection).await else {
        return false;
    };
    let Ok(bus_name) = BusName::try_from(name) else {
        return false;
    };
    dbus.name_has_owner(bus_name).await.unwrap_or(false)
}

impl SessionManager {
    pub async fn detect() -> Result<Self> {
        let session = Connection::session()
            .await
            .context("Failed to connect to the session bus")?;
        let system = Connection::system()
            .await
            .context("Failed to connect to the system bus")?;

        let mut available = Vec::new();
        for provider in [Provider::Gnome, Provider::Xfce] {
            if has_owner(&session, provider.bus_name()).await {
                available.push(provider);
            }
        }
        if has_owner(&system, Provider::Logind.bus_name()).await {
            let login1 = Login1ManagerProxy::new(&system).await?;
            if login1.can_reboot().await.map(|v| v != "na").unwrap_or(false) {
                available.push(Provider::Logind);
            }
        }
        debug!("Session providers: {:?}", available);

        Ok(Self {
            session,
            system,
            available,
        })
    }

    pub fn available(&self) -> &[Provider] {
        &self.available
    }

    pub async fn logout(&self) -> Result<()> {
        let provider = pick(&self.available, SessionAction::Logout).ok_or(Error::NoSessionManager)?;
        info!("Logging out via {:?}", provider);
        match provider {
            Provider::Gnome => GnomeSessionProxy::new(&self.session).await?.logout(0).await?,
            Provider::Xfce => XfceSessionProxy::new(&self.session).await?.logout(true, true).await?,
            Provider::Logind => return Err(Error::NoSessionManager.into()),
        }
        Ok(())
    }

    pub async fn reboot(&self) -> Result<()> {
        let provider = pick(&self.available, SessionAction::Reboot).ok_or(Error::NoSessionManager)?;
        info!("Rebooting via {:?}", provider);
        match provider {
            Provider::Gnome => GnomeSessionProxy::new(&self.session).await?.reboot().await?,
            Provider::Xfce => XfceSessionProxy::new(&self.session).await?.restart(true).await?,
            Provider::Logind => Login1ManagerProxy::new(&self.system).await?.reboot(true).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_desktop_session_over_logind() {
        let all = [Provider::Logind, Provider::Xfce, Provider::Gnome];
        assert_eq!(pick(&all, SessionAction::Reboot), Some(Provider::Gnome));
        assert_eq!(pick(&all, SessionAction::Logout), Some(Provider::Gnome));
        assert_eq!(
            pick(&[Provider::Logind, Provider::Xfce], SessionAction::Reboot),
            Some(Provider::Xfce)
        );
    }

    #[test]
    fn logind_only_reboots() {
        assert_eq!(pick(&[Provider::Logind], SessionAction::Reboot), Some(Provider::Logind));
        assert_eq!(pick(&[Provider::Logind], SessionAction::Logout), None);
        assert_eq!(pick(&[], SessionAction::Reboot), None);
    }
}
