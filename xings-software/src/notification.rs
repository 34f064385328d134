use std::collections::HashMap;

use anyhow::Result;
use futures::stream::{Stream, StreamExt};
use zbus::zvariant::Value;
use zbus::{proxy, Connection};

use crate::offline::OfflineResults;
use crate::packagekit::Restart;
use crate::updates::UpdateInfo;
use crate::{APP_ID, APP_NAME};

pub const ACTION_SHOW_UPDATES: &str = "show-updates";
pub const ACTION_INSTALL_UPDATES: &str = "install-updates";
pub const ACTION_RESTART: &str = "restart";
pub const ACTION_LOGOUT: &str = "logout";

const OBJECT_PATH: &str = "/io/github/xings/Software";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Urgency {
    Low = 0,
    Normal = 1,
    Critical = 2,
}

#[proxy(
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications",
    interface = "org.freedesktop.Notifications",
    gen_blocking = false
)]
trait Notifications {
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, &Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn close_notification(&self, id: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn action_invoked(&self, id: u32, action_key: String) -> zbus::Result<()>;

    #[zbus(signal)]
    fn notification_closed(&self, id: u32, reason: u32) -> zbus::Result<()>;
}

/// A notification the user clicked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: u32,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub summary: String,
    pub body: String,
    pub icon: &'static str,
    pub urgency: Urgency,
    /// Pairs of action key and label.
    pub actions: Vec<(&'static str, &'static str)>,
}

impl Message {
    pub fn updates_available(updates: &UpdateInfo) -> Self {
        let urgency = if updates.has_critical() {
            Urgency::Critical
        } else if updates.has_urgent() {
            Urgency::Normal
        } else {
            Urgency::Low
        };
        Self {
            summary: updates.summary_title(),
            body: updates.summary_body(),
            icon: "software-update-available-symbolic",
            urgency,
            actions: vec![
                (ACTION_SHOW_UPDATES, "Show Updates"),
                (ACTION_INSTALL_UPDATES, "Install Updates"),
            ],
        }
    }

    /// `None` when nothing needs restarting.
    pub fn restart_required(restart: Restart) -> Option<Self> {
        let (summary, body, action) = if restart.needs_reboot() {
            (
                "Restart required",
                "The computer needs to restart to finish installing updates.",
                (ACTION_RESTART, "Restart"),
            )
        } else if restart.needs_logout() {
            (
                "Log out required",
                "You need to log out and back in to finish installing updates.",
                (ACTION_LOGOUT, "Log Out"),
            )
        } else {
            return None;
        };
        let urgency = if matches!(restart, Restart::SecuritySystem | Restart::SecuritySession) {
            Urgency::Critical
        } else {
            Urgency::Normal
        };
        Some(Self {
            summary: summary.to_string(),
            body: body.to_string(),
            icon: "system-reboot-symbolic",
            urgency,
            actions: vec![action],
        })
    }

    pub fn offline_results(results: &OfflineResults) -> Self {
        Self {
            summary: results.title().to_string(),
            body: results.body(),
            icon: if results.success {
                "software-update-available-symbolic"
            } else {
                "dialog-error-symbolic"
            },
            urgency: if results.success {
                Urgency::Low
            } else {
                Urgency::Normal
            },
            actions: Vec::new(),
        }
    }

    pub fn error(summary: &str, body: &str) -> Self {
        Self {
            summary: summary.to_string(),
            body: body.to_string(),
            icon: "dialog-error-symbolic",
            urgency: Urgency::Normal,
            actions: Vec::new(),
        }
    }
}

/// Desktop notifications plus a session-bus signal for other applets.
pub struct UpdateNotifier {
    connection: Connection,
    notifications: NotificationsProxy<'static>,
}

impl UpdateNotifier {
    pub async fn new() -> Result<Self> {
        let connection = Connection::session().await?;
        let notifications = NotificationsProxy::new(&connection).await?;
        Ok(Self {
            connection,
            notifications,
        })
    }

    /// Shows `message`, replacing notification `replaces` when non-zero.
    pub async fn show(&self, message: &Message, replaces: u32) -> Result<u32> {
        let actions: Vec<&str> = message
            .actions
            .iter()
            .flat_map(|(key, label)| [*key, *label])
            .collect();
        let urgency = Value::from(message.urgency as u8);
        let desktop_entry = Value::from(APP_ID);
        let mut hints = HashMap::new();
        hints.insert("urgency", &urgency);
        hints.insert("desktop-entry", &desktop_entry);

        let id = self
            .notifications
            .notify(
                APP_NAME,
                replaces,
                message.icon,
                &message.summary,
                &message.body,
                &actions,
                hints,
                -1,
            )
            .await?;
        Ok(id)
    }

    pub async fn close(&self, id: u32) -> Result<()> {
        self.notifications.close_notification(id).await?;
        Ok(())
    }

    pub async fn actions(&self) -> Result<impl Stream<Item = Action> + Send + 'static> {
        let stream = self.notifications.receive_action_invoked().await?;
        Ok(stream.filter_map(|signal| async move {
            let args = signal.args().ok()?;
            Some(Action {
                id: *args.id(),
                key: args.action_key().clone(),
            })
        }))
    }

    /// Lets other panel applets know the update list changed.
    pub async fn broadcast_updates_changed(&self, count: u32) -> Result<()> {
        self.connection
            .emit_signal(None::<&str>, OBJECT_PATH, APP_ID, "UpdatesChanged", &(count,))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packagekit::transaction::Package;
    use crate::packagekit::{Info, PackageId};

    #[test]
    fn update_message_urgency_follows_severity() {
        let critical = UpdateInfo::from_packages(vec![Package::new(
            Info::Critical,
            PackageId::new("glibc", "2.39", "x86_64", "updates"),
            "",
        )]);
        let message = Message::updates_available(&critical);
        assert_eq!(message.urgency, Urgency::Critical);
        assert_eq!(message.actions.len(), 2);

        let plain = UpdateInfo::from_packages(vec![Package::new(
            Info::Enhancement,
            PackageId::new("gimp", "3.0", "x86_64", "updates"),
            "",
        )]);
        assert_eq!(Message::updates_available(&plain).urgency, Urgency::Low);
    }

    #[test]
    fn restart_messages() {
        assert!(Message::restart_required(Restart::Application).is_none());
        let reboot = Message::restart_required(Restart::SecuritySystem).unwrap();
        assert_eq!(reboot.actions, vec![(ACTION_RESTART, "Restart")]);
        assert_eq!(reboot.urgency, Urgency::Critical);
        let logout = Message::restart_required(Restart::Session).unwrap();
        assert_eq!(logout.actions, vec![(ACTION_LOGOUT, "Log Out")]);
    }
}
