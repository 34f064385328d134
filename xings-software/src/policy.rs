use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::packagekit::TransactionFlags;
use crate::state::State;
use crate::updates::UpdateInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyDecision {
    Notify { urgent: bool },
    Skip,
}

/// Whether a freshly found update set deserves a notification now.
pub fn should_notify(
    settings: &Settings,
    state: &State,
    updates: &UpdateInfo,
    now: DateTime<Utc>,
) -> NotifyDecision {
    if !settings.notify_updates || !updates.has_updates() {
        return NotifyDecision::Skip;
    }

    let already_notified = |id: &String| state.notified_updates.contains(id);
    let ids = updates.package_id_strings();

    let new_urgent = updates
        .packages
        .iter()
        .filter(|p| p.is_urgent())
        .any(|p| !already_notified(&p.id.to_string()));
    if new_urgent {
        return NotifyDecision::Notify { urgent: true };
    }

    let unchanged = ids.iter().all(already_notified);
    if unchanged {
        return NotifyDecision::Skip;
    }

    let due = match state.last_updates_notification {
        None => true,
        Some(last) => (now - last)
            .to_std()
            .map(|since| since >= settings.notify_every())
            .unwrap_or(false),
    };
    if due {
        NotifyDecision::Notify { urgent: false }
    } else {
        NotifyDecision::Skip
    }
}

pub fn install_flags(settings: &Settings) -> TransactionFlags {
    if settings.only_trusted {
        TransactionFlags::ONLY_TRUSTED
    } else {
        TransactionFlags::NONE
    }
}

pub fn simulate_flags(settings: &Settings) -> TransactionFlags {
    install_flags(settings) | TransactionFlags::SIMULATE
}

pub fn download_flags(settings: &Settings) -> TransactionFlags {
    install_flags(settings) | TransactionFlags::ONLY_DOWNLOAD
}
