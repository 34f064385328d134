//! The session service behind `xings-update-notifier`.
//!
//! [`check_once`] and [`apply_updates`] work against any [`PackageBackend`];
//! [`UpdatesManager`] wires them to the scheduler, the desktop notification
//! server and the session manager.

use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::backend::PackageBackend;
use crate::config::{Settings, SettingsWatcher};
use crate::notification::{
    Action, Message, UpdateNotifier, ACTION_INSTALL_UPDATES, ACTION_LOGOUT, ACTION_RESTART,
    ACTION_SHOW_UPDATES,
};
use crate::offline::{self, OfflineResults};
use crate::packagekit::transaction::Options;
use crate::packagekit::{Client, Filters, Network, Restart, Role};
use crate::policy::{download_flags, install_flags, should_notify, NotifyDecision};
use crate::power;
use crate::scheduler::{retry_trigger, Conditions, Decision, Plan, Scheduler, Trigger};
use crate::session::SessionManager;
use crate::state::State;
use crate::updates::UpdateInfo;

/// What one check found and decided.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub updates: UpdateInfo,
    pub notify: NotifyDecision,
    /// Updates were fetched in the background, ready to apply.
    pub downloaded: bool,
}

/// Runs one update check. Marks `state.last_check`; recording the
/// notification is left to whoever actually shows it.
pub async fn check_once<B: PackageBackend + ?Sized>(
    backend: &B,
    settings: &Settings,
    state: &mut State,
    plan: Plan,
    now: DateTime<Utc>,
) -> Result<CheckOutcome> {
    let options = Options::background();

    if plan.refresh_cache {
        debug!("Refreshing the package cache");
        if let Err(e) = backend.refresh_cache(false, &options).await {
            warn!("Failed to refresh the package cache: {:#}", e);
        }
    }

    let results = backend.get_updates(Filters::NONE, &options).await?;
    let updates = UpdateInfo::from_packages(results.packages);
    info!("Found {} updates ({} urgent)", updates.total_updates, updates.urgent_updates());

    let mut downloaded = false;
    if settings.auto_download_updates && updates.has_updates() {
        match backend
            .update_packages(download_flags(settings), &updates.package_ids(), &options)
            .await
        {
            Ok(_) => downloaded = true,
            Err(e) => warn!("Failed to download updates: {:#}", e),
        }
    }

    let notify = should_notify(settings, state, &updates, now);
    state.last_check = Some(now);

    Ok(CheckOutcome {
        updates,
        notify,
        downloaded,
    })
}

/// Installs every pending update and returns the strongest restart any of
/// them asked for.
pub async fn apply_updates<B: PackageBackend + ?Sized>(
    backend: &B,
    settings: &Settings,
    options: &Options,
) -> Result<Restart> {
    let pending = backend.get_updates(Filters::NONE, options).await?;
    let updates = UpdateInfo::from_packages(pending.packages);
    if !updates.has_updates() {
        info!("No updates to apply");
        return Ok(Restart::None);
    }

    let results = backend
        .update_packages(install_flags(settings), &updates.package_ids(), options)
        .await?;
    Ok(results.restart_required())
}

/// Reads the machine state the scheduler needs. Failed reads fall back to
/// values that let a check go ahead; the check itself will then report.
pub async fn read_conditions<B: PackageBackend + ?Sized>(backend: &B) -> Conditions {
    let network = backend.network_state().await.unwrap_or_else(|e| {
        debug!("Failed to read the network state: {:#}", e);
        Network::Online
    });
    let locked = backend.is_locked().await.unwrap_or(false);
    let cache_age = backend
        .time_since_action(Role::RefreshCache)
        .await
        .unwrap_or(None);
    Conditions {
        network,
        on_battery: false,
        locked,
        cache_age,
    }
}

/// Up to a second of jitter so several sessions on one machine do not hit
/// the daemon at the same instant.
fn jitter() -> Duration {
    Duration::from_millis(rand::random::<u64>() % 1001)
}

fn settings_changes(watcher: Option<SettingsWatcher>) -> impl Stream<Item = Settings> {
    async_stream::stream! {
        let Some(mut watcher) = watcher else {
            return;
        };
        while let Some(settings) = watcher.changed().await {
            yield settings;
        }
    }
}

enum Wake {
    Check(Trigger),
    Settings(Settings),
    Action(Action),
}

/// What to ask the scheduler after waking. Settings changes and actions do
/// not replace a retry that is still owed.
fn next_trigger(wake: &Wake, pending: Trigger) -> Trigger {
    match wake {
        Wake::Check(trigger) => *trigger,
        Wake::Settings(_) | Wake::Action(_) => pending,
    }
}

pub struct UpdatesManager {
    client: Client,
    notifier: UpdateNotifier,
    scheduler: Scheduler,
    state: State,
    state_path: PathBuf,
    settings_path: PathBuf,
    updates_notification: u32,
    restart_notification: u32,
}

impl UpdatesManager {
    pub async fn new(settings_path: PathBuf, state_path: PathBuf) -> Result<Self> {
        let settings = Settings::load_from(&settings_path).unwrap_or_else(|e| {
            warn!("Using default settings: {:#}", e);
            Settings::default()
        });
        let state = State::load_from(&state_path).unwrap_or_else(|e| {
            warn!("Starting with empty state: {:#}", e);
            State::default()
        });
        let client = Client::connect().await?;
        let notifier = UpdateNotifier::new().await?;
        let scheduler = Scheduler::new(settings, Utc::now(), state.last_check);

        Ok(Self {
            client,
            notifier,
            scheduler,
            state,
            state_path,
            settings_path,
            updates_notification: 0,
            restart_notification: 0,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        self.report_offline_results().await;

        let watcher = SettingsWatcher::new(self.settings_path.clone())
            .map_err(|e| warn!("Not watching settings: {:#}", e))
            .ok();
        let packagekit = self.client.proxy().clone();
        let updates_changed = packagekit
            .receive_updates_changed()
            .await?
            .map(|_| Wake::Check(Trigger::UpdatesChanged));
        let actions = self.notifier.actions().await?.map(Wake::Action);
        let mut events = pin!(stream::select(
            stream::select(updates_changed, actions),
            settings_changes(watcher).map(Wake::Settings),
        ));

        let mut trigger = Trigger::Startup;
        loop {
            let (wait, pending) = self.step(trigger).await;
            let wait = wait + jitter();
            debug!("Next check ({:?}) in {:?}", pending, wait);

            let wake = tokio::select! {
                _ = tokio::time::sleep(wait) => Wake::Check(pending),
                event = events.next() => match event {
                    Some(event) => event,
                    None => return Ok(()),
                },
            };

            trigger = next_trigger(&wake, pending);
            match wake {
                Wake::Check(_) => {}
                Wake::Settings(settings) => {
                    info!("Settings changed");
                    self.scheduler.set_settings(settings);
                }
                Wake::Action(action) => self.handle_action(action).await,
            }
        }
    }

    /// Decides what `trigger` means right now. Returns how long to sleep and
    /// the trigger to replay when the sleep runs out.
    async fn step(&mut self, trigger: Trigger) -> (Duration, Trigger) {
        let mut conditions = read_conditions(&self.client).await;
        conditions.on_battery = power::on_battery(self.client.connection()).await;

        let decision = self.scheduler.decide(Utc::now(), trigger, conditions);
        let pending = retry_trigger(trigger, &decision);
        let wait = match decision {
            Decision::Run(plan) => {
                self.scheduler.begin();
                let success = self.check(plan).await;
                let now = Utc::now();
                self.scheduler.finish(now, success);
                self.scheduler.until_next_timer(now)
            }
            Decision::Defer { reason, retry_in } => {
                debug!("{:?}: deferring check ({:?})", trigger, reason);
                retry_in
            }
            Decision::Idle { next_in } => next_in,
        };
        (wait, pending)
    }

    async fn check(&mut self, plan: Plan) -> bool {
        let settings = self.scheduler.settings().clone();
        let outcome = match check_once(&self.client, &settings, &mut self.state, plan, Utc::now()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Update check failed: {:#}", e);
                return false;
            }
        };

        let count = u32::try_from(outcome.updates.total_updates).unwrap_or(u32::MAX);
        if let Err(e) = self.notifier.broadcast_updates_changed(count).await {
            debug!("Failed to broadcast update count: {:#}", e);
        }

        if !outcome.updates.has_updates() && self.updates_notification != 0 {
            let _ = self.notifier.close(self.updates_notification).await;
            self.updates_notification = 0;
        }

        if let NotifyDecision::Notify { urgent } = outcome.notify {
            let message = Message::updates_available(&outcome.updates);
            match self.notifier.show(&message, self.updates_notification).await {
                Ok(id) => {
                    debug!("Showed update notification {} (urgent: {})", id, urgent);
                    self.updates_notification = id;
                    self.state
                        .record_notification(Utc::now(), outcome.updates.package_id_strings());
                }
                Err(e) => warn!("Failed to show notification: {:#}", e),
            }
        }

        if let Err(e) = self.state.save_to(&self.state_path) {
            warn!("Failed to save state: {:#}", e);
        }
        true
    }

    async fn handle_action(&mut self, action: Action) {
        if action.id != self.updates_notification && action.id != self.restart_notification {
            return;
        }
        debug!("Notification action {}", action.key);
        let result = match action.key.as_str() {
            ACTION_SHOW_UPDATES => show_updates(),
            ACTION_INSTALL_UPDATES => self.install_updates().await,
            ACTION_RESTART => self.session_action(true).await,
            ACTION_LOGOUT => self.session_action(false).await,
            other => {
                debug!("Ignoring unknown action {}", other);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("Action {} failed: {:#}", action.key, e);
            let message = Message::error("Could not complete the action", &crate::error::user_message(&e));
            let _ = self.notifier.show(&message, 0).await;
        }
    }

    async fn install_updates(&mut self) -> Result<()> {
        let settings = self.scheduler.settings().clone();
        let restart = apply_updates(&self.client, &settings, &Options::interactive()).await?;
        self.updates_notification = 0;
        self.state.record_notification(Utc::now(), Vec::new());

        if let Some(message) = Message::restart_required(restart) {
            self.restart_notification = self.notifier.show(&message, self.restart_notification).await?;
        }
        Ok(())
    }

    async fn session_action(&self, reboot: bool) -> Result<()> {
        let session = SessionManager::detect().await?;
        if reboot {
            session.reboot().await
        } else {
            session.logout().await
        }
    }

    async fn report_offline_results(&mut self) {
        let results = match OfflineResults::load_from(&OfflineResults::default_path()) {
            Ok(Some(results)) => results,
            Ok(None) => return,
            Err(e) => {
                warn!("{:#}", e);
                return;
            }
        };
        info!("Reporting offline update results (success: {})", results.success);
        if let Err(e) = self.notifier.show(&Message::offline_results(&results), 0).await {
            warn!("Failed to show offline update results: {:#}", e);
        }
        match self.client.offline().await {
            Ok(proxy) => {
                if let Err(e) = offline::clear_results(&proxy).await {
                    warn!("{:#}", e);
                }
            }
            Err(e) => warn!("{:#}", e),
        }
    }
}

/// Terminal emulators tried in order, each with the flag that runs a command.
const TERMINALS: &[(&str, &str)] = &[
    ("x-terminal-emulator", "-e"),
    ("gnome-terminal", "--"),
    ("xfce4-terminal", "-x"),
    ("konsole", "-e"),
    ("xterm", "-e"),
];

/// The update viewer shipped next to this binary, or the one on `PATH`.
fn viewer_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("xings-update-viewer")))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("xings-update-viewer"))
}

/// `terminal flag viewer list --wait`, so the list lands in a window the user sees
/// rather than on the session service's own stdout.
fn viewer_command(terminal: &str, flag: &str, viewer: &std::path::Path) -> std::process::Command {
    let mut command = std::process::Command::new(terminal);
    command.arg(flag).arg(viewer).args(["list", "--wait"]);
    command
}

/// Opens `xings-update-viewer list --wait` in the first terminal emulator that starts.
fn show_updates() -> Result<()> {
    let viewer = viewer_path();
    for (terminal, flag) in TERMINALS {
        match viewer_command(terminal, flag, &viewer).spawn() {
            Ok(_) => return Ok(()),
            Err(e) => debug!("Cannot start {}: {}", terminal, e),
        }
    }
    anyhow::bail!("No terminal emulator found to show the update list")
}
