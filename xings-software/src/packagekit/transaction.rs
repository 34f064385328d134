//! Running a single PackageKit transaction to completion.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::future;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use zbus::fdo::PropertiesChanged;
use zbus::message::Message;
use zbus::zvariant::{OwnedObjectPath, OwnedValue};
use zbus::{Connection, MatchRule, MessageStream};

use super::enums::{ErrorCode, Exit, Info, Restart, Status, UpdateState};
use super::package_id::PackageId;
use super::proxy::{self, PackageKitProxy, TransactionProxy};
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub info: Info,
    pub id: PackageId,
    pub summary: String,
}

impl Package {
    pub fn new(info: Info, id: PackageId, summary: &str) -> Self {
        Self {
            info,
            id,
            summary: summary.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Details {
    pub package_id: Option<PackageId>,
    pub summary: String,
    pub description: String,
    pub url: String,
    pub license: String,
    pub size: u64,
    pub download_size: u64,
}

impl Details {
    pub fn from_map(map: &HashMap<String, OwnedValue>) -> Self {
        let text = |key: &str| {
            map.get(key)
                .and_then(|value| value.downcast_ref::<&str>().ok())
                .map(str::to_string)
                .unwrap_or_default()
        };
        let number = |key: &str| {
            map.get(key)
                .and_then(|value| value.downcast_ref::<u64>().ok())
                .unwrap_or(0)
        };

        Self {
            package_id: text("package-id").parse().ok(),
            summary: text("summary"),
            description: text("description"),
            url: text("url"),
            license: text("license"),
            size: number("size"),
            download_size: number("download-size"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateDetail {
    pub package_id: PackageId,
    pub updates: Vec<String>,
    pub obsoletes: Vec<String>,
    pub vendor_urls: Vec<String>,
    pub bugzilla_urls: Vec<String>,
    pub cve_urls: Vec<String>,
    pub restart: Restart,
    pub update_text: String,
    pub changelog: String,
    pub state: UpdateState,
    pub issued: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub status: Status,
    /// `None` while PackageKit cannot estimate progress.
    pub percentage: Option<u32>,
    pub package_id: Option<PackageId>,
}

/// Cancels an in-flight transaction from anywhere in the process.
#[derive(Debug, Clone)]
pub struct Cancellable {
    sender: Arc<watch::Sender<bool>>,
}

impl Cancellable {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::Sender::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for Cancellable {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call knobs shared by every backend operation.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub interactive: bool,
    pub background: bool,
    pub progress: Option<mpsc::UnboundedSender<Progress>>,
    pub cancellable: Option<Cancellable>,
}

impl Options {
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Default::default()
        }
    }

    pub fn background() -> Self {
        Self {
            background: true,
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellable(mut self, cancellable: Cancellable) -> Self {
        self.cancellable = Some(cancellable);
        self
    }

    pub(crate) fn hints(&self) -> Vec<String> {
        vec![
            format!("locale={}", current_locale()),
            format!("interactive={}", self.interactive),
            format!("background={}", self.background),
        ]
    }
}

fn current_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "C".to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Results {
    pub exit: Option<Exit>,
    pub runtime_ms: u32,
    pub packages: Vec<Package>,
    pub details: Vec<Details>,
    pub update_details: Vec<UpdateDetail>,
    pub restarts: Vec<(Restart, PackageId)>,
    pub error: Option<(ErrorCode, String)>,
}

impl Results {
    pub fn is_success(&self) -> bool {
        self.exit == Some(Exit::Success)
    }

    /// Highest restart level any package asked for.
    pub fn restart_required(&self) -> Restart {
        self.restarts
            .iter()
            .fold(Restart::None, |acc, (restart, _)| acc.max(*restart))
    }

    pub fn into_result(self) -> Result<Self, Error> {
        match self.exit {
            Some(Exit::Success) => Ok(self),
            Some(Exit::Cancelled) | Some(Exit::CancelledPriority) => Err(Error::Cancelled),
            _ => {
                let (code, details) = self
                    .error
                    .unwrap_or((ErrorCode::Unknown, "transaction did not succeed".to_string()));
                if code == ErrorCode::TransactionCancelled {
                    return Err(Error::Cancelled);
                }
                Err(Error::Transaction { code, details })
            }
        }
    }

    /// Folds one event in; returns the progress update to publish, if any.
    fn apply(&mut self, event: Event, progress: &mut Progress) -> Option<Progress> {
        match event {
            Event::Package { info, id, summary } => match id.parse::<PackageId>() {
                Ok(id) => {
                    let info = Info::from_u32(info);
                    self.packages.push(Package {
                        info,
                        id: id.clone(),
                        summary,
                    });
                    if is_progress_info(info) {
                        progress.package_id = Some(id);
                        return Some(progress.clone());
                    }
                }
                Err(e) => warn!("Ignoring package signal: {}", e),
            },
            Event::Details(details) => self.details.push(details),
            Event::UpdateDetail(detail) => self.update_details.push(detail),
            Event::ErrorCode { code, details } => {
                self.error = Some((ErrorCode::from_u32(code), details));
            }
            Event::RequireRestart { restart, id } => {
                if let Ok(id) = id.parse::<PackageId>() {
                    self.restarts.push((Restart::from_u32(restart), id));
                }
            }
            Event::ItemProgress { id, status } => {
                progress.status = Status::from_u32(status);
                progress.package_id = id.parse().ok();
                return Some(progress.clone());
            }
            Event::Status(status) => {
                progress.status = Status::from_u32(status);
                return Some(progress.clone());
            }
            Event::Percentage(percentage) => {
                progress.percentage = (percentage <= 100).then_some(percentage);
                return Some(progress.clone());
            }
            Event::Finished { exit, runtime } => {
                self.exit = Some(Exit::from_u32(exit));
                self.runtime_ms = runtime;
            }
            Event::Malformed(e) => warn!("Ignoring malformed transaction signal: {}", e),
        }
        None
    }
}

/// Package signals with these infos also describe work in progress.
fn is_progress_info(info: Info) -> bool {
    matches!(
        info,
        Info::Downloading
            | Info::Updating
            | Info::Installing
            | Info::Removing
            | Info::Cleanup
            | Info::Obsoleting
            | Info::Reinstalling
            | Info::Downgrading
            | Info::Preparing
            | Info::Decompressing
            | Info::Finished
    )
}

#[derive(Debug)]
enum Event {
    Package { info: u32, id: String, summary: String },
    Details(Details),
    UpdateDetail(UpdateDetail),
    ErrorCode { code: u32, details: String },
    RequireRestart { restart: u32, id: String },
    ItemProgress { id: String, status: u32 },
    Status(u32),
    Percentage(u32),
    Finished { exit: u32, runtime: u32 },
    Malformed(String),
}

/// Turns one signal from the transaction object into an [`Event`].
fn decode(message: &Message) -> Option<Event> {
    if let Some(signal) = proxy::Package::from_message(message.clone()) {
        return Some(match signal.args() {
            Ok(args) => Event::Package {
                info: *args.info(),
                id: args.package_id().clone(),
                summary: args.summary().clone(),
            },
            Err(e) => Event::Malformed(e.to_string()),
        });
    }
    if let Some(signal) = proxy::Details::from_message(message.clone()) {
        return Some(match signal.args() {
            Ok(args) => Event::Details(Details::from_map(args.data())),
            Err(e) => Event::Malformed(e.to_string()),
        });
    }
    if let Some(signal) = proxy::UpdateDetail::from_message(message.clone()) {
        return Some(match signal.args() {
            Ok(args) => match args.package_id().parse::<PackageId>() {
                Ok(package_id) => Event::UpdateDetail(UpdateDetail {
                    package_id,
                    updates: args.updates().clone(),
                    obsoletes: args.obsoletes().clone(),
                    vendor_urls: args.vendor_urls().clone(),
                    bugzilla_urls: args.bugzilla_urls().clone(),
                    cve_urls: args.cve_urls().clone(),
                    restart: Restart::from_u32(*args.restart()),
                    update_text: args.update_text().clone(),
                    changelog: args.changelog().clone(),
                    state: UpdateState::from_u32(*args.state()),
                    issued: args.issued().clone(),
                    updated: args.updated().clone(),
                }),
                Err(e) => Event::Malformed(e.to_string()),
            },
            Err(e) => Event::Malformed(e.to_string()),
        });
    }
    if let Some(signal) = proxy::ErrorCode::from_message(message.clone()) {
        return Some(match signal.args() {
            Ok(args) => Event::ErrorCode {
                code: *args.code(),
                details: args.details().clone(),
            },
            Err(e) => Event::Malformed(e.to_string()),
        });
    }
    if let Some(signal) = proxy::RequireRestart::from_message(message.clone()) {
        return Some(match signal.args() {
            Ok(args) => Event::RequireRestart {
                restart: *args.restart_type(),
                id: args.package_id().clone(),
            },
            Err(e) => Event::Malformed(e.to_string()),
        });
    }
    if let Some(signal) = proxy::ItemProgress::from_message(message.clone()) {
        return Some(match signal.args() {
            Ok(args) => Event::ItemProgress {
                id: args.id().clone(),
                status: *args.status(),
            },
            Err(e) => Event::Malformed(e.to_string()),
        });
    }
    if let Some(signal) = proxy::Finished::from_message(message.clone()) {
        return Some(match signal.args() {
            Ok(args) => Event::Finished {
                exit: *args.exit(),
                runtime: *args.runtime(),
            },
            Err(e) => Event::Malformed(e.to_string()),
        });
    }
    if let Some(signal) = PropertiesChanged::from_message(message.clone()) {
        let args = match signal.args() {
            Ok(args) => args,
            Err(e) => return Some(Event::Malformed(e.to_string())),
        };
        let changed = args.changed_properties();
        // Status and Percentage can change together; Status wins, the
        // percentage follows with the next signal that carries it.
        if let Some(status) = changed.get("Status").and_then(|v| v.downcast_ref::<u32>().ok()) {
            return Some(Event::Status(status));
        }
        if let Some(percentage) = changed
            .get("Percentage")
            .and_then(|v| v.downcast_ref::<u32>().ok())
        {
            return Some(Event::Percentage(percentage));
        }
    }
    None
}

/// Every signal the transaction object emits, in the order the bus delivered
/// them. One match rule on the object path keeps `Finished` behind the
/// `Package` and `RequireRestart` signals that precede it.
async fn event_stream(connection: &Connection, path: &OwnedObjectPath) -> Result<impl Stream<Item = Event>> {
    let rule = MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .path(path.clone())?
        .build();
    let messages = MessageStream::for_match_rule(rule, connection, None).await?;
    Ok(messages.filter_map(|message| {
        future::ready(match message {
            Ok(message) => decode(&message),
            Err(e) => Some(Event::Malformed(e.to_string())),
        })
    }))
}

/// Folds `events` into [`Results`] until `Finished`. When `cancelled`
/// completes, `cancel` runs once and collection carries on until the
/// daemon reports the end of the transaction.
async fn collect<S, C, K, KFut>(
    events: S,
    cancelled: C,
    cancel: K,
    progress_sender: Option<&mpsc::UnboundedSender<Progress>>,
) -> Result<Results>
where
    S: Stream<Item = Event>,
    C: Future<Output = ()>,
    K: FnOnce() -> KFut,
    KFut: Future<Output = ()>,
{
    tokio::pin!(events);
    tokio::pin!(cancelled);
    let mut cancel = Some(cancel);

    let mut results = Results::default();
    let mut progress = Progress {
        status: Status::Wait,
        percentage: None,
        package_id: None,
    };

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    bail!("transaction ended without finishing");
                };
                let finished = matches!(event, Event::Finished { .. });
                if let Some(update) = results.apply(event, &mut progress) {
                    if let Some(sender) = progress_sender {
                        let _ = sender.send(update);
                    }
                }
                if finished {
                    return Ok(results);
                }
            }
            _ = &mut cancelled, if cancel.is_some() => {
                if let Some(cancel) = cancel.take() {
                    cancel().await;
                }
            }
        }
    }
}

/// Creates a transaction, issues `call` on it and collects signals until `Finished`.
pub(crate) async fn run<F, Fut>(
    connection: &Connection,
    packagekit: &PackageKitProxy<'static>,
    options: &Options,
    call: F,
) -> Result<Results>
where
    F: FnOnce(TransactionProxy<'static>) -> Fut,
    Fut: Future<Output = zbus::Result<()>>,
{
    if options.cancellable.as_ref().is_some_and(Cancellable::is_cancelled) {
        return Err(Error::Cancelled.into());
    }

    let path = packagekit
        .create_transaction()
        .await
        .context("Failed to create PackageKit transaction")?;
    debug!("Created transaction {}", path.as_str());

    let proxy = TransactionProxy::builder(connection)
        .path(path.clone())?
        .build()
        .await?;

    let hints = options.hints();
    let hint_refs: Vec<&str> = hints.iter().map(String::as_str).collect();
    proxy.set_hints(&hint_refs).await?;

    // Subscribe before issuing the method so no signal is missed.
    let events = event_stream(connection, &path).await?;
    call(proxy.clone()).await?;

    let cancelled = async {
        match &options.cancellable {
            Some(cancellable) => cancellable.cancelled().await,
            None => std::future::pending().await,
        }
    };
    let (transaction, tx_path) = (&proxy, &path);
    let cancel = move || async move {
        debug!("Cancelling transaction {}", tx_path.as_str());
        if let Err(e) = transaction.cancel().await {
            warn!("Failed to cancel transaction {}: {}", tx_path.as_str(), e);
        }
    };

    let results = collect(events, cancelled, cancel, options.progress.as_ref())
        .await
        .with_context(|| format!("Transaction {}", path.as_str()))?;

    debug!(
        "Transaction {} finished: {:?} in {} ms",
        path.as_str(),
        results.exit,
        results.runtime_ms
    );
    Ok(results)
}
