//! When to look for updates.
//!
//! The scheduler never sleeps or talks to the bus itself. The session service
//! feeds it a trigger plus the current machine conditions and acts on the
//! returned [`Decision`].

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::packagekit::Network;

pub const OFFLINE_RETRY: Duration = Duration::from_secs(10 * 60);
pub const METERED_RETRY: Duration = Duration::from_secs(60 * 60);
pub const LOCKED_RETRY: Duration = Duration::from_secs(5 * 60);
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(60 * 60);
/// How often the timer wakes up when checks are disabled.
pub const IDLE_POLL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Timer,
    /// PackageKit announced that the update list changed.
    UpdatesChanged,
    /// The user asked for a check.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditions {
    pub network: Network,
    pub on_battery: bool,
    pub locked: bool,
    /// Time since the metadata cache was refreshed, `None` if never.
    pub cache_age: Option<Duration>,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            network: Network::Online,
            on_battery: false,
            locked: false,
            cache_age: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    StartupDelay,
    RateLimited,
    Offline,
    MobileNetwork,
    OnBattery,
    BackendBusy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub refresh_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run(Plan),
    Defer { reason: DeferReason, retry_in: Duration },
    Idle { next_in: Duration },
}

impl Decision {
    /// How long the caller should wait before asking again, if at all.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Decision::Run(_) => None,
            Decision::Defer { retry_in, .. } => Some(*retry_in),
            Decision::Idle { next_in } => Some(*next_in),
        }
    }
}

/// The trigger to replay once the wait after `decision` runs out. A deferred
/// trigger is retried as itself; after a check or an idle answer the timer
/// takes over.
pub fn retry_trigger(trigger: Trigger, decision: &Decision) -> Trigger {
    match decision {
        Decision::Defer { .. } => trigger,
        Decision::Run(_) | Decision::Idle { .. } => Trigger::Timer,
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    settings: Settings,
    started_at: DateTime<Utc>,
    last_check: Option<DateTime<Utc>>,
    last_failure: Option<DateTime<Utc>>,
    in_progress: bool,
}

fn elapsed(now: DateTime<Utc>, since: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

impl Scheduler {
    pub fn new(settings: Settings, started_at: DateTime<Utc>, last_check: Option<DateTime<Utc>>) -> Self {
        Self {
            settings,
            started_at,
            last_check,
            last_failure: None,
            in_progress: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.last_check
    }

    pub fn is_running(&self) -> bool {
        self.in_progress
    }

    pub fn decide(&self, now: DateTime<Utc>, trigger: Trigger, conditions: Conditions) -> Decision {
        if self.in_progress {
            return Decision::Idle {
                next_in: self.until_next_timer(now),
            };
        }

        let manual = trigger == Trigger::Manual;
        if !manual {
            let since_start = elapsed(now, self.started_at);
            let delay = self.settings.startup_delay();
            if since_start < delay {
                return Decision::Defer {
                    reason: DeferReason::StartupDelay,
                    retry_in: delay - since_start,
                };
            }
        }

        match trigger {
            Trigger::Startup | Trigger::Timer => {
                let wait = self.until_next_timer(now);
                if !wait.is_zero() || self.settings.get_updates_every().is_none() {
                    return Decision::Idle { next_in: wait };
                }
            }
            Trigger::UpdatesChanged => {
                if let Some(last) = self.last_check {
                    let since = elapsed(now, last);
                    let gap = self.settings.recheck_gap();
                    if since < gap {
                        return Decision::Defer {
                            reason: DeferReason::RateLimited,
                            retry_in: gap - since,
                        };
                    }
                }
            }
            Trigger::Manual => {}
        }

        if conditions.network == Network::Offline {
            return Decision::Defer {
                reason: DeferReason::Offline,
                retry_in: OFFLINE_RETRY,
            };
        }
        if !manual && conditions.network == Network::Mobile && !self.settings.connection_use_mobile {
            return Decision::Defer {
                reason: DeferReason::MobileNetwork,
                retry_in: METERED_RETRY,
            };
        }
        if !manual && conditions.on_battery && !self.settings.update_battery {
            return Decision::Defer {
                reason: DeferReason::OnBattery,
                retry_in: METERED_RETRY,
            };
        }
        if conditions.locked {
            return Decision::Defer {
                reason: DeferReason::BackendBusy,
                retry_in: LOCKED_RETRY,
            };
        }

        Decision::Run(Plan {
            refresh_cache: self.cache_is_stale(conditions.cache_age),
        })
    }

    fn cache_is_stale(&self, cache_age: Option<Duration>) -> bool {
        match (self.settings.refresh_cache_every(), cache_age) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(every), Some(age)) => age >= every,
        }
    }

    /// Zero when a timer check is due now.
    pub fn until_next_timer(&self, now: DateTime<Utc>) -> Duration {
        let Some(every) = self.settings.get_updates_every() else {
            return IDLE_POLL;
        };

        let mut due_in = match self.last_check {
            Some(last) => every.saturating_sub(elapsed(now, last)),
            None => Duration::ZERO,
        };
        if let Some(failed) = self.last_failure {
            due_in = due_in.max(FAILURE_BACKOFF.saturating_sub(elapsed(now, failed)));
        }
        due_in
    }

    pub fn begin(&mut self) {
        self.in_progress = true;
    }

    pub fn finish(&mut self, now: DateTime<Utc>, success: bool) {
        self.in_progress = false;
        if success {
            self.last_check = Some(now);
            self.last_failure = None;
        } else {
            self.last_failure = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    fn after(secs: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(secs)
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(Settings::default(), t0(), None)
    }

    #[test]
    fn waits_for_startup_delay() {
        let s = scheduler();
        assert_eq!(
            s.decide(after(10), Trigger::Startup, Conditions::default()),
            Decision::Defer {
                reason: DeferReason::StartupDelay,
                retry_in: Duration::from_secs(50),
            }
        );
        assert_eq!(
            s.decide(after(61), Trigger::Startup, Conditions::default()),
            Decision::Run(Plan { refresh_cache: true })
        );
    }

    #[test]
    fn manual_skips_startup_delay_and_battery() {
        let s = scheduler();
        let conditions = Conditions {
            on_battery: true,
            network: Network::Mobile,
            cache_age: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        assert_eq!(
            s.decide(after(1), Trigger::Manual, conditions),
            Decision::Run(Plan { refresh_cache: false })
        );
    }

    #[test]
    fn manual_still_respects_offline_and_lock() {
        let s = scheduler();
        let offline = Conditions {
            network: Network::Offline,
            ..Default::default()
        };
        assert!(matches!(
            s.decide(after(1), Trigger::Manual, offline),
            Decision::Defer { reason: DeferReason::Offline, .. }
        ));
        let locked = Conditions {
            locked: true,
            ..Default::default()
        };
        assert!(matches!(
            s.decide(after(1), Trigger::Manual, locked),
            Decision::Defer { reason: DeferReason::BackendBusy, .. }
        ));
    }

    #[test]
    fn timer_waits_for_frequency() {
        let mut s = scheduler();
        s.begin();
        s.finish(after(100), true);
        let decision = s.decide(after(100 + 3600), Trigger::Timer, Conditions::default());
        assert_eq!(
            decision,
            Decision::Idle {
                next_in: Duration::from_secs(crate::config::DAY_SECS - 3600),
            }
        );
        let due = after(100 + crate::config::DAY_SECS as i64);
        assert!(matches!(s.decide(due, Trigger::Timer, Conditions::default()), Decision::Run(_)));
    }

    #[test]
    fn zero_frequency_never_checks_on_timer() {
        let settings = Settings {
            frequency_get_updates: 0,
            ..Default::default()
        };
        let s = Scheduler::new(settings, t0(), None);
        assert_eq!(
            s.decide(after(7200), Trigger::Timer, Conditions::default()),
            Decision::Idle { next_in: IDLE_POLL }
        );
        assert!(matches!(
            s.decide(after(7200), Trigger::Manual, Conditions::default()),
            Decision::Run(_)
        ));
    }

    #[test]
    fn updates_changed_is_rate_limited() {
        let mut s = scheduler();
        s.begin();
        s.finish(after(120), true);
        assert_eq!(
            s.decide(after(140), Trigger::UpdatesChanged, Conditions::default()),
            Decision::Defer {
                reason: DeferReason::RateLimited,
                retry_in: Duration::from_secs(40),
            }
        );
        assert!(matches!(
            s.decide(after(200), Trigger::UpdatesChanged, Conditions::default()),
            Decision::Run(_)
        ));
    }

    #[test]
    fn rate_limited_updates_changed_is_retried() {
        let mut s = scheduler();
        s.begin();
        s.finish(after(120), true);

        let trigger = Trigger::UpdatesChanged;
        let decision = s.decide(after(140), trigger, Conditions::default());
        assert_eq!(decision.wait(), Some(Duration::from_secs(40)));

        let retry = retry_trigger(trigger, &decision);
        assert_eq!(retry, Trigger::UpdatesChanged);
        let decision = s.decide(after(180), retry, Conditions::default());
        assert!(matches!(decision, Decision::Run(_)));
        assert_eq!(retry_trigger(retry, &decision), Trigger::Timer);
    }

    #[test]
    fn deferred_triggers_keep_their_kind() {
        let s = scheduler();
        let offline = Conditions {
            network: Network::Offline,
            ..Default::default()
        };
        let decision = s.decide(after(120), Trigger::Manual, offline);
        assert_eq!(retry_trigger(Trigger::Manual, &decision), Trigger::Manual);

        let idle = Decision::Idle {
            next_in: Duration::from_secs(60),
        };
        assert_eq!(retry_trigger(Trigger::UpdatesChanged, &idle), Trigger::Timer);
    }

    #[test]
    fn metered_and_battery_defer_unless_allowed() {
        let s = scheduler();
        let mobile = Conditions {
            network: Network::Mobile,
            ..Default::default()
        };
        assert!(matches!(
            s.decide(after(61), Trigger::Timer, mobile),
            Decision::Defer { reason: DeferReason::MobileNetwork, .. }
        ));
        let battery = Conditions {
            on_battery: true,
            ..Default::default()
        };
        assert!(matches!(
            s.decide(after(61), Trigger::Timer, battery),
            Decision::Defer { reason: DeferReason::OnBattery, .. }
        ));

        let permissive = Scheduler::new(
            Settings {
                update_battery: true,
                connection_use_mobile: true,
                ..Default::default()
            },
            t0(),
            None,
        );
        let both = Conditions {
            network: Network::Mobile,
            on_battery: true,
            ..Default::default()
        };
        assert!(matches!(permissive.decide(after(61), Trigger::Timer, both), Decision::Run(_)));
    }

    #[test]
    fn running_check_makes_everything_idle() {
        let mut s = scheduler();
        s.begin();
        assert!(matches!(
            s.decide(after(1), Trigger::Manual, Conditions::default()),
            Decision::Idle { .. }
        ));
        assert!(s.is_running());
    }

    #[test]
    fn failure_backs_off_an_hour() {
        let mut s = scheduler();
        s.begin();
        s.finish(after(100), false);
        assert!(s.last_check().is_none());
        assert_eq!(
            s.decide(after(160), Trigger::Timer, Conditions::default()),
            Decision::Idle {
                next_in: FAILURE_BACKOFF - Duration::from_secs(60),
            }
        );
        assert!(matches!(
            s.decide(after(100 + 3600), Trigger::Timer, Conditions::default()),
            Decision::Run(_)
        ));
    }

    #[test]
    fn cache_refresh_follows_its_own_frequency() {
        let s = scheduler();
        let fresh = Conditions {
            cache_age: Some(Duration::from_secs(3600)),
            ..Default::default()
        };
        let stale = Conditions {
            cache_age: Some(Duration::from_secs(crate::config::DAY_SECS)),
            ..Default::default()
        };
        assert_eq!(
            s.decide(after(61), Trigger::Timer, fresh),
            Decision::Run(Plan { refresh_cache: false })
        );
        assert_eq!(
            s.decide(after(61), Trigger::Timer, stale),
            Decision::Run(Plan { refresh_cache: true })
        );
    }
}
