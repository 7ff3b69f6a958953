//! Mutation watcher
//!
//! Turns mutation batches into debounced scans and notices client-side
//! navigation by comparing the document URL on every batch. The host is a
//! single-page app, so a URL change never comes with a reload.
//!
//! Navigation is tracked even while stopped; only scans are switched off.

use crate::trigger::{CoalescingTrigger, Ticket};

/// Default quiet period before a re-scan.
pub const DEFAULT_QUIET_MS: u64 = 50;

/// Watcher tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub quiet_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quiet_ms: DEFAULT_QUIET_MS,
        }
    }
}

/// Result of a mutation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// Schedule a timer for `quiet_ms` carrying this ticket. `None` while
    /// stopped.
    pub ticket: Option<Ticket>,
    /// Set when the URL differs from the previous batch
    pub navigated_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Watcher {
    trigger: CoalescingTrigger,
    last_url: String,
    running: bool,
}

impl Watcher {
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            trigger: CoalescingTrigger::new(config.quiet_ms),
            last_url: String::new(),
            running: false,
        }
    }

    pub fn quiet_ms(&self) -> u64 {
        self.trigger.quiet_ms()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_url(&self) -> &str {
        &self.last_url
    }

    /// Begin watching. The current URL becomes the navigation baseline.
    pub fn start(&mut self, url: &str) {
        self.running = true;
        self.last_url = url.to_string();
    }

    /// Begin watching again from the last known URL.
    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Set the navigation baseline without starting scans.
    pub fn follow(&mut self, url: &str) {
        self.last_url = url.to_string();
    }

    /// Stop watching and drop any pending scan.
    pub fn stop(&mut self) {
        self.running = false;
        self.trigger.cancel();
    }

    /// Handle one mutation batch.
    pub fn on_mutations(&mut self, now: u64, url: &str) -> MutationOutcome {
        let navigated_to = if url != self.last_url {
            self.last_url = url.to_string();
            Some(url.to_string())
        } else {
            None
        };
        let ticket = self.running.then(|| self.trigger.poke(now));
        MutationOutcome {
            ticket,
            navigated_to,
        }
    }

    /// Timer callback. True means: run a scan now.
    pub fn on_timer(&mut self, ticket: Ticket) -> bool {
        self.running && self.trigger.fire(ticket)
    }

    /// Polling variant of `on_timer` for hosts without cancellable timers.
    pub fn poll(&mut self, now: u64) -> bool {
        self.running && self.trigger.due(now)
    }

    pub fn is_pending(&self) -> bool {
        self.trigger.is_pending()
    }
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new(WatcherConfig::default())
    }
}
