//! Session controller
//!
//! One object owns everything the content script keeps between callbacks:
//! the blocklist mirror, the preferences, the watcher and the quality state
//! machine. The browser layer feeds it events and performs the side effects
//! it asks for.
//!
//! The `enabled` switch gates filtering only. Auto quality follows
//! navigation whether filtering is on or off.

use serde_json::Value;

use crate::filter::{run_pass, FilterOptions, ScanReport};
use crate::messages::ContentMessage;
use crate::page::PageAdapter;
use crate::prefs::{PrefKey, Preferences};
use crate::quality::{parse_preferred, PlayerControls, QualityApplier, QualityConfig, QualityStep};
use crate::store::{BlocklistStore, KeyValueStore, StoreError};
use crate::trigger::Ticket;
use crate::types::{BlockTarget, ListKind};
use crate::url::is_stream_url;
use crate::watcher::{Watcher, WatcherConfig};

/// A value that must be written to the real storage area.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub key: &'static str,
    pub value: Value,
}

/// What the browser layer should do after a storage change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeEffect {
    /// Filtering was switched on: install the observer and scan
    Started,
    /// Filtering was switched off; pending scans are dropped
    Stopped,
    /// Blocklists or filter options changed: scan again
    Rescan,
    /// New volume boost gain
    Volume(f64),
    /// Search history should be cleared now
    ClearSearchHistory,
    Ignored,
}

/// What the browser layer should do after a mutation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationEffect {
    /// Arm the quiet-period timer with this ticket
    pub scan: Option<Ticket>,
    /// Set on navigation: the run in flight is gone, follow this step instead
    pub quality: Option<QualityStep>,
}

pub struct Controller<S: KeyValueStore> {
    store: BlocklistStore<S>,
    prefs: Preferences,
    watcher: Watcher,
    quality: QualityApplier,
}

impl<S: KeyValueStore> Controller<S> {
    pub fn new(backend: S) -> Self {
        Self::with_config(backend, WatcherConfig::default(), QualityConfig::default())
    }

    pub fn with_config(backend: S, watcher: WatcherConfig, quality: QualityConfig) -> Self {
        let prefs = Preferences::load(&backend);
        Self {
            store: BlocklistStore::new(backend),
            prefs,
            watcher: Watcher::new(watcher),
            quality: QualityApplier::new(quality),
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn store(&self) -> &BlocklistStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BlocklistStore<S> {
        &mut self.store
    }

    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    pub fn quality(&self) -> &QualityApplier {
        &self.quality
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_running()
    }

    /// Re-read every preference from the mirror.
    pub fn reload_preferences(&mut self) {
        self.prefs = Preferences::load(self.store.backend());
    }

    /// Start watching `url`. False when filtering is disabled; navigation is
    /// tracked from `url` either way.
    pub fn start(&mut self, url: &str) -> bool {
        if !self.prefs.enabled {
            self.watcher.follow(url);
            return false;
        }
        self.watcher.start(url);
        true
    }

    /// Shut the session down. Pending scans and quality runs are dropped.
    pub fn stop(&mut self) {
        self.watcher.stop();
        self.quality.cancel();
    }

    /// A batch of DOM mutations arrived. On navigation the auto-quality run
    /// for the new page starts after the settle delay.
    pub fn on_mutations<C: PlayerControls>(&mut self, now: u64, url: &str, controls: &C) -> MutationEffect {
        let outcome = self.watcher.on_mutations(now, url);
        let quality = outcome.navigated_to.map(|url| {
            log::debug!("Navigated to {}", url);
            self.quality.navigated();
            self.quality.cancel();
            let start_at = now.saturating_add(self.quality.config().settle_ms);
            self.auto_quality_at(now, start_at, &url, controls)
        });
        MutationEffect {
            scan: outcome.ticket,
            quality,
        }
    }

    /// The quiet-period timer for `ticket` fired. True means: scan now.
    pub fn on_timer(&mut self, ticket: Ticket) -> bool {
        self.watcher.on_timer(ticket)
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            targets: self.prefs.scan_targets(),
            block_controls: self.prefs.block_controls(),
        }
    }

    /// One filter pass over the page. `None` while stopped.
    pub fn scan<A: PageAdapter>(&self, page: &A) -> Option<ScanReport> {
        if !self.is_running() {
            return None;
        }
        let lists = self.store.snapshot();
        Some(run_pass(page, &lists, self.filter_options()))
    }

    /// A block control was activated. Returns the write to persist, or
    /// `None` if the entry was already blocked.
    pub fn block(&mut self, target: &BlockTarget) -> Result<Option<PendingWrite>, StoreError> {
        if !self.store.add(target.kind, &target.raw)? {
            return Ok(None);
        }
        log::debug!("Blocked '{}' in {}", target.raw.trim(), target.kind.storage_key());
        self.pending_write(target.kind).map(Some)
    }

    pub fn pending_write(&self, kind: ListKind) -> Result<PendingWrite, StoreError> {
        Ok(PendingWrite {
            key: kind.storage_key(),
            value: self.store.encoded(kind)?,
        })
    }

    /// Mirror a storage change and decide what it means.
    pub fn apply_storage_change(&mut self, key: &str, value: Option<Value>) -> Result<ChangeEffect, StoreError> {
        match &value {
            Some(v) => self.store.backend_mut().set(key, v.clone())?,
            None => self.store.backend_mut().remove(key),
        }

        if ListKind::from_key(key).is_some() {
            return Ok(self.rescan_if_running());
        }
        let Some(pref) = PrefKey::from_key(key) else {
            return Ok(ChangeEffect::Ignored);
        };
        self.prefs.apply(pref, value.as_ref());

        let effect = match pref {
            PrefKey::Enabled if self.prefs.enabled && !self.is_running() => {
                self.watcher.resume();
                ChangeEffect::Started
            }
            PrefKey::Enabled if !self.prefs.enabled && self.is_running() => {
                self.watcher.stop();
                ChangeEffect::Stopped
            }
            PrefKey::VolumeBoost => ChangeEffect::Volume(self.prefs.volume_boost),
            PrefKey::DisableSearchHistory if self.prefs.disable_search_history => {
                ChangeEffect::ClearSearchHistory
            }
            PrefKey::DisableChatBlocking | PrefKey::DisableBlockButtons => self.rescan_if_running(),
            _ => ChangeEffect::Ignored,
        };
        Ok(effect)
    }

    fn rescan_if_running(&self) -> ChangeEffect {
        if self.is_running() {
            ChangeEffect::Rescan
        } else {
            ChangeEffect::Ignored
        }
    }

    /// Start an auto-quality run if enabled and `url` is a stream page.
    pub fn begin_auto_quality<C: PlayerControls>(&mut self, now: u64, url: &str, controls: &C) -> QualityStep {
        self.auto_quality_at(now, now, url, controls)
    }

    fn auto_quality_at<C: PlayerControls>(&mut self, now: u64, start_at: u64, url: &str, controls: &C) -> QualityStep {
        if !self.prefs.auto_quality || !is_stream_url(url) {
            return QualityStep::Idle;
        }
        match self.prefs.preferred_tier() {
            Some(tier) => self.quality.begin_at(now, start_at, tier, false, controls),
            None => QualityStep::Idle,
        }
    }

    /// A popup message arrived. For `UpdateQualitySettings` the caller
    /// refreshes the mirror first.
    pub fn handle_message<C: PlayerControls>(
        &mut self,
        now: u64,
        message: &ContentMessage,
        url: &str,
        controls: &C,
    ) -> QualityStep {
        match message {
            ContentMessage::SetQuality { quality } => match parse_preferred(quality.as_str()) {
                Some(tier) => self.quality.begin(now, tier, true, controls),
                None => QualityStep::Idle,
            },
            ContentMessage::UpdateQualitySettings => {
                self.reload_preferences();
                self.begin_auto_quality(now, url, controls)
            }
        }
    }

    pub fn quality_tick<C: PlayerControls>(&mut self, now: u64, controls: &C) -> QualityStep {
        self.quality.tick(now, controls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::FakePage;
    use crate::quality::tests::FakePlayer;
    use crate::store::MemoryStore;
    use serde_json::json;

    const HOME: &str = "https://kick.com/";
    const STREAM: &str = "https://kick.com/foo";

    fn controller(initial: Value) -> Controller<MemoryStore> {
        Controller::new(MemoryStore::from_object(initial))
    }

    #[test]
    fn test_disabled_controller_does_not_start() {
        let mut c = controller(json!({"enabled": false}));
        assert!(!c.start(HOME));
        assert!(c.scan(&FakePage::new()).is_none());
    }

    #[test]
    fn test_block_click_then_rescan_hides_card() {
        let mut c = controller(json!({}));
        c.start(HOME);
        let page = FakePage::new();
        let card = page.card(Some("Foo"), None, &[]);

        c.scan(&page).unwrap();
        let target = page.node(card).control.unwrap();
        let write = c.block(&target).unwrap().unwrap();
        assert_eq!(write, PendingWrite { key: "blockedChannels", value: json!("[\"foo\"]") });
        assert!(c.block(&target).unwrap().is_none());

        c.scan(&page).unwrap();
        assert!(page.node(card).hidden);
    }

    #[test]
    fn test_disable_stops_scans_and_keeps_hidden_state() {
        let mut c = controller(json!({"blockedChannels": "[\"foo\"]"}));
        c.start(HOME);
        let page = FakePage::new();
        let card = page.card(Some("foo"), None, &[]);
        c.scan(&page).unwrap();
        assert!(page.node(card).hidden);

        let player = FakePlayer::default();
        let ticket = c.on_mutations(0, HOME, &player).scan.unwrap();
        let effect = c.apply_storage_change("enabled", Some(json!(false))).unwrap();
        assert_eq!(effect, ChangeEffect::Stopped);
        assert!(!c.on_timer(ticket));
        assert!(c.on_mutations(10, HOME, &player).scan.is_none());

        c.apply_storage_change("blockedChannels", Some(json!("[]"))).unwrap();
        assert!(c.scan(&page).is_none());
        assert!(page.node(card).hidden);

        let effect = c.apply_storage_change("enabled", Some(json!(true))).unwrap();
        assert_eq!(effect, ChangeEffect::Started);
        c.scan(&page).unwrap();
        assert!(!page.node(card).hidden);
    }

    #[test]
    fn test_storage_change_effects() {
        let mut c = controller(json!({}));
        c.start(HOME);
        assert_eq!(
            c.apply_storage_change("blockedTags", Some(json!("[\"irl\"]"))).unwrap(),
            ChangeEffect::Rescan
        );
        assert!(c.store().contains(ListKind::Tags, "IRL"));
        assert_eq!(
            c.apply_storage_change("volumeBoost", Some(json!("2"))).unwrap(),
            ChangeEffect::Volume(2.0)
        );
        assert_eq!(
            c.apply_storage_change("disableSearchHistory", Some(json!(true))).unwrap(),
            ChangeEffect::ClearSearchHistory
        );
        assert_eq!(
            c.apply_storage_change("disableSearchHistory", Some(json!(false))).unwrap(),
            ChangeEffect::Ignored
        );
        assert_eq!(
            c.apply_storage_change("disableBlockButtons", Some(json!(true))).unwrap(),
            ChangeEffect::Rescan
        );
        assert!(!c.filter_options().block_controls);
        assert_eq!(
            c.apply_storage_change("unrelated", Some(json!(1))).unwrap(),
            ChangeEffect::Ignored
        );
        assert_eq!(
            c.apply_storage_change("enabled", Some(json!(true))).unwrap(),
            ChangeEffect::Ignored
        );
    }

    #[test]
    fn test_removed_blocklist_key_reads_empty() {
        let mut c = controller(json!({"blockedChannels": "[\"foo\"]"}));
        c.apply_storage_change("blockedChannels", None).unwrap();
        assert!(c.store().get_list(ListKind::Channels).is_empty());
    }

    #[test]
    fn test_auto_quality_on_stream_pages_only() {
        let mut c = controller(json!({"autoQuality": true, "preferredQuality": "480"}));
        let player = FakePlayer::ready(&["720p", "480p"]);
        assert_eq!(c.begin_auto_quality(0, HOME, &player), QualityStep::Idle);
        assert!(matches!(
            c.begin_auto_quality(0, STREAM, &player),
            QualityStep::Waiting { .. }
        ));
        assert!(c.quality().is_active());

        let mut c = controller(json!({"autoQuality": false}));
        assert_eq!(c.begin_auto_quality(0, STREAM, &player), QualityStep::Idle);
    }

    #[test]
    fn test_set_quality_message_forces_reload_once() {
        let mut c = controller(json!({}));
        let player = FakePlayer::ready(&["1080p", "720p", "360p"]);
        let message = ContentMessage::SetQuality { quality: "720".into() };

        let mut step = c.handle_message(0, &message, STREAM, &player);
        while let QualityStep::Waiting { next_at } = step {
            step = c.quality_tick(next_at, &player);
        }
        assert_eq!(step, QualityStep::Selected { tier: 720, reloading: true });
        assert_eq!(player.reloads.get(), 1);
    }

    #[test]
    fn test_update_settings_message_rereads_preferences() {
        let mut c = controller(json!({}));
        let player = FakePlayer::ready(&["720p"]);
        c.store_mut().backend_mut().set("autoQuality", json!(true)).unwrap();

        let step = c.handle_message(0, &ContentMessage::UpdateQualitySettings, STREAM, &player);
        assert!(c.preferences().auto_quality);
        assert!(matches!(step, QualityStep::Waiting { .. }));
    }

    #[test]
    fn test_navigation_resets_reload_guard() {
        let mut c = controller(json!({}));
        c.start(HOME);
        let player = FakePlayer::ready(&["720p", "360p"]);
        let message = ContentMessage::SetQuality { quality: "720".into() };

        let run = |c: &mut Controller<MemoryStore>, quality: &ContentMessage| {
            let mut step = c.handle_message(0, quality, STREAM, &player);
            while let QualityStep::Waiting { next_at } = step {
                step = c.quality_tick(next_at, &player);
            }
            step
        };

        run(&mut c, &message);
        let second = ContentMessage::SetQuality { quality: "360".into() };
        assert_eq!(run(&mut c, &second), QualityStep::Selected { tier: 360, reloading: false });

        let effect = c.on_mutations(100, STREAM, &player);
        assert_eq!(effect.quality, Some(QualityStep::Idle));
        assert_eq!(run(&mut c, &message), QualityStep::Selected { tier: 720, reloading: true });
    }

    #[test]
    fn test_auto_quality_follows_navigation_while_disabled() {
        let mut c = controller(json!({"enabled": false, "autoQuality": true, "preferredQuality": "480"}));
        let player = FakePlayer::ready(&["720p", "480p"]);
        assert!(!c.start(HOME));

        let effect = c.on_mutations(0, "https://kick.com/xqc", &player);
        assert!(effect.scan.is_none());
        assert_eq!(effect.quality, Some(QualityStep::Waiting { next_at: 1_000 }));
        assert_eq!(player.hovers.get(), 0);

        let mut step = c.quality_tick(1_000, &player);
        while let QualityStep::Waiting { next_at } = step {
            step = c.quality_tick(next_at, &player);
        }
        assert_eq!(step, QualityStep::Selected { tier: 480, reloading: false });
    }

    #[test]
    fn test_navigation_replaces_run_for_previous_page() {
        let mut c = controller(json!({"autoQuality": true, "preferredQuality": "720"}));
        c.start(STREAM);
        let player = FakePlayer::default();
        assert!(matches!(c.begin_auto_quality(0, STREAM, &player), QualityStep::Waiting { .. }));

        let effect = c.on_mutations(200, HOME, &player);
        assert_eq!(effect.quality, Some(QualityStep::Idle));
        assert!(!c.quality().is_active());
        assert!(effect.scan.is_some());
    }

    #[test]
    fn test_disable_keeps_quality_run_alive() {
        let mut c = controller(json!({"autoQuality": true}));
        c.start(STREAM);
        let player = FakePlayer::default();
        c.begin_auto_quality(0, STREAM, &player);
        c.apply_storage_change("enabled", Some(json!(false))).unwrap();
        assert!(c.quality().is_active());
    }

    #[test]
    fn test_stop_cancels_quality_run() {
        let mut c = controller(json!({"autoQuality": true}));
        c.start(STREAM);
        let player = FakePlayer::default();
        c.begin_auto_quality(0, STREAM, &player);
        c.stop();
        assert!(!c.quality().is_active());
        assert_eq!(c.quality_tick(1_000, &player), QualityStep::Idle);
    }
}
