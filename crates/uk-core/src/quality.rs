//! Stream quality enforcement
//!
//! The native player exposes no API, so the quality is set the way a user
//! would: hover the player, open the settings menu, click a quality entry.
//! This module models that as a state machine driven by `tick(now)` so the
//! host decides how time passes (a browser timer, or a test counter).
//!
//! ```text
//! Idle -> WaitingForPlayer -> ProbingSettings -> ReadingOptions -> Idle
//!              |  timeout          |  retries exhausted  |  no options
//!              +-------------------+---------------------+--> Deferred
//! ```

// =============================================================================
// Tier Parsing
// =============================================================================

/// Pixel height from a stored preference: every non-digit is dropped
/// (`"1080p"` -> 1080).
pub fn parse_preferred(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok().filter(|tier| *tier > 0)
}

/// Pixel height from a menu entry label (`"720p60"` -> 720, `"Auto"` -> none).
pub fn parse_tier_label(label: &str) -> Option<u32> {
    const TOKENS: [&str; 4] = ["auto", "fps", "p60", "p"];

    let lower = label.to_lowercase();
    let mut rest = lower.as_str();
    let mut kept = String::with_capacity(rest.len());
    'outer: while let Some(c) = rest.chars().next() {
        for token in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                rest = after;
                continue 'outer;
            }
        }
        kept.push(c);
        rest = &rest[c.len_utf8()..];
    }

    let kept = kept.trim();
    if kept.is_empty() || !kept.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    kept.parse().ok()
}

/// Largest available tier not above the preference; the lowest available
/// tier when every tier is above it.
pub fn select_tier(preferred: u32, available: &[u32]) -> Option<u32> {
    available
        .iter()
        .copied()
        .filter(|tier| *tier <= preferred)
        .max()
        .or_else(|| available.iter().copied().min())
}

// =============================================================================
// Player Controls
// =============================================================================

/// Simulated interaction with the native player.
pub trait PlayerControls {
    fn has_player(&self) -> bool;
    /// Dispatch pointer events over the player so its controls appear.
    fn hover_player(&self);
    /// Click the settings button. False if it cannot be found.
    fn open_settings(&self) -> bool;
    /// Labels of the quality entries in the open menu, in menu order.
    fn quality_options(&self) -> Vec<String>;
    fn choose_option(&self, index: usize) -> bool;
    /// Store the tier where the player reads it on its next load.
    fn remember_quality(&self, tier: u32);
    fn reload(&self);
}

// =============================================================================
// State Machine
// =============================================================================

/// Timing and retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityConfig {
    /// Interval between player presence checks
    pub poll_ms: u64,
    /// Give up waiting for the player after this long
    pub player_timeout_ms: u64,
    /// Delay for the player UI to react to hover and clicks
    pub menu_delay_ms: u64,
    /// Attempts at opening the settings menu
    pub settings_attempts: u32,
    /// Wait after a navigation before looking for the new page's player
    pub settle_ms: u64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            poll_ms: 300,
            player_timeout_ms: 15_000,
            menu_delay_ms: 700,
            settings_attempts: 3,
            settle_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    WaitingForPlayer { deadline: u64, next_at: u64 },
    ProbingSettings { attempt: u32, next_at: u64 },
    ReadingOptions { next_at: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    preferred: u32,
    force_reload: bool,
}

/// Why a run ended without clicking a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    NoPlayer,
    NoSettingsButton,
    NoOptions,
}

/// Result of one `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityStep {
    /// No run in progress
    Idle,
    /// Call `tick` again at (or after) `next_at`
    Waiting { next_at: u64 },
    /// A tier was clicked
    Selected { tier: u32, reloading: bool },
    /// The selected tier was already applied; nothing clicked
    Unchanged { tier: u32 },
    /// Could not drive the menu; the session preference applies on next load
    Deferred { reason: DeferReason, reloading: bool },
}

#[derive(Debug, Clone)]
pub struct QualityApplier {
    config: QualityConfig,
    state: State,
    run: Option<Run>,
    last_applied: Option<u32>,
    reloaded: bool,
}

impl QualityApplier {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            run: None,
            last_applied: None,
            reloaded: false,
        }
    }

    pub fn config(&self) -> QualityConfig {
        self.config
    }

    pub fn is_active(&self) -> bool {
        self.state != State::Idle
    }

    pub fn last_applied(&self) -> Option<u32> {
        self.last_applied
    }

    /// A new page was navigated to; the reload guard resets.
    pub fn navigated(&mut self) {
        self.reloaded = false;
    }

    /// Abandon the current run.
    pub fn cancel(&mut self) {
        self.state = State::Idle;
        self.run = None;
    }

    /// Start (or restart) a run. `force_reload` asks for one page reload
    /// after the run so the player re-reads the session preference.
    pub fn begin<C: PlayerControls>(
        &mut self,
        now: u64,
        preferred: u32,
        force_reload: bool,
        controls: &C,
    ) -> QualityStep {
        self.begin_at(now, now, preferred, force_reload, controls)
    }

    /// Like [`begin`](Self::begin), but the first player check happens at
    /// `start_at`. The player timeout counts from `start_at`.
    pub fn begin_at<C: PlayerControls>(
        &mut self,
        now: u64,
        start_at: u64,
        preferred: u32,
        force_reload: bool,
        controls: &C,
    ) -> QualityStep {
        if start_at <= now {
            controls.remember_quality(preferred);
        }
        self.run = Some(Run {
            preferred,
            force_reload,
        });
        self.state = State::WaitingForPlayer {
            deadline: start_at.saturating_add(self.config.player_timeout_ms),
            next_at: start_at,
        };
        log::debug!("Quality run started for {}p", preferred);
        self.tick(now, controls)
    }

    /// Advance the state machine.
    pub fn tick<C: PlayerControls>(&mut self, now: u64, controls: &C) -> QualityStep {
        let Some(run) = self.run else {
            return QualityStep::Idle;
        };
        let config = self.config;

        match self.state {
            State::Idle => QualityStep::Idle,
            State::WaitingForPlayer { deadline, next_at } => {
                if now < next_at {
                    return QualityStep::Waiting { next_at };
                }
                if controls.has_player() {
                    controls.hover_player();
                    return self.wait(State::ProbingSettings {
                        attempt: 1,
                        next_at: now + config.menu_delay_ms,
                    });
                }
                if now >= deadline {
                    return self.defer(DeferReason::NoPlayer, run, controls);
                }
                // The player may overwrite the session value while it boots
                controls.remember_quality(run.preferred);
                self.wait(State::WaitingForPlayer {
                    deadline,
                    next_at: now + config.poll_ms,
                })
            }
            State::ProbingSettings { attempt, next_at } => {
                if now < next_at {
                    return QualityStep::Waiting { next_at };
                }
                if controls.open_settings() {
                    return self.wait(State::ReadingOptions {
                        next_at: now + config.menu_delay_ms,
                    });
                }
                if attempt >= config.settings_attempts {
                    return self.defer(DeferReason::NoSettingsButton, run, controls);
                }
                controls.hover_player();
                self.wait(State::ProbingSettings {
                    attempt: attempt + 1,
                    next_at: now + config.menu_delay_ms,
                })
            }
            State::ReadingOptions { next_at } => {
                if now < next_at {
                    return QualityStep::Waiting { next_at };
                }
                self.select(run, controls)
            }
        }
    }

    fn wait(&mut self, state: State) -> QualityStep {
        let next_at = match state {
            State::WaitingForPlayer { next_at, .. }
            | State::ProbingSettings { next_at, .. }
            | State::ReadingOptions { next_at } => next_at,
            State::Idle => 0,
        };
        self.state = state;
        QualityStep::Waiting { next_at }
    }

    fn select<C: PlayerControls>(&mut self, run: Run, controls: &C) -> QualityStep {
        let labels = controls.quality_options();
        let tiers: Vec<(usize, u32)> = labels
            .iter()
            .enumerate()
            .filter_map(|(index, label)| parse_tier_label(label).map(|tier| (index, tier)))
            .collect();
        let available: Vec<u32> = tiers.iter().map(|(_, tier)| *tier).collect();

        let Some(target) = select_tier(run.preferred, &available) else {
            return self.defer(DeferReason::NoOptions, run, controls);
        };

        if self.last_applied == Some(target) {
            controls.remember_quality(target);
            self.finish();
            return QualityStep::Unchanged { tier: target };
        }

        if let Some((index, _)) = tiers.iter().find(|(_, tier)| *tier == target) {
            controls.choose_option(*index);
        }
        controls.remember_quality(target);
        self.last_applied = Some(target);
        log::debug!("Selected {}p (preferred {}p)", target, run.preferred);

        let reloading = self.maybe_reload(run, controls);
        self.finish();
        QualityStep::Selected {
            tier: target,
            reloading,
        }
    }

    fn defer<C: PlayerControls>(&mut self, reason: DeferReason, run: Run, controls: &C) -> QualityStep {
        log::debug!("Quality run deferred: {:?}", reason);
        let reloading = self.maybe_reload(run, controls);
        self.finish();
        QualityStep::Deferred { reason, reloading }
    }

    fn maybe_reload<C: PlayerControls>(&mut self, run: Run, controls: &C) -> bool {
        if !run.force_reload || self.reloaded {
            return false;
        }
        self.reloaded = true;
        controls.reload();
        true
    }

    fn finish(&mut self) {
        self.state = State::Idle;
        self.run = None;
    }
}

impl Default for QualityApplier {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}
