//! Filter pass
//!
//! One pass walks every enabled page context, hides what the blocklists
//! match, un-hides what they no longer match and attaches block controls.
//! A pass is cheap and idempotent; the watcher simply re-runs it.

use crate::page::PageAdapter;
use crate::store::Blocklists;
use crate::types::{BlockTarget, Identity, ListKind, ScanTargets};

/// What a pass should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    pub targets: ScanTargets,
    /// Attach block buttons to visible elements
    pub block_controls: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            targets: ScanTargets::ALL,
            block_controls: true,
        }
    }
}

/// Counters from one pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Elements that became hidden
    pub hidden: usize,
    /// Elements that became visible again
    pub revealed: usize,
    /// Chat messages newly redacted
    pub redacted: usize,
    pub controls_attached: usize,
    /// Elements without a usable identifier
    pub skipped: usize,
    /// The viewed channel is blocked and its player was hidden
    pub player_blocked: bool,
}

/// Run one filter pass.
pub fn run_pass<A: PageAdapter>(page: &A, lists: &Blocklists, options: FilterOptions) -> ScanReport {
    let mut report = ScanReport::default();
    let targets = options.targets;

    if targets.contains(ScanTargets::CARDS) {
        for card in page.find_cards() {
            let identity = page.card_identity(&card);
            filter_entry(page, &card, &identity, lists, options, &mut report);
        }
    }

    if targets.contains(ScanTargets::SIDEBAR) {
        for item in page.find_sidebar_items() {
            let identity = page.sidebar_identity(&item);
            filter_entry(page, &item, &identity, lists, options, &mut report);
        }
    }

    if targets.contains(ScanTargets::TAGS) && options.block_controls {
        for chip in page.find_tag_chips() {
            let Some(label) = page.tag_label(&chip) else {
                report.skipped += 1;
                continue;
            };
            if lists.is_blocked(ListKind::Tags, &label) || page.has_block_control(&chip) {
                continue;
            }
            page.attach_block_control(&chip, BlockTarget::new(ListKind::Tags, label));
            report.controls_attached += 1;
        }
    }

    if targets.contains(ScanTargets::CHANNEL_PAGE) {
        if let Some((header, channel)) = page.channel_header() {
            let blocked = lists.is_blocked(ListKind::Channels, &channel);
            if page.set_player_blocked(blocked) && blocked {
                report.player_blocked = true;
            }
            if options.block_controls && !page.has_block_control(&header) {
                page.attach_block_control(&header, BlockTarget::new(ListKind::Channels, channel));
                report.controls_attached += 1;
            }
        }
    }

    if targets.contains(ScanTargets::CHAT) {
        for message in page.find_chat_messages() {
            let Some(author) = page.chat_author(&message) else {
                report.skipped += 1;
                continue;
            };
            if lists.is_blocked(ListKind::Channels, &author) {
                if page.redact_chat_message(&message, author.trim()) {
                    report.redacted += 1;
                }
                continue;
            }
            if options.block_controls && !page.has_block_control(&message) {
                page.attach_block_control(&message, BlockTarget::new(ListKind::Channels, author));
                report.controls_attached += 1;
            }
        }
    }

    log::debug!("Filter pass: {:?}", report);
    report
}

/// Hide or reveal a card-like entry and give it a block control.
fn filter_entry<A: PageAdapter>(
    page: &A,
    element: &A::Element,
    identity: &Identity,
    lists: &Blocklists,
    options: FilterOptions,
    report: &mut ScanReport,
) {
    if identity.is_empty() {
        report.skipped += 1;
        return;
    }

    if let Some(kind) = identity.blocked_by(lists) {
        if page.set_hidden(element, true) {
            log::debug!("Hiding entry blocked by {}", kind.storage_key());
            report.hidden += 1;
        }
        return;
    }
    if page.set_hidden(element, false) {
        report.revealed += 1;
    }

    if !options.block_controls || page.has_block_control(element) {
        return;
    }
    // Stream entries block their channel; category directory cards have no
    // channel and block the category instead.
    let target = match (&identity.channel, &identity.category) {
        (Some(channel), _) => BlockTarget::new(ListKind::Channels, channel.clone()),
        (None, Some(category)) => BlockTarget::new(ListKind::Categories, category.clone()),
        (None, None) => return,
    };
    page.attach_block_control(element, target);
    report.controls_attached += 1;
}
