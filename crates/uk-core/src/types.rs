//! Core type definitions for uKick
//!
//! These types are shared between the store, the filter pass and the
//! browser bindings.

use crate::store::Blocklists;

// =============================================================================
// List Kinds
// =============================================================================

/// Which blocklist an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Channel usernames (the first path segment of a channel URL)
    Channels,
    /// Category names as shown on cards and in the sidebar
    Categories,
    /// Stream tags
    Tags,
}

impl ListKind {
    /// All list kinds, in display order.
    pub const ALL: [ListKind; 3] = [ListKind::Channels, ListKind::Categories, ListKind::Tags];

    /// Persistence key of the list.
    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::Channels => "blockedChannels",
            Self::Categories => "blockedCategories",
            Self::Tags => "blockedTags",
        }
    }

    /// Parse a persistence key (or the short names used by the options page).
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "blockedChannels" | "channels" => Some(Self::Channels),
            "blockedCategories" | "categories" => Some(Self::Categories),
            "blockedTags" | "tags" => Some(Self::Tags),
            _ => None,
        }
    }

    /// File name used when exporting the list.
    pub fn export_file_name(self) -> String {
        format!("{}.json", self.storage_key())
    }
}

// =============================================================================
// Block Targets
// =============================================================================

/// What a block control blocks when it is activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTarget {
    pub kind: ListKind,
    /// Display string as found on the page (not normalized)
    pub raw: String,
}

impl BlockTarget {
    pub fn new(kind: ListKind, raw: impl Into<String>) -> Self {
        Self { kind, raw: raw.into() }
    }
}

// =============================================================================
// Identities
// =============================================================================

/// Raw identifiers extracted from a card or sidebar entry.
///
/// Every field is optional because promos and half-rendered cards routinely
/// lack one or more of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub channel: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl Identity {
    /// True when nothing could be extracted.
    pub fn is_empty(&self) -> bool {
        self.channel.is_none() && self.category.is_none() && self.tags.is_empty()
    }

    /// The first list that blocks this identity: channel, then category,
    /// then any tag.
    pub fn blocked_by(&self, lists: &Blocklists) -> Option<ListKind> {
        if let Some(channel) = &self.channel {
            if lists.is_blocked(ListKind::Channels, channel) {
                return Some(ListKind::Channels);
            }
        }
        if let Some(category) = &self.category {
            if lists.is_blocked(ListKind::Categories, category) {
                return Some(ListKind::Categories);
            }
        }
        if self.tags.iter().any(|tag| lists.is_blocked(ListKind::Tags, tag)) {
            return Some(ListKind::Tags);
        }
        None
    }
}

// =============================================================================
// Scan Targets
// =============================================================================

bitflags::bitflags! {
    /// Page contexts visited by a filter pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScanTargets: u8 {
        /// Stream and category cards in grids and listings
        const CARDS = 1 << 0;
        /// Recommended channels in the sidebar
        const SIDEBAR = 1 << 1;
        /// Tag chips (block controls only, cards are hidden via CARDS)
        const TAGS = 1 << 2;
        /// The currently viewed channel and its video element
        const CHANNEL_PAGE = 1 << 3;
        /// The chat message stream
        const CHAT = 1 << 4;

        /// Everything
        const ALL = 0x1F;
    }
}

impl Default for ScanTargets {
    fn default() -> Self {
        Self::ALL
    }
}
