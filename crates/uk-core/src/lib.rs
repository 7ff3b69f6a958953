//! uKick Core Library
//!
//! Platform-independent logic for the uKick extension: blocklists, the DOM
//! filter pass, the mutation watcher and the playback preference appliers.
//!
//! # Architecture
//!
//! Nothing in this crate touches the browser. The host page is reached through
//! small traits ([`PageAdapter`], [`PlayerControls`], [`AudioGraph`]) and the
//! persisted state through [`KeyValueStore`], so the whole engine runs against
//! fakes in tests. The `uk-wasm` crate supplies the `web-sys` implementations.
//!
//! # Modules
//!
//! - `normalize`: identifier normalization
//! - `types`: list kinds, identities, scan targets
//! - `store`: blocklist store over a key-value abstraction
//! - `transfer`: import/export file codec
//! - `prefs`: persisted preferences
//! - `page`: the page adapter seam
//! - `filter`: one filtering pass over the page
//! - `trigger`: coalescing (debounce) trigger
//! - `watcher`: mutation watcher and navigation detection
//! - `quality`: stream quality state machine
//! - `volume`: volume boost over an audio graph
//! - `messages`: popup/options to page messages
//! - `history`: search history clearing
//! - `url`: URL helpers for Kick paths
//! - `controller`: the session object tying it all together

pub mod normalize;
pub mod types;
pub mod store;
pub mod transfer;
pub mod prefs;
pub mod page;
pub mod filter;
pub mod trigger;
pub mod watcher;
pub mod quality;
pub mod volume;
pub mod messages;
pub mod history;
pub mod url;
pub mod controller;

// Re-export commonly used types
pub use controller::{ChangeEffect, Controller, MutationEffect, PendingWrite};
pub use filter::{run_pass, FilterOptions, ScanReport};
pub use messages::{ContentMessage, RequestedQuality};
pub use normalize::normalize;
pub use page::PageAdapter;
pub use prefs::{PrefKey, Preferences};
pub use quality::{PlayerControls, QualityApplier, QualityStep};
pub use store::{BlocklistStore, Blocklists, KeyValueStore, MemoryStore, StoreError};
pub use transfer::{ImportError, ImportSummary};
pub use trigger::{CoalescingTrigger, Ticket};
pub use types::{BlockTarget, Identity, ListKind, ScanTargets};
pub use volume::{AudioGraph, VolumeBoost};
pub use watcher::{MutationOutcome, Watcher};
