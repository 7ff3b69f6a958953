//! Content script runtime
//!
//! Owns the browser side of a session: the mutation observer, the timers and
//! the extension event listeners. All decisions are delegated to the core
//! [`Controller`]; this module only schedules work and performs the side
//! effects it asks for.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Timeout;
use js_sys::Array;
use serde_json::Value;
use uk_core::history::{should_clear, EMPTY_HISTORY, SEARCH_HISTORY_KEY};
use uk_core::url::is_kick_url;
use uk_core::{
    BlockTarget, ChangeEffect, ContentMessage, Controller, ListKind, MemoryStore, PendingWrite,
    QualityStep, Ticket, VolumeBoost,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, MutationObserver, MutationObserverInit, Window};

use crate::audio::WebAudio;
use crate::page::{control_target, KickPage, CONTROL_CLASS};
use crate::player::KickPlayer;
use crate::storage;

type Shared = Rc<RefCell<Session>>;
type MutationCallback = Closure<dyn FnMut(Array, MutationObserver)>;

thread_local! {
    static SESSION: RefCell<Option<Shared>> = const { RefCell::new(None) };
}

fn now() -> u64 {
    js_sys::Date::now() as u64
}

/// Clamp to the range `setTimeout` accepts.
fn millis(ms: u64) -> u32 {
    ms.min(i32::MAX as u64) as u32
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No window"))
}

/// The body observer and the callback it calls. Built once per session and
/// paused with `disconnect`.
struct PageObserver {
    observer: MutationObserver,
    _callback: MutationCallback,
}

impl PageObserver {
    fn observe(&self, document: &Document) -> Result<(), JsValue> {
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("Document has no body"))?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        self.observer.observe_with_options(&body, &options)
    }
}

pub struct Session {
    controller: Controller<MemoryStore>,
    boost: VolumeBoost<WebAudio>,
    page: KickPage,
    player: KickPlayer,
    window: Window,
    document: Document,
    observer: Option<PageObserver>,
    // Dropping a handle cancels its timer and frees the callback
    scan_timer: Option<Timeout>,
    quality_timer: Option<Timeout>,
}

impl Session {
    fn new(window: Window, document: Document, mirror: MemoryStore) -> Self {
        let controller = Controller::new(mirror);
        let gain = controller.preferences().volume_boost;
        Self {
            controller,
            boost: VolumeBoost::new(WebAudio::new(document.clone()), gain),
            page: KickPage::new(document.clone()),
            player: KickPlayer::new(window.clone(), document.clone()),
            window,
            document,
            observer: None,
            scan_timer: None,
            quality_timer: None,
        }
    }

    fn href(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn scan(&mut self) {
        if let Some(report) = self.controller.scan(&self.page) {
            log::debug!("Scan: {:?}", report);
        }
        self.boost.sync();
        self.clear_search_history();
    }

    fn clear_search_history(&self) {
        if !self.controller.preferences().disable_search_history || !is_kick_url(&self.href()) {
            return;
        }
        let Ok(Some(storage)) = self.window.local_storage() else {
            return;
        };
        let current = storage.get_item(SEARCH_HISTORY_KEY).ok().flatten();
        if should_clear(current.as_deref()) {
            if let Err(err) = storage.set_item(SEARCH_HISTORY_KEY, EMPTY_HISTORY) {
                log::warn!("Failed to clear search history: {:?}", err);
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(page_observer) = &self.observer {
            page_observer.observer.disconnect();
        }
        self.scan_timer = None;
        self.quality_timer = None;
    }
}

// =============================================================================
// Scheduling
// =============================================================================

fn schedule_scan(shared: &Shared, session: &mut Session, ticket: Ticket) {
    let delay = session.controller.watcher().quiet_ms();
    let weak = Rc::downgrade(shared);
    session.scan_timer = Some(Timeout::new(millis(delay), move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut session = shared.borrow_mut();
        if session.controller.on_timer(ticket) {
            session.scan();
        }
    }));
}

/// Follow a quality step: re-arm the timer while the run is waiting.
fn follow_quality(shared: &Shared, session: &mut Session, step: QualityStep) {
    let QualityStep::Waiting { next_at } = step else {
        session.quality_timer = None;
        if step != QualityStep::Idle {
            log::debug!("Quality run finished: {:?}", step);
        }
        return;
    };
    let delay = next_at.saturating_sub(now());
    let weak = Rc::downgrade(shared);
    session.quality_timer = Some(Timeout::new(millis(delay), move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut guard = shared.borrow_mut();
        let session = &mut *guard;
        let step = session.controller.quality_tick(now(), &session.player);
        follow_quality(&shared, session, step);
    }));
}

fn begin_auto_quality(shared: &Shared, session: &mut Session) {
    let url = session.href();
    let step = session.controller.begin_auto_quality(now(), &url, &session.player);
    follow_quality(shared, session, step);
}

// =============================================================================
// Observer
// =============================================================================

fn on_mutations(shared: &Shared) {
    let Ok(mut guard) = shared.try_borrow_mut() else {
        return;
    };
    let session = &mut *guard;
    let url = session.href();
    let effect = session.controller.on_mutations(now(), &url, &session.player);
    if let Some(step) = effect.quality {
        follow_quality(shared, session, step);
    }
    if let Some(ticket) = effect.scan {
        schedule_scan(shared, session, ticket);
    }
}

/// Observe the page body, building the observer on first use. The observer
/// runs whether filtering is on or off so navigation is always seen.
fn observe_page(shared: &Shared, session: &mut Session) -> Result<(), JsValue> {
    if session.observer.is_none() {
        let weak = Rc::downgrade(shared);
        let callback: MutationCallback =
            Closure::wrap(Box::new(move |_records: Array, _observer: MutationObserver| {
                if let Some(shared) = weak.upgrade() {
                    on_mutations(&shared);
                }
            }) as Box<dyn FnMut(Array, MutationObserver)>);
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
        session.observer = Some(PageObserver {
            observer,
            _callback: callback,
        });
    }
    match &session.observer {
        Some(page_observer) => page_observer.observe(&session.document),
        None => Ok(()),
    }
}

fn begin_watching(shared: &Shared, session: &mut Session) {
    if let Err(err) = observe_page(shared, session) {
        log::warn!("Failed to install mutation observer: {:?}", err);
    }
    session.scan();
}

// =============================================================================
// Event Handlers
// =============================================================================

fn on_storage_change(shared: &Shared, key: String, value: Option<Value>) {
    let mut guard = shared.borrow_mut();
    let session = &mut *guard;
    let effect = match session.controller.apply_storage_change(&key, value) {
        Ok(effect) => effect,
        Err(err) => {
            log::warn!("Failed to mirror storage change: {}", err);
            return;
        }
    };
    match effect {
        ChangeEffect::Started => begin_watching(shared, session),
        ChangeEffect::Stopped => session.scan_timer = None,
        ChangeEffect::Rescan => session.scan(),
        ChangeEffect::Volume(gain) => session.boost.set_boost(gain),
        ChangeEffect::ClearSearchHistory => session.clear_search_history(),
        ChangeEffect::Ignored => {}
    }
}

fn on_message(shared: &Shared, raw: Value) {
    let Some(message) = ContentMessage::from_value(raw) else {
        return;
    };
    let mut guard = shared.borrow_mut();
    let session = &mut *guard;
    let url = session.href();
    let step = session.controller.handle_message(now(), &message, &url, &session.player);
    follow_quality(shared, session, step);
}

/// Write to `storage.local`, then re-scan once the write has landed.
fn persist(shared: &Shared, write: PendingWrite) {
    let weak = Rc::downgrade(shared);
    wasm_bindgen_futures::spawn_local(async move {
        let result = storage::save(write.key, &write.value).await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let Ok(mut session) = shared.try_borrow_mut() else {
            return;
        };
        if !session.controller.is_running() {
            return;
        }
        match result {
            Ok(()) => session.scan(),
            Err(err) => log::warn!("Failed to persist {}: {:?}", write.key, err),
        }
    });
}

fn on_block(shared: &Shared, target: BlockTarget) {
    let mut session = shared.borrow_mut();
    match session.controller.block(&target) {
        Ok(Some(write)) => persist(shared, write),
        Ok(None) => {}
        Err(err) => log::warn!("Failed to block '{}': {}", target.raw, err),
    }
}

fn install_listeners(shared: &Shared) -> Result<(), JsValue> {
    let weak = Rc::downgrade(shared);
    storage::on_changed(move |key, value| {
        if let Some(shared) = weak.upgrade() {
            on_storage_change(&shared, key, value);
        }
    })?;

    let weak = Rc::downgrade(shared);
    storage::on_message(move |message| {
        if let Some(shared) = weak.upgrade() {
            on_message(&shared, message);
        }
    })?;

    let session = shared.borrow();

    // Block buttons: one delegated listener in the capture phase so the
    // click never reaches the card link underneath.
    let weak = Rc::downgrade(shared);
    let on_click = Closure::wrap(Box::new(move |event: Event| {
        let Some(button) = event
            .target()
            .and_then(|target| target.dyn_into::<Element>().ok())
            .and_then(|el| el.closest(&format!(".{}", CONTROL_CLASS)).ok().flatten())
        else {
            return;
        };
        event.prevent_default();
        event.stop_propagation();
        if !event.is_trusted() {
            return;
        }
        let (Some(shared), Some(target)) = (weak.upgrade(), control_target(&button)) else {
            return;
        };
        on_block(&shared, target);
    }) as Box<dyn FnMut(Event)>);
    session
        .document
        .add_event_listener_with_callback_and_bool(
            "click",
            on_click.as_ref().unchecked_ref(),
            true,
        )?;
    on_click.forget();

    // Audio can only start after a real user gesture
    let weak = Rc::downgrade(shared);
    let on_gesture = Closure::wrap(Box::new(move |event: Event| {
        if !event.is_trusted() {
            return;
        }
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let Ok(mut session) = shared.try_borrow_mut() else {
            return;
        };
        if !session.boost.is_unlocked() {
            session.boost.unlock();
            log::debug!("Volume boost unlocked at {}x", session.boost.gain());
        }
    }) as Box<dyn FnMut(Event)>);
    for kind in ["click", "keydown"] {
        session
            .window
            .add_event_listener_with_callback(kind, on_gesture.as_ref().unchecked_ref())?;
    }
    on_gesture.forget();

    Ok(())
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Load storage, build the session and start watching if enabled.
pub async fn start() -> Result<(), JsValue> {
    if SESSION.with(|slot| slot.borrow().is_some()) {
        return Ok(());
    }
    let window = window()?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let mirror = MemoryStore::from_object(storage::load_all().await?);

    let shared: Shared = Rc::new(RefCell::new(Session::new(window, document, mirror)));
    install_listeners(&shared)?;
    {
        let mut guard = shared.borrow_mut();
        let session = &mut *guard;
        let url = session.href();
        if session.controller.start(&url) {
            let lists = session.controller.store().snapshot();
            log::info!(
                "uKick started: {} channels, {} categories, {} tags blocked",
                lists.len(ListKind::Channels),
                lists.len(ListKind::Categories),
                lists.len(ListKind::Tags)
            );
            begin_watching(&shared, session);
        } else {
            log::info!("uKick is disabled");
            if let Err(err) = observe_page(&shared, session) {
                log::warn!("Failed to install mutation observer: {:?}", err);
            }
            session.clear_search_history();
        }
        begin_auto_quality(&shared, session);
    }
    SESSION.with(|slot| *slot.borrow_mut() = Some(shared));
    Ok(())
}

/// Stop watching the page and drop any pending work. Listeners stay
/// registered; re-enabling via storage resumes the session.
pub fn stop() {
    SESSION.with(|slot| {
        if let Some(shared) = slot.borrow().as_ref() {
            let mut session = shared.borrow_mut();
            session.controller.stop();
            session.teardown();
        }
    });
}
