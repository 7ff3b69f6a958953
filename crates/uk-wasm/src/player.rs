//! Native player controls

use uk_core::PlayerControls;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, MouseEvent, MouseEventInit, Window};

use crate::page::VIDEO_PLAYER_ID;

/// Session storage key the player reads its quality from on load.
const QUALITY_SESSION_KEY: &str = "stream_quality";

/// The settings button has no stable id; its label is localized.
const SETTINGS_BUTTONS: [&str; 4] = [
    r#"button[aria-label*="Settings"]"#,
    r#"button[aria-label*="Ayarlar"]"#,
    r#"button[title*="Settings"]"#,
    r#"button[class*="settings"]"#,
];

const QUALITY_OPTIONS: &str =
    r#"[data-testid="player-quality-option"], [role="menuitemradio"], [role="menuitem"]"#;

const HOVER_EVENTS: [&str; 3] = ["mouseenter", "mouseover", "mousemove"];

pub struct KickPlayer {
    window: Window,
    document: Document,
}

impl KickPlayer {
    pub fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }

    fn player(&self) -> Option<Element> {
        self.document.get_element_by_id(VIDEO_PLAYER_ID)
    }

    fn options(&self) -> Vec<HtmlElement> {
        let Ok(list) = self.document.query_selector_all(QUALITY_OPTIONS) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
            .collect()
    }
}

impl PlayerControls for KickPlayer {
    fn has_player(&self) -> bool {
        self.player().is_some()
    }

    fn hover_player(&self) {
        let Some(player) = self.player() else {
            return;
        };
        let rect = player.get_bounding_client_rect();
        let init = MouseEventInit::new();
        init.set_bubbles(true);
        init.set_client_x((rect.left() + rect.width() / 2.0) as i32);
        init.set_client_y((rect.top() + rect.height() / 2.0) as i32);
        let targets = [Some(player.clone()), player.parent_element()];
        for target in targets.iter().flatten() {
            for kind in HOVER_EVENTS {
                if let Ok(event) = MouseEvent::new_with_mouse_event_init_dict(kind, &init) {
                    let _ = target.dispatch_event(&event);
                }
            }
        }
    }

    fn open_settings(&self) -> bool {
        let button = SETTINGS_BUTTONS.iter().find_map(|selector| {
            self.document
                .query_selector(selector)
                .ok()
                .flatten()
                .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        });
        match button {
            Some(button) => {
                button.click();
                true
            }
            None => false,
        }
    }

    fn quality_options(&self) -> Vec<String> {
        self.options()
            .iter()
            .map(|option| option.text_content().unwrap_or_default().trim().to_string())
            .collect()
    }

    fn choose_option(&self, index: usize) -> bool {
        match self.options().get(index) {
            Some(option) => {
                option.click();
                true
            }
            None => false,
        }
    }

    fn remember_quality(&self, tier: u32) {
        let Ok(Some(storage)) = self.window.session_storage() else {
            return;
        };
        if let Err(err) = storage.set_item(QUALITY_SESSION_KEY, &tier.to_string()) {
            log::warn!("Failed to store session quality: {:?}", err);
        }
    }

    fn reload(&self) {
        if let Err(err) = self.window.location().reload() {
            log::warn!("Reload failed: {:?}", err);
        }
    }
}
