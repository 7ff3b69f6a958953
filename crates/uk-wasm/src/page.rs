//! Kick DOM adapter
//!
//! Selectors follow the site's current markup. Block controls are plain
//! buttons tagged with data attributes; a single delegated click listener
//! (see `runtime`) turns a click back into a [`BlockTarget`].

use uk_core::normalize::collapse_whitespace;
use uk_core::url::channel_from_href;
use uk_core::{BlockTarget, Identity, ListKind, PageAdapter};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlMediaElement, NodeList};

// =============================================================================
// Selectors
// =============================================================================

const CARD: &str = r#"[class*="group/card"]"#;
const CARD_AVATAR: &str = r#"a[href^="/"]:not([href^="/category/"]) img.rounded-full"#;
const CARD_CHANNEL_LINK: &str = r#"a[href^="/"]:not([href^="/category/"])"#;
const CARD_CATEGORY_LINK: &str = r#"a[href^="/category/"]"#;
const CATEGORY_NAME: &str = r#"[data-testid^="category-"]"#;
const CARD_TAGS: &str = "div.flex.mt-1 button, div.flex.mt-1 a";

const SIDEBAR_ITEM: &str = r#"[data-testid^="sidebar-recommended-channel-"]"#;
const SIDEBAR_LINK: &str = r#"a[href^="/"]"#;
const SIDEBAR_CATEGORY: &str = "span.text-xs.font-bold";

const TAG_CHIPS: &str = "div.mt-1.flex button, div.mt-1.flex a";

const CHANNEL_USERNAME_ID: &str = "channel-username";
pub(crate) const VIDEO_PLAYER_ID: &str = "video-player";

const CHAT_ROWS: &str = "#chatroom-messages [data-index]";
const CHAT_AUTHOR: &str = "button[title]";
const CHAT_BODY: &str = r#"div[class*="betterhover"]"#;

// =============================================================================
// Block Controls
// =============================================================================

/// Class carried by every block button.
pub const CONTROL_CLASS: &str = "uk-block-btn";
/// List the button adds to (a storage key).
pub const CONTROL_KIND_ATTR: &str = "data-uk-kind";
/// Raw value the button blocks.
pub const CONTROL_VALUE_ATTR: &str = "data-uk-value";
/// Set on the element that owns a block button.
const HAS_CONTROL_ATTR: &str = "data-uk-has-control";
const REDACTED_ATTR: &str = "data-uk-redacted";

const OVERLAY_STYLE: &str = "position:absolute;top:6px;right:6px;z-index:9999;\
    width:20px;height:20px;padding:0;border:none;border-radius:50%;\
    background:rgba(0,0,0,0.7);color:white;font-size:14px;line-height:1;cursor:pointer;";
const INLINE_STYLE: &str = "margin-left:4px;width:16px;height:16px;padding:0;border:none;\
    border-radius:50%;background:rgba(0,0,0,0.7);color:white;font-size:12px;line-height:1;\
    cursor:pointer;display:inline-flex;align-items:center;justify-content:center;flex-shrink:0;";

/// Read the target back from a clicked block button.
pub fn control_target(button: &Element) -> Option<BlockTarget> {
    let kind = ListKind::from_key(&button.get_attribute(CONTROL_KIND_ATTR)?)?;
    let value = button.get_attribute(CONTROL_VALUE_ATTR)?;
    Some(BlockTarget::new(kind, value))
}

fn control_title(target: &BlockTarget) -> String {
    let noun = match target.kind {
        ListKind::Channels => "channel",
        ListKind::Categories => "category",
        ListKind::Tags => "tag",
    };
    format!("Block {}: {}", noun, target.raw)
}

// =============================================================================
// DOM Helpers
// =============================================================================

fn elements(list: Result<NodeList, wasm_bindgen::JsValue>) -> Vec<Element> {
    let Ok(list) = list else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn first(root: &Element, selector: &str) -> Option<Element> {
    root.query_selector(selector).ok().flatten()
}

fn text_of(element: &Element) -> Option<String> {
    let text = collapse_whitespace(&element.text_content()?);
    (!text.is_empty()).then_some(text)
}

/// Label of a tag chip without the text of a block button inside it.
fn chip_label(chip: &Element) -> Option<String> {
    chip.get_attribute("aria-label")
        .or_else(|| chip.get_attribute("title"))
        .map(|label| collapse_whitespace(&label))
        .filter(|label| !label.is_empty())
        .or_else(|| {
            let node = chip.first_child()?;
            let text = collapse_whitespace(&node.text_content()?);
            (!text.is_empty()).then_some(text)
        })
}

fn is_control(element: &Element) -> bool {
    element.class_list().contains(CONTROL_CLASS)
}

fn channel_of(link: &Element) -> Option<String> {
    let href = link.get_attribute("href")?;
    channel_from_href(&href).map(str::to_string)
}

pub struct KickPage {
    document: Document,
}

impl KickPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn select_all(&self, selector: &str) -> Vec<Element> {
        elements(self.document.query_selector_all(selector))
    }
}

impl PageAdapter for KickPage {
    type Element = Element;

    fn find_cards(&self) -> Vec<Element> {
        self.select_all(CARD)
    }

    fn card_identity(&self, card: &Element) -> Identity {
        let channel = first(card, CARD_AVATAR)
            .and_then(|avatar| avatar.closest("a").ok().flatten())
            .or_else(|| first(card, CARD_CHANNEL_LINK))
            .and_then(|link| channel_of(&link));

        let category = first(card, CATEGORY_NAME)
            .or_else(|| {
                let link = first(card, CARD_CATEGORY_LINK)?;
                first(&link, "span").or(Some(link))
            })
            .and_then(|el| text_of(&el));

        let tags = elements(card.query_selector_all(CARD_TAGS))
            .iter()
            .filter(|el| !is_control(el))
            .filter_map(chip_label)
            .collect();

        Identity { channel, category, tags }
    }

    fn find_sidebar_items(&self) -> Vec<Element> {
        self.select_all(SIDEBAR_ITEM)
    }

    fn sidebar_identity(&self, item: &Element) -> Identity {
        let channel = first(item, SIDEBAR_LINK)
            .or_else(|| item.closest(SIDEBAR_LINK).ok().flatten())
            .and_then(|link| channel_of(&link));
        let category = first(item, SIDEBAR_CATEGORY).and_then(|el| text_of(&el));
        Identity {
            channel,
            category,
            tags: Vec::new(),
        }
    }

    fn find_tag_chips(&self) -> Vec<Element> {
        self.select_all(TAG_CHIPS)
            .into_iter()
            .filter(|el| !is_control(el))
            .collect()
    }

    fn tag_label(&self, chip: &Element) -> Option<String> {
        chip_label(chip)
    }

    fn channel_header(&self) -> Option<(Element, String)> {
        let username = self.document.get_element_by_id(CHANNEL_USERNAME_ID)?;
        let name = text_of(&username)?;
        let header = username.parent_element().unwrap_or(username);
        Some((header, name))
    }

    fn set_player_blocked(&self, blocked: bool) -> bool {
        let Some(player) = self.document.get_element_by_id(VIDEO_PLAYER_ID) else {
            return false;
        };
        self.set_hidden(&player, blocked);
        if blocked {
            if let Some(media) = player.dyn_ref::<HtmlMediaElement>() {
                let _ = media.pause();
            }
        }
        true
    }

    fn find_chat_messages(&self) -> Vec<Element> {
        self.select_all(CHAT_ROWS)
    }

    fn chat_author(&self, message: &Element) -> Option<String> {
        first(message, CHAT_AUTHOR)?
            .get_attribute("title")
            .filter(|title| !title.trim().is_empty())
    }

    fn redact_chat_message(&self, message: &Element, author: &str) -> bool {
        let Some(body) = first(message, CHAT_BODY) else {
            return false;
        };
        if body.has_attribute(REDACTED_ATTR) {
            return false;
        }
        let Ok(placeholder) = self.document.create_element("span") else {
            return false;
        };
        placeholder.set_text_content(Some(&format!("[{}]", author)));
        let _ = placeholder.set_attribute("style", "color:gray;font-style:italic;");

        body.set_text_content(None);
        if body.append_child(&placeholder).is_err() {
            return false;
        }
        let _ = body.set_attribute(REDACTED_ATTR, "");
        if let Some(html) = body.dyn_ref::<HtmlElement>() {
            let _ = html.style().set_property("opacity", "0.3");
        }
        true
    }

    fn set_hidden(&self, element: &Element, hidden: bool) -> bool {
        let Some(html) = element.dyn_ref::<HtmlElement>() else {
            return false;
        };
        let style = html.style();
        let was_hidden = style
            .get_property_value("display")
            .map(|display| display == "none")
            .unwrap_or(false);
        if was_hidden == hidden {
            return false;
        }
        if hidden {
            style.set_property("display", "none").is_ok()
        } else {
            style.remove_property("display").is_ok()
        }
    }

    fn has_block_control(&self, element: &Element) -> bool {
        element.has_attribute(HAS_CONTROL_ATTR)
    }

    fn attach_block_control(&self, element: &Element, target: BlockTarget) {
        let Ok(button) = self.document.create_element("button") else {
            return;
        };
        let overlay = element.matches(CARD).unwrap_or(false) || element.matches(SIDEBAR_ITEM).unwrap_or(false);

        button.set_class_name(CONTROL_CLASS);
        button.set_text_content(Some("\u{2716}"));
        let _ = button.set_attribute("type", "button");
        let _ = button.set_attribute("title", &control_title(&target));
        let _ = button.set_attribute(CONTROL_KIND_ATTR, target.kind.storage_key());
        let _ = button.set_attribute(CONTROL_VALUE_ATTR, &target.raw);
        let _ = button.set_attribute("style", if overlay { OVERLAY_STYLE } else { INLINE_STYLE });

        if let Some(html) = element.dyn_ref::<HtmlElement>() {
            let style = html.style();
            if overlay {
                let _ = style.set_property("position", "relative");
            } else if target.kind == ListKind::Tags {
                let _ = style.set_property("display", "inline-flex");
                let _ = style.set_property("align-items", "center");
            }
        }

        if element.append_child(&button).is_ok() {
            let _ = element.set_attribute(HAS_CONTROL_ATTR, "");
        }
    }
}
