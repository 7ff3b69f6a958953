//! Page adapter
//!
//! The host page's markup is undocumented and changes without notice, so
//! every structural selector sits behind this trait. Lookups that miss
//! return `None` or an empty list; they are never errors.

use crate::types::{BlockTarget, Identity};

/// Structural access to the host page.
pub trait PageAdapter {
    /// Handle to a page element.
    type Element;

    /// Stream cards and category cards in grids and listings.
    fn find_cards(&self) -> Vec<Self::Element>;
    fn card_identity(&self, card: &Self::Element) -> Identity;

    /// Recommended channels in the sidebar.
    fn find_sidebar_items(&self) -> Vec<Self::Element>;
    fn sidebar_identity(&self, item: &Self::Element) -> Identity;

    /// Individual tag chips.
    fn find_tag_chips(&self) -> Vec<Self::Element>;
    fn tag_label(&self, chip: &Self::Element) -> Option<String>;

    /// Header element and username of the channel being viewed, if any.
    fn channel_header(&self) -> Option<(Self::Element, String)>;
    /// Hide and pause the primary video element, or make it visible again.
    /// Returns false when there is no video element.
    fn set_player_blocked(&self, blocked: bool) -> bool;

    /// Chat message rows currently rendered.
    fn find_chat_messages(&self) -> Vec<Self::Element>;
    fn chat_author(&self, message: &Self::Element) -> Option<String>;
    /// Replace the message body with a placeholder, leaving the row in place.
    /// Returns false if the row was already redacted.
    fn redact_chat_message(&self, message: &Self::Element, author: &str) -> bool;

    /// Returns true if the visibility actually changed.
    fn set_hidden(&self, element: &Self::Element, hidden: bool) -> bool;

    fn has_block_control(&self, element: &Self::Element) -> bool;
    fn attach_block_control(&self, element: &Self::Element, target: BlockTarget);
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory page used by the filter and controller tests.

    use std::cell::RefCell;

    use super::PageAdapter;
    use crate::types::{BlockTarget, Identity};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Role {
        Card,
        Sidebar,
        Tag,
        Chat,
        Header,
    }

    #[derive(Debug, Clone)]
    pub struct Node {
        pub role: Role,
        pub identity: Identity,
        pub label: Option<String>,
        pub hidden: bool,
        pub redacted: Option<String>,
        pub control: Option<BlockTarget>,
    }

    #[derive(Debug, Default)]
    pub struct FakePage {
        pub nodes: RefCell<Vec<Node>>,
        pub channel: Option<String>,
        pub has_player: bool,
        pub player_blocked: RefCell<bool>,
    }

    impl FakePage {
        pub fn new() -> Self {
            Self::default()
        }

        fn push(&self, role: Role, identity: Identity, label: Option<String>) -> usize {
            let mut nodes = self.nodes.borrow_mut();
            nodes.push(Node {
                role,
                identity,
                label,
                hidden: false,
                redacted: None,
                control: None,
            });
            nodes.len() - 1
        }

        pub fn card(&self, channel: Option<&str>, category: Option<&str>, tags: &[&str]) -> usize {
            let identity = Identity {
                channel: channel.map(String::from),
                category: category.map(String::from),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            };
            self.push(Role::Card, identity, None)
        }

        pub fn sidebar(&self, channel: Option<&str>, category: Option<&str>) -> usize {
            let identity = Identity {
                channel: channel.map(String::from),
                category: category.map(String::from),
                tags: Vec::new(),
            };
            self.push(Role::Sidebar, identity, None)
        }

        pub fn tag(&self, label: Option<&str>) -> usize {
            self.push(Role::Tag, Identity::default(), label.map(String::from))
        }

        pub fn chat(&self, author: Option<&str>) -> usize {
            self.push(Role::Chat, Identity::default(), author.map(String::from))
        }

        pub fn viewing(mut self, channel: &str) -> Self {
            self.channel = Some(channel.to_string());
            self.has_player = true;
            self
        }

        pub fn node(&self, id: usize) -> Node {
            self.nodes.borrow()[id].clone()
        }

        pub fn header_control(&self) -> Option<BlockTarget> {
            self.nodes
                .borrow()
                .iter()
                .find(|n| n.role == Role::Header)
                .and_then(|n| n.control.clone())
        }

        fn by_role(&self, role: Role) -> Vec<usize> {
            self.nodes
                .borrow()
                .iter()
                .enumerate()
                .filter(|(_, n)| n.role == role)
                .map(|(i, _)| i)
                .collect()
        }
    }

    impl PageAdapter for FakePage {
        type Element = usize;

        fn find_cards(&self) -> Vec<usize> {
            self.by_role(Role::Card)
        }

        fn card_identity(&self, card: &usize) -> Identity {
            self.nodes.borrow()[*card].identity.clone()
        }

        fn find_sidebar_items(&self) -> Vec<usize> {
            self.by_role(Role::Sidebar)
        }

        fn sidebar_identity(&self, item: &usize) -> Identity {
            self.nodes.borrow()[*item].identity.clone()
        }

        fn find_tag_chips(&self) -> Vec<usize> {
            self.by_role(Role::Tag)
        }

        fn tag_label(&self, chip: &usize) -> Option<String> {
            self.nodes.borrow()[*chip].label.clone()
        }

        fn channel_header(&self) -> Option<(usize, String)> {
            let channel = self.channel.clone()?;
            let existing = self.by_role(Role::Header).first().copied();
            let id = match existing {
                Some(id) => id,
                None => self.push(Role::Header, Identity::default(), None),
            };
            Some((id, channel))
        }

        fn set_player_blocked(&self, blocked: bool) -> bool {
            if !self.has_player {
                return false;
            }
            *self.player_blocked.borrow_mut() = blocked;
            true
        }

        fn find_chat_messages(&self) -> Vec<usize> {
            self.by_role(Role::Chat)
        }

        fn chat_author(&self, message: &usize) -> Option<String> {
            self.nodes.borrow()[*message].label.clone()
        }

        fn redact_chat_message(&self, message: &usize, author: &str) -> bool {
            let mut nodes = self.nodes.borrow_mut();
            let node = &mut nodes[*message];
            if node.redacted.is_some() {
                return false;
            }
            node.redacted = Some(format!("[{}]", author));
            true
        }

        fn set_hidden(&self, element: &usize, hidden: bool) -> bool {
            let mut nodes = self.nodes.borrow_mut();
            let node = &mut nodes[*element];
            let changed = node.hidden != hidden;
            node.hidden = hidden;
            changed
        }

        fn has_block_control(&self, element: &usize) -> bool {
            self.nodes.borrow()[*element].control.is_some()
        }

        fn attach_block_control(&self, element: &usize, target: BlockTarget) {
            self.nodes.borrow_mut()[*element].control = Some(target);
        }
    }
}
