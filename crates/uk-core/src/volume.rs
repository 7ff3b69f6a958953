//! Volume boost
//!
//! The boost is a gain stage spliced between the video element and the audio
//! output. Browsers refuse to start audio graphs before a user gesture, so
//! nothing is built until [`VolumeBoost::unlock`]. The host page swaps its
//! media element when moving between streams; [`VolumeBoost::sync`] notices
//! and re-routes.

/// The host's audio graph.
pub trait AudioGraph {
    /// Handle to a media element, compared by identity.
    type Media: PartialEq;

    fn current_media(&self) -> Option<Self::Media>;
    /// Route `media` through the gain stage. False if the browser refused.
    fn connect(&mut self, media: &Self::Media) -> bool;
    /// Detach the currently routed media element.
    fn disconnect(&mut self);
    fn set_gain(&mut self, gain: f64);
    /// Resume a suspended audio context.
    fn resume(&mut self);
}

pub struct VolumeBoost<G: AudioGraph> {
    graph: G,
    gain: f64,
    unlocked: bool,
    connected: Option<G::Media>,
}

impl<G: AudioGraph> VolumeBoost<G> {
    pub fn new(graph: G, gain: f64) -> Self {
        Self {
            graph,
            gain,
            unlocked: false,
            connected: None,
        }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn is_connected(&self) -> bool {
        self.connected.is_some()
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// First user gesture seen: build the route and apply the gain.
    pub fn unlock(&mut self) {
        if self.unlocked {
            return;
        }
        self.unlocked = true;
        self.graph.resume();
        self.sync();
        self.graph.set_gain(self.gain);
    }

    /// Re-route if the page replaced its media element. A page without a
    /// media element keeps the existing route.
    pub fn sync(&mut self) {
        if !self.unlocked {
            return;
        }
        let Some(media) = self.graph.current_media() else {
            return;
        };
        if self.connected.as_ref() == Some(&media) {
            return;
        }
        if self.connected.take().is_some() {
            self.graph.disconnect();
        }
        if self.graph.connect(&media) {
            self.graph.set_gain(self.gain);
            self.connected = Some(media);
        } else {
            log::warn!("Audio graph refused the media element");
        }
    }

    pub fn set_boost(&mut self, gain: f64) {
        self.gain = gain;
        if !self.unlocked {
            return;
        }
        self.graph.set_gain(gain);
        self.graph.resume();
    }
}
