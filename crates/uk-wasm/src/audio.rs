//! Web Audio gain stage

use uk_core::AudioGraph;
use wasm_bindgen::JsCast;
use web_sys::{AudioContext, AudioContextState, Document, GainNode, HtmlMediaElement, MediaElementAudioSourceNode};

use crate::page::VIDEO_PLAYER_ID;

/// `video -> source -> gain -> destination`, built lazily.
pub struct WebAudio {
    document: Document,
    context: Option<AudioContext>,
    gain: Option<GainNode>,
    source: Option<MediaElementAudioSourceNode>,
}

impl WebAudio {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            context: None,
            gain: None,
            source: None,
        }
    }

    fn context(&mut self) -> Option<&AudioContext> {
        if self.context.is_none() {
            match AudioContext::new() {
                Ok(context) => self.context = Some(context),
                Err(err) => {
                    log::warn!("AudioContext unavailable: {:?}", err);
                    return None;
                }
            }
        }
        self.context.as_ref()
    }

    /// The shared gain node, created and wired to the destination once.
    fn gain_node(&mut self, context: &AudioContext) -> Result<GainNode, wasm_bindgen::JsValue> {
        if let Some(gain) = &self.gain {
            return Ok(gain.clone());
        }
        let gain = context.create_gain()?;
        gain.connect_with_audio_node(&context.destination())?;
        self.gain = Some(gain.clone());
        Ok(gain)
    }

    fn route(&mut self, media: &HtmlMediaElement) -> Result<(), wasm_bindgen::JsValue> {
        let context = self
            .context()
            .cloned()
            .ok_or_else(|| wasm_bindgen::JsValue::from_str("no audio context"))?;
        let gain = self.gain_node(&context)?;
        let source = context.create_media_element_source(media)?;
        source.connect_with_audio_node(&gain)?;
        self.source = Some(source);
        Ok(())
    }
}

impl AudioGraph for WebAudio {
    type Media = HtmlMediaElement;

    fn current_media(&self) -> Option<HtmlMediaElement> {
        self.document
            .get_element_by_id(VIDEO_PLAYER_ID)?
            .dyn_into::<HtmlMediaElement>()
            .ok()
    }

    fn connect(&mut self, media: &HtmlMediaElement) -> bool {
        match self.route(media) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Failed to route media through gain: {:?}", err);
                false
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(source) = self.source.take() {
            if let Err(err) = source.disconnect() {
                log::warn!("Audio source disconnect failed: {:?}", err);
            }
        }
    }

    fn set_gain(&mut self, gain: f64) {
        if let Some(node) = &self.gain {
            node.gain().set_value(gain as f32);
        }
    }

    fn resume(&mut self) {
        let Some(context) = self.context() else {
            return;
        };
        if context.state() == AudioContextState::Suspended {
            let _ = context.resume();
        }
    }
}
