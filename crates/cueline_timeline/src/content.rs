// SPDX-License-Identifier: MIT OR Apache-2.0
//! Device content carried by timed elements.
//!
//! Content is a closed sum type: adding a device or content kind forces every
//! `match` over it to be updated.

use serde::{Deserialize, Serialize};

/// Default ATEM transition rate in frames
pub const DEFAULT_TRANSITION_RATE: u32 = 25;

/// Kind of playout device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// No device (timing-only element)
    Abstract,
    /// CasparCG graphics/video server
    CasparCg,
    /// Blackmagic ATEM vision mixer
    Atem,
}

impl DeviceKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Abstract => "Abstract",
            Self::CasparCg => "CasparCG",
            Self::Atem => "ATEM",
        }
    }
}

/// What an element makes a device do
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ElementContent {
    /// Timing-only element
    #[default]
    Abstract,
    /// CasparCG content
    CasparCg(CasparCgContent),
    /// ATEM content
    Atem(AtemContent),
}

/// CasparCG content kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CasparCgContent {
    /// Play a media file
    Media {
        /// Media file name
        file: String,
        /// Loop playback
        #[serde(default)]
        looping: bool,
    },
    /// Play a template
    Template {
        /// Template name
        name: String,
        /// Template flavour
        template_type: TemplateType,
        /// Template data (usually JSON text)
        #[serde(default)]
        data: String,
        /// Send a stop command instead of clearing the layer
        #[serde(default)]
        use_stop_command: bool,
    },
    /// Show a web page
    HtmlPage {
        /// Page URL
        url: String,
    },
    /// Route a decklink/ndi input
    Input {
        /// Input device number
        device: u32,
        /// Input format, e.g. `1080i5000`
        format: String,
    },
    /// Route another channel/layer
    Route {
        /// Source channel
        channel: Option<u32>,
        /// Source layer
        layer: Option<u32>,
    },
    /// Record the channel to a file
    Record {
        /// Output file name
        file: String,
    },
    /// Play an IP stream
    Ip {
        /// Stream URI
        uri: String,
    },
}

/// CasparCG template flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateType {
    /// HTML template
    Html,
    /// Flash template
    Flash,
}

/// ATEM content kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AtemContent {
    /// Mix effect bus
    Me {
        /// Program input
        input: Option<u32>,
        /// Transition to use when cutting to the input
        transition: Option<AtemTransition>,
    },
    /// Downstream keyer
    Dsk {
        /// Keyer on air
        on_air: bool,
        /// Fill source
        fill_source: u32,
        /// Key (cut) source
        cut_source: u32,
    },
    /// Aux output
    Aux {
        /// Routed input
        input: u32,
    },
    /// SuperSource boxes
    SuperSource,
    /// SuperSource properties
    SuperSourceProps,
    /// Media player source selection
    MediaPlayer {
        /// Media pool index
        source: u32,
    },
    /// Macro player
    MacroPlayer {
        /// Macro index
        macro_index: u32,
    },
    /// Audio mixer channel
    AudioChannel {
        /// Channel index
        index: u32,
    },
}

/// ATEM transition style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtemTransition {
    /// Hard cut
    Cut,
    /// Mix with rate in frames
    Mix {
        /// Rate in frames
        rate: u32,
    },
    /// Dip through a colour
    Dip,
    /// Wipe with rate in frames
    Wipe {
        /// Rate in frames
        rate: u32,
    },
    /// Stinger
    Sting,
    /// Digital video effect
    Dve,
}

impl AtemTransition {
    /// Transition rate in frames; cuts have no rate
    pub fn rate(&self) -> Option<u32> {
        match self {
            Self::Cut => None,
            Self::Mix { rate } | Self::Wipe { rate } => Some(*rate),
            Self::Dip | Self::Sting | Self::Dve => Some(DEFAULT_TRANSITION_RATE),
        }
    }
}

/// Display description of an element's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescription {
    /// Short label
    pub label: String,
    /// Class names used to style the element by content type
    pub content_type_class_names: Vec<&'static str>,
}

impl ElementContent {
    /// The device this content targets
    pub fn device_kind(&self) -> DeviceKind {
        match self {
            Self::Abstract => DeviceKind::Abstract,
            Self::CasparCg(_) => DeviceKind::CasparCg,
            Self::Atem(_) => DeviceKind::Atem,
        }
    }

    /// Describe the content for display
    pub fn describe(&self) -> ContentDescription {
        let (label, class) = match self {
            Self::Abstract => ("Abstract".to_string(), "abstract"),
            Self::CasparCg(content) => match content {
                CasparCgContent::Media { file, .. } => (file.clone(), "media"),
                CasparCgContent::Template { name, .. } => (name.clone(), "template"),
                CasparCgContent::HtmlPage { url } => (url.clone(), "html-page"),
                CasparCgContent::Input { device, format } => {
                    (format!("Input {device} ({format})"), "input")
                }
                CasparCgContent::Route { channel, layer } => {
                    let channel = channel.map_or_else(|| "-".to_string(), |c| c.to_string());
                    let layer = layer.map_or_else(|| "-".to_string(), |l| l.to_string());
                    (format!("Route {channel}-{layer}"), "route")
                }
                CasparCgContent::Record { file } => (format!("Record {file}"), "record"),
                CasparCgContent::Ip { uri } => (uri.clone(), "ip"),
            },
            Self::Atem(content) => match content {
                AtemContent::Me { input, .. } => match input {
                    Some(input) => (format!("ME input {input}"), "me"),
                    None => ("ME".to_string(), "me"),
                },
                AtemContent::Dsk { on_air, .. } => {
                    let state = if *on_air { "on" } else { "off" };
                    (format!("DSK {state}"), "dsk")
                }
                AtemContent::Aux { input } => (format!("AUX input {input}"), "aux"),
                AtemContent::SuperSource => ("SuperSource".to_string(), "ssrc"),
                AtemContent::SuperSourceProps => ("SuperSource props".to_string(), "ssrc-props"),
                AtemContent::MediaPlayer { source } => {
                    (format!("Media player {source}"), "media-player")
                }
                AtemContent::MacroPlayer { macro_index } => {
                    (format!("Macro {macro_index}"), "macro-player")
                }
                AtemContent::AudioChannel { index } => {
                    (format!("Audio channel {index}"), "audio-channel")
                }
            },
        };

        let device_class = match self.device_kind() {
            DeviceKind::Abstract => "device-abstract",
            DeviceKind::CasparCg => "device-casparcg",
            DeviceKind::Atem => "device-atem",
        };

        ContentDescription {
            label,
            content_type_class_names: vec![device_class, class],
        }
    }
}
