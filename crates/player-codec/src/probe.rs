//! Decoder capability probing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::{VideoDecoderConfig, VideoDecoderFactory};

/// Codec strings probed at session start.
pub const PROBE_CODECS: &[&str] = &[
    "avc1.42E01E",     // H.264 Baseline
    "avc1.4D401E",     // H.264 Main
    "avc1.64001E",     // H.264 High
    "hev1.1.6.L93.B0", // H.265/HEVC
    "vp8",
    "vp09.00.10.08",
    "av01.0.04M.08",
];

/// Probe dimensions.
const PROBE_WIDTH: u32 = 1920;
const PROBE_HEIGHT: u32 = 1080;

/// Outcome of probing one codec string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodecSupport {
    /// Whether the factory accepts the configuration.
    pub supported: bool,

    /// Why the query itself failed, if it did.
    pub error: Option<String>,
}

/// Ask `factory` about every entry of [`PROBE_CODECS`] at 1920x1080.
pub fn probe_supported_codecs(factory: &dyn VideoDecoderFactory) -> BTreeMap<String, CodecSupport> {
    let mut results = BTreeMap::new();

    for codec in PROBE_CODECS {
        let config = VideoDecoderConfig::new(codec, PROBE_WIDTH, PROBE_HEIGHT, None);
        let support = match factory.is_config_supported(&config) {
            Ok(supported) => CodecSupport {
                supported,
                error: None,
            },
            Err(e) => CodecSupport {
                supported: false,
                error: Some(e.to_string()),
            },
        };
        debug!(codec, supported = support.supported, "Probed codec");
        results.insert((*codec).to_string(), support);
    }

    results
}
