//! Binary font decoding: container detection, WOFF/WOFF2 unpacking and a
//! structural view over the resulting sfnt.

use std::fs;
use std::path::Path;
use tracing::debug;
use font_core::{FontError, FontFormat, FontResult};

mod face;
mod sfnt;
mod woff;
mod woff2;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use face::FontView;

/// Identify the container from its leading 4-byte signature.
pub fn detect_format(data: &[u8]) -> Option<FontFormat> {
    match data.get(0..4)? {
        b"wOF2" => Some(FontFormat::Woff2),
        b"wOFF" => Some(FontFormat::Woff),
        b"OTTO" => Some(FontFormat::Otf),
        b"ttcf" => Some(FontFormat::Collection),
        b"true" | [0x00, 0x01, 0x00, 0x00] => Some(FontFormat::Ttf),
        _ => None,
    }
}

/// A font unpacked to a plain sfnt buffer that is known to parse.
#[derive(Debug, Clone)]
pub struct DecodedFont {
    format: FontFormat,
    sfnt: Vec<u8>,
}

impl DecodedFont {
    /// Container the bytes arrived in
    pub fn format(&self) -> FontFormat {
        self.format
    }

    pub fn sfnt_bytes(&self) -> &[u8] {
        &self.sfnt
    }

    pub fn view(&self) -> FontResult<FontView<'_>> {
        FontView::parse(&self.sfnt)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FontParser;

impl FontParser {
    /// Unpack and validate a font buffer.
    pub fn parse_bytes(&self, data: &[u8]) -> FontResult<DecodedFont> {
        let format = detect_format(data).ok_or(FontError::UnsupportedFormat)?;

        let sfnt = match format {
            FontFormat::Woff2 => woff2::decode(data)?,
            FontFormat::Woff => woff::decode(data)?,
            FontFormat::Ttf | FontFormat::Otf | FontFormat::Collection => data.to_vec(),
        };

        // Reject anything ttf-parser cannot open so callers only ever see usable fonts
        FontView::parse(&sfnt)?;

        Ok(DecodedFont { format, sfnt })
    }

    pub fn parse_font_file<P: AsRef<Path>>(&self, path: P) -> FontResult<DecodedFont> {
        let font_data = fs::read(path.as_ref()).map_err(FontError::Io)?;
        self.parse_bytes(&font_data)
    }

    /// Like [`FontParser::parse_bytes`] but any failure means "no font".
    pub fn decode(&self, data: &[u8]) -> Option<DecodedFont> {
        match self.parse_bytes(data) {
            Ok(font) => Some(font),
            Err(e) => {
                debug!(error = %e, bytes = data.len(), "font bytes did not decode");
                None
            }
        }
    }
}

/// Decode a raw font buffer; corrupt or unsupported data yields `None`.
pub fn decode(data: &[u8]) -> Option<DecodedFont> {
    FontParser.decode(data)
}
