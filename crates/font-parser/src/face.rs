use ttf_parser::{Face, GlyphId, OutlineBuilder, Tag};
use font_core::{
    FontError, FontResult, GlyphBounds, GlyphOutline, Os2Metrics, PathCommand, StructuralFont,
};
use crate::sfnt::Reader;

/// Structural view over a plain sfnt buffer, backed by `ttf-parser`.
pub struct FontView<'a> {
    face: Face<'a>,
}

impl<'a> FontView<'a> {
    pub fn parse(sfnt: &'a [u8]) -> FontResult<Self> {
        let face = Face::parse(sfnt, 0)
            .map_err(|e| FontError::Parse(format!("Failed to parse font: {}", e)))?;
        Ok(Self { face })
    }

    pub fn number_of_glyphs(&self) -> u16 {
        self.face.number_of_glyphs()
    }

    /// Family name from the `name` table, if it has a Unicode entry
    pub fn family_name(&self) -> Option<String> {
        self.extract_string(ttf_parser::name_id::TYPOGRAPHIC_FAMILY)
            .or_else(|| self.extract_string(ttf_parser::name_id::FAMILY))
    }

    fn extract_string(&self, name_id: u16) -> Option<String> {
        self.face
            .names()
            .into_iter()
            .filter(|name| name.name_id == name_id && name.is_unicode())
            .find_map(|name| name.to_string())
    }
}

impl StructuralFont for FontView<'_> {
    fn units_per_em(&self) -> u16 {
        self.face.units_per_em()
    }

    fn os2(&self) -> Option<Os2Metrics> {
        let table = self.face.raw_face().table(Tag::from_bytes(b"OS/2"))?;
        parse_os2(table)
    }

    fn ascender(&self) -> i16 {
        self.face.ascender()
    }

    fn descender(&self) -> i16 {
        self.face.descender()
    }

    fn is_fixed_pitch(&self) -> bool {
        self.face.is_monospaced()
    }

    fn italic_angle(&self) -> f32 {
        self.face.italic_angle().unwrap_or(0.0)
    }

    fn glyph(&self, ch: char) -> Option<GlyphOutline> {
        let id = self.face.glyph_index(ch).filter(|id| *id != GlyphId(0))?;

        let mut collector = PathCollector::default();
        let rect = self.face.outline_glyph(id, &mut collector);

        Some(GlyphOutline {
            commands: collector.commands,
            advance_width: self.face.glyph_hor_advance(id),
            bounds: rect.map(|r| GlyphBounds {
                x_min: r.x_min,
                y_min: r.y_min,
                x_max: r.x_max,
                y_max: r.y_max,
            }),
        })
    }
}

/// Reads the OS/2 fields `ttf-parser` does not expose (PANOSE, xAvgCharWidth).
/// Version 0 tables are 78 bytes; sxHeight/sCapHeight need version 2+.
pub(crate) fn parse_os2(table: &[u8]) -> Option<Os2Metrics> {
    if table.len() < 78 {
        return None;
    }
    let mut s = Reader::new(table);
    let version = s.u16().ok()?;
    let avg_char_width = s.i16().ok()?;
    let weight_class = s.u16().ok()?;
    let width_class = s.u16().ok()?;

    let panose: [u8; 10] = table.get(32..42)?.try_into().ok()?;

    let mut typo = Reader::at(table, 68).ok()?;
    let typo_ascender = typo.i16().ok()?;
    let typo_descender = typo.i16().ok()?;

    let (x_height, cap_height) = if version >= 2 && table.len() >= 90 {
        let mut heights = Reader::at(table, 86).ok()?;
        (heights.i16().ok(), heights.i16().ok())
    } else {
        (None, None)
    };

    Some(Os2Metrics {
        avg_char_width,
        weight_class,
        width_class,
        panose,
        typo_ascender,
        typo_descender,
        x_height,
        cap_height,
    })
}

#[derive(Default)]
struct PathCollector {
    commands: Vec<PathCommand>,
}

impl OutlineBuilder for PathCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(PathCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(PathCommand::LineTo { x, y });
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.commands.push(PathCommand::QuadTo { x1, y1, x, y });
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.commands.push(PathCommand::CurveTo { x1, y1, x2, y2, x, y });
    }

    fn close(&mut self) {
        self.commands.push(PathCommand::Close);
    }
}
