//! In-memory TrueType fonts for tests.
//!
//! [`TestFont`] describes a tiny font (metrics plus a handful of glyph
//! outlines) and serializes it as a plain sfnt, a WOFF 1.0 file or a WOFF 2.0
//! file with transformed `glyf`/`loca`/`hmtx` tables.

use std::io::Write;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use font_core::{FontError, FontResult};
use crate::sfnt::{self, padded_len, table_checksum};
use crate::woff2::{computed_bbox, encode_simple_glyph};

/// A point of a glyph contour: (x, y, on-curve)
pub type Point = (i16, i16, bool);

#[derive(Debug, Clone)]
pub struct TestGlyph {
    pub ch: char,
    pub advance: u16,
    pub contours: Vec<Vec<Point>>,
}

impl TestGlyph {
    /// Axis-aligned rectangle contour
    pub fn rect(ch: char, advance: u16, x0: i16, y0: i16, x1: i16, y1: i16) -> Self {
        Self {
            ch,
            advance,
            contours: vec![vec![(x0, y0, true), (x0, y1, true), (x1, y1, true), (x1, y0, true)]],
        }
    }

    /// Octagon-ish ring made of quadratic arcs around a rectangular counter
    pub fn ring(ch: char, advance: u16, x0: i16, y0: i16, x1: i16, y1: i16) -> Self {
        let mx = (x0 + x1) / 2;
        let my = (y0 + y1) / 2;
        let outer = vec![
            (mx, y0, true),
            (x1, y0, false),
            (x1, my, true),
            (x1, y1, false),
            (mx, y1, true),
            (x0, y1, false),
            (x0, my, true),
            (x0, y0, false),
        ];
        let inset_x = (x1 - x0) / 4;
        let inset_y = (y1 - y0) / 6;
        let inner = vec![
            (x0 + inset_x, y0 + inset_y, true),
            (x1 - inset_x, y0 + inset_y, true),
            (x1 - inset_x, y1 - inset_y, true),
            (x0 + inset_x, y1 - inset_y, true),
        ];
        Self { ch, advance, contours: vec![outer, inner] }
    }

    /// Rectangle stem with `extra` notches along its base, used to
    /// control the command count of serif probe glyphs
    pub fn notched(ch: char, advance: u16, x0: i16, x1: i16, y1: i16, extra: usize) -> Self {
        let mut contour = vec![(x0, 0, true), (x0, y1, true), (x1, y1, true), (x1, 0, true)];
        let step = (x1 - x0) / (extra as i16 + 1);
        for i in 0..extra {
            let x = x1 - step * (i as i16 + 1);
            contour.push((x, if i % 2 == 0 { -10 } else { 0 }, true));
        }
        Self { ch, advance, contours: vec![contour] }
    }
}

/// Description of a synthetic font
#[derive(Debug, Clone)]
pub struct TestFont {
    pub family: String,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Emit an OS/2 table (version 4)
    pub with_os2: bool,
    pub weight_class: u16,
    pub width_class: u16,
    pub avg_char_width: i16,
    pub x_height: i16,
    pub cap_height: i16,
    pub panose: [u8; 10],
    pub italic_angle: f32,
    pub fixed_pitch: bool,
    pub glyphs: Vec<TestGlyph>,
}

impl TestFont {
    /// Proportional sans-like font with every sampled character present
    pub fn sans(family: &str) -> Self {
        let mut glyphs = Vec::new();
        for ch in ['I', 'l', 'T', 'H', 'A', 'B', 'D', 'n', 'p', 'q', 'r', '1'] {
            let advance = if ch.is_uppercase() { 640 } else { 520 };
            glyphs.push(TestGlyph::rect(ch, advance, 60, 0, advance as i16 - 60, 700));
        }
        for ch in ['o', 'e', 'a', 'C', '0', '2', '3'] {
            let advance = if ch.is_uppercase() { 680 } else { 560 };
            glyphs.push(TestGlyph::ring(ch, advance, 40, -10, advance as i16 - 40, 520));
        }
        for (i, ch) in ('b'..='z').enumerate() {
            if glyphs.iter().any(|g| g.ch == ch) {
                continue;
            }
            let advance = 420 + (i as u16 % 5) * 40;
            glyphs.push(TestGlyph::rect(ch, advance, 40, 0, advance as i16 - 40, 500));
        }

        Self {
            family: family.to_string(),
            units_per_em: 1000,
            ascender: 800,
            descender: -200,
            with_os2: true,
            weight_class: 400,
            width_class: 5,
            avg_char_width: 500,
            x_height: 500,
            cap_height: 700,
            panose: [2, 11, 5, 2, 2, 2, 2, 2, 2, 4],
            italic_angle: 0.0,
            fixed_pitch: false,
            glyphs,
        }
    }

    /// Same outlines as [`TestFont::sans`] but every advance is 600
    /// and the post table does not flag fixed pitch
    pub fn monospace(family: &str) -> Self {
        let mut font = Self::sans(family);
        for glyph in &mut font.glyphs {
            glyph.advance = 600;
        }
        font.avg_char_width = 600;
        font.panose[3] = 0;
        font
    }

    /// Ordered glyph list; glyph 0 is an empty `.notdef`
    fn sorted_glyphs(&self) -> Vec<&TestGlyph> {
        let mut glyphs: Vec<&TestGlyph> = self.glyphs.iter().collect();
        glyphs.sort_by_key(|g| g.ch);
        glyphs.dedup_by_key(|g| g.ch);
        glyphs
    }

    fn num_glyphs(&self) -> u16 {
        self.sorted_glyphs().len() as u16 + 1
    }

    /// Absolute points and contour end indices of a glyph
    fn outline(glyph: &TestGlyph) -> (Vec<u16>, Vec<Point>) {
        let mut end_points = Vec::new();
        let mut points = Vec::new();
        for contour in &glyph.contours {
            points.extend_from_slice(contour);
            end_points.push(points.len() as u16 - 1);
        }
        (end_points, points)
    }

    fn x_mins(&self) -> Vec<i16> {
        let mut x_mins = vec![0];
        for glyph in self.sorted_glyphs() {
            let (_, points) = Self::outline(glyph);
            x_mins.push(computed_bbox(&points)[0]);
        }
        x_mins
    }

    /// Plain sfnt tables in arbitrary order
    pub fn tables(&self) -> Vec<([u8; 4], Vec<u8>)> {
        let (glyf, loca) = self.glyf_and_loca();
        let mut tables = vec![
            (*b"head", self.head()),
            (*b"hhea", self.hhea()),
            (*b"maxp", self.maxp()),
            (*b"post", self.post()),
            (*b"cmap", self.cmap()),
            (*b"name", self.name()),
            (*b"hmtx", self.hmtx()),
            (*b"glyf", glyf),
            (*b"loca", loca),
        ];
        if self.with_os2 {
            tables.push((*b"OS/2", self.os2()));
        }
        tables
    }

    pub fn to_ttf(&self) -> Vec<u8> {
        sfnt::assemble(0x0001_0000, self.tables())
    }

    pub fn to_woff(&self) -> FontResult<Vec<u8>> {
        let mut tables = self.tables();
        tables.sort_by(|a, b| a.0.cmp(&b.0));

        let mut directory = Vec::new();
        let mut body = Vec::new();
        let data_start = 44 + 20 * tables.len();
        let mut total_sfnt = 12 + 16 * tables.len();

        for (tag, data) in &tables {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(data)?;
            let compressed = encoder.finish()?;
            let stored = if compressed.len() < data.len() { compressed } else { data.clone() };

            directory.extend_from_slice(tag);
            directory.extend_from_slice(&((data_start + body.len()) as u32).to_be_bytes());
            directory.extend_from_slice(&(stored.len() as u32).to_be_bytes());
            directory.extend_from_slice(&(data.len() as u32).to_be_bytes());
            directory.extend_from_slice(&table_checksum(data).to_be_bytes());

            body.extend_from_slice(&stored);
            body.resize(padded_len(body.len()), 0);
            total_sfnt += padded_len(data.len());
        }

        let mut out = Vec::with_capacity(data_start + body.len());
        out.extend_from_slice(b"wOFF");
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&((data_start + body.len()) as u32).to_be_bytes());
        out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(total_sfnt as u32).to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&[0u8; 20]); // metadata and private blocks
        out.extend_from_slice(&directory);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// WOFF 2.0 with transformed `glyf`/`loca` and a transformed `hmtx`
    /// that omits every side bearing.
    pub fn to_woff2(&self) -> FontResult<Vec<u8>> {
        let (glyf, loca) = self.glyf_and_loca();
        let transformed_glyf = self.transformed_glyf();
        let transformed_hmtx = self.transformed_hmtx();

        // (flags byte, bytes stored in the stream, original length when transformed)
        let mut entries: Vec<(u8, Vec<u8>, Option<usize>)> = Vec::new();
        for (tag, data) in self.tables() {
            let index = known_tag_index(&tag).ok_or_else(|| {
                FontError::Parse(format!("no WOFF2 index for {}", String::from_utf8_lossy(&tag)))
            })?;
            let entry = match &tag {
                b"glyf" => (index, transformed_glyf.clone(), Some(glyf.len())),
                b"loca" => (index, Vec::new(), Some(loca.len())),
                b"hmtx" => (index | 0x40, transformed_hmtx.clone(), Some(data.len())),
                _ => (index, data, None),
            };
            entries.push(entry);
        }

        let mut directory = Vec::new();
        let mut stream = Vec::new();
        for (flags, stored, transformed_from) in &entries {
            directory.push(*flags);
            match transformed_from {
                Some(orig) => {
                    write_base128(*orig as u32, &mut directory);
                    write_base128(stored.len() as u32, &mut directory);
                }
                None => write_base128(stored.len() as u32, &mut directory),
            }
            stream.extend_from_slice(stored);
        }

        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 9, 22);
            writer.write_all(&stream)?;
            writer.flush()?;
        }

        let total_len = 48 + directory.len() + compressed.len();
        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(b"wOF2");
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&(total_len as u32).to_be_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(self.to_ttf().len() as u32).to_be_bytes());
        out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&[0u8; 20]); // metadata and private blocks
        out.extend_from_slice(&directory);
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    fn head(&self) -> Vec<u8> {
        let mut t = Vec::with_capacity(54);
        t.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        t.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // fontRevision
        t.extend_from_slice(&0u32.to_be_bytes()); // checkSumAdjustment
        t.extend_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        t.extend_from_slice(&0u16.to_be_bytes()); // flags
        t.extend_from_slice(&self.units_per_em.to_be_bytes());
        t.extend_from_slice(&[0u8; 16]); // created, modified
        t.extend_from_slice(&0i16.to_be_bytes());
        t.extend_from_slice(&self.descender.to_be_bytes());
        t.extend_from_slice(&(self.units_per_em as i16).to_be_bytes());
        t.extend_from_slice(&self.ascender.to_be_bytes());
        t.extend_from_slice(&0u16.to_be_bytes()); // macStyle
        t.extend_from_slice(&8u16.to_be_bytes()); // lowestRecPPEM
        t.extend_from_slice(&2i16.to_be_bytes()); // fontDirectionHint
        t.extend_from_slice(&1i16.to_be_bytes()); // indexToLocFormat: long
        t.extend_from_slice(&0i16.to_be_bytes()); // glyphDataFormat
        t
    }

    fn hhea(&self) -> Vec<u8> {
        let max_advance = self.glyphs.iter().map(|g| g.advance).max().unwrap_or(0);
        let mut t = Vec::with_capacity(36);
        t.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        t.extend_from_slice(&self.ascender.to_be_bytes());
        t.extend_from_slice(&self.descender.to_be_bytes());
        t.extend_from_slice(&0i16.to_be_bytes()); // lineGap
        t.extend_from_slice(&max_advance.to_be_bytes());
        t.extend_from_slice(&[0u8; 6]); // minLSB, minRSB, xMaxExtent
        t.extend_from_slice(&1i16.to_be_bytes()); // caretSlopeRise
        t.extend_from_slice(&[0u8; 4]); // caretSlopeRun, caretOffset
        t.extend_from_slice(&[0u8; 8]); // reserved
        t.extend_from_slice(&0i16.to_be_bytes()); // metricDataFormat
        t.extend_from_slice(&self.num_glyphs().to_be_bytes());
        t
    }

    fn maxp(&self) -> Vec<u8> {
        let mut t = Vec::with_capacity(6);
        t.extend_from_slice(&0x0000_5000u32.to_be_bytes());
        t.extend_from_slice(&self.num_glyphs().to_be_bytes());
        t
    }

    fn os2(&self) -> Vec<u8> {
        let mut t = vec![0u8; 96];
        t[0..2].copy_from_slice(&4u16.to_be_bytes());
        t[2..4].copy_from_slice(&self.avg_char_width.to_be_bytes());
        t[4..6].copy_from_slice(&self.weight_class.to_be_bytes());
        t[6..8].copy_from_slice(&self.width_class.to_be_bytes());
        t[32..42].copy_from_slice(&self.panose);
        t[68..70].copy_from_slice(&self.ascender.to_be_bytes());
        t[70..72].copy_from_slice(&self.descender.to_be_bytes());
        t[86..88].copy_from_slice(&self.x_height.to_be_bytes());
        t[88..90].copy_from_slice(&self.cap_height.to_be_bytes());
        t
    }

    fn post(&self) -> Vec<u8> {
        let mut t = vec![0u8; 32];
        t[0..4].copy_from_slice(&0x0003_0000u32.to_be_bytes());
        let fixed = (self.italic_angle * 65536.0).round() as i32;
        t[4..8].copy_from_slice(&fixed.to_be_bytes());
        t[12..16].copy_from_slice(&u32::from(self.fixed_pitch).to_be_bytes());
        t
    }

    /// Format 4 subtable with one segment per character
    fn cmap(&self) -> Vec<u8> {
        let glyphs = self.sorted_glyphs();
        let mut segments: Vec<(u16, u16)> = glyphs
            .iter()
            .enumerate()
            .filter_map(|(i, g)| u16::try_from(u32::from(g.ch)).ok().map(|code| (code, i as u16 + 1)))
            .collect();
        segments.push((0xFFFF, 0));

        let seg_count = segments.len() as u16;
        let mut entry_selector = 0u16;
        while (1u16 << (entry_selector + 1)) <= seg_count {
            entry_selector += 1;
        }
        let search_range = 2 * (1u16 << entry_selector);

        let mut sub = Vec::new();
        sub.extend_from_slice(&4u16.to_be_bytes());
        sub.extend_from_slice(&(16 + 8 * seg_count).to_be_bytes());
        sub.extend_from_slice(&0u16.to_be_bytes()); // language
        sub.extend_from_slice(&(seg_count * 2).to_be_bytes());
        sub.extend_from_slice(&search_range.to_be_bytes());
        sub.extend_from_slice(&entry_selector.to_be_bytes());
        sub.extend_from_slice(&(seg_count * 2 - search_range).to_be_bytes());
        for (code, _) in &segments {
            sub.extend_from_slice(&code.to_be_bytes());
        }
        sub.extend_from_slice(&0u16.to_be_bytes()); // reservedPad
        for (code, _) in &segments {
            sub.extend_from_slice(&code.to_be_bytes());
        }
        for (code, gid) in &segments {
            let delta = if *code == 0xFFFF { 1 } else { gid.wrapping_sub(*code) };
            sub.extend_from_slice(&delta.to_be_bytes());
        }
        for _ in &segments {
            sub.extend_from_slice(&0u16.to_be_bytes());
        }

        let mut t = Vec::new();
        t.extend_from_slice(&0u16.to_be_bytes()); // version
        t.extend_from_slice(&1u16.to_be_bytes()); // numTables
        t.extend_from_slice(&3u16.to_be_bytes()); // platform: Windows
        t.extend_from_slice(&1u16.to_be_bytes()); // encoding: Unicode BMP
        t.extend_from_slice(&12u32.to_be_bytes());
        t.extend_from_slice(&sub);
        t
    }

    fn name(&self) -> Vec<u8> {
        let encoded: Vec<u8> = self.family.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        let mut t = Vec::new();
        t.extend_from_slice(&0u16.to_be_bytes()); // format
        t.extend_from_slice(&1u16.to_be_bytes()); // count
        t.extend_from_slice(&18u16.to_be_bytes()); // storage offset
        t.extend_from_slice(&3u16.to_be_bytes());
        t.extend_from_slice(&1u16.to_be_bytes());
        t.extend_from_slice(&0x0409u16.to_be_bytes());
        t.extend_from_slice(&1u16.to_be_bytes()); // family name
        t.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        t.extend_from_slice(&0u16.to_be_bytes());
        t.extend_from_slice(&encoded);
        t
    }

    fn hmtx(&self) -> Vec<u8> {
        let x_mins = self.x_mins();
        let mut t = Vec::new();
        t.extend_from_slice(&0u16.to_be_bytes());
        t.extend_from_slice(&0i16.to_be_bytes());
        for (glyph, x_min) in self.sorted_glyphs().iter().zip(x_mins.iter().skip(1)) {
            t.extend_from_slice(&glyph.advance.to_be_bytes());
            t.extend_from_slice(&x_min.to_be_bytes());
        }
        t
    }

    fn glyf_and_loca(&self) -> (Vec<u8>, Vec<u8>) {
        let mut glyf = Vec::new();
        let mut loca = Vec::new();
        loca.extend_from_slice(&0u32.to_be_bytes()); // .notdef is empty
        for glyph in self.sorted_glyphs() {
            let (end_points, points) = Self::outline(glyph);
            encode_simple_glyph(&end_points, &points, &[], computed_bbox(&points), &mut glyf);
            glyf.resize(padded_len(glyf.len()), 0);
            loca.extend_from_slice(&(glyf.len() as u32).to_be_bytes());
        }
        (glyf, loca)
    }

    /// Forward `glyf` transform using the 4-byte triplet form for every point
    fn transformed_glyf(&self) -> Vec<u8> {
        let glyphs = self.sorted_glyphs();
        let num_glyphs = glyphs.len() + 1;

        let mut n_contours = Vec::new();
        let mut n_points = Vec::new();
        let mut flags = Vec::new();
        let mut glyph_stream = Vec::new();

        n_contours.extend_from_slice(&0i16.to_be_bytes());
        for glyph in glyphs {
            n_contours.extend_from_slice(&(glyph.contours.len() as i16).to_be_bytes());
            let (mut last_x, mut last_y) = (0i32, 0i32);
            for contour in &glyph.contours {
                write_255_u16(contour.len() as u16, &mut n_points);
                for &(x, y, on) in contour {
                    let (dx, dy) = (i32::from(x) - last_x, i32::from(y) - last_y);
                    let mut flag = 124u8;
                    if dx >= 0 {
                        flag |= 1;
                    }
                    if dy >= 0 {
                        flag |= 2;
                    }
                    if !on {
                        flag |= 0x80;
                    }
                    flags.push(flag);
                    glyph_stream.extend_from_slice(&(dx.unsigned_abs() as u16).to_be_bytes());
                    glyph_stream.extend_from_slice(&(dy.unsigned_abs() as u16).to_be_bytes());
                    last_x = i32::from(x);
                    last_y = i32::from(y);
                }
            }
            write_255_u16(0, &mut glyph_stream); // instruction length
        }

        let bbox_stream = vec![0u8; 4 * ((num_glyphs + 31) / 32)];

        let mut t = Vec::new();
        t.extend_from_slice(&0u16.to_be_bytes()); // reserved
        t.extend_from_slice(&0u16.to_be_bytes()); // optionFlags
        t.extend_from_slice(&(num_glyphs as u16).to_be_bytes());
        t.extend_from_slice(&1u16.to_be_bytes()); // indexFormat: long
        for size in [
            n_contours.len(),
            n_points.len(),
            flags.len(),
            glyph_stream.len(),
            0, // composite stream
            bbox_stream.len(),
            0, // instruction stream
        ] {
            t.extend_from_slice(&(size as u32).to_be_bytes());
        }
        t.extend_from_slice(&n_contours);
        t.extend_from_slice(&n_points);
        t.extend_from_slice(&flags);
        t.extend_from_slice(&glyph_stream);
        t.extend_from_slice(&bbox_stream);
        t
    }

    /// `hmtx` transform with both side-bearing arrays omitted
    fn transformed_hmtx(&self) -> Vec<u8> {
        let mut t = vec![0x03];
        t.extend_from_slice(&0u16.to_be_bytes());
        for glyph in self.sorted_glyphs() {
            t.extend_from_slice(&glyph.advance.to_be_bytes());
        }
        t
    }
}

fn known_tag_index(tag: &[u8; 4]) -> Option<u8> {
    let index = match tag {
        b"cmap" => 0,
        b"head" => 1,
        b"hhea" => 2,
        b"hmtx" => 3,
        b"maxp" => 4,
        b"name" => 5,
        b"OS/2" => 6,
        b"post" => 7,
        b"glyf" => 10,
        b"loca" => 11,
        _ => return None,
    };
    Some(index)
}

fn write_base128(mut value: u32, out: &mut Vec<u8>) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    out.extend_from_slice(&bytes);
}

fn write_255_u16(value: u16, out: &mut Vec<u8>) {
    if value < 253 {
        out.push(value as u8);
    } else {
        out.push(253);
        out.extend_from_slice(&value.to_be_bytes());
    }
}
