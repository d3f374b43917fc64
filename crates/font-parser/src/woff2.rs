//! WOFF 2.0 container: one Brotli stream holding all tables, with the
//! `glyf`/`loca` and `hmtx` transforms undone on the way out.

use font_core::{FontError, FontResult};
use crate::sfnt::{self, Reader, MAX_DECOMPRESSED_LEN};

const HEADER_LEN: usize = 48;
const COLLECTION_FLAVOR: u32 = 0x7474_6366; // 'ttcf'

/// Tags addressable by the 6-bit index in a directory entry's flags byte.
const KNOWN_TAGS: [&[u8; 4]; 63] = [
    b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post",
    b"cvt ", b"fpgm", b"glyf", b"loca", b"prep", b"CFF ", b"VORG", b"EBDT",
    b"EBLC", b"gasp", b"hdmx", b"kern", b"LTSH", b"PCLT", b"VDMX", b"vhea",
    b"vmtx", b"BASE", b"GDEF", b"GPOS", b"GSUB", b"EBSC", b"JSTF", b"MATH",
    b"CBDT", b"CBLC", b"COLR", b"CPAL", b"SVG ", b"sbix", b"acnt", b"avar",
    b"bdat", b"bloc", b"bsln", b"cvar", b"fdsc", b"feat", b"fmtx", b"fvar",
    b"gvar", b"hsty", b"just", b"lcar", b"mort", b"morx", b"opbd", b"prop",
    b"trak", b"Zapf", b"Silf", b"Glat", b"Gloc", b"Feat", b"Sill",
];

#[derive(Debug, Clone)]
struct TableEntry {
    tag: [u8; 4],
    transform_version: u8,
    orig_length: u32,
    /// Length inside the decompressed stream
    stored_length: u32,
}

impl TableEntry {
    fn is_transformed(&self) -> bool {
        match &self.tag {
            b"glyf" | b"loca" => self.transform_version == 0,
            _ => self.transform_version != 0,
        }
    }
}

pub(crate) fn decode(data: &[u8]) -> FontResult<Vec<u8>> {
    let mut header = Reader::new(data);
    header.skip(4)?; // signature
    let flavor = header.u32()?;
    let length = header.u32()? as usize;
    let num_tables = header.u16()?;
    header.skip(2)?; // reserved
    header.skip(4)?; // totalSfntSize
    let total_compressed_size = header.u32()? as usize;

    if length > data.len() {
        return Err(FontError::Parse(format!(
            "WOFF2 header declares {} bytes, buffer has {}",
            length,
            data.len()
        )));
    }
    if flavor == COLLECTION_FLAVOR {
        return Err(FontError::UnsupportedFormat);
    }

    let mut directory = Reader::at(data, HEADER_LEN)?;
    let entries = (0..num_tables)
        .map(|_| read_entry(&mut directory))
        .collect::<FontResult<Vec<_>>>()?;

    let stream_len = entries
        .iter()
        .try_fold(0usize, |sum, entry| sum.checked_add(entry.stored_length as usize))
        .filter(|&len| len <= MAX_DECOMPRESSED_LEN)
        .ok_or_else(|| {
            FontError::Decompression(format!(
                "WOFF2 tables declare more than {} bytes",
                MAX_DECOMPRESSED_LEN
            ))
        })?;

    let compressed = directory.bytes(total_compressed_size)?;
    let stream = decompress(compressed, stream_len)?;

    let mut offset = 0usize;
    let mut raw: Vec<(&TableEntry, &[u8])> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let end = offset + entry.stored_length as usize;
        let table = stream.get(offset..end).ok_or_else(|| {
            FontError::Parse(format!(
                "table {} runs past the decompressed stream",
                String::from_utf8_lossy(&entry.tag)
            ))
        })?;
        raw.push((entry, table));
        offset = end;
    }

    let find = |tag: &[u8; 4]| raw.iter().find(|(entry, _)| &entry.tag == tag).copied();

    let mut tables: Vec<([u8; 4], Vec<u8>)> = Vec::with_capacity(raw.len());
    let mut x_mins: Option<Vec<i16>> = None;

    if let Some((glyf, glyf_data)) = find(b"glyf") {
        if glyf.is_transformed() {
            let loca = find(b"loca").ok_or_else(|| {
                FontError::Parse("transformed glyf without loca".to_string())
            })?;
            let rebuilt = reconstruct_glyf(glyf_data)?;
            if rebuilt.loca.len() != loca.0.orig_length as usize {
                tracing::debug!(
                    rebuilt = rebuilt.loca.len(),
                    declared = loca.0.orig_length,
                    "reconstructed loca length differs from directory"
                );
            }
            tables.push((*b"glyf", rebuilt.glyf));
            tables.push((*b"loca", rebuilt.loca));
            x_mins = Some(rebuilt.x_mins);
        }
    }

    for (entry, table) in &raw {
        match &entry.tag {
            b"glyf" | b"loca" if x_mins.is_some() => continue,
            b"hmtx" if entry.is_transformed() => {
                let x_mins = x_mins.as_deref().ok_or_else(|| {
                    FontError::Parse("transformed hmtx requires transformed glyf".to_string())
                })?;
                let num_glyphs = read_u16_at(find(b"maxp"), 4, "maxp")?;
                let num_hmetrics = read_u16_at(find(b"hhea"), 34, "hhea")?;
                let hmtx = reconstruct_hmtx(table, num_glyphs, num_hmetrics, x_mins)?;
                tables.push((entry.tag, hmtx));
            }
            _ if entry.is_transformed() => {
                return Err(FontError::Parse(format!(
                    "unsupported transform {} on table {}",
                    entry.transform_version,
                    String::from_utf8_lossy(&entry.tag)
                )));
            }
            _ => tables.push((entry.tag, table.to_vec())),
        }
    }

    Ok(sfnt::assemble(flavor, tables))
}

fn read_entry(directory: &mut Reader<'_>) -> FontResult<TableEntry> {
    let flags = directory.u8()?;
    let tag_index = (flags & 0x3F) as usize;
    let tag = if tag_index == 0x3F {
        directory.u32()?.to_be_bytes()
    } else {
        *KNOWN_TAGS[tag_index]
    };

    let mut entry = TableEntry {
        tag,
        transform_version: (flags >> 6) & 0x03,
        orig_length: directory.base128()?,
        stored_length: 0,
    };
    entry.stored_length = if entry.is_transformed() {
        directory.base128()?
    } else {
        entry.orig_length
    };
    Ok(entry)
}

/// Inflates the shared table stream, which must hold exactly the bytes the
/// directory accounts for.
fn decompress(compressed: &[u8], stream_len: usize) -> FontResult<Vec<u8>> {
    sfnt::read_exact_len(brotli::Decompressor::new(compressed, 4096), stream_len, "brotli")
}

fn read_u16_at(table: Option<(&TableEntry, &[u8])>, offset: usize, name: &str) -> FontResult<u16> {
    let (_, data) = table.ok_or_else(|| FontError::Parse(format!("missing {} table", name)))?;
    Reader::at(data, offset)?.u16()
}

struct RebuiltGlyf {
    glyf: Vec<u8>,
    loca: Vec<u8>,
    x_mins: Vec<i16>,
}

/// The seven sub-streams of a transformed `glyf` table
struct GlyfStreams<'a> {
    n_contours: Reader<'a>,
    n_points: Reader<'a>,
    flags: Reader<'a>,
    glyphs: Reader<'a>,
    composites: Reader<'a>,
    bbox_bitmap: &'a [u8],
    bboxes: Reader<'a>,
    instructions: Reader<'a>,
}

impl<'a> GlyfStreams<'a> {
    fn has_explicit_bbox(&self, glyph: usize) -> bool {
        self.bbox_bitmap
            .get(glyph >> 3)
            .map_or(false, |byte| byte & (0x80 >> (glyph & 7)) != 0)
    }

    fn read_bbox(&mut self) -> FontResult<[i16; 4]> {
        Ok([self.bboxes.i16()?, self.bboxes.i16()?, self.bboxes.i16()?, self.bboxes.i16()?])
    }
}

fn reconstruct_glyf(data: &[u8]) -> FontResult<RebuiltGlyf> {
    let mut header = Reader::new(data);
    header.skip(2)?; // reserved
    header.skip(2)?; // optionFlags
    let num_glyphs = header.u16()? as usize;
    let index_format = header.u16()?;

    let mut sizes = [0usize; 7];
    for size in sizes.iter_mut() {
        *size = header.u32()? as usize;
    }
    let [n_contour_size, n_points_size, flag_size, glyph_size, composite_size, bbox_size, instruction_size] =
        sizes;

    let bitmap_len = 4 * ((num_glyphs + 31) / 32);
    if bbox_size < bitmap_len {
        return Err(FontError::Parse("bbox stream shorter than its bitmap".to_string()));
    }
    let n_contours = Reader::new(header.bytes(n_contour_size)?);
    let n_points = Reader::new(header.bytes(n_points_size)?);
    let flags = Reader::new(header.bytes(flag_size)?);
    let glyphs = Reader::new(header.bytes(glyph_size)?);
    let composites = Reader::new(header.bytes(composite_size)?);
    let bbox_all = header.bytes(bbox_size)?;
    let instructions = Reader::new(header.bytes(instruction_size)?);

    let mut streams = GlyfStreams {
        n_contours,
        n_points,
        flags,
        glyphs,
        composites,
        bbox_bitmap: &bbox_all[..bitmap_len],
        bboxes: Reader::new(&bbox_all[bitmap_len..]),
        instructions,
    };

    let mut glyf = Vec::new();
    let mut offsets = Vec::with_capacity(num_glyphs + 1);
    let mut x_mins = Vec::with_capacity(num_glyphs);

    for glyph in 0..num_glyphs {
        offsets.push(glyf.len());
        let n_contours = streams.n_contours.i16()?;
        let x_min = match n_contours {
            0 => 0,
            n if n > 0 => write_simple_glyph(&mut streams, glyph, n as usize, &mut glyf)?,
            -1 => write_composite_glyph(&mut streams, glyph, &mut glyf)?,
            n => {
                return Err(FontError::Parse(format!("glyph {} has {} contours", glyph, n)));
            }
        };
        glyf.resize(sfnt::padded_len(glyf.len()), 0);
        x_mins.push(x_min);
    }
    offsets.push(glyf.len());

    let loca = encode_loca(&offsets, index_format)?;
    Ok(RebuiltGlyf { glyf, loca, x_mins })
}

/// Decodes one triplet-encoded point delta; returns (dx, dy, on_curve).
pub(crate) fn decode_triplet(flag: u8, glyphs: &mut Reader<'_>) -> FontResult<(i32, i32, bool)> {
    fn with_sign(flag: u8, value: i32) -> i32 {
        if flag & 1 != 0 { value } else { -value }
    }

    let on_curve = flag & 0x80 == 0;
    let flag = flag & 0x7F;

    let (dx, dy) = if flag < 10 {
        let b0 = i32::from(glyphs.u8()?);
        (0, with_sign(flag, (i32::from(flag & 14) << 7) + b0))
    } else if flag < 20 {
        let b0 = i32::from(glyphs.u8()?);
        (with_sign(flag, (i32::from((flag - 10) & 14) << 7) + b0), 0)
    } else if flag < 84 {
        let b0 = i32::from(flag - 20);
        let b1 = i32::from(glyphs.u8()?);
        (
            with_sign(flag, 1 + (b0 & 0x30) + (b1 >> 4)),
            with_sign(flag >> 1, 1 + ((b0 & 0x0C) << 2) + (b1 & 0x0F)),
        )
    } else if flag < 120 {
        let b0 = i32::from(flag - 84);
        let b1 = i32::from(glyphs.u8()?);
        let b2 = i32::from(glyphs.u8()?);
        (
            with_sign(flag, 1 + ((b0 / 12) << 8) + b1),
            with_sign(flag >> 1, 1 + (((b0 % 12) >> 2) << 8) + b2),
        )
    } else if flag < 124 {
        let b1 = i32::from(glyphs.u8()?);
        let b2 = i32::from(glyphs.u8()?);
        let b3 = i32::from(glyphs.u8()?);
        (
            with_sign(flag, (b1 << 4) + (b2 >> 4)),
            with_sign(flag >> 1, ((b2 & 0x0F) << 8) + b3),
        )
    } else {
        let b1 = i32::from(glyphs.u8()?);
        let b2 = i32::from(glyphs.u8()?);
        let b3 = i32::from(glyphs.u8()?);
        let b4 = i32::from(glyphs.u8()?);
        (
            with_sign(flag, (b1 << 8) + b2),
            with_sign(flag >> 1, (b3 << 8) + b4),
        )
    };
    Ok((dx, dy, on_curve))
}

fn write_simple_glyph(
    streams: &mut GlyfStreams<'_>,
    glyph: usize,
    n_contours: usize,
    out: &mut Vec<u8>,
) -> FontResult<i16> {
    let mut end_points = Vec::with_capacity(n_contours);
    let mut total: usize = 0;
    for _ in 0..n_contours {
        total += streams.n_points.u16_255()? as usize;
        if total == 0 || total > usize::from(u16::MAX) {
            return Err(FontError::Parse(format!("glyph {} has an invalid point count", glyph)));
        }
        end_points.push((total - 1) as u16);
    }

    let mut points = Vec::with_capacity(total);
    let (mut x, mut y) = (0i16, 0i16);
    for _ in 0..total {
        let flag = streams.flags.u8()?;
        let (dx, dy, on_curve) = decode_triplet(flag, &mut streams.glyphs)?;
        x = coordinate(glyph, x, dx)?;
        y = coordinate(glyph, y, dy)?;
        points.push((x, y, on_curve));
    }

    let instruction_len = streams.glyphs.u16_255()? as usize;
    let instructions = streams.instructions.bytes(instruction_len)?;

    let bbox = if streams.has_explicit_bbox(glyph) {
        streams.read_bbox()?
    } else {
        computed_bbox(&points)
    };

    encode_simple_glyph(&end_points, &points, instructions, bbox, out);
    Ok(bbox[0])
}

/// Applies a decoded delta, rejecting points outside the int16 design space.
fn coordinate(glyph: usize, from: i16, delta: i32) -> FontResult<i16> {
    i16::try_from(i32::from(from) + delta).map_err(|_| {
        FontError::Parse(format!("glyph {} has a coordinate outside the int16 range", glyph))
    })
}

/// Writes a TrueType simple glyph from absolute point coordinates.
/// Flags are written without repeat compression.
pub(crate) fn encode_simple_glyph(
    end_points: &[u16],
    points: &[(i16, i16, bool)],
    instructions: &[u8],
    bbox: [i16; 4],
    out: &mut Vec<u8>,
) {
    out.extend_from_slice(&(end_points.len() as i16).to_be_bytes());
    for value in bbox {
        out.extend_from_slice(&value.to_be_bytes());
    }
    for end in end_points {
        out.extend_from_slice(&end.to_be_bytes());
    }
    out.extend_from_slice(&(instructions.len() as u16).to_be_bytes());
    out.extend_from_slice(instructions);

    let mut flags = Vec::with_capacity(points.len());
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let (mut last_x, mut last_y) = (0i16, 0i16);
    for &(px, py, on_curve) in points {
        let mut flag = if on_curve { 0x01 } else { 0x00 };
        flag |= encode_delta(px.wrapping_sub(last_x), 0x02, 0x10, &mut xs);
        flag |= encode_delta(py.wrapping_sub(last_y), 0x04, 0x20, &mut ys);
        flags.push(flag);
        last_x = px;
        last_y = py;
    }
    out.extend_from_slice(&flags);
    out.extend_from_slice(&xs);
    out.extend_from_slice(&ys);
}

/// Appends a TrueType coordinate delta and returns the flag bits describing it.
///
/// Deltas are int16 and readers accumulate them modulo 2^16, so the wrapped
/// difference of two int16 coordinates reproduces the second one exactly.
fn encode_delta(delta: i16, short_bit: u8, same_or_positive_bit: u8, out: &mut Vec<u8>) -> u8 {
    match u8::try_from(delta.unsigned_abs()) {
        _ if delta == 0 => same_or_positive_bit,
        Ok(magnitude) => {
            out.push(magnitude);
            short_bit | if delta > 0 { same_or_positive_bit } else { 0 }
        }
        Err(_) => {
            out.extend_from_slice(&delta.to_be_bytes());
            0
        }
    }
}

pub(crate) fn computed_bbox(points: &[(i16, i16, bool)]) -> [i16; 4] {
    if points.is_empty() {
        return [0; 4];
    }
    let (mut x_min, mut y_min, mut x_max, mut y_max) = (i16::MAX, i16::MAX, i16::MIN, i16::MIN);
    for &(x, y, _) in points {
        x_min = x_min.min(x);
        y_min = y_min.min(y);
        x_max = x_max.max(x);
        y_max = y_max.max(y);
    }
    [x_min, y_min, x_max, y_max]
}

fn write_composite_glyph(
    streams: &mut GlyfStreams<'_>,
    glyph: usize,
    out: &mut Vec<u8>,
) -> FontResult<i16> {
    const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
    const WE_HAVE_A_SCALE: u16 = 0x0008;
    const MORE_COMPONENTS: u16 = 0x0020;
    const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
    const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
    const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

    if !streams.has_explicit_bbox(glyph) {
        return Err(FontError::Parse(format!("composite glyph {} without bbox", glyph)));
    }
    let bbox = streams.read_bbox()?;

    out.extend_from_slice(&(-1i16).to_be_bytes());
    for value in bbox {
        out.extend_from_slice(&value.to_be_bytes());
    }

    let mut have_instructions = false;
    loop {
        let flags = streams.composites.u16()?;
        let glyph_index = streams.composites.u16()?;
        let mut extra = if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            extra += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            extra += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            extra += 8;
        }
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&glyph_index.to_be_bytes());
        out.extend_from_slice(streams.composites.bytes(extra)?);

        have_instructions |= flags & WE_HAVE_INSTRUCTIONS != 0;
        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }

    if have_instructions {
        let instruction_len = streams.glyphs.u16_255()? as usize;
        out.extend_from_slice(&(instruction_len as u16).to_be_bytes());
        out.extend_from_slice(streams.instructions.bytes(instruction_len)?);
    }

    Ok(bbox[0])
}

fn encode_loca(offsets: &[usize], index_format: u16) -> FontResult<Vec<u8>> {
    let mut loca = Vec::with_capacity(offsets.len() * 4);
    match index_format {
        0 => {
            for &offset in offsets {
                let half = u16::try_from(offset / 2).map_err(|_| {
                    FontError::Parse("glyf too large for short loca".to_string())
                })?;
                loca.extend_from_slice(&half.to_be_bytes());
            }
        }
        1 => {
            for &offset in offsets {
                loca.extend_from_slice(&(offset as u32).to_be_bytes());
            }
        }
        other => {
            return Err(FontError::Parse(format!("invalid loca index format {}", other)));
        }
    }
    Ok(loca)
}

fn reconstruct_hmtx(
    data: &[u8],
    num_glyphs: u16,
    num_hmetrics: u16,
    x_mins: &[i16],
) -> FontResult<Vec<u8>> {
    let mut s = Reader::new(data);
    let flags = s.u8()?;
    let has_proportional_lsbs = flags & 0x01 == 0;
    let has_monospace_lsbs = flags & 0x02 == 0;
    if flags & 0xFC != 0 || (has_proportional_lsbs && has_monospace_lsbs) {
        return Err(FontError::Parse(format!("invalid hmtx transform flags {:#04x}", flags)));
    }

    let num_glyphs = usize::from(num_glyphs);
    let num_hmetrics = usize::from(num_hmetrics);
    if num_hmetrics == 0 || num_hmetrics > num_glyphs || x_mins.len() < num_glyphs {
        return Err(FontError::Parse("hmtx transform metrics out of range".to_string()));
    }

    let advances = (0..num_hmetrics).map(|_| s.u16()).collect::<FontResult<Vec<_>>>()?;

    let mut lsbs = Vec::with_capacity(num_glyphs);
    for glyph in 0..num_hmetrics {
        lsbs.push(if has_proportional_lsbs { s.i16()? } else { x_mins[glyph] });
    }
    for glyph in num_hmetrics..num_glyphs {
        lsbs.push(if has_monospace_lsbs { s.i16()? } else { x_mins[glyph] });
    }

    let mut hmtx = Vec::with_capacity(num_hmetrics * 4 + (num_glyphs - num_hmetrics) * 2);
    for (glyph, lsb) in lsbs.iter().enumerate() {
        if let Some(advance) = advances.get(glyph) {
            hmtx.extend_from_slice(&advance.to_be_bytes());
        }
        hmtx.extend_from_slice(&lsb.to_be_bytes());
    }
    Ok(hmtx)
}
