//! Big-endian byte reading and sfnt reassembly shared by the WOFF decoders.

use std::io::Read;
use font_core::{FontError, FontResult};

/// Upper bound on the decompressed size of one WOFF/WOFF2 font
pub(crate) const MAX_DECOMPRESSED_LEN: usize = 64 << 20;

/// Cursor over a big-endian byte buffer
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], offset: usize) -> FontResult<Self> {
        if offset > data.len() {
            return Err(truncated("offset", offset));
        }
        Ok(Self { data, pos: offset })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn bytes(&mut self, len: usize) -> FontResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or_else(|| truncated("length", len))?;
        let slice = self.data.get(self.pos..end).ok_or_else(|| truncated("bytes", end))?;
        self.pos = end;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> FontResult<()> {
        self.bytes(len).map(|_| ())
    }

    pub fn u8(&mut self) -> FontResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> FontResult<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn i16(&mut self) -> FontResult<i16> {
        self.u16().map(|v| v as i16)
    }

    pub fn u32(&mut self) -> FontResult<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// WOFF2 `UIntBase128`: up to 5 bytes, no leading zero byte, must fit in u32.
    pub fn base128(&mut self) -> FontResult<u32> {
        let mut value: u32 = 0;
        for i in 0..5 {
            let byte = self.u8()?;
            if i == 0 && byte == 0x80 {
                return Err(FontError::Parse("UIntBase128 with leading zero".to_string()));
            }
            if value & 0xFE00_0000 != 0 {
                return Err(FontError::Parse("UIntBase128 overflow".to_string()));
            }
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(FontError::Parse("UIntBase128 longer than 5 bytes".to_string()))
    }

    /// WOFF2 `255UInt16` variable-length encoding.
    pub fn u16_255(&mut self) -> FontResult<u16> {
        const WORD_CODE: u8 = 253;
        const ONE_MORE_BYTE_CODE_2: u8 = 254;
        const ONE_MORE_BYTE_CODE_1: u8 = 255;
        const LOWEST_U_CODE: u16 = 253;

        let code = self.u8()?;
        match code {
            WORD_CODE => self.u16(),
            ONE_MORE_BYTE_CODE_1 => Ok(u16::from(self.u8()?) + LOWEST_U_CODE),
            ONE_MORE_BYTE_CODE_2 => Ok(u16::from(self.u8()?) + LOWEST_U_CODE * 2),
            _ => Ok(u16::from(code)),
        }
    }
}

fn truncated(what: &str, at: usize) -> FontError {
    FontError::Parse(format!("truncated font data ({} at {})", what, at))
}

/// Drains a decompressor that must yield exactly `expected` bytes.
///
/// Never reads past `expected + 1`, so a stream longer than its header
/// claims fails without being inflated in full.
pub(crate) fn read_exact_len<R: Read>(stream: R, expected: usize, codec: &str) -> FontResult<Vec<u8>> {
    if expected > MAX_DECOMPRESSED_LEN {
        return Err(FontError::Decompression(format!(
            "{} stream declares {} bytes, limit is {}",
            codec, expected, MAX_DECOMPRESSED_LEN
        )));
    }

    let mut out = Vec::new();
    stream
        .take(expected as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| FontError::Decompression(format!("{}: {}", codec, e)))?;

    if out.len() != expected {
        let got = if out.len() > expected { "more than".to_string() } else { out.len().to_string() };
        return Err(FontError::Decompression(format!(
            "{} stream inflated to {} bytes, expected {}",
            codec, got, expected
        )));
    }
    Ok(out)
}

/// Table checksum as defined by the OpenType spec
pub(crate) fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// Writes a plain sfnt from a flavor and a set of tables.
///
/// Table records are emitted sorted by tag since readers binary-search them.
pub(crate) fn assemble(flavor: u32, mut tables: Vec<([u8; 4], Vec<u8>)>) -> Vec<u8> {
    tables.sort_by(|a, b| a.0.cmp(&b.0));

    let num_tables = tables.len() as u16;
    let mut entry_selector: u16 = 0;
    while num_tables > 0 && (1u16 << (entry_selector + 1)) <= num_tables {
        entry_selector += 1;
    }
    let search_range: u16 = if num_tables == 0 { 0 } else { (1u16 << entry_selector) * 16 };
    let range_shift = (num_tables * 16).saturating_sub(search_range);

    let header_len = 12 + 16 * tables.len();
    let body_len: usize = tables.iter().map(|(_, data)| padded_len(data.len())).sum();
    let mut out = Vec::with_capacity(header_len + body_len);

    out.extend_from_slice(&flavor.to_be_bytes());
    out.extend_from_slice(&num_tables.to_be_bytes());
    out.extend_from_slice(&search_range.to_be_bytes());
    out.extend_from_slice(&entry_selector.to_be_bytes());
    out.extend_from_slice(&range_shift.to_be_bytes());

    let mut offset = header_len;
    for (tag, data) in &tables {
        out.extend_from_slice(tag);
        out.extend_from_slice(&table_checksum(data).to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += padded_len(data.len());
    }

    for (_, data) in &tables {
        out.extend_from_slice(data);
        out.resize(out.len() + padded_len(data.len()) - data.len(), 0);
    }

    out
}

pub(crate) fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base128() {
        assert_eq!(Reader::new(&[0x3F]).base128().unwrap(), 63);
        assert_eq!(Reader::new(&[0x81, 0x00]).base128().unwrap(), 128);
        assert_eq!(Reader::new(&[0x8F, 0xFF, 0xFF, 0xFF, 0x7F]).base128().unwrap(), u32::MAX);
        assert!(Reader::new(&[0x80, 0x01]).base128().is_err());
        assert!(Reader::new(&[0x90, 0x80, 0x80, 0x80, 0x00]).base128().is_err());
        assert!(Reader::new(&[0x81, 0x81, 0x81, 0x81, 0x81]).base128().is_err());
    }

    #[test]
    fn test_255_uint16() {
        assert_eq!(Reader::new(&[100]).u16_255().unwrap(), 100);
        assert_eq!(Reader::new(&[252]).u16_255().unwrap(), 252);
        assert_eq!(Reader::new(&[255, 0]).u16_255().unwrap(), 253);
        assert_eq!(Reader::new(&[255, 252]).u16_255().unwrap(), 505);
        assert_eq!(Reader::new(&[254, 0]).u16_255().unwrap(), 506);
        assert_eq!(Reader::new(&[253, 0x03, 0xE8]).u16_255().unwrap(), 1000);
    }

    #[test]
    fn test_read_exact_len_stops_after_limit() {
        let long = std::io::repeat(0);
        let err = read_exact_len(long, 16, "zlib").unwrap_err();
        assert!(matches!(err, FontError::Decompression(_)));
        assert!(err.to_string().contains("more than"));

        assert!(read_exact_len(&[1u8, 2, 3][..], 4, "zlib").is_err());
        assert_eq!(read_exact_len(&[1u8, 2, 3][..], 3, "zlib").unwrap(), vec![1, 2, 3]);
        assert!(read_exact_len(&[0u8; 0][..], MAX_DECOMPRESSED_LEN + 1, "brotli").is_err());
    }

    #[test]
    fn test_assemble_sorts_and_pads() {
        let sfnt = assemble(
            0x0001_0000,
            vec![(*b"post", vec![1, 2, 3]), (*b"OS/2", vec![4; 5]), (*b"head", vec![9; 4])],
        );
        let mut r = Reader::new(&sfnt);
        assert_eq!(r.u32().unwrap(), 0x0001_0000);
        assert_eq!(r.u16().unwrap(), 3);
        assert_eq!(r.u16().unwrap(), 32);
        assert_eq!(r.u16().unwrap(), 1);
        assert_eq!(r.u16().unwrap(), 16);
        let tags: Vec<[u8; 4]> = (0..3)
            .map(|_| {
                let tag: [u8; 4] = r.bytes(4).unwrap().try_into().unwrap();
                r.skip(12).unwrap();
                tag
            })
            .collect();
        assert_eq!(tags, vec![*b"OS/2", *b"head", *b"post"]);
        assert_eq!(sfnt.len() % 4, 0);
    }
}
