//! WOFF 1.0 container: per-table zlib streams around a plain sfnt.

use flate2::read::ZlibDecoder;
use font_core::{FontError, FontResult};
use crate::sfnt::{self, Reader, MAX_DECOMPRESSED_LEN};

const HEADER_LEN: usize = 44;
const DIRECTORY_ENTRY_LEN: usize = 20;

pub(crate) fn decode(data: &[u8]) -> FontResult<Vec<u8>> {
    let mut header = Reader::new(data);
    header.skip(4)?; // signature
    let flavor = header.u32()?;
    let length = header.u32()? as usize;
    let num_tables = header.u16()? as usize;

    if length > data.len() {
        return Err(FontError::Parse(format!(
            "WOFF header declares {} bytes, buffer has {}",
            length,
            data.len()
        )));
    }

    let mut directory = Reader::at(data, HEADER_LEN)?;
    let mut tables = Vec::with_capacity(num_tables);
    let mut inflated_total = 0usize;

    for _ in 0..num_tables {
        let entry = directory.bytes(DIRECTORY_ENTRY_LEN)?;
        let mut entry = Reader::new(entry);
        let tag: [u8; 4] = entry
            .bytes(4)?
            .try_into()
            .map_err(|_| FontError::Parse("bad table tag".to_string()))?;
        let offset = entry.u32()? as usize;
        let comp_length = entry.u32()? as usize;
        let orig_length = entry.u32()? as usize;

        inflated_total = inflated_total.saturating_add(orig_length);
        if inflated_total > MAX_DECOMPRESSED_LEN {
            return Err(FontError::Decompression(format!(
                "WOFF tables declare more than {} bytes",
                MAX_DECOMPRESSED_LEN
            )));
        }

        let stored = Reader::at(data, offset)?.bytes(comp_length)?;
        let table = if comp_length < orig_length {
            sfnt::read_exact_len(ZlibDecoder::new(stored), orig_length, "zlib")?
        } else if comp_length == orig_length {
            stored.to_vec()
        } else {
            return Err(FontError::Parse(format!(
                "table {} compressed length exceeds original length",
                String::from_utf8_lossy(&tag)
            )));
        };

        tables.push((tag, table));
    }

    Ok(sfnt::assemble(flavor, tables))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use super::*;

    /// Single-table WOFF whose `post` entry declares `orig_length`
    fn single_table_woff(stored: &[u8], orig_length: u32) -> Vec<u8> {
        let offset = 44 + 20;
        let mut out = Vec::new();
        out.extend_from_slice(b"wOFF");
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&((offset + stored.len()) as u32).to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&orig_length.to_be_bytes()); // totalSfntSize
        out.extend_from_slice(&[0u8; 24]);
        out.extend_from_slice(b"post");
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(stored.len() as u32).to_be_bytes());
        out.extend_from_slice(&orig_length.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(stored);
        out
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_table_inflating_past_its_length_is_rejected() {
        // ~4 KB of zlib expanding to 4 MB behind a 8 KB declaration
        let stored = zlib(&vec![0u8; 4 << 20]);
        assert!(stored.len() < 8192);
        let err = decode(&single_table_woff(&stored, 8192)).unwrap_err();
        assert!(matches!(err, FontError::Decompression(_)));
    }

    #[test]
    fn test_declared_length_above_ceiling_is_rejected() {
        let stored = zlib(&[0u8; 32]);
        let err = decode(&single_table_woff(&stored, u32::MAX)).unwrap_err();
        assert!(matches!(err, FontError::Decompression(_)));
    }

    #[test]
    fn test_exact_table_inflates() {
        let table = vec![7u8; 300];
        let woff = decode(&single_table_woff(&zlib(&table), 300)).unwrap();
        // 12-byte header, one 16-byte record, then the table
        assert_eq!(&woff[28..], table.as_slice());
    }
}
