// src/embed/png.rs
use anyhow::{ensure, Result};

use super::{ORIGIN_MARKER, PNG_MAGIC};

const COMMENT_KEYWORD: &[u8] = b"Comment";
const SOURCE_KEYWORD: &[u8] = b"Source";

/// Inserts `iTXt Comment` and `tEXt Source` right after IHDR, dropping older copies.
pub(super) fn embed_comment(png: &[u8], comment: &str) -> Result<Vec<u8>> {
    ensure!(png.starts_with(&PNG_MAGIC), "not a PNG stream");

    let mut chunks: Vec<(&[u8], &[u8])> = Vec::new(); // (type, full chunk bytes)
    let mut pos = PNG_MAGIC.len();
    let mut trailer: &[u8] = &[];
    while pos < png.len() {
        ensure!(pos + 12 <= png.len(), "truncated PNG chunk at byte {pos}");
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let end = pos + 12 + len;
        ensure!(end <= png.len(), "truncated PNG chunk at byte {pos}");
        let ctype = &png[pos + 4..pos + 8];
        chunks.push((ctype, &png[pos..end]));
        pos = end;
        if ctype == b"IEND" {
            trailer = &png[pos..];
            break;
        }
    }
    ensure!(
        chunks.first().is_some_and(|(t, _)| *t == b"IHDR"),
        "PNG does not start with IHDR"
    );

    let mut itxt = Vec::with_capacity(COMMENT_KEYWORD.len() + 5 + comment.len());
    itxt.extend_from_slice(COMMENT_KEYWORD);
    // NUL, compression flag, method, empty language tag, empty translated keyword
    itxt.extend_from_slice(&[0, 0, 0, 0, 0]);
    itxt.extend_from_slice(comment.as_bytes());

    let mut text = SOURCE_KEYWORD.to_vec();
    text.push(0);
    text.extend_from_slice(ORIGIN_MARKER.as_bytes());

    let mut out = Vec::with_capacity(png.len() + itxt.len() + text.len() + 24);
    out.extend_from_slice(&PNG_MAGIC);
    for (i, (ctype, raw)) in chunks.iter().enumerate() {
        if is_replaced_text_chunk(ctype, &raw[8..raw.len() - 4]) {
            continue;
        }
        out.extend_from_slice(raw);
        if i == 0 {
            write_chunk(&mut out, b"iTXt", &itxt);
            write_chunk(&mut out, b"tEXt", &text);
        }
    }
    out.extend_from_slice(trailer);
    Ok(out)
}

fn is_replaced_text_chunk(ctype: &[u8], data: &[u8]) -> bool {
    if !matches!(ctype, b"tEXt" | b"iTXt" | b"zTXt") {
        return false;
    }
    let keyword = data.split(|b| *b == 0).next().unwrap_or_default();
    keyword == COMMENT_KEYWORD || keyword == SOURCE_KEYWORD
}

fn write_chunk(out: &mut Vec<u8>, ctype: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(ctype);
    out.extend_from_slice(data);
    let crc = crc32(ctype.iter().chain(data.iter()).copied());
    out.extend_from_slice(&crc.to_be_bytes());
}

/// CRC-32/ISO-HDLC as required by the PNG chunk trailer.
fn crc32(bytes: impl Iterator<Item = u8>) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for b in bytes {
        crc ^= b as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}
