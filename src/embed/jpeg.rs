// src/embed/jpeg.rs
//! Exif APP1 writer: IFD0 { Make } -> Exif IFD { UserComment }.

use anyhow::{bail, ensure, Result};

use super::ORIGIN_MARKER;

const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;
const MARKER_SOS: u8 = 0xDA;
const MARKER_EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const ASCII_CODE: &[u8] = b"ASCII\0\0\0";

const TAG_MAKE: u16 = 0x010F;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286;
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_UNDEFINED: u16 = 7;

/// Largest APP1 payload (segment length counts its own two bytes).
const MAX_APP1_PAYLOAD: usize = u16::MAX as usize - 2;

/// Replaces any Exif block with one carrying `comment` and the origin marker.
pub(super) fn embed_user_comment(jpeg: &[u8], comment: &str) -> Result<Vec<u8>> {
    ensure!(jpeg.starts_with(&[0xFF, 0xD8]), "not a JPEG stream (missing SOI)");

    let mut kept: Vec<&[u8]> = Vec::new();
    let mut pos = 2;
    let mut tail: &[u8] = &[];
    while pos < jpeg.len() {
        if jpeg[pos] != 0xFF || pos + 1 >= jpeg.len() {
            bail!("malformed JPEG: expected marker at byte {pos}");
        }
        let marker = jpeg[pos + 1];
        if marker == 0xFF {
            // fill byte
            pos += 1;
            continue;
        }
        if marker == MARKER_SOS || marker == MARKER_EOI {
            tail = &jpeg[pos..];
            break;
        }
        if (0xD0..=0xD7).contains(&marker) || marker == 0x01 {
            kept.push(&jpeg[pos..pos + 2]);
            pos += 2;
            continue;
        }

        ensure!(pos + 4 <= jpeg.len(), "malformed JPEG: truncated segment header");
        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        ensure!(len >= 2 && pos + 2 + len <= jpeg.len(), "malformed JPEG: bad segment length");
        let seg = &jpeg[pos..pos + 2 + len];
        let is_exif = marker == MARKER_APP1 && seg[4..].starts_with(EXIF_HEADER);
        if !is_exif {
            kept.push(seg);
        }
        pos += 2 + len;
    }

    let app1 = exif_segment(comment);
    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);

    // JFIF wants APP0 right after SOI.
    let lead = kept
        .iter()
        .take_while(|s| s.len() > 1 && s[1] == MARKER_APP0)
        .count();
    for s in &kept[..lead] {
        out.extend_from_slice(s);
    }
    out.extend_from_slice(&app1);
    for s in &kept[lead..] {
        out.extend_from_slice(s);
    }
    out.extend_from_slice(tail);
    Ok(out)
}

fn exif_segment(comment: &str) -> Vec<u8> {
    let make: Vec<u8> = ORIGIN_MARKER.bytes().chain(std::iter::once(0)).collect();

    // Layout (offsets from the TIFF header):
    // 8: IFD0 (2 entries) | make string | pad | Exif IFD (1 entry) | user comment
    let ifd0_at = 8u32;
    let make_at = ifd0_at + 2 + 2 * 12 + 4;
    let exif_ifd_at = (make_at + make.len() as u32 + 1) & !1;
    let comment_at = exif_ifd_at + 2 + 12 + 4;

    let budget =
        MAX_APP1_PAYLOAD - EXIF_HEADER.len() - comment_at as usize - ASCII_CODE.len();
    let text = truncate_at_char_boundary(comment, budget);
    let mut user_comment = ASCII_CODE.to_vec();
    user_comment.extend_from_slice(text.as_bytes());

    let mut tiff = Vec::with_capacity(comment_at as usize + user_comment.len());
    tiff.extend_from_slice(b"MM");
    tiff.extend_from_slice(&42u16.to_be_bytes());
    tiff.extend_from_slice(&ifd0_at.to_be_bytes());

    tiff.extend_from_slice(&2u16.to_be_bytes());
    ifd_entry(&mut tiff, TAG_MAKE, TYPE_ASCII, make.len() as u32, make_at);
    ifd_entry(&mut tiff, TAG_EXIF_IFD, TYPE_LONG, 1, exif_ifd_at);
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&make);
    tiff.resize(exif_ifd_at as usize, 0);

    tiff.extend_from_slice(&1u16.to_be_bytes());
    ifd_entry(
        &mut tiff,
        TAG_USER_COMMENT,
        TYPE_UNDEFINED,
        user_comment.len() as u32,
        comment_at,
    );
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&user_comment);

    let payload_len = EXIF_HEADER.len() + tiff.len();
    let mut seg = Vec::with_capacity(4 + payload_len);
    seg.extend_from_slice(&[0xFF, MARKER_APP1]);
    seg.extend_from_slice(&((payload_len + 2) as u16).to_be_bytes());
    seg.extend_from_slice(EXIF_HEADER);
    seg.extend_from_slice(&tiff);
    seg
}

fn ifd_entry(buf: &mut Vec<u8>, tag: u16, typ: u16, count: u32, value: u32) {
    buf.extend_from_slice(&tag.to_be_bytes());
    buf.extend_from_slice(&typ.to_be_bytes());
    buf.extend_from_slice(&count.to_be_bytes());
    buf.extend_from_slice(&value.to_be_bytes());
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
