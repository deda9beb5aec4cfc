//! Codec description extraction and codec strings.
//!
//! Decoders need the codec configuration record from the sample entry
//! (avcC, hvcC, vpcC or av1C) without its box header, and a codec string
//! derived from it. The `mp4` crate keeps only part of these records, so
//! they are sliced straight out of the file:
//! - **avcC**: `avc1.PPCCLL`, profile/compatibility/level in hex.
//! - **hvcC**: `hev1.[A-C]P.F.TL[.C...]`, per ISO/IEC 14496-15 Annex E.
//! - **vpcC**: `vp09.PP.LL.DD` (or `vp08.`), profile/level/bit depth in decimal.
//! - **av1C**: `av01.P.LLT.DD`, per the AV1 ISOBMFF binding.

use std::io::Cursor;
use std::ops::Range;

use bytes::Bytes;
use mp4::{BoxHeader, HEADER_SIZE};
use tracing::debug;

use crate::error::DemuxError;
use crate::DemuxResult;

/// Fixed fields of a visual sample entry, before its child boxes.
const VISUAL_SAMPLE_ENTRY_SIZE: usize = 78;

/// Version, flags and entry count of stsd.
const STSD_PREAMBLE_SIZE: usize = 8;

/// Description boxes, in lookup order.
const DESCRIPTION_BOXES: [&[u8; 4]; 4] = [b"avcC", b"hvcC", b"vpcC", b"av1C"];

/// Codec family of a description record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    /// H.264 (avcC).
    Avc,

    /// H.265 (hvcC).
    Hevc,

    /// VP8 (vpcC in a vp08 entry).
    Vp8,

    /// VP9 (vpcC).
    Vp9,

    /// AV1 (av1C).
    Av1,
}

impl CodecFamily {
    fn of(entry: &[u8; 4], record: &[u8; 4]) -> Self {
        match record {
            b"avcC" => Self::Avc,
            b"hvcC" => Self::Hevc,
            b"vpcC" if entry == b"vp08" => Self::Vp8,
            b"vpcC" => Self::Vp9,
            _ => Self::Av1,
        }
    }
}

/// A codec configuration record, box header removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecDescription {
    /// Which record this is.
    pub family: CodecFamily,

    /// Record bytes.
    pub bytes: Bytes,
}

/// The described sample entry of a video track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntry {
    /// Entry type, such as `avc1` or `hvc1`.
    pub fourcc: String,

    /// Coded width in pixels.
    pub coded_width: u32,

    /// Coded height in pixels.
    pub coded_height: u32,

    /// The entry's configuration record.
    pub description: CodecDescription,
}

struct RawBox {
    kind: [u8; 4],
    payload: Range<usize>,
}

/// Iterates the boxes laid end to end in `data[range]`.
struct Boxes<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

fn boxes(data: &[u8], range: Range<usize>) -> Boxes<'_> {
    Boxes {
        data,
        pos: range.start,
        end: range.end,
    }
}

impl Iterator for Boxes<'_> {
    type Item = DemuxResult<RawBox>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.saturating_sub(self.pos) < HEADER_SIZE as usize {
            return None;
        }

        let mut cursor = Cursor::new(&self.data[self.pos..self.end]);
        let header = match BoxHeader::read(&mut cursor) {
            Ok(header) => header,
            Err(e) => {
                self.pos = self.end;
                return Some(Err(e.into()));
            }
        };

        let start = self.pos + cursor.position() as usize;
        let available = (self.end - start) as u64;
        // Size zero runs to the end of the enclosing range.
        let len = match header.size {
            0 => available,
            size if size >= HEADER_SIZE && size - HEADER_SIZE <= available => size - HEADER_SIZE,
            size => {
                self.pos = self.end;
                return Some(Err(DemuxError::Parse(format!(
                    "box of {size} bytes overruns its parent"
                ))));
            }
        };

        self.pos = start + len as usize;
        Some(Ok(RawBox {
            kind: u32::from(header.name).to_be_bytes(),
            payload: start..self.pos,
        }))
    }
}

fn child(data: &[u8], range: Range<usize>, kind: &[u8; 4]) -> DemuxResult<Option<Range<usize>>> {
    for item in boxes(data, range) {
        let item = item?;
        if &item.kind == kind {
            return Ok(Some(item.payload));
        }
    }
    Ok(None)
}

fn descend(
    data: &[u8],
    mut range: Range<usize>,
    path: &[&[u8; 4]],
) -> DemuxResult<Option<Range<usize>>> {
    for kind in path {
        match child(data, range, kind)? {
            Some(inner) => range = inner,
            None => return Ok(None),
        }
    }
    Ok(Some(range))
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn track_id(data: &[u8], trak: Range<usize>) -> DemuxResult<Option<u32>> {
    let Some(tkhd) = child(data, trak, b"tkhd")? else {
        return Ok(None);
    };

    let body = &data[tkhd];
    // Creation and modification times are 64-bit in version 1.
    let at = if body.first() == Some(&1) { 20 } else { 12 };
    Ok(body
        .get(at..at + 4)
        .map(|id| u32::from_be_bytes([id[0], id[1], id[2], id[3]])))
}

/// Find the first described sample entry of track `track_id` in a whole
/// MP4 file.
pub fn find_sample_entry(file: &Bytes, track_id_wanted: u32) -> DemuxResult<SampleEntry> {
    let data = file.as_ref();
    let moov = child(data, 0..data.len(), b"moov")?
        .ok_or_else(|| DemuxError::Parse("moov box not found".to_string()))?;

    for trak in boxes(data, moov) {
        let trak = trak?;
        if &trak.kind != b"trak" || track_id(data, trak.payload.clone())? != Some(track_id_wanted)
        {
            continue;
        }

        let stsd = descend(data, trak.payload, &[b"mdia", b"minf", b"stbl", b"stsd"])?
            .ok_or_else(|| DemuxError::Parse("stsd box not found".to_string()))?;
        return sample_entry(file, stsd);
    }

    Err(DemuxError::Parse(format!("track {track_id_wanted} not found")))
}

fn sample_entry(file: &Bytes, stsd: Range<usize>) -> DemuxResult<SampleEntry> {
    let data = file.as_ref();
    if stsd.len() < STSD_PREAMBLE_SIZE {
        return Err(DemuxError::Parse("stsd box truncated".to_string()));
    }

    for entry in boxes(data, stsd.start + STSD_PREAMBLE_SIZE..stsd.end) {
        let entry = entry?;
        if entry.payload.len() < VISUAL_SAMPLE_ENTRY_SIZE {
            continue;
        }

        let children = entry.payload.start + VISUAL_SAMPLE_ENTRY_SIZE..entry.payload.end;
        for kind in DESCRIPTION_BOXES {
            let Some(record) = child(data, children.clone(), kind)? else {
                continue;
            };

            let family = CodecFamily::of(&entry.kind, kind);
            let fourcc = String::from_utf8_lossy(&entry.kind).into_owned();
            debug!(%fourcc, ?family, len = record.len(), "Extracted codec description");

            let fields = entry.payload.start;
            return Ok(SampleEntry {
                fourcc,
                coded_width: read_u16(data, fields + 24) as u32,
                coded_height: read_u16(data, fields + 26) as u32,
                description: CodecDescription {
                    family,
                    bytes: file.slice(record),
                },
            });
        }
    }

    Err(DemuxError::MissingDescription)
}

/// Derive the codec string for a sample entry.
pub fn codec_string(entry: &SampleEntry) -> DemuxResult<String> {
    let prefix = entry.fourcc.as_str();
    let record = entry.description.bytes.as_ref();
    match entry.description.family {
        CodecFamily::Avc => avc_codec_string(prefix, record),
        CodecFamily::Hevc => hevc_codec_string(prefix, record),
        CodecFamily::Vp8 | CodecFamily::Vp9 => vpx_codec_string(prefix, record),
        CodecFamily::Av1 => av1_codec_string(prefix, record),
    }
}

fn too_short(record: &str, len: usize) -> DemuxError {
    DemuxError::InvalidDescription(format!("{record} record is {len} bytes"))
}

fn avc_codec_string(prefix: &str, record: &[u8]) -> DemuxResult<String> {
    if record.len() < 4 {
        return Err(too_short("avcC", record.len()));
    }

    Ok(format!(
        "{prefix}.{:02x}{:02x}{:02x}",
        record[1], // AVCProfileIndication
        record[2], // profile_compatibility
        record[3], // AVCLevelIndication
    ))
}

fn hevc_codec_string(prefix: &str, record: &[u8]) -> DemuxResult<String> {
    if record.len() < 13 {
        return Err(too_short("hvcC", record.len()));
    }

    let profile_space = match record[1] >> 6 {
        0 => "",
        1 => "A",
        2 => "B",
        _ => "C",
    };
    let tier = if record[1] & 0x20 != 0 { 'H' } else { 'L' };
    let profile_idc = record[1] & 0x1F;
    let compatibility = u32::from_be_bytes([record[2], record[3], record[4], record[5]]).reverse_bits();
    let level_idc = record[12];

    let mut codec = format!(
        "{prefix}.{profile_space}{profile_idc}.{compatibility:X}.{tier}{level_idc}"
    );

    // Constraint flags, trailing zero bytes omitted.
    let constraints = &record[6..12];
    let used = constraints
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    for byte in &constraints[..used] {
        codec.push_str(&format!(".{byte:X}"));
    }

    Ok(codec)
}

fn vpx_codec_string(prefix: &str, record: &[u8]) -> DemuxResult<String> {
    // Full box: version (1) + flags (3) precede the record fields.
    if record.len() < 7 {
        return Err(too_short("vpcC", record.len()));
    }

    let profile = record[4];
    let level = record[5];
    let bit_depth = record[6] >> 4;

    Ok(format!("{prefix}.{profile:02}.{level:02}.{bit_depth:02}"))
}

fn av1_codec_string(prefix: &str, record: &[u8]) -> DemuxResult<String> {
    if record.len() < 4 {
        return Err(too_short("av1C", record.len()));
    }

    let profile = record[1] >> 5;
    let level = record[1] & 0x1F;
    let tier = if record[2] & 0x80 != 0 { 'H' } else { 'M' };
    let high_bitdepth = record[2] & 0x40 != 0;
    let twelve_bit = record[2] & 0x20 != 0;
    let bit_depth = match (high_bitdepth, twelve_bit) {
        (false, _) => 8,
        (true, false) => 10,
        (true, true) => 12,
    };

    Ok(format!("{prefix}.{profile}.{level:02}{tier}.{bit_depth:02}"))
}
