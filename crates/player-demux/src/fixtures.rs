//! MP4 files built in memory for tests.
//!
//! `Mp4Writer` only writes avc1, hev1 and vp09 entries, and its hvcC is a
//! single byte. Files for the other entries are made by editing its output:
//! renaming the sample entry and swapping the description box. The writer
//! puts moov after mdat, so growing moov leaves chunk offsets valid.

use std::io::Cursor;

use bytes::Bytes;
use mp4::{
    AvcConfig, HevcConfig, MediaConfig, Mp4Config, Mp4Sample, Mp4Writer, TrackConfig, TrackType,
    Vp9Config,
};

pub const SPS: [u8; 8] = [0x67, 0x42, 0xC0, 0x1E, 0xD9, 0x00, 0xA0, 0x47];
pub const PPS: [u8; 4] = [0x68, 0xCE, 0x3C, 0x80];

/// Main profile, main tier, level 3.1, progressive source flag set.
pub const HVCC: [u8; 23] = [
    0x01, // configurationVersion
    0x01, // profile_space 0, tier 0, profile_idc 1
    0x60, 0x00, 0x00, 0x00, // compatibility flags
    0xB0, 0x00, 0x00, 0x00, 0x00, 0x00, // constraint flags
    0x5D, // level_idc 93
    0xF0, 0x00, 0xFC, 0xFD, 0xF8, 0xF8, 0x00, 0x00, 0x0F, // chroma, bit depth, frame rate
    0x00, // numOfArrays
];

/// Main profile, level 3.0 (seq_level_idx 4), main tier, 8-bit 4:2:0.
pub const AV1C: [u8; 4] = [0x81, 0x04, 0x0C, 0x00];

/// Sample payloads avoid printable bytes so fourcc searches stay unambiguous.
fn write_file(media_conf: MediaConfig) -> Vec<u8> {
    let config = Mp4Config {
        major_brand: "isom".parse().unwrap(),
        minor_version: 512,
        compatible_brands: vec!["isom".parse().unwrap(), "avc1".parse().unwrap()],
        timescale: 1000,
    };
    let mut writer = Mp4Writer::write_start(Cursor::new(Vec::new()), &config).unwrap();
    writer
        .add_track(&TrackConfig {
            track_type: TrackType::Video,
            timescale: 1000,
            language: "und".to_string(),
            media_conf,
        })
        .unwrap();

    for i in 0..3u64 {
        writer
            .write_sample(
                1,
                &Mp4Sample {
                    start_time: i * 40,
                    duration: 40,
                    rendering_offset: 0,
                    is_sync: i == 0,
                    bytes: Bytes::from(vec![0x00, 0x00, 0x00, 0x02, 0x05, i as u8]),
                },
            )
            .unwrap();
    }
    writer.write_end().unwrap();
    writer.into_writer().into_inner()
}

/// Three 40ms frames at a 1000Hz timescale, only the first a keyframe.
pub fn avc_file() -> Vec<u8> {
    write_file(MediaConfig::AvcConfig(AvcConfig {
        width: 320,
        height: 240,
        seq_param_set: SPS.to_vec(),
        pic_param_set: PPS.to_vec(),
    }))
}

/// Same frames in a vp09 entry.
pub fn vp9_file() -> Vec<u8> {
    write_file(MediaConfig::Vp9Config(Vp9Config {
        width: 640,
        height: 360,
    }))
}

/// Same frames in a vp08 entry.
pub fn vp8_file() -> Vec<u8> {
    rename(&vp9_file(), b"vp09", b"vp08")
}

/// Same frames in a hev1 entry carrying a complete hvcC record.
pub fn hevc_file() -> Vec<u8> {
    let file = write_file(MediaConfig::HevcConfig(HevcConfig {
        width: 1280,
        height: 720,
    }));
    replace_payload(&file, &entry_path(b"hev1"), b"hvcC", &HVCC)
}

/// Same frames in an hvc1 entry.
pub fn hvc1_file() -> Vec<u8> {
    rename(&hevc_file(), b"hev1", b"hvc1")
}

/// Same frames in an av01 entry.
pub fn av1_file() -> Vec<u8> {
    let file = replace_payload(&avc_file(), &entry_path(b"avc1"), b"avcC", &AV1C);
    rename(&rename(&file, b"avcC", b"av1C"), b"avc1", b"av01")
}

/// A file whose sample entry carries no description box.
///
/// The entry is renamed to avc3 as well, since the `mp4` crate refuses an
/// avc1 entry without avcC.
pub fn undescribed_file() -> Vec<u8> {
    rename(&rename(&avc_file(), b"avcC", b"free"), b"avc1", b"avc3")
}

/// Boxes enclosing a sample entry's children, outermost first.
fn entry_path(entry: &'static [u8; 4]) -> [&'static [u8; 4]; 7] {
    [b"moov", b"trak", b"mdia", b"minf", b"stbl", b"stsd", entry]
}

fn last_box(data: &[u8], kind: &[u8; 4]) -> usize {
    let at = data
        .windows(4)
        .rposition(|window| window == kind)
        .unwrap_or_else(|| panic!("no {} box", String::from_utf8_lossy(kind)));
    at - 4
}

/// Rename the last box of type `from`.
pub fn rename(file: &[u8], from: &[u8; 4], to: &[u8; 4]) -> Vec<u8> {
    let mut out = file.to_vec();
    let at = last_box(&out, from);
    out[at + 4..at + 8].copy_from_slice(to);
    out
}

/// Swap the payload of the last `kind` box, resizing `parents` to fit.
pub fn replace_payload(
    file: &[u8],
    parents: &[&[u8; 4]],
    kind: &[u8; 4],
    payload: &[u8],
) -> Vec<u8> {
    let at = last_box(file, kind);
    let old_size = u32::from_be_bytes(file[at..at + 4].try_into().unwrap()) as usize;
    let new_size = payload.len() + 8;

    let mut out = Vec::with_capacity(file.len() + new_size);
    out.extend_from_slice(&file[..at]);
    out.extend_from_slice(&(new_size as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out.extend_from_slice(&file[at + old_size..]);

    for parent in parents {
        let start = last_box(&out[..at], parent);
        let size = u32::from_be_bytes(out[start..start + 4].try_into().unwrap()) as usize;
        let resized = (size + new_size - old_size) as u32;
        out[start..start + 4].copy_from_slice(&resized.to_be_bytes());
    }
    out
}
