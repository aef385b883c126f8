//! RFC 1952 gzip header/trailer construction and the metadata it is
//! derived from.
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{ByteOrder, LittleEndian};
use flate2::Compression;

const ID1: u8 = 0x1f;
const ID2: u8 = 0x8b;
const CM_DEFLATE: u8 = 8;
const FLG_FNAME: u8 = 0x08;

/// Fields of the gzip header that vary per input file.
#[derive(Debug, Clone, Default)]
pub struct GzipMetadata {
    /// Seconds since the Unix epoch; 0 only if the filesystem reports 0.
    pub mtime: u32,
    /// Latin-1, `.gz`-stripped basename; `None` omits FNAME entirely.
    pub fname: Option<Vec<u8>>,
}

impl GzipMetadata {
    /// Derive header metadata from an input path the way the reference
    /// implementation does: modification time falls back to current wall
    /// clock, and FNAME is omitted (not erred on) if the basename is not
    /// Latin-1 representable.
    pub fn from_path(path: &Path) -> Self {
        let mtime = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as u32)
            .unwrap_or_else(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as u32)
                    .unwrap_or(0)
            });

        let fname = path.file_name().and_then(|name| {
            let name = name.to_str()?;
            let name = name.strip_suffix(".gz").unwrap_or(name);
            encode_latin1(name)
        });

        Self { mtime, fname }
    }
}

/// Encode as Latin-1 (ISO-8859-1); `None` if any char is outside the
/// representable range, matching RFC 1952's requirement for FNAME.
fn encode_latin1(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        let code = c as u32;
        if code > 0xff {
            return None;
        }
        out.push(code as u8);
    }
    Some(out)
}

/// XFL byte: `2` for best compression, `4` for fastest, `0` otherwise.
fn extra_flags(level: Compression) -> u8 {
    if level.level() >= Compression::best().level() {
        2
    } else if level.level() <= Compression::fast().level() {
        4
    } else {
        0
    }
}

/// OS byte: `3` on Unix-like platforms, `0` on Windows, `255` otherwise.
fn os_byte() -> u8 {
    if cfg!(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "macos",
        target_os = "ios",
        target_os = "aix"
    )) {
        3
    } else if cfg!(target_os = "windows") {
        0
    } else {
        255
    }
}

/// Build the fixed 10-byte header plus optional NUL-terminated FNAME.
pub fn build_header(level: Compression, meta: &GzipMetadata) -> Vec<u8> {
    let flg = if meta.fname.is_some() { FLG_FNAME } else { 0 };

    let mut header = vec![0u8; 10];
    header[0] = ID1;
    header[1] = ID2;
    header[2] = CM_DEFLATE;
    header[3] = flg;
    LittleEndian::write_u32(&mut header[4..8], meta.mtime);
    header[8] = extra_flags(level);
    header[9] = os_byte();

    if let Some(fname) = &meta.fname {
        header.extend_from_slice(fname);
        header.push(0);
    }

    header
}

/// Build the 8-byte trailer: CRC-32 then ISIZE, both little-endian u32.
pub fn build_trailer(crc32: u32, input_size: u64) -> [u8; 8] {
    let mut trailer = [0u8; 8];
    LittleEndian::write_u32(&mut trailer[0..4], crc32);
    LittleEndian::write_u32(&mut trailer[4..8], (input_size & 0xffff_ffff) as u32);
    trailer
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_header_no_fname() {
        let meta = GzipMetadata {
            mtime: 0,
            fname: None,
        };
        let header = build_header(Compression::new(9), &meta);
        assert_eq!(header.len(), 10);
        assert_eq!(&header[0..4], &[0x1f, 0x8b, 0x08, 0x00]);
        assert_eq!(header[8], 2); // XFL for best compression
    }

    /// S5: `Golden_Ticket.mp3.gz` -> FNAME `Golden_Ticket.mp3\0`, FLG FNAME bit set.
    #[test]
    fn test_fname_strips_trailing_gz() {
        let meta = GzipMetadata::from_path(Path::new("Golden_Ticket.mp3.gz"));
        assert_eq!(meta.fname.as_deref(), Some(&b"Golden_Ticket.mp3"[..]));
        let header = build_header(Compression::new(6), &meta);
        assert_eq!(header[3], FLG_FNAME);
        assert_eq!(&header[10..], b"Golden_Ticket.mp3\0");
    }

    /// S6: a non-Latin-1 basename omits FNAME and clears the FLG bit.
    #[test]
    fn test_non_latin1_name_omits_fname() {
        let meta = GzipMetadata::from_path(Path::new("В Питере — пить.mp3"));
        assert_eq!(meta.fname, None);
        let header = build_header(Compression::new(6), &meta);
        assert_eq!(header.len(), 10);
        assert_eq!(header[3], 0);
    }

    #[test]
    fn test_xfl_values() {
        let no_fname = GzipMetadata::default();
        assert_eq!(build_header(Compression::new(9), &no_fname)[8], 2);
        assert_eq!(build_header(Compression::new(1), &no_fname)[8], 4);
        assert_eq!(build_header(Compression::new(5), &no_fname)[8], 0);
    }

    #[test]
    fn test_trailer_layout() {
        let trailer = build_trailer(0xdead_beef, 0x1_0000_0005);
        assert_eq!(&trailer[0..4], &0xdead_beefu32.to_le_bytes());
        // ISIZE is truncated modulo 2^32, not saturated.
        assert_eq!(&trailer[4..8], &5u32.to_le_bytes());
    }
}
