//! # unlzh Library
//!
//! Extract the member of an LHA archive compressed with the LZHUFF5
//! (`-lh5-`) method and wrapped in a level-1 header.
//! * `lha` parses the level-1 header and locates the compressed payload
//! * `lh5` expands the payload: per-block canonical Huffman codes driving
//!   an LZSS dictionary of 8K, checked downstream against a stored CRC-16
//!
//! Expansion works on buffers (archive members are easily buffered), writing
//! decompressed data to any `Write` sink as the dictionary fills.
//!
//! ## File Example
//!
//! ```rs
//! use unlzh::*;
//! use std::io::Read;
//! let in_file = std::fs::File::open("some_archive.lzh").expect("open failed");
//! let mut rd = std::io::BufReader::new(in_file);
//! let header = lha::read_level1(&mut rd).expect("bad header");
//! let mut payload = Vec::new();
//! rd.take(header.packed_size as u64).read_to_end(&mut payload).expect("read failed");
//! let mut out_file = std::fs::File::create(&header.filename).expect("create failed");
//! let crc = lh5::expand(&payload,header.original_size,&mut out_file).expect("expansion failed");
//! eprintln!("stored crc {}, computed crc {}",header.crc,crc);
//! ```
//!
//! ## Buffer Example
//!
//! ```rs
//! use unlzh::*;
//! let (expanded,crc) = lh5::expand_slice(&payload,original_size).expect("expansion failed");
//! ```

mod tools;
pub mod lha;
pub mod lh5;

pub type DYNERR = Box<dyn std::error::Error>;
pub type STDRESULT = Result<(),DYNERR>;

/// Extraction errors.  The `Display` strings are stable, the binary
/// prefixes them with `Error: ` on stderr.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("archive file not specified")]
    ArchiveNotSpecified,
    #[error("Failed to open {path:?}: {source}")]
    Open { path: String, source: std::io::Error },
    #[error("Unable to read lha header: {0}")]
    HeaderRead(#[source] std::io::Error),
    #[error("Invalid lha header attribute byte.")]
    HeaderAttribute,
    #[error("Compression method is not LZHUFF5.")]
    Method,
    #[error("Header level {0} is not supported")]
    HeaderLevel(u8),
    #[error("Unable to read full lha header: {0}")]
    FullHeaderRead(#[source] std::io::Error),
    #[error("Invalid lha header checksum.")]
    HeaderChecksum,
    #[error("Invalid lha header name length.")]
    HeaderNameLength,
    #[error("Invalid extended lha header.")]
    ExtendedHeader,
    #[error("Bad table (case {0})")]
    BadTable(char),
    #[error("CRC error: {0:?}")]
    CrcMismatch(String),
    #[error("{0}")]
    Io(#[from] std::io::Error)
}
