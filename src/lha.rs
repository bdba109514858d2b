//! LHA level-1 header parsing
//!
//! A level-1 header is a 2 byte size/checksum pair, a fixed field block, a
//! counted file name, the member CRC, an OS id, and a chain of extended
//! header records that ends with a zero size.  Only enough is parsed to
//! locate the compressed payload: the method must be `-lh5-` and the stored
//! skip size is netted down by the extended headers so it reflects the
//! payload alone.
//!
//! ```text
//! offset   size  field
//! -----------------------------------
//!     0       1  header size   (counts bytes 2 .. 2+size)
//!     1       1  header checksum
//!     2       5  method id, "-lh5-"
//!     7       4  skip (packed) size
//!    11       4  original size
//!    15       2  time
//!    17       2  date
//!    19       1  attribute (0x20 fixed)
//!    20       1  level (0x01 fixed)
//!    21       1  name length X
//!    22       X  file name
//! X + 22      2  file crc
//! X + 24      1  OS id
//!     ...        (unparsed space counted by the header size)
//! size + 2    2  first extended header size
//! ```

use std::io::Read;
use crate::Error;

const COMMON_HEADER_SIZE: usize = 21;
/// smallest header size byte that holds the fixed fields with an empty name
const MIN_HEADER_SIZE: usize = 23;
const METHOD_ID: &[u8] = b"-lh5-";

/// Fields of the level-1 header the extraction actually needs.  Time, date
/// and OS id are validated past but not preserved.
pub struct Header {
    pub filename: String,
    pub original_size: u32,
    /// compressed payload size in bytes, net of extended headers
    pub packed_size: u32,
    /// expected CRC-16 of the expanded data
    pub crc: u16
}

fn calc_sum(buf: &[u8]) -> u8 {
    buf.iter().fold(0u8,|sum,&b| sum.wrapping_add(b))
}

/// Parse a level-1 header from the current position.  On success the reader
/// stands at the first byte of the compressed payload.
pub fn read_level1<R: Read>(rd: &mut R) -> Result<Header,Error> {
    let mut common = [0u8;COMMON_HEADER_SIZE];
    rd.read_exact(&mut common).map_err(Error::HeaderRead)?;
    if common[19] != 0x20 {
        return Err(Error::HeaderAttribute);
    }
    if &common[2..7] != METHOD_ID {
        return Err(Error::Method);
    }
    if common[20] != 1 {
        return Err(Error::HeaderLevel(common[20]));
    }
    let header_size = common[0] as usize;
    if header_size < MIN_HEADER_SIZE {
        return Err(Error::FullHeaderRead(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "level 1 header is too short"
        )));
    }
    // the counted region plus the size/checksum pair plus the trailing
    // next-header size
    let mut data = vec![0u8;header_size + 4];
    data[..COMMON_HEADER_SIZE].copy_from_slice(&common);
    rd.read_exact(&mut data[COMMON_HEADER_SIZE..]).map_err(Error::FullHeaderRead)?;
    if calc_sum(&data[2..2 + header_size]) != data[1] {
        return Err(Error::HeaderChecksum);
    }
    let mut packed_size = u32::from_le_bytes([data[7],data[8],data[9],data[10]]);
    let original_size = u32::from_le_bytes([data[11],data[12],data[13],data[14]]);
    let name_length = data[21] as usize;
    // name, crc and OS id all have to fit inside the counted region
    if name_length > header_size - MIN_HEADER_SIZE {
        return Err(Error::HeaderNameLength);
    }
    let filename = String::from_utf8_lossy(&data[22..22 + name_length]).into_owned();
    let crc = u16::from_le_bytes([data[22 + name_length],data[23 + name_length]]);
    // walk the extended headers: each record is its declared size of bytes,
    // ending with the 2 byte size of the next one; the chain terminates on a
    // size of 0, and every record shrinks the payload that follows
    let mut extend_size = u16::from_le_bytes([data[header_size + 2],data[header_size + 3]]) as u32;
    while extend_size != 0 {
        if extend_size < 2 {
            return Err(Error::ExtendedHeader);
        }
        packed_size = match packed_size.checked_sub(extend_size) {
            Some(rest) => rest,
            None => return Err(Error::ExtendedHeader)
        };
        let mut record = vec![0u8;extend_size as usize - 2];
        rd.read_exact(&mut record).map_err(|_| Error::ExtendedHeader)?;
        let mut next = [0u8;2];
        rd.read_exact(&mut next).map_err(|_| Error::ExtendedHeader)?;
        extend_size = u16::from_le_bytes(next) as u32;
    }
    log::debug!("member {:?}: {} bytes packed to {}",filename,original_size,packed_size);
    Ok(Header {
        filename,
        original_size,
        packed_size,
        crc
    })
}

/// Assemble a level-1 header for the given member, used by the tests.
#[cfg(test)]
pub fn build_level1(filename: &str, original_size: u32, packed_size: u32, crc: u16) -> Vec<u8> {
    let name = filename.as_bytes();
    let header_size = MIN_HEADER_SIZE + name.len();
    let mut ans = vec![0u8;header_size + 4];
    ans[0] = header_size as u8;
    ans[2..7].copy_from_slice(METHOD_ID);
    ans[7..11].copy_from_slice(&u32::to_le_bytes(packed_size));
    ans[11..15].copy_from_slice(&u32::to_le_bytes(original_size));
    ans[19] = 0x20;
    ans[20] = 1;
    ans[21] = name.len() as u8;
    ans[22..22 + name.len()].copy_from_slice(name);
    ans[22 + name.len()..24 + name.len()].copy_from_slice(&u16::to_le_bytes(crc));
    ans[1] = calc_sum(&ans[2..2 + header_size]);
    ans
}

#[cfg(test)]
use std::io::{Cursor,Seek};

#[test]
fn golden_header_accepted() {
    let raw = build_level1("SAM.TXT",49,37,0x1234);
    let mut curs = Cursor::new(&raw);
    let header = read_level1(&mut curs).expect("header rejected");
    assert_eq!(header.filename,"SAM.TXT");
    assert_eq!(header.original_size,49);
    assert_eq!(header.packed_size,37);
    assert_eq!(header.crc,0x1234);
    assert_eq!(curs.stream_position().unwrap(),raw.len() as u64);
}

#[test]
fn bad_attribute_rejected() {
    let mut raw = build_level1("SAM.TXT",49,37,0x1234);
    raw[19] = 0x10;
    assert!(matches!(read_level1(&mut Cursor::new(&raw)),Err(Error::HeaderAttribute)));
}

#[test]
fn bad_method_rejected() {
    let mut raw = build_level1("SAM.TXT",49,37,0x1234);
    raw[2..7].copy_from_slice(b"-lh1-");
    assert!(matches!(read_level1(&mut Cursor::new(&raw)),Err(Error::Method)));
}

#[test]
fn bad_level_rejected() {
    let mut raw = build_level1("SAM.TXT",49,37,0x1234);
    raw[20] = 2;
    assert!(matches!(read_level1(&mut Cursor::new(&raw)),Err(Error::HeaderLevel(2))));
}

#[test]
fn bad_checksum_rejected() {
    let mut raw = build_level1("SAM.TXT",49,37,0x1234);
    raw[1] = raw[1].wrapping_add(1);
    assert!(matches!(read_level1(&mut Cursor::new(&raw)),Err(Error::HeaderChecksum)));
}

#[test]
fn oversized_name_rejected() {
    let mut raw = build_level1("SAM.TXT",49,37,0x1234);
    raw[21] = 200;
    raw[1] = calc_sum(&raw[2..2 + raw[0] as usize]);
    assert!(matches!(read_level1(&mut Cursor::new(&raw)),Err(Error::HeaderNameLength)));
}

#[test]
fn extended_headers_shrink_packed_size() {
    let mut raw = build_level1("SAM.TXT",49,37,0x1234);
    let header_size = raw[0] as usize;
    // chain two records of 5 and 7 bytes onto the trailing size field
    raw[header_size + 2..header_size + 4].copy_from_slice(&u16::to_le_bytes(5));
    raw.extend_from_slice(&[0,0,0]);
    raw.extend_from_slice(&u16::to_le_bytes(7));
    raw.extend_from_slice(&[0,0,0,0,0]);
    raw.extend_from_slice(&u16::to_le_bytes(0));
    let mut curs = Cursor::new(&raw);
    let header = read_level1(&mut curs).expect("header rejected");
    assert_eq!(header.packed_size,37 - 5 - 7);
    assert_eq!(curs.stream_position().unwrap(),raw.len() as u64);
}

#[test]
fn truncated_extended_header_rejected() {
    let mut raw = build_level1("SAM.TXT",49,37,0x1234);
    let header_size = raw[0] as usize;
    raw[header_size + 2..header_size + 4].copy_from_slice(&u16::to_le_bytes(5));
    raw.extend_from_slice(&[0,0]); // record cut short
    assert!(matches!(read_level1(&mut Cursor::new(&raw)),Err(Error::ExtendedHeader)));
}
