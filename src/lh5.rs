//! LZHUFF5 (`-lh5-`) expansion
//!
//! This is the decoder for the scheme LHA calls LZHUFF5: LZSS over an 8K
//! sliding dictionary, with the literal/length and position alphabets each
//! recoded per block by a canonical Huffman code.  The lengths of the
//! literal/length code are themselves sent through a small meta code, whose
//! lengths open each block.
//!
//! * This transforms buffers, not files (we expect payloads that are easily
//!   buffered); expanded data is pushed to any `Write` sink one dictionary
//!   flush at a time
//! * The payload slice doubles as the compressed byte budget: a short slice
//!   reads as zero bits past the end and the decoder still stops after
//!   producing the declared number of bytes
//! * The CRC-16 of everything written is returned for the caller to check
//!   against the archive header

use std::io::Write;
use crate::Error;
use crate::tools::bits::BitReader;
use crate::tools::crc::Crc16;
use crate::tools::dict::SlidingDict;
use crate::tools::huffman::HuffTable;

// LZHUFF5 coding constants

const DICBIT: usize = 13;
const DICSIZ: usize = 1 << DICBIT; // sliding dictionary
const MAXMATCH: usize = 256; // maximum match length
const THRESHOLD: usize = 3; // minimum match length
const NP: usize = DICBIT + 1; // position code alphabet
const NT: usize = 19; // meta code alphabet (length-of-length codes)
const NC: usize = 255 + MAXMATCH + 2 - THRESHOLD; // literal/length alphabet
const PBIT: usize = 4; // width of the position length-count field
const TBIT: usize = 5; // width of the meta length-count field
const CBIT: usize = 9; // width of the literal/length length-count field
const NPT: usize = 256; // physical capacity of the pt length vector

/// All decoder state for one archive member.  The `pt` table plays two
/// roles per block: first the meta code for reading the literal/length
/// lengths, then the position code proper.
struct Lh5Decoder<'a> {
    bits: BitReader<'a>,
    window: SlidingDict<u8>,
    c_table: HuffTable,
    pt_table: HuffTable,
    /// codes remaining in the current block
    blocksize: u16,
    crc: Crc16
}

impl <'a> Lh5Decoder<'a> {
    fn new(compressed: &'a [u8]) -> Self {
        Self {
            bits: BitReader::new(compressed),
            window: SlidingDict::create(b' ',DICSIZ),
            c_table: HuffTable::single(NC,12,0),
            pt_table: HuffTable::single(NP,8,0),
            blocksize: 0,
            crc: Crc16::new()
        }
    }
    /// Read `nn` code lengths into the pt table.  Each length is 3 bits, or
    /// an escape of 7 extended by a run of 1 bits.  When `special` is given,
    /// a 2 bit zero-run count is spliced in at that index (the meta code
    /// reserves it for the gap left by its own run symbols).
    fn read_pt_len(&mut self, nn: usize, nbit: usize, special: Option<usize>) -> Result<(),Error> {
        let n = self.bits.getbits(nbit) as usize;
        if n == 0 {
            let c = self.bits.getbits(nbit);
            self.pt_table = HuffTable::single(nn,8,c);
            return Ok(());
        }
        let mut pt_len = [0u8;NPT];
        let mut i = 0;
        while i < n.min(NPT) {
            let mut c = self.bits.peek(3) as usize;
            if c != 7 {
                self.bits.consume(3);
            } else {
                let mut mask = 1u16 << 12;
                while self.bits.peek(16) & mask != 0 {
                    mask >>= 1;
                    c += 1;
                }
                self.bits.consume(c - 3);
            }
            pt_len[i] = c as u8;
            i += 1;
            if Some(i) == special {
                let mut run = self.bits.getbits(2) as usize;
                while run > 0 && i < NPT {
                    pt_len[i] = 0;
                    i += 1;
                    run -= 1;
                }
            }
        }
        // an oversized count can leave entries beyond nn, the table only
        // sees the first nn either way
        self.pt_table = HuffTable::build(&pt_len[..nn],8)?;
        Ok(())
    }
    /// Read the literal/length code lengths, one meta symbol at a time.
    /// Meta symbols 0..=2 encode runs of absent codes, the rest carry a
    /// length biased by 2.
    fn read_c_len(&mut self) -> Result<(),Error> {
        let n = self.bits.getbits(CBIT) as usize;
        if n == 0 {
            let c = self.bits.getbits(CBIT);
            self.c_table = HuffTable::single(NC,12,c);
            return Ok(());
        }
        let mut c_len = [0u8;NC];
        let mut i = 0;
        while i < n.min(NC) {
            let c = self.pt_table.decode(&mut self.bits);
            match c {
                0 => i += 1,
                1 | 2 => {
                    let mut run = match c {
                        1 => self.bits.getbits(4) as usize + 3,
                        _ => self.bits.getbits(CBIT) as usize + 20
                    };
                    while run > 0 && i < NC {
                        c_len[i] = 0;
                        i += 1;
                        run -= 1;
                    }
                },
                _ => {
                    c_len[i] = (c - 2) as u8;
                    i += 1;
                }
            }
        }
        self.c_table = HuffTable::build(&c_len,12)?;
        Ok(())
    }
    fn read_block(&mut self) -> Result<(),Error> {
        self.blocksize = self.bits.getbits(16);
        log::debug!("block of {} codes",self.blocksize);
        self.read_pt_len(NT,TBIT,Some(3))?;
        self.read_c_len()?;
        self.read_pt_len(NP,PBIT,None)
    }
    /// Decode a position symbol and widen it to a dictionary distance:
    /// symbol `j > 0` means `2^(j-1)` plus `j-1` literal bits.
    fn decode_position(&mut self) -> u16 {
        let j = self.pt_table.decode(&mut self.bits);
        match j {
            0 => 0,
            _ => {
                // a sane symbol is below NP, a degenerate tree can hand back
                // a node id, keep the extra-bit count in range
                let n = (j as usize - 1).min(15);
                (1 << n) + self.bits.getbits(n)
            }
        }
    }
    /// Write one byte at the cursor; a full dictionary goes to the sink and
    /// the CRC in one flush.
    fn emit<W: Write>(&mut self, val: u8, out: &mut W) -> Result<(),Error> {
        if let Some(full) = self.window.put(val) {
            self.crc.update(full);
            out.write_all(full)?;
        }
        Ok(())
    }
    fn expand_into<W: Write>(&mut self, original_size: u32, out: &mut W) -> Result<u16,Error> {
        let mut count: u64 = 0;
        while count < original_size as u64 {
            if self.blocksize == 0 {
                self.read_block()?;
            }
            self.blocksize = self.blocksize.wrapping_sub(1);
            let c = self.c_table.decode(&mut self.bits);
            if c < 256 {
                self.emit(c as u8,out)?;
                count += 1;
            } else {
                let length = c as usize - 256 + THRESHOLD;
                let distance = self.decode_position() as usize;
                // fix the source before copying so that a match overlapping
                // the cursor re-reads the bytes it just produced
                let src = self.window.match_start(distance);
                for k in 0..length {
                    let val = self.window.at(src + k);
                    self.emit(val,out)?;
                }
                count += length as u64;
            }
        }
        let residue = self.window.residue();
        if !residue.is_empty() {
            self.crc.update(residue);
            out.write_all(residue)?;
        }
        Ok(self.crc.value())
    }
}

/// Expand an LZHUFF5 payload, writing `original_size` bytes to `out`.
/// Returns the CRC-16 of the expanded data, to be compared with the value
/// stored in the archive header.
pub fn expand<W: Write>(compressed: &[u8], original_size: u32, out: &mut W) -> Result<u16,Error> {
    let mut decoder = Lh5Decoder::new(compressed);
    decoder.expand_into(original_size,out)
}

/// Convenience function, calls `expand` with a Vec sink and returns the
/// expanded data along with its CRC
pub fn expand_slice(compressed: &[u8], original_size: u32) -> Result<(Vec<u8>,u16),Error> {
    let mut ans = Vec::new();
    let crc = expand(compressed,original_size,&mut ans)?;
    Ok((ans,crc))
}

#[cfg(test)]
use bit_vec::BitVec;

/// append `n` bits of `val` to the stream under construction, MSB first
#[cfg(test)]
fn put_bits(bv: &mut BitVec, val: u16, n: usize) {
    for i in (0..n).rev() {
        bv.push(val >> i & 1 == 1);
    }
}

#[cfg(test)]
fn crc_of(buf: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(buf);
    crc.value()
}

#[test]
fn empty_member() {
    let (data,crc) = expand_slice(&[],0).expect("expansion failed");
    assert!(data.is_empty());
    assert_eq!(crc,0);
}

#[test]
fn single_literal() {
    let mut bv = BitVec::new();
    put_bits(&mut bv,1,16); // one code in the block
    put_bits(&mut bv,0,5); // meta code collapses to symbol 0
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,9); // literal/length code collapses to 'A'
    put_bits(&mut bv,0x41,9);
    put_bits(&mut bv,0,4); // position code collapses to symbol 0
    put_bits(&mut bv,0,4);
    let stream = bv.to_bytes();
    assert_eq!(stream,hex::decode("00 01 00 00 04 10 00".replace(' ',"")).unwrap());
    let (data,crc) = expand_slice(&stream,1).expect("expansion failed");
    assert_eq!(data,vec![0x41]);
    assert_eq!(crc,0x30c0);
}

#[test]
fn self_overlap_repeats_last_byte() {
    let mut bv = BitVec::new();
    // block 1: the single literal X
    put_bits(&mut bv,1,16);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,9);
    put_bits(&mut bv,b'X' as u16,9);
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,0,4);
    // block 2: one match of length 4 at distance 0, which must re-read the
    // byte the first block just wrote
    put_bits(&mut bv,1,16);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,9);
    put_bits(&mut bv,257,9);
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,0,4);
    let (data,crc) = expand_slice(&bv.to_bytes(),5).expect("expansion failed");
    assert_eq!(data,b"XXXXX".to_vec());
    assert_eq!(crc,crc_of(b"XXXXX"));
}

#[test]
fn match_into_prefilled_window() {
    let mut bv = BitVec::new();
    put_bits(&mut bv,1,16);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,9);
    put_bits(&mut bv,256,9); // length 3 match
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,13,4); // position symbol 13: 4096 + 12 extra bits
    put_bits(&mut bv,0xfff,12); // maximal distance 8191
    let (data,crc) = expand_slice(&bv.to_bytes(),3).expect("expansion failed");
    assert_eq!(data,b"   ".to_vec());
    assert_eq!(crc,crc_of(b"   "));
}

#[test]
fn full_window_flush() {
    // 32 matches of length 256 at distance 1 walk the blank dictionary all
    // the way around, forcing the wrap flush exactly once
    let mut bv = BitVec::new();
    put_bits(&mut bv,32,16);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,9);
    put_bits(&mut bv,509,9); // length 256
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,1,4); // position symbol 1: distance 1, no extra bits
    let (data,crc) = expand_slice(&bv.to_bytes(),8192).expect("expansion failed");
    assert_eq!(data,vec![b' ';8192]);
    assert_eq!(crc,crc_of(&vec![b' ';8192]));
}

#[test]
fn real_code_tables() {
    // a block carrying actual canonical tables: the meta code has symbols
    // 2 and 3 at one bit each, the literal/length code has 'A' and 'B' at
    // one bit each, reached after a 65 entry zero run
    let mut bv = BitVec::new();
    put_bits(&mut bv,2,16);
    put_bits(&mut bv,4,5); // four meta lengths
    put_bits(&mut bv,0,3);
    put_bits(&mut bv,0,3);
    put_bits(&mut bv,1,3);
    put_bits(&mut bv,0,2); // no zero run at the special index
    put_bits(&mut bv,1,3);
    put_bits(&mut bv,67,9); // 67 literal/length entries
    put_bits(&mut bv,0,1); // meta symbol 2: long zero run
    put_bits(&mut bv,45,9); // 45 + 20 = 65 zeros
    put_bits(&mut bv,1,1); // meta symbol 3: c_len[65] = 1, the letter A
    put_bits(&mut bv,1,1); // meta symbol 3: c_len[66] = 1, the letter B
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,0,1); // A
    put_bits(&mut bv,1,1); // B
    let (data,crc) = expand_slice(&bv.to_bytes(),2).expect("expansion failed");
    assert_eq!(data,b"AB".to_vec());
    assert_eq!(crc,crc_of(b"AB"));
}

#[test]
fn repeated_runs_are_identical() {
    let mut bv = BitVec::new();
    put_bits(&mut bv,1,16);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,9);
    put_bits(&mut bv,0x41,9);
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,0,4);
    let stream = bv.to_bytes();
    let first = expand_slice(&stream,1).expect("expansion failed");
    let second = expand_slice(&stream,1).expect("expansion failed");
    assert_eq!(first,second);
}

#[test]
fn truncated_payload_still_terminates() {
    let mut bv = BitVec::new();
    put_bits(&mut bv,32,16);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,5);
    put_bits(&mut bv,0,9);
    put_bits(&mut bv,509,9);
    put_bits(&mut bv,0,4);
    put_bits(&mut bv,1,4);
    let whole = bv.to_bytes();
    let (data,crc) = expand_slice(&whole[..4],8192).expect("expansion failed");
    assert_eq!(data.len(),8192);
    assert_ne!(crc,crc_of(&vec![b' ';8192]));
}

#[test]
fn overlong_meta_length_rejected() {
    let mut bv = BitVec::new();
    put_bits(&mut bv,1,16);
    put_bits(&mut bv,1,5); // one meta length follows
    put_bits(&mut bv,0b11111111111110,14); // escape of 7 extended to 17
    match expand_slice(&bv.to_bytes(),1) {
        Err(Error::BadTable('a')) => {},
        other => panic!("expected bad table, got {:?}",other.map(|x| x.1))
    }
}
