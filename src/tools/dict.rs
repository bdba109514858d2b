//! Sliding dictionary for LZ type expansion windows.
//! This is used by the `lh5` module.
//! The ring holds the most recent output with the write cursor one past the
//! last value produced.  Wrapping the cursor hands the whole window back to
//! the caller so it can go downstream in one flush.

use num_traits::PrimInt;

pub struct SlidingDict<T: PrimInt> {
    buf: Vec<T>,
    pos: usize,
    n: usize
}

impl <T: PrimInt> SlidingDict<T> {
    pub fn create(fill: T,n: usize) -> Self {
        Self {
            buf: vec![fill;n],
            pos: 0,
            n
        }
    }
    /// write one value at the cursor; when the cursor wraps, the full
    /// window is returned for flushing
    pub fn put(&mut self,val: T) -> Option<&[T]> {
        self.buf[self.pos] = val;
        self.pos += 1;
        if self.pos == self.n {
            self.pos = 0;
            Some(&self.buf)
        } else {
            None
        }
    }
    /// start of a match `distance` back from the last value written, as an
    /// index for `at`; any distance is taken modulo the window
    pub fn match_start(&self,distance: usize) -> usize {
        (self.pos as i64 - 1 - distance as i64).rem_euclid(self.n as i64) as usize
    }
    /// read for a match copy, wrapping, so a source that catches up to the
    /// cursor re-reads the values the match just wrote
    pub fn at(&self,abs: usize) -> T {
        self.buf[abs % self.n]
    }
    /// unflushed tail behind the cursor, empty right after a wrap
    pub fn residue(&self) -> &[T] {
        &self.buf[..self.pos]
    }
}

#[test]
fn wrap_returns_window() {
    let mut dict: SlidingDict<u8> = SlidingDict::create(0,4);
    assert_eq!(dict.put(1),None);
    assert_eq!(dict.put(2),None);
    assert_eq!(dict.put(3),None);
    assert_eq!(dict.put(4),Some(&[1u8,2,3,4][..]));
    assert!(dict.residue().is_empty());
    assert_eq!(dict.put(5),None);
    assert_eq!(dict.residue(),&[5u8]);
}

#[test]
fn match_source_arithmetic() {
    let mut dict: SlidingDict<u8> = SlidingDict::create(b' ',4);
    // nothing written yet: the farthest distance lands on the prefill
    assert_eq!(dict.match_start(3),0);
    assert_eq!(dict.at(dict.match_start(3)),b' ');
    dict.put(7);
    // distance 0 is the value just written
    let src = dict.match_start(0);
    assert_eq!(src,0);
    assert_eq!(dict.at(src),7);
    // reading past the cursor wraps into the still-blank window
    assert_eq!(dict.at(src + 1),b' ');
    // distances beyond the window wrap too
    assert_eq!(dict.match_start(4),src);
}
