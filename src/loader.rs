//! Reads a program image — a sequence of big-endian 32-bit words with no
//! header or padding — into a fresh [`SegmentStore`], as segment 0.

use std::io::Read;

use crate::error::UmError;
use crate::segment::SegmentStore;

/// Loads the program image from `source` into a new store's segment 0.
///
/// Words are read one at a time until `source` is exhausted. A clean EOF
/// between words ends the image normally; an EOF in the middle of a word
/// means the byte count was not a multiple of 4, which is reported as
/// [`UmError::TruncatedImage`] either way.
pub fn load_image<R: Read>(mut source: R) -> Result<SegmentStore, UmError> {
    let mut words = Vec::new();
    let mut total_bytes: u64 = 0;

    loop {
        let mut buf = [0u8; 4];
        let filled = read_up_to(&mut source, &mut buf)?;
        total_bytes += filled as u64;

        if filled == 0 {
            break;
        }
        if filled < 4 {
            return Err(UmError::TruncatedImage { size: total_bytes });
        }

        words.push(u32::from_be_bytes(buf));
    }

    let mut store = SegmentStore::new();
    let zero = store.alloc(words.len() as u32);
    debug_assert_eq!(zero, 0, "first allocation must be address 0");

    for (i, word) in words.into_iter().enumerate() {
        store.set(zero, i as u32, word)?;
    }

    Ok(store)
}

/// Fills `buf` as far as `source` allows before hitting EOF, returning how
/// many bytes were actually read (which may be less than `buf.len()`).
fn read_up_to<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize, UmError> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
