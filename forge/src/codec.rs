use std::{convert::TryInto, fmt::Debug};

/// Read from a byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    offs: usize,
}

impl<'a> Reader<'a> {
    pub fn init(bytes: &[u8]) -> Reader {
        Reader {
            buf: bytes,
            offs: 0,
        }
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let ret = &self.buf[self.offs..];
        self.offs = self.buf.len();
        ret
    }

    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.left() < len {
            return None;
        }

        let current = self.offs;
        self.offs += len;
        Some(&self.buf[current..current + len])
    }

    pub fn any_left(&self) -> bool {
        self.offs < self.buf.len()
    }

    pub fn left(&self) -> usize {
        self.buf.len() - self.offs
    }

    pub fn used(&self) -> usize {
        self.offs
    }
}

/// Things we can encode and read from a Reader.
pub trait Codec: Debug + Sized {
    /// Encode yourself by appending onto `bytes`.
    fn encode(&self, bytes: &mut Vec<u8>);

    /// Decode yourself by fiddling with the `Reader`.
    /// Return Some if it worked, None if not.
    fn read(_: &mut Reader) -> Option<Self>;
}

fn decode_u8(bytes: &[u8]) -> Option<u8> {
    let [value]: [u8; 1] = bytes.try_into().ok()?;
    Some(value)
}

impl Codec for u8 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.push(*self);
    }

    fn read(r: &mut Reader) -> Option<Self> {
        r.take(1).and_then(decode_u8)
    }
}

pub fn decode_u16(bytes: &[u8]) -> Option<u16> {
    Some(u16::from_be_bytes(bytes.try_into().ok()?))
}

impl Codec for u16 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&u16::to_be_bytes(*self));
    }

    fn read(r: &mut Reader) -> Option<Self> {
        r.take(2).and_then(decode_u16)
    }
}

pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}

impl Codec for u64 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&u64::to_be_bytes(*self));
    }

    fn read(r: &mut Reader) -> Option<Self> {
        r.take(8).and_then(decode_u64)
    }
}

/// Big-endian encoding of `value` into exactly `len` bytes.
///
/// Wider outputs are left-padded with zeros, narrower outputs keep the least significant bytes.
pub fn encode_u64_sized(value: u64, len: usize) -> Vec<u8> {
    let be = value.to_be_bytes();
    if len >= be.len() {
        let mut out = vec![0u8; len - be.len()];
        out.extend_from_slice(&be);
        out
    } else {
        be[be.len() - len..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_reader_take_and_rest() {
        let bytes = [1u8, 2, 3, 4, 5];
        let mut r = Reader::init(&bytes);

        assert_eq!(r.take(2), Some(&[1u8, 2][..]));
        assert_eq!(r.left(), 3);
        assert_eq!(r.take(4), None);
        assert_eq!(r.used(), 2);
        assert_eq!(r.rest(), &[3u8, 4, 5][..]);
        assert!(!r.any_left());
    }

    #[test]
    fn test_read_u16_and_u64() {
        let mut bytes = Vec::new();
        0x1234u16.encode(&mut bytes);
        5u64.encode(&mut bytes);

        let mut r = Reader::init(&bytes);
        assert_eq!(u16::read(&mut r), Some(0x1234));
        assert_eq!(u64::read(&mut r), Some(5));
        assert_eq!(u8::read(&mut r), None);
    }

    #[test]
    fn test_encode_u64_sized() {
        assert_eq!(encode_u64_sized(5, 8), vec![0, 0, 0, 0, 0, 0, 0, 5]);
        assert_eq!(encode_u64_sized(0x0102, 1), vec![0x02]);
        assert_eq!(encode_u64_sized(1, 10), vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(encode_u64_sized(7, 0).is_empty());
    }
}
