//! An append-only byte sink which can go back and fill in fixed-width fields it reserved earlier.
//!
//! Class files are full of `count` and `length` prefixes whose value is only known once the
//! section they describe has been written. Instead of encoding every section twice, the writer
//! reserves the prefix with [`GrowableBuffer::reserve_u16`] or [`GrowableBuffer::reserve_u32`],
//! keeps appending, and then overwrites the reservation with the real value.

use std::io::{self, Write};

/// A fixed-width region of a [`GrowableBuffer`] which was filled with zeroes when it was reserved
/// and is waiting for its real value. `N` is the width of the region in bytes.
#[must_use = "a reservation which is never patched leaves zeroes in the output"]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Reservation<const N: usize> {
    offset: usize,
}

impl<const N: usize> Reservation<N> {
    /// The absolute offset of the first reserved byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The absolute offset of the first byte after the reserved region.
    pub fn end(&self) -> usize {
        self.offset + N
    }
}

/// A reserved big-endian `u16`.
pub type U16Slot = Reservation<2>;

/// A reserved big-endian `u32`.
pub type U32Slot = Reservation<4>;

/// An owned, growable byte sequence with a write cursor that only moves forward. All multi-byte
/// values are written big-endian.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GrowableBuffer {
    bytes: Vec<u8>,
}

impl GrowableBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer which will not reallocate until more than `capacity` bytes have
    /// been written.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// The number of bytes written so far. This is also the offset the next write will land at.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Write a 2-byte value. The format calls these `u2`, or `char` in the JVM's own writers.
    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Write the IEEE 754 bit pattern of `value`.
    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    /// Write the IEEE 754 bit pattern of `value`.
    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Append everything written to `other` so far.
    pub fn write_buffer(&mut self, other: &GrowableBuffer) {
        self.write_bytes(other.as_bytes());
    }

    /// Reserve two bytes to be filled in later by [`patch_u16`].
    ///
    /// [`patch_u16`]: #method.patch_u16
    pub fn reserve_u16(&mut self) -> U16Slot {
        self.reserve()
    }

    /// Reserve four bytes to be filled in later by [`patch_u32`].
    ///
    /// [`patch_u32`]: #method.patch_u32
    pub fn reserve_u32(&mut self) -> U32Slot {
        self.reserve()
    }

    fn reserve<const N: usize>(&mut self) -> Reservation<N> {
        let offset = self.len();
        self.bytes.extend_from_slice(&[0; N]);
        Reservation { offset }
    }

    /// Overwrite the region reserved by `slot` with `value`. Nothing outside the reserved region
    /// is touched.
    pub fn patch_u16(&mut self, slot: U16Slot, value: u16) {
        self.patch(slot, value.to_be_bytes());
    }

    /// Overwrite the region reserved by `slot` with `value`. Nothing outside the reserved region
    /// is touched.
    pub fn patch_u32(&mut self, slot: U32Slot, value: u32) {
        self.patch(slot, value.to_be_bytes());
    }

    fn patch<const N: usize>(&mut self, slot: Reservation<N>, value: [u8; N]) {
        self.bytes[slot.offset..slot.end()].copy_from_slice(&value);
    }

    /// The number of bytes written after the region reserved by `slot`. This is the value a
    /// length prefix wants once its section is complete.
    pub fn written_since<const N: usize>(&self, slot: Reservation<N>) -> usize {
        self.len() - slot.end()
    }

    /// Drop every byte at or after `offset`. Used to take back a half-written entry when the
    /// entry turns out to be invalid. Offsets past the end are ignored.
    pub(crate) fn rewind(&mut self, offset: usize) {
        self.bytes.truncate(offset);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for GrowableBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<GrowableBuffer> for Vec<u8> {
    fn from(buffer: GrowableBuffer) -> Vec<u8> {
        buffer.into_vec()
    }
}

impl Write for GrowableBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use extended_io as eio;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_big_endian() {
        let mut buf = GrowableBuffer::new();
        buf.write_u8(0x01);
        buf.write_u16(0x0203);
        buf.write_u32(0x0405_0607);
        buf.write_u64(0x0809_0A0B_0C0D_0E0F);
        assert_eq!(
            (1..=0x0F).collect::<Vec<u8>>(),
            buf.as_bytes().to_vec(),
        );
    }

    #[test]
    fn writes_float_bit_patterns() {
        let mut buf = GrowableBuffer::new();
        buf.write_f32(1.0);
        buf.write_f64(-2.0);
        assert_eq!(
            vec![0x3F, 0x80, 0, 0, 0xC0, 0, 0, 0, 0, 0, 0, 0],
            buf.into_vec(),
        );
    }

    #[test]
    fn patches_reserved_length_prefix() {
        let mut buf = GrowableBuffer::new();
        buf.write_u8(0xAA);
        let slot = buf.reserve_u16();
        buf.write_bytes(b"hello");
        let length = buf.written_since(slot);
        buf.patch_u16(slot, length as u16);
        buf.write_u8(0xBB);
        assert_eq!(
            vec![0xAA, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o', 0xBB],
            buf.into_vec(),
        );
    }

    #[test]
    fn patch_leaves_neighbours_alone() {
        let mut buf = GrowableBuffer::new();
        buf.write_u16(0xFFFF);
        let slot = buf.reserve_u32();
        buf.write_u16(0xFFFF);
        buf.patch_u32(slot, 0x1234_5678);
        assert_eq!(
            vec![0xFF, 0xFF, 0x12, 0x34, 0x56, 0x78, 0xFF, 0xFF],
            buf.into_vec(),
        );
    }

    #[test]
    fn growth_preserves_offsets() {
        let mut buf = GrowableBuffer::with_capacity(1);
        let slot = buf.reserve_u16();
        for i in 0..10_000u32 {
            buf.write_u8(i as u8);
        }
        buf.patch_u16(slot, 0xBEEF);
        assert_eq!(10_002, buf.len());
        assert_eq!([0xBEu8, 0xEF], buf.as_bytes()[..2]);
        assert_eq!(0x0Fu8, buf.as_bytes()[10_001]);
    }

    #[test]
    fn rewind_discards_tail() {
        let mut buf = GrowableBuffer::new();
        buf.write_u16(0x0102);
        let mark = buf.len();
        buf.write_u32(0xDEAD_BEEF);
        buf.rewind(mark);
        assert_eq!(vec![0x01, 0x02], buf.into_vec());
    }

    #[test]
    fn accepts_extended_io_writers() -> io::Result<()> {
        let mut buf = GrowableBuffer::new();
        eio::write_u16(&mut buf, 0xCAFE)?;
        eio::write_byte_slice(&mut buf, &[0xBA, 0xBE])?;
        assert_eq!(vec![0xCA, 0xFE, 0xBA, 0xBE], buf.into_vec());
        Ok(())
    }
}
