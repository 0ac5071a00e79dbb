//! The byte-level half of the constant pool. Every method here takes indices which have already
//! been resolved, appends exactly one entry, and hands back the index it was given. Nothing is
//! deduplicated at this level; see [`PoolHelper`] for that.
//!
//! [`PoolHelper`]: super::PoolHelper

use crate::{buffer::GrowableBuffer, CrateError, CrateResult};

use super::{CPEntryType, MemberKind, ReferenceKind};

/// The largest value the `u2` length prefix of a `CONSTANT_Utf8` entry can hold.
pub const MAX_UTF8_LENGTH: usize = 0xFFFF;

/// The largest value `constant_pool_count` can hold. Since the count is one more than the number
/// of slots in use, this is also the first index which can never be assigned.
const MAX_POOL_COUNT: u32 = 0xFFFF;

/// The number of bytes `unit` takes up in modified UTF-8.
fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        _ => 3,
    }
}

/// The number of bytes `s` takes up in modified UTF-8, not counting the length prefix.
pub fn modified_utf8_len(s: &str) -> usize {
    s.encode_utf16().map(unit_len).sum()
}

/// Fail with [`CrateError::SizeExceeded`] if `s` can't be written as a Utf8 entry.
pub fn check_utf8_len(s: &str) -> CrateResult<()> {
    let size = if s.len() > MAX_UTF8_LENGTH {
        s.len()
    } else {
        modified_utf8_len(s)
    };
    if size > MAX_UTF8_LENGTH {
        Err(CrateError::SizeExceeded {
            what: "Utf8 constant",
            size,
            limit: MAX_UTF8_LENGTH,
        })
    } else {
        Ok(())
    }
}

/// Append `s` to `buf` in the modified UTF-8 used by class files, without a length prefix.
///
/// Each UTF-16 code unit is encoded on its own, so `NUL` takes two bytes and a supplementary
/// character becomes two three-byte surrogates.
pub fn write_modified_utf8(buf: &mut GrowableBuffer, s: &str) {
    for unit in s.encode_utf16() {
        match unit_len(unit) {
            1 => buf.write_u8(unit as u8),
            2 => {
                buf.write_u8(0xC0 | (unit >> 6) as u8);
                buf.write_u8(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                buf.write_u8(0xE0 | (unit >> 12) as u8);
                buf.write_u8(0x80 | ((unit >> 6) & 0x3F) as u8);
                buf.write_u8(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
}

/// Writes tagged constant pool entries into a [`GrowableBuffer`] and allocates their indices.
#[derive(Clone, Debug)]
pub struct PoolBuilder {
    buf: GrowableBuffer,
    /// The index the next entry will receive. Starts at 1 since index 0 is never valid.
    next_index: u32,
    entries: usize,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder whose buffer will hold `capacity` bytes before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: GrowableBuffer::with_capacity(capacity),
            next_index: 1,
            entries: 0,
        }
    }

    /// The value of `constant_pool_count` for the entries written so far: one more than the
    /// number of slots in use.
    pub fn size(&self) -> u16 {
        // `allocate` never lets `next_index` past `MAX_POOL_COUNT`.
        self.next_index as u16
    }

    /// The number of entries written so far. Smaller than `size() - 1` whenever a `Long` or
    /// `Double` has been written.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// The encoded entries, without the count.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    /// Give up the builder, returning the encoded entries and `constant_pool_count`.
    pub fn into_parts(self) -> (GrowableBuffer, u16) {
        let size = self.size();
        (self.buf, size)
    }

    /// Fail unless an entry of type `tag` still fits, without changing anything.
    fn check_room(&self, tag: CPEntryType) -> CrateResult<u16> {
        let index = self.next_index;
        if index + u32::from(tag.slots()) > MAX_POOL_COUNT {
            Err(CrateError::ConstantPoolFull)
        } else {
            Ok(index as u16)
        }
    }

    /// Write the tag of a new entry and allocate its index.
    fn allocate(&mut self, tag: CPEntryType) -> CrateResult<u16> {
        let index = self.check_room(tag)?;
        self.buf.write_u8(tag.into());
        self.next_index += u32::from(tag.slots());
        self.entries += 1;
        Ok(index)
    }

    /// Append a `CONSTANT_Utf8` entry holding `s`.
    ///
    /// Fails with [`CrateError::SizeExceeded`] if the encoded form of `s` is longer than
    /// [`MAX_UTF8_LENGTH`] bytes. Nothing is left in the buffer when that happens.
    pub fn utf8(&mut self, s: &str) -> CrateResult<u16> {
        // Modified UTF-8 is never shorter than standard UTF-8.
        if s.len() > MAX_UTF8_LENGTH {
            return Err(CrateError::SizeExceeded {
                what: "Utf8 constant",
                size: s.len(),
                limit: MAX_UTF8_LENGTH,
            });
        }
        self.check_room(CPEntryType::Utf8)?;
        let start = self.buf.len();
        self.buf.write_u8(CPEntryType::Utf8.into());
        let length_slot = self.buf.reserve_u16();
        write_modified_utf8(&mut self.buf, s);
        let length = self.buf.written_since(length_slot);
        if length > MAX_UTF8_LENGTH {
            self.buf.rewind(start);
            return Err(CrateError::SizeExceeded {
                what: "Utf8 constant",
                size: length,
                limit: MAX_UTF8_LENGTH,
            });
        }
        self.buf.patch_u16(length_slot, length as u16);
        let index = self.next_index as u16;
        self.next_index += 1;
        self.entries += 1;
        Ok(index)
    }

    pub fn integer(&mut self, value: i32) -> CrateResult<u16> {
        let index = self.allocate(CPEntryType::Integer)?;
        self.buf.write_i32(value);
        Ok(index)
    }

    pub fn float(&mut self, value: f32) -> CrateResult<u16> {
        let index = self.allocate(CPEntryType::Float)?;
        self.buf.write_f32(value);
        Ok(index)
    }

    /// Append a `CONSTANT_Long`. The entry takes up two indices; the second is never valid.
    pub fn long(&mut self, value: i64) -> CrateResult<u16> {
        let index = self.allocate(CPEntryType::Long)?;
        self.buf.write_i64(value);
        Ok(index)
    }

    /// Append a `CONSTANT_Double`. The entry takes up two indices; the second is never valid.
    pub fn double(&mut self, value: f64) -> CrateResult<u16> {
        let index = self.allocate(CPEntryType::Double)?;
        self.buf.write_f64(value);
        Ok(index)
    }

    /// `name` must be the index of a Utf8 entry holding an internal class name.
    pub fn class(&mut self, name: u16) -> CrateResult<u16> {
        self.single_ref(CPEntryType::Class, name)
    }

    /// `value` must be the index of a Utf8 entry.
    pub fn string(&mut self, value: u16) -> CrateResult<u16> {
        self.single_ref(CPEntryType::String, value)
    }

    /// `descriptor` must be the index of a Utf8 entry holding a method descriptor.
    pub fn method_type(&mut self, descriptor: u16) -> CrateResult<u16> {
        self.single_ref(CPEntryType::MethodType, descriptor)
    }

    pub fn name_and_type(&mut self, name: u16, descriptor: u16) -> CrateResult<u16> {
        self.double_ref(CPEntryType::NameAndType, name, descriptor)
    }

    pub fn field_ref(&mut self, class: u16, name_and_type: u16) -> CrateResult<u16> {
        self.member_ref(MemberKind::Field, class, name_and_type)
    }

    pub fn method_ref(&mut self, class: u16, name_and_type: u16) -> CrateResult<u16> {
        self.member_ref(MemberKind::Method, class, name_and_type)
    }

    pub fn interface_method_ref(&mut self, class: u16, name_and_type: u16) -> CrateResult<u16> {
        self.member_ref(MemberKind::InterfaceMethod, class, name_and_type)
    }

    /// Append whichever of `Fieldref`, `Methodref`, and `InterfaceMethodref` `kind` names.
    pub fn member_ref(
        &mut self,
        kind: MemberKind,
        class: u16,
        name_and_type: u16,
    ) -> CrateResult<u16> {
        self.double_ref(kind.tag(), class, name_and_type)
    }

    /// `reference` must be the index of the member reference `kind` operates on.
    pub fn method_handle(&mut self, kind: ReferenceKind, reference: u16) -> CrateResult<u16> {
        let index = self.allocate(CPEntryType::MethodHandle)?;
        self.buf.write_u8(kind.into());
        self.buf.write_u16(reference);
        Ok(index)
    }

    /// `bootstrap` is an index into the bootstrap method table, not into the pool.
    pub fn invoke_dynamic(&mut self, bootstrap: u16, name_and_type: u16) -> CrateResult<u16> {
        self.double_ref(CPEntryType::InvokeDynamic, bootstrap, name_and_type)
    }

    /// `bootstrap` is an index into the bootstrap method table, not into the pool.
    pub fn constant_dynamic(&mut self, bootstrap: u16, name_and_type: u16) -> CrateResult<u16> {
        self.double_ref(CPEntryType::Dynamic, bootstrap, name_and_type)
    }

    fn single_ref(&mut self, tag: CPEntryType, target: u16) -> CrateResult<u16> {
        let index = self.allocate(tag)?;
        self.buf.write_u16(target);
        Ok(index)
    }

    fn double_ref(&mut self, tag: CPEntryType, first: u16, second: u16) -> CrateResult<u16> {
        let index = self.allocate(tag)?;
        self.buf.write_u16(first);
        self.buf.write_u16(second);
        Ok(index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::parsers::jvm8::parse_jvm8;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn encode(s: &str) -> Vec<u8> {
        let mut buf = GrowableBuffer::new();
        write_modified_utf8(&mut buf, s);
        buf.into_vec()
    }

    #[test]
    fn one_byte_range() {
        assert_eq!(vec![0x01], encode("\u{1}"));
        assert_eq!(vec![0x7F], encode("\u{7F}"));
        assert_eq!(b"Foo".to_vec(), encode("Foo"));
    }

    #[test]
    fn nul_takes_two_bytes() {
        assert_eq!(vec![0xC0, 0x80], encode("\0"));
        assert_eq!(2, modified_utf8_len("\0"));
    }

    #[test]
    fn two_and_three_byte_boundaries() {
        assert_eq!(vec![0xC2, 0x80], encode("\u{80}"));
        assert_eq!(vec![0xDF, 0xBF], encode("\u{7FF}"));
        assert_eq!(vec![0xE0, 0xA0, 0x80], encode("\u{800}"));
        assert_eq!(vec![0xEF, 0xBF, 0xBF], encode("\u{FFFF}"));
    }

    #[test]
    fn supplementary_characters_become_surrogates() {
        assert_eq!(
            vec![0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80],
            encode("\u{1F600}"),
        );
        assert_eq!(6, modified_utf8_len("\u{1F600}"));
    }

    #[test]
    fn utf8_entry_layout() -> CrateResult<()> {
        let mut pool = PoolBuilder::new();
        assert_eq!(1, pool.utf8("a\u{80}")?);
        assert_eq!(vec![0x01, 0x00, 0x03, b'a', 0xC2, 0x80], pool.as_bytes().to_vec());
        assert_eq!(2, pool.size());
        Ok(())
    }

    #[test]
    fn fixed_width_entries() -> CrateResult<()> {
        let mut pool = PoolBuilder::new();
        assert_eq!(1, pool.integer(-1)?);
        assert_eq!(2, pool.float(1.0)?);
        assert_eq!(3, pool.class(0x0102)?);
        assert_eq!(4, pool.method_handle(ReferenceKind::InvokeStatic, 0x0003)?);
        assert_eq!(5, pool.method_ref(3, 9)?);
        assert_eq!(
            vec![
                0x03, 0xFF, 0xFF, 0xFF, 0xFF, //
                0x04, 0x3F, 0x80, 0x00, 0x00, //
                0x07, 0x01, 0x02, //
                0x0F, 0x06, 0x00, 0x03, //
                0x0A, 0x00, 0x03, 0x00, 0x09,
            ],
            pool.as_bytes().to_vec(),
        );
        Ok(())
    }

    #[test]
    fn wide_entries_take_two_slots() -> CrateResult<()> {
        let mut pool = PoolBuilder::new();
        assert_eq!(1, pool.long(1)?);
        assert_eq!(3, pool.double(2.0)?);
        assert_eq!(5, pool.integer(3)?);
        assert_eq!(6, pool.size());
        assert_eq!(3, pool.entry_count());
        Ok(())
    }

    #[test]
    fn dynamic_entries_use_distinct_tags() -> CrateResult<()> {
        let mut pool = PoolBuilder::new();
        pool.invoke_dynamic(0, 7)?;
        pool.constant_dynamic(1, 7)?;
        assert_eq!(
            vec![0x12, 0x00, 0x00, 0x00, 0x07, 0x11, 0x00, 0x01, 0x00, 0x07],
            pool.as_bytes().to_vec(),
        );
        Ok(())
    }

    #[test]
    fn oversized_ascii_is_rejected_up_front() {
        let mut pool = PoolBuilder::new();
        let s = "a".repeat(MAX_UTF8_LENGTH + 1);
        assert!(matches!(
            pool.utf8(&s),
            Err(CrateError::SizeExceeded { size: 0x10000, .. })
        ));
        assert!(pool.as_bytes().is_empty());
        assert_eq!(1, pool.size());
    }

    #[test]
    fn oversized_encoding_is_rolled_back() -> CrateResult<()> {
        let mut pool = PoolBuilder::new();
        pool.utf8("keep")?;
        let before = pool.as_bytes().to_vec();
        // Short enough in UTF-8, too long once every NUL takes two bytes.
        let s = "\0".repeat(0x8000);
        assert!(matches!(
            pool.utf8(&s),
            Err(CrateError::SizeExceeded { size: 0x10000, .. })
        ));
        assert_eq!(before, pool.as_bytes().to_vec());
        assert_eq!(2, pool.size());
        assert_eq!(1, pool.entry_count());
        Ok(())
    }

    #[test]
    fn longest_string_fits() -> CrateResult<()> {
        let mut pool = PoolBuilder::new();
        let s = "a".repeat(MAX_UTF8_LENGTH);
        pool.utf8(&s)?;
        assert_eq!([0xFFu8, 0xFF], pool.as_bytes()[1..3]);
        Ok(())
    }

    #[test]
    fn pool_fills_up() -> CrateResult<()> {
        let mut pool = PoolBuilder::new();
        for i in 0..0xFFFD {
            pool.integer(i)?;
        }
        assert_eq!(0xFFFE, pool.size());
        assert!(matches!(pool.long(0), Err(CrateError::ConstantPoolFull)));
        assert_eq!(0xFFFE, pool.integer(0)?);
        assert!(matches!(pool.integer(0), Err(CrateError::ConstantPoolFull)));
        assert!(matches!(pool.utf8(""), Err(CrateError::ConstantPoolFull)));
        assert_eq!(0xFFFF, pool.size());
        Ok(())
    }

    proptest! {
        #[test]
        fn length_prefix_matches_encoding(s in any::<String>()) {
            let mut pool = PoolBuilder::new();
            pool.utf8(&s).unwrap();
            let bytes = pool.as_bytes();
            let prefix = usize::from(u16::from_be_bytes([bytes[1], bytes[2]]));
            prop_assert_eq!(bytes.len() - 3, prefix);
            prop_assert_eq!(modified_utf8_len(&s), prefix);
            let (_, decoded) = parse_jvm8(&bytes[3..]).unwrap();
            prop_assert_eq!(s, decoded);
        }
    }
}
