//! Decoding of an encoded constant pool back into entries, for inspecting what a builder
//! produced.

use extended_io as eio;

use std::{io::Read, ops::Index};

use crate::{parsers::jvm8, CrateError, CrateResult};

use super::{CPEntryType, ReferenceKind};

fn read_utf8_cp_entry(src: &mut dyn Read) -> CrateResult<CPEntry> {
    let length = eio::read_u16(src)?.into();
    let bytes = eio::read_bytes(src, length)?;
    let (_, s) = jvm8::parse_jvm8(&bytes)?;
    Ok(CPEntry::Utf8(s))
}

/// An entry in the constant pool.
#[derive(Clone, Debug)]
pub enum CPEntry {
    /// A string. In the class file it is encoded in modified UTF-8.
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    /// The 1-based index of a Utf8 entry holding the internal name of a class.
    Class(u16),
    /// The 1-based index of a Utf8 entry holding the contents of the string.
    String(u16),
    /// The index of the Class entry for the class that owns the referenced field and the index
    /// of the NameAndType entry of the referenced field.
    Fieldref(u16, u16),
    /// Same as Fieldref except that the second index must describe a method.
    Methodref(u16, u16),
    /// Same as Methodref except that the first index must name an interface.
    InterfaceMethodref(u16, u16),
    /// The indices of the Utf8 entries holding the name and the descriptor of a member.
    NameAndType(u16, u16),
    /// The reference kind and the index of the member reference it operates on.
    MethodHandle(ReferenceKind, u16),
    /// The index of a Utf8 entry holding a method descriptor.
    MethodType(u16),
    /// A 0-based index into the bootstrap method table and the index of a NameAndType entry with
    /// a field descriptor.
    Dynamic(u16, u16),
    /// A 0-based index into the bootstrap method table and the index of a NameAndType entry with
    /// a method descriptor.
    InvokeDynamic(u16, u16),
    /// The index of a Utf8 entry naming a module.
    Module(u16),
    /// The index of a Utf8 entry naming a package.
    Package(u16),
    /// The unusable slot following a Long or Double.
    After8Byte,
}

impl CPEntry {
    /// Get the entry type of `self`.
    pub fn r#type(&self) -> CPEntryType {
        match self {
            CPEntry::Utf8(_) => CPEntryType::Utf8,
            CPEntry::Integer(_) => CPEntryType::Integer,
            CPEntry::Float(_) => CPEntryType::Float,
            CPEntry::Long(_) => CPEntryType::Long,
            CPEntry::Double(_) => CPEntryType::Double,
            CPEntry::Class(_) => CPEntryType::Class,
            CPEntry::String(_) => CPEntryType::String,
            CPEntry::Fieldref(_, _) => CPEntryType::Fieldref,
            CPEntry::Methodref(_, _) => CPEntryType::Methodref,
            CPEntry::InterfaceMethodref(_, _) => CPEntryType::InterfaceMethodref,
            CPEntry::NameAndType(_, _) => CPEntryType::NameAndType,
            CPEntry::MethodHandle(_, _) => CPEntryType::MethodHandle,
            CPEntry::MethodType(_) => CPEntryType::MethodType,
            CPEntry::Dynamic(_, _) => CPEntryType::Dynamic,
            CPEntry::InvokeDynamic(_, _) => CPEntryType::InvokeDynamic,
            CPEntry::Module(_) => CPEntryType::Module,
            CPEntry::Package(_) => CPEntryType::Package,
            CPEntry::After8Byte => CPEntryType::After8Byte,
        }
    }

    /// Read a constant pool entry from `src`.
    pub fn read(src: &mut dyn Read) -> CrateResult<CPEntry> {
        match CPEntryType::try_from(eio::read_u8(src)?) {
            Ok(CPEntryType::Utf8) => read_utf8_cp_entry(src),
            Ok(CPEntryType::Integer) => Ok(CPEntry::Integer(eio::read_i32(src)?)),
            Ok(CPEntryType::Float) => Ok(CPEntry::Float(eio::read_f32(src)?)),
            Ok(CPEntryType::Long) => Ok(CPEntry::Long(eio::read_i64(src)?)),
            Ok(CPEntryType::Double) => Ok(CPEntry::Double(eio::read_f64(src)?)),
            Ok(CPEntryType::Class) => Ok(CPEntry::Class(eio::read_u16(src)?)),
            Ok(CPEntryType::String) => Ok(CPEntry::String(eio::read_u16(src)?)),
            Ok(CPEntryType::Fieldref) => {
                let owner_idx = eio::read_u16(src)?;
                let name_and_type_idx = eio::read_u16(src)?;
                Ok(CPEntry::Fieldref(owner_idx, name_and_type_idx))
            }
            Ok(CPEntryType::Methodref) => {
                let owner_idx = eio::read_u16(src)?;
                let name_and_type_idx = eio::read_u16(src)?;
                Ok(CPEntry::Methodref(owner_idx, name_and_type_idx))
            }
            Ok(CPEntryType::InterfaceMethodref) => {
                let owner_idx = eio::read_u16(src)?;
                let name_and_type_idx = eio::read_u16(src)?;
                Ok(CPEntry::InterfaceMethodref(owner_idx, name_and_type_idx))
            }
            Ok(CPEntryType::NameAndType) => {
                let name_idx = eio::read_u16(src)?;
                let type_idx = eio::read_u16(src)?;
                Ok(CPEntry::NameAndType(name_idx, type_idx))
            }
            Ok(CPEntryType::MethodHandle) => {
                let rk = ReferenceKind::try_from(eio::read_u8(src)?)
                    .map_err(|e| CrateError::InvalidReferenceKind { actual: e.number })?;
                let ref_idx = eio::read_u16(src)?;
                Ok(CPEntry::MethodHandle(rk, ref_idx))
            }
            Ok(CPEntryType::MethodType) => Ok(CPEntry::MethodType(eio::read_u16(src)?)),
            Ok(CPEntryType::Dynamic) => {
                let bootstrap_method_idx = eio::read_u16(src)?;
                let name_and_type_idx = eio::read_u16(src)?;
                Ok(CPEntry::Dynamic(bootstrap_method_idx, name_and_type_idx))
            }
            Ok(CPEntryType::InvokeDynamic) => {
                let bootstrap_method_idx = eio::read_u16(src)?;
                let name_and_type_idx = eio::read_u16(src)?;
                Ok(CPEntry::InvokeDynamic(
                    bootstrap_method_idx,
                    name_and_type_idx,
                ))
            }
            Ok(CPEntryType::Module) => Ok(CPEntry::Module(eio::read_u16(src)?)),
            Ok(CPEntryType::Package) => Ok(CPEntry::Package(eio::read_u16(src)?)),
            Ok(CPEntryType::After8Byte) => {
                Err(CrateError::InvalidConstantPoolEntryTag { actual: 0 })
            }
            Err(e) => Err(CrateError::InvalidConstantPoolEntryTag { actual: e.number }),
        }
    }

    /// Render `self` with every pool index it holds followed by the entry at that index.
    pub fn to_string(&self, pool: &ConstantPool) -> CrateResult<String> {
        let ret = match self {
            CPEntry::Utf8(s) => format!(r#"Utf8("{}")"#, s),
            CPEntry::Integer(i) => format!("Integer({})", i),
            CPEntry::Float(f) => format!("Float({})", f),
            CPEntry::Long(l) => format!("Long({})", l),
            CPEntry::Double(d) => format!("Double({})", d),
            CPEntry::Class(idx) => format!("Class({}: {})", idx, pool.get(*idx)?.to_string(pool)?),
            CPEntry::String(idx) => {
                format!("String({}: {})", idx, pool.get(*idx)?.to_string(pool)?)
            }
            CPEntry::Fieldref(owner, nat)
            | CPEntry::Methodref(owner, nat)
            | CPEntry::InterfaceMethodref(owner, nat) => format!(
                "{}({}: {}, {}: {})",
                self.r#type(),
                owner,
                pool.get(*owner)?.to_string(pool)?,
                nat,
                pool.get(*nat)?.to_string(pool)?
            ),
            CPEntry::NameAndType(name_idx, type_idx) => format!(
                "NameAndType({}: {}, {}: {})",
                name_idx,
                pool.get(*name_idx)?.to_string(pool)?,
                type_idx,
                pool.get(*type_idx)?.to_string(pool)?
            ),
            CPEntry::MethodHandle(rk, ref_idx) => format!(
                "MethodHandle({:?}, {}: {})",
                rk,
                ref_idx,
                pool.get(*ref_idx)?.to_string(pool)?
            ),
            CPEntry::MethodType(type_idx) => format!(
                "MethodType({}: {})",
                type_idx,
                pool.get(*type_idx)?.to_string(pool)?
            ),
            // The bootstrap index points into the BootstrapMethods attribute, not the pool.
            CPEntry::Dynamic(bootstrap_idx, nat_idx)
            | CPEntry::InvokeDynamic(bootstrap_idx, nat_idx) => format!(
                "{}(bootstrap {}, {}: {})",
                self.r#type(),
                bootstrap_idx,
                nat_idx,
                pool.get(*nat_idx)?.to_string(pool)?
            ),
            CPEntry::Module(idx) | CPEntry::Package(idx) => format!(
                "{}({}: {})",
                self.r#type(),
                idx,
                pool.get(*idx)?.to_string(pool)?
            ),
            CPEntry::After8Byte => "After8Byte".to_string(),
        };
        Ok(ret)
    }
}

impl PartialEq for CPEntry {
    fn eq(&self, other: &CPEntry) -> bool {
        match (self, other) {
            (CPEntry::Utf8(s), CPEntry::Utf8(t)) => s == t,
            (CPEntry::Integer(x), CPEntry::Integer(y)) => x == y,
            (CPEntry::Float(x), CPEntry::Float(y)) => x.to_bits() == y.to_bits(),
            (CPEntry::Long(x), CPEntry::Long(y)) => x == y,
            (CPEntry::Double(x), CPEntry::Double(y)) => x.to_bits() == y.to_bits(),
            (CPEntry::Class(idx1), CPEntry::Class(idx2))
            | (CPEntry::String(idx1), CPEntry::String(idx2))
            | (CPEntry::MethodType(idx1), CPEntry::MethodType(idx2))
            | (CPEntry::Module(idx1), CPEntry::Module(idx2))
            | (CPEntry::Package(idx1), CPEntry::Package(idx2)) => idx1 == idx2,
            (CPEntry::Fieldref(a1, b1), CPEntry::Fieldref(a2, b2))
            | (CPEntry::Methodref(a1, b1), CPEntry::Methodref(a2, b2))
            | (CPEntry::InterfaceMethodref(a1, b1), CPEntry::InterfaceMethodref(a2, b2))
            | (CPEntry::NameAndType(a1, b1), CPEntry::NameAndType(a2, b2))
            | (CPEntry::Dynamic(a1, b1), CPEntry::Dynamic(a2, b2))
            | (CPEntry::InvokeDynamic(a1, b1), CPEntry::InvokeDynamic(a2, b2)) => {
                a1 == a2 && b1 == b2
            }
            (CPEntry::MethodHandle(kind1, idx1), CPEntry::MethodHandle(kind2, idx2)) => {
                kind1 == kind2 && idx1 == idx2
            }
            (CPEntry::After8Byte, CPEntry::After8Byte) => true,
            (_, _) => false,
        }
    }
}

impl Eq for CPEntry {}

/// A decoded constant pool. All indexing operations are 1-based.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstantPool {
    pool: Vec<CPEntry>,
}

impl ConstantPool {
    /// Read `constant_pool_count` followed by that many slots' worth of entries from `src`.
    pub fn read(src: &mut dyn Read) -> CrateResult<Self> {
        let count = eio::read_u16(src)?;
        let mut pool = Vec::with_capacity(usize::from(count.saturating_sub(1)));
        while pool.len() + 1 < usize::from(count) {
            let entry = CPEntry::read(src)?;
            let slots = entry.r#type().slots();
            pool.push(entry);
            if slots == 2 {
                pool.push(CPEntry::After8Byte);
            }
        }
        Ok(Self { pool })
    }

    /// The number of slots in the pool. Also the largest index which might be valid.
    pub fn size(&self) -> u16 {
        // `read` stops once the slots fill `constant_pool_count`, which is a `u16`.
        self.pool.len() as u16
    }

    /// Every slot in the pool with its index, `After8Byte` holes included.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CPEntry)> + '_ {
        (1..).zip(self.pool.iter())
    }

    fn check_bounds(&self, idx: u16) -> CrateResult<()> {
        let size = self.size();
        if idx == 0 || size < idx {
            Err(CrateError::IndexOutOfBounds { request: idx, size })
        } else {
            Ok(())
        }
    }

    /// Get a reference to the entry in the constant pool at index `idx`.
    pub fn get(&self, idx: u16) -> CrateResult<&CPEntry> {
        self.check_bounds(idx)?;
        Ok(&self.pool[usize::from(idx) - 1])
    }

    /// Get a reference to the string at index `idx`.
    pub fn get_utf8(&self, idx: u16) -> CrateResult<&str> {
        match self.get(idx)? {
            CPEntry::Utf8(s) => Ok(s),
            entry => Err(CrateError::BadEntryType {
                request: idx,
                expected: CPEntryType::Utf8,
                actual: entry.r#type(),
            }),
        }
    }

    /// Get the internal class name the Class entry at index `idx` refers to.
    pub fn get_class_name(&self, idx: u16) -> CrateResult<&str> {
        match self.get(idx)? {
            &CPEntry::Class(name_idx) => self.get_utf8(name_idx),
            entry => Err(CrateError::BadEntryType {
                request: idx,
                expected: CPEntryType::Class,
                actual: entry.r#type(),
            }),
        }
    }
}

impl Index<u16> for ConstantPool {
    type Output = CPEntry;

    fn index(&self, idx: u16) -> &Self::Output {
        &self.pool[usize::from(idx) - 1]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    fn read(bytes: &[u8]) -> CrateResult<ConstantPool> {
        ConstantPool::read(&mut &bytes[..])
    }

    #[test]
    fn reads_entries_with_holes() -> CrateResult<()> {
        let pool = read(&[
            0x00, 0x05, //
            0x01, 0x00, 0x03, b'F', b'o', b'o', //
            0x07, 0x00, 0x01, //
            0x05, 0, 0, 0, 0, 0, 0, 0, 0x2A,
        ])?;
        assert_eq!(4, pool.size());
        assert_eq!("Foo", pool.get_utf8(1)?);
        assert_eq!("Foo", pool.get_class_name(2)?);
        assert_eq!(CPEntry::Long(42), pool[3]);
        assert_eq!(CPEntry::After8Byte, pool[4]);
        Ok(())
    }

    #[test]
    fn index_errors() -> CrateResult<()> {
        let pool = read(&[0x00, 0x02, 0x03, 0, 0, 0, 1])?;
        assert!(matches!(
            pool.get(0),
            Err(CrateError::IndexOutOfBounds { request: 0, size: 1 })
        ));
        assert!(matches!(
            pool.get(2),
            Err(CrateError::IndexOutOfBounds { request: 2, size: 1 })
        ));
        assert!(matches!(
            pool.get_utf8(1),
            Err(CrateError::BadEntryType {
                expected: CPEntryType::Utf8,
                actual: CPEntryType::Integer,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn rejects_unknown_tags() {
        assert!(matches!(
            read(&[0x00, 0x02, 0x02]),
            Err(CrateError::InvalidConstantPoolEntryTag { actual: 2 })
        ));
        assert!(matches!(
            read(&[0x00, 0x02, 0x0F, 0x0A, 0x00, 0x01]),
            Err(CrateError::InvalidReferenceKind { actual: 10 })
        ));
    }

    #[test]
    fn renders_with_references() -> CrateResult<()> {
        let pool = read(&[
            0x00, 0x06, //
            0x01, 0x00, 0x01, b'x', //
            0x01, 0x00, 0x01, b'I', //
            0x0C, 0x00, 0x01, 0x00, 0x02, //
            0x12, 0x00, 0x00, 0x00, 0x03, //
            0x08, 0x00, 0x01,
        ])?;
        assert_eq!(
            r#"InvokeDynamic(bootstrap 0, 3: NameAndType(1: Utf8("x"), 2: Utf8("I")))"#,
            pool[4].to_string(&pool)?,
        );
        assert_eq!(r#"String(1: Utf8("x"))"#, pool[5].to_string(&pool)?);
        Ok(())
    }

    #[test]
    fn truncated_input_is_an_io_error() {
        assert!(matches!(read(&[0x00, 0x02, 0x01, 0x00]), Err(CrateError::Io(_))));
    }
}
