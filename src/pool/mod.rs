//! Everything that goes into the constant pool: the symbolic keys callers ask for, the table
//! which deduplicates them, the byte-level writer, and a reader for inspecting the result.

use std::fmt::{self, Debug, Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};

pub mod builder;
pub mod helper;
pub mod intern;
pub mod key;
pub mod reader;

pub use builder::PoolBuilder;
pub use helper::{BootstrapTable, BuiltPool, PoolHelper};
pub use intern::InternTable;
pub use key::{
    BootstrapMethod, ConstantValue, DynamicConstant, EntryKey, MemberKind, MethodHandle,
    ReferenceKind,
};
pub use reader::{CPEntry, ConstantPool};

/// The tag on a constant pool entry.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, IntoPrimitive, PartialEq, TryFromPrimitive)]
pub enum CPEntryType {
    /// The entry is a string of Unicode codepoints encoded according to the modified version of
    /// UTF-8 described at
    /// <https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4.7>.
    Utf8 = 0x01,
    /// The entry is a 4-byte integer value.
    Integer = 0x03,
    /// The entry is a 4-byte floating point value.
    Float = 0x04,
    /// The entry is an 8-byte integer value. It uses up two indices.
    Long = 0x05,
    /// The entry is an 8-byte floating point value. It uses up two indices.
    Double = 0x06,
    /// The entry is a reference to an entry of type Utf8 which represents the internal name of a
    /// class.
    Class = 0x07,
    /// The entry is a reference to an entry of type Utf8 holding the value of a string literal.
    String = 0x08,
    /// A reference to a Class entry and a reference to a NameAndType entry describing a field.
    Fieldref = 0x09,
    /// A reference to a Class entry for a non-interface type and a reference to a NameAndType
    /// entry describing a method.
    Methodref = 0x0A,
    /// A reference to a Class entry for an interface and a reference to a NameAndType entry
    /// describing a method.
    InterfaceMethodref = 0x0B,
    /// A pair of references to Utf8 entries: the name of a member and its descriptor.
    NameAndType = 0x0C,
    /// A reference kind in `1..=9` followed by a reference to the `Fieldref`, `Methodref`, or
    /// `InterfaceMethodref` it operates on.
    MethodHandle = 0x0F,
    /// A reference to a Utf8 entry which holds a method descriptor.
    MethodType = 0x10,
    /// An index into the bootstrap method table and a reference to a NameAndType entry with a
    /// field descriptor.
    Dynamic = 0x11,
    /// An index into the bootstrap method table and a reference to a NameAndType entry with a
    /// method descriptor.
    InvokeDynamic = 0x12,
    /// A reference to a Utf8 entry naming a module. Only valid in `module-info` classes.
    Module = 0x13,
    /// A reference to a Utf8 entry naming a package. Only valid in `module-info` classes.
    Package = 0x14,
    /// The entry follows a `Long` or `Double`.
    After8Byte = 0x00,
}

impl CPEntryType {
    /// The number of indices an entry of this type takes up in the constant pool.
    pub fn slots(self) -> u16 {
        match self {
            CPEntryType::Long | CPEntryType::Double => 2,
            _ => 1,
        }
    }
}

impl Display for CPEntryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}
