use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::CPEntryType;

/// The kind of action a `CONSTANT_MethodHandle` represents.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, IntoPrimitive, PartialEq, TryFromPrimitive)]
pub enum ReferenceKind {
    /// Read an instance-specific (non-static) field of an object.
    ReadInstanceField = 1,
    /// Read a static field of a class.
    ReadStaticField = 2,
    /// Write an instance-specific (non-static) field of an object.
    WriteInstanceField = 3,
    /// Write a static field of a class.
    WriteStaticField = 4,
    /// Invoke an instance method by walking up the class hierarchy of the object the method is
    /// invoked on.
    InvokeVirtual = 5,
    /// Invoke a static method of a class.
    InvokeStatic = 6,
    /// Invoke an instance method by walking up the class hierarchy of the class named in the
    /// referenced member, not of the receiver.
    InvokeSpecial = 7,
    /// Invoke a method named `<init>` on a freshly allocated object.
    InvokeNew = 8,
    /// Invoke a method declared by an interface.
    InvokeInterface = 9,
}

impl ReferenceKind {
    /// Whether the handle accesses a field rather than invoking a method.
    pub fn is_field_access(self) -> bool {
        matches!(
            self,
            ReferenceKind::ReadInstanceField
                | ReferenceKind::ReadStaticField
                | ReferenceKind::WriteInstanceField
                | ReferenceKind::WriteStaticField
        )
    }
}

/// Which of the three member reference entries a member is named through.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MemberKind {
    Field,
    Method,
    InterfaceMethod,
}

impl MemberKind {
    pub fn tag(self) -> CPEntryType {
        match self {
            MemberKind::Field => CPEntryType::Fieldref,
            MemberKind::Method => CPEntryType::Methodref,
            MemberKind::InterfaceMethod => CPEntryType::InterfaceMethodref,
        }
    }
}

/// A method handle described by the member it accesses rather than by pool indices.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MethodHandle {
    pub kind: ReferenceKind,
    /// Internal name of the class declaring the member, like
    /// `java/lang/invoke/StringConcatFactory`.
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    /// Whether `owner` is an interface. `InvokeStatic` and `InvokeSpecial` handles may point at
    /// interface methods, so this can't be derived from `kind` alone.
    pub is_interface: bool,
}

impl MethodHandle {
    pub fn new(
        kind: ReferenceKind,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            is_interface: kind == ReferenceKind::InvokeInterface,
        }
    }

    /// Mark the owner of the referenced member as an interface.
    pub fn on_interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    /// The kind of member reference this handle points at.
    pub fn member_kind(&self) -> MemberKind {
        if self.kind.is_field_access() {
            MemberKind::Field
        } else if self.is_interface || self.kind == ReferenceKind::InvokeInterface {
            MemberKind::InterfaceMethod
        } else {
            MemberKind::Method
        }
    }
}

/// A bootstrap method together with its static arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct BootstrapMethod {
    pub handle: MethodHandle,
    pub arguments: Vec<ConstantValue>,
}

impl BootstrapMethod {
    pub fn new(handle: MethodHandle, arguments: Vec<ConstantValue>) -> Self {
        Self { handle, arguments }
    }
}

/// A constant computed by a bootstrap method the first time it is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicConstant {
    pub bootstrap: BootstrapMethod,
    pub name: String,
    /// A field descriptor: the type of the computed constant.
    pub descriptor: String,
}

/// Any value that can be loaded from the constant pool, such as the operand of `ldc`, the value
/// of a `ConstantValue` attribute, or a static argument to a bootstrap method.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
    /// Internal name of a class, like `java/lang/Object` or `[I`.
    Class(String),
    /// Internal name of an inline value class.
    ValueClass(String),
    MethodHandle(MethodHandle),
    /// A method descriptor.
    MethodType(String),
    Dynamic(Box<DynamicConstant>),
    /// A module name. Valid in the format but not something this builder encodes.
    Module(String),
    /// A package name. Valid in the format but not something this builder encodes.
    Package(String),
}

impl ConstantValue {
    /// A short name for the kind of value, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstantValue::Int(_) => "Integer",
            ConstantValue::Float(_) => "Float",
            ConstantValue::Long(_) => "Long",
            ConstantValue::Double(_) => "Double",
            ConstantValue::String(_) => "String",
            ConstantValue::Class(_) => "Class",
            ConstantValue::ValueClass(_) => "ValueClass",
            ConstantValue::MethodHandle(_) => "MethodHandle",
            ConstantValue::MethodType(_) => "MethodType",
            ConstantValue::Dynamic(_) => "Dynamic",
            ConstantValue::Module(_) => "Module",
            ConstantValue::Package(_) => "Package",
        }
    }
}

impl From<i32> for ConstantValue {
    fn from(value: i32) -> Self {
        ConstantValue::Int(value)
    }
}

impl From<f32> for ConstantValue {
    fn from(value: f32) -> Self {
        ConstantValue::Float(value)
    }
}

impl From<i64> for ConstantValue {
    fn from(value: i64) -> Self {
        ConstantValue::Long(value)
    }
}

impl From<f64> for ConstantValue {
    fn from(value: f64) -> Self {
        ConstantValue::Double(value)
    }
}

impl From<&str> for ConstantValue {
    fn from(value: &str) -> Self {
        ConstantValue::String(value.to_string())
    }
}

impl From<String> for ConstantValue {
    fn from(value: String) -> Self {
        ConstantValue::String(value)
    }
}

impl From<MethodHandle> for ConstantValue {
    fn from(handle: MethodHandle) -> Self {
        ConstantValue::MethodHandle(handle)
    }
}

impl From<DynamicConstant> for ConstantValue {
    fn from(constant: DynamicConstant) -> Self {
        ConstantValue::Dynamic(Box::new(constant))
    }
}

/// The owner, name, and descriptor shared by the three member reference kinds.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MemberKey {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// The structural identity of a constant pool entry. Two keys are equal exactly when the entries
/// they produce are byte-for-byte identical, so floating point values are compared by bit
/// pattern and references are compared by what they name.
///
/// Dynamic entries name their bootstrap method by its already-assigned index in the bootstrap
/// method table, since bootstrap methods are deduplicated separately.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum EntryKey {
    Utf8(String),
    Class(String),
    /// Always maps to the same index as `Class("Q<name>;")`.
    ValueClass(String),
    String(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    NameAndType { name: String, descriptor: String },
    FieldRef(MemberKey),
    MethodRef(MemberKey),
    InterfaceMethodRef(MemberKey),
    /// A handle is identified by its kind and the member reference it is written with, not by
    /// how that reference was described.
    MethodHandle {
        kind: ReferenceKind,
        reference: Box<EntryKey>,
    },
    MethodType(String),
    InvokeDynamic { bootstrap: u16, name: String, descriptor: String },
    ConstantDynamic { bootstrap: u16, name: String, descriptor: String },
}

impl EntryKey {
    pub fn float(value: f32) -> Self {
        EntryKey::Float(value.to_bits())
    }

    pub fn double(value: f64) -> Self {
        EntryKey::Double(value.to_bits())
    }

    pub fn member(kind: MemberKind, owner: &str, name: &str, descriptor: &str) -> Self {
        let member = MemberKey {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        };
        match kind {
            MemberKind::Field => EntryKey::FieldRef(member),
            MemberKind::Method => EntryKey::MethodRef(member),
            MemberKind::InterfaceMethod => EntryKey::InterfaceMethodRef(member),
        }
    }

    pub fn method_handle(handle: &MethodHandle) -> Self {
        EntryKey::MethodHandle {
            kind: handle.kind,
            reference: Box::new(EntryKey::member(
                handle.member_kind(),
                &handle.owner,
                &handle.name,
                &handle.descriptor,
            )),
        }
    }

    /// The tag of the entry this key is written as. A `ValueClass` is written as a `Class` entry.
    pub fn tag(&self) -> CPEntryType {
        match self {
            EntryKey::Utf8(_) => CPEntryType::Utf8,
            EntryKey::Class(_) | EntryKey::ValueClass(_) => CPEntryType::Class,
            EntryKey::String(_) => CPEntryType::String,
            EntryKey::Integer(_) => CPEntryType::Integer,
            EntryKey::Float(_) => CPEntryType::Float,
            EntryKey::Long(_) => CPEntryType::Long,
            EntryKey::Double(_) => CPEntryType::Double,
            EntryKey::NameAndType { .. } => CPEntryType::NameAndType,
            EntryKey::FieldRef(_) => CPEntryType::Fieldref,
            EntryKey::MethodRef(_) => CPEntryType::Methodref,
            EntryKey::InterfaceMethodRef(_) => CPEntryType::InterfaceMethodref,
            EntryKey::MethodHandle { .. } => CPEntryType::MethodHandle,
            EntryKey::MethodType(_) => CPEntryType::MethodType,
            EntryKey::InvokeDynamic { .. } => CPEntryType::InvokeDynamic,
            EntryKey::ConstantDynamic { .. } => CPEntryType::Dynamic,
        }
    }
}
