//! The symbolic, deduplicating half of the constant pool.
//!
//! Every request goes through the same steps: build an [`EntryKey`], return the index already
//! assigned to an equal key if there is one, and otherwise resolve every entry the new entry
//! points at before writing the new entry itself. Because dependencies are always written first,
//! no entry ever refers to an index which has not been assigned yet.

use log::trace;

use crate::{
    buffer::GrowableBuffer, config::BuilderConfig, parsers::names::check_member_name, CrateError,
    CrateResult,
};

use super::{
    builder::check_utf8_len, BootstrapMethod, ConstantValue, DynamicConstant, EntryKey,
    InternTable, MemberKind, MethodHandle, PoolBuilder,
};

/// The name of the class attribute which holds the bootstrap method table.
pub const BOOTSTRAP_METHODS: &str = "BootstrapMethods";

/// A bootstrap method whose handle and static arguments have all been resolved to pool indices.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct BootstrapKey {
    handle: u16,
    arguments: Vec<u16>,
}

/// The `BootstrapMethods` attribute of a finished pool.
#[derive(Clone, Debug)]
pub struct BootstrapTable {
    /// The index of the Utf8 entry `"BootstrapMethods"`.
    pub name_index: u16,
    /// The value of `num_bootstrap_methods`.
    pub count: u16,
    /// The encoded `bootstrap_methods` array, without the count.
    pub entries: GrowableBuffer,
}

impl BootstrapTable {
    /// Append the whole attribute, name and length included, to `buf`.
    pub fn write(&self, buf: &mut GrowableBuffer) -> CrateResult<()> {
        buf.write_u16(self.name_index);
        let length = buf.reserve_u32();
        buf.write_u16(self.count);
        buf.write_buffer(&self.entries);
        let written = buf.written_since(length);
        let written = u32::try_from(written).map_err(|_| CrateError::SizeExceeded {
            what: "BootstrapMethods attribute",
            size: written,
            limit: u32::MAX as usize,
        })?;
        buf.patch_u32(length, written);
        Ok(())
    }
}

/// The frozen result of [`PoolHelper::build`].
#[derive(Clone, Debug)]
pub struct BuiltPool {
    /// The value of `constant_pool_count`.
    pub size: u16,
    /// The encoded entries, in the order their indices were assigned.
    pub entries: GrowableBuffer,
    /// Present exactly when at least one dynamic constant or call site was resolved.
    pub bootstrap_methods: Option<BootstrapTable>,
}

impl BuiltPool {
    /// Append `constant_pool_count` followed by every entry to `buf`.
    pub fn write(&self, buf: &mut GrowableBuffer) {
        buf.write_u16(self.size);
        buf.write_buffer(&self.entries);
    }
}

/// Hands out constant pool indices for symbolic constants, writing each distinct constant exactly
/// once.
#[derive(Clone, Debug, Default)]
pub struct PoolHelper {
    builder: PoolBuilder,
    entries: InternTable<EntryKey>,
    bootstrap_methods: InternTable<BootstrapKey>,
    bootstrap_buf: GrowableBuffer,
}

impl PoolHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &BuilderConfig) -> Self {
        Self {
            builder: PoolBuilder::new(),
            entries: InternTable::with_capacity(config.initial_pool_capacity),
            bootstrap_methods: InternTable::with_capacity(config.initial_bootstrap_capacity),
            bootstrap_buf: GrowableBuffer::new(),
        }
    }

    /// The value `constant_pool_count` would have if the pool were built now.
    pub fn size(&self) -> u16 {
        self.builder.size()
    }

    /// The number of distinct entries written so far.
    pub fn entry_count(&self) -> usize {
        self.builder.entry_count()
    }

    /// The number of distinct bootstrap methods resolved so far.
    pub fn bootstrap_method_count(&self) -> usize {
        self.bootstrap_methods.len()
    }

    /// The encoded entries written so far, without the count.
    pub fn entry_bytes(&self) -> &[u8] {
        self.builder.as_bytes()
    }

    /// Get the index of the entry for `key` if it has already been written.
    pub fn lookup(&self, key: &EntryKey) -> Option<u16> {
        self.entries.lookup(key)
    }

    /// Return the index of `key`, calling `resolve` to write it if it isn't present yet.
    /// `resolve` must resolve every entry the new entry refers to before writing the entry.
    fn intern<F>(&mut self, key: EntryKey, resolve: F) -> CrateResult<u16>
    where
        F: FnOnce(&mut Self) -> CrateResult<u16>,
    {
        if let Some(index) = self.entries.lookup(&key) {
            return Ok(index);
        }
        let index = resolve(self)?;
        trace!("Added {} constant at index {}: {:?}", key.tag(), index, key);
        Ok(self.entries.enter(key, index))
    }

    /// Ensure that `s` is present in the constant pool as a Utf8 entry.
    pub fn utf8(&mut self, s: &str) -> CrateResult<u16> {
        self.intern(EntryKey::Utf8(s.to_string()), |pool| pool.builder.utf8(s))
    }

    /// Ensure that the class with internal name `name` is present in the constant pool.
    pub fn class(&mut self, name: &str) -> CrateResult<u16> {
        self.intern(EntryKey::Class(name.to_string()), |pool| {
            let name = pool.utf8(name)?;
            pool.builder.class(name)
        })
    }

    /// Ensure that the inline value class with internal name `name` is present in the constant
    /// pool. The entry is the `Class` entry named by the descriptor `Q<name>;`, so it is never
    /// shared with the plain `Class` entry for `name` but is the same entry as `class("Q<name>;")`.
    pub fn value_class(&mut self, name: &str) -> CrateResult<u16> {
        self.intern(EntryKey::ValueClass(name.to_string()), |pool| {
            pool.class(&format!("Q{};", name))
        })
    }

    /// Ensure that the string literal `s` is present in the constant pool.
    pub fn string(&mut self, s: &str) -> CrateResult<u16> {
        self.intern(EntryKey::String(s.to_string()), |pool| {
            let value = pool.utf8(s)?;
            pool.builder.string(value)
        })
    }

    pub fn integer(&mut self, value: i32) -> CrateResult<u16> {
        self.intern(EntryKey::Integer(value), |pool| pool.builder.integer(value))
    }

    /// Floats are deduplicated by bit pattern, so `0.0` and `-0.0` get separate entries and
    /// every `NaN` with the same payload shares one.
    pub fn float(&mut self, value: f32) -> CrateResult<u16> {
        self.intern(EntryKey::float(value), |pool| pool.builder.float(value))
    }

    pub fn long(&mut self, value: i64) -> CrateResult<u16> {
        self.intern(EntryKey::Long(value), |pool| pool.builder.long(value))
    }

    pub fn double(&mut self, value: f64) -> CrateResult<u16> {
        self.intern(EntryKey::double(value), |pool| pool.builder.double(value))
    }

    /// Ensure that `value` is present in the constant pool. See [`integer`].
    ///
    /// [`integer`]: #method.integer
    pub fn boolean(&mut self, value: bool) -> CrateResult<u16> {
        self.integer(i32::from(value))
    }

    /// Ensure that `value` is present in the constant pool. See [`integer`].
    ///
    /// [`integer`]: #method.integer
    pub fn byte(&mut self, value: i8) -> CrateResult<u16> {
        self.integer(i32::from(value))
    }

    /// Ensure that `value` is present in the constant pool. See [`integer`].
    ///
    /// [`integer`]: #method.integer
    pub fn short(&mut self, value: i16) -> CrateResult<u16> {
        self.integer(i32::from(value))
    }

    /// Ensure that the UTF-16 code unit `value` is present in the constant pool. See
    /// [`integer`].
    ///
    /// [`integer`]: #method.integer
    pub fn char(&mut self, value: u16) -> CrateResult<u16> {
        self.integer(i32::from(value))
    }

    /// Ensure that the name and descriptor of a member are present in the constant pool.
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> CrateResult<u16> {
        check_member_name(name, descriptor)?;
        let key = EntryKey::NameAndType {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        };
        self.intern(key, |pool| {
            let name = pool.utf8(name)?;
            let descriptor = pool.utf8(descriptor)?;
            pool.builder.name_and_type(name, descriptor)
        })
    }

    /// Ensure that a reference to the member `name` of `owner` is present in the constant pool.
    pub fn member_ref(
        &mut self,
        kind: MemberKind,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> CrateResult<u16> {
        check_member_name(name, descriptor)?;
        self.intern(EntryKey::member(kind, owner, name, descriptor), |pool| {
            let class = pool.class(owner)?;
            let name_and_type = pool.name_and_type(name, descriptor)?;
            pool.builder.member_ref(kind, class, name_and_type)
        })
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> CrateResult<u16> {
        self.member_ref(MemberKind::Field, owner, name, descriptor)
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> CrateResult<u16> {
        self.member_ref(MemberKind::Method, owner, name, descriptor)
    }

    pub fn interface_method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> CrateResult<u16> {
        self.member_ref(MemberKind::InterfaceMethod, owner, name, descriptor)
    }

    /// Ensure that `handle` is present in the constant pool along with the member reference it
    /// operates on.
    pub fn method_handle(&mut self, handle: &MethodHandle) -> CrateResult<u16> {
        check_member_name(&handle.name, &handle.descriptor)?;
        self.intern(EntryKey::method_handle(handle), |pool| {
            let reference = pool.member_ref(
                handle.member_kind(),
                &handle.owner,
                &handle.name,
                &handle.descriptor,
            )?;
            pool.builder.method_handle(handle.kind, reference)
        })
    }

    /// Ensure that the method descriptor `descriptor` is present in the constant pool as a
    /// `MethodType`.
    pub fn method_type(&mut self, descriptor: &str) -> CrateResult<u16> {
        self.intern(EntryKey::MethodType(descriptor.to_string()), |pool| {
            let descriptor = pool.utf8(descriptor)?;
            pool.builder.method_type(descriptor)
        })
    }

    /// Ensure that `bootstrap` is present in the bootstrap method table and return its 0-based
    /// index in that table. The handle and static arguments are resolved into the pool first,
    /// so two bootstrap methods are shared exactly when they resolve to the same indices.
    pub fn bootstrap_method(&mut self, bootstrap: &BootstrapMethod) -> CrateResult<u16> {
        let count = bootstrap.arguments.len();
        if count > usize::from(u16::MAX) {
            return Err(CrateError::TooMany {
                what: "bootstrap method arguments",
                count,
            });
        }
        let handle = self.method_handle(&bootstrap.handle)?;
        let arguments = bootstrap
            .arguments
            .iter()
            .map(|argument| self.put_value(argument))
            .collect::<CrateResult<Vec<_>>>()?;
        let key = BootstrapKey { handle, arguments };
        if let Some(index) = self.bootstrap_methods.lookup(&key) {
            return Ok(index);
        }
        let index = self.bootstrap_methods.len();
        if index >= usize::from(u16::MAX) {
            return Err(CrateError::TooMany {
                what: "bootstrap methods",
                count: index + 1,
            });
        }
        let index = index as u16;
        self.bootstrap_buf.write_u16(key.handle);
        self.bootstrap_buf.write_u16(count as u16);
        for &argument in &key.arguments {
            self.bootstrap_buf.write_u16(argument);
        }
        trace!(
            "Added bootstrap method {} for handle {} with {} arguments",
            index,
            key.handle,
            count,
        );
        Ok(self.bootstrap_methods.enter(key, index))
    }

    /// Ensure that a dynamic call site named `name` with method descriptor `descriptor` and
    /// bootstrapped by `bootstrap` is present in the constant pool.
    pub fn invoke_dynamic(
        &mut self,
        bootstrap: &BootstrapMethod,
        name: &str,
        descriptor: &str,
    ) -> CrateResult<u16> {
        check_member_name(name, descriptor)?;
        check_utf8_len(name)?;
        check_utf8_len(descriptor)?;
        let bootstrap = self.bootstrap_method(bootstrap)?;
        let key = EntryKey::InvokeDynamic {
            bootstrap,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        };
        self.intern(key, |pool| {
            let name_and_type = pool.name_and_type(name, descriptor)?;
            pool.builder.invoke_dynamic(bootstrap, name_and_type)
        })
    }

    /// Ensure that `constant` is present in the constant pool as a `Dynamic` entry.
    pub fn constant_dynamic(&mut self, constant: &DynamicConstant) -> CrateResult<u16> {
        check_member_name(&constant.name, &constant.descriptor)?;
        check_utf8_len(&constant.name)?;
        check_utf8_len(&constant.descriptor)?;
        let bootstrap = self.bootstrap_method(&constant.bootstrap)?;
        let key = EntryKey::ConstantDynamic {
            bootstrap,
            name: constant.name.clone(),
            descriptor: constant.descriptor.clone(),
        };
        self.intern(key, |pool| {
            let name_and_type = pool.name_and_type(&constant.name, &constant.descriptor)?;
            pool.builder.constant_dynamic(bootstrap, name_and_type)
        })
    }

    /// Ensure that `value` is present in the constant pool as whichever kind of entry it
    /// describes.
    ///
    /// Fails with [`CrateError::UnsupportedConstant`] for module and package names, which this
    /// builder does not write.
    pub fn put_value(&mut self, value: &ConstantValue) -> CrateResult<u16> {
        match value {
            ConstantValue::Int(value) => self.integer(*value),
            ConstantValue::Float(value) => self.float(*value),
            ConstantValue::Long(value) => self.long(*value),
            ConstantValue::Double(value) => self.double(*value),
            ConstantValue::String(value) => self.string(value),
            ConstantValue::Class(name) => self.class(name),
            ConstantValue::ValueClass(name) => self.value_class(name),
            ConstantValue::MethodHandle(handle) => self.method_handle(handle),
            ConstantValue::MethodType(descriptor) => self.method_type(descriptor),
            ConstantValue::Dynamic(constant) => self.constant_dynamic(constant),
            ConstantValue::Module(_) | ConstantValue::Package(_) => {
                Err(CrateError::UnsupportedConstant {
                    kind: value.kind_name(),
                })
            }
        }
    }

    /// Freeze the pool. If any bootstrap methods were resolved, the name of their attribute is
    /// added to the pool first so the table can be written as a class attribute.
    pub fn build(mut self) -> CrateResult<BuiltPool> {
        let bootstrap_methods = if self.bootstrap_methods.is_empty() {
            None
        } else {
            let name_index = self.utf8(BOOTSTRAP_METHODS)?;
            Some(BootstrapTable {
                name_index,
                // `bootstrap_method` refuses to go past `u16::MAX` entries.
                count: self.bootstrap_methods.len() as u16,
                entries: self.bootstrap_buf,
            })
        };
        let (entries, size) = self.builder.into_parts();
        Ok(BuiltPool {
            size,
            entries,
            bootstrap_methods,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::pool::{CPEntry, ConstantPool, ReferenceKind};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn inspect(pool: &PoolHelper) -> ConstantPool {
        let mut bytes = GrowableBuffer::new();
        bytes.write_u16(pool.size());
        bytes.write_bytes(pool.entry_bytes());
        ConstantPool::read(&mut bytes.as_bytes()).unwrap()
    }

    fn concat_bootstrap() -> BootstrapMethod {
        BootstrapMethod::new(
            MethodHandle::new(
                ReferenceKind::InvokeStatic,
                "java/lang/invoke/StringConcatFactory",
                "makeConcatWithConstants",
                "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;\
                 Ljava/lang/invoke/MethodType;Ljava/lang/String;[Ljava/lang/Object;)\
                 Ljava/lang/invoke/CallSite;",
            ),
            vec![ConstantValue::from("\u{1}!")],
        )
    }

    #[test]
    fn repeated_requests_share_an_entry() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let first = pool.class("Foo")?;
        let bytes = pool.entry_bytes().to_vec();
        for _ in 0..10 {
            assert_eq!(first, pool.class("Foo")?);
        }
        assert_eq!(bytes, pool.entry_bytes().to_vec());
        assert_eq!(2, pool.entry_count());
        Ok(())
    }

    #[test]
    fn member_refs_resolve_dependencies_first() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        assert_eq!(6, pool.method_ref("A", "m", "()V")?);
        let cp = inspect(&pool);
        assert_eq!(&CPEntry::Utf8("A".to_string()), cp.get(1)?);
        assert_eq!(&CPEntry::Class(1), cp.get(2)?);
        assert_eq!(&CPEntry::Utf8("m".to_string()), cp.get(3)?);
        assert_eq!(&CPEntry::Utf8("()V".to_string()), cp.get(4)?);
        assert_eq!(&CPEntry::NameAndType(3, 4), cp.get(5)?);
        assert_eq!(&CPEntry::Methodref(2, 5), cp.get(6)?);

        assert_eq!(2, pool.class("A")?);
        assert_eq!(5, pool.name_and_type("m", "()V")?);
        assert_eq!(7, pool.size());
        Ok(())
    }

    #[test]
    fn existing_dependencies_are_reused() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let owner = pool.class("A")?;
        let field = pool.field_ref("A", "x", "I")?;
        let method = pool.method_ref("A", "x", "I")?;
        assert_ne!(field, method);
        let cp = inspect(&pool);
        match (cp.get(field)?, cp.get(method)?) {
            (CPEntry::Fieldref(a, nat_a), CPEntry::Methodref(b, nat_b)) => {
                assert_eq!((owner, owner), (*a, *b));
                assert_eq!(nat_a, nat_b);
            }
            other => panic!("unexpected entries {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn wide_constants_skip_an_index() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        assert_eq!(1, pool.integer(1)?);
        assert_eq!(2, pool.long(5)?);
        assert_eq!(4, pool.integer(2)?);
        assert_eq!(5, pool.double(0.5)?);
        // The Utf8 entry for "s" lands at 7.
        assert_eq!(8, pool.string("s")?);
        assert_eq!(2, pool.long(5)?);
        assert_eq!(9, pool.size());
        Ok(())
    }

    #[test]
    fn narrow_integers_share_integer_entries() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let one = pool.integer(1)?;
        assert_eq!(one, pool.boolean(true)?);
        assert_eq!(one, pool.byte(1)?);
        assert_eq!(one, pool.short(1)?);
        assert_eq!(one, pool.char(1)?);
        assert_eq!(1, pool.entry_count());
        Ok(())
    }

    #[test]
    fn floats_dedup_by_bits() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let zero = pool.float(0.0)?;
        assert_ne!(zero, pool.float(-0.0)?);
        let nan = pool.double(f64::NAN)?;
        assert_eq!(nan, pool.double(f64::NAN)?);
        Ok(())
    }

    #[test]
    fn value_classes_are_distinct_from_classes() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let class = pool.class("Point")?;
        let value = pool.value_class("Point")?;
        assert_ne!(class, value);
        let cp = inspect(&pool);
        assert_eq!("QPoint;", cp.get_class_name(value)?);
        assert_eq!("Point", cp.get_class_name(class)?);
        Ok(())
    }

    #[test]
    fn interface_handles_use_interface_method_refs() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let handle = MethodHandle::new(
            ReferenceKind::InvokeInterface,
            "java/util/List",
            "size",
            "()I",
        );
        let index = pool.method_handle(&handle)?;
        let cp = inspect(&pool);
        match cp.get(index)? {
            &CPEntry::MethodHandle(ReferenceKind::InvokeInterface, reference) => {
                assert!(matches!(cp.get(reference)?, CPEntry::InterfaceMethodref(_, _)));
            }
            other => panic!("unexpected entry {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn call_sites_share_bootstrap_methods() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let bootstrap = concat_bootstrap();
        let first = pool.invoke_dynamic(&bootstrap, "concat", "(I)Ljava/lang/String;")?;
        let second = pool.invoke_dynamic(&bootstrap, "concat2", "(I)Ljava/lang/String;")?;
        assert_ne!(first, second);
        assert_eq!(1, pool.bootstrap_method_count());
        let cp = inspect(&pool);
        assert!(matches!(cp.get(first)?, CPEntry::InvokeDynamic(0, _)));
        assert!(matches!(cp.get(second)?, CPEntry::InvokeDynamic(0, _)));
        Ok(())
    }

    #[test]
    fn different_arguments_make_different_bootstrap_methods() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let first = concat_bootstrap();
        let mut second = concat_bootstrap();
        second.arguments = vec![ConstantValue::from("\u{1}?")];
        assert_eq!(0, pool.bootstrap_method(&first)?);
        assert_eq!(1, pool.bootstrap_method(&second)?);
        assert_eq!(0, pool.bootstrap_method(&first)?);
        assert_eq!(2, pool.bootstrap_method_count());
        Ok(())
    }

    #[test]
    fn constant_dynamic_entries() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let constant = DynamicConstant {
            bootstrap: BootstrapMethod::new(
                MethodHandle::new(
                    ReferenceKind::InvokeStatic,
                    "java/lang/invoke/ConstantBootstraps",
                    "nullConstant",
                    "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/Class;)\
                     Ljava/lang/Object;",
                ),
                vec![],
            ),
            name: "_".to_string(),
            descriptor: "Ljava/lang/Object;".to_string(),
        };
        let index = pool.put_value(&ConstantValue::from(constant.clone()))?;
        assert_eq!(index, pool.constant_dynamic(&constant)?);
        let cp = inspect(&pool);
        assert!(matches!(cp.get(index)?, CPEntry::Dynamic(0, _)));
        Ok(())
    }

    #[test]
    fn bootstrap_table_layout() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let bootstrap = concat_bootstrap();
        pool.invoke_dynamic(&bootstrap, "concat", "(I)Ljava/lang/String;")?;
        let handle = pool.method_handle(&bootstrap.handle)?;
        let argument = pool.string("\u{1}!")?;
        let built = pool.build()?;
        let table = built.bootstrap_methods.unwrap();
        assert_eq!(1, table.count);
        let mut expected = GrowableBuffer::new();
        expected.write_u16(handle);
        expected.write_u16(1);
        expected.write_u16(argument);
        assert_eq!(expected.as_bytes(), table.entries.as_bytes());
        Ok(())
    }

    #[test]
    fn no_bootstrap_table_without_call_sites() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        pool.method_ref("A", "m", "()V")?;
        let built = pool.build()?;
        assert!(built.bootstrap_methods.is_none());
        assert_eq!(7, built.size);
        Ok(())
    }

    #[test]
    fn unsupported_values_fail_without_writing() {
        let mut pool = PoolHelper::new();
        for value in [
            ConstantValue::Module("java.base".to_string()),
            ConstantValue::Package("java/lang".to_string()),
        ] {
            assert!(matches!(
                pool.put_value(&value),
                Err(CrateError::UnsupportedConstant { .. })
            ));
        }
        assert_eq!(1, pool.size());
        assert!(pool.entry_bytes().is_empty());
    }

    #[test]
    fn invalid_names_fail_before_writing() {
        let mut pool = PoolHelper::new();
        assert!(matches!(
            pool.method_ref("A", "a<b", "()V"),
            Err(CrateError::InvalidName { .. })
        ));
        assert!(matches!(
            pool.field_ref("A", "", "I"),
            Err(CrateError::InvalidName { .. })
        ));
        assert!(matches!(
            pool.invoke_dynamic(&concat_bootstrap(), "a.b", "()V"),
            Err(CrateError::InvalidName { .. })
        ));
        assert_eq!(0, pool.entry_count());
        assert_eq!(0, pool.bootstrap_method_count());
    }

    #[test]
    fn oversized_string_leaves_pool_unchanged() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        pool.class("Foo")?;
        let size = pool.size();
        let long = "x".repeat(0x10000);
        assert!(matches!(
            pool.string(&long),
            Err(CrateError::SizeExceeded { .. })
        ));
        assert_eq!(size, pool.size());
        assert_eq!(None, pool.lookup(&EntryKey::Utf8(long)));
        Ok(())
    }

    #[test]
    fn value_class_is_the_class_named_by_its_descriptor() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let class = pool.class("QFoo;")?;
        let count = pool.entry_count();
        assert_eq!(class, pool.value_class("Foo")?);
        assert_eq!(count, pool.entry_count());

        let value = pool.value_class("Bar")?;
        let count = pool.entry_count();
        assert_eq!(value, pool.class("QBar;")?);
        assert_eq!(count, pool.entry_count());
        Ok(())
    }

    #[test]
    fn field_handles_ignore_the_interface_flag() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let plain = MethodHandle::new(ReferenceKind::ReadStaticField, "A", "x", "I");
        let on_interface = plain.clone().on_interface();
        let index = pool.method_handle(&plain)?;
        let count = pool.entry_count();
        assert_eq!(index, pool.method_handle(&on_interface)?);
        assert_eq!(count, pool.entry_count());

        let first = pool.bootstrap_method(&BootstrapMethod::new(plain, vec![]))?;
        let second = pool.bootstrap_method(&BootstrapMethod::new(on_interface, vec![]))?;
        assert_eq!(first, second);
        assert_eq!(1, pool.bootstrap_method_count());
        Ok(())
    }

    #[test]
    fn oversized_call_site_leaves_no_bootstrap_method() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let descriptor = format!("({})V", "I".repeat(0x10000));
        assert!(matches!(
            pool.invoke_dynamic(&concat_bootstrap(), "concat", &descriptor),
            Err(CrateError::SizeExceeded { .. })
        ));
        let constant = DynamicConstant {
            bootstrap: concat_bootstrap(),
            name: "_".to_string(),
            descriptor: format!("L{};", "a".repeat(0x10000)),
        };
        assert!(matches!(
            pool.constant_dynamic(&constant),
            Err(CrateError::SizeExceeded { .. })
        ));
        assert_eq!(0, pool.bootstrap_method_count());
        assert_eq!(0, pool.entry_count());
        assert!(pool.build()?.bootstrap_methods.is_none());
        Ok(())
    }

    #[test]
    fn bootstrap_table_write_backpatches_length() -> CrateResult<()> {
        let mut pool = PoolHelper::new();
        let bootstrap = concat_bootstrap();
        pool.invoke_dynamic(&bootstrap, "concat", "(I)Ljava/lang/String;")?;
        let handle = pool.method_handle(&bootstrap.handle)?;
        let argument = pool.string("\u{1}!")?;
        let table = pool.build()?.bootstrap_methods.unwrap();
        let mut buf = GrowableBuffer::new();
        table.write(&mut buf)?;

        let mut expected = GrowableBuffer::new();
        expected.write_u16(table.name_index);
        expected.write_u32(8);
        expected.write_u16(1);
        expected.write_u16(handle);
        expected.write_u16(1);
        expected.write_u16(argument);
        assert_eq!(expected.as_bytes(), buf.as_bytes());
        Ok(())
    }

    proptest! {
        #[test]
        fn interning_is_idempotent(names in prop::collection::vec("[a-z]{1,4}", 1..40)) {
            let mut pool = PoolHelper::new();
            let first = names
                .iter()
                .map(|name| pool.string(name))
                .collect::<CrateResult<Vec<_>>>()
                .unwrap();
            let size = pool.size();
            let second = names
                .iter()
                .map(|name| pool.string(name))
                .collect::<CrateResult<Vec<_>>>()
                .unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(size, pool.size());
            let mut distinct = names.clone();
            distinct.sort();
            distinct.dedup();
            prop_assert_eq!(distinct.len() * 2, pool.entry_count());
        }

        #[test]
        fn new_entries_get_increasing_indices(
            values in prop::collection::vec(any::<i64>(), 1..40)
        ) {
            let mut pool = PoolHelper::new();
            let mut last = 0;
            for value in values {
                let before = pool.size();
                let index = pool.long(value).unwrap();
                if pool.size() != before {
                    prop_assert!(index > last);
                    prop_assert_eq!(index + 2, pool.size());
                    last = index;
                }
            }
        }
    }
}
