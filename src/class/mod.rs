//! Assembly of a whole class file around a [`PoolHelper`].
//!
//! Members and attributes are resolved against the pool as soon as they are added, so the pool
//! holds their constants in the order they were added. [`ClassBuilder::build`] then lays the
//! sections out in class file order.

use extended_io as eio;

use log::debug;

use std::io::Write;

use crate::{
    buffer::GrowableBuffer,
    config::BuilderConfig,
    parsers::names::{check_field_name, check_method_name},
    pool::{helper::BOOTSTRAP_METHODS, ConstantValue, PoolHelper},
    CrateError, CrateResult,
};

pub mod raw;

use raw::{write_count, RawAttribute, RawExceptionHandler, RawMember};

/// The first four bytes of every class file.
pub const MAGIC: u32 = 0xCAFE_BABE;

/// The largest number of bytes the code array of a method may hold.
pub const MAX_CODE_LENGTH: usize = 0xFFFF;

/// Access flags for classes, fields, and methods. Several values are shared between the three
/// with different meanings.
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    /// On a class: treat superclass methods specially when invoked by `invokespecial`.
    pub const SUPER: u16 = 0x0020;
    pub const SYNCHRONIZED: u16 = 0x0020;
    pub const VOLATILE: u16 = 0x0040;
    pub const BRIDGE: u16 = 0x0040;
    pub const TRANSIENT: u16 = 0x0080;
    pub const VARARGS: u16 = 0x0080;
    pub const NATIVE: u16 = 0x0100;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const STRICT: u16 = 0x0800;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
    pub const MODULE: u16 = 0x8000;
}

/// An entry in the exception table of a [`Code`] attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// The internal name of the class of exceptions caught, or `None` to catch everything.
    pub catch_type: Option<String>,
}

/// The body of a method.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    /// Already-encoded bytecode. Any pool indices it holds should come from
    /// [`ClassBuilder::pool_mut`].
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

/// An attribute of a class, field, method, or `Code` attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    /// The value of a `static final` field.
    ConstantValue(ConstantValue),
    Code(Code),
    /// The internal names of the checked exceptions a method declares.
    Exceptions(Vec<String>),
    SourceFile(String),
    /// A generic signature.
    Signature(String),
    /// Any other attribute, written with `info` as its body.
    Generic { name: String, info: Vec<u8> },
}

impl Attribute {
    /// The name the attribute is written under.
    pub fn name(&self) -> &str {
        match self {
            Attribute::ConstantValue(_) => "ConstantValue",
            Attribute::Code(_) => "Code",
            Attribute::Exceptions(_) => "Exceptions",
            Attribute::SourceFile(_) => "SourceFile",
            Attribute::Signature(_) => "Signature",
            Attribute::Generic { name, .. } => name.as_str(),
        }
    }

    /// Resolve the name of `self` and everything it refers to into `pool`.
    pub fn resolve(&self, pool: &mut PoolHelper) -> CrateResult<RawAttribute> {
        let name_idx = pool.utf8(self.name())?;
        let ret = match self {
            Attribute::ConstantValue(value) => RawAttribute::IndexValued {
                name_idx,
                value_idx: pool.put_value(value)?,
            },
            Attribute::SourceFile(s) | Attribute::Signature(s) => RawAttribute::IndexValued {
                name_idx,
                value_idx: pool.utf8(s)?,
            },
            Attribute::Code(code) => {
                if code.code.len() > MAX_CODE_LENGTH {
                    return Err(CrateError::SizeExceeded {
                        what: "method code",
                        size: code.code.len(),
                        limit: MAX_CODE_LENGTH,
                    });
                }
                let exception_handlers = code
                    .exception_table
                    .iter()
                    .map(|handler| -> CrateResult<RawExceptionHandler> {
                        let catch_type_idx = match &handler.catch_type {
                            Some(class) => pool.class(class)?,
                            None => 0,
                        };
                        Ok(RawExceptionHandler {
                            start_pc: handler.start_pc,
                            end_pc: handler.end_pc,
                            handler_pc: handler.handler_pc,
                            catch_type_idx,
                        })
                    })
                    .collect::<CrateResult<Vec<_>>>()?;
                let attributes = resolve_all(&code.attributes, pool)?;
                RawAttribute::Code {
                    name_idx,
                    max_stack: code.max_stack,
                    max_locals: code.max_locals,
                    body: code.code.clone(),
                    exception_handlers,
                    attributes,
                }
            }
            Attribute::Exceptions(classes) => RawAttribute::Exceptions {
                name_idx,
                class_idxs: classes
                    .iter()
                    .map(|class| pool.class(class))
                    .collect::<CrateResult<_>>()?,
            },
            Attribute::Generic { info, .. } => RawAttribute::GenericAttribute {
                name_idx,
                info: info.clone(),
            },
        };
        Ok(ret)
    }
}

fn resolve_all(attributes: &[Attribute], pool: &mut PoolHelper) -> CrateResult<Vec<RawAttribute>> {
    attributes
        .iter()
        .map(|attribute| attribute.resolve(pool))
        .collect()
}

fn check_room(what: &'static str, len: usize) -> CrateResult<()> {
    if len >= usize::from(u16::MAX) {
        Err(CrateError::TooMany {
            what,
            count: len + 1,
        })
    } else {
        Ok(())
    }
}

/// Assembles one class file.
#[derive(Debug)]
pub struct ClassBuilder {
    config: BuilderConfig,
    pool: PoolHelper,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<RawMember>,
    methods: Vec<RawMember>,
    attributes: Vec<RawAttribute>,
}

impl ClassBuilder {
    /// Start a class named `this_class` extending `super_class`. Only `java/lang/Object` has no
    /// superclass.
    pub fn new(this_class: &str, super_class: Option<&str>) -> CrateResult<Self> {
        Self::with_config(this_class, super_class, BuilderConfig::default())
    }

    pub fn with_config(
        this_class: &str,
        super_class: Option<&str>,
        config: BuilderConfig,
    ) -> CrateResult<Self> {
        let mut pool = PoolHelper::with_config(&config);
        let this_class = pool.class(this_class)?;
        let super_class = match super_class {
            Some(name) => pool.class(name)?,
            None => 0,
        };
        Ok(Self {
            config,
            pool,
            access_flags: access::PUBLIC | access::SUPER,
            this_class,
            super_class,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        })
    }

    /// Replace the access flags of the class. Defaults to `PUBLIC | SUPER`.
    pub fn access_flags(&mut self, access_flags: u16) -> &mut Self {
        self.access_flags = access_flags;
        self
    }

    pub fn this_class_index(&self) -> u16 {
        self.this_class
    }

    pub fn super_class_index(&self) -> u16 {
        self.super_class
    }

    /// The pool the class is built around. Code generators use this to get the indices their
    /// instructions refer to.
    pub fn pool_mut(&mut self) -> &mut PoolHelper {
        &mut self.pool
    }

    pub fn add_interface(&mut self, name: &str) -> CrateResult<u16> {
        check_room("interfaces", self.interfaces.len())?;
        let index = self.pool.class(name)?;
        self.interfaces.push(index);
        Ok(index)
    }

    pub fn add_field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: &[Attribute],
    ) -> CrateResult<()> {
        check_field_name(name)?;
        check_room("fields", self.fields.len())?;
        let member = self.resolve_member(access_flags, name, descriptor, attributes)?;
        self.fields.push(member);
        Ok(())
    }

    pub fn add_method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: &[Attribute],
    ) -> CrateResult<()> {
        check_method_name(name)?;
        check_room("methods", self.methods.len())?;
        let member = self.resolve_member(access_flags, name, descriptor, attributes)?;
        self.methods.push(member);
        Ok(())
    }

    fn resolve_member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: &[Attribute],
    ) -> CrateResult<RawMember> {
        let name_idx = self.pool.utf8(name)?;
        let descriptor_idx = self.pool.utf8(descriptor)?;
        let attributes = resolve_all(attributes, &mut self.pool)?;
        Ok(RawMember {
            access_flags,
            name_idx,
            descriptor_idx,
            attributes,
        })
    }

    /// Add a class attribute. The bootstrap method table is written from the pool when the class
    /// is built, so a `BootstrapMethods` attribute can't be added by hand.
    pub fn add_attribute(&mut self, attribute: &Attribute) -> CrateResult<()> {
        if attribute.name() == BOOTSTRAP_METHODS {
            return Err(CrateError::InvalidName {
                name: BOOTSTRAP_METHODS.to_string(),
                reason: "the bootstrap method table is generated from the constant pool",
            });
        }
        // One slot stays free for the bootstrap method table.
        if self.attributes.len() + 1 >= usize::from(u16::MAX) {
            return Err(CrateError::TooMany {
                what: "class attributes",
                count: self.attributes.len() + 1,
            });
        }
        let attribute = attribute.resolve(&mut self.pool)?;
        self.attributes.push(attribute);
        Ok(())
    }

    /// Lay out the finished class file.
    pub fn build(self) -> CrateResult<Vec<u8>> {
        let ClassBuilder {
            config,
            pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        } = self;
        let pool = pool.build()?;
        let mut buf = GrowableBuffer::with_capacity(pool.entries.len() + 64);
        buf.write_u32(MAGIC);
        buf.write_u16(config.version.minor_version());
        buf.write_u16(config.version.major_version());
        pool.write(&mut buf);
        buf.write_u16(access_flags);
        buf.write_u16(this_class);
        buf.write_u16(super_class);
        write_count(&mut buf, "interfaces", interfaces.len())?;
        for interface in interfaces {
            buf.write_u16(interface);
        }
        write_count(&mut buf, "fields", fields.len())?;
        for field in &fields {
            field.write(&mut buf)?;
        }
        write_count(&mut buf, "methods", methods.len())?;
        for method in &methods {
            method.write(&mut buf)?;
        }
        let bootstrap_methods = pool.bootstrap_methods.as_ref();
        write_count(
            &mut buf,
            "class attributes",
            attributes.len() + usize::from(bootstrap_methods.is_some()),
        )?;
        for attribute in &attributes {
            attribute.write(&mut buf)?;
        }
        if let Some(table) = bootstrap_methods {
            table.write(&mut buf)?;
        }
        debug!(
            "Built class file version {} with constant_pool_count {}, {} bootstrap methods, {} \
             bytes",
            config.version,
            pool.size,
            bootstrap_methods.map_or(0, |table| table.count),
            buf.len(),
        );
        Ok(buf.into_vec())
    }

    /// Build the class and write it to `sink`.
    pub fn write(self, sink: &mut dyn Write) -> CrateResult<()> {
        let bytes = self.build()?;
        eio::write_byte_slice(sink, &bytes)?;
        Ok(())
    }
}
