//! Attributes and members whose every reference has already been resolved to a pool index.

use crate::{buffer::GrowableBuffer, CrateError, CrateResult};

/// Write `len` as a `u2` count of `what`.
pub(crate) fn write_count(
    buf: &mut GrowableBuffer,
    what: &'static str,
    len: usize,
) -> CrateResult<()> {
    let count = u16::try_from(len).map_err(|_| CrateError::TooMany { what, count: len })?;
    buf.write_u16(count);
    Ok(())
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RawAttribute {
    /// Any attribute whose body is a single `u2` pool index, such as `ConstantValue`,
    /// `SourceFile`, and `Signature`.
    IndexValued {
        name_idx: u16,
        value_idx: u16,
    },
    Code {
        name_idx: u16,
        max_stack: u16,
        max_locals: u16,
        body: Vec<u8>,
        exception_handlers: Vec<RawExceptionHandler>,
        attributes: Vec<RawAttribute>,
    },
    Exceptions {
        name_idx: u16,
        class_idxs: Vec<u16>,
    },
    GenericAttribute {
        name_idx: u16,
        info: Vec<u8>,
    },
}

impl RawAttribute {
    pub fn name_idx(&self) -> u16 {
        match self {
            RawAttribute::IndexValued { name_idx, .. }
            | RawAttribute::Code { name_idx, .. }
            | RawAttribute::Exceptions { name_idx, .. }
            | RawAttribute::GenericAttribute { name_idx, .. } => *name_idx,
        }
    }

    /// Append `attribute_name_index`, `attribute_length`, and the body to `buf`. The length is
    /// filled in once the body has been written.
    pub fn write(&self, buf: &mut GrowableBuffer) -> CrateResult<()> {
        buf.write_u16(self.name_idx());
        let length = buf.reserve_u32();
        match self {
            RawAttribute::IndexValued { value_idx, .. } => buf.write_u16(*value_idx),
            RawAttribute::Code {
                max_stack,
                max_locals,
                body,
                exception_handlers,
                attributes,
                ..
            } => {
                buf.write_u16(*max_stack);
                buf.write_u16(*max_locals);
                let code_length = u32::try_from(body.len()).map_err(|_| {
                    CrateError::SizeExceeded {
                        what: "method code",
                        size: body.len(),
                        limit: u32::MAX as usize,
                    }
                })?;
                buf.write_u32(code_length);
                buf.write_bytes(body);
                write_count(buf, "exception handlers", exception_handlers.len())?;
                for exception_handler in exception_handlers {
                    exception_handler.write(buf);
                }
                write_count(buf, "attributes", attributes.len())?;
                for attribute in attributes {
                    attribute.write(buf)?;
                }
            }
            RawAttribute::Exceptions { class_idxs, .. } => {
                write_count(buf, "thrown exception classes", class_idxs.len())?;
                for &class_idx in class_idxs {
                    buf.write_u16(class_idx);
                }
            }
            RawAttribute::GenericAttribute { info, .. } => buf.write_bytes(info),
        }
        let written = buf.written_since(length);
        let written = u32::try_from(written).map_err(|_| CrateError::SizeExceeded {
            what: "attribute",
            size: written,
            limit: u32::MAX as usize,
        })?;
        buf.patch_u32(length, written);
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawExceptionHandler {
    /// The index in the associated "Code" attribute's code array at which this exception handler
    /// becomes active.
    pub start_pc: u16,
    /// The index in the associated "Code" attribute's code array at which this exception handler
    /// becomes inactive.
    pub end_pc: u16,
    /// The index in the associated "Code" attribute's code array to jump to if this exception
    /// handler is triggered.
    pub handler_pc: u16,
    /// The index in the constant pool of the type of exception that this exception handler can
    /// handle. If `catch_type_idx` is `0`, this exception handler can handle *all* types of
    /// exception.
    pub catch_type_idx: u16,
}

impl RawExceptionHandler {
    pub fn write(&self, buf: &mut GrowableBuffer) {
        buf.write_u16(self.start_pc);
        buf.write_u16(self.end_pc);
        buf.write_u16(self.handler_pc);
        buf.write_u16(self.catch_type_idx);
    }
}

/// A field or a method. Both are laid out the same way.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawMember {
    pub access_flags: u16,
    pub name_idx: u16,
    pub descriptor_idx: u16,
    pub attributes: Vec<RawAttribute>,
}

impl RawMember {
    pub fn write(&self, buf: &mut GrowableBuffer) -> CrateResult<()> {
        buf.write_u16(self.access_flags);
        buf.write_u16(self.name_idx);
        buf.write_u16(self.descriptor_idx);
        write_count(buf, "attributes", self.attributes.len())?;
        for attribute in &self.attributes {
            attribute.write(buf)?;
        }
        Ok(())
    }
}
