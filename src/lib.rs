//! Assembly of JVM class files from symbolic descriptions.
//!
//! The center of the crate is [`PoolHelper`], which hands out constant pool indices for class
//! names, member references, literals, and dynamic call sites while writing each distinct
//! constant exactly once. [`ClassBuilder`] lays a class file out around one.

use std::{fmt::Debug, io};

use thiserror::Error;

pub mod buffer;
pub mod class;
pub mod config;
pub mod parsers;
pub mod pool;

pub use buffer::GrowableBuffer;
pub use class::{access, Attribute, ClassBuilder, Code, ExceptionHandler};
pub use config::{BuilderConfig, ClassFileVersion};
pub use pool::{
    BootstrapMethod, CPEntry, CPEntryType, ConstantPool, ConstantValue, DynamicConstant,
    MethodHandle, PoolHelper, ReferenceKind,
};

use parsers::NomFlatError;

/// Everything that can go wrong while assembling or inspecting a class file.
#[derive(Debug, Error)]
pub enum CrateError {
    /// An encoded value is longer than the field that holds its length allows.
    #[error("{what} is {size} bytes long but may be at most {limit} bytes")]
    SizeExceeded {
        what: &'static str,
        size: usize,
        limit: usize,
    },
    /// A constant of a kind this builder does not write was requested.
    #[error("Constants of kind {kind} are not supported")]
    UnsupportedConstant { kind: &'static str },
    /// A field or method name breaks the rules of the class file format.
    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("Ran out of space in constant pool")]
    ConstantPoolFull,
    /// A list would have more elements than its `u2` count can describe.
    #[error("Too many {what}: {count} is more than 65535")]
    TooMany { what: &'static str, count: usize },
    #[error("Invalid constant pool entry tag {actual}")]
    InvalidConstantPoolEntryTag { actual: u8 },
    #[error("Invalid method handle reference kind {actual}")]
    InvalidReferenceKind { actual: u8 },
    #[error("Tried to access index {request} in constant pool of size {size}")]
    IndexOutOfBounds { request: u16, size: u16 },
    #[error(
        "Tried to get constant pool entry of type {expected} at index {request} when actual type \
         is {actual}"
    )]
    BadEntryType {
        request: u16,
        expected: CPEntryType,
        actual: CPEntryType,
    },
    #[error("Parse failure: {0}")]
    FailedParse(#[from] NomFlatError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl<E: Debug> From<nom::Err<E>> for CrateError {
    fn from(base: nom::Err<E>) -> Self {
        <Self as From<NomFlatError>>::from(NomFlatError::from(base))
    }
}

pub type CrateResult<T> = Result<T, CrateError>;
