//! The names a class file allows for fields and methods.

use std::fmt::{self, Display, Formatter};

use nom::{branch, bytes::complete as bytes, combinator as comb, IResult};

use crate::{
    parsers::{impl_from_str_for_nom_parse, NomParse},
    CrateError, CrateResult,
};

fn is_unqualified_name_char(c: char) -> bool {
    !matches!(c, '.' | ';' | '[' | '/')
}

fn is_method_name_char(c: char) -> bool {
    is_unqualified_name_char(c) && !matches!(c, '<' | '>')
}

/// A non-empty name that contains none of `.`, `;`, `[`, or `/`. Every field name is an
/// unqualified name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct UnqualifiedName(String);

impl UnqualifiedName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UnqualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'i> NomParse<'i> for UnqualifiedName {
    fn nom_parse(s: &'i str) -> IResult<&'i str, Self> {
        comb::map(bytes::take_while1(is_unqualified_name_char), |name: &str| {
            UnqualifiedName(name.to_string())
        })(s)
    }
}

/// An unqualified name that also contains neither `<` nor `>`, or one of the special names
/// `<init>` and `<clinit>`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MethodName(String);

impl MethodName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the name of an instance or class initializer.
    pub fn is_initializer(&self) -> bool {
        self.0 == "<init>" || self.0 == "<clinit>"
    }
}

impl Display for MethodName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'i> NomParse<'i> for MethodName {
    fn nom_parse(s: &'i str) -> IResult<&'i str, Self> {
        comb::map(
            branch::alt((
                bytes::tag("<init>"),
                bytes::tag("<clinit>"),
                bytes::take_while1(is_method_name_char),
            )),
            |name: &str| MethodName(name.to_string()),
        )(s)
    }
}

impl_from_str_for_nom_parse!(UnqualifiedName, MethodName);

/// Check that `name` is legal for a field.
pub fn check_field_name(name: &str) -> CrateResult<()> {
    name.parse::<UnqualifiedName>()
        .map(|_| ())
        .map_err(|_| CrateError::InvalidName {
            name: name.to_string(),
            reason: "field names must be non-empty and contain none of . ; [ /",
        })
}

/// Check that `name` is legal for a method.
pub fn check_method_name(name: &str) -> CrateResult<()> {
    name.parse::<MethodName>()
        .map(|_| ())
        .map_err(|_| CrateError::InvalidName {
            name: name.to_string(),
            reason: "method names must be non-empty and contain none of . ; [ / < > \
                     unless they are <init> or <clinit>",
        })
}

/// Check that `name` is legal for a member with the given descriptor. Method descriptors start
/// with `(`; anything else is treated as a field descriptor.
pub fn check_member_name(name: &str, descriptor: &str) -> CrateResult<()> {
    if descriptor.starts_with('(') {
        check_method_name(name)
    } else {
        check_field_name(name)
    }
}
