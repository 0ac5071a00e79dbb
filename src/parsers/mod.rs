use std::fmt::{self, Debug, Display, Formatter};

use nom::{combinator as comb, Err, IResult};

pub mod jvm8;
pub mod names;

pub type NomBaseErr<I> = Err<nom::error::Error<I>>;

/// An error resulting from a failed attempt to use `nom` to parse a string into a value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NomFlatError {
    e: String,
}

impl Display for NomFlatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.e)
    }
}

impl<E: Debug> From<Err<E>> for NomFlatError {
    fn from(e: Err<E>) -> Self {
        Self {
            e: format!("{:?}", e),
        }
    }
}

impl std::error::Error for NomFlatError {}

pub trait NomParse<'i>: Sized {
    fn nom_parse(s: &'i str) -> IResult<&'i str, Self>;

    /// Like `Self::nom_parse`, but fails if `Self::nom_parse` does not consume its entire input.
    fn nom_parse_full(s: &'i str) -> Result<Self, NomBaseErr<&'i str>> {
        Ok(comb::all_consuming(Self::nom_parse)(s)?.1)
    }
}

macro_rules! impl_from_str_for_nom_parse {
    ($($t:ty),* $(,)?) => {$(
        impl ::std::str::FromStr for $t {
            type Err = $crate::parsers::NomFlatError;

            fn from_str(s: &str) -> ::std::result::Result<$t, Self::Err> {
                Ok(<$t as $crate::parsers::NomParse<'_>>::nom_parse_full(s)?)
            }
        }
    )*}
}

pub(crate) use impl_from_str_for_nom_parse;
