//! Decoding of the modified UTF-8 used by `CONSTANT_Utf8` entries.
//!
//! The encoding works on UTF-16 code units rather than code points: every unit in `0x01..=0x7F`
//! takes one byte, `0` and every unit up to `0x7FF` take two bytes, and every other unit takes
//! three. Supplementary characters are therefore stored as two three-byte surrogates.

use nom::{
    branch, bytes::complete as bytes, combinator as comb, multi, IResult,
};

fn is_jvm8_single_start(c: u8) -> bool {
    c & 0x80 == 0 && c != 0
}

fn is_jvm8_continuation_byte(c: u8) -> bool {
    c & 0xC0 == 0x80
}

fn is_jvm8_double_start(c: u8) -> bool {
    c & 0xE0 == 0xC0
}

fn is_jvm8_triple_start(c: u8) -> bool {
    c & 0xF0 == 0xE0
}

fn is_jvm8_single_byte(cs: &[u8]) -> bool {
    is_jvm8_single_start(cs[0])
}

fn is_jvm8_double_byte(cs: &[u8]) -> bool {
    is_jvm8_double_start(cs[0]) && is_jvm8_continuation_byte(cs[1])
}

fn is_jvm8_triple_byte(cs: &[u8]) -> bool {
    is_jvm8_triple_start(cs[0])
        && is_jvm8_continuation_byte(cs[1])
        && is_jvm8_continuation_byte(cs[2])
}

fn parse_one_byte_unit(input: &[u8]) -> IResult<&[u8], u16> {
    comb::map(
        comb::verify(bytes::take(1usize), is_jvm8_single_byte),
        |unit: &[u8]| u16::from(unit[0]),
    )(input)
}

fn parse_two_byte_unit(input: &[u8]) -> IResult<&[u8], u16> {
    comb::map(
        comb::verify(bytes::take(2usize), is_jvm8_double_byte),
        |unit: &[u8]| {
            let high_bits = u16::from(unit[0]) & 0x1F;
            let low_bits = u16::from(unit[1]) & 0x3F;
            (high_bits << 6) | low_bits
        },
    )(input)
}

fn parse_three_byte_unit(input: &[u8]) -> IResult<&[u8], u16> {
    comb::map(
        comb::verify(bytes::take(3usize), is_jvm8_triple_byte),
        |unit: &[u8]| {
            let high_bits = u16::from(unit[0]) & 0xF;
            let mid_bits = u16::from(unit[1]) & 0x3F;
            let low_bits = u16::from(unit[2]) & 0x3F;
            (high_bits << 12) | (mid_bits << 6) | low_bits
        },
    )(input)
}

fn parse_jvm8_unit(input: &[u8]) -> IResult<&[u8], u16> {
    branch::alt((
        parse_one_byte_unit,
        parse_two_byte_unit,
        parse_three_byte_unit,
    ))(input)
}

/// Decode all of `input` as modified UTF-8. Fails on malformed sequences and on unpaired
/// surrogates.
pub fn parse_jvm8(input: &[u8]) -> IResult<&[u8], String> {
    comb::map_res(
        comb::all_consuming(multi::many0(parse_jvm8_unit)),
        |units: Vec<u16>| String::from_utf16(&units),
    )(input)
}
