//! Name URI parser using nom
//!
//! URI format:
//! ```text
//! [ccnx: | lci:] / segment / segment ... [/]
//! segment := [label "="] value
//! label   := "name" | "chunk" | "version" | "app:" digits
//! ```
//!
//! Values of `chunk` and `version` segments are decimal integers; every other
//! value is taken verbatim with `%XX` escapes decoded. A numeric segment whose
//! value is not plain decimal holds the decoded bytes instead. Only a labelled
//! segment may have an empty value (`name=`, `chunk=`).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::{many0, many1},
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::name::{Name, NameSegment, SegmentType};

/// Parse a name URI such as `ccnx:/video/chunk=3`
pub fn parse_name_uri(input: &str) -> Result<Name> {
    let (_, (_, raw_segments, _)) = all_consuming(tuple((
        opt(alt((tag("ccnx:"), tag("lci:")))),
        many0(preceded(char('/'), raw_segment)),
        opt(char('/')),
    )))(input)?;

    let segments = raw_segments
        .into_iter()
        .map(|(typ, raw)| build_segment(typ, raw))
        .collect::<Result<Vec<_>>>()?;

    Ok(Name::from_segments(segments))
}

fn segment_label(input: &str) -> IResult<&str, SegmentType> {
    terminated(
        alt((
            value(SegmentType::Name, tag("name")),
            value(SegmentType::Chunk, tag("chunk")),
            value(SegmentType::Version, tag("version")),
            map(
                preceded(tag("app:"), map_res(digit1, |d: &str| d.parse::<u16>())),
                SegmentType::App,
            ),
        )),
        char('='),
    )(input)
}

/// Segment value: plain characters and well-formed `%XX` escapes
fn escaped_value(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((
        take_while1(|c: char| c != '/' && c != '%'),
        recognize(tuple((char('%'), hex_digit, hex_digit))),
    ))))(input)
}

fn hex_digit(input: &str) -> IResult<&str, char> {
    satisfy(|c: char| c.is_ascii_hexdigit())(input)
}

fn raw_segment(input: &str) -> IResult<&str, (SegmentType, &str)> {
    let (input, label) = opt(segment_label)(input)?;
    match label {
        Some(typ) => {
            let (input, raw) = opt(escaped_value)(input)?;
            Ok((input, (typ, raw.unwrap_or(""))))
        }
        None => {
            let (input, raw) = escaped_value(input)?;
            Ok((input, (SegmentType::Name, raw)))
        }
    }
}

fn build_segment(typ: SegmentType, raw: &str) -> Result<NameSegment> {
    let decimal = !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit());
    match typ {
        SegmentType::Chunk | SegmentType::Version if decimal => {
            let n = raw
                .parse::<u64>()
                .map_err(|_| Error::Parse(format!("Numeric segment '{}' out of range", raw)))?;
            Ok(NameSegment::number(typ, n))
        }
        _ => Ok(NameSegment::new(
            typ,
            urlencoding::decode_binary(raw.as_bytes()).into_owned(),
        )),
    }
}
