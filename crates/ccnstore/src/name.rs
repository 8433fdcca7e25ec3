//! Content names
//!
//! A name is an ordered list of typed segments. Names are compared, hashed
//! and printed segment by segment; an empty name is valid but dispatches as
//! "no name" in the content store.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::parser::parse_name_uri;

/// Type of a name segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentType {
    /// Generic name segment
    Name,
    /// Chunk number, big-endian unsigned integer
    Chunk,
    /// Version number, big-endian unsigned integer
    Version,
    /// Application-defined segment type
    App(u16),
}

impl SegmentType {
    /// Numeric segment type used when hashing names
    pub fn code(&self) -> u16 {
        match self {
            SegmentType::Name => 0x0001,
            SegmentType::Chunk => 0x0010,
            SegmentType::Version => 0x0013,
            SegmentType::App(n) => 0x1000u16.saturating_add(*n),
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, SegmentType::Chunk | SegmentType::Version)
    }
}

/// A single typed segment of a [`Name`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameSegment {
    typ: SegmentType,
    value: Vec<u8>,
}

impl NameSegment {
    pub fn new(typ: SegmentType, value: impl Into<Vec<u8>>) -> Self {
        Self {
            typ,
            value: value.into(),
        }
    }

    /// Generic segment holding `value`
    pub fn generic(value: impl Into<Vec<u8>>) -> Self {
        Self::new(SegmentType::Name, value)
    }

    /// Numeric segment (chunk or version) with the minimal big-endian encoding
    pub fn number(typ: SegmentType, n: u64) -> Self {
        let bytes = n.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
        Self::new(typ, bytes[skip..].to_vec())
    }

    pub fn typ(&self) -> SegmentType {
        self.typ
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl NameSegment {
    /// Value as a number if it is the minimal encoding of one
    fn as_number(&self) -> Option<u64> {
        let minimal = match self.value.as_slice() {
            [] => false,
            [_] => true,
            [first, ..] => *first != 0 && self.value.len() <= 8,
        };
        if !self.typ.is_numeric() || !minimal {
            return None;
        }
        Some(self.value.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }
}

impl fmt::Display for NameSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            SegmentType::Name if self.value.is_empty() => write!(f, "name=")?,
            SegmentType::Name => {}
            SegmentType::Chunk => write!(f, "chunk=")?,
            SegmentType::Version => write!(f, "version=")?,
            SegmentType::App(n) => write!(f, "app:{}=", n)?,
        }

        if let Some(n) = self.as_number() {
            return write!(f, "{}", n);
        }

        match self.value.split_first() {
            // Leading escape keeps a raw numeric value from reading as decimal
            Some((first, rest)) if self.typ.is_numeric() => {
                write!(f, "%{:02X}{}", first, urlencoding::encode_binary(rest))
            }
            _ => write!(f, "{}", urlencoding::encode_binary(&self.value)),
        }
    }
}

/// A content name: ordered sequence of segments, possibly empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    segments: Vec<NameSegment>,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<NameSegment>) -> Self {
        Self { segments }
    }

    /// Parse a `ccnx:/a/b/chunk=3` style URI
    pub fn from_uri(uri: &str) -> Result<Self> {
        parse_name_uri(uri)
    }

    /// Append a segment, builder style
    pub fn with_segment(mut self, segment: NameSegment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn segments(&self) -> &[NameSegment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of the value lengths of all segments
    pub fn byte_len(&self) -> usize {
        self.segments.iter().map(|s| s.value.len()).sum()
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Name::from_uri(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ccnx:")?;
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
