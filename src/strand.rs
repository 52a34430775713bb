//! Strand orientation for transcript records.

use std::fmt;

use crate::error::Error;

/// Strand orientation of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Strand {
    Forward = 0,
    Reverse = 1,
}

impl Strand {
    /// Parse from a RefGene strand column. Only `+` and `-` are valid.
    pub fn from_refgene(s: &str) -> Result<Self, Error> {
        match s {
            "+" => Ok(Self::Forward),
            "-" => Ok(Self::Reverse),
            _ => Err(Error::Parse(format!("invalid strand field: '{s}'"))),
        }
    }

    #[must_use]
    pub fn is_reverse(self) -> bool {
        self == Self::Reverse
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}
