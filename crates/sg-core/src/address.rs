use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

/// An ordered, duplicate-free sequence of glyphs naming a destination.
///
/// Insertion order is the address. Re-entering a glyph that is already
/// buffered leaves the address untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct DialAddress(Vec<Symbol>);

impl DialAddress {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from glyph numbers. Out-of-range or repeated numbers yield
    /// `None`.
    pub fn from_numbers(numbers: &[u8]) -> Option<Self> {
        let mut address = Self::new();
        for &number in numbers {
            if !address.push(Symbol::new(number)?) {
                return None;
            }
        }
        Some(address)
    }

    /// Append a glyph. Returns false, leaving the address untouched,
    /// when the glyph is already present.
    pub fn push(&mut self, symbol: Symbol) -> bool {
        if self.0.contains(&symbol) {
            return false;
        }
        self.0.push(symbol);
        true
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.0.contains(&symbol)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    /// The two-glyph prefix peer gates are keyed by; `None` for
    /// addresses shorter than two glyphs.
    pub fn prefix(&self) -> Option<[Symbol; 2]> {
        match self.0[..] {
            [first, second, ..] => Some([first, second]),
            _ => None,
        }
    }

    /// Whether both addresses carry the same two-glyph prefix. Always
    /// false when either side is shorter than two glyphs.
    pub fn shares_prefix(&self, other: &DialAddress) -> bool {
        match (self.prefix(), other.prefix()) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        }
    }
}

impl fmt::Display for DialAddress {
    /// Renders the exact wire form: `[7, 32, 27]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, symbol) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{symbol}")?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParseAddressError {
    /// Missing the `[...]` brackets.
    Delimiters,
    /// A segment that is not a glyph number.
    Glyph(String),
    /// A number outside the glyph domain.
    Range(u8),
    /// A glyph repeated within one address.
    Duplicate(u8),
}

impl fmt::Display for ParseAddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAddressError::Delimiters => {
                write!(f, "address must be bracketed like [7, 32, 27]")
            }
            ParseAddressError::Glyph(text) => write!(f, "not a glyph number: {text:?}"),
            ParseAddressError::Range(number) => write!(f, "glyph number out of range: {number}"),
            ParseAddressError::Duplicate(number) => {
                write!(f, "glyph repeated in address: {number}")
            }
        }
    }
}

impl std::error::Error for ParseAddressError {}

impl FromStr for DialAddress {
    type Err = ParseAddressError;

    /// Parses the wire rendering, e.g. `"[7, 32, 27]"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or(ParseAddressError::Delimiters)?;
        let mut address = DialAddress::new();
        if inner.trim().is_empty() {
            return Ok(address);
        }
        for segment in inner.split(',') {
            let segment = segment.trim();
            let number: u8 = segment
                .parse()
                .map_err(|_| ParseAddressError::Glyph(segment.to_string()))?;
            let symbol = Symbol::new(number).ok_or(ParseAddressError::Range(number))?;
            if !address.push(symbol) {
                return Err(ParseAddressError::Duplicate(number));
            }
        }
        Ok(address)
    }
}

impl TryFrom<Vec<u8>> for DialAddress {
    type Error = String;

    fn try_from(numbers: Vec<u8>) -> Result<Self, Self::Error> {
        DialAddress::from_numbers(&numbers)
            .ok_or_else(|| format!("invalid dial address: {numbers:?}"))
    }
}

impl From<DialAddress> for Vec<u8> {
    fn from(address: DialAddress) -> Self {
        address.0.iter().map(|symbol| symbol.number()).collect()
    }
}
