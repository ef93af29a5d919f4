use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest number of layers a lattice can hold; layers are addressed by the letters `A..=Z`.
pub const MAX_LAYERS: usize = 26;

/// The two kinds of secondary structure element placed on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SseType {
    #[serde(rename = "H", alias = "h")]
    Helix,
    #[serde(rename = "E", alias = "e")]
    Strand,
}

impl SseType {
    pub fn letter(self) -> char {
        match self {
            SseType::Helix => 'H',
            SseType::Strand => 'E',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'H' => Some(SseType::Helix),
            'E' => Some(SseType::Strand),
            _ => None,
        }
    }

    /// Axial rise per residue in Å for the idealized element.
    pub fn rise(self) -> f64 {
        match self {
            SseType::Helix => 1.5,
            SseType::Strand => 3.2,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid SSE type '{0}' (expected 'H' or 'E')")]
pub struct ParseSseTypeError(pub String);

impl FromStr for SseType {
    type Err = ParseSseTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_letter(c).ok_or_else(|| ParseSseTypeError(s.to_string())),
            _ => Err(ParseSseTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for SseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Lattice address of one SSE slot: layer letter, 1-based position within the layer and type.
///
/// The textual form is `<Layer><Position><Type>`, e.g. `B3E` for the third strand of the
/// second layer. Ordering follows the architecture: layer first, then position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SseId {
    pub layer: u8,
    pub position: u16,
    pub sse_type: SseType,
}

impl SseId {
    pub fn new(layer: u8, position: u16, sse_type: SseType) -> Self {
        Self {
            layer,
            position,
            sse_type,
        }
    }

    pub fn layer_letter(&self) -> char {
        layer_letter(self.layer as usize)
    }
}

/// Maps a 0-based layer index to its letter. Indices past `Z` saturate.
pub fn layer_letter(index: usize) -> char {
    (b'A' + index.min(MAX_LAYERS - 1) as u8) as char
}

pub fn layer_index(letter: char) -> Option<u8> {
    letter
        .is_ascii_uppercase()
        .then(|| letter as u8 - b'A')
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid SSE identifier '{input}': {reason}")]
pub struct ParseSseIdError {
    pub input: String,
    pub reason: &'static str,
}

impl FromStr for SseId {
    type Err = ParseSseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseSseIdError {
            input: s.to_string(),
            reason,
        };

        let mut chars = s.chars();
        let layer = chars
            .next()
            .and_then(layer_index)
            .ok_or_else(|| fail("must start with a layer letter A-Z"))?;

        let rest = chars.as_str();
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| fail("missing SSE type letter"))?;
        if digits_end == 0 {
            return Err(fail("missing position number"));
        }
        let position: u16 = rest[..digits_end]
            .parse()
            .map_err(|_| fail("position number out of range"))?;
        if position == 0 {
            return Err(fail("positions are 1-based"));
        }

        let tail = &rest[digits_end..];
        let sse_type = match tail {
            "H" => SseType::Helix,
            "E" => SseType::Strand,
            _ => return Err(fail("SSE type must be a single 'H' or 'E'")),
        };

        Ok(SseId::new(layer, position, sse_type))
    }
}

impl TryFrom<String> for SseId {
    type Error = ParseSseIdError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SseId> for String {
    fn from(id: SseId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for SseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.layer_letter(), self.position, self.sse_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_identifier() {
        let id: SseId = "B3E".parse().unwrap();
        assert_eq!(id, SseId::new(1, 3, SseType::Strand));
        assert_eq!(id.to_string(), "B3E");
        assert_eq!(id.layer_letter(), 'B');
    }

    #[test]
    fn multi_digit_positions_are_supported() {
        let id: SseId = "A12H".parse().unwrap();
        assert_eq!(id.position, 12);
        assert_eq!(id.to_string(), "A12H");
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for bad in ["", "1AH", "AH", "A0H", "A1X", "a1H", "A1HE", "A1"] {
            assert!(bad.parse::<SseId>().is_err(), "'{bad}' should not parse");
        }
    }

    #[test]
    fn ordering_follows_layer_then_position() {
        let mut ids: Vec<SseId> = ["B1H", "A2E", "A1E"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ids.sort();
        let names: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["A1E", "A2E", "B1H"]);
    }

    #[test]
    fn sse_type_parsing_is_case_insensitive() {
        assert_eq!("h".parse::<SseType>().unwrap(), SseType::Helix);
        assert_eq!("E".parse::<SseType>().unwrap(), SseType::Strand);
        assert!("HE".parse::<SseType>().is_err());
    }

    #[test]
    fn identifier_serializes_as_plain_string() {
        let id = SseId::new(0, 2, SseType::Helix);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"A2H\"");
        let back: SseId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
