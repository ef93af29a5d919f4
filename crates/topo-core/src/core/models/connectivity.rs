use super::sse::{ParseSseIdError, SseId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator placed between SSE tokens when a connectivity is written out.
pub const TOKEN_SEPARATOR: char = '.';

/// A linear traversal order over the SSE slots of an architecture.
///
/// Written as `<Layer><Position><Type>` tokens joined by `.` (`A1H.A2H.B1H.B2H`).
/// Parsing also accepts the tokens concatenated without separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Connectivity(Vec<SseId>);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseConnectivityError {
    #[error("Connectivity string is empty")]
    Empty,
    #[error("Invalid token in connectivity: {0}")]
    Token(#[from] ParseSseIdError),
    #[error("Unexpected length suffix on '{0}'; connectivities carry no SSE lengths")]
    UnexpectedLength(String),
}

impl Connectivity {
    pub fn new(steps: Vec<SseId>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[SseId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SseId> {
        self.0.iter()
    }

    pub fn position_of(&self, id: &SseId) -> Option<usize> {
        self.0.iter().position(|s| s == id)
    }

    pub fn reversed(&self) -> Self {
        Self(self.0.iter().rev().copied().collect())
    }

    /// Consecutive `(previous, next)` pairs in traversal order.
    pub fn pairs(&self) -> impl Iterator<Item = (&SseId, &SseId)> {
        self.0.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// True when the traversal visits every slot of `slots` exactly once and nothing else.
    pub fn is_permutation_of(&self, slots: &[SseId]) -> bool {
        if self.0.len() != slots.len() {
            return false;
        }
        let mut seen = HashSet::with_capacity(self.0.len());
        let expected: HashSet<&SseId> = slots.iter().collect();
        self.0.iter().all(|id| expected.contains(id) && seen.insert(id))
    }
}

/// Splits a topology-style string into `(id, optional length)` tokens.
///
/// Tokens may be separated by `.` or written back to back; a run of digits after the
/// type letter is read as an explicit residue length (`B2E5`).
pub(crate) fn scan_tokens(input: &str) -> Result<Vec<(SseId, Option<u32>)>, ParseSseIdError> {
    let mut tokens = Vec::new();
    for chunk in input.split(TOKEN_SEPARATOR) {
        let chunk = chunk.trim();
        if !chunk.is_ascii() {
            return Err(ParseSseIdError {
                input: chunk.to_string(),
                reason: "non-ASCII character",
            });
        }
        let bytes = chunk.as_bytes();
        let mut start = 0;
        while start < bytes.len() {
            // layer letter, digits, type letter, optional digits
            let mut end = start + 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            end = (end + 1).min(bytes.len());
            let id_end = end;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }

            let id: SseId = chunk[start..id_end].parse()?;
            let length = if end > id_end {
                Some(chunk[id_end..end].parse().map_err(|_| ParseSseIdError {
                    input: chunk[start..end].to_string(),
                    reason: "length suffix out of range",
                })?)
            } else {
                None
            };
            tokens.push((id, length));
            start = end;
        }
        if chunk.is_empty() {
            return Err(ParseSseIdError {
                input: input.to_string(),
                reason: "empty token between separators",
            });
        }
    }
    Ok(tokens)
}

impl FromStr for Connectivity {
    type Err = ParseConnectivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseConnectivityError::Empty);
        }
        let steps = scan_tokens(s)?
            .into_iter()
            .map(|(id, length)| match length {
                Some(l) => Err(ParseConnectivityError::UnexpectedLength(format!("{id}{l}"))),
                None => Ok(id),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(steps))
    }
}

impl TryFrom<String> for Connectivity {
    type Error = ParseConnectivityError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Connectivity> for String {
    fn from(c: Connectivity) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{TOKEN_SEPARATOR}")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Connectivity {
    type Item = &'a SseId;
    type IntoIter = std::slice::Iter<'a, SseId>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
