//! Colors, piece identity and piece status

use crate::board::{BASE_POSITION, FINISHED_POSITION, HOME_STRETCH_END};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pieces each color owns
pub const PIECES_PER_COLOR: u8 = 4;

/// Player color, in seating order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    pub const ALL: [Color; 4] = [Color::Red, Color::Green, Color::Yellow, Color::Blue];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
        }
    }

    /// Default display name
    pub fn label(self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Yellow => "Yellow",
            Color::Blue => "Blue",
        }
    }

    /// Next seat in four-player rotation
    pub fn next(self) -> Self {
        Color::ALL[(self.index() + 1) % Color::ALL.len()]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = ParsePieceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParsePieceIdError::UnknownColor(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePieceIdError {
    #[error("piece id must look like `color-index`, got {0:?}")]
    Malformed(String),
    #[error("unknown color {0:?}")]
    UnknownColor(String),
    #[error("piece index {0} out of range")]
    IndexOutOfRange(u8),
}

/// Stable piece identifier, `red-0` .. `blue-3` on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PieceId {
    pub color: Color,
    pub index: u8,
}

impl PieceId {
    pub fn new(color: Color, index: u8) -> Self {
        Self { color, index }
    }

    /// All four ids of a color
    pub fn of(color: Color) -> impl Iterator<Item = PieceId> {
        (0..PIECES_PER_COLOR).map(move |i| PieceId::new(color, i))
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.color, self.index)
    }
}

impl FromStr for PieceId {
    type Err = ParsePieceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (color, index) = s
            .split_once('-')
            .ok_or_else(|| ParsePieceIdError::Malformed(s.to_string()))?;
        let color = color.parse::<Color>()?;
        let index = index
            .parse::<u8>()
            .map_err(|_| ParsePieceIdError::Malformed(s.to_string()))?;
        if index >= PIECES_PER_COLOR {
            return Err(ParsePieceIdError::IndexOutOfRange(index));
        }
        Ok(PieceId::new(color, index))
    }
}

impl TryFrom<String> for PieceId {
    type Error = ParsePieceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PieceId> for String {
    fn from(id: PieceId) -> Self {
        id.to_string()
    }
}

/// Where a piece is in its life cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceStatus {
    Base,
    Active,
    Home,
}

/// A single piece.
///
/// `position` is -1 in base, 0..=51 on the shared track (global index),
/// 52..=57 in the owner's home stretch and 58 once finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub color: Color,
    pub status: PieceStatus,
    pub position: i8,
}

impl Piece {
    /// Fresh piece sitting in base
    pub fn in_base(id: PieceId) -> Self {
        Self {
            id,
            color: id.color,
            status: PieceStatus::Base,
            position: BASE_POSITION,
        }
    }

    /// Send the piece back to base (after capture)
    pub fn return_to_base(&mut self) {
        self.status = PieceStatus::Base;
        self.position = BASE_POSITION;
    }

    /// Status and position agree with each other
    pub fn is_consistent(&self) -> bool {
        match self.status {
            PieceStatus::Base => self.position == BASE_POSITION,
            PieceStatus::Home => self.position == FINISHED_POSITION,
            PieceStatus::Active => (0..=HOME_STRETCH_END).contains(&self.position),
        }
    }
}
