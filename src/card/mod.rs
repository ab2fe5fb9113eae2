//! Card values and the rules of the game
mod set;

pub use set::{combinations, find_sets, is_set, CardSet, Combinations};

use std::fmt;

/// Number of symbols printed on a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Count {
    One,
    Two,
    Three,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Green,
    Red,
    Purple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shape {
    Oval,
    Diamond,
    Squiggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fill {
    Blank,
    Striped,
    Solid,
}

/// One of the four card attributes, encoded as 0, 1 or 2
pub trait Attribute: Copy {
    fn code(self) -> u8;
}

impl Attribute for Count {
    fn code(self) -> u8 {
        match self {
            Count::One => 0,
            Count::Two => 1,
            Count::Three => 2,
        }
    }
}

impl Attribute for Color {
    fn code(self) -> u8 {
        match self {
            Color::Green => 0,
            Color::Red => 1,
            Color::Purple => 2,
        }
    }
}

impl Attribute for Shape {
    fn code(self) -> u8 {
        match self {
            Shape::Oval => 0,
            Shape::Diamond => 1,
            Shape::Squiggle => 2,
        }
    }
}

impl Attribute for Fill {
    fn code(self) -> u8 {
        match self {
            Fill::Blank => 0,
            Fill::Striped => 1,
            Fill::Solid => 2,
        }
    }
}

impl Count {
    /// Map a number of detected symbols to a count, if it is a legal one
    pub fn from_symbols(n: usize) -> Option<Self> {
        match n {
            1 => Some(Count::One),
            2 => Some(Count::Two),
            3 => Some(Count::Three),
            _ => None,
        }
    }

    pub fn get(self) -> u8 {
        self.code() + 1
    }
}

/// A fully classified card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub count: Count,
    pub color: Color,
    pub shape: Shape,
    pub fill: Fill,
}

impl Card {
    pub fn new(count: Count, color: Color, shape: Shape, fill: Fill) -> Self {
        Self {
            count,
            color,
            shape,
            fill,
        }
    }

    /// Assemble a card from classifier output
    ///
    /// Colour and fill always resolve, count and shape may not. A card with an unresolved count
    /// or shape is not a card at all.
    pub fn from_parts(
        count: Option<Count>,
        color: Color,
        shape: Option<Shape>,
        fill: Fill,
    ) -> Option<Self> {
        Some(Self::new(count?, color, shape?, fill))
    }
}

/// Compact form, e.g. `G1█0` for one solid green oval
impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = match self.color {
            Color::Green => 'G',
            Color::Red => 'R',
            Color::Purple => 'P',
        };
        let fill = match self.fill {
            Fill::Blank => '☐',
            Fill::Striped => '║',
            Fill::Solid => '█',
        };
        let shape = match self.shape {
            Shape::Oval => '0',
            Shape::Diamond => '♢',
            Shape::Squiggle => '∿',
        };
        write!(f, "{}{}{}{}", color, self.count.get(), fill, shape)
    }
}
