use std::fmt;

use super::{Attribute, Card};

/// Three cards which form a valid Set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardSet(pub [Card; 3]);

impl CardSet {
    pub fn cards(&self) -> &[Card; 3] {
        &self.0
    }

    /// Whether this triple holds the same three cards as `other`, in any order
    pub fn same_cards(&self, other: &CardSet) -> bool {
        let mut ours = self.0;
        let mut theirs = other.0;
        ours.sort_by_key(sort_key);
        theirs.sort_by_key(sort_key);
        ours == theirs
    }
}

fn sort_key(card: &Card) -> (u8, u8, u8, u8) {
    (
        card.count.code(),
        card.color.code(),
        card.shape.code(),
        card.fill.code(),
    )
}

impl fmt::Display for CardSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.0[0], self.0[1], self.0[2])
    }
}

/// Every attribute is all the same or all different across the three cards
///
/// With each attribute encoded as 0, 1 or 2 that is the same as the codes summing to a multiple
/// of three.
pub fn is_set(a: &Card, b: &Card, c: &Card) -> bool {
    fn valid<A: Attribute>(a: A, b: A, c: A) -> bool {
        (a.code() + b.code() + c.code()) % 3 == 0
    }

    valid(a.count, b.count, c.count)
        && valid(a.color, b.color, c.color)
        && valid(a.shape, b.shape, c.shape)
        && valid(a.fill, b.fill, c.fill)
}

/// All Sets among the given cards
///
/// Three identical readings satisfy the rule but a deck only holds each card once, so those are
/// left out.
pub fn find_sets(cards: &[Card]) -> Vec<CardSet> {
    combinations(cards, 3)
        .filter(|triple| !(triple[0] == triple[1] && triple[1] == triple[2]))
        .filter(|triple| is_set(triple[0], triple[1], triple[2]))
        .map(|triple| CardSet([*triple[0], *triple[1], *triple[2]]))
        .collect()
}

/// Iterate over all unordered `k`-subsets of `items`
pub fn combinations<T>(items: &[T], k: usize) -> Combinations<'_, T> {
    Combinations::new(items, k)
}

/// Iterator over `k`-combinations in lexicographic index order
pub struct Combinations<'a, T> {
    items: &'a [T],
    next: Option<Vec<usize>>,
}

impl<'a, T> Combinations<'a, T> {
    fn new(items: &'a [T], k: usize) -> Self {
        let next = if k <= items.len() {
            Some((0..k).collect())
        } else {
            None
        };
        Self { items, next }
    }
}

impl<'a, T> Iterator for Combinations<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self.next.take()?;
        let combination = indices.iter().map(|&i| &self.items[i]).collect();

        let n = self.items.len();
        let k = indices.len();
        // rightmost index which can still move right
        if let Some(i) = (0..k).rev().find(|&i| indices[i] < n - k + i) {
            let mut advanced = indices;
            advanced[i] += 1;
            for j in i + 1..k {
                advanced[j] = advanced[j - 1] + 1;
            }
            self.next = Some(advanced);
        }

        Some(combination)
    }
}
