//! Card vocabulary
//!
//! Ranks, suits, two-character tokens, and the text parsers shared by the
//! OCR voting layer.

use serde::{Deserialize, Serialize};

/// Valid rank characters, in display order.
pub const RANK_CHARS: &str = "23456789TJQKA";

/// Valid suit characters.
pub const SUIT_CHARS: &str = "shdc";

/// One of the 13 card face values. `Ten` displays as the two-glyph "10".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    /// All ranks in ascending order.
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// The single-character token form (`T` for ten).
    pub fn as_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    /// The text printed on a card face (`"10"` for ten, one char otherwise).
    pub fn glyph_text(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    /// Parse a single character, case-insensitively.
    pub fn from_char(c: char) -> Option<Rank> {
        match c.to_ascii_uppercase() {
            '2' => Some(Rank::Two),
            '3' => Some(Rank::Three),
            '4' => Some(Rank::Four),
            '5' => Some(Rank::Five),
            '6' => Some(Rank::Six),
            '7' => Some(Rank::Seven),
            '8' => Some(Rank::Eight),
            '9' => Some(Rank::Nine),
            'T' => Some(Rank::Ten),
            'J' => Some(Rank::Jack),
            'Q' => Some(Rank::Queen),
            'K' => Some(Rank::King),
            'A' => Some(Rank::Ace),
            _ => None,
        }
    }
}

/// One of the four suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    /// All suits in a fixed order.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    /// The lowercase single-character token form.
    pub fn as_char(self) -> char {
        match self {
            Suit::Spades => 's',
            Suit::Hearts => 'h',
            Suit::Diamonds => 'd',
            Suit::Clubs => 'c',
        }
    }

    /// Parse a single character, case-insensitively.
    pub fn from_char(c: char) -> Option<Suit> {
        match c.to_ascii_lowercase() {
            's' => Some(Suit::Spades),
            'h' => Some(Suit::Hearts),
            'd' => Some(Suit::Diamonds),
            'c' => Some(Suit::Clubs),
            _ => None,
        }
    }
}

/// Build the two-character token for a rank/suit pair (e.g. `"As"`).
pub fn token(rank: Rank, suit: Suit) -> String {
    let mut s = String::with_capacity(2);
    s.push(rank.as_char());
    s.push(suit.as_char());
    s
}

/// Parse a two-character token back into its rank/suit pair.
pub fn parse_token(s: &str) -> Option<(Rank, Suit)> {
    let mut chars = s.chars();
    let rank = Rank::from_char(chars.next()?)?;
    let suit = Suit::from_char(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some((rank, suit))
}

/// Canonicalize raw OCR text into a rank.
///
/// Any substring `"10"` means ten; otherwise the first character belonging
/// to the rank alphabet wins. Unparsable text yields `None`.
pub fn parse_rank(text: &str) -> Option<Rank> {
    if text.contains("10") {
        return Some(Rank::Ten);
    }
    text.chars().find_map(Rank::from_char)
}

/// Parse a currency/magnitude-suffixed numeric string into a float.
///
/// Spaces and thousands-separator commas are stripped, one leading currency
/// symbol is dropped, and a trailing `k`/`m`/`b` (either case) multiplies
/// the remainder by 1e3/1e6/1e9. Anything that does not parse to a finite
/// number yields `None`.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    let cleaned = cleaned
        .strip_prefix(&['$', '€', '£'][..])
        .unwrap_or(cleaned.as_str());
    if cleaned.is_empty() {
        return None;
    }

    let (body, multiplier) = match cleaned.chars().last() {
        Some('k' | 'K') => (&cleaned[..cleaned.len() - 1], 1e3),
        Some('m' | 'M') => (&cleaned[..cleaned.len() - 1], 1e6),
        Some('b' | 'B') => (&cleaned[..cleaned.len() - 1], 1e9),
        _ => (cleaned, 1.0),
    };

    let value: f64 = body.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value * multiplier)
}
