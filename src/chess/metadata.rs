//! Structured tokens embedded in PGN comments.
//!
//! Chess.com and Lichess exports carry metadata inside `{ }` comments as
//! bracketed commands such as `[%clk 0:09:58.2]`, `[%c_effect e4;...;Blunder]`,
//! `[%c_arrow e2e4;...]` and `[%cal Ge2e4]`. Anything that fails to match is
//! treated as absent.

use std::sync::LazyLock;

use chrono::TimeDelta;
use regex::Regex;
use shakmaty::Square;

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%clk\s+(\d+):(\d+):(\d+(?:\.\d*)?)\]").expect("valid clock regex")
});

static EFFECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%c_effect\s([a-h][1-8]);([a-zA-Z0-9;]+)\]").expect("valid effect regex")
});

static SUGGESTION_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%c_arrow\s([a-h][1-8])([a-h][1-8]);([#\.a-zA-Z0-9;]+)\]")
        .expect("valid suggestion arrow regex")
});

static DRAWING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[%(cal|csl)\s+([^\]]*)\]").expect("valid drawing regex"));

static BRACKET_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]+\]").expect("valid bracket token regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowColor {
    Green,
    Red,
    Yellow,
    Blue,
}

impl ArrowColor {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'G' => Some(Self::Green),
            'R' => Some(Self::Red),
            'Y' => Some(Self::Yellow),
            'B' => Some(Self::Blue),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
        }
    }
}

/// Arrow drawn on a diagram. A marked square is an arrow whose tail equals its head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrow {
    pub color: ArrowColor,
    pub tail: Square,
    pub head: Square,
}

pub fn parse_clock(comment: &str) -> Option<TimeDelta> {
    let caps = CLOCK_RE.captures(comment)?;
    let hours: i64 = caps[1].parse().ok()?;
    let minutes: i64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    if !seconds.is_finite() || !(0.0..86_400.0).contains(&seconds) {
        return None;
    }

    let whole_minutes = hours.checked_mul(60)?.checked_add(minutes)?;
    let millis = whole_minutes
        .checked_mul(60_000)?
        .checked_add((seconds * 1000.0).round() as i64)?;
    TimeDelta::try_milliseconds(millis)
}

/// Final `;`-separated segment of the first `[%c_effect ...]` token.
pub fn effect_category(comment: &str) -> Option<&str> {
    let caps = EFFECT_RE.captures(comment)?;
    let tags = caps.get(2)?.as_str();
    tags.rsplit(';').next().filter(|category| !category.is_empty())
}

/// From/to squares of the first `[%c_arrow ...]` token.
pub fn suggestion_arrow(comment: &str) -> Option<(Square, Square)> {
    let caps = SUGGESTION_ARROW_RE.captures(comment)?;
    let from = caps[1].parse::<Square>().ok()?;
    let to = caps[2].parse::<Square>().ok()?;
    Some((from, to))
}

pub fn parse_arrows(comment: &str) -> Vec<Arrow> {
    let mut arrows = Vec::new();

    for caps in DRAWING_RE.captures_iter(comment) {
        let is_square_mark = &caps[1] == "csl";
        for item in caps[2].split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(arrow) = parse_drawing(item, is_square_mark) {
                arrows.push(arrow);
            }
        }
    }

    arrows
}

fn parse_drawing(item: &str, is_square_mark: bool) -> Option<Arrow> {
    let color = ArrowColor::from_letter(item.chars().next()?)?;
    let squares = item.get(1..)?;

    let (tail, head) = if is_square_mark {
        let square = squares.parse::<Square>().ok()?;
        (square, square)
    } else {
        let tail = squares.get(..2)?.parse::<Square>().ok()?;
        let head = squares.get(2..)?.parse::<Square>().ok()?;
        (tail, head)
    };

    Some(Arrow { color, tail, head })
}

/// Comment text with every `[...]` token removed.
pub fn strip_tokens(comment: &str) -> String {
    BRACKET_TOKEN_RE.replace_all(comment, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_hms() {
        let clock = parse_clock("[%clk 1:30:43]").expect("clock");
        assert_eq!(clock, TimeDelta::seconds(5443));
    }

    #[test]
    fn test_parse_clock_fractional_seconds() {
        let clock = parse_clock("{ [%eval 0.2] [%clk 0:09:58.2] }").expect("clock");
        assert_eq!(clock, TimeDelta::milliseconds(598_200));
    }

    #[test]
    fn test_parse_clock_absent() {
        assert_eq!(parse_clock("just words"), None);
        assert_eq!(parse_clock("[%clk soon]"), None);
    }

    #[test]
    fn test_parse_clock_out_of_range_is_absent() {
        assert_eq!(parse_clock("[%clk 9223372036854775807:00:00]"), None);
        assert_eq!(parse_clock("[%clk 99999999999999999999:00:00]"), None);
        assert_eq!(parse_clock("[%clk 0:00:99999999999999999999999.5]"), None);
        assert_eq!(
            parse_clock("[%clk 100:00:00]"),
            Some(TimeDelta::hours(100))
        );
    }

    #[test]
    fn test_effect_category_takes_last_segment() {
        let comment = "[%c_effect e4;square;e4;type;Blunder;persistent;true;Blunder]";
        assert_eq!(effect_category(comment), Some("Blunder"));
        assert_eq!(
            effect_category("[%c_effect e4;GreatFind;Mistake] nice"),
            Some("Mistake")
        );
    }

    #[test]
    fn test_effect_category_is_stable_across_calls() {
        let comment = "[%c_effect d5;Inaccuracy] text";
        assert_eq!(effect_category(comment), effect_category(comment));
    }

    #[test]
    fn test_effect_category_malformed_token() {
        assert_eq!(effect_category("[%c_effect z9;Blunder]"), None);
        assert_eq!(effect_category("[%c_effect e4;]"), None);
        assert_eq!(effect_category("Blunder"), None);
    }

    #[test]
    fn test_suggestion_arrow_squares() {
        let (from, to) = suggestion_arrow("[%c_arrow e2e4;red]").expect("arrow");
        assert_eq!(from, Square::E2);
        assert_eq!(to, Square::E4);
        assert_eq!(suggestion_arrow("[%c_arrow e2;red]"), None);
    }

    #[test]
    fn test_parse_arrows_and_square_marks() {
        let arrows = parse_arrows("[%csl Gd4] [%cal Ge2e4,Rd8d1,Xa1a2]");
        assert_eq!(
            arrows,
            vec![
                Arrow {
                    color: ArrowColor::Green,
                    tail: Square::D4,
                    head: Square::D4,
                },
                Arrow {
                    color: ArrowColor::Green,
                    tail: Square::E2,
                    head: Square::E4,
                },
                Arrow {
                    color: ArrowColor::Red,
                    tail: Square::D8,
                    head: Square::D1,
                },
            ]
        );
    }

    #[test]
    fn test_strip_tokens_leaves_free_text() {
        assert_eq!(
            strip_tokens("[%c_effect e4;GreatFind;Blunder] good [%clk 0:01:00]"),
            "good"
        );
    }

    #[test]
    fn test_strip_tokens_only_tokens_is_empty() {
        assert_eq!(strip_tokens(" [%clk 0:01:00] [%c_arrow e2e4;red] "), "");
    }
}
