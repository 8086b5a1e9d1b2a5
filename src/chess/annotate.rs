use std::fmt;

use chrono::TimeDelta;
use shakmaty::{Color, Position, Role};
use tracing::warn;

use super::error::{Error, Result};
use super::metadata;
use super::types::{MoveTree, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveCategory {
    MissedWin,
    Mistake,
    Inaccuracy,
    Blunder,
    /// Any other effect tag (`Best`, `GreatFind`, `Brilliant`, ...).
    Other(String),
}

impl MoveCategory {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "MissedWin" => Self::MissedWin,
            "Mistake" => Self::Mistake,
            "Inaccuracy" => Self::Inaccuracy,
            "Blunder" => Self::Blunder,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_wrong(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::MissedWin => "MissedWin",
            Self::Mistake => "Mistake",
            Self::Inaccuracy => "Inaccuracy",
            Self::Blunder => "Blunder",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for MoveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_wrong_move(category: Option<&MoveCategory>) -> bool {
    category.is_some_and(MoveCategory::is_wrong)
}

/// Last remaining-clock reading per side. Reset at the start of every game.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockState {
    white: Option<TimeDelta>,
    black: Option<TimeDelta>,
}

impl ClockState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records `remaining` for `color` and returns the time used since that side's
    /// previous reading (zero on its first reading).
    pub fn observe(&mut self, color: Color, remaining: TimeDelta) -> TimeDelta {
        let slot = match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        let spent = slot.map_or(TimeDelta::zero(), |previous| previous - remaining);
        *slot = Some(remaining);
        spent
    }

    pub fn previous(&self, color: Color) -> Option<TimeDelta> {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub spent: TimeDelta,
    pub remaining: TimeDelta,
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(spent: {}, left: {})",
            format_duration(self.spent),
            format_duration(self.remaining)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationResult {
    pub category: Option<MoveCategory>,
    /// Emphasised category, e.g. `**Blunder**! `.
    pub category_text: String,
    pub suggestion: Option<String>,
    pub timing: Option<Timing>,
    /// Free text left after removing bracketed tokens.
    pub comment: String,
}

impl AnnotationResult {
    /// Timing, category, suggestion and free text, skipping empty pieces.
    pub fn text(&self) -> String {
        let timing = self.timing.map(|t| t.to_string()).unwrap_or_default();
        [
            timing.as_str(),
            self.category_text.as_str(),
            self.suggestion.as_deref().unwrap_or_default(),
            self.comment.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Extracts per-move commentary from whatever metadata encoding a source uses.
pub trait MoveAnnotator {
    fn category(&self, tree: &MoveTree, node: NodeId) -> Option<MoveCategory>;

    fn annotate(
        &self,
        tree: &MoveTree,
        node: NodeId,
        white_to_move: bool,
        clock: &mut ClockState,
    ) -> AnnotationResult;

    /// Feeds a node's clock reading into `clock` without producing any text.
    fn observe_clock(
        &self,
        tree: &MoveTree,
        node: NodeId,
        white_to_move: bool,
        clock: &mut ClockState,
    ) -> Option<Timing> {
        let remaining = tree.node(node).clock()?;
        let spent = clock.observe(color_of(white_to_move), remaining);
        Some(Timing { spent, remaining })
    }
}

/// Reads the `%c_effect` / `%c_arrow` commands written by chess.com game review.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessComAnnotator;

impl MoveAnnotator for ChessComAnnotator {
    fn category(&self, tree: &MoveTree, node: NodeId) -> Option<MoveCategory> {
        metadata::effect_category(&tree.node(node).comment).map(MoveCategory::parse)
    }

    fn annotate(
        &self,
        tree: &MoveTree,
        node: NodeId,
        white_to_move: bool,
        clock: &mut ClockState,
    ) -> AnnotationResult {
        let timing = self.observe_clock(tree, node, white_to_move, clock);
        let category = self.category(tree, node);
        let category_text = category
            .as_ref()
            .map(|c| format!("**{c}**! "))
            .unwrap_or_default();

        let suggestion = if is_wrong_move(category.as_ref()) {
            match suggest(tree, node) {
                Ok(text) => text,
                Err(err) => {
                    let san = &tree.node(node).san;
                    warn!(%san, "suggestion omitted: {err}");
                    None
                }
            }
        } else {
            None
        };

        AnnotationResult {
            category,
            category_text,
            suggestion,
            timing,
            comment: metadata::strip_tokens(&tree.node(node).comment),
        }
    }
}

/// Sentence describing the `%c_arrow` alternative, resolved on the position before `node`.
fn suggest(tree: &MoveTree, node: NodeId) -> Result<Option<String>> {
    let current = tree.node(node);
    let Some((from, to)) = metadata::suggestion_arrow(&current.comment) else {
        return Ok(None);
    };
    let Some(parent) = current.parent else {
        return Err(Error::DataInconsistency(format!(
            "arrow {from}{to} on a node without a previous position"
        )));
    };

    let before = &tree.node(parent).position;
    let piece = before.board().piece_at(from).ok_or_else(|| {
        Error::DataInconsistency(format!("arrow starts on empty square {from}"))
    })?;

    Ok(Some(format!(
        "{} should have played {} from {} to {} instead.",
        color_name(piece.color),
        piece_name(piece.role),
        from,
        to
    )))
}

fn color_of(white: bool) -> Color {
    if white { Color::White } else { Color::Black }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

pub fn piece_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

/// `H:MM:SS`, with `.ffffff` appended when there is a sub-second part.
pub fn format_duration(duration: TimeDelta) -> String {
    let sign = if duration < TimeDelta::zero() { "-" } else { "" };
    let duration = duration.abs();

    let total_seconds = duration.num_seconds();
    let micros = (duration - TimeDelta::seconds(total_seconds))
        .num_microseconds()
        .unwrap_or(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if micros == 0 {
        format!("{sign}{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{sign}{hours}:{minutes:02}:{seconds:02}.{micros:06}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::reader::{Source, load};
    use crate::chess::types::Game;

    fn game(pgn: &str) -> Game {
        load(&Source::Inline(pgn.to_string()))
            .expect("Should parse the game")
            .remove(0)
    }

    fn annotate_nth(game: &Game, halfmove: usize, clock: &mut ClockState) -> AnnotationResult {
        let node = game
            .tree
            .mainline()
            .nth(halfmove)
            .expect("Should have the move");
        ChessComAnnotator.annotate(&game.tree, node, halfmove % 2 == 0, clock)
    }

    #[test]
    fn test_blunder_with_suggestion_and_comment() {
        let game = game("1. e4 { [%c_effect e4;GreatFind;Blunder][%c_arrow e2e4;red] good } *");

        let result = annotate_nth(&game, 0, &mut ClockState::default());

        assert_eq!(result.category, Some(MoveCategory::Blunder));
        assert_eq!(result.category_text, "**Blunder**! ");
        assert_eq!(
            result.suggestion.as_deref(),
            Some("White should have played pawn from e2 to e4 instead.")
        );
        assert_eq!(result.comment, "good");
        assert_eq!(
            result.text(),
            "**Blunder**! White should have played pawn from e2 to e4 instead. good"
        );
    }

    #[test]
    fn test_black_suggestion_names_piece() {
        let game = game("1. e4 Nf6 { [%c_effect f6;Mistake][%c_arrow b8c6;#fa412d] } *");

        let result = annotate_nth(&game, 1, &mut ClockState::default());

        assert_eq!(
            result.suggestion.as_deref(),
            Some("Black should have played knight from b8 to c6 instead.")
        );
    }

    #[test]
    fn test_good_category_has_no_suggestion() {
        let game = game("1. e4 { [%c_effect e4;Best][%c_arrow d2d4;green] } *");

        let result = annotate_nth(&game, 0, &mut ClockState::default());

        assert_eq!(result.category, Some(MoveCategory::Other("Best".to_string())));
        assert!(result.suggestion.is_none());
        assert_eq!(result.text(), "**Best**!");
    }

    #[test]
    fn test_suggestion_from_empty_square_is_omitted() {
        let game = game("1. e4 { [%c_effect e4;Blunder][%c_arrow e5e6;red] } *");

        let result = annotate_nth(&game, 0, &mut ClockState::default());

        assert_eq!(result.category, Some(MoveCategory::Blunder));
        assert!(result.suggestion.is_none());
        assert_eq!(result.text(), "**Blunder**!");
    }

    #[test]
    fn test_move_without_metadata_has_empty_text() {
        let game = game("1. e4 *");

        let result = annotate_nth(&game, 0, &mut ClockState::default());

        assert_eq!(result, AnnotationResult::default());
        assert_eq!(result.text(), "");
    }

    #[test]
    fn test_first_clock_per_side_spends_nothing() {
        let game = game(
            "1. e4 { [%clk 0:03:00] } e5 { [%clk 0:02:58] } 2. Nf3 { [%clk 0:02:51.5] } *",
        );
        let mut clock = ClockState::default();

        let white = annotate_nth(&game, 0, &mut clock);
        let black = annotate_nth(&game, 1, &mut clock);
        let white_again = annotate_nth(&game, 2, &mut clock);

        assert_eq!(white.text(), "(spent: 0:00:00, left: 0:03:00)");
        assert_eq!(black.text(), "(spent: 0:00:00, left: 0:02:58)");
        assert_eq!(
            white_again.text(),
            "(spent: 0:00:08.500000, left: 0:02:51.500000)"
        );
        assert_eq!(clock.previous(Color::Black), Some(TimeDelta::seconds(178)));
    }

    #[test]
    fn test_clock_state_reset() {
        let mut clock = ClockState::default();
        clock.observe(Color::White, TimeDelta::seconds(60));
        clock.reset();

        assert_eq!(clock.previous(Color::White), None);
        assert_eq!(
            clock.observe(Color::White, TimeDelta::seconds(50)),
            TimeDelta::zero()
        );
    }

    #[test]
    fn test_wrong_move_categories() {
        for tag in ["MissedWin", "Mistake", "Inaccuracy", "Blunder"] {
            assert!(MoveCategory::parse(tag).is_wrong(), "{tag}");
            assert_eq!(MoveCategory::parse(tag).as_str(), tag);
        }
        assert!(!MoveCategory::parse("Brilliant").is_wrong());
        assert!(!is_wrong_move(None));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::zero()), "0:00:00");
        assert_eq!(format_duration(TimeDelta::seconds(3725)), "1:02:05");
        assert_eq!(format_duration(TimeDelta::milliseconds(1_500)), "0:00:01.500000");
        assert_eq!(format_duration(TimeDelta::seconds(-7)), "-0:00:07");
    }
}
