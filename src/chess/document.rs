//! Block sequence handed to an external layout engine.
//!
//! Text uses a small inline markup: `**bold**` and `_italic_`. Diagrams carry
//! enough to draw a board (FEN, highlighted move, arrows) plus a suggested
//! image file name.

use serde::Serialize;
use tracing::warn;

use super::annotate::MoveAnnotator;
use super::config::RenderConfig;
use super::error::Result;
use super::metadata::Arrow;
use super::render::TreeRenderer;
use super::types::{Game, NodeId};

/// Header keys shown in the title lines rather than as fields.
const PLAYER_KEYS: [&str; 4] = ["White", "Black", "WhiteElo", "BlackElo"];

/// Header value meaning "unknown".
const PLACEHOLDER: &str = "?";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Header(HeaderBlock),
    Paragraph { text: String },
    Diagram(DiagramBlock),
    PageBreak,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub name: String,
    pub elo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderBlock {
    pub white: Player,
    pub black: Player,
    /// Remaining headers in file order, placeholders dropped.
    pub fields: Vec<HeaderField>,
    pub font_size_delta: i8,
}

impl HeaderBlock {
    pub fn from_game(game: &Game, font_size_delta: i8) -> Self {
        let player = |name_key: &str, elo_key: &str| Player {
            name: game.header(name_key).unwrap_or(PLACEHOLDER).to_string(),
            elo: game
                .header(elo_key)
                .filter(|elo| !elo.is_empty() && *elo != PLACEHOLDER)
                .map(str::to_string),
        };

        let fields = game
            .headers
            .iter()
            .filter(|(key, value)| !PLAYER_KEYS.contains(&key.as_str()) && value != PLACEHOLDER)
            .map(|(name, value)| HeaderField {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        Self {
            white: player("White", "WhiteElo"),
            black: player("Black", "BlackElo"),
            fields,
            font_size_delta,
        }
    }

    /// Title lines (`**White** _[elo]_`, `vs.`, `**Black**`) followed by `Key: Value` lines.
    pub fn lines(&self) -> Vec<String> {
        let title = |player: &Player| match &player.elo {
            Some(elo) => format!("**{}** _[{}]_", player.name, elo),
            None => format!("**{}**", player.name),
        };

        let mut lines = vec![title(&self.white), "vs.".to_string(), title(&self.black)];
        lines.extend(
            self.fields
                .iter()
                .map(|field| format!("{}: {}", field.name, field.value)),
        );
        lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SquarePair {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramArrow {
    pub color: &'static str,
    pub from: String,
    pub to: String,
}

impl From<Arrow> for DiagramArrow {
    fn from(arrow: Arrow) -> Self {
        Self {
            color: arrow.color.as_str(),
            from: arrow.tail.to_string(),
            to: arrow.head.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramBlock {
    pub halfmove: usize,
    pub fen: String,
    pub last_move: Option<SquarePair>,
    pub arrows: Vec<DiagramArrow>,
    /// `<source>-<game>-<halfmove>.<ext>`, `game` standing in for inline sources.
    pub image_name: String,
}

impl DiagramBlock {
    pub fn new(game: &Game, node: NodeId, halfmove: usize, extension: &str) -> Self {
        let move_node = game.tree.node(node);
        let source = game.source.as_deref().unwrap_or("game");

        Self {
            halfmove,
            fen: move_node.fen(),
            last_move: move_node.last_move.map(|m| SquarePair {
                from: m.from.to_string(),
                to: m.to.to_string(),
            }),
            arrows: move_node.arrows().into_iter().map(DiagramArrow::from).collect(),
            image_name: format!("{source}-{}-{halfmove}.{extension}", game.index),
        }
    }

    /// Piece letters by rank (8 first) and file (a first), as written in the FEN board field.
    pub fn grid(&self) -> [[Option<char>; 8]; 8] {
        board_grid(&self.fen)
    }
}

pub fn board_grid(fen: &str) -> [[Option<char>; 8]; 8] {
    let mut grid = [[None; 8]; 8];
    let placement = fen.split(' ').next().unwrap_or_default();

    for (row, rank) in placement.split('/').take(8).enumerate() {
        let mut col = 0usize;
        for tile in rank.chars() {
            if let Some(skip) = tile.to_digit(10) {
                col += skip as usize;
            } else if "pnbrqkPNBRQK".contains(tile) {
                if col < 8 {
                    grid[row][col] = Some(tile);
                }
                col += 1;
            } else {
                warn!("{tile} is not valid in {placement}");
            }
        }
    }

    grid
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Header, move text and diagrams for every game, each game closed by a page break.
pub fn assemble(games: &[Game], config: &RenderConfig) -> Result<Document> {
    let renderer = TreeRenderer::new(config)?;
    Ok(assemble_with(&renderer, games))
}

pub fn assemble_with<A: MoveAnnotator>(renderer: &TreeRenderer<A>, games: &[Game]) -> Document {
    Document {
        blocks: games
            .iter()
            .flat_map(|game| renderer.render_game(game))
            .collect(),
    }
}
