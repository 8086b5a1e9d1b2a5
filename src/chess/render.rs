//! Mainline and variation text for one game.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use tracing::debug;

use super::annotate::{ChessComAnnotator, ClockState, MoveAnnotator, is_wrong_move};
use super::config::RenderConfig;
use super::document::{Block, DiagramBlock, HeaderBlock};
use super::error::Result;
use super::types::{Game, MoveTree, NodeId};

/// Stripped from rendered mainline text.
const HIGHLIGHT_MARKER: &str = "<*>";

/// Mutable state threaded through one game's rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub clock: ClockState,
}

pub struct TreeRenderer<A = ChessComAnnotator> {
    annotator: A,
    wrong_moves_only: bool,
    anchors: BTreeSet<usize>,
    header_font_delta: i8,
    diagram_extension: String,
}

impl TreeRenderer<ChessComAnnotator> {
    pub fn new(config: &RenderConfig) -> Result<Self> {
        Self::with_annotator(config, ChessComAnnotator)
    }
}

impl<A: MoveAnnotator> TreeRenderer<A> {
    pub fn with_annotator(config: &RenderConfig, annotator: A) -> Result<Self> {
        Ok(Self {
            annotator,
            wrong_moves_only: config.wrong_moves_only,
            anchors: config.diagram_halfmoves()?.into_iter().collect(),
            header_font_delta: config.header_font_delta,
            diagram_extension: config.diagram_extension.clone(),
        })
    }

    /// Text for the move at `node`, played at 0-based `halfmove`, followed by one
    /// italic parenthesised group per alternative to it. Alternatives are
    /// rendered recursively along their own mainlines, after any comment written
    /// before their first move.
    pub fn render(
        &self,
        tree: &MoveTree,
        node: NodeId,
        halfmove: usize,
        ctx: &mut RenderContext,
    ) -> String {
        let white_to_move = halfmove.is_multiple_of(2);
        let number = halfmove / 2 + 1;

        let prefix = if white_to_move {
            format!("{number}. ")
        } else {
            String::new()
        };
        let mut text = self.move_text(tree, node, &prefix, white_to_move, ctx);

        let Some(parent) = tree.node(node).parent else {
            return text;
        };

        let variation_prefix = if white_to_move {
            format!("{number}. ")
        } else {
            format!("{number}... ")
        };
        for &alternative in tree.node(parent).children.iter().skip(1) {
            let opening = tree.node(alternative).starting_comment.as_str();
            let mut variation = if opening.is_empty() {
                String::new()
            } else {
                format!("{opening} ")
            };
            variation.push_str(&self.move_text(
                tree,
                alternative,
                &variation_prefix,
                white_to_move,
                ctx,
            ));
            for (offset, next) in tree.mainline_from(alternative).enumerate() {
                variation.push(' ');
                variation.push_str(&self.render(tree, next, halfmove + 1 + offset, ctx));
            }
            let _ = write!(text, " (_{variation}_)");
        }

        text
    }

    fn move_text(
        &self,
        tree: &MoveTree,
        node: NodeId,
        prefix: &str,
        white_to_move: bool,
        ctx: &mut RenderContext,
    ) -> String {
        let annotation = self
            .annotator
            .annotate(tree, node, white_to_move, &mut ctx.clock)
            .text();
        let san = &tree.node(node).san;

        if annotation.is_empty() {
            format!("**{prefix}{san}**")
        } else {
            format!("**{prefix}{san}** {annotation}")
        }
    }

    /// Header, paragraphs and diagrams for one game, closed by a page break.
    pub fn render_game(&self, game: &Game) -> Vec<Block> {
        let tree = &game.tree;
        let mut ctx = RenderContext::default();
        let mut blocks = vec![Block::Header(HeaderBlock::from_game(
            game,
            self.header_font_delta,
        ))];
        let mut paragraph = String::new();

        for (halfmove, node) in tree.mainline().enumerate() {
            let white_to_move = halfmove.is_multiple_of(2);
            let anchor = self.anchors.contains(&halfmove);

            if self.wrong_moves_only
                && !anchor
                && !is_wrong_move(self.annotator.category(tree, node).as_ref())
            {
                self.annotator
                    .observe_clock(tree, node, white_to_move, &mut ctx.clock);
                continue;
            }

            if anchor || tree.node(node).has_alternatives(tree) {
                flush_paragraph(&mut blocks, &mut paragraph);
                blocks.push(Block::Diagram(DiagramBlock::new(
                    game,
                    node,
                    halfmove,
                    &self.diagram_extension,
                )));
            }

            let rendered = self.render(tree, node, halfmove, &mut ctx);
            let rendered = rendered.replace(HIGHLIGHT_MARKER, "");
            if anchor && !white_to_move {
                let _ = write!(paragraph, "**{}...** ", halfmove / 2 + 1);
            }
            paragraph.push_str(rendered.trim());
            paragraph.push(' ');
        }

        flush_paragraph(&mut blocks, &mut paragraph);
        blocks.push(Block::PageBreak);

        debug!(game = game.index, blocks = blocks.len(), "rendered game");
        blocks
    }
}

fn flush_paragraph(blocks: &mut Vec<Block>, paragraph: &mut String) {
    let text = paragraph.trim();
    if !text.is_empty() {
        blocks.push(Block::Paragraph {
            text: text.to_string(),
        });
    }
    paragraph.clear();
}
