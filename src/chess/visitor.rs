use super::error::Diagnostics;
use super::types::{Game, LastMove, MoveTree, NewMove, NodeId};

use pgn_reader::{RawComment, RawTag, SanPlus, Skip, Visitor};
use shakmaty::{CastlingMode, Chess, Position, fen::Fen, uci::UciMove};
use std::ops::ControlFlow;
use tracing::warn;

/// Streaming PGN visitor (pgn-reader) that builds a full [`MoveTree`],
/// variations included, replaying every SAN with shakmaty.
///
/// Illegal moves and a bad `FEN` tag are recovered from: they are logged,
/// recorded in [`Game::parse_error`], and the rest of the affected line is
/// dropped.
pub struct GameVisitor {
    source: Option<String>,
    next_index: usize,
}

pub struct TreeBuilder {
    headers: Vec<(String, String)>,
    tree: MoveTree,
    current: NodeId,
    /// Cursor and broken flag of each enclosing line, restored when its variation closes.
    /// Skipped variations push a frame too, so every `end_variation` has one to pop.
    stack: Vec<(NodeId, bool)>,
    /// Set after an illegal move; the remaining moves of the line are ignored.
    broken: bool,
    /// Comment text seen after `(` but before the variation's first move.
    starting_comment: Option<String>,
    diagnostics: Diagnostics,
}

impl TreeBuilder {
    fn new(headers: Vec<(String, String)>, start: Chess, diagnostics: Diagnostics) -> Self {
        Self {
            headers,
            tree: MoveTree::new(start),
            current: NodeId::ROOT,
            stack: Vec::new(),
            broken: false,
            starting_comment: None,
            diagnostics,
        }
    }

    fn ply_label(&self) -> usize {
        let mut ply = 0;
        let mut id = self.current;
        while let Some(parent) = self.tree.node(id).parent {
            ply += 1;
            id = parent;
        }
        ply + 1
    }
}

fn append_comment(target: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

impl GameVisitor {
    pub fn new(source: Option<String>) -> Self {
        Self {
            source,
            next_index: 1,
        }
    }

    fn starting_position(
        headers: &[(String, String)],
        diagnostics: &mut Diagnostics,
    ) -> Chess {
        let Some((_, raw)) = headers.iter().find(|(k, _)| k == "FEN") else {
            return Chess::default();
        };

        let parsed = raw
            .parse::<Fen>()
            .map_err(|e| e.to_string())
            .and_then(|fen| {
                fen.into_position::<Chess>(CastlingMode::Standard)
                    .map_err(|e| e.to_string())
            });

        match parsed {
            Ok(position) => position,
            Err(e) => {
                let msg = format!("Invalid FEN tag '{raw}': {e}; using the standard start position");
                warn!("{msg}");
                diagnostics.push(msg);
                Chess::default()
            }
        }
    }
}

impl Visitor for GameVisitor {
    type Tags = Vec<(String, String)>;
    type Movetext = TreeBuilder;
    type Output = Game;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let key = String::from_utf8_lossy(key).into_owned();
        if !tags.iter().any(|(k, _)| *k == key) {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            tags.push((key, value));
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let mut diagnostics = Diagnostics::default();
        let start = Self::starting_position(&tags, &mut diagnostics);
        ControlFlow::Continue(TreeBuilder::new(tags, start, diagnostics))
    }

    fn san(&mut self, builder: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        if builder.broken {
            return ControlFlow::Continue(());
        }

        let mut position = builder.tree.node(builder.current).position.clone();
        let m = match san_plus.san.to_move(&position) {
            Ok(m) => m,
            Err(e) => {
                let msg = format!(
                    "Illegal move '{}' at ply {} of game {}: {}; skipping the rest of the line",
                    san_plus,
                    builder.ply_label(),
                    self.next_index,
                    e
                );
                warn!("{msg}");
                builder.diagnostics.push(msg);
                builder.broken = true;
                return ControlFlow::Continue(());
            }
        };

        let last_move = match m.to_uci(CastlingMode::Standard) {
            UciMove::Normal { from, to, .. } => Some(LastMove { from, to }),
            _ => None,
        };
        position.play_unchecked(m);

        let node = NewMove {
            san: san_plus.to_string(),
            last_move,
            position,
            starting_comment: builder.starting_comment.take().unwrap_or_default(),
        };
        builder.current = builder.tree.add_child(builder.current, node.into());
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        builder: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let text = String::from_utf8_lossy(comment.as_bytes());
        let text = text.trim();

        if let Some(pending) = builder.starting_comment.as_mut() {
            append_comment(pending, text);
        } else if !builder.broken {
            append_comment(&mut builder.tree.node_mut(builder.current).comment, text);
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, builder: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        // A variation replaces the move just played, so it starts from that move's parent.
        builder.stack.push((builder.current, builder.broken));
        let parent = builder.tree.node(builder.current).parent;
        let Some(parent) = parent.filter(|_| !builder.broken) else {
            return ControlFlow::Continue(Skip(true));
        };

        builder.current = parent;
        builder.starting_comment = Some(String::new());
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, builder: &mut Self::Movetext) -> ControlFlow<Self::Output> {
        if let Some((current, broken)) = builder.stack.pop() {
            builder.current = current;
            builder.broken = broken;
        }
        builder.starting_comment = None;
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, builder: Self::Movetext) -> Self::Output {
        let TreeBuilder {
            headers,
            tree,
            mut diagnostics,
            ..
        } = builder;
        let index = self.next_index;
        self.next_index += 1;

        Game {
            headers,
            tree,
            source: self.source.clone(),
            index,
            parse_error: diagnostics.take(),
        }
    }
}
