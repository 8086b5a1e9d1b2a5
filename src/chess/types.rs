use chrono::TimeDelta;
use shakmaty::{Chess, Color, EnPassantMode, Position, Square, fen::Fen};
use smallvec::SmallVec;

use super::metadata::{self, Arrow};

/// Index of a node inside its owning [`MoveTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// From/to squares of the move that led to a node, used to highlight it on a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastMove {
    pub from: Square,
    pub to: Square,
}

#[derive(Debug, Clone)]
pub struct MoveNode {
    /// SAN of the move leading here, including `+`/`#`. Empty for the root.
    pub san: String,
    pub last_move: Option<LastMove>,
    pub position: Chess,
    pub comment: String,
    /// Comment written before the first move of a variation.
    pub starting_comment: String,
    pub parent: Option<NodeId>,
    /// Continuations from this position; index 0 is the mainline.
    pub children: SmallVec<[NodeId; 2]>,
}

impl MoveNode {
    fn root(position: Chess) -> Self {
        Self {
            san: String::new(),
            last_move: None,
            position,
            comment: String::new(),
            starting_comment: String::new(),
            parent: None,
            children: SmallVec::new(),
        }
    }

    /// Remaining clock embedded as `[%clk ...]`.
    pub fn clock(&self) -> Option<TimeDelta> {
        metadata::parse_clock(&self.comment)
    }

    /// Arrows and square marks embedded as `[%cal ...]` / `[%csl ...]`.
    pub fn arrows(&self) -> Vec<Arrow> {
        metadata::parse_arrows(&self.comment)
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    pub fn has_alternatives(&self, tree: &MoveTree) -> bool {
        self.parent
            .is_some_and(|parent| tree.node(parent).children.len() > 1)
    }
}

/// Arena holding every node of one game. Node 0 is the starting position.
#[derive(Debug, Clone)]
pub struct MoveTree {
    nodes: Vec<MoveNode>,
}

impl MoveTree {
    pub fn new(start: Chess) -> Self {
        Self {
            nodes: vec![MoveNode::root(start)],
        }
    }

    pub fn node(&self, id: NodeId) -> &MoveNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut MoveNode {
        &mut self.nodes[id.0]
    }

    pub fn root(&self) -> &MoveNode {
        self.node(NodeId::ROOT)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds only the starting position.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, mut node: MoveNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Nodes reached by repeatedly following the first child, excluding `from` itself.
    pub fn mainline_from(&self, from: NodeId) -> Mainline<'_> {
        Mainline {
            tree: self,
            current: from,
        }
    }

    pub fn mainline(&self) -> Mainline<'_> {
        self.mainline_from(NodeId::ROOT)
    }

    /// Side that played the move leading to `id`.
    pub fn mover(&self, id: NodeId) -> Option<Color> {
        let parent = self.node(id).parent?;
        Some(self.node(parent).position.turn())
    }
}

pub struct Mainline<'a> {
    tree: &'a MoveTree,
    current: NodeId,
}

impl Iterator for Mainline<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let next = *self.tree.node(self.current).children.first()?;
        self.current = next;
        Some(next)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewMove {
    pub san: String,
    pub last_move: Option<LastMove>,
    pub position: Chess,
    pub starting_comment: String,
}

impl From<NewMove> for MoveNode {
    fn from(mv: NewMove) -> Self {
        Self {
            san: mv.san,
            last_move: mv.last_move,
            position: mv.position,
            comment: String::new(),
            starting_comment: mv.starting_comment,
            parent: None,
            children: SmallVec::new(),
        }
    }
}

/// One parsed game. Immutable once the store hands it out.
#[derive(Debug, Clone)]
pub struct Game {
    /// Header pairs in file order; the first occurrence of a key wins.
    pub headers: Vec<(String, String)>,
    pub tree: MoveTree,
    /// File the game came from, `None` for inline text.
    pub source: Option<String>,
    /// 1-based position within its source.
    pub index: usize,
    /// Recovered problems (bad FEN, illegal moves), `"; "`-separated.
    pub parse_error: Option<String>,
}

impl Game {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// A game with neither headers nor moves is what the reader yields for stray text.
    pub fn is_valid(&self) -> bool {
        !self.headers.is_empty() || !self.tree.is_empty()
    }
}
