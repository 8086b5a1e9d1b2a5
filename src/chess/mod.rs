pub mod annotate;
pub mod config;
pub mod document;
pub mod error;
pub mod metadata;
pub mod reader;
pub mod render;
pub mod types;
mod visitor;

pub use annotate::{AnnotationResult, ChessComAnnotator, ClockState, MoveAnnotator, MoveCategory};
pub use config::RenderConfig;
pub use document::{Block, DiagramBlock, Document, HeaderBlock, assemble};
pub use error::{Diagnostics, Error, Result};
pub use reader::{Source, load};
pub use render::{RenderContext, TreeRenderer};
pub use types::{Game, MoveNode, MoveTree, NodeId};
