//! Turns PGN game records into a block sequence for print layout: annotated
//! move text with variations, board diagrams at branching points, and one
//! header per game.
//!
//! ```no_run
//! use chess_print::{RenderConfig, Source, assemble, load};
//!
//! let games = load(&Source::detect("games/*.pgn"))?;
//! let document = assemble(&games, &RenderConfig::default())?;
//! println!("{}", document.to_json().unwrap_or_default());
//! # Ok::<(), chess_print::Error>(())
//! ```

pub mod chess;

pub use chess::{
    Block, Document, Error, Game, RenderConfig, Result, Source, TreeRenderer, assemble, load,
};
