use super::error::{Error, Result};
use super::types::Game;
use super::visitor::GameVisitor;

use pgn_reader::Reader;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zstd::stream::read::Decoder as ZstdDecoder;

pub type PgnInput = Box<dyn Read>;

/// Where games are loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// One PGN file; every game in it is read.
    Path(PathBuf),
    /// Glob pattern; matching files are read in order.
    Glob(String),
    /// PGN text; exactly one game is read.
    Inline(String),
}

impl Source {
    /// Existing file → `Path`; a single word with `*` or `?` → `Glob`; anything else → `Inline`.
    pub fn detect(raw: &str) -> Self {
        let path = Path::new(raw);
        let single_word = !raw.trim().is_empty() && !raw.contains(char::is_whitespace);
        if single_word && path.is_file() {
            Self::Path(path.to_path_buf())
        } else if single_word && raw.contains(['*', '?']) {
            Self::Glob(raw.to_string())
        } else {
            Self::Inline(raw.to_string())
        }
    }

    fn origin(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Glob(pattern) => pattern.clone(),
            Self::Inline(_) => "inline PGN text".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    fn for_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

/// Loads every game `source` provides, in input order.
///
/// Fails with [`Error::Parse`] when nothing in the source is a game.
pub fn load(source: &Source) -> Result<Vec<Game>> {
    let games = match source {
        Source::Path(path) => read_file(path)?,
        Source::Glob(pattern) => read_glob(pattern)?,
        Source::Inline(text) => read_inline(text)?.into_iter().collect(),
    };

    if games.is_empty() {
        return Err(Error::Parse {
            origin: source.origin(),
        });
    }

    let origin = source.origin();
    debug!(count = games.len(), %origin, "loaded games");
    Ok(games)
}

fn open_input_stream(path: &Path) -> Result<PgnInput> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;

    match CompressionMode::for_path(path) {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|e| Error::io(path, e)),
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_file(path: &Path) -> Result<Vec<Game>> {
    let input = open_input_stream(path)?;
    // pgn-reader buffers internally, so no BufReader here.
    let mut reader = Reader::new(input);
    let mut visitor = GameVisitor::new(Some(source_name(path)));
    let mut games = Vec::new();

    while let Some(game) = read_next_game(&mut reader, &mut visitor, path)? {
        games.push(game);
    }

    Ok(games)
}

fn read_glob(pattern: &str) -> Result<Vec<Game>> {
    let paths: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|source| Error::Pattern {
            pattern: pattern.to_string(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .collect();

    if paths.len() == 1 {
        return read_file(&paths[0]);
    }

    let mut games = Vec::new();
    for path in &paths {
        match read_file(path) {
            Ok(mut file_games) => games.append(&mut file_games),
            Err(err) => warn!("{err}; skipping file"),
        }
    }
    Ok(games)
}

fn read_inline(text: &str) -> Result<Option<Game>> {
    let mut reader = Reader::new(io::Cursor::new(text.as_bytes()));
    let mut visitor = GameVisitor::new(None);
    read_next_game(&mut reader, &mut visitor, Path::new("<inline>"))
}

/// Next game with headers or moves; games that are neither are skipped.
fn read_next_game<R: Read>(
    reader: &mut Reader<R>,
    visitor: &mut GameVisitor,
    path: &Path,
) -> Result<Option<Game>> {
    loop {
        match reader.read_game(visitor) {
            Ok(Some(game)) if game.is_valid() => {
                if let Some(parse_error) = game.parse_error.as_deref() {
                    debug!(game = game.index, "recovered while parsing: {parse_error}");
                }
                return Ok(Some(game));
            }
            Ok(Some(game)) => {
                debug!(game = game.index, "skipping game without headers or moves");
            }
            Ok(None) => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const THREE_GAMES: &str = r#"[Event "One"]
[White "A"]
[Black "B"]

1. e4 e5 1-0

[Event "Two"]
[White "C"]
[Black "D"]

1. d4 d5 0-1

[Event "Three"]
[White "E"]
[Black "F"]

1. c4 1/2-1/2
"#;

    fn write_temp(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(contents).expect("write fixture");
        file
    }

    #[test]
    fn test_load_file_reads_all_games_in_order() {
        let file = write_temp(".pgn", THREE_GAMES.as_bytes());

        let games = load(&Source::Path(file.path().to_path_buf())).expect("games");

        let events: Vec<_> = games.iter().map(|g| g.header("Event")).collect();
        assert_eq!(events, vec![Some("One"), Some("Two"), Some("Three")]);
        assert_eq!(
            games.iter().map(|g| g.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(games[0].source.as_deref().is_some_and(|s| s.ends_with(".pgn")));
    }

    #[test]
    fn test_load_inline_reads_exactly_one_game() {
        let games = load(&Source::Inline(THREE_GAMES.to_string())).expect("games");

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].header("Event"), Some("One"));
        assert!(games[0].source.is_none());
    }

    #[test]
    fn test_load_empty_inline_is_parse_error() {
        let err = load(&Source::Inline(String::new())).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));

        let err = load(&Source::Inline("  \n\n ".to_string())).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_load_empty_file_is_parse_error() {
        let file = write_temp(".pgn", b"\n");

        let err = load(&Source::Path(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load(&Source::Path(PathBuf::from("/nonexistent/games.pgn"))).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_load_zstd_compressed_file() {
        let compressed = zstd::stream::encode_all(THREE_GAMES.as_bytes(), 0).expect("compress");
        let file = write_temp(".pgn.zst", &compressed);

        let games = load(&Source::Path(file.path().to_path_buf())).expect("games");
        assert_eq!(games.len(), 3);
    }

    #[test]
    fn test_load_glob_concatenates_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("a.pgn"), THREE_GAMES).expect("write a");
        std::fs::write(dir.path().join("b.pgn"), "[Event \"Four\"]\n1. e4 *\n").expect("write b");

        let pattern = format!("{}/*.pgn", dir.path().display());
        let games = load(&Source::Glob(pattern)).expect("games");

        assert_eq!(games.len(), 4);
        assert_eq!(games[3].header("Event"), Some("Four"));
        assert_eq!(games[3].source.as_deref(), Some("b.pgn"));
    }

    #[test]
    fn test_load_glob_without_matches_is_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let pattern = format!("{}/*.pgn", dir.path().display());

        let err = load(&Source::Glob(pattern)).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_source_detect() {
        let file = write_temp(".pgn", THREE_GAMES.as_bytes());
        let path = file.path().display().to_string();

        assert_eq!(Source::detect(&path), Source::Path(file.path().to_path_buf()));
        assert_eq!(
            Source::detect("games/*.pgn"),
            Source::Glob("games/*.pgn".to_string())
        );
        assert_eq!(
            Source::detect("1. e4 e5"),
            Source::Inline("1. e4 e5".to_string())
        );
    }
}
