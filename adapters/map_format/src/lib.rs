#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Terrain-file loader for Lightkeep maps.
//!
//! A map file is plain text: exactly `height` lines, each carrying exactly
//! `width` whitespace-separated terrain tokens drawn from
//! `{W, ~, F, |, R, ., G, ,}`. Any deviation is a fatal format error naming
//! the file, the offending line, and the expected versus actual counts. The
//! loader only validates and shapes the data; the engine consumes the
//! resulting [`TerrainGrid`] through `World::from_terrain`.

use std::fs;
use std::path::Path;

use thiserror::Error;

use lightkeep_core::{CellCoord, TerrainGrid, TerrainKind};

/// Errors raised while reading or validating a map file.
#[derive(Debug, Error)]
pub enum MapFormatError {
    /// The file could not be read at all.
    #[error("failed to read map-file {file}")]
    Io {
        /// Name of the file that could not be read.
        file: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file carries the wrong number of lines.
    #[error("error in map-file {file}: {found} lines, expected {expected}")]
    LineCount {
        /// Name of the offending file.
        file: String,
        /// Number of lines actually present.
        found: usize,
        /// Number of lines the dimensions require.
        expected: usize,
    },
    /// A line carries the wrong number of terrain tokens.
    #[error("error in map-file {file}:{line}: {found} tokens, expected {expected}")]
    TokenCount {
        /// Name of the offending file.
        file: String,
        /// Zero-based index of the offending line.
        line: usize,
        /// Number of tokens actually present.
        found: usize,
        /// Number of tokens the dimensions require.
        expected: usize,
    },
    /// A token is not part of the terrain alphabet.
    #[error("error in map-file {file}:{line}: unknown terrain token `{token}`")]
    UnknownToken {
        /// Name of the offending file.
        file: String,
        /// Zero-based index of the offending line.
        line: usize,
        /// The token that failed to parse.
        token: String,
    },
}

/// Reads and validates a map file from disk.
pub fn load(
    path: &Path,
    width: u32,
    height: u32,
) -> Result<TerrainGrid, MapFormatError> {
    let name = path.display().to_string();
    tracing::info!(file = %name, "loading map file");
    let text = fs::read_to_string(path).map_err(|source| MapFormatError::Io {
        file: name.clone(),
        source,
    })?;
    parse(&name, &text, width, height)
}

/// Validates map text against the expected dimensions.
pub fn parse(
    name: &str,
    text: &str,
    width: u32,
    height: u32,
) -> Result<TerrainGrid, MapFormatError> {
    let lines: Vec<&str> = text.lines().collect();
    let expected_lines = height as usize;
    if lines.len() != expected_lines {
        let error = MapFormatError::LineCount {
            file: name.to_string(),
            found: lines.len(),
            expected: expected_lines,
        };
        tracing::error!(%error, "map rejected");
        return Err(error);
    }

    let expected_tokens = width as usize;
    let mut grid = TerrainGrid::filled(width, height, TerrainKind::Grass);
    for (row, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != expected_tokens {
            let error = MapFormatError::TokenCount {
                file: name.to_string(),
                line: row,
                found: tokens.len(),
                expected: expected_tokens,
            };
            tracing::error!(%error, "map rejected");
            return Err(error);
        }
        for (column, token) in tokens.iter().enumerate() {
            let kind = single_char(token)
                .and_then(TerrainKind::from_token)
                .ok_or_else(|| MapFormatError::UnknownToken {
                    file: name.to_string(),
                    line: row,
                    token: (*token).to_string(),
                })?;
            grid.set(CellCoord::new(column as u32, row as u32), kind);
        }
    }
    Ok(grid)
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}
