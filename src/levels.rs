use crate::game::Game;
use std::fmt;
use std::fs;
use std::io;

/// Error type for level parsing operations.
#[derive(Debug)]
pub enum LevelError {
    /// IO error when reading from file
    Io(io::Error),
    /// Invalid level content
    InvalidLevel(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io(err) => write!(f, "IO error: {}", err),
            LevelError::InvalidLevel(msg) => write!(f, "Invalid level: {}", msg),
        }
    }
}

impl From<io::Error> for LevelError {
    fn from(err: io::Error) -> Self {
        LevelError::Io(err)
    }
}

impl From<String> for LevelError {
    fn from(err: String) -> Self {
        LevelError::InvalidLevel(err)
    }
}

/// A collection of Sokoban levels in XSB format.
#[derive(Debug)]
pub struct Levels {
    levels: Vec<Game>,
}

impl Levels {
    /// Parse XSB-formatted Sokoban levels from a string.
    ///
    /// The XSB format uses:
    /// - Lines starting with `;` as level separators/comments
    /// - Standard Sokoban characters (#, @, $, ., *, +, space)
    /// - Empty lines between levels (optional)
    ///
    /// Parses and validates each level, returning a Levels struct containing Game instances.
    pub fn from_text(contents: &str) -> Result<Self, LevelError> {
        let mut levels = Vec::new();
        let mut current_level = String::new();

        for line in contents.lines() {
            // Skip comment lines (level separators)
            if line.trim_start().starts_with(';') {
                // If we have accumulated a level, parse and save it
                if !current_level.is_empty() {
                    // Remove trailing newline but preserve internal structure
                    let level_str = current_level.trim_end();
                    let game = Game::from_text(level_str)?;
                    levels.push(game);
                    current_level.clear();
                }
                continue;
            }

            // Skip empty lines when we don't have a level started
            if line.is_empty() {
                if !current_level.is_empty() {
                    // Empty line within a level - end of level
                    // Remove trailing newline but preserve internal structure
                    let level_str = current_level.trim_end();
                    let game = Game::from_text(level_str)?;
                    levels.push(game);
                    current_level.clear();
                }
                continue;
            }

            // Add line to current level
            current_level.push_str(line);
            current_level.push('\n');
        }

        // Don't forget the last level if file doesn't end with empty line
        if !current_level.is_empty() {
            // Remove trailing newline but preserve internal structure
            let level_str = current_level.trim_end();
            let game = Game::from_text(level_str)?;
            levels.push(game);
        }

        Ok(Levels { levels })
    }

    /// Parse XSB-formatted Sokoban levels from a text file.
    pub fn from_file(path: &str) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path)?;
        Self::from_text(&contents)
    }

    /// Get the nth level (0-indexed).
    pub fn get(&self, index: usize) -> Option<&Game> {
        self.levels.get(index)
    }

    /// Get the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }
}
