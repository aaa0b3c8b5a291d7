//! LS-8 program image format.
//!
//! An image is a plain text file:
//! - One 8-character binary literal per line
//! - `#` starts a comment, stripped before parsing
//! - Blank and comment-only lines are ignored
//!
//! Bytes load into consecutive memory cells starting at address 0.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone)]
pub struct ProgramImage {
    /// The program bytes, in load order.
    pub bytes: Vec<u8>,
    /// Original source lines (for debugging).
    pub source_lines: Vec<String>,
}

impl ProgramImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            source_lines: Vec::new(),
        }
    }

    /// Add a byte.
    pub fn push(&mut self, byte: u8, source: &str) {
        self.bytes.push(byte);
        self.source_lines.push(source.to_string());
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Default for ProgramImage {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse image text into bytes.
///
/// Kept separate from the file I/O so the format is testable on its
/// own; [`load_image`] is the filesystem-facing wrapper.
pub fn parse_image(source: &str) -> Result<ProgramImage, ImageError> {
    let mut image = ProgramImage::new();

    for (line_num, line) in source.lines().enumerate() {
        // Strip the trailing comment, then surrounding whitespace
        let code = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        };
        let token = code.trim();

        if token.is_empty() {
            continue;
        }

        if token.len() != 8 || !token.bytes().all(|c| c == b'0' || c == b'1') {
            return Err(ImageError::ParseError {
                line: line_num + 1,
                message: format!("expected an 8-character binary literal, found {:?}", token),
            });
        }

        // The characters are all binary digits, so this cannot fail
        let byte = u8::from_str_radix(token, 2).map_err(|e| ImageError::ParseError {
            line: line_num + 1,
            message: e.to_string(),
        })?;

        image.push(byte, line.trim());
    }

    Ok(image)
}

/// Load a program image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let source = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    parse_image(&source)
}

/// Save a program image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;

    writeln!(file, "# LS-8 image")
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    writeln!(file, "# {} bytes", bytes.len())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    writeln!(file).map_err(|e| ImageError::IoError(e.to_string()))?;

    for (addr, byte) in bytes.iter().enumerate() {
        writeln!(file, "{:08b} # {:02X}", byte, addr)
            .map_err(|e| ImageError::IoError(e.to_string()))?;
    }

    Ok(())
}

/// Errors that can occur during image operations.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}
