//! LC-3 object image format.
//!
//! An image is a big-endian stream of 16-bit words:
//! - word 0 is the origin address
//! - the remaining words are stored consecutively starting at the origin
//!
//! Words that would run past address 0xFFFF are dropped, and a trailing odd
//! byte is ignored.

use crate::console::Console;
use crate::cpu::Cpu;
use std::path::{Path, PathBuf};
use std::io;
use thiserror::Error;
use tracing::debug;

/// A parsed program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Load address of the first word.
    pub origin: u16,
    /// Program words in host order.
    pub words: Vec<u16>,
}

impl Image {
    /// Create an image from words already in host order.
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        Self { origin, words }
    }

    /// Parse the raw contents of an image file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut words = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

        let origin = words.next().ok_or(ImageError::MissingOrigin)?;
        Ok(Self {
            origin,
            words: words.collect(),
        })
    }

    /// Serialize back to the on-disk representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Get the number of program words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the image has no program words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, ImageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let image = Image::from_bytes(&bytes)?;
    debug!(path = %path.display(), words = image.len(), "read image with origin {:#06x}", image.origin);
    Ok(image)
}

impl<C: Console> Cpu<C> {
    /// Copy an image into memory, overwriting whatever was there.
    ///
    /// Returns the number of words stored.
    pub fn load_image(&mut self, image: &Image) -> usize {
        let stored = self.mem.load(image.origin, &image.words);
        if stored < image.len() {
            debug!(dropped = image.len() - stored, "image runs past end of memory");
        }
        stored
    }
}

/// Errors that can occur while loading an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("image is too short to hold an origin word")]
    MissingOrigin,
}
