//! Large object wrappers.
//!
//! A LOB read from a result set is either left as the driver's live
//! [`LobLocator`] or, when the driver reports a size at or above the
//! dialect's prefetch threshold, copied into a [`MaterializedBlob`] or
//! [`MaterializedClob`] that owns its content and no longer needs the
//! connection.
//!
//! Positions are one-based, as in SQL.

use std::fmt;
use std::sync::Arc;

use crate::error::{DialectError, Result};

/// A driver-side handle onto LOB content.
pub trait LobLocator: Send + Sync + fmt::Debug {
    /// Length in bytes for binary LOBs, characters for character LOBs.
    fn length(&self) -> Result<u64>;

    /// Reads the complete binary content.
    fn read_bytes(&self) -> Result<Vec<u8>>;

    /// Reads the complete character content.
    fn read_string(&self) -> Result<String>;
}

/// A binary LOB value as seen by callers.
#[derive(Debug, Clone)]
pub enum BlobValue {
    /// Still backed by the driver.
    Locator(Arc<dyn LobLocator>),
    /// Copied out of the driver.
    Materialized(MaterializedBlob),
}

/// A character LOB value as seen by callers.
#[derive(Debug, Clone)]
pub enum ClobValue {
    Locator(Arc<dyn LobLocator>),
    Materialized(MaterializedClob),
}

impl BlobValue {
    /// Reads the whole content, going back to the driver for locators.
    ///
    /// # Errors
    ///
    /// Propagates locator errors and [`DialectError::LobFreed`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Locator(locator) => locator.read_bytes(),
            Self::Materialized(blob) => blob.bytes().map(<[u8]>::to_vec),
        }
    }

    #[must_use]
    pub const fn is_materialized(&self) -> bool {
        matches!(self, Self::Materialized(_))
    }
}

impl ClobValue {
    /// Reads the whole content, going back to the driver for locators.
    ///
    /// # Errors
    ///
    /// Propagates locator errors and [`DialectError::LobFreed`].
    pub fn to_string_value(&self) -> Result<String> {
        match self {
            Self::Locator(locator) => locator.read_string(),
            Self::Materialized(clob) => clob.as_str().map(str::to_string),
        }
    }

    #[must_use]
    pub const fn is_materialized(&self) -> bool {
        matches!(self, Self::Materialized(_))
    }
}

impl PartialEq for BlobValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Locator(a), Self::Locator(b)) => Arc::ptr_eq(a, b),
            (Self::Materialized(a), Self::Materialized(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for ClobValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Locator(a), Self::Locator(b)) => Arc::ptr_eq(a, b),
            (Self::Materialized(a), Self::Materialized(b)) => a == b,
            _ => false,
        }
    }
}

/// An in-memory binary LOB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedBlob {
    content: Option<Vec<u8>>,
}

impl Default for MaterializedBlob {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MaterializedBlob {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self {
            content: Some(bytes),
        }
    }

    /// Copies the locator's content.
    ///
    /// # Errors
    ///
    /// Propagates the locator's read error.
    pub fn from_locator(locator: &dyn LobLocator) -> Result<Self> {
        Ok(Self::new(locator.read_bytes()?))
    }

    fn content(&self) -> Result<&Vec<u8>> {
        self.content.as_ref().ok_or(DialectError::LobFreed)
    }

    fn content_mut(&mut self) -> Result<&mut Vec<u8>> {
        self.content.as_mut().ok_or(DialectError::LobFreed)
    }

    /// Content length in bytes.
    ///
    /// # Errors
    ///
    /// Fails once the LOB has been freed.
    pub fn length(&self) -> Result<u64> {
        Ok(self.content()?.len() as u64)
    }

    /// The whole content.
    ///
    /// # Errors
    ///
    /// Fails once the LOB has been freed.
    pub fn bytes(&self) -> Result<&[u8]> {
        self.content().map(Vec::as_slice)
    }

    /// Returns up to `len` bytes starting at one-based `position`.
    ///
    /// # Errors
    ///
    /// Fails once freed, or when `position` is outside `1..=length + 1`.
    pub fn get_bytes(&self, position: u64, len: usize) -> Result<Vec<u8>> {
        let content = self.content()?;
        let start = start_index(position, content.len() as u64)?;
        let end = start.saturating_add(len).min(content.len());
        Ok(content[start..end].to_vec())
    }

    /// Writes `bytes` at one-based `position`, growing the content as needed.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Fails once freed, or when `position` would leave a gap.
    pub fn set_bytes(&mut self, position: u64, bytes: &[u8]) -> Result<usize> {
        let content = self.content_mut()?;
        let start = start_index(position, content.len() as u64)?;
        let overlap = (content.len() - start).min(bytes.len());
        content[start..start + overlap].copy_from_slice(&bytes[..overlap]);
        content.extend_from_slice(&bytes[overlap..]);
        Ok(bytes.len())
    }

    /// Keeps the first `len` bytes.
    ///
    /// # Errors
    ///
    /// Fails once freed, or when `len` exceeds the current length.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        let content = self.content_mut()?;
        let length = content.len() as u64;
        let keep = usize::try_from(len)
            .ok()
            .filter(|_| len <= length)
            .ok_or(DialectError::LobTruncate {
                requested: len,
                length,
            })?;
        content.truncate(keep);
        Ok(())
    }

    /// Releases the content. Every later operation fails.
    pub fn free(&mut self) {
        self.content = None;
    }

    #[must_use]
    pub const fn is_freed(&self) -> bool {
        self.content.is_none()
    }
}

/// An in-memory character LOB. Lengths and positions count characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedClob {
    content: Option<String>,
    nationalized: bool,
}

impl Default for MaterializedClob {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl MaterializedClob {
    #[must_use]
    pub const fn new(content: String) -> Self {
        Self {
            content: Some(content),
            nationalized: false,
        }
    }

    /// An `NCLOB` flavoured wrapper.
    #[must_use]
    pub const fn nationalized(content: String) -> Self {
        Self {
            content: Some(content),
            nationalized: true,
        }
    }

    /// Copies the locator's content.
    ///
    /// # Errors
    ///
    /// Propagates the locator's read error.
    pub fn from_locator(locator: &dyn LobLocator, nationalized: bool) -> Result<Self> {
        let content = locator.read_string()?;
        Ok(Self {
            content: Some(content),
            nationalized,
        })
    }

    #[must_use]
    pub const fn is_nationalized(&self) -> bool {
        self.nationalized
    }

    fn content(&self) -> Result<&String> {
        self.content.as_ref().ok_or(DialectError::LobFreed)
    }

    fn content_mut(&mut self) -> Result<&mut String> {
        self.content.as_mut().ok_or(DialectError::LobFreed)
    }

    /// Content length in characters.
    ///
    /// # Errors
    ///
    /// Fails once the LOB has been freed.
    pub fn length(&self) -> Result<u64> {
        Ok(self.content()?.chars().count() as u64)
    }

    /// The whole content.
    ///
    /// # Errors
    ///
    /// Fails once the LOB has been freed.
    pub fn as_str(&self) -> Result<&str> {
        self.content().map(String::as_str)
    }

    /// Returns up to `len` characters starting at one-based `position`.
    ///
    /// # Errors
    ///
    /// Fails once freed, or when `position` is out of range.
    pub fn get_sub_string(&self, position: u64, len: usize) -> Result<String> {
        let content = self.content()?;
        let start = start_index(position, content.chars().count() as u64)?;
        Ok(content.chars().skip(start).take(len).collect())
    }

    /// The content encoded as ISO-8859-1; unmappable characters become `?`.
    ///
    /// # Errors
    ///
    /// Fails once the LOB has been freed.
    pub fn ascii_bytes(&self) -> Result<Vec<u8>> {
        Ok(self
            .content()?
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect())
    }

    /// One-based position of `pattern` at or after `start`, if present.
    ///
    /// # Errors
    ///
    /// Fails once freed, or when `start` is out of range.
    pub fn position(&self, pattern: &str, start: u64) -> Result<Option<u64>> {
        let content = self.content()?;
        let skip = start_index(start, content.chars().count() as u64)?;
        let byte_offset = content
            .char_indices()
            .nth(skip)
            .map_or(content.len(), |(i, _)| i);
        Ok(content[byte_offset..]
            .find(pattern)
            .map(|found| (content[..byte_offset + found].chars().count() + 1) as u64))
    }

    /// Writes `text` at one-based `position`, growing the content as needed.
    /// Returns the number of characters written.
    ///
    /// # Errors
    ///
    /// Fails once freed, or when `position` would leave a gap.
    pub fn set_string(&mut self, position: u64, text: &str) -> Result<usize> {
        let content = self.content_mut()?;
        let mut chars: Vec<char> = content.chars().collect();
        let start = start_index(position, chars.len() as u64)?;
        let written: Vec<char> = text.chars().collect();
        let overlap = (chars.len() - start).min(written.len());
        chars[start..start + overlap].copy_from_slice(&written[..overlap]);
        chars.extend_from_slice(&written[overlap..]);
        *content = chars.into_iter().collect();
        Ok(written.len())
    }

    /// Keeps the first `len` characters.
    ///
    /// # Errors
    ///
    /// Fails once freed, or when `len` exceeds the current length.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        let content = self.content_mut()?;
        let length = content.chars().count() as u64;
        if len > length {
            return Err(DialectError::LobTruncate {
                requested: len,
                length,
            });
        }
        let keep: String = content.chars().take(char_count(len)).collect();
        *content = keep;
        Ok(())
    }

    /// Releases the content. Every later operation fails.
    pub fn free(&mut self) {
        self.content = None;
    }

    #[must_use]
    pub const fn is_freed(&self) -> bool {
        self.content.is_none()
    }
}

fn char_count(len: u64) -> usize {
    usize::try_from(len).unwrap_or(usize::MAX)
}

/// Converts a one-based position into an index; `length + 1` appends.
fn start_index(position: u64, length: u64) -> Result<usize> {
    if position == 0 || position > length + 1 {
        return Err(DialectError::LobPosition { position, length });
    }
    usize::try_from(position - 1).map_err(|_| DialectError::LobPosition { position, length })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_truncate_keeps_prefix() {
        let mut blob = MaterializedBlob::default();
        blob.set_bytes(1, b"abcdefgh").unwrap();
        blob.truncate(3).unwrap();
        assert_eq!(blob.bytes().unwrap(), b"abc");
        assert_eq!(blob.length().unwrap(), 3);
    }

    #[test]
    fn test_blob_truncate_beyond_length_fails() {
        let mut blob = MaterializedBlob::new(vec![1, 2]);
        assert!(matches!(
            blob.truncate(5),
            Err(DialectError::LobTruncate {
                requested: 5,
                length: 2
            })
        ));
    }

    #[test]
    fn test_blob_positional_access() {
        let mut blob = MaterializedBlob::new(b"hello".to_vec());
        assert_eq!(blob.get_bytes(2, 3).unwrap(), b"ell");
        assert_eq!(blob.get_bytes(4, 100).unwrap(), b"lo");
        blob.set_bytes(5, b"O!").unwrap();
        assert_eq!(blob.bytes().unwrap(), b"hellO!");
        assert!(blob.get_bytes(0, 1).is_err());
        assert!(blob.set_bytes(9, b"x").is_err());
    }

    #[test]
    fn test_blob_free_invalidates_everything() {
        let mut blob = MaterializedBlob::new(vec![1, 2, 3]);
        blob.free();
        assert!(blob.is_freed());
        assert!(matches!(blob.length(), Err(DialectError::LobFreed)));
        assert!(matches!(blob.bytes(), Err(DialectError::LobFreed)));
        assert!(matches!(blob.get_bytes(1, 1), Err(DialectError::LobFreed)));
        assert!(matches!(blob.set_bytes(1, b"x"), Err(DialectError::LobFreed)));
        assert!(matches!(blob.truncate(0), Err(DialectError::LobFreed)));
    }

    #[test]
    fn test_clob_truncate_keeps_prefix() {
        let mut clob = MaterializedClob::nationalized("grüße welt".to_string());
        clob.truncate(5).unwrap();
        assert_eq!(clob.as_str().unwrap(), "grüße");
        assert!(clob.is_nationalized());
    }

    #[test]
    fn test_clob_substring_and_position() {
        let clob = MaterializedClob::new("abcabc".to_string());
        assert_eq!(clob.get_sub_string(2, 3).unwrap(), "bca");
        assert_eq!(clob.position("abc", 1).unwrap(), Some(1));
        assert_eq!(clob.position("abc", 2).unwrap(), Some(4));
        assert_eq!(clob.position("zzz", 1).unwrap(), None);
    }

    #[test]
    fn test_clob_set_string_and_ascii() {
        let mut clob = MaterializedClob::new("abc".to_string());
        clob.set_string(3, "Ωz").unwrap();
        assert_eq!(clob.as_str().unwrap(), "abΩz");
        assert_eq!(clob.ascii_bytes().unwrap(), b"ab?z");
    }

    #[test]
    fn test_clob_free() {
        let mut clob = MaterializedClob::new("x".to_string());
        clob.free();
        assert!(matches!(clob.length(), Err(DialectError::LobFreed)));
        assert!(matches!(clob.position("x", 1), Err(DialectError::LobFreed)));
    }
}
