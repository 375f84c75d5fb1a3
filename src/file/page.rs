//! Pagination and sort types for file listings.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::{Result, StowageError};

/// Column a file listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Upload time.
    #[default]
    UploadedAt,
    /// Display name (case-insensitive).
    Name,
    /// Size in bytes.
    Size,
}

impl SortKey {
    fn column(&self) -> &'static str {
        match self {
            SortKey::UploadedAt => "f.uploaded_at",
            SortKey::Name => "f.display_name COLLATE NOCASE",
            SortKey::Size => "f.size_bytes",
        }
    }

    /// Query parameter name of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::UploadedAt => "uploadedAt",
            SortKey::Name => "name",
            SortKey::Size => "size",
        }
    }
}

impl FromStr for SortKey {
    type Err = StowageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "uploadedAt" | "uploaded_at" => Ok(SortKey::UploadedAt),
            "name" | "fileName" => Ok(SortKey::Name),
            "size" | "fileSize" => Ok(SortKey::Size),
            other => Err(StowageError::InvalidInput(format!(
                "unknown sort key: {other}"
            ))),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortDirection {
    fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = StowageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(StowageError::InvalidInput(format!(
                "unknown sort direction: {other}"
            ))),
        }
    }
}

/// Sort order of a file listing. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl FileSort {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// ORDER BY clause for queries aliasing `file_metadata` as `f`.
    ///
    /// Ties are broken by id in the same direction so that pages never
    /// overlap.
    pub(crate) fn order_by(&self) -> String {
        let dir = self.direction.sql();
        format!("{} {dir}, f.id {dir}", self.key.column())
    }
}

/// Parses `key` or `key,direction` (e.g. `name,asc`). A missing direction
/// means descending.
impl FromStr for FileSort {
    type Err = StowageError;

    fn from_str(s: &str) -> Result<Self> {
        let (key, direction) = match s.split_once(',') {
            Some((key, dir)) => (key.parse()?, dir.parse()?),
            None => (s.parse()?, SortDirection::Desc),
        };
        Ok(Self { key, direction })
    }
}

impl fmt::Display for FileSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{},{dir}", self.key.as_str())
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Create a page request, rejecting a page size outside `1..=max_page_size`.
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Result<Self> {
        if page_size == 0 || page_size > max_page_size {
            return Err(StowageError::InvalidInput(format!(
                "page size must be between 1 and {max_page_size}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub(crate) fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub(crate) fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.page_size)
    }
}

/// One page of a larger result set.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let page_size = u64::from(request.page_size);
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size),
        }
    }

    /// Convert every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
