use std::fmt::Display;
use std::ops::Range;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

const UNIT_PREFIX: &str = "u:";
const LEGACY_PREFIX: &str = "s:";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocatorParseError {
	#[error("Missing unit offset prefix in {0:?}")]
	MissingPrefix(String),
	#[error("Invalid unit offset in {0:?}")]
	InvalidOffset(String),
}

/// Chapter local unit offset, written as `u:<n>`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitOffset(pub usize);

impl UnitOffset {
	pub fn value(self) -> usize {
		self.0
	}
}

impl Display for UnitOffset {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{UNIT_PREFIX}{}", self.0)
	}
}

/// Accepts `u:<n>` and the legacy `s:<n>`.
///
/// Legacy offsets map to the same unit only for text without astral plane
/// characters and without `script`/`style` content, those were counted
/// differently before.
impl FromStr for UnitOffset {
	type Err = LocatorParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		let digits = trimmed
			.strip_prefix(UNIT_PREFIX)
			.or_else(|| trimmed.strip_prefix(LEGACY_PREFIX))
			.ok_or_else(|| LocatorParseError::MissingPrefix(s.to_string()))?;
		digits
			.parse::<usize>()
			.map(UnitOffset)
			.map_err(|_| LocatorParseError::InvalidOffset(s.to_string()))
	}
}

impl From<usize> for UnitOffset {
	fn from(value: usize) -> Self {
		UnitOffset(value)
	}
}

impl Serialize for UnitOffset {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for UnitOffset {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Stable position in the book, independent of the current page layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Locator {
	pub spine_index: usize,
	pub within_spine_offset: UnitOffset,
}

impl Locator {
	pub fn new(spine_index: usize, offset: usize) -> Self {
		Self {
			spine_index,
			within_spine_offset: UnitOffset(offset),
		}
	}
}

impl Display for Locator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.spine_index, self.within_spine_offset)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
	pub spine_index: usize,
	pub within_spine_offset: UnitOffset,
	pub html_fragment: String,
	pub estimated_char_count: usize,
	/// Exclusive end of the page's unit range.
	pub end_offset: UnitOffset,
}

impl Page {
	pub fn locator(&self) -> Locator {
		Locator {
			spine_index: self.spine_index,
			within_spine_offset: self.within_spine_offset,
		}
	}

	pub fn unit_range(&self) -> Range<usize> {
		self.within_spine_offset.value()..self.end_offset.value()
	}
}

/// Pages of one pagination run in reading order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationResult {
	pub pages: Vec<Page>,
}

impl PaginationResult {
	pub fn new(pages: Vec<Page>) -> Self {
		Self { pages }
	}

	pub fn len(&self) -> usize {
		self.pages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pages.is_empty()
	}

	pub fn page(&self, page_index: usize) -> Option<&Page> {
		self.pages.get(page_index)
	}

	/// Index of the last page of `spine_index` starting at or before `offset`.
	pub fn locate_page(&self, spine_index: usize, offset: usize) -> Option<usize> {
		let mut last_match = None;
		for i in self.pages_for_spine(spine_index) {
			if self.pages[i].within_spine_offset.value() <= offset {
				last_match = Some(i);
			} else {
				break;
			}
		}
		last_match
	}

	pub fn locate(&self, locator: &Locator) -> Option<usize> {
		self.locate_page(locator.spine_index, locator.within_spine_offset.value())
	}

	/// [`Self::locate_page`] with an offset string, `None` when it does not parse.
	pub fn locate_str(&self, spine_index: usize, offset: &str) -> Option<usize> {
		let offset = offset
			.parse::<UnitOffset>()
			.inspect_err(|e| log::debug!("Cannot locate page: {e}"))
			.ok()?;
		self.locate_page(spine_index, offset.value())
	}

	pub fn get_locator(&self, page_index: usize) -> Option<Locator> {
		self.pages.get(page_index).map(Page::locator)
	}

	/// Contiguous page indices of one chapter, empty when it has no pages.
	pub fn pages_for_spine(&self, spine_index: usize) -> Range<usize> {
		let start = self
			.pages
			.partition_point(|p| p.spine_index < spine_index);
		let end = self
			.pages
			.partition_point(|p| p.spine_index <= spine_index);
		start..end
	}

	/// Page for `locator`, falling back to the first page of its chapter.
	pub fn locate_or_chapter_start(&self, locator: &Locator) -> Option<usize> {
		self.locate(locator).or_else(|| {
			let pages = self.pages_for_spine(locator.spine_index);
			(!pages.is_empty()).then_some(pages.start)
		})
	}
}
