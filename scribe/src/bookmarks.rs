use std::fs;
use std::io::BufReader;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;

use binder::Locator;
use binder::PaginationResult;
use chrono::DateTime;
use chrono::SubsecRound;
use chrono::Utc;
use chrono::serde::ts_seconds;
use serde::Deserialize;
use serde::Serialize;

use crate::ScribeError;

const PERCENTAGE_BASE: f32 = 100.0;

/// Reading progress after `page_index`, in percent with one decimal.
pub fn progress_percentage(page_index: usize, total_pages: usize) -> Option<f32> {
	if total_pages == 0 {
		return None;
	}
	let raw = (page_index + 1) as f32 / total_pages as f32 * PERCENTAGE_BASE;
	Some((raw * 10.0).round() / 10.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
	pub label: String,
	pub locator: Locator,
	pub percentage: Option<f32>,
	#[serde(with = "ts_seconds")]
	pub created_at: DateTime<Utc>,
}

impl Bookmark {
	pub fn at_page(result: &PaginationResult, page_index: usize, label: impl Into<String>) -> Option<Self> {
		let locator = result.get_locator(page_index)?;
		Some(Self {
			label: label.into(),
			locator,
			percentage: progress_percentage(page_index, result.len()),
			created_at: Utc::now().trunc_subsecs(0),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPosition {
	pub locator: Locator,
	pub percentage: Option<f32>,
	#[serde(with = "ts_seconds")]
	pub updated_at: DateTime<Utc>,
}

impl ReadingPosition {
	pub fn at_page(result: &PaginationResult, page_index: usize) -> Option<Self> {
		let locator = result.get_locator(page_index)?;
		Some(Self {
			locator,
			percentage: progress_percentage(page_index, result.len()),
			updated_at: Utc::now().trunc_subsecs(0),
		})
	}

	/// Page to resume at in a possibly different pagination.
	pub fn resume_page(&self, result: &PaginationResult) -> Option<usize> {
		result.locate_or_chapter_start(&self.locator)
	}
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingState {
	pub position: Option<ReadingPosition>,
	#[serde(default)]
	pub bookmarks: Vec<Bookmark>,
}

/// Reading state of one book kept in a JSON file.
#[derive(Debug)]
pub struct BookmarkStore {
	path: PathBuf,
	state: ReadingState,
}

impl BookmarkStore {
	/// Loads `path`, starting empty when the file does not exist yet.
	pub fn open(path: impl AsRef<Path>) -> Result<Self, ScribeError> {
		let path = path.as_ref().to_path_buf();
		let state = if path.try_exists()? {
			let reader = BufReader::new(fs::File::open(&path)?);
			serde_json::from_reader(reader)?
		} else {
			log::debug!("No reading state at {}", path.display());
			ReadingState::default()
		};
		Ok(Self { path, state })
	}

	pub fn save(&self) -> Result<(), ScribeError> {
		if let Some(dir) = self.path.parent() {
			fs::create_dir_all(dir)?;
		}
		let writer = BufWriter::new(fs::File::create(&self.path)?);
		serde_json::to_writer_pretty(writer, &self.state)?;
		log::trace!("Saved reading state to {}", self.path.display());
		Ok(())
	}

	pub fn state(&self) -> &ReadingState {
		&self.state
	}

	pub fn position(&self) -> Option<&ReadingPosition> {
		self.state.position.as_ref()
	}

	pub fn set_position(&mut self, position: ReadingPosition) {
		self.state.position = Some(position);
	}

	pub fn bookmarks(&self) -> &[Bookmark] {
		&self.state.bookmarks
	}

	/// Inserts `bookmark` keeping reading order, replacing one at the same
	/// locator.
	pub fn add_bookmark(&mut self, bookmark: Bookmark) {
		let bookmarks = &mut self.state.bookmarks;
		match bookmarks.binary_search_by(|b| b.locator.cmp(&bookmark.locator)) {
			Ok(i) => bookmarks[i] = bookmark,
			Err(i) => bookmarks.insert(i, bookmark),
		}
	}

	pub fn remove_bookmark(&mut self, locator: &Locator) -> Option<Bookmark> {
		let i = self
			.state
			.bookmarks
			.iter()
			.position(|b| b.locator == *locator)?;
		Some(self.state.bookmarks.remove(i))
	}
}

#[cfg(test)]
mod tests {
	use binder::Locator;
	use binder::Page;
	use binder::PaginationResult;
	use binder::UnitOffset;

	use crate::bookmarks::Bookmark;
	use crate::bookmarks::BookmarkStore;
	use crate::bookmarks::ReadingPosition;
	use crate::bookmarks::progress_percentage;

	fn result() -> PaginationResult {
		let page = |spine_index, start, end| Page {
			spine_index,
			within_spine_offset: UnitOffset(start),
			html_fragment: String::new(),
			estimated_char_count: 0,
			end_offset: UnitOffset(end),
		};
		PaginationResult::new(vec![page(0, 0, 4), page(0, 4, 9), page(1, 0, 3)])
	}

	#[test]
	fn test_progress_percentage() {
		assert_eq!(Some(100.0), progress_percentage(0, 1));
		assert_eq!(Some(33.3), progress_percentage(0, 3));
		assert_eq!(Some(66.7), progress_percentage(1, 3));
		assert_eq!(None, progress_percentage(0, 0));
	}

	#[test]
	fn test_bookmark_store_round_trip() {
		let _ = env_logger::try_init();
		let path = std::env::temp_dir()
			.join(format!("scribe-bookmarks-{}", std::process::id()))
			.join("state.json");
		let result = result();

		let mut store = BookmarkStore::open(&path).unwrap();
		assert!(store.bookmarks().is_empty());
		store.add_bookmark(Bookmark::at_page(&result, 2, "later").unwrap());
		store.add_bookmark(Bookmark::at_page(&result, 0, "start").unwrap());
		store.add_bookmark(Bookmark::at_page(&result, 2, "replaced").unwrap());
		store.set_position(ReadingPosition::at_page(&result, 1).unwrap());
		store.save().unwrap();

		let loaded = BookmarkStore::open(&path).unwrap();
		assert_eq!(store.state(), loaded.state());
		let labels = loaded
			.bookmarks()
			.iter()
			.map(|b| b.label.as_str())
			.collect::<Vec<_>>();
		assert_eq!(vec!["start", "replaced"], labels);
		assert_eq!(Some(66.7), loaded.position().unwrap().percentage);

		let mut loaded = loaded;
		assert!(loaded.remove_bookmark(&Locator::new(0, 0)).is_some());
		assert!(loaded.remove_bookmark(&Locator::new(0, 0)).is_none());

		let _ = std::fs::remove_dir_all(path.parent().unwrap());
	}

	#[test]
	fn test_resume_after_repagination() {
		let position = ReadingPosition::at_page(&result(), 1).unwrap();
		assert_eq!(Locator::new(0, 4), position.locator);

		// Narrower pages: the old start falls inside page 2.
		let page = |start, end| Page {
			spine_index: 0,
			within_spine_offset: UnitOffset(start),
			html_fragment: String::new(),
			estimated_char_count: 0,
			end_offset: UnitOffset(end),
		};
		let narrow = PaginationResult::new(vec![page(0, 2), page(2, 3), page(3, 6), page(6, 9)]);
		assert_eq!(Some(2), position.resume_page(&narrow));

		let json = serde_json::to_string(&position.locator).unwrap();
		assert_eq!(r#"{"spine_index":0,"within_spine_offset":"u:4"}"#, json);
	}
}
