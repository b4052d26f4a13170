pub mod anchors;
pub mod css;
mod error;
pub mod html_parser;
pub mod layout_probe;
pub mod locator;
pub mod measure;
pub mod range;
pub mod resources;
pub mod search;
pub mod segments;
pub mod settings;

use std::collections::BTreeSet;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

pub use crate::error::PaginatorError;
pub use crate::layout_probe::LayoutMeasurer;
pub use crate::locator::Locator;
pub use crate::locator::LocatorParseError;
pub use crate::locator::Page;
pub use crate::locator::PaginationResult;
pub use crate::locator::UnitOffset;
pub use crate::measure::CharBudgetMeasurer;
pub use crate::measure::Measurer;
pub use crate::measure::ProbeError;
pub use crate::resources::MapLoader;
pub use crate::resources::NoResources;
pub use crate::resources::ResourceError;
pub use crate::resources::ResourceLoader;
pub use crate::settings::PaginationSettings;
pub use crate::settings::SettingsPatch;
pub use crate::settings::WritingMode;

use crate::html_parser::NodeTree;
use crate::html_parser::NodeTreeBuilder;
use crate::range::Materializer;
use crate::resources::resolve_resources;
use crate::search::paginate_units;
use crate::segments::Unit;
use crate::segments::build_units;

/// One flowed document of the book, in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpineItem {
	pub id: String,
	pub href: String,
	pub html_string: String,
}

/// Slices spine items into viewport sized pages.
pub struct EpubPaginator<M = LayoutMeasurer, L = NoResources> {
	spine_items: Vec<SpineItem>,
	loader: L,
	measurer: M,
	settings: PaginationSettings,
	builder: Option<NodeTreeBuilder>,
	resolved: BTreeSet<String>,
}

impl<M: Measurer, L: ResourceLoader> EpubPaginator<M, L> {
	pub fn new(
		spine_items: Vec<SpineItem>,
		loader: L,
		measurer: M,
		settings: PaginationSettings,
	) -> Self {
		Self {
			spine_items,
			loader,
			measurer,
			settings,
			builder: None,
			resolved: BTreeSet::new(),
		}
	}

	pub fn settings(&self) -> &PaginationSettings {
		&self.settings
	}

	pub fn spine_items(&self) -> &[SpineItem] {
		&self.spine_items
	}

	/// Rebuilds all pages from scratch.
	///
	/// Only a missing layout context is fatal, chapters without units
	/// contribute no pages and resource failures keep the original reference.
	pub async fn paginate(&mut self) -> Result<PaginationResult, PaginatorError> {
		let now = Instant::now();
		let mut probe = self.measurer.create_probe(&self.settings)?;
		let previous = std::mem::take(&mut self.resolved);
		let step = self.settings.text_unit_step();
		let mut pages = Vec::new();

		for (spine_index, item) in self.spine_items.iter().enumerate() {
			let mut tree = self
				.builder
				.take()
				.unwrap_or_default()
				.read_str(&item.html_string);
			if let Some(body) = tree.body() {
				resolve_resources(tree.tree_mut(), body, &self.loader, item, &mut self.resolved)
					.await;
				let units = build_units(tree.tree(), body, step);
				if units.is_empty() {
					log::debug!("Spine item {spine_index} ({}) has no units", item.href);
				} else {
					let materializer = Materializer::new(tree.tree(), body);
					let slices = paginate_units(&mut probe, &materializer, &units, &self.settings);
					log::debug!(
						"Spine item {spine_index}: {} units in {} pages",
						units.len(),
						slices.len()
					);
					pages.extend(slices.into_iter().map(|slice| Page {
						spine_index,
						within_spine_offset: UnitOffset(slice.start),
						estimated_char_count: slice.html_fragment.chars().count(),
						html_fragment: slice.html_fragment,
						end_offset: UnitOffset(slice.end),
					}));
				}
			} else {
				log::warn!("Spine item {spine_index} ({}) has no body", item.href);
			}
			self.builder = Some(tree.into_builder());
		}

		for url in previous.difference(&self.resolved) {
			self.loader.revoke(url);
		}
		log::info!(
			"Paginated {} spine items into {} pages in {:?}",
			self.spine_items.len(),
			pages.len(),
			now.elapsed()
		);
		Ok(PaginationResult::new(pages))
	}

	/// Applies `patch` over the current settings and paginates again.
	pub async fn repaginate(&mut self, patch: SettingsPatch) -> Result<PaginationResult, PaginatorError> {
		self.settings.merge(patch);
		log::info!("Repaginate with {:?}", self.settings);
		self.paginate().await
	}

	/// Releases parser state and every URL handed out by the loader.
	pub fn destroy(&mut self) {
		for url in std::mem::take(&mut self.resolved) {
			self.loader.revoke(&url);
		}
		self.builder = None;
	}

	fn with_units<T>(&mut self, spine_index: usize, f: impl FnOnce(&NodeTree, &[Unit]) -> T) -> Option<T> {
		let item = self.spine_items.get(spine_index)?;
		let tree = self
			.builder
			.take()
			.unwrap_or_default()
			.read_str(&item.html_string);
		let res = tree.body().map(|body| {
			let units = build_units(tree.tree(), body, self.settings.text_unit_step());
			f(&tree, &units)
		});
		self.builder = Some(tree.into_builder());
		res
	}

	/// Locator for a link target such as `text/c2.xhtml#note-3`.
	///
	/// Unknown chapters resolve to `fallback`, unknown fragments to the start
	/// of the chapter.
	pub fn locator_for_href(&mut self, href: &str, fallback: usize) -> Locator {
		let (path, fragment) = match href.split_once('#') {
			Some((path, fragment)) => (path, Some(fragment)),
			None => (href, None),
		};
		let spine_index = if path.is_empty() {
			fallback
		} else {
			anchors::spine_index_for_href(&self.spine_items, path, fallback)
		};
		let offset = fragment
			.filter(|f| !f.is_empty())
			.and_then(|fragment| {
				self.with_units(spine_index, |tree, units| {
					tree.body().map_or(0, |body| {
						anchors::unit_for_fragment(tree.tree(), body, units, fragment)
					})
				})
			})
			.unwrap_or(0);
		Locator::new(spine_index, offset)
	}

	/// Locator for character `char_offset` of a chapter's visible text, e.g.
	/// a search hit.
	pub fn locator_for_text_offset(&mut self, spine_index: usize, char_offset: usize) -> Option<Locator> {
		self.with_units(spine_index, |tree, units| {
			anchors::unit_for_text_offset(tree.tree(), units, char_offset)
		})
		.map(|offset| Locator::new(spine_index, offset))
	}
}
