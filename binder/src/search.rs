//! Measurement driven page search over the units of one chapter.

use crate::measure::MeasurementProbe;
use crate::measure::measure_fits;
use crate::range::Materializer;
use crate::segments::Unit;
use crate::settings::PaginationSettings;

pub const MAX_BINARY_SEARCH_ITERATIONS: usize = 24;
pub const MAX_PAGES_PER_SPINE: usize = 5000;
pub const MAX_FIT_ATTEMPTS: usize = 3;

/// One page worth of units, `start..end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice {
	pub start: usize,
	pub end: usize,
	pub html_fragment: String,
}

/// Largest `end` in `start + 1..=units.len()` whose fragment fits the probe.
///
/// The search is capped at [`MAX_BINARY_SEARCH_ITERATIONS`] and returns the
/// best candidate seen. Never returns less than `start + 1`.
pub fn find_fitting_end<P: MeasurementProbe + ?Sized>(
	probe: &mut P,
	materializer: &Materializer<'_>,
	units: &[Unit],
	start: usize,
	settings: &PaginationSettings,
) -> usize {
	let total = units.len();
	let mut low = start + 1;
	let mut high = total;
	let mut best = start + 1;
	let mut iterations = 0;

	while low <= high && iterations < MAX_BINARY_SEARCH_ITERATIONS {
		let mid = low + (high - low) / 2;
		let fragment = materializer.fragment(units, start, mid);
		if measure_fits(probe, &fragment, settings) {
			best = mid;
			low = mid + 1;
		} else {
			high = mid - 1;
		}
		iterations += 1;
	}
	if low <= high {
		log::debug!("Search budget exhausted at {start}, best end {best} of {total}");
	}

	if best > start + 1 {
		let single = materializer.fragment(units, start, start + 1);
		let fits_single = (0..MAX_FIT_ATTEMPTS).any(|_| measure_fits(probe, &single, settings));
		if !fits_single {
			log::warn!("Unit {start} does not fit a page on its own");
			return start + 1;
		}
	}
	best
}

/// Cuts the units of one chapter into pages.
///
/// Every page holds at least one unit, so the loop advances on each
/// iteration. Stops after [`MAX_PAGES_PER_SPINE`] pages.
pub fn paginate_units<P: MeasurementProbe + ?Sized>(
	probe: &mut P,
	materializer: &Materializer<'_>,
	units: &[Unit],
	settings: &PaginationSettings,
) -> Vec<PageSlice> {
	paginate_units_capped(probe, materializer, units, settings, MAX_PAGES_PER_SPINE)
}

/// [`paginate_units`] with a custom page cap.
pub fn paginate_units_capped<P: MeasurementProbe + ?Sized>(
	probe: &mut P,
	materializer: &Materializer<'_>,
	units: &[Unit],
	settings: &PaginationSettings,
	max_pages: usize,
) -> Vec<PageSlice> {
	let total = units.len();
	let mut pages = Vec::new();
	let mut start = 0;
	while start < total {
		if pages.len() >= max_pages {
			log::warn!("Page cap of {max_pages} reached, dropping units {start}..{total}");
			break;
		}
		let end = find_fitting_end(probe, materializer, units, start, settings)
			.clamp(start + 1, total);
		let html_fragment = materializer.fragment(units, start, end);
		pages.push(PageSlice {
			start,
			end,
			html_fragment,
		});
		start = end;
	}
	pages
}

#[cfg(test)]
mod tests {
	use crate::html_parser::NodeTreeBuilder;
	use crate::measure::CharBudgetMeasurer;
	use crate::measure::MeasurementProbe;
	use crate::measure::Measurer;
	use crate::measure::Overflow;
	use crate::range::Materializer;
	use crate::search::MAX_FIT_ATTEMPTS;
	use crate::search::find_fitting_end;
	use crate::search::paginate_units;
	use crate::search::paginate_units_capped;
	use crate::segments::build_units;
	use crate::settings::PaginationSettings;

	#[test]
	fn test_search_finds_largest_fit() {
		let _ = env_logger::try_init();
		let settings = PaginationSettings {
			text_unit_step: 4,
			..Default::default()
		};
		let tree = NodeTreeBuilder::new().read_str("<p>aaaabbbbccccddddeeee</p>");
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, settings.text_unit_step());
		let m = Materializer::new(tree.tree(), body);
		let mut probe = CharBudgetMeasurer::new(10).create_probe(&settings).unwrap();

		assert_eq!(2, find_fitting_end(&mut probe, &m, &units, 0, &settings));
		assert_eq!(5, find_fitting_end(&mut probe, &m, &units, 3, &settings));

		let pages = paginate_units(&mut probe, &m, &units, &settings);
		let bounds = pages.iter().map(|p| (p.start, p.end)).collect::<Vec<_>>();
		assert_eq!(vec![(0, 2), (2, 4), (4, 5)], bounds);
		assert_eq!("aaaabbbb", pages[0].html_fragment);
	}

	#[test]
	fn test_search_progress_with_oversized_units() {
		let _ = env_logger::try_init();
		let settings = PaginationSettings::default();
		let tree = NodeTreeBuilder::new()
			.read_str(r#"<img src="a.png"><img src="b.png"><p>tail</p><img src="c.png">"#);
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, 24);
		let m = Materializer::new(tree.tree(), body);
		// Every image alone is over budget.
		let mut probe = CharBudgetMeasurer::new(10)
			.with_element_weight(50)
			.create_probe(&settings)
			.unwrap();

		let pages = paginate_units(&mut probe, &m, &units, &settings);
		assert_eq!(4, pages.len());
		let mut expected = 0;
		for page in &pages {
			assert_eq!(expected, page.start, "Units lost or duplicated");
			assert!(page.end > page.start);
			expected = page.end;
		}
		assert_eq!(units.len(), expected);
	}

	#[test]
	fn test_paginate_units_page_cap() {
		let _ = env_logger::try_init();
		let settings = PaginationSettings {
			text_unit_step: 4,
			..Default::default()
		};
		let tree = NodeTreeBuilder::new().read_str("<p>aaaabbbbccccddddeeee</p>");
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, settings.text_unit_step());
		let m = Materializer::new(tree.tree(), body);
		let mut probe = CharBudgetMeasurer::new(4).create_probe(&settings).unwrap();

		let pages = paginate_units_capped(&mut probe, &m, &units, &settings, 2);
		let bounds = pages.iter().map(|p| (p.start, p.end)).collect::<Vec<_>>();
		assert_eq!(vec![(0, 1), (1, 2)], bounds);

		let pages = paginate_units_capped(&mut probe, &m, &units, &settings, 0);
		assert!(pages.is_empty());
		assert_eq!(5, paginate_units(&mut probe, &m, &units, &settings).len());
	}

	/// Fits every fragment with at least two images but never a single one.
	struct NonMonotonicProbe {
		renders: usize,
		images: usize,
	}

	impl MeasurementProbe for NonMonotonicProbe {
		fn render(&mut self, html_fragment: &str) {
			self.renders += 1;
			self.images = html_fragment.matches("<img").count();
		}

		fn overflow(&self) -> Overflow {
			let fits = self.images >= 2;
			Overflow {
				scroll_height: if fits { 10.0 } else { 20.0 },
				client_height: 10.0,
				..Default::default()
			}
		}
	}

	#[test]
	fn test_search_rechecks_single_unit() {
		let _ = env_logger::try_init();
		let settings = PaginationSettings::default();
		let tree = NodeTreeBuilder::new()
			.read_str(r#"<img src="a"><img src="b"><img src="c"><img src="d">"#);
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, 24);
		let m = Materializer::new(tree.tree(), body);
		let mut probe = NonMonotonicProbe {
			renders: 0,
			images: 0,
		};

		assert_eq!(1, find_fitting_end(&mut probe, &m, &units, 0, &settings));
		// Three search steps plus the single unit attempts.
		assert_eq!(3 + MAX_FIT_ATTEMPTS, probe.renders);
	}
}
