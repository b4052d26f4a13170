//! Fit measurement seam.
//!
//! A [`Measurer`] hands out one [`MeasurementProbe`] per pagination run. The
//! probe renders candidate fragments into a viewport-sized page box and
//! reports its scroll metrics, the fit rule itself lives in [`measure_fits`].

use crate::html_parser::EdgeRef;
use crate::html_parser::NodeTreeBuilder;
use crate::segments::is_atomic;
use crate::settings::PaginationSettings;

/// Sub-pixel layout rounding absorbed by the fit rule.
pub const FIT_TOLERANCE_PX: f32 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
	#[error("No layout context for a {width}x{height} viewport")]
	NoLayoutContext { width: f32, height: f32 },
}

/// Scroll metrics of the probe page box, as `scrollWidth`/`clientWidth` etc.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Overflow {
	pub scroll_width: f32,
	pub client_width: f32,
	pub scroll_height: f32,
	pub client_height: f32,
}

impl Overflow {
	pub fn overflow_x(&self) -> f32 {
		self.scroll_width - self.client_width
	}

	pub fn overflow_y(&self) -> f32 {
		self.scroll_height - self.client_height
	}
}

pub trait MeasurementProbe {
	/// Replaces the probe content with `html_fragment`.
	fn render(&mut self, html_fragment: &str);

	fn overflow(&self) -> Overflow;
}

pub trait Measurer {
	type Probe: MeasurementProbe;

	fn create_probe(&self, settings: &PaginationSettings) -> Result<Self::Probe, ProbeError>;
}

/// Renders `html_fragment` into the probe and checks it for overflow.
///
/// Both axes are checked in every writing mode: vertical-rl text overflows
/// horizontally once its columns accumulate.
pub fn measure_fits<P: MeasurementProbe + ?Sized>(
	probe: &mut P,
	html_fragment: &str,
	settings: &PaginationSettings,
) -> bool {
	probe.render(html_fragment);
	let overflow = probe.overflow();
	let fits =
		overflow.overflow_y() <= FIT_TOLERANCE_PX && overflow.overflow_x() <= FIT_TOLERANCE_PX;
	log::trace!(
		"measure_fits({}, {} chars): {fits} {overflow:?}",
		settings.writing_mode,
		html_fragment.len()
	);
	fits
}

pub(crate) fn ensure_layout_context(settings: &PaginationSettings) -> Result<(), ProbeError> {
	let (width, height) = (settings.viewport_width, settings.viewport_height);
	if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
		Ok(())
	} else {
		Err(ProbeError::NoLayoutContext { width, height })
	}
}

/// Deterministic measurer with a fixed character budget per page.
///
/// Every visible character counts one, every atomic element counts
/// `element_weight`. Excess is reported as block-axis overflow.
#[derive(Debug, Clone, Copy)]
pub struct CharBudgetMeasurer {
	pub chars_per_page: usize,
	pub element_weight: usize,
}

impl CharBudgetMeasurer {
	pub fn new(chars_per_page: usize) -> Self {
		Self {
			chars_per_page,
			element_weight: chars_per_page,
		}
	}

	pub fn with_element_weight(self, element_weight: usize) -> Self {
		Self {
			element_weight,
			..self
		}
	}
}

impl Measurer for CharBudgetMeasurer {
	type Probe = CharBudgetProbe;

	fn create_probe(&self, settings: &PaginationSettings) -> Result<Self::Probe, ProbeError> {
		ensure_layout_context(settings)?;
		Ok(CharBudgetProbe {
			budget: *self,
			builder: Some(NodeTreeBuilder::new()),
			used: 0,
		})
	}
}

/// Height one budget character takes in the probe box, well above the fit
/// tolerance.
const CHAR_BUDGET_UNIT_PX: f32 = 16.0;

pub struct CharBudgetProbe {
	budget: CharBudgetMeasurer,
	builder: Option<NodeTreeBuilder>,
	used: usize,
}

impl MeasurementProbe for CharBudgetProbe {
	fn render(&mut self, html_fragment: &str) {
		let tree = self
			.builder
			.take()
			.unwrap_or_default()
			.read_str(html_fragment);
		let mut used = 0;
		if let Some(mut iter) = tree.body_iter() {
			while let Some(edge) = iter.next() {
				match edge {
					EdgeRef::OpenElement(el) if is_atomic(el.local_name()) => {
						used += self.budget.element_weight;
						iter.skip_children();
					}
					EdgeRef::Text(t) if !t.text().trim().is_empty() => {
						used += t.text().chars().count();
					}
					_ => {}
				}
			}
		}
		self.used = used;
		self.builder = Some(tree.into_builder());
	}

	fn overflow(&self) -> Overflow {
		let used = self.used.max(self.budget.chars_per_page) as f32;
		Overflow {
			scroll_width: 0.0,
			client_width: 0.0,
			scroll_height: used * CHAR_BUDGET_UNIT_PX,
			client_height: self.budget.chars_per_page as f32 * CHAR_BUDGET_UNIT_PX,
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::measure::CharBudgetMeasurer;
	use crate::measure::MeasurementProbe;
	use crate::measure::Measurer;
	use crate::measure::Overflow;
	use crate::measure::ProbeError;
	use crate::measure::measure_fits;
	use crate::settings::PaginationSettings;

	struct FixedProbe(Overflow, String);

	impl MeasurementProbe for FixedProbe {
		fn render(&mut self, html_fragment: &str) {
			self.1 = html_fragment.to_string();
		}

		fn overflow(&self) -> Overflow {
			self.0
		}
	}

	#[test]
	fn test_measure_fits_tolerance() {
		let settings = PaginationSettings::default();
		let within = Overflow {
			scroll_width: 101.0,
			client_width: 100.0,
			scroll_height: 200.5,
			client_height: 200.0,
		};
		let mut probe = FixedProbe(within, String::new());
		assert!(measure_fits(&mut probe, "<p>x</p>", &settings));
		assert_eq!("<p>x</p>", probe.1, "Probe content not replaced");

		probe.0.scroll_height = 201.5;
		assert!(!measure_fits(&mut probe, "<p>x</p>", &settings));

		probe.0.scroll_height = 200.0;
		probe.0.scroll_width = 102.0;
		assert!(!measure_fits(&mut probe, "<p>x</p>", &settings));
	}

	#[test]
	fn test_char_budget_probe() {
		let _ = env_logger::try_init();
		let settings = PaginationSettings::default();
		let measurer = CharBudgetMeasurer::new(10).with_element_weight(4);
		let mut probe = measurer.create_probe(&settings).unwrap();

		assert!(measure_fits(&mut probe, "<p>0123456789</p>", &settings));
		assert!(!measure_fits(&mut probe, "<p>0123456789X</p>", &settings));
		assert!(measure_fits(&mut probe, r#"<p>012345</p><img src="a">"#, &settings));
		assert!(!measure_fits(&mut probe, r#"<p>0123456</p><img src="a">"#, &settings));
	}

	#[test]
	fn test_probe_requires_viewport() {
		let settings = PaginationSettings::for_viewport(0.0, 600.0);
		let res = CharBudgetMeasurer::new(10).create_probe(&settings);
		assert!(matches!(res, Err(ProbeError::NoLayoutContext { .. })));
	}
}
