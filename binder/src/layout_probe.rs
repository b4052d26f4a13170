//! Block layout probe backed by taffy.
//!
//! The fragment is parsed with html5ever, flowed into a taffy block tree in
//! logical coordinates (inline axis first, block axis second) and laid out
//! against the content box of the page. Vertical writing swaps the axes back
//! when the scroll metrics are reported.

use std::collections::HashMap;

use base64::Engine;
use fixed::types::I26F6;
use taffy::prelude::*;

use crate::html_parser::Element;
use crate::html_parser::Leaf;
use crate::html_parser::NodeId as DomId;
use crate::html_parser::NodeTreeBuilder;
use crate::html_parser::Tree;
use crate::measure::MeasurementProbe;
use crate::measure::Measurer;
use crate::measure::Overflow;
use crate::measure::ProbeError;
use crate::measure::ensure_layout_context;
use crate::segments::is_atomic;
use crate::settings::PaginationSettings;

/// Glyph advances used to wrap text.
pub trait TextMetrics {
	fn advance(&self, ch: char, font_size_px: f32) -> f32;
}

/// Fixed advances in em: narrow glyphs, wide (CJK) glyphs and spaces.
#[derive(Debug, Clone, Copy)]
pub struct ProportionalMetrics {
	pub narrow_em: f32,
	pub wide_em: f32,
	pub space_em: f32,
}

impl Default for ProportionalMetrics {
	fn default() -> Self {
		Self {
			narrow_em: 0.5,
			wide_em: 1.0,
			space_em: 0.3,
		}
	}
}

impl TextMetrics for ProportionalMetrics {
	fn advance(&self, ch: char, font_size_px: f32) -> f32 {
		let em = if ch.is_whitespace() {
			self.space_em
		} else if is_wide(ch) {
			self.wide_em
		} else {
			self.narrow_em
		};
		em * font_size_px
	}
}

fn is_wide(ch: char) -> bool {
	matches!(ch as u32,
		0x1100..=0x115F
		| 0x2E80..=0x303E
		| 0x3041..=0x33FF
		| 0x3400..=0x4DBF
		| 0x4E00..=0x9FFF
		| 0xA000..=0xA4CF
		| 0xAC00..=0xD7A3
		| 0xF900..=0xFAFF
		| 0xFE30..=0xFE4F
		| 0xFF00..=0xFF60
		| 0xFFE0..=0xFFE6
		| 0x20000..=0x2FFFD
		| 0x30000..=0x3FFFD)
}

#[derive(Debug, Clone, Default)]
pub struct LayoutMeasurer<M = ProportionalMetrics> {
	metrics: M,
}

impl LayoutMeasurer {
	pub fn new() -> Self {
		Self::default()
	}
}

impl<M: TextMetrics + Clone> LayoutMeasurer<M> {
	pub fn with_metrics(metrics: M) -> Self {
		Self { metrics }
	}
}

impl<M: TextMetrics + Clone> Measurer for LayoutMeasurer<M> {
	type Probe = LayoutProbe<M>;

	fn create_probe(&self, settings: &PaginationSettings) -> Result<Self::Probe, ProbeError> {
		ensure_layout_context(settings)?;
		let geometry = PageGeometry::new(settings);
		log::debug!("Create layout probe {geometry:?}");
		Ok(LayoutProbe {
			metrics: self.metrics.clone(),
			geometry,
			builder: Some(NodeTreeBuilder::new()),
			overflow: Overflow::default(),
		})
	}
}

#[derive(Debug, Clone, Copy)]
struct PageGeometry {
	font_size_px: f32,
	line_height: f32,
	vertical: bool,
	/// Physical content box.
	width: f32,
	height: f32,
}

impl PageGeometry {
	fn new(settings: &PaginationSettings) -> Self {
		let (width, height) = settings.content_size();
		Self {
			font_size_px: settings.font_size_px(),
			line_height: settings.line_height,
			vertical: settings.writing_mode.is_vertical(),
			width,
			height,
		}
	}

	fn inline_size(&self) -> f32 {
		if self.vertical { self.height } else { self.width }
	}

	fn block_size(&self) -> f32 {
		if self.vertical { self.width } else { self.height }
	}

	/// Maps a physical (width, height) pair to (inline, block).
	fn logical(&self, width: f32, height: f32) -> (f32, f32) {
		if self.vertical {
			(height, width)
		} else {
			(width, height)
		}
	}
}

pub struct LayoutProbe<M> {
	metrics: M,
	geometry: PageGeometry,
	builder: Option<NodeTreeBuilder>,
	overflow: Overflow,
}

impl<M: TextMetrics> MeasurementProbe for LayoutProbe<M> {
	fn render(&mut self, html_fragment: &str) {
		let tree = self
			.builder
			.take()
			.unwrap_or_default()
			.read_str(html_fragment);
		self.overflow = match tree.body() {
			Some(body) => match self.layout(tree.tree(), body) {
				Ok(overflow) => overflow,
				Err(e) => {
					log::error!("Layout failed: {e}");
					self.report(f32::INFINITY, f32::INFINITY)
				}
			},
			None => self.report(0.0, 0.0),
		};
		self.builder = Some(tree.into_builder());
	}

	fn overflow(&self) -> Overflow {
		self.overflow
	}
}

impl<M: TextMetrics> LayoutProbe<M> {
	fn layout(&self, tree: &Tree<Leaf>, body: DomId) -> Result<Overflow, taffy::TaffyError> {
		let geometry = self.geometry;
		let mut taffy: TaffyTree<ProbeLeaf> = TaffyTree::new();
		let mut flow = Flow::new(&geometry, 1.0, false, true);
		flow.children(tree, body, &mut taffy)?;
		let children = flow.finish(&mut taffy)?;
		let root = taffy.new_with_children(
			Style {
				display: Display::Block,
				size: Size {
					width: length(geometry.inline_size()),
					height: auto(),
				},
				..Default::default()
			},
			&children,
		)?;

		let mut line_widths = HashMap::new();
		taffy.compute_layout_with_measure(
			root,
			Size {
				width: AvailableSpace::Definite(geometry.inline_size()),
				height: AvailableSpace::MaxContent,
			},
			|known_dimensions, available_space, node_id, node_context, _style| match node_context {
				Some(ProbeLeaf::Inline(run)) => {
					let max_width = known_dimensions.width.or(match available_space.width {
						AvailableSpace::Definite(w) => Some(w),
						AvailableSpace::MinContent => Some(0.0),
						AvailableSpace::MaxContent => None,
					});
					let (width, lines) = run.wrap(&self.metrics, max_width);
					line_widths.insert(node_id, width);
					Size {
						width: known_dimensions.width.unwrap_or(width),
						height: known_dimensions
							.height
							.unwrap_or(lines as f32 * run.line_height_px),
					}
				}
				Some(ProbeLeaf::Replaced) | None => Size::ZERO,
			},
		)?;

		let mut extent = (0.0_f32, 0.0_f32);
		collect_extent(&taffy, root, (0.0, 0.0), &line_widths, &mut extent)?;
		let root_layout = taffy.layout(root)?;
		let inline_extent = extent.0.max(root_layout.size.width);
		let block_extent = extent.1.max(root_layout.size.height);
		Ok(self.report(inline_extent, block_extent))
	}

	fn report(&self, inline_extent: f32, block_extent: f32) -> Overflow {
		let g = &self.geometry;
		let (inline_size, block_size) = (g.inline_size(), g.block_size());
		let scroll_inline = inline_extent.max(inline_size);
		let scroll_block = block_extent.max(block_size);
		if g.vertical {
			Overflow {
				scroll_width: scroll_block,
				client_width: block_size,
				scroll_height: scroll_inline,
				client_height: inline_size,
			}
		} else {
			Overflow {
				scroll_width: scroll_inline,
				client_width: inline_size,
				scroll_height: scroll_block,
				client_height: block_size,
			}
		}
	}
}

fn collect_extent(
	taffy: &TaffyTree<ProbeLeaf>,
	id: NodeId,
	origin: (f32, f32),
	line_widths: &HashMap<NodeId, f32>,
	extent: &mut (f32, f32),
) -> Result<(), taffy::TaffyError> {
	let layout = taffy.layout(id)?;
	let x = origin.0 + layout.location.x;
	let y = origin.1 + layout.location.y;
	let width = line_widths
		.get(&id)
		.copied()
		.unwrap_or(0.0)
		.max(layout.size.width);
	extent.0 = extent.0.max(x + width);
	extent.1 = extent.1.max(y + layout.size.height);
	for child in taffy.children(id)? {
		collect_extent(taffy, child, (x, y), line_widths, extent)?;
	}
	Ok(())
}

#[derive(Debug)]
enum ProbeLeaf {
	Inline(InlineRun),
	Replaced,
}

#[derive(Debug)]
struct InlineRun {
	text: String,
	font_size_px: f32,
	line_height_px: f32,
	preformatted: bool,
}

impl InlineRun {
	/// Returns the widest line and the line count.
	fn wrap<M: TextMetrics>(&self, metrics: &M, max_width: Option<f32>) -> (f32, usize) {
		let mut breaker = LineBreaker::new(max_width.filter(|_| !self.preformatted));
		let mut word: Vec<I26F6> = Vec::new();
		let mut space = I26F6::ZERO;
		for ch in self.text.chars() {
			let advance = I26F6::saturating_from_num(metrics.advance(ch, self.font_size_px));
			match ch {
				'\n' => {
					breaker.place(&word, space);
					word.clear();
					space = I26F6::ZERO;
					breaker.force_break();
				}
				' ' if !self.preformatted => {
					breaker.place(&word, space);
					word.clear();
					space = advance;
				}
				c if is_wide(c) && !self.preformatted => {
					breaker.place(&word, space);
					word.clear();
					breaker.place(&[advance], I26F6::ZERO);
					space = I26F6::ZERO;
				}
				_ => word.push(advance),
			}
		}
		breaker.place(&word, space);
		(breaker.max_width.to_num(), breaker.lines)
	}
}

struct LineBreaker {
	max: Option<I26F6>,
	line_width: I26F6,
	max_width: I26F6,
	lines: usize,
	line_open: bool,
}

impl LineBreaker {
	fn new(max: Option<f32>) -> Self {
		Self {
			max: max.map(I26F6::saturating_from_num),
			line_width: I26F6::ZERO,
			max_width: I26F6::ZERO,
			lines: 0,
			line_open: false,
		}
	}

	fn fits(&self, width: I26F6) -> bool {
		self.max.is_none_or(|max| width <= max)
	}

	fn open_line(&mut self, width: I26F6) {
		self.lines += 1;
		self.line_open = true;
		self.line_width = width;
		self.max_width = self.max_width.max(width);
	}

	fn extend_line(&mut self, width: I26F6) {
		self.line_width = self.line_width.saturating_add(width);
		self.max_width = self.max_width.max(self.line_width);
	}

	fn place(&mut self, glyphs: &[I26F6], space: I26F6) {
		if glyphs.is_empty() {
			return;
		}
		// Widths saturate at the fixed point range so huge fonts still wrap.
		let word_width = glyphs
			.iter()
			.fold(I26F6::ZERO, |acc, g| acc.saturating_add(*g));
		let spaced = space.saturating_add(word_width);
		if self.line_open && self.fits(self.line_width.saturating_add(spaced)) {
			self.extend_line(spaced);
		} else if self.fits(word_width) {
			self.open_line(word_width);
		} else {
			// Overlong word, break between glyphs.
			let mut first = !self.line_open;
			for g in glyphs {
				if first {
					self.open_line(*g);
					first = false;
				} else if self.fits(self.line_width.saturating_add(*g)) {
					self.extend_line(*g);
				} else {
					self.open_line(*g);
				}
			}
		}
	}

	fn force_break(&mut self) {
		if !self.line_open {
			self.lines += 1;
		}
		self.line_open = false;
		self.line_width = I26F6::ZERO;
	}
}

/// UA block styles: (font scale, block margin start em, block margin end em, inline start px).
fn block_style(local_name: &str) -> Option<(f32, f32, f32, f32)> {
	let style = match local_name {
		"p" => (1.0, 0.0, 0.8, 0.0),
		"h1" => (2.0, 0.67, 0.67, 0.0),
		"h2" => (1.5, 0.83, 0.83, 0.0),
		"h3" => (1.17, 1.0, 1.0, 0.0),
		"h4" => (1.0, 1.33, 1.33, 0.0),
		"h5" => (0.83, 1.67, 1.67, 0.0),
		"h6" => (0.67, 2.33, 2.33, 0.0),
		"blockquote" | "figure" => (1.0, 1.0, 1.0, 40.0),
		"ul" | "ol" | "dl" | "menu" => (1.0, 1.0, 1.0, 40.0),
		"pre" => (1.0, 1.0, 1.0, 0.0),
		"hr" => (1.0, 0.5, 0.5, 0.0),
		"dd" => (1.0, 0.0, 0.0, 40.0),
		"div" | "section" | "article" | "aside" | "header" | "footer" | "nav" | "main"
		| "li" | "dt" | "figcaption" | "address" | "table" | "tbody" | "thead" | "tfoot"
		| "tr" | "td" | "th" | "caption" | "center" | "details" | "summary" | "fieldset"
		| "body" | "html" => (1.0, 0.0, 0.0, 0.0),
		_ => return None,
	};
	Some(style)
}

fn is_skipped(local_name: &str) -> bool {
	matches!(
		local_name,
		"script" | "style" | "template" | "head" | "noscript" | "title" | "meta" | "link"
	)
}

/// Collects the block children of one block container.
struct Flow<'g> {
	geometry: &'g PageGeometry,
	font_scale: f32,
	preformatted: bool,
	top_level: bool,
	inline: String,
	children: Vec<NodeId>,
}

impl<'g> Flow<'g> {
	fn new(geometry: &'g PageGeometry, font_scale: f32, preformatted: bool, top_level: bool) -> Self {
		Self {
			geometry,
			font_scale,
			preformatted,
			top_level,
			inline: String::new(),
			children: Vec::new(),
		}
	}

	fn children(
		&mut self,
		tree: &Tree<Leaf>,
		id: DomId,
		taffy: &mut TaffyTree<ProbeLeaf>,
	) -> Result<(), taffy::TaffyError> {
		for child in tree.children(id) {
			match tree.get_context(*child) {
				Some(Leaf::Text(t)) => self.push_text(t.as_str()),
				Some(Leaf::Element(el)) => self.element(tree, *child, el, taffy)?,
				None => {}
			}
		}
		Ok(())
	}

	fn push_text(&mut self, text: &str) {
		if self.preformatted {
			self.inline.push_str(text);
			return;
		}
		for ch in text.chars() {
			if ch.is_whitespace() && ch != '\u{a0}' {
				if !self.inline.is_empty() && !self.inline.ends_with([' ', '\n']) {
					self.inline.push(' ');
				}
			} else {
				self.inline.push(ch);
			}
		}
	}

	fn element(
		&mut self,
		tree: &Tree<Leaf>,
		id: DomId,
		el: &Element,
		taffy: &mut TaffyTree<ProbeLeaf>,
	) -> Result<(), taffy::TaffyError> {
		let name = el.local_name().to_ascii_lowercase().to_string();
		if is_skipped(&name) {
			return Ok(());
		}
		if is_atomic(&name) {
			self.flush(taffy)?;
			let node = self.replaced(el, &name, taffy)?;
			self.children.push(node);
			return Ok(());
		}
		if name == "br" {
			self.inline.push('\n');
			return Ok(());
		}
		match block_style(&name) {
			Some((scale, margin_start, margin_end, indent)) => {
				self.flush(taffy)?;
				let font_scale = self.font_scale * scale;
				let em = self.geometry.font_size_px * font_scale;
				let mut nested = Flow::new(
					self.geometry,
					font_scale,
					self.preformatted || name == "pre",
					false,
				);
				nested.children(tree, id, taffy)?;
				let children = nested.finish(taffy)?;
				let border = if name == "hr" { 2.0 } else { 0.0 };
				let node = taffy.new_with_children(
					Style {
						display: Display::Block,
						margin: Rect {
							left: zero(),
							right: zero(),
							top: length(margin_start * em),
							bottom: length(margin_end * em),
						},
						padding: Rect {
							left: length(indent),
							right: zero(),
							top: zero(),
							bottom: zero(),
						},
						min_size: Size {
							width: auto(),
							height: length(border),
						},
						..Default::default()
					},
					&children,
				)?;
				self.children.push(node);
			}
			None => self.children(tree, id, taffy)?,
		}
		Ok(())
	}

	fn replaced(
		&self,
		el: &Element,
		name: &str,
		taffy: &mut TaffyTree<ProbeLeaf>,
	) -> Result<NodeId, taffy::TaffyError> {
		let g = self.geometry;
		let (mut width, mut height) = intrinsic_size(el, name).unwrap_or((0.0, 0.0));
		if matches!(name, "img" | "svg") && width > 0.0 && height > 0.0 {
			// max-width/max-height: 100% with object-fit: contain. Percentage
			// heights only resolve against the page box itself.
			let mut scale = (g.width / width).min(1.0);
			if self.top_level {
				scale = scale.min(g.height / height);
			}
			width *= scale;
			height *= scale;
		}
		let (inline, block) = g.logical(width, height);
		taffy.new_leaf_with_context(
			Style {
				display: Display::Block,
				size: Size {
					width: length(inline),
					height: length(block),
				},
				..Default::default()
			},
			ProbeLeaf::Replaced,
		)
	}

	fn flush(&mut self, taffy: &mut TaffyTree<ProbeLeaf>) -> Result<(), taffy::TaffyError> {
		let text = std::mem::take(&mut self.inline);
		if text.trim().is_empty() {
			return Ok(());
		}
		let font_size_px = self.geometry.font_size_px * self.font_scale;
		let run = InlineRun {
			text,
			font_size_px,
			line_height_px: font_size_px * self.geometry.line_height,
			preformatted: self.preformatted,
		};
		let node = taffy.new_leaf_with_context(
			Style {
				display: Display::Block,
				..Default::default()
			},
			ProbeLeaf::Inline(run),
		)?;
		self.children.push(node);
		Ok(())
	}

	fn finish(mut self, taffy: &mut TaffyTree<ProbeLeaf>) -> Result<Vec<NodeId>, taffy::TaffyError> {
		self.flush(taffy)?;
		Ok(self.children)
	}
}

fn parse_dimension(value: &str) -> Option<f32> {
	let value = value.trim();
	let value = value.strip_suffix("px").unwrap_or(value);
	value.parse::<f32>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// Physical intrinsic size from attributes, embedded image data or the
/// replaced element defaults.
fn intrinsic_size(el: &Element, name: &str) -> Option<(f32, f32)> {
	let attr_width = el.attr("width").and_then(parse_dimension);
	let attr_height = el.attr("height").and_then(parse_dimension);
	if let (Some(w), Some(h)) = (attr_width, attr_height) {
		return Some((w, h));
	}
	let natural = match name {
		"img" => el.attr("src").and_then(data_uri_size),
		"svg" => el.attr("viewBox").and_then(view_box_size).or(Some((300.0, 150.0))),
		"video" | "iframe" => Some((300.0, 150.0)),
		_ => None,
	};
	match (natural, attr_width, attr_height) {
		(Some((nw, nh)), Some(w), None) if nw > 0.0 => Some((w, nh * w / nw)),
		(Some((nw, nh)), None, Some(h)) if nh > 0.0 => Some((nw * h / nh, h)),
		(natural, _, _) => natural,
	}
}

fn view_box_size(view_box: &str) -> Option<(f32, f32)> {
	let values = view_box
		.split(|c: char| c.is_whitespace() || c == ',')
		.filter(|s| !s.is_empty())
		.map(|s| s.parse::<f32>().ok())
		.collect::<Option<Vec<_>>>()?;
	match values.as_slice() {
		[_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
		_ => None,
	}
}

fn data_uri_size(src: &str) -> Option<(f32, f32)> {
	let rest = src.strip_prefix("data:")?;
	let (header, payload) = rest.split_once(',')?;
	if !header.ends_with(";base64") {
		return None;
	}
	let payload = payload
		.chars()
		.filter(|c| !c.is_whitespace())
		.collect::<String>();
	let bytes = base64::engine::general_purpose::STANDARD
		.decode(payload)
		.inspect_err(|e| log::debug!("Bad data uri payload: {e}"))
		.ok()?;
	let size = imagesize::blob_size(&bytes)
		.inspect_err(|e| log::debug!("Unknown image data: {e}"))
		.ok()?;
	Some((size.width as f32, size.height as f32))
}

#[cfg(test)]
mod tests {
	use crate::css::CssBox;
	use crate::css::CssLength;
	use crate::layout_probe::InlineRun;
	use crate::layout_probe::LayoutMeasurer;
	use crate::layout_probe::ProportionalMetrics;
	use crate::layout_probe::data_uri_size;
	use crate::measure::MeasurementProbe;
	use crate::measure::Measurer;
	use crate::measure::measure_fits;
	use crate::settings::PaginationSettings;
	use crate::settings::WritingMode;

	// 1x1 transparent png.
	const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

	fn run(text: &str) -> InlineRun {
		InlineRun {
			text: text.to_string(),
			font_size_px: 10.0,
			line_height_px: 10.0,
			preformatted: false,
		}
	}

	#[test]
	fn test_wrap_words() {
		let metrics = ProportionalMetrics::default();
		// Each narrow glyph is 5px, a space 3px.
		assert_eq!((23.0, 1), run("ab cd").wrap(&metrics, Some(100.0)));
		assert_eq!((10.0, 2), run("ab cd").wrap(&metrics, Some(20.0)));
		assert_eq!((0.0, 0), run("").wrap(&metrics, Some(20.0)));
		let (_, lines) = run("abcdefghij").wrap(&metrics, Some(20.0));
		assert_eq!(3, lines, "Overlong word must break between glyphs");
		assert_eq!((10.0, 3), run("ab\n\ncd").wrap(&metrics, Some(100.0)));
		assert_eq!((30.0, 1), run("一二三").wrap(&metrics, None));
		assert_eq!((20.0, 2), run("一二三").wrap(&metrics, Some(25.0)));
	}

	#[test]
	fn test_wrap_huge_sizes_saturate() {
		let metrics = ProportionalMetrics::default();
		let mut r = run("abc def ghi");
		r.font_size_px = 1.0e8;
		let (width, lines) = r.wrap(&metrics, Some(5.0e7));
		assert!(width.is_finite() && width > 3.0e7);
		assert!(lines >= 1);
		let (_, lines) = r.wrap(&metrics, Some(800.0));
		assert_eq!(9, lines, "Every glyph is wider than the line");
	}

	#[test]
	fn test_wrap_preformatted_does_not_wrap() {
		let metrics = ProportionalMetrics::default();
		let mut r = run("abcdefghij klm");
		r.preformatted = true;
		let (width, lines) = r.wrap(&metrics, Some(20.0));
		assert_eq!(1, lines);
		assert!(width > 20.0);
	}

	fn settings() -> PaginationSettings {
		PaginationSettings {
			viewport_width: 200.0,
			viewport_height: 100.0,
			font_size: CssLength::Px(10.0),
			line_height: 2.0,
			padding: CssBox::from(CssLength::ZERO),
			..Default::default()
		}
	}

	#[test]
	fn test_layout_probe_text_lines() {
		let _ = env_logger::try_init();
		let settings = settings();
		let mut probe = LayoutMeasurer::new()
			.create_probe(&settings)
			.unwrap();

		// 5 lines of 20px fill the 100px page exactly.
		let five = "<div>a<br>b<br>c<br>d<br>e</div>";
		assert!(measure_fits(&mut probe, five, &settings));
		assert_eq!(100.0, probe.overflow().scroll_height);

		let six = "<div>a<br>b<br>c<br>d<br>e<br>f</div>";
		assert!(!measure_fits(&mut probe, six, &settings));
		assert_eq!(120.0, probe.overflow().scroll_height);
	}

	#[test]
	fn test_layout_probe_vertical_swaps_axes() {
		let _ = env_logger::try_init();
		let settings = PaginationSettings {
			writing_mode: WritingMode::VerticalRl,
			..settings()
		};
		let mut probe = LayoutMeasurer::new()
			.create_probe(&settings)
			.unwrap();

		// Columns are 20px wide, ten of them fill the 200px page.
		let ten = (0..10).map(|_| "x").collect::<Vec<_>>().join("<br>");
		assert!(measure_fits(&mut probe, &ten, &settings));
		let eleven = (0..11).map(|_| "x").collect::<Vec<_>>().join("<br>");
		assert!(!measure_fits(&mut probe, &eleven, &settings));
		let overflow = probe.overflow();
		assert_eq!(220.0, overflow.scroll_width);
		assert_eq!(100.0, overflow.client_height);
	}

	#[test]
	fn test_layout_probe_images() {
		let _ = env_logger::try_init();
		let settings = settings();
		let mut probe = LayoutMeasurer::new()
			.create_probe(&settings)
			.unwrap();

		// Top level images are scaled down to the page box.
		assert!(measure_fits(
			&mut probe,
			r#"<img src="big.png" width="4000" height="3000">"#,
			&settings
		));
		// Nested images only get their width clamped.
		assert!(!measure_fits(
			&mut probe,
			r#"<div><img src="tall.png" width="100" height="400"></div>"#,
			&settings
		));
		// Video keeps its size.
		assert!(!measure_fits(
			&mut probe,
			r#"<video width="400" height="50"></video>"#,
			&settings
		));
		// Unknown images collapse to nothing.
		assert!(measure_fits(&mut probe, r#"<img src="missing.png">"#, &settings));
	}

	#[test]
	fn test_data_uri_size() {
		assert_eq!(
			Some((1.0, 1.0)),
			data_uri_size(&format!("data:image/png;base64,{PNG_1X1}"))
		);
		assert_eq!(None, data_uri_size("data:text/plain,hello"));
		assert_eq!(None, data_uri_size("images/a.png"));
	}

	#[test]
	fn test_layout_probe_rejects_empty_viewport() {
		let settings = PaginationSettings::for_viewport(f32::NAN, 100.0);
		assert!(
			LayoutMeasurer::new()
				.create_probe(&settings)
				.is_err()
		);
	}
}
