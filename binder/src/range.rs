//! Unit ranges and their serialization into HTML fragments.

use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::html_parser::Leaf;
use crate::html_parser::NodeId;
use crate::html_parser::Tree;
use crate::html_parser::is_raw_text_parent;
use crate::html_parser::write_close_tag;
use crate::html_parser::write_open_tag;
use crate::html_parser::write_text;
use crate::segments::Unit;

/// A point between nodes or inside a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
	/// Byte offset into a text node.
	Text { node: NodeId, offset: usize },
	Before(NodeId),
	After(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRange {
	pub start: Boundary,
	pub end: Boundary,
}

impl UnitRange {
	pub fn is_collapsed(&self) -> bool {
		self.start == self.end
	}
}

fn start_boundary(unit: &Unit) -> Boundary {
	match *unit {
		Unit::Text { node, start, .. } => Boundary::Text {
			node,
			offset: start,
		},
		Unit::Element { node } => Boundary::Before(node),
	}
}

fn end_boundary(unit: &Unit) -> Boundary {
	match *unit {
		Unit::Text { node, end, .. } => Boundary::Text { node, offset: end },
		Unit::Element { node } => Boundary::After(node),
	}
}

/// Boundary where unit `index` starts. Indices past the end resolve to the
/// point just after the last unit.
pub fn position_for_index(units: &[Unit], index: usize) -> Option<Boundary> {
	match units.get(index) {
		Some(unit) => Some(start_boundary(unit)),
		None => units.last().map(end_boundary),
	}
}

/// Range covering units `start..end`, with `end` clamped to
/// `start + 1..=units.len()`.
pub fn unit_range(units: &[Unit], start: usize, end: usize) -> Option<UnitRange> {
	let last = units.len().checked_sub(1)?;
	if start > last {
		let p = position_for_index(units, units.len())?;
		return Some(UnitRange { start: p, end: p });
	}
	let end = end.clamp(start + 1, units.len());
	Some(UnitRange {
		start: start_boundary(&units[start]),
		end: end_boundary(&units[end - 1]),
	})
}

#[derive(Debug, Clone, Copy)]
struct Span {
	start: u64,
	end: u64,
}

/// Serializes unit ranges of one chapter body.
///
/// Node spans are laid out once on a linear scale where element tags take one
/// position each and text nodes take one position per byte, so every boundary
/// maps to a single ordinal.
pub struct Materializer<'a> {
	tree: &'a Tree<Leaf>,
	spans: HashMap<NodeId, Span>,
}

impl<'a> Materializer<'a> {
	pub fn new(tree: &'a Tree<Leaf>, root: NodeId) -> Self {
		let mut spans = HashMap::new();
		let mut cursor = 0;
		Self::layout_spans(tree, root, &mut cursor, &mut spans);
		Self { tree, spans }
	}

	fn layout_spans(
		tree: &Tree<Leaf>,
		id: NodeId,
		cursor: &mut u64,
		spans: &mut HashMap<NodeId, Span>,
	) {
		let start = *cursor;
		match tree.get_context(id) {
			Some(Leaf::Text(t)) => {
				*cursor += t.as_str().len() as u64;
			}
			_ => {
				*cursor += 1;
				for child in tree.children(id) {
					Self::layout_spans(tree, *child, cursor, spans);
				}
				*cursor += 1;
			}
		}
		spans.insert(id, Span {
			start,
			end: *cursor,
		});
	}

	fn ordinal(&self, b: Boundary) -> Option<u64> {
		match b {
			Boundary::Text { node, offset } => self.spans.get(&node).map(|s| s.start + offset as u64),
			Boundary::Before(node) => self.spans.get(&node).map(|s| s.start),
			Boundary::After(node) => self.spans.get(&node).map(|s| s.end),
		}
	}

	fn container(&self, b: Boundary) -> Option<NodeId> {
		match b {
			Boundary::Text { node, .. } => Some(node),
			Boundary::Before(node) | Boundary::After(node) => self.tree.parent(node),
		}
	}

	fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
		let ancestors = self.tree.ancestors(a).collect::<BTreeSet<_>>();
		self.tree.ancestors(b).find(|n| ancestors.contains(n))
	}

	/// Serialized clone of the range contents. The common ancestor container
	/// is not part of the output, partially selected ancestors are cloned
	/// without their unselected children.
	pub fn serialize(&self, range: &UnitRange) -> String {
		let mut out = String::new();
		if range.is_collapsed() {
			return out;
		}
		let (Some(a), Some(b)) = (self.ordinal(range.start), self.ordinal(range.end)) else {
			log::warn!("Range {range:?} outside of chapter body");
			return out;
		};
		let Some(ancestor) = self
			.container(range.start)
			.zip(self.container(range.end))
			.and_then(|(x, y)| self.common_ancestor(x, y))
		else {
			return out;
		};
		if let Some((text, span)) = self.tree.text(ancestor).zip(self.spans.get(&ancestor)) {
			let lo = (a - span.start) as usize;
			let hi = (b - span.start) as usize;
			if let Some(slice) = text.get(lo..hi) {
				write_text(&mut out, slice, is_raw_text_parent(self.tree, ancestor));
			}
			return out;
		}
		for child in self.tree.children(ancestor) {
			self.serialize_within(*child, a, b, &mut out);
		}
		out
	}

	fn serialize_within(&self, id: NodeId, a: u64, b: u64, out: &mut String) {
		let Some(span) = self.spans.get(&id).copied() else {
			return;
		};
		if span.end <= a || span.start >= b {
			return;
		}
		match self.tree.get_context(id) {
			Some(Leaf::Text(t)) => {
				let lo = (a.max(span.start) - span.start) as usize;
				let hi = (b.min(span.end) - span.start) as usize;
				if let Some(slice) = t.as_str().get(lo..hi) {
					write_text(out, slice, is_raw_text_parent(self.tree, id));
				}
			}
			Some(Leaf::Element(el)) => {
				if a <= span.start && span.end <= b {
					self.tree.serialize_node(id, out);
				} else {
					write_open_tag(out, el);
					for child in self.tree.children(id) {
						self.serialize_within(*child, a, b, out);
					}
					write_close_tag(out, el);
				}
			}
			None => {}
		}
	}

	/// Fragment for units `start..end`, see [`unit_range`].
	pub fn fragment(&self, units: &[Unit], start: usize, end: usize) -> String {
		unit_range(units, start, end)
			.map(|r| self.serialize(&r))
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use crate::html_parser::NodeTreeBuilder;
	use crate::range::Boundary;
	use crate::range::Materializer;
	use crate::range::position_for_index;
	use crate::range::unit_range;
	use crate::segments::Unit;
	use crate::segments::build_units;

	#[test]
	fn test_range_within_single_text_node() {
		let _ = env_logger::try_init();
		let tree = NodeTreeBuilder::new().read_str("<p>abcdefghij</p>");
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, 3);
		let m = Materializer::new(tree.tree(), body);

		assert_eq!("def", m.fragment(&units, 1, 2));
		assert_eq!("abcdef", m.fragment(&units, 0, 2));
		// A range inside one text node clones only the text.
		assert_eq!("abcdefghij", m.fragment(&units, 0, units.len()));
	}

	#[test]
	fn test_range_across_paragraphs() {
		let _ = env_logger::try_init();
		let tree = NodeTreeBuilder::new().read_str("<div><p>one two</p><p>three <em>four</em></p></div>");
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, 4);
		let m = Materializer::new(tree.tree(), body);

		// units: "one ", "two", "thre", "e ", "four"
		assert_eq!(5, units.len());
		assert_eq!("<p>two</p><p>thre</p>", m.fragment(&units, 1, 3));
		assert_eq!("e <em>four</em>", m.fragment(&units, 3, 5));
	}

	#[test]
	fn test_range_element_never_split() {
		let _ = env_logger::try_init();
		let tree = NodeTreeBuilder::new().read_str(r#"<p>before</p><img src="a.png"><p>after</p>"#);
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, 24);
		let m = Materializer::new(tree.tree(), body);

		assert!(matches!(units[1], Unit::Element { .. }));
		assert_eq!("before", m.fragment(&units, 0, 1));
		assert_eq!(r#"<p>before</p><img src="a.png">"#, m.fragment(&units, 0, 2));
		assert_eq!(r#"<img src="a.png">"#, m.fragment(&units, 1, 2));
		assert_eq!(r#"<img src="a.png"><p>after</p>"#, m.fragment(&units, 1, 3));
	}

	#[test]
	fn test_range_clamping() {
		let _ = env_logger::try_init();
		let tree = NodeTreeBuilder::new().read_str("<p>abc</p><p>def</p>");
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, 24);
		let m = Materializer::new(tree.tree(), body);

		assert_eq!("", m.fragment(&units, 5, 9));
		assert!(unit_range(&units, 2, 3).unwrap().is_collapsed());
		// End before start is widened to one unit.
		assert_eq!("abc", m.fragment(&units, 0, 0));
		assert_eq!("<p>abc</p><p>def</p>", m.fragment(&units, 0, 99));
		assert!(unit_range(&[], 0, 1).is_none());

		let Unit::Text { node, end, .. } = units[1] else {
			panic!("Expected text unit");
		};
		assert_eq!(
			Some(Boundary::Text { node, offset: end }),
			position_for_index(&units, 7)
		);
	}
}
