//! Addressable units of a chapter body.
//!
//! A unit is either a bounded slice of one text node or one atomic element.
//! Units are emitted in document order and their index is the chapter-local
//! unit offset used by locators.

use crate::html_parser::EdgeRef;
use crate::html_parser::Leaf;
use crate::html_parser::NodeId;
use crate::html_parser::NodeTreeIter;
use crate::html_parser::Tree;

const ATOMIC_ELEMENTS: &[&str] = &["img", "svg", "video", "iframe"];
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "template", "head", "noscript"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
	/// Byte range `start..end` of a text node, always on char boundaries.
	Text { node: NodeId, start: usize, end: usize },
	Element { node: NodeId },
}

impl Unit {
	pub fn node(&self) -> NodeId {
		match self {
			Unit::Text { node, .. } | Unit::Element { node } => *node,
		}
	}

	pub fn is_element(&self) -> bool {
		matches!(self, Unit::Element { .. })
	}

	/// Text covered by a text unit, empty for element units.
	pub fn text<'a>(&self, tree: &'a Tree<Leaf>) -> &'a str {
		match self {
			Unit::Text { node, start, end } => tree
				.text(*node)
				.and_then(|t| t.get(*start..*end))
				.unwrap_or_default(),
			Unit::Element { .. } => "",
		}
	}
}

pub fn is_atomic(local_name: &str) -> bool {
	ATOMIC_ELEMENTS
		.iter()
		.any(|n| n.eq_ignore_ascii_case(local_name))
}

fn is_invisible(local_name: &str) -> bool {
	INVISIBLE_ELEMENTS
		.iter()
		.any(|n| n.eq_ignore_ascii_case(local_name))
}

/// Walks the subtree below `root` and cuts it into units of at most `step`
/// characters.
pub fn build_units(tree: &Tree<Leaf>, root: NodeId, step: usize) -> Vec<Unit> {
	let step = step.max(1);
	let mut units = Vec::new();
	let mut iter = NodeTreeIter::new(tree, root);
	while let Some(edge) = iter.next() {
		match edge {
			EdgeRef::OpenElement(el) if is_atomic(el.local_name()) => {
				units.push(Unit::Element { node: el.id });
				iter.skip_children();
			}
			EdgeRef::OpenElement(el) if is_invisible(el.local_name()) => {
				iter.skip_children();
			}
			EdgeRef::OpenElement(_) | EdgeRef::CloseElement(..) => {}
			EdgeRef::Text(t) => {
				let text = t.text();
				if text.trim().is_empty() {
					continue;
				}
				push_text_units(&mut units, t.id, text, step);
			}
		}
	}
	units
}

fn push_text_units(units: &mut Vec<Unit>, node: NodeId, text: &str, step: usize) {
	let mut start = 0;
	let mut count = 0;
	for (idx, _) in text.char_indices() {
		if count == step {
			units.push(Unit::Text {
				node,
				start,
				end: idx,
			});
			start = idx;
			count = 0;
		}
		count += 1;
	}
	if start < text.len() {
		units.push(Unit::Text {
			node,
			start,
			end: text.len(),
		});
	}
}

#[cfg(test)]
mod tests {
	use crate::html_parser::NodeTreeBuilder;
	use crate::segments::Unit;
	use crate::segments::build_units;

	#[test]
	fn test_segments_cover_text_exactly() {
		let _ = env_logger::try_init();
		let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod.";
		let tree = NodeTreeBuilder::new().read_str(&format!("<p>{text}</p>"));
		let body = tree.body().unwrap();
		let units = build_units(tree.tree(), body, 24);

		assert_eq!(text.chars().count().div_ceil(24), units.len());
		let joined = units
			.iter()
			.map(|u| u.text(tree.tree()))
			.collect::<String>();
		assert_eq!(text, joined);
		for pair in units.windows(2) {
			let (Unit::Text { end, .. }, Unit::Text { start, .. }) = (pair[0], pair[1]) else {
				panic!("Expected text units");
			};
			assert_eq!(end, start, "Gap or overlap between slices");
		}
	}

	#[test]
	fn test_segments_multibyte_boundaries() {
		let _ = env_logger::try_init();
		let text = "吾輩は猫である。名前はまだ無い。どこで生れたかとんと見当がつかぬ。";
		let tree = NodeTreeBuilder::new().read_str(&format!("<p>{text}</p>"));
		let units = build_units(tree.tree(), tree.body().unwrap(), 5);

		for u in &units {
			assert!(u.text(tree.tree()).chars().count() <= 5);
		}
		let joined = units
			.iter()
			.map(|u| u.text(tree.tree()))
			.collect::<String>();
		assert_eq!(text, joined);
	}

	#[test]
	fn test_segments_skip_whitespace_and_atomic_descendants() {
		let _ = env_logger::try_init();
		let input = r#"
			<div>
				<p>  </p>
				<p>Hello <b>world</b></p>
				<svg><text>inside svg</text></svg>
				<img src="a.png">
				<script>var x = 1;</script>
				<video><p>fallback</p></video>
			</div>"#;
		let tree = NodeTreeBuilder::new().read_str(input);
		let units = build_units(tree.tree(), tree.body().unwrap(), 24);

		let kinds = units
			.iter()
			.map(|u| match u {
				Unit::Text { .. } => u.text(tree.tree()).to_string(),
				Unit::Element { node } => {
					format!("<{}>", tree.tree().element(*node).unwrap().local_name())
				}
			})
			.collect::<Vec<_>>();
		assert_eq!(
			vec!["Hello ", "world", "<svg>", "<img>", "<video>"],
			kinds
		);
	}

	#[test]
	fn test_segments_empty_chapter() {
		let _ = env_logger::try_init();
		for input in ["<p></p>", "   \n\t ", ""] {
			let tree = NodeTreeBuilder::new().read_str(input);
			let units = build_units(tree.tree(), tree.body().unwrap(), 24);
			assert!(units.is_empty(), "Expected no units for {input:?}");
		}
	}
}
