//! Link targets and text offsets mapped onto unit offsets.

use crate::SpineItem;
use crate::html_parser::Leaf;
use crate::html_parser::NodeId;
use crate::html_parser::Tree;
use crate::segments::Unit;

/// Strips query and fragment and folds `.` and `..` path segments. Leading
/// `..` segments that cannot be folded are dropped.
pub fn normalize_href(href: &str) -> String {
	let path = href.split(['?', '#']).next().unwrap_or_default().trim();
	let mut segments: Vec<&str> = Vec::new();
	for segment in path.split('/') {
		match segment {
			"" | "." => {}
			".." => {
				segments.pop();
			}
			s => segments.push(s),
		}
	}
	segments.join("/")
}

/// Resolves `href` against the document at `base`.
pub fn join_href(base: &str, href: &str) -> String {
	if let Some(absolute) = href.strip_prefix('/') {
		return normalize_href(absolute);
	}
	match base.rsplit_once('/') {
		Some((dir, _)) => normalize_href(&format!("{dir}/{href}")),
		None => normalize_href(href),
	}
}

/// Spine position of the chapter `href` points to: an exact path match first,
/// then the first href ending with it, else `fallback`.
pub fn spine_index_for_href(spine_items: &[SpineItem], href: &str, fallback: usize) -> usize {
	let normalized = normalize_href(href);
	if normalized.is_empty() {
		return fallback;
	}
	if let Some(i) = spine_items
		.iter()
		.position(|item| normalize_href(&item.href) == normalized)
	{
		return i;
	}
	spine_items
		.iter()
		.position(|item| {
			let item_href = normalize_href(&item.href);
			item_href.ends_with(&format!("/{normalized}")) || item_href.ends_with(&normalized)
		})
		.unwrap_or(fallback)
}

fn find_target(tree: &Tree<Leaf>, root: NodeId, fragment_id: &str) -> Option<NodeId> {
	let elements = tree.descendant_elements(root);
	elements
		.iter()
		.find(|id| tree.element(**id).and_then(|el| el.attr("id")) == Some(fragment_id))
		.or_else(|| {
			elements
				.iter()
				.find(|id| tree.element(**id).and_then(|el| el.attr("name")) == Some(fragment_id))
		})
		.copied()
}

/// First unit inside the element with id (or name) `fragment_id`, 0 when
/// there is none.
pub fn unit_for_fragment(tree: &Tree<Leaf>, root: NodeId, units: &[Unit], fragment_id: &str) -> usize {
	if fragment_id.is_empty() {
		return 0;
	}
	let Some(target) = find_target(tree, root, fragment_id) else {
		log::debug!("Fragment #{fragment_id} not found");
		return 0;
	};
	units
		.iter()
		.position(|u| tree.contains(target, u.node()))
		.unwrap_or(0)
}

/// Text unit holding character `char_offset` of the visible chapter text.
/// Offsets past the end resolve to the last unit.
pub fn unit_for_text_offset(tree: &Tree<Leaf>, units: &[Unit], char_offset: usize) -> usize {
	let mut seen = 0;
	for (i, unit) in units.iter().enumerate() {
		if unit.is_element() {
			continue;
		}
		let len = unit.text(tree).chars().count();
		if (seen..seen + len).contains(&char_offset) {
			return i;
		}
		seen += len;
	}
	if char_offset >= seen {
		units.len().saturating_sub(1)
	} else {
		0
	}
}
