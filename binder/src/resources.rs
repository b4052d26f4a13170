//! Image reference rewriting ahead of measurement.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::SpineItem;
use crate::anchors::join_href;
use crate::html_parser::Leaf;
use crate::html_parser::NodeId;
use crate::html_parser::Tree;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
	#[error("Resource {0} not found")]
	NotFound(String),
	#[error("Failed to load {url}: {reason}")]
	Load { url: String, reason: String },
}

/// Maps resource references of a chapter to displayable URLs.
pub trait ResourceLoader {
	/// `Ok(None)` keeps the original reference.
	fn resolve(
		&self,
		url: &str,
		spine_item: &SpineItem,
	) -> impl Future<Output = Result<Option<String>, ResourceError>>;

	/// Releases a URL previously returned by [`ResourceLoader::resolve`].
	fn revoke(&self, _resolved: &str) {}
}

/// Leaves every reference untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

impl ResourceLoader for NoResources {
	async fn resolve(&self, _url: &str, _spine_item: &SpineItem) -> Result<Option<String>, ResourceError> {
		Ok(None)
	}
}

/// Resolves references from a fixed table keyed by book relative path.
///
/// References are looked up as written first, then relative to the chapter
/// href.
#[derive(Debug, Default)]
pub struct MapLoader {
	entries: HashMap<String, String>,
	revoked: RefCell<Vec<String>>,
}

impl MapLoader {
	pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			entries: entries.into_iter().collect(),
			revoked: RefCell::default(),
		}
	}

	pub fn insert(&mut self, path: impl Into<String>, resolved: impl Into<String>) {
		self.entries.insert(path.into(), resolved.into());
	}

	pub fn revoked(&self) -> Vec<String> {
		self.revoked.borrow().clone()
	}
}

impl ResourceLoader for MapLoader {
	async fn resolve(&self, url: &str, spine_item: &SpineItem) -> Result<Option<String>, ResourceError> {
		if let Some(resolved) = self.entries.get(url) {
			return Ok(Some(resolved.clone()));
		}
		let joined = join_href(&spine_item.href, url);
		self.entries
			.get(&joined)
			.cloned()
			.map(Some)
			.ok_or(ResourceError::NotFound(joined))
	}

	fn revoke(&self, resolved: &str) {
		self.revoked.borrow_mut().push(resolved.to_string());
	}
}

fn is_inline_reference(url: &str) -> bool {
	url.starts_with("blob:") || url.starts_with("data:")
}

struct ImageRef {
	id: NodeId,
	attr: &'static str,
	url: Option<String>,
	srcset: Option<String>,
}

fn collect_image_refs(tree: &Tree<Leaf>, root: NodeId) -> Vec<ImageRef> {
	tree.descendant_elements(root)
		.into_iter()
		.filter_map(|id| {
			let el = tree.element(id)?;
			let (attr, srcset) = match &**el.local_name() {
				"img" if el.is_html() => ("src", el.attr("srcset").map(str::to_string)),
				"image" if !el.is_html() => {
					let attr = if el.has_attr("href") { "href" } else { "xlink:href" };
					(attr, None)
				}
				_ => return None,
			};
			let url = el
				.attr(attr)
				.filter(|u| !u.is_empty() && !is_inline_reference(u))
				.map(str::to_string);
			(url.is_some() || srcset.is_some()).then_some(ImageRef {
				id,
				attr,
				url,
				srcset,
			})
		})
		.collect()
}

async fn resolve_one<L: ResourceLoader>(loader: &L, url: &str, spine_item: &SpineItem) -> Option<String> {
	match loader.resolve(url, spine_item).await {
		Ok(Some(resolved)) => Some(resolved),
		Ok(None) => None,
		Err(e) => {
			log::debug!("Keep unresolved {url} in {}: {e}", spine_item.href);
			None
		}
	}
}

async fn resolve_srcset<L: ResourceLoader>(
	loader: &L,
	srcset: &str,
	spine_item: &SpineItem,
	resolved: &mut BTreeSet<String>,
) -> String {
	let mut parts = Vec::new();
	for candidate in srcset.split(',') {
		let candidate = candidate.trim();
		if candidate.is_empty() {
			continue;
		}
		let (url, descriptor) = match candidate.split_once(char::is_whitespace) {
			Some((url, descriptor)) => (url, Some(descriptor.trim())),
			None => (candidate, None),
		};
		let url = if is_inline_reference(url) {
			url.to_string()
		} else {
			match resolve_one(loader, url, spine_item).await {
				Some(r) => {
					resolved.insert(r.clone());
					r
				}
				None => url.to_string(),
			}
		};
		parts.push(match descriptor {
			Some(d) if !d.is_empty() => format!("{url} {d}"),
			_ => url,
		});
	}
	parts.join(", ")
}

/// Rewrites `img` sources, `srcset` candidates and SVG `image` links below
/// `root`. Failed lookups keep the original reference. Every URL handed out
/// by the loader is added to `resolved`.
pub async fn resolve_resources<L: ResourceLoader>(
	tree: &mut Tree<Leaf>,
	root: NodeId,
	loader: &L,
	spine_item: &SpineItem,
	resolved: &mut BTreeSet<String>,
) {
	for image in collect_image_refs(tree, root) {
		let url = match &image.url {
			Some(url) => resolve_one(loader, url, spine_item).await,
			None => None,
		};
		let srcset = match &image.srcset {
			Some(srcset) => Some(resolve_srcset(loader, srcset, spine_item, resolved).await),
			None => None,
		};
		let Some(el) = tree.element_mut(image.id) else {
			continue;
		};
		if let Some(url) = url {
			resolved.insert(url.clone());
			el.set_attr(image.attr, url);
		}
		if let Some(srcset) = srcset {
			el.set_attr("srcset", srcset);
		}
	}
}
