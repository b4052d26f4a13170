use std::borrow::Cow;
use std::cell::Cell;
use std::cell::Ref;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write;

use html5ever::Attribute;
use html5ever::LocalName;
use html5ever::Namespace;
use html5ever::QualName;
use html5ever::interface::NodeOrText;
use html5ever::interface::TreeSink;
use html5ever::local_name;
use html5ever::tendril::StrTendril;
use html5ever::tendril::TendrilSink;

const NS_HTML: &str = "http://www.w3.org/1999/xhtml";
const NS_XLINK: &str = "http://www.w3.org/1999/xlink";
const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";
const NS_XMLNS: &str = "http://www.w3.org/2000/xmlns/";

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
	"keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
	"style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

#[derive(Debug, Clone)]
pub struct Element {
	pub name: QualName,
	pub attrs: BTreeMap<(Namespace, LocalName), String>,
}

impl Element {
	pub fn local_name(&self) -> &LocalName {
		&self.name.local
	}

	pub fn is_html(&self) -> bool {
		&*self.name.ns == NS_HTML
	}

	/// Looks an attribute up by its serialized name, e.g. `src` or `xlink:href`.
	pub fn attr(&self, name: &str) -> Option<&str> {
		self.attrs
			.iter()
			.find(|((ns, local), _)| qualified_attr_name(ns, local) == name)
			.map(|(_, v)| v.as_str())
	}

	pub fn has_attr(&self, name: &str) -> bool {
		self.attr(name).is_some()
	}

	pub fn set_attr(&mut self, name: &str, value: String) {
		let existing = self
			.attrs
			.keys()
			.find(|(ns, local)| qualified_attr_name(ns, local) == name)
			.cloned();
		match existing {
			Some(key) => {
				self.attrs.insert(key, value);
			}
			None => {
				self.attrs
					.insert((Namespace::from(""), LocalName::from(name)), value);
			}
		}
	}

	fn is_void(&self) -> bool {
		self.is_html() && VOID_ELEMENTS.contains(&&*self.name.local)
	}

	fn is_raw_text(&self) -> bool {
		self.is_html() && RAW_TEXT_ELEMENTS.contains(&&*self.name.local)
	}
}

fn qualified_attr_name<'a>(ns: &Namespace, local: &'a LocalName) -> Cow<'a, str> {
	let prefix = match &**ns {
		NS_XLINK => "xlink:",
		NS_XML => "xml:",
		NS_XMLNS if &**local != "xmlns" => "xmlns:",
		_ => return Cow::Borrowed(&**local),
	};
	Cow::Owned(format!("{prefix}{}", &**local))
}

#[derive(Debug)]
pub struct Text {
	pub t: StrTendril,
}

impl Text {
	pub fn as_str(&self) -> &str {
		&self.t
	}
}

#[derive(Debug)]
pub enum Leaf {
	Element(Element),
	Text(Text),
}

#[derive(Debug, Clone)]
pub struct ElementWrapper<'a> {
	pub id: NodeId,
	pub el: &'a Element,
}

impl<'a> ElementWrapper<'a> {
	pub fn local_name(&self) -> &'a LocalName {
		&self.el.name.local
	}
}

#[derive(Debug, Clone)]
pub struct TextWrapper<'a> {
	pub id: NodeId,
	pub t: &'a Text,
}

impl<'a> TextWrapper<'a> {
	pub fn text(&self) -> &'a str {
		self.t.as_str()
	}
}

pub enum EdgeRef<'a> {
	OpenElement(ElementWrapper<'a>),
	CloseElement(NodeId, LocalName),
	Text(TextWrapper<'a>),
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

#[derive(Debug)]
pub struct Tree<T> {
	node_id_counter: u32,
	child_map: BTreeMap<NodeId, Vec<NodeId>>,
	parent_map: BTreeMap<NodeId, NodeId>,
	contexts: BTreeMap<NodeId, T>,
}

impl<T> Tree<T> {
	pub(crate) fn new() -> Self {
		Self {
			node_id_counter: 0,
			child_map: BTreeMap::new(),
			parent_map: BTreeMap::new(),
			contexts: BTreeMap::new(),
		}
	}

	#[allow(dead_code)]
	pub(crate) fn node_count(&self) -> u32 {
		self.node_id_counter
	}

	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.parent_map.get(&id).cloned()
	}

	pub fn children(&self, id: NodeId) -> &[NodeId] {
		self.child_map
			.get(&id)
			.map(|v| v.as_slice())
			.unwrap_or_default()
	}

	pub fn get_context(&self, id: NodeId) -> Option<&T> {
		self.contexts.get(&id)
	}

	pub(crate) fn get_context_mut(&mut self, id: NodeId) -> Option<&mut T> {
		self.contexts.get_mut(&id)
	}

	/// Walks from `id` up to the root, `id` included.
	pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
		std::iter::successors(Some(id), |n| self.parent(*n))
	}

	pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
		self.ancestors(node).any(|n| n == ancestor)
	}

	pub(crate) fn remove_parent(&mut self, id: NodeId) {
		let existing = self.parent_map.remove(&id);
		if let Some(parent_id) = existing {
			self.child_map.entry(parent_id).and_modify(|v| {
				if let Some(i) = v.iter().position(|c| *c == id) {
					v.remove(i);
				}
			});
		}
	}

	pub(crate) fn add_node(&mut self) -> NodeId {
		let id = NodeId(self.node_id_counter);
		self.node_id_counter += 1;
		id
	}

	pub(crate) fn add_node_with_context(&mut self, context: T) -> NodeId {
		let id = NodeId(self.node_id_counter);
		self.node_id_counter += 1;
		self.contexts.insert(id, context);
		id
	}

	pub(crate) fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) {
		debug_assert_ne!(parent_id, child_id, "Tried to append node to self");
		self.remove_parent(child_id);
		self.parent_map.insert(child_id, parent_id);
		self.child_map.entry(parent_id).or_default().push(child_id);
	}

	pub(crate) fn add_child_before_sibling(&mut self, sibling_id: NodeId, child_id: NodeId) {
		let Some(parent_id) = self.parent_map.get(&sibling_id).cloned() else {
			log::warn!("Sibling {sibling_id:?} has no parent, drop {child_id:?}");
			return;
		};
		self.remove_parent(child_id);
		self.parent_map.insert(child_id, parent_id);

		let children = self.child_map.entry(parent_id).or_default();
		if let Some(i) = children.iter().position(|c| *c == sibling_id) {
			children.insert(i, child_id);
		} else {
			children.push(child_id);
		}
	}

	pub(crate) fn clear(&mut self) {
		self.node_id_counter = 0;
		self.parent_map.clear();
		self.child_map.clear();
		self.contexts.clear();
	}
}

impl Tree<Leaf> {
	pub fn element(&self, id: NodeId) -> Option<&Element> {
		match self.get_context(id) {
			Some(Leaf::Element(el)) => Some(el),
			_ => None,
		}
	}

	pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
		match self.get_context_mut(id) {
			Some(Leaf::Element(el)) => Some(el),
			_ => None,
		}
	}

	pub fn text(&self, id: NodeId) -> Option<&str> {
		match self.get_context(id) {
			Some(Leaf::Text(t)) => Some(t.as_str()),
			_ => None,
		}
	}

	/// Element ids below `id` in document order, `id` excluded.
	pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
		NodeTreeIter::new(self, id)
			.filter_map(|edge| match edge {
				EdgeRef::OpenElement(el) => Some(el.id),
				_ => None,
			})
			.collect()
	}

	/// Serializes `id` and its subtree the way `outerHTML` does.
	pub fn serialize_node(&self, id: NodeId, out: &mut String) {
		match self.get_context(id) {
			Some(Leaf::Element(el)) => {
				write_open_tag(out, el);
				for child in self.children(id) {
					self.serialize_node(*child, out);
				}
				write_close_tag(out, el);
			}
			Some(Leaf::Text(t)) => {
				let raw = self
					.parent(id)
					.and_then(|p| self.element(p))
					.is_some_and(|el| el.is_raw_text());
				write_text(out, t.as_str(), raw);
			}
			None => {}
		}
	}

	/// Serializes the children of `id`, i.e. `innerHTML`.
	pub fn serialize_children(&self, id: NodeId) -> String {
		let mut out = String::new();
		for child in self.children(id) {
			self.serialize_node(*child, &mut out);
		}
		out
	}
}

pub(crate) fn write_open_tag(out: &mut String, el: &Element) {
	out.push('<');
	out.push_str(&el.name.local);
	for ((ns, local), value) in &el.attrs {
		out.push(' ');
		out.push_str(&qualified_attr_name(ns, local));
		out.push_str("=\"");
		for ch in value.chars() {
			match ch {
				'&' => out.push_str("&amp;"),
				'"' => out.push_str("&quot;"),
				'\u{a0}' => out.push_str("&nbsp;"),
				c => out.push(c),
			}
		}
		out.push('"');
	}
	out.push('>');
}

pub(crate) fn write_close_tag(out: &mut String, el: &Element) {
	if !el.is_void() {
		let _ = write!(out, "</{}>", &*el.name.local);
	}
}

pub(crate) fn write_text(out: &mut String, text: &str, raw: bool) {
	if raw {
		out.push_str(text);
		return;
	}
	for ch in text.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'\u{a0}' => out.push_str("&nbsp;"),
			c => out.push(c),
		}
	}
}

pub(crate) fn is_raw_text_parent(tree: &Tree<Leaf>, text_id: NodeId) -> bool {
	tree.parent(text_id)
		.and_then(|p| tree.element(p))
		.is_some_and(|el| el.is_raw_text())
}

pub struct NodeTreeBuilder {
	root: NodeId,
	error: NodeId,
	body: Cell<Option<NodeId>>,
	tree: RefCell<Tree<Leaf>>,
	parse_errors: RefCell<Vec<Cow<'static, str>>>,
}

impl Default for NodeTreeBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl NodeTreeBuilder {
	pub fn new() -> Self {
		let parse_errors = Vec::new().into();
		let mut tree = Tree::new();
		let root = tree.add_node();
		let body = Cell::new(None);
		let error = tree.add_node();
		let tree = RefCell::new(tree);

		Self {
			root,
			error,
			body,
			tree,
			parse_errors,
		}
	}

	pub fn read_str(self, html: &str) -> NodeTree {
		html5ever::parse_document(self, Default::default()).one(html)
	}
}

pub struct NodeTreeIter<'a> {
	tree: &'a Tree<Leaf>,
	stack: Vec<EdgeRef<'a>>,
}

impl<'a> NodeTreeIter<'a> {
	pub fn new(tree: &'a Tree<Leaf>, id: NodeId) -> Self {
		let stack = Self::child_edges_rev(tree, id).collect();
		Self { tree, stack }
	}

	fn child_edges_rev(tree: &'a Tree<Leaf>, id: NodeId) -> impl Iterator<Item = EdgeRef<'a>> {
		tree.children(id)
			.iter()
			.rev()
			.filter_map(|child| match tree.get_context(*child) {
				Some(Leaf::Element(el)) => {
					Some(EdgeRef::OpenElement(ElementWrapper { id: *child, el }))
				}
				Some(Leaf::Text(t)) => Some(EdgeRef::Text(TextWrapper { id: *child, t })),
				None => None,
			})
	}

	/// Drops the pending children of the element just opened.
	pub fn skip_children(&mut self) {
		while let Some(edge) = self.stack.pop() {
			if let EdgeRef::CloseElement(..) = edge {
				self.stack.push(edge);
				return;
			}
		}
	}
}

impl<'a> Iterator for NodeTreeIter<'a> {
	type Item = EdgeRef<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.stack.pop()?;
		if let EdgeRef::OpenElement(ref el) = node {
			self.stack
				.push(EdgeRef::CloseElement(el.id, el.local_name().clone()));
			self.stack.extend(Self::child_edges_rev(self.tree, el.id));
		}
		Some(node)
	}
}

pub struct NodeTree {
	#[allow(dead_code)]
	pub(crate) root: NodeId,
	#[allow(dead_code)]
	pub(crate) error: NodeId,
	pub(crate) body: Option<NodeId>,
	pub(crate) tree: Tree<Leaf>,
	pub(crate) parse_errors: Vec<Cow<'static, str>>,
}

impl NodeTree {
	pub fn body(&self) -> Option<NodeId> {
		self.body
	}

	pub fn tree(&self) -> &Tree<Leaf> {
		&self.tree
	}

	pub fn tree_mut(&mut self) -> &mut Tree<Leaf> {
		&mut self.tree
	}

	pub fn body_iter(&self) -> Option<NodeTreeIter<'_>> {
		self.body.map(|id| NodeTreeIter::new(&self.tree, id))
	}

	pub(crate) fn into_builder(self) -> NodeTreeBuilder {
		let NodeTree {
			mut tree,
			mut parse_errors,
			..
		} = self;

		tree.clear();
		parse_errors.clear();

		let root = tree.add_node();
		let error = tree.add_node();
		let body = None.into();
		let tree = tree.into();
		let parse_errors = parse_errors.into();

		NodeTreeBuilder {
			root,
			error,
			body,
			tree,
			parse_errors,
		}
	}
}

impl From<NodeTreeBuilder> for NodeTree {
	fn from(value: NodeTreeBuilder) -> Self {
		let NodeTreeBuilder {
			tree,
			root,
			body,
			error,
			parse_errors,
		} = value;
		Self {
			root,
			error,
			body: body.into_inner(),
			tree: tree.into_inner(),
			parse_errors: parse_errors.into_inner(),
		}
	}
}

impl TreeSink for NodeTreeBuilder {
	type Handle = NodeId;
	type Output = NodeTree;
	type ElemName<'a> = Ref<'a, QualName>;

	fn finish(self) -> Self::Output {
		if !self.parse_errors.borrow().is_empty() {
			log::trace!("Parsed with {} errors", self.parse_errors.borrow().len());
		}
		self.into()
	}

	fn parse_error(&self, msg: Cow<'static, str>) {
		log::trace!("Error during parse: {msg}");
		self.parse_errors.borrow_mut().push(msg);
	}

	fn get_document(&self) -> Self::Handle {
		self.root
	}

	fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
		Ref::map(self.tree.borrow(), |nodes| {
			match &nodes.get_context(*target) {
				Some(Leaf::Element(element)) => &element.name,
				_ => panic!("Not element node: {target:?}"),
			}
		})
	}

	fn create_element(
		&self,
		name: QualName,
		attrs: Vec<Attribute>,
		_flags: html5ever::interface::ElementFlags,
	) -> Self::Handle {
		log::trace!("create_element({name:?}, {attrs:?})");
		let is_body = &*name.ns == NS_HTML && matches!(&name.local, &local_name!("body"));
		let attrs = attrs
			.into_iter()
			.map(|a| ((a.name.ns, a.name.local), a.value.to_string()))
			.collect();
		let node_id = self
			.tree
			.borrow_mut()
			.add_node_with_context(Leaf::Element(Element { name, attrs }));
		if is_body && self.body.get().is_none() {
			self.body.set(Some(node_id));
		}
		node_id
	}

	fn create_comment(&self, text: StrTendril) -> Self::Handle {
		log::trace!("create_comment('{text}')");
		self.tree.borrow_mut().add_node()
	}

	fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
		log::trace!("create_pi({target}, {data})");
		self.tree.borrow_mut().add_node()
	}

	fn append_doctype_to_document(
		&self,
		name: StrTendril,
		public_id: StrTendril,
		system_id: StrTendril,
	) {
		log::trace!("append_doctype_to_document({name}, {public_id}, {system_id})");
	}

	fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
		let parent = *parent;
		let mut tree = self.tree.borrow_mut();
		match child {
			NodeOrText::AppendNode(node_id) => {
				log::trace!("append({parent:?}, {node_id:?})");
				tree.add_child(parent, node_id);
			}
			NodeOrText::AppendText(t) => {
				log::trace!("append({parent:?}, '{t}')");
				let last_child = tree.children(parent).last().cloned();
				if let Some(Leaf::Text(Text { t: text })) =
					last_child.and_then(|id| tree.get_context_mut(id))
				{
					text.push_tendril(&t);
				} else {
					let node = tree.add_node_with_context(Leaf::Text(Text { t }));
					tree.add_child(parent, node);
				}
			}
		}
	}

	fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
		let mut tree = self.tree.borrow_mut();
		match new_node {
			NodeOrText::AppendNode(node) => {
				log::trace!("append_before_sibling({sibling:?}, {node:?})");
				tree.add_child_before_sibling(*sibling, node)
			}
			NodeOrText::AppendText(t) => {
				log::trace!("append_before_sibling({sibling:?}, '{t}')");
				let older_sibling = tree
					.parent(*sibling)
					.map(|parent| tree.children(parent))
					.and_then(|children| children.iter().take_while(|c| *c != sibling).last())
					.cloned();
				if let Some(Leaf::Text(Text { t: tendril })) =
					older_sibling.and_then(|id| tree.get_context_mut(id))
				{
					tendril.push_tendril(&t);
				} else {
					let node = tree.add_node_with_context(Leaf::Text(Text { t }));
					tree.add_child_before_sibling(*sibling, node);
				}
			}
		};
	}

	fn append_based_on_parent_node(
		&self,
		element: &Self::Handle,
		prev_element: &Self::Handle,
		child: NodeOrText<Self::Handle>,
	) {
		log::trace!("append_based_on_parent_node({element:?}, {prev_element:?}, child)");
		if self.tree.borrow().parent(*element).is_some() {
			self.append_before_sibling(element, child)
		} else {
			self.append(prev_element, child)
		}
	}

	fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
		match self.tree.borrow().children(*target).first() {
			Some(child) => *child,
			None => {
				log::trace!("get_template_contents({target:?}): No children");
				self.error
			}
		}
	}

	fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
		x == y
	}

	fn set_quirks_mode(&self, _mode: html5ever::interface::QuirksMode) {}

	fn add_attrs_if_missing(&self, target: &Self::Handle, add_attrs: Vec<Attribute>) {
		log::trace!("add_attrs_if_missing({target:?}, {add_attrs:?})");
		let mut tree = self.tree.borrow_mut();
		let Some(Leaf::Element(Element { attrs, .. })) = tree.get_context_mut(*target) else {
			log::warn!("add_attrs_if_missing on non-element {target:?}");
			return;
		};
		for attr in add_attrs {
			attrs
				.entry((attr.name.ns, attr.name.local))
				.or_insert_with(|| attr.value.to_string());
		}
	}

	fn remove_from_parent(&self, target: &Self::Handle) {
		log::trace!("remove_from_parent({target:?})");
		let mut tree = self.tree.borrow_mut();
		tree.remove_parent(*target);
	}

	fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
		log::trace!("reparent_children({node:?}, {new_parent:?})");
		let mut tree = self.tree.borrow_mut();
		let children = tree.children(*node).to_vec();
		for child in children {
			tree.add_child(*new_parent, child);
		}
	}
}
