//! SVG markup model.
//!
//! Documents are parsed with `quick-xml` into a small node tree that
//! round-trips back to markup. The model is deliberately dumb: attributes
//! and children, no SVG semantics beyond what classification needs
//! (class list, fill attribute, style-attribute fill, view box).
//!
//! Shapes are addressed by their pre-order index over the root's
//! descendant elements, which stays stable as long as no shape is
//! inserted or deleted before them.

pub mod view_box;

pub use view_box::ViewBox;

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

/// Markup parsing errors.
#[derive(Debug, Error)]
pub enum SvgError {
    #[error("malformed markup: {0}")]
    Parse(String),

    #[error("document has no root element")]
    NoRoot,
}

// ============================================================================
// Node tree
// ============================================================================

/// One node of the markup tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Raw text content, kept escaped exactly as read.
    Text(String),
    Comment(String),
    CData(String),
    /// XML declaration / processing instruction, inner content only.
    Decl(String),
    DocType(String),
}

/// An element: tag name, ordered attributes, children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
    self_closing: bool,
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            self_closing: true,
            ..Self::default()
        }
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.attrs.iter_mut().find(|(key, _)| key == name) {
            entry.1 = value;
        } else {
            self.attrs.push((name.to_string(), value));
        }
    }

    /// Remove an attribute. Returns true if it was present.
    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(key, _)| key != name);
        self.attrs.len() != before
    }

    // ------------------------------------------------------------------------
    // class list
    // ------------------------------------------------------------------------

    /// Classes in the `class` attribute.
    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    /// Add a class (no-op if already present).
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => {
                let merged = format!("{} {}", existing.trim(), class);
                self.set_attr("class", merged);
            }
            _ => self.set_attr("class", class),
        }
    }

    /// Remove classes matching a predicate; drops the attribute when empty.
    pub fn retain_classes(&mut self, keep: impl Fn(&str) -> bool) {
        let Some(existing) = self.attr("class") else {
            return;
        };
        let kept: Vec<&str> = existing.split_whitespace().filter(|c| keep(c)).collect();
        if kept.is_empty() {
            self.remove_attr("class");
        } else {
            self.set_attr("class", kept.join(" "));
        }
    }

    // ------------------------------------------------------------------------
    // style-attribute fill
    // ------------------------------------------------------------------------

    /// The `fill` declaration inside the `style` attribute, if any.
    pub fn style_fill(&self) -> Option<String> {
        let style = self.attr("style")?;
        for decl in style.split(';') {
            let Some((prop, value)) = decl.split_once(':') else {
                continue;
            };
            if prop.trim().eq_ignore_ascii_case("fill") {
                return Some(value.trim().to_string());
            }
        }
        None
    }

    /// Remove the `fill` declaration from the `style` attribute; drops the
    /// attribute when no declarations remain.
    pub fn clear_style_fill(&mut self) {
        let Some(style) = self.attr("style") else {
            return;
        };
        let kept: Vec<String> = style
            .split(';')
            .map(str::trim)
            .filter(|decl| {
                !decl.is_empty()
                    && !decl
                        .split_once(':')
                        .is_some_and(|(prop, _)| prop.trim().eq_ignore_ascii_case("fill"))
            })
            .map(str::to_string)
            .collect();
        if kept.is_empty() {
            self.remove_attr("style");
        } else {
            self.set_attr("style", kept.join("; "));
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// A parsed SVG document: prolog nodes (declaration, comments) + root.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDoc {
    prolog: Vec<Node>,
    pub root: Element,
}

impl SvgDoc {
    /// Parse a document from markup.
    pub fn parse(input: &str) -> Result<Self, SvgError> {
        let mut reader = Reader::from_str(input);
        let mut prolog = Vec::new();
        let mut root: Option<Element> = None;
        // Open elements; the last entry is the current parent.
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| SvgError::Parse(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    let element = element_from_start(&start, false)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start, true)?;
                    push_node(&mut stack, &mut prolog, &mut root, Node::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        SvgError::Parse("closing tag without opener".to_string())
                    })?;
                    push_node(&mut stack, &mut prolog, &mut root, Node::Element(element))?;
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(text.as_ref()).into_owned();
                    push_node(&mut stack, &mut prolog, &mut root, Node::Text(raw))?;
                }
                Event::CData(data) => {
                    let raw = String::from_utf8_lossy(data.as_ref()).into_owned();
                    push_node(&mut stack, &mut prolog, &mut root, Node::CData(raw))?;
                }
                Event::Comment(comment) => {
                    let raw = String::from_utf8_lossy(comment.as_ref()).into_owned();
                    push_node(&mut stack, &mut prolog, &mut root, Node::Comment(raw))?;
                }
                Event::Decl(decl) => {
                    let raw = String::from_utf8_lossy(decl.as_ref()).into_owned();
                    push_node(&mut stack, &mut prolog, &mut root, Node::Decl(raw))?;
                }
                Event::PI(pi) => {
                    let raw = String::from_utf8_lossy(pi.as_ref()).into_owned();
                    push_node(&mut stack, &mut prolog, &mut root, Node::Decl(raw))?;
                }
                Event::DocType(doctype) => {
                    let raw = String::from_utf8_lossy(doctype.as_ref()).into_owned();
                    push_node(&mut stack, &mut prolog, &mut root, Node::DocType(raw))?;
                }
                Event::GeneralRef(entity) => {
                    // Entity and character references are kept textual.
                    let name = String::from_utf8_lossy(entity.as_ref()).into_owned();
                    push_node(&mut stack, &mut prolog, &mut root, Node::Text(format!("&{name};")))?;
                }
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(SvgError::Parse("unclosed element".to_string()));
        }
        let root = root.ok_or(SvgError::NoRoot)?;
        Ok(Self { prolog, root })
    }

    /// Serialize the document back to markup.
    pub fn to_markup(&self) -> String {
        let mut out = String::with_capacity(1024);
        for node in &self.prolog {
            write_node(&mut out, node);
        }
        write_element(&mut out, &self.root);
        out
    }

    // ------------------------------------------------------------------------
    // shape addressing (pre-order over descendants of the root)
    // ------------------------------------------------------------------------

    /// Visit every descendant element of the root in document order.
    pub fn visit_elements_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        for node in &mut self.root.children {
            visit_node_mut(node, f);
        }
    }

    /// Number of descendant elements.
    pub fn element_count(&self) -> usize {
        fn count_nodes(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|node| match node {
                    Node::Element(element) => 1 + count_nodes(&element.children),
                    _ => 0,
                })
                .sum()
        }
        count_nodes(&self.root.children)
    }

    /// Get the descendant element at the given pre-order index.
    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        let mut remaining = index;
        find_element_mut(&mut self.root.children, &mut remaining)
    }

    /// Remove the descendant element at the given pre-order index (with its
    /// subtree). Returns true if something was removed.
    pub fn remove_element(&mut self, index: usize) -> bool {
        let mut remaining = index;
        remove_element_inner(&mut self.root.children, &mut remaining)
    }

    // ------------------------------------------------------------------------
    // view box
    // ------------------------------------------------------------------------

    /// Declared view box, or one derived from width/height (default 100×100).
    pub fn view_box(&self) -> ViewBox {
        if let Some(vb) = self.root.attr("viewBox").and_then(ViewBox::parse) {
            return vb;
        }
        let width = parse_length(self.root.attr("width")).unwrap_or(100.0);
        let height = parse_length(self.root.attr("height")).unwrap_or(100.0);
        ViewBox::new(0.0, 0.0, width, height)
    }

    /// Whether the root carries an explicit viewBox attribute.
    pub fn has_view_box(&self) -> bool {
        self.root.attr("viewBox").is_some()
    }

    /// Write back a view box, keeping width/height in step.
    pub fn apply_view_box(&mut self, vb: &ViewBox) {
        self.root.set_attr("viewBox", vb.to_attr());
        self.root.set_attr("width", format_number(vb.width));
        self.root.set_attr("height", format_number(vb.height));
    }
}

/// Parse a length attribute, tolerating a `px` suffix.
fn parse_length(value: Option<&str>) -> Option<f64> {
    let value = value?.trim().trim_end_matches("px");
    value.parse().ok()
}

/// Format a number the way the markup should carry it (no trailing `.0`).
pub fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value}")
    }
}

// ============================================================================
// parse helpers
// ============================================================================

fn element_from_start(
    start: &quick_xml::events::BytesStart<'_>,
    self_closing: bool,
) -> Result<Element, SvgError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SvgError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| SvgError::Parse(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
        self_closing,
    })
}

/// Attach a completed node to the open parent, the root slot, or the prolog.
fn push_node(
    stack: &mut [Element],
    prolog: &mut Vec<Node>,
    root: &mut Option<Element>,
    node: Node,
) -> Result<(), SvgError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        Node::Element(element) => {
            if root.is_some() {
                return Err(SvgError::Parse("multiple root elements".to_string()));
            }
            *root = Some(element);
        }
        // Whitespace between prolog and root is dropped; the rest is kept.
        Node::Text(text) if text.trim().is_empty() => {}
        other => {
            if root.is_none() {
                prolog.push(other);
            }
        }
    }
    Ok(())
}

fn visit_node_mut(node: &mut Node, f: &mut impl FnMut(&mut Element)) {
    if let Node::Element(element) = node {
        f(element);
        for child in &mut element.children {
            visit_node_mut(child, f);
        }
    }
}

fn find_element_mut<'a>(nodes: &'a mut [Node], remaining: &mut usize) -> Option<&'a mut Element> {
    for node in nodes {
        if let Node::Element(element) = node {
            if *remaining == 0 {
                return Some(element);
            }
            *remaining -= 1;
            if let Some(found) = find_element_mut(&mut element.children, remaining) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_element_inner(nodes: &mut Vec<Node>, remaining: &mut usize) -> bool {
    let mut i = 0;
    while i < nodes.len() {
        if let Node::Element(element) = &mut nodes[i] {
            if *remaining == 0 {
                nodes.remove(i);
                return true;
            }
            *remaining -= 1;
            if remove_element_inner(&mut element.children, remaining) {
                return true;
            }
        }
        i += 1;
    }
    false
}

// ============================================================================
// serialization
// ============================================================================

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Element(element) => write_element(out, element),
        Node::Text(text) => out.push_str(text),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::CData(data) => {
            out.push_str("<![CDATA[");
            out.push_str(data);
            out.push_str("]]>");
        }
        Node::Decl(decl) => {
            out.push_str("<?");
            out.push_str(decl);
            out.push_str("?>");
        }
        Node::DocType(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype.trim_start());
            out.push('>');
        }
    }
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attr_into(out, value);
        out.push('"');
    }

    if element.children.is_empty() && element.self_closing {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

/// Escape an attribute value.
fn escape_attr_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
