//! HTML parser – converts a rendered resume view into a simple DOM tree.
//!
//! We support a controlled subset of elements:
//! - Structural: div, p, h1-h3, ul, ol, li, img
//! - Inline: span
//! - Styling via `class` and `style` attributes
//!
//! Inline styles are kept as an ordered declaration list on the element, not
//! as an opaque attribute string: the colour normaliser rewrites individual
//! declarations in place on a cloned tree before capture.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    Ul,
    Ol,
    Li,
    Span,
    Img,
    Body,
    Html,
    Head,
    /// Catch-all for unknown tags – they are kept but treated as divs.
    Unknown(String),
}

impl Tag {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "span" => Tag::Span,
            "img" => Tag::Img,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            _ => Tag::Unknown(s.to_string()),
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Tag::Div
                | Tag::P
                | Tag::H1
                | Tag::H2
                | Tag::H3
                | Tag::Ul
                | Tag::Ol
                | Tag::Li
                | Tag::Body
                | Tag::Html
                | Tag::Unknown(_)
        )
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Tag::Span)
    }
}

/// One inline-style declaration, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDeclaration {
    pub property: String,
    pub value: String,
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, inline styles, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub style: Vec<StyleDeclaration>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            style: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").map(|s| s.as_str())
    }

    /// First declaration value for `property`, if present.
    pub fn style_value(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|d| d.property.eq_ignore_ascii_case(property))
            .map(|d| d.value.as_str())
    }

    /// Overwrite a declaration in place, or append it when absent.
    pub fn set_style_value(&mut self, property: &str, value: &str) {
        for decl in &mut self.style {
            if decl.property.eq_ignore_ascii_case(property) {
                decl.value = value.to_string();
                return;
            }
        }
        self.style.push(StyleDeclaration {
            property: property.to_string(),
            value: value.to_string(),
        });
    }

    /// Whether this element (not its ancestors) is marked to be left out of
    /// captured output: class `no-export` or attribute `data-no-export`.
    pub fn is_export_excluded(&self) -> bool {
        self.classes().contains(&"no-export") || self.attributes.contains_key("data-no-export")
    }

    /// Child element nodes in order, text nodes skipped.
    pub fn child_elements(&self) -> Vec<&ElementNode> {
        self.children
            .iter()
            .filter_map(|c| match c {
                DomNode::Element(e) => Some(e),
                DomNode::Text(_) => None,
            })
            .collect()
    }

    pub fn child_elements_mut(&mut self) -> Vec<&mut ElementNode> {
        self.children
            .iter_mut()
            .filter_map(|c| match c {
                DomNode::Element(e) => Some(e),
                DomNode::Text(_) => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
///
/// We use a hand-written parser that handles the controlled subset. The
/// resume views we capture are produced by a template, so a full HTML5
/// parser would buy nothing here.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_preserve();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Skip doctype / processing instructions
            while !self.eof() && !self.starts_with(">") {
                self.advance(1);
            }
            if !self.eof() {
                self.advance(1); // skip '>'
            }
            return None;
        }
        if self.starts_with("<") {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        let text = &self.input[start..self.pos];
        DomNode::Text(decode_entities(text))
    }

    fn parse_element(&mut self) -> DomNode {
        // Consume '<'
        self.advance(1);
        let tag_name = self.parse_tag_name();
        let tag = Tag::from_str(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        // Parse attributes
        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.eq_ignore_ascii_case("style") {
                elem.style = parse_style_declarations(&value);
            }
            elem.attributes.insert(key, value);
        }

        // Self-closing tags
        let self_closing = tag == Tag::Img;
        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if self_closing {
            return DomNode::Element(elem);
        }

        // Parse children
        elem.children = self.parse_nodes();

        // Consume closing tag
        if self.starts_with("</") {
            self.advance(2);
            self.parse_tag_name(); // skip tag name
            self.skip_whitespace();
            if self.starts_with(">") {
                self.advance(1);
            }
        }

        DomNode::Element(elem)
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_tag_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1); // skip '='
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        if self.starts_with("\"") {
            self.advance(1);
            let start = self.pos;
            while !self.eof() && !self.starts_with("\"") {
                self.advance(1);
            }
            let val = self.input[start..self.pos].to_string();
            if !self.eof() {
                self.advance(1);
            }
            decode_entities(&val)
        } else if self.starts_with("'") {
            self.advance(1);
            let start = self.pos;
            while !self.eof() && !self.starts_with("'") {
                self.advance(1);
            }
            let val = self.input[start..self.pos].to_string();
            if !self.eof() {
                self.advance(1);
            }
            decode_entities(&val)
        } else {
            let start = self.pos;
            while !self.eof() {
                let c = self.current_char();
                if c.is_whitespace() || c == '>' || c == '/' {
                    break;
                }
                self.advance(1);
            }
            self.input[start..self.pos].to_string()
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    fn skip_whitespace_preserve(&mut self) {
        // Skip runs of pure whitespace between elements.
        let saved = self.pos;
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
        // If we reached a tag or EOF, keep the skip. Otherwise revert.
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_comment(&mut self) {
        self.advance(4); // skip <!--
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap()
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

/// Split a `style` attribute into ordered declarations. Values may contain
/// parenthesised functions with embedded semicolons-free commas, so only a
/// top-level `;` separates declarations.
pub fn parse_style_declarations(style: &str) -> Vec<StyleDeclaration> {
    let mut decls = Vec::new();
    for part in style.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some(colon) = part.find(':') {
            let property = part[..colon].trim();
            let value = part[colon + 1..].trim();
            if !property.is_empty() && !value.is_empty() {
                decls.push(StyleDeclaration {
                    property: property.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }
    decls
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            // Recurse into <html>
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes.to_vec()
}

/// First element node in a parse result, if any.
pub fn first_element(nodes: &[DomNode]) -> Option<&ElementNode> {
    nodes.iter().find_map(|n| match n {
        DomNode::Element(e) => Some(e),
        DomNode::Text(_) => None,
    })
}
