//! # Schema
//!
//! A compiled, immutable table of node and mark types.
//!
//! ## Rules
//!
//! - Node and mark names share one namespace; a name may appear once.
//! - A top node named `doc` and a node named `text` must exist.
//! - Content expressions are parsed at compile time and every name they
//!   reference must be a node type or a group.
//! - Type order is significant: when content must be created from nothing
//!   (an empty document), the first matching type in schema order wins.

use crate::content::ContentExpr;
use crate::error::{SchemaError, SchemaResult};
use crate::node::{Attrs, Mark, Node, TEXT_NODE, TOP_NODE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Nesting limit when creating default content
const MAX_FILL_DEPTH: usize = 16;

/// Attribute definition; an attribute without a default is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl AttributeSpec {
    pub fn required() -> Self {
        Self { default: None }
    }

    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Declarative node type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub name: String,

    /// Content expression; `None` (or empty) makes the node a leaf
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Space-separated group names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default)]
    pub inline: bool,

    #[serde(default)]
    pub atom: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttributeSpec>,

    /// Allowed marks: `"_"` for all, `""` for none, or space-separated names.
    /// Defaults to all marks for nodes with inline content, none otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<String>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: None,
            group: None,
            inline: false,
            atom: false,
            attrs: BTreeMap::new(),
            marks: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn with_marks(mut self, marks: impl Into<String>) -> Self {
        self.marks = Some(marks.into());
        self
    }
}

/// Declarative mark type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttributeSpec>,

    /// Whether text typed at the mark's end inherits it
    #[serde(default = "default_inclusive")]
    pub inclusive: bool,
}

fn default_inclusive() -> bool {
    true
}

impl MarkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
            inclusive: true,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.inclusive = false;
        self
    }
}

/// Compiled node type
#[derive(Debug, Clone)]
pub struct NodeType {
    pub spec: NodeSpec,
    content: Option<ContentExpr>,
    groups: Vec<String>,
    inline_content: bool,
    rank: usize,
}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn is_text(&self) -> bool {
        self.spec.name == TEXT_NODE
    }

    /// Non-text node that accepts no content
    pub fn is_leaf(&self) -> bool {
        !self.is_text() && self.content.is_none()
    }

    pub fn is_inline(&self) -> bool {
        self.spec.inline
    }

    /// Block node whose content is inline
    pub fn is_textblock(&self) -> bool {
        !self.spec.inline && self.inline_content
    }

    pub fn content_expr(&self) -> Option<&ContentExpr> {
        self.content.as_ref()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn allows_mark(&self, mark: &str) -> bool {
        match self.spec.marks.as_deref() {
            None => self.inline_content,
            Some("_") => true,
            Some(list) => list.split_whitespace().any(|m| m == mark),
        }
    }

    fn has_required_attrs(&self) -> bool {
        self.spec.attrs.values().any(AttributeSpec::is_required)
    }
}

/// Compiled mark type
#[derive(Debug, Clone)]
pub struct MarkType {
    pub spec: MarkSpec,
    rank: usize,
}

impl MarkType {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

/// Immutable, compiled schema
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<NodeType>,
    marks: Vec<MarkType>,
    node_index: HashMap<String, usize>,
    mark_index: HashMap<String, usize>,
}

impl Schema {
    /// Compile node and mark specs into a schema
    pub fn compile(nodes: Vec<NodeSpec>, marks: Vec<MarkSpec>) -> SchemaResult<Self> {
        let mut node_index = HashMap::new();
        let mut mark_index = HashMap::new();

        for (rank, spec) in nodes.iter().enumerate() {
            if node_index.insert(spec.name.clone(), rank).is_some() {
                return Err(SchemaError::DuplicateType(spec.name.clone()));
            }
        }
        for (rank, spec) in marks.iter().enumerate() {
            if node_index.contains_key(&spec.name) || mark_index.insert(spec.name.clone(), rank).is_some() {
                return Err(SchemaError::DuplicateType(spec.name.clone()));
            }
        }

        if !node_index.contains_key(TOP_NODE) {
            return Err(SchemaError::MissingTopNode(TOP_NODE.to_string()));
        }
        if !node_index.contains_key(TEXT_NODE) {
            return Err(SchemaError::MissingTextNode);
        }

        let mut compiled = Vec::with_capacity(nodes.len());
        for (rank, mut spec) in nodes.into_iter().enumerate() {
            if spec.name == TEXT_NODE {
                spec.inline = true;
            }

            let content = match spec.content.as_deref().map(str::trim) {
                Some(source) if !source.is_empty() && spec.name != TEXT_NODE => Some(
                    ContentExpr::parse(source).map_err(|source| SchemaError::InvalidContentExpr {
                        node: spec.name.clone(),
                        source,
                    })?,
                ),
                _ => None,
            };

            let groups = spec
                .group
                .as_deref()
                .map(|g| g.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();

            compiled.push(NodeType {
                spec,
                content,
                groups,
                inline_content: false,
                rank,
            });
        }

        // Resolve references and work out which nodes hold inline content
        let mut inline_flags = Vec::with_capacity(compiled.len());
        for node in &compiled {
            let mut inline_content = false;
            if let Some(expr) = &node.content {
                for name in expr.names() {
                    let targets: Vec<&NodeType> = compiled
                        .iter()
                        .filter(|t| t.spec.name == name || t.groups.iter().any(|g| g == name))
                        .collect();
                    if targets.is_empty() {
                        return Err(SchemaError::UnknownContentReference {
                            node: node.spec.name.clone(),
                            name: name.to_string(),
                        });
                    }
                    if targets.iter().any(|t| t.spec.inline) {
                        inline_content = true;
                    }
                }
            }
            inline_flags.push(inline_content);
        }
        for (node, inline_content) in compiled.iter_mut().zip(inline_flags) {
            node.inline_content = inline_content;
        }

        let marks = marks
            .into_iter()
            .enumerate()
            .map(|(rank, spec)| MarkType { spec, rank })
            .collect();

        Ok(Self {
            nodes: compiled,
            marks,
            node_index,
            mark_index,
        })
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.node_index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn mark_type(&self, name: &str) -> Option<&MarkType> {
        self.mark_index.get(name).map(|&i| &self.marks[i])
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.node_index.contains_key(name) || self.mark_index.contains_key(name)
    }

    /// Node types in schema order
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.iter()
    }

    /// Mark types in schema order
    pub fn mark_types(&self) -> impl Iterator<Item = &MarkType> {
        self.marks.iter()
    }

    pub fn top_node_type(&self) -> &NodeType {
        // Presence is checked in `compile`
        &self.nodes[self.node_index[TOP_NODE]]
    }

    /// First textblock type in schema order, used for plain paragraphs
    pub fn default_textblock(&self) -> Option<&NodeType> {
        self.nodes
            .iter()
            .find(|t| t.is_textblock() && t.spec.name != TOP_NODE && !t.has_required_attrs())
    }

    /// Whether a content-expression name accepts a concrete type
    pub fn matches_pattern(&self, pattern: &str, type_name: &str) -> bool {
        pattern == type_name
            || self
                .node_type(type_name)
                .map(|t| t.groups.iter().any(|g| g == pattern))
                .unwrap_or(false)
    }

    pub fn is_leaf(&self, node: &Node) -> bool {
        self.node_type(&node.kind).map(NodeType::is_leaf).unwrap_or(false)
    }

    pub fn is_textblock(&self, node: &Node) -> bool {
        self.node_type(&node.kind).map(NodeType::is_textblock).unwrap_or(false)
    }

    /// Size of a node in the position model
    pub fn node_size(&self, node: &Node) -> usize {
        if node.is_text() {
            node.text_len()
        } else if self.is_leaf(node) {
            1
        } else {
            self.content_size(node) + 2
        }
    }

    /// Size of a node's content
    pub fn content_size(&self, node: &Node) -> usize {
        node.content.iter().map(|child| self.node_size(child)).sum()
    }

    /// Fill in default attributes and reject unknown or missing ones
    pub fn compute_attrs(
        &self,
        owner: &str,
        specs: &BTreeMap<String, AttributeSpec>,
        given: &Attrs,
    ) -> SchemaResult<Attrs> {
        if let Some(unknown) = given.keys().find(|k| !specs.contains_key(*k)) {
            return Err(SchemaError::UnknownAttribute {
                node: owner.to_string(),
                attr: unknown.clone(),
            });
        }

        let mut attrs = Attrs::new();
        for (name, spec) in specs {
            match given.get(name).or(spec.default.as_ref()) {
                Some(value) => {
                    attrs.insert(name.clone(), value.clone());
                }
                None => {
                    return Err(SchemaError::MissingAttribute {
                        node: owner.to_string(),
                        attr: name.clone(),
                    })
                }
            }
        }
        Ok(attrs)
    }

    /// Build a checked node with default attributes filled in
    pub fn node(&self, name: &str, attrs: Attrs, content: Vec<Node>) -> SchemaResult<Node> {
        let ty = self
            .node_type(name)
            .ok_or_else(|| SchemaError::UnknownNodeType(name.to_string()))?;
        let attrs = self.compute_attrs(name, &ty.spec.attrs, &attrs)?;
        let node = Node::element(name, content).with_attrs(attrs);
        self.check(&node)?;
        Ok(node)
    }

    /// Build a mark with default attributes filled in
    pub fn mark(&self, name: &str, attrs: Attrs) -> SchemaResult<Mark> {
        let ty = self
            .mark_type(name)
            .ok_or_else(|| SchemaError::UnknownMarkType(name.to_string()))?;
        let attrs = self.compute_attrs(name, &ty.spec.attrs, &attrs)?;
        Ok(Mark {
            kind: name.to_string(),
            attrs,
        })
    }

    /// Order marks by schema rank
    pub fn sort_marks(&self, marks: &mut [Mark]) {
        marks.sort_by_key(|m| self.mark_type(&m.kind).map(MarkType::rank).unwrap_or(usize::MAX));
    }

    /// Validate a whole tree against the schema
    pub fn check(&self, node: &Node) -> SchemaResult<()> {
        self.check_node(node, None)
    }

    fn check_node(&self, node: &Node, parent: Option<&NodeType>) -> SchemaResult<()> {
        let ty = self
            .node_type(&node.kind)
            .ok_or_else(|| SchemaError::UnknownNodeType(node.kind.clone()))?;

        for (name, spec) in &ty.spec.attrs {
            if spec.is_required() && !node.attrs.contains_key(name) {
                return Err(SchemaError::MissingAttribute {
                    node: node.kind.clone(),
                    attr: name.clone(),
                });
            }
        }
        if let Some(unknown) = node.attrs.keys().find(|k| !ty.spec.attrs.contains_key(*k)) {
            return Err(SchemaError::UnknownAttribute {
                node: node.kind.clone(),
                attr: unknown.clone(),
            });
        }

        if ty.is_text() {
            if node.text.as_deref().map(str::is_empty).unwrap_or(true) {
                return Err(SchemaError::EmptyTextNode);
            }
            if !node.content.is_empty() {
                return Err(SchemaError::LeafHasContent(node.kind.clone()));
            }
        } else if node.text.is_some() {
            return Err(SchemaError::UnexpectedText(node.kind.clone()));
        }

        let mut seen_marks: Vec<&str> = Vec::with_capacity(node.marks.len());
        for mark in &node.marks {
            if self.mark_type(&mark.kind).is_none() {
                return Err(SchemaError::UnknownMarkType(mark.kind.clone()));
            }
            let allowed = parent.map(|p| p.allows_mark(&mark.kind)).unwrap_or(false);
            if !allowed {
                return Err(SchemaError::MarkNotAllowed {
                    mark: mark.kind.clone(),
                    parent: parent.map(|p| p.spec.name.clone()).unwrap_or_default(),
                });
            }
            if seen_marks.contains(&mark.kind.as_str()) {
                return Err(SchemaError::DuplicateMark(mark.kind.clone()));
            }
            seen_marks.push(&mark.kind);
        }

        match &ty.content {
            None => {
                if !node.content.is_empty() {
                    return Err(SchemaError::LeafHasContent(node.kind.clone()));
                }
            }
            Some(expr) => {
                let names: Vec<&str> = node.content.iter().map(|c| c.kind.as_str()).collect();
                if !expr.matches(&names, &|pattern, type_name| self.matches_pattern(pattern, type_name)) {
                    return Err(SchemaError::InvalidContent {
                        node: node.kind.clone(),
                        found: names.join(" "),
                    });
                }
            }
        }

        for child in &node.content {
            self.check_node(child, Some(ty))?;
        }
        Ok(())
    }

    /// A node of the given type with its minimal required content
    pub fn create_and_fill(&self, name: &str) -> SchemaResult<Node> {
        self.fill_node(name, 0)
            .ok_or_else(|| SchemaError::CannotFill(name.to_string()))
    }

    /// The top node holding its minimal content (one empty textblock in a typical schema)
    pub fn empty_doc(&self) -> SchemaResult<Node> {
        self.create_and_fill(TOP_NODE)
    }

    fn fill_node(&self, name: &str, depth: usize) -> Option<Node> {
        if depth > MAX_FILL_DEPTH {
            return None;
        }
        let ty = self.node_type(name)?;
        if ty.is_text() {
            return None;
        }
        let attrs = self.compute_attrs(name, &ty.spec.attrs, &Attrs::new()).ok()?;

        let content = match &ty.content {
            None => Vec::new(),
            Some(expr) => {
                let pick = |pattern: &str| {
                    self.nodes
                        .iter()
                        .filter(|t| self.matches_pattern(pattern, &t.spec.name))
                        .find(|t| self.fill_node(&t.spec.name, depth + 1).is_some())
                        .map(|t| t.spec.name.clone())
                };
                let names = expr.fill(&pick)?;
                names
                    .iter()
                    .map(|n| self.fill_node(n, depth + 1))
                    .collect::<Option<Vec<_>>>()?
            }
        };

        Some(Node::element(name, content).with_attrs(attrs))
    }
}
