//! XML Schema subset: model and parser
//!
//! Covers the structural part of XSD that release notification schemas rely
//! on: global and local element declarations, named and anonymous complex
//! types with `sequence`/`choice`/`all`/`any` content, occurrence bounds,
//! `complexContent` and `simpleContent` derivation, attributes and attribute
//! groups, and simple types restricted by `enumeration`, `pattern` and length
//! facets. Imported namespaces are not fetched; anything declared there is
//! accepted as-is.

mod builtins;
mod validate;

use crate::error::SchemaError;
use regex::Regex;
use roxmltree::Node;
use std::collections::HashMap;
use tracing::debug;

pub(crate) const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct QName {
    pub ns: Option<String>,
    pub local: String,
}

#[derive(Debug, Clone)]
pub(crate) enum TypeRef {
    Named(QName),
    Complex(Box<ComplexType>),
    Simple(Box<SimpleType>),
    AnyType,
}

#[derive(Debug, Clone)]
pub(crate) struct ElementDecl {
    pub name: String,
    pub ns: Option<String>,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub(crate) struct Particle {
    pub min: u32,
    /// `None` is unbounded
    pub max: Option<u32>,
    pub term: Term,
}

#[derive(Debug, Clone)]
pub(crate) enum Term {
    Element(ElementDecl),
    ElementRef(QName),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
    All(Vec<Particle>),
    Group(QName),
    Any,
}

#[derive(Debug, Clone)]
pub(crate) struct AttributeDecl {
    pub name: String,
    pub required: bool,
    pub prohibited: bool,
    pub fixed: Option<String>,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Derivation {
    Extension,
    Restriction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentKind {
    Complex,
    Simple,
}

#[derive(Debug, Clone)]
pub(crate) struct BaseType {
    pub name: QName,
    pub derivation: Derivation,
    pub content: ContentKind,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ComplexType {
    pub mixed: bool,
    pub base: Option<BaseType>,
    pub particle: Option<Particle>,
    /// Facets of a `simpleContent` restriction
    pub facets: Option<SimpleType>,
    pub attributes: Vec<AttributeDecl>,
    pub attribute_groups: Vec<QName>,
    pub any_attribute: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SimpleType {
    pub base: Option<TypeRef>,
    pub enumerations: Vec<String>,
    pub patterns: Vec<Regex>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// `list` and `union` types are not checked
    pub lenient: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeGroup {
    pub attributes: Vec<AttributeDecl>,
    pub groups: Vec<QName>,
    pub any_attribute: bool,
}

/// A parsed schema, ready to validate documents
#[derive(Debug, Default)]
pub struct Schema {
    target_namespace: Option<String>,
    elements: HashMap<String, ElementDecl>,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashMap<String, SimpleType>,
    groups: HashMap<String, Particle>,
    attribute_groups: HashMap<String, AttributeGroup>,
}

impl Schema {
    /// Parse schema text
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let doc = roxmltree::Document::parse(text)?;
        let root = doc.root_element();
        if root.tag_name().namespace() != Some(XS_NAMESPACE) || root.tag_name().name() != "schema"
        {
            return Err(SchemaError::NotASchema(format!(
                "root element is '{}'",
                root.tag_name().name()
            )));
        }

        let target_namespace = root.attribute("targetNamespace").map(str::to_string);
        let parser = Parser {
            target_namespace: target_namespace.clone(),
            qualified: root.attribute("elementFormDefault") == Some("qualified"),
        };

        let mut schema = Self {
            target_namespace,
            ..Self::default()
        };

        for child in xs_children(root) {
            let Some(name) = child.attribute("name") else {
                continue;
            };
            match child.tag_name().name() {
                "element" => {
                    if let Term::Element(decl) = parser.element(child, true) {
                        schema.elements.insert(name.to_string(), decl);
                    }
                }
                "complexType" => {
                    schema
                        .complex_types
                        .insert(name.to_string(), parser.complex_type(child));
                }
                "simpleType" => {
                    schema
                        .simple_types
                        .insert(name.to_string(), parser.simple_type(child));
                }
                "group" => {
                    if let Some(model) = xs_children(child).find_map(|n| parser.particle(n)) {
                        schema.groups.insert(name.to_string(), model);
                    }
                }
                "attributeGroup" => {
                    let mut group = AttributeGroup::default();
                    parser.attribute_uses(
                        child,
                        &mut group.attributes,
                        &mut group.groups,
                        &mut group.any_attribute,
                    );
                    schema.attribute_groups.insert(name.to_string(), group);
                }
                _ => {}
            }
        }

        debug!(
            target_namespace = ?schema.target_namespace,
            elements = schema.elements.len(),
            complex_types = schema.complex_types.len(),
            simple_types = schema.simple_types.len(),
            "Schema parsed"
        );
        Ok(schema)
    }

    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Whether `name` belongs to this schema's own namespace
    pub(crate) fn is_local(&self, name: &QName) -> bool {
        name.ns == self.target_namespace
    }

    pub(crate) fn global_element(&self, name: &QName) -> Option<&ElementDecl> {
        self.is_local(name)
            .then(|| self.elements.get(&name.local))
            .flatten()
    }

    pub(crate) fn complex_type(&self, name: &QName) -> Option<&ComplexType> {
        self.is_local(name)
            .then(|| self.complex_types.get(&name.local))
            .flatten()
    }

    pub(crate) fn simple_type(&self, name: &QName) -> Option<&SimpleType> {
        self.is_local(name)
            .then(|| self.simple_types.get(&name.local))
            .flatten()
    }

    pub(crate) fn group(&self, name: &QName) -> Option<&Particle> {
        self.is_local(name)
            .then(|| self.groups.get(&name.local))
            .flatten()
    }

    pub(crate) fn attribute_group(&self, name: &QName) -> Option<&AttributeGroup> {
        self.is_local(name)
            .then(|| self.attribute_groups.get(&name.local))
            .flatten()
    }
}

fn xs_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| {
        n.is_element()
            && n.tag_name().namespace() == Some(XS_NAMESPACE)
            && n.tag_name().name() != "annotation"
    })
}

fn occurs(node: Node<'_, '_>) -> (u32, Option<u32>) {
    let min = node
        .attribute("minOccurs")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1);
    let max = match node.attribute("maxOccurs").map(str::trim) {
        Some("unbounded") => None,
        Some(v) => Some(v.parse().unwrap_or(1)),
        None => Some(1),
    };
    (min, max)
}

struct Parser {
    target_namespace: Option<String>,
    qualified: bool,
}

impl Parser {
    /// Resolve a `prefix:local` reference against the node's namespace scope
    fn qname(node: Node<'_, '_>, value: &str) -> QName {
        let (prefix, local) = match value.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, value),
        };
        QName {
            ns: node.lookup_namespace_uri(prefix).map(str::to_string),
            local: local.to_string(),
        }
    }

    fn particle(&self, node: Node<'_, '_>) -> Option<Particle> {
        let term = match node.tag_name().name() {
            "element" => self.element(node, false),
            "sequence" => Term::Sequence(xs_children(node).filter_map(|n| self.particle(n)).collect()),
            "choice" => Term::Choice(xs_children(node).filter_map(|n| self.particle(n)).collect()),
            "all" => Term::All(xs_children(node).filter_map(|n| self.particle(n)).collect()),
            "any" => Term::Any,
            "group" => Term::Group(Self::qname(node, node.attribute("ref")?)),
            _ => return None,
        };
        let (min, max) = occurs(node);
        Some(Particle { min, max, term })
    }

    fn element(&self, node: Node<'_, '_>, global: bool) -> Term {
        if let Some(reference) = node.attribute("ref") {
            return Term::ElementRef(Self::qname(node, reference));
        }

        let qualified = match node.attribute("form") {
            Some(form) => form == "qualified",
            None => self.qualified,
        };
        let ns = if global || qualified {
            self.target_namespace.clone()
        } else {
            None
        };

        Term::Element(ElementDecl {
            name: node.attribute("name").unwrap_or_default().to_string(),
            ns,
            type_ref: self.type_of(node),
        })
    }

    /// `type` attribute, or an anonymous type child, or `anyType`
    fn type_of(&self, node: Node<'_, '_>) -> TypeRef {
        if let Some(name) = node.attribute("type") {
            return TypeRef::Named(Self::qname(node, name));
        }
        for child in xs_children(node) {
            match child.tag_name().name() {
                "complexType" => return TypeRef::Complex(Box::new(self.complex_type(child))),
                "simpleType" => return TypeRef::Simple(Box::new(self.simple_type(child))),
                _ => {}
            }
        }
        TypeRef::AnyType
    }

    fn complex_type(&self, node: Node<'_, '_>) -> ComplexType {
        let mut ty = ComplexType {
            mixed: node.attribute("mixed") == Some("true"),
            ..ComplexType::default()
        };

        for child in xs_children(node) {
            match child.tag_name().name() {
                kind @ ("complexContent" | "simpleContent") => {
                    if child.attribute("mixed") == Some("true") {
                        ty.mixed = true;
                    }
                    let content = if kind == "simpleContent" {
                        ContentKind::Simple
                    } else {
                        ContentKind::Complex
                    };
                    if let Some(derived) = xs_children(child).next() {
                        self.derivation(derived, content, &mut ty);
                    }
                }
                _ => self.content_child(child, &mut ty),
            }
        }
        ty
    }

    fn derivation(&self, node: Node<'_, '_>, content: ContentKind, ty: &mut ComplexType) {
        let derivation = match node.tag_name().name() {
            "extension" => Derivation::Extension,
            "restriction" => Derivation::Restriction,
            _ => return,
        };
        if let Some(base) = node.attribute("base") {
            ty.base = Some(BaseType {
                name: Self::qname(node, base),
                derivation,
                content,
            });
        }

        if content == ContentKind::Simple && derivation == Derivation::Restriction {
            let facets = self.facets(node);
            if !facets.enumerations.is_empty()
                || !facets.patterns.is_empty()
                || facets.min_length.is_some()
                || facets.max_length.is_some()
            {
                ty.facets = Some(facets);
            }
        }

        for child in xs_children(node) {
            self.content_child(child, ty);
        }
    }

    fn content_child(&self, child: Node<'_, '_>, ty: &mut ComplexType) {
        match child.tag_name().name() {
            "sequence" | "choice" | "all" | "group" => ty.particle = self.particle(child),
            _ => self.attribute_use(
                child,
                &mut ty.attributes,
                &mut ty.attribute_groups,
                &mut ty.any_attribute,
            ),
        }
    }

    fn attribute_uses(
        &self,
        node: Node<'_, '_>,
        attributes: &mut Vec<AttributeDecl>,
        groups: &mut Vec<QName>,
        any_attribute: &mut bool,
    ) {
        for child in xs_children(node) {
            self.attribute_use(child, attributes, groups, any_attribute);
        }
    }

    fn attribute_use(
        &self,
        node: Node<'_, '_>,
        attributes: &mut Vec<AttributeDecl>,
        groups: &mut Vec<QName>,
        any_attribute: &mut bool,
    ) {
        match node.tag_name().name() {
            "attribute" => {
                let (name, type_ref) = match (node.attribute("name"), node.attribute("ref")) {
                    (Some(name), _) => (name.to_string(), self.type_of(node)),
                    (None, Some(reference)) => {
                        (Self::qname(node, reference).local, TypeRef::AnyType)
                    }
                    (None, None) => return,
                };
                let usage = node.attribute("use").unwrap_or("optional");
                attributes.push(AttributeDecl {
                    name,
                    required: usage == "required",
                    prohibited: usage == "prohibited",
                    fixed: node.attribute("fixed").map(str::to_string),
                    type_ref,
                });
            }
            "attributeGroup" => {
                if let Some(reference) = node.attribute("ref") {
                    groups.push(Self::qname(node, reference));
                }
            }
            "anyAttribute" => *any_attribute = true,
            _ => {}
        }
    }

    fn simple_type(&self, node: Node<'_, '_>) -> SimpleType {
        for child in xs_children(node) {
            match child.tag_name().name() {
                "restriction" => {
                    let mut ty = self.facets(child);
                    ty.base = match child.attribute("base") {
                        Some(base) => Some(TypeRef::Named(Self::qname(child, base))),
                        None => xs_children(child)
                            .find(|n| n.tag_name().name() == "simpleType")
                            .map(|n| TypeRef::Simple(Box::new(self.simple_type(n)))),
                    };
                    return ty;
                }
                "list" | "union" => {
                    return SimpleType {
                        lenient: true,
                        ..SimpleType::default()
                    }
                }
                _ => {}
            }
        }
        SimpleType::default()
    }

    fn facets(&self, restriction: Node<'_, '_>) -> SimpleType {
        let mut ty = SimpleType::default();
        for facet in xs_children(restriction) {
            let Some(value) = facet.attribute("value") else {
                continue;
            };
            match facet.tag_name().name() {
                "enumeration" => ty.enumerations.push(value.to_string()),
                "pattern" => match Regex::new(&format!("^(?:{value})$")) {
                    Ok(re) => ty.patterns.push(re),
                    Err(e) => debug!(pattern = value, error = %e, "Unsupported pattern, not checked"),
                },
                "length" => {
                    let length = value.parse().ok();
                    ty.min_length = length;
                    ty.max_length = length;
                }
                "minLength" => ty.min_length = value.parse().ok(),
                "maxLength" => ty.max_length = value.parse().ok(),
                _ => {}
            }
        }
        ty
    }
}
