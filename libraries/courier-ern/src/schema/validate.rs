//! Instance validation against a parsed schema

use super::builtins::{self, Builtin};
use super::{
    AttributeDecl, ContentKind, Derivation, ElementDecl, Particle, QName, Schema, SimpleType,
    Term, TypeRef, XS_NAMESPACE,
};
use roxmltree::Node;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

const MAX_DEPTH: usize = 64;

/// A complex type with its derivation chain flattened
#[derive(Debug, Default)]
struct Effective {
    mixed: bool,
    particle: Option<Particle>,
    /// Checks applied to the text of a simple-content type
    simple: Option<Vec<TypeRef>>,
    attributes: Vec<AttributeDecl>,
    open_attributes: bool,
    /// Content cannot be checked (base type unknown)
    lenient: bool,
}

enum Resolved {
    Any,
    Simple(TypeRef),
    Complex(Effective),
}

impl Schema {
    /// Validate a document, returning one diagnostic per violation
    ///
    /// An empty result means the document is valid.
    pub fn validate_str(&self, xml: &str) -> Vec<String> {
        let doc = match roxmltree::Document::parse(xml) {
            Ok(doc) => doc,
            Err(e) => return vec![format!("Document is not well-formed XML: {e}")],
        };

        let root = doc.root_element();
        let name = QName {
            ns: root.tag_name().namespace().map(str::to_string),
            local: root.tag_name().name().to_string(),
        };

        let Some(decl) = self.global_element(&name) else {
            return vec![format!(
                "Root element '{}' (namespace {}) is not declared by the schema",
                name.local,
                name.ns.as_deref().unwrap_or("none")
            )];
        };

        let mut diagnostics = Vec::new();
        let path = format!("/{}", name.local);
        self.validate_element(root, &decl.type_ref, &path, 0, &mut diagnostics);
        diagnostics
    }

    fn validate_element(
        &self,
        node: Node<'_, '_>,
        type_ref: &TypeRef,
        path: &str,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        if depth > MAX_DEPTH {
            return;
        }

        match self.resolve(type_ref, depth) {
            Resolved::Any => {}
            Resolved::Simple(simple) => {
                if let Some(child) = node.children().find(Node::is_element) {
                    out.push(format!(
                        "{path}: element '{}' not allowed in simple content",
                        child.tag_name().name()
                    ));
                }
                if let Err(e) = self.check_value(&simple, &text_of(node), depth) {
                    out.push(format!("{path}: {e}"));
                }
            }
            Resolved::Complex(effective) => {
                self.check_attributes(node, &effective, path, depth, out);
                if !effective.lenient {
                    self.check_content(node, &effective, path, depth, out);
                }
            }
        }
    }

    fn check_attributes(
        &self,
        node: Node<'_, '_>,
        effective: &Effective,
        path: &str,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        for decl in &effective.attributes {
            if decl.required && !decl.prohibited && node.attribute(decl.name.as_str()).is_none() {
                out.push(format!("{path}: missing required attribute '{}'", decl.name));
            }
        }

        for attr in node.attributes() {
            // xsi:* and other qualified attributes are not declared locally
            if attr.namespace().is_some() {
                continue;
            }
            let name = attr.name();
            match effective.attributes.iter().find(|d| d.name == name) {
                Some(decl) if decl.prohibited => {
                    out.push(format!("{path}: attribute '{name}' is prohibited"));
                }
                Some(decl) => {
                    if let Some(fixed) = &decl.fixed {
                        if attr.value() != fixed {
                            out.push(format!(
                                "{path}: attribute '{name}' must be '{fixed}', found '{}'",
                                attr.value()
                            ));
                        }
                    }
                    if let Err(e) = self.check_value(&decl.type_ref, attr.value(), depth) {
                        out.push(format!("{path}/@{name}: {e}"));
                    }
                }
                None if !effective.open_attributes => {
                    out.push(format!("{path}: attribute '{name}' is not allowed"));
                }
                None => {}
            }
        }
    }

    fn check_content(
        &self,
        node: Node<'_, '_>,
        effective: &Effective,
        path: &str,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        let children: Vec<Node<'_, '_>> = node.children().filter(Node::is_element).collect();

        if let Some(checks) = &effective.simple {
            if let Some(child) = children.first() {
                out.push(format!(
                    "{path}: element '{}' not allowed in simple content",
                    child.tag_name().name()
                ));
            }
            let text = text_of(node);
            for check in checks {
                if let Err(e) = self.check_value(check, &text, depth) {
                    out.push(format!("{path}: {e}"));
                }
            }
            return;
        }

        if !effective.mixed && !text_of(node).trim().is_empty() {
            out.push(format!("{path}: text content not allowed"));
        }

        let Some(particle) = &effective.particle else {
            if let Some(child) = children.first() {
                out.push(format!(
                    "{path}: no child elements allowed, found '{}'",
                    child.tag_name().name()
                ));
            }
            return;
        };

        let names: Vec<QName> = children
            .iter()
            .map(|c| QName {
                ns: c.tag_name().namespace().map(str::to_string),
                local: c.tag_name().name().to_string(),
            })
            .collect();

        let matcher = ContentMatcher {
            schema: self,
            children: &names,
            frontier: RefCell::new((0, BTreeSet::new())),
        };
        let ends = matcher.particle(particle, 0, depth);
        if !ends.contains(&names.len()) {
            out.push(matcher.diagnostic(path));
        }

        let mut decls = HashMap::new();
        self.collect_decls(particle, &mut decls, depth);

        for (index, (child, name)) in children.iter().zip(&names).enumerate() {
            // Wildcard or unknown children are not descended into
            let Some(type_ref) = decls.get(name) else {
                continue;
            };
            let child_path = format!("{path}/{}[{}]", name.local, index + 1);
            self.validate_element(*child, type_ref, &child_path, depth + 1, out);
        }
    }

    /// Element declarations reachable in a content model, keyed by name
    fn collect_decls(&self, particle: &Particle, out: &mut HashMap<QName, TypeRef>, depth: usize) {
        if depth > MAX_DEPTH {
            return;
        }
        match &particle.term {
            Term::Element(decl) => {
                out.entry(decl_name(decl))
                    .or_insert_with(|| decl.type_ref.clone());
            }
            Term::ElementRef(name) => {
                let type_ref = self
                    .global_element(name)
                    .map_or(TypeRef::AnyType, |d| d.type_ref.clone());
                out.entry(name.clone()).or_insert(type_ref);
            }
            Term::Sequence(items) | Term::Choice(items) | Term::All(items) => {
                for item in items {
                    self.collect_decls(item, out, depth + 1);
                }
            }
            Term::Group(name) => {
                if let Some(group) = self.group(name) {
                    self.collect_decls(group, out, depth + 1);
                }
            }
            Term::Any => {}
        }
    }

    fn resolve(&self, type_ref: &TypeRef, depth: usize) -> Resolved {
        if depth > MAX_DEPTH {
            return Resolved::Any;
        }
        match type_ref {
            TypeRef::AnyType => Resolved::Any,
            TypeRef::Simple(_) => Resolved::Simple(type_ref.clone()),
            TypeRef::Complex(ty) => Resolved::Complex(self.flatten(ty, depth)),
            TypeRef::Named(name) if name.ns.as_deref() == Some(XS_NAMESPACE) => {
                if name.local == "anyType" {
                    Resolved::Any
                } else {
                    Resolved::Simple(type_ref.clone())
                }
            }
            TypeRef::Named(name) => {
                if let Some(ty) = self.complex_type(name) {
                    Resolved::Complex(self.flatten(ty, depth))
                } else if self.simple_type(name).is_some() {
                    Resolved::Simple(type_ref.clone())
                } else {
                    tracing::debug!(type_name = %name.local, "Type not in schema, accepted as-is");
                    Resolved::Any
                }
            }
        }
    }

    fn flatten(&self, ty: &super::ComplexType, depth: usize) -> Effective {
        let mut own_attributes = ty.attributes.clone();
        let mut open = ty.any_attribute;
        for group in &ty.attribute_groups {
            open |= self.expand_attribute_group(group, &mut own_attributes, depth + 1);
        }

        let Some(base) = &ty.base else {
            return Effective {
                mixed: ty.mixed,
                particle: ty.particle.clone(),
                simple: None,
                attributes: own_attributes,
                open_attributes: open,
                lenient: false,
            };
        };

        let base_resolved = self.resolve(&TypeRef::Named(base.name.clone()), depth + 1);
        let facets = ty
            .facets
            .clone()
            .map(|f| TypeRef::Simple(Box::new(f)));

        match (base.content, base_resolved) {
            (ContentKind::Complex, Resolved::Complex(parent)) => {
                let particle = match base.derivation {
                    Derivation::Extension => match (parent.particle, ty.particle.clone()) {
                        (Some(a), Some(b)) => Some(Particle {
                            min: 1,
                            max: Some(1),
                            term: Term::Sequence(vec![a, b]),
                        }),
                        (a, b) => a.or(b),
                    },
                    Derivation::Restriction => ty.particle.clone(),
                };
                Effective {
                    mixed: ty.mixed || (base.derivation == Derivation::Extension && parent.mixed),
                    particle,
                    simple: None,
                    attributes: merge_attributes(parent.attributes, own_attributes),
                    open_attributes: open || parent.open_attributes,
                    lenient: parent.lenient,
                }
            }
            (ContentKind::Complex, Resolved::Any) if base.derivation == Derivation::Restriction => {
                Effective {
                    mixed: ty.mixed,
                    particle: ty.particle.clone(),
                    simple: None,
                    attributes: own_attributes,
                    open_attributes: open,
                    lenient: false,
                }
            }
            (ContentKind::Simple, Resolved::Simple(simple)) => Effective {
                simple: Some(facets.into_iter().chain(std::iter::once(simple)).collect()),
                attributes: own_attributes,
                open_attributes: open,
                ..Effective::default()
            },
            (ContentKind::Simple, Resolved::Complex(parent)) if parent.simple.is_some() => {
                let mut checks = parent.simple.unwrap_or_default();
                checks.extend(facets);
                Effective {
                    simple: Some(checks),
                    attributes: merge_attributes(parent.attributes, own_attributes),
                    open_attributes: open || parent.open_attributes,
                    lenient: parent.lenient,
                    ..Effective::default()
                }
            }
            _ => Effective {
                mixed: true,
                attributes: own_attributes,
                open_attributes: true,
                lenient: true,
                ..Effective::default()
            },
        }
    }

    /// Append a group's attributes; returns whether the group is open
    fn expand_attribute_group(
        &self,
        name: &QName,
        out: &mut Vec<AttributeDecl>,
        depth: usize,
    ) -> bool {
        if depth > MAX_DEPTH {
            return true;
        }
        let Some(group) = self.attribute_group(name) else {
            return true;
        };
        out.extend(group.attributes.iter().cloned());
        let mut open = group.any_attribute;
        for nested in &group.groups {
            open |= self.expand_attribute_group(nested, out, depth + 1);
        }
        open
    }

    fn check_value(&self, type_ref: &TypeRef, value: &str, depth: usize) -> Result<(), String> {
        if depth > MAX_DEPTH {
            return Ok(());
        }
        match type_ref {
            TypeRef::AnyType | TypeRef::Complex(_) => Ok(()),
            TypeRef::Simple(ty) => self.check_simple(ty, value, depth),
            TypeRef::Named(name) if name.ns.as_deref() == Some(XS_NAMESPACE) => {
                let normalized = if builtins::preserves_whitespace(&name.local) {
                    value.to_string()
                } else {
                    value.split_whitespace().collect::<Vec<_>>().join(" ")
                };
                match builtins::check(&name.local, &normalized) {
                    Builtin::Invalid => Err(format!(
                        "'{normalized}' is not a valid xs:{}",
                        name.local
                    )),
                    Builtin::Valid | Builtin::Unchecked => Ok(()),
                }
            }
            TypeRef::Named(name) => match self.simple_type(name) {
                Some(ty) => self.check_simple(ty, value, depth + 1),
                None => Ok(()),
            },
        }
    }

    fn check_simple(&self, ty: &SimpleType, value: &str, depth: usize) -> Result<(), String> {
        if ty.lenient {
            return Ok(());
        }
        if let Some(base) = &ty.base {
            self.check_value(base, value, depth + 1)?;
        }

        let value = value.trim();
        if !ty.enumerations.is_empty() && !ty.enumerations.iter().any(|e| e == value) {
            let mut allowed: Vec<&str> = ty.enumerations.iter().map(String::as_str).take(5).collect();
            if ty.enumerations.len() > 5 {
                allowed.push("...");
            }
            return Err(format!(
                "'{value}' is not an allowed value (expected one of: {})",
                allowed.join(", ")
            ));
        }
        if !ty.patterns.is_empty() && !ty.patterns.iter().any(|p| p.is_match(value)) {
            return Err(format!("'{value}' does not match the required pattern"));
        }

        let length = value.chars().count();
        if let Some(min) = ty.min_length {
            if length < min {
                return Err(format!("'{value}' is shorter than {min} characters"));
            }
        }
        if let Some(max) = ty.max_length {
            if length > max {
                return Err(format!("'{value}' is longer than {max} characters"));
            }
        }
        Ok(())
    }
}

fn decl_name(decl: &ElementDecl) -> QName {
    QName {
        ns: decl.ns.clone(),
        local: decl.name.clone(),
    }
}

fn text_of(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

/// Restriction and extension both keep base attributes; local ones win
fn merge_attributes(base: Vec<AttributeDecl>, own: Vec<AttributeDecl>) -> Vec<AttributeDecl> {
    let mut merged: Vec<AttributeDecl> = base
        .into_iter()
        .filter(|b| !own.iter().any(|o| o.name == b.name))
        .collect();
    merged.extend(own);
    merged
}

/// Matches a sequence of child element names against a content model
///
/// Each step returns every position the model can end at, so optional and
/// repeated particles need no backtracking.
struct ContentMatcher<'s, 'c> {
    schema: &'s Schema,
    children: &'c [QName],
    /// Furthest position any element was tried at, and the names tried there
    frontier: RefCell<(usize, BTreeSet<String>)>,
}

impl ContentMatcher<'_, '_> {
    fn particle(&self, particle: &Particle, start: usize, depth: usize) -> BTreeSet<usize> {
        let mut result = BTreeSet::new();
        if depth > MAX_DEPTH {
            return result;
        }
        if particle.min == 0 {
            result.insert(start);
        }

        let limit = particle.max.unwrap_or(u32::MAX);
        let cap = particle.min.max(1) + self.children.len() as u32 + 1;
        let mut current = BTreeSet::from([start]);
        let mut count = 0;

        while count < limit && count < cap {
            count += 1;
            let next: BTreeSet<usize> = current
                .iter()
                .flat_map(|&pos| self.term(&particle.term, pos, depth + 1))
                .collect();
            if next.is_empty() {
                break;
            }
            if next == current {
                // Repeating can no longer change the reachable set
                result.extend(next);
                break;
            }
            if count >= particle.min {
                result.extend(next.iter().copied());
            }
            current = next;
        }
        result
    }

    fn term(&self, term: &Term, pos: usize, depth: usize) -> BTreeSet<usize> {
        match term {
            Term::Element(decl) => self.element(&decl_name(decl), pos),
            Term::ElementRef(name) => self.element(name, pos),
            Term::Any => {
                self.tried(pos, "any element");
                if pos < self.children.len() {
                    BTreeSet::from([pos + 1])
                } else {
                    BTreeSet::new()
                }
            }
            Term::Sequence(items) => {
                let mut current = BTreeSet::from([pos]);
                for item in items {
                    current = current
                        .iter()
                        .flat_map(|&p| self.particle(item, p, depth + 1))
                        .collect();
                    if current.is_empty() {
                        break;
                    }
                }
                current
            }
            Term::Choice(items) => items
                .iter()
                .flat_map(|item| self.particle(item, pos, depth + 1))
                .collect(),
            Term::All(items) => self.all(items, pos, depth),
            Term::Group(name) => match self.schema.group(name) {
                Some(group) => self.particle(group, pos, depth + 1),
                None => (pos..=self.children.len()).collect(),
            },
        }
    }

    fn element(&self, name: &QName, pos: usize) -> BTreeSet<usize> {
        self.tried(pos, &name.local);
        match self.children.get(pos) {
            Some(child) if child == name => BTreeSet::from([pos + 1]),
            _ => BTreeSet::new(),
        }
    }

    /// `xs:all`: each member at most once, in any order
    fn all(&self, items: &[Particle], pos: usize, depth: usize) -> BTreeSet<usize> {
        let items = &items[..items.len().min(64)];
        let required: u64 = items
            .iter()
            .enumerate()
            .filter(|(_, p)| p.min > 0)
            .fold(0, |mask, (i, _)| mask | (1 << i));

        let mut seen = BTreeSet::from([(pos, 0u64)]);
        let mut queue = vec![(pos, 0u64)];
        let mut result = BTreeSet::new();

        while let Some((at, used)) = queue.pop() {
            if used & required == required {
                result.insert(at);
            }
            for (i, item) in items.iter().enumerate() {
                if used & (1 << i) != 0 {
                    continue;
                }
                let once = Particle {
                    min: 1,
                    max: Some(1),
                    term: item.term.clone(),
                };
                for end in self.particle(&once, at, depth + 1) {
                    let state = (end, used | (1 << i));
                    if seen.insert(state) {
                        queue.push(state);
                    }
                }
            }
        }
        result
    }

    fn tried(&self, pos: usize, name: &str) {
        let mut frontier = self.frontier.borrow_mut();
        if pos > frontier.0 {
            *frontier = (pos, BTreeSet::new());
        }
        if pos == frontier.0 {
            frontier.1.insert(name.to_string());
        }
    }

    fn diagnostic(&self, path: &str) -> String {
        let frontier = self.frontier.borrow();
        let expected = frontier.1.iter().cloned().collect::<Vec<_>>().join(", ");
        match self.children.get(frontier.0) {
            Some(found) => format!(
                "{path}: unexpected element '{}' (expected: {expected})",
                found.local
            ),
            None => format!("{path}: content incomplete (expected: {expected})"),
        }
    }
}
