//! Declaration tree assembled from a provider's event stream.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; the qualified name
//! stays the external key. Every level keeps its children in qualified-name
//! order, and a side index maps each qualified name to its node so parent
//! lookups do not scan the tree.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{trace, warn};

use super::comment;
use super::declaration::{Access, DeclKind, DeclarationEvent, LineRange};
use super::lines::LineStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct DeclarationNode {
    pub name: String,
    pub qualified_name: String,
    pub kind: DeclKind,
    pub access: Access,
    pub declaration_range: LineRange,
    pub documentation_range: Option<LineRange>,
    pub children: BTreeMap<String, NodeId>,
}

impl DeclarationNode {
    fn from_event(event: DeclarationEvent, documentation_range: Option<LineRange>) -> Self {
        Self {
            name: event.name,
            qualified_name: event.qualified_name,
            kind: event.kind,
            access: event.access,
            declaration_range: event.range,
            documentation_range,
            children: BTreeMap::new(),
        }
    }

    pub fn is_documented(&self) -> bool {
        self.documentation_range.is_some()
    }
}

/// Why an event did not produce a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotDocumentable,
    OutsideMainFile,
    LocalToFunction,
}

/// What [`TreeBuilder::ingest`] did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted(NodeId),
    /// An undocumented declaration with the same qualified name was replaced
    Replaced(NodeId),
    /// A documented declaration with the same qualified name was kept
    KeptExisting(NodeId),
    Skipped(SkipReason),
    /// The enclosing container has not been seen; the event was dropped
    Orphaned { parent: String },
}

/// Finished declaration tree of one input unit
#[derive(Debug, Clone, Default)]
pub struct DeclarationTree {
    nodes: Vec<DeclarationNode>,
    roots: BTreeMap<String, NodeId>,
    index: HashMap<String, NodeId>,
}

impl DeclarationTree {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &DeclarationNode {
        &self.nodes[id.0]
    }

    pub fn find(&self, qualified_name: &str) -> Option<&DeclarationNode> {
        self.index.get(qualified_name).map(|id| self.node(*id))
    }

    /// Top-level nodes in qualified-name order
    pub fn roots(&self) -> impl Iterator<Item = &DeclarationNode> + '_ {
        self.roots.values().map(|id| self.node(*id))
    }

    /// Children of `node` in qualified-name order
    pub fn children<'a>(
        &'a self,
        node: &'a DeclarationNode,
    ) -> impl Iterator<Item = &'a DeclarationNode> + 'a {
        node.children.values().map(|id| self.node(*id))
    }

    /// Children of `node` in source order
    pub fn members<'a>(&'a self, node: &'a DeclarationNode) -> Vec<&'a DeclarationNode> {
        let mut members: Vec<_> = self.children(node).collect();
        members.sort_by_key(|member| member.declaration_range.start);
        members
    }

    /// Nested, serializable copy of the tree
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.roots().map(|node| self.snapshot_node(node)).collect()
    }

    fn snapshot_node(&self, node: &DeclarationNode) -> NodeSnapshot {
        NodeSnapshot {
            name: node.name.clone(),
            qualified_name: node.qualified_name.clone(),
            kind: node.kind,
            access: node.access,
            declaration_range: node.declaration_range,
            documentation_range: node.documentation_range,
            children: self
                .children(node)
                .map(|child| self.snapshot_node(child))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub qualified_name: String,
    pub kind: DeclKind,
    pub access: Access,
    pub declaration_range: LineRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_range: Option<LineRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

/// Builds a [`DeclarationTree`] from events arriving in traversal order
pub struct TreeBuilder<'a> {
    lines: &'a LineStore,
    tree: DeclarationTree,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(lines: &'a LineStore) -> Self {
        Self {
            lines,
            tree: DeclarationTree::default(),
        }
    }

    pub fn ingest(&mut self, event: DeclarationEvent) -> IngestOutcome {
        if !event.in_main_file {
            return IngestOutcome::Skipped(SkipReason::OutsideMainFile);
        }
        if !event.kind.is_documentable() {
            return IngestOutcome::Skipped(SkipReason::NotDocumentable);
        }

        let documentation_range = comment::locate(self.lines, event.range.start);

        if let Some(&existing) = self.tree.index.get(&event.qualified_name) {
            return self.resolve_duplicate(existing, event, documentation_range);
        }

        let parent = match &event.parent {
            Some(scope) if scope.kind.is_function() => {
                return IngestOutcome::Skipped(SkipReason::LocalToFunction);
            }
            Some(scope) if scope.kind.is_container() => {
                match self.tree.index.get(&scope.qualified_name) {
                    Some(&parent) => Some(parent),
                    None => {
                        warn!(
                            "Dropping {} `{}`: enclosing `{}` was not declared before it",
                            event.kind, event.qualified_name, scope.qualified_name
                        );
                        return IngestOutcome::Orphaned {
                            parent: scope.qualified_name.clone(),
                        };
                    }
                }
            }
            _ => None,
        };

        let id = NodeId(self.tree.nodes.len());
        let key = event.qualified_name.clone();
        self.tree
            .nodes
            .push(DeclarationNode::from_event(event, documentation_range));
        self.tree.index.insert(key.clone(), id);

        match parent {
            Some(parent) => {
                self.tree.nodes[parent.0].children.insert(key, id);
            }
            None => {
                self.tree.roots.insert(key, id);
            }
        }
        IngestOutcome::Inserted(id)
    }

    fn resolve_duplicate(
        &mut self,
        existing: NodeId,
        event: DeclarationEvent,
        documentation_range: Option<LineRange>,
    ) -> IngestOutcome {
        let current = &mut self.tree.nodes[existing.0];
        if current.is_documented() {
            trace!("Keeping documented declaration of `{}`", current.qualified_name);
            return IngestOutcome::KeptExisting(existing);
        }

        // Members already attached belong to the entity, not to one declaration of it.
        let children = std::mem::take(&mut current.children);
        let mut replacement = DeclarationNode::from_event(event, documentation_range);
        replacement.children = children;
        *current = replacement;
        trace!("Replaced undocumented declaration of `{}`", current.qualified_name);
        IngestOutcome::Replaced(existing)
    }

    pub fn finish(self) -> DeclarationTree {
        self.tree
    }
}

/// Ingest a whole event stream
pub fn build_tree<I>(lines: &LineStore, events: I) -> DeclarationTree
where
    I: IntoIterator<Item = DeclarationEvent>,
{
    let mut builder = TreeBuilder::new(lines);
    for event in events {
        builder.ingest(event);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: DeclKind, qname: &str, start: usize, end: usize) -> DeclarationEvent {
        DeclarationEvent::new(kind, qname, Access::NotApplicable, LineRange::new(start, end))
    }

    #[test]
    fn test_members_nest_under_their_container() {
        let lines = LineStore::from_source("struct Point {\n\tint x;\n\tint y;\n};\n");
        let tree = build_tree(
            &lines,
            vec![
                event(DeclKind::Struct, "Point", 1, 4),
                event(DeclKind::Field, "Point::y", 3, 3).with_parent(DeclKind::Struct, "Point"),
                event(DeclKind::Field, "Point::x", 2, 2).with_parent(DeclKind::Struct, "Point"),
            ],
        );

        assert_eq!(tree.len(), 3);
        let roots: Vec<_> = tree.roots().map(|n| n.qualified_name.as_str()).collect();
        assert_eq!(roots, vec!["Point"]);

        let point = tree.find("Point").unwrap();
        let children: Vec<_> = tree.children(point).map(|n| n.name.as_str()).collect();
        assert_eq!(children, vec!["x", "y"]);
    }

    #[test]
    fn test_roots_are_ordered_by_qualified_name() {
        let lines = LineStore::from_source("");
        let tree = build_tree(
            &lines,
            vec![
                event(DeclKind::Struct, "zeta", 1, 2),
                event(DeclKind::Struct, "ns::alpha", 3, 4),
                event(DeclKind::Struct, "beta", 5, 6),
            ],
        );
        let roots: Vec<_> = tree.roots().map(|n| n.qualified_name.as_str()).collect();
        assert_eq!(roots, vec!["beta", "ns::alpha", "zeta"]);
    }

    #[test]
    fn test_members_are_source_ordered() {
        let lines = LineStore::from_source("");
        let tree = build_tree(
            &lines,
            vec![
                event(DeclKind::Class, "C", 1, 9),
                event(DeclKind::Method, "C::zebra", 2, 2).with_parent(DeclKind::Class, "C"),
                event(DeclKind::Method, "C::apple", 5, 5).with_parent(DeclKind::Class, "C"),
            ],
        );
        let class = tree.find("C").unwrap();
        let members: Vec<_> = tree.members(class).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(members, vec!["zebra", "apple"]);
    }

    #[test]
    fn test_documented_declaration_wins() {
        let lines = LineStore::from_source("// Does f\nvoid f();\n\nvoid f() {\n}\n");
        let mut builder = TreeBuilder::new(&lines);

        let first = builder.ingest(event(DeclKind::Function, "f", 2, 2));
        let second = builder.ingest(event(DeclKind::Function, "f", 4, 5));
        assert!(matches!(first, IngestOutcome::Inserted(_)));
        assert!(matches!(second, IngestOutcome::KeptExisting(_)));

        let tree = builder.finish();
        assert_eq!(tree.len(), 1);
        let f = tree.find("f").unwrap();
        assert_eq!(f.declaration_range, LineRange::new(2, 2));
        assert_eq!(f.documentation_range, Some(LineRange::new(1, 1)));
    }

    #[test]
    fn test_later_documented_declaration_replaces_undocumented() {
        let lines = LineStore::from_source("void f();\n// Does f\nvoid f() {\n}\n");
        let tree = build_tree(
            &lines,
            vec![event(DeclKind::Function, "f", 1, 1), event(DeclKind::Function, "f", 3, 4)],
        );
        assert_eq!(tree.len(), 1);
        let f = tree.find("f").unwrap();
        assert_eq!(f.declaration_range, LineRange::new(3, 4));
        assert!(f.is_documented());
    }

    #[test]
    fn test_most_recent_wins_when_neither_documented() {
        let lines = LineStore::from_source("");
        let tree = build_tree(
            &lines,
            vec![event(DeclKind::Function, "f", 1, 1), event(DeclKind::Function, "f", 7, 9)],
        );
        assert_eq!(tree.find("f").unwrap().declaration_range, LineRange::new(7, 9));
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn test_replacement_keeps_attached_members() {
        let lines = LineStore::from_source("");
        let tree = build_tree(
            &lines,
            vec![
                event(DeclKind::Struct, "S", 1, 3),
                event(DeclKind::Field, "S::x", 2, 2).with_parent(DeclKind::Struct, "S"),
                event(DeclKind::Struct, "S", 5, 5),
            ],
        );
        let s = tree.find("S").unwrap();
        assert_eq!(s.declaration_range, LineRange::new(5, 5));
        assert_eq!(tree.children(s).count(), 1);
    }

    #[test]
    fn test_function_locals_are_discarded() {
        let lines = LineStore::from_source("");
        let mut builder = TreeBuilder::new(&lines);
        builder.ingest(event(DeclKind::Function, "f", 1, 4));
        let outcome = builder.ingest(
            event(DeclKind::Variable, "f::local", 2, 2).with_parent(DeclKind::Function, "f"),
        );
        assert_eq!(outcome, IngestOutcome::Skipped(SkipReason::LocalToFunction));
        assert_eq!(builder.finish().len(), 1);
    }

    #[test]
    fn test_namespace_members_go_to_root() {
        let lines = LineStore::from_source("");
        let mut builder = TreeBuilder::new(&lines);
        let ns = builder.ingest(event(DeclKind::Namespace, "ns", 1, 9));
        assert_eq!(ns, IngestOutcome::Skipped(SkipReason::NotDocumentable));
        builder.ingest(event(DeclKind::Struct, "ns::S", 2, 4).with_parent(DeclKind::Namespace, "ns"));
        let tree = builder.finish();
        let roots: Vec<_> = tree.roots().map(|n| n.qualified_name.as_str()).collect();
        assert_eq!(roots, vec!["ns::S"]);
    }

    #[test]
    fn test_deeply_nested_parent_lookup() {
        let lines = LineStore::from_source("");
        let tree = build_tree(
            &lines,
            vec![
                event(DeclKind::Class, "A", 1, 20),
                event(DeclKind::Struct, "A::B", 2, 10).with_parent(DeclKind::Class, "A"),
                event(DeclKind::Enum, "A::B::E", 3, 6).with_parent(DeclKind::Struct, "A::B"),
                event(DeclKind::EnumConstant, "A::B::E::One", 4, 4)
                    .with_parent(DeclKind::Enum, "A::B::E"),
            ],
        );
        let e = tree.find("A::B::E").unwrap();
        let constants: Vec<_> = tree.children(e).map(|n| n.name.as_str()).collect();
        assert_eq!(constants, vec!["One"]);
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn test_orphan_is_dropped_without_corrupting_tree() {
        let lines = LineStore::from_source("");
        let mut builder = TreeBuilder::new(&lines);
        builder.ingest(event(DeclKind::Struct, "S", 1, 3));
        let outcome = builder.ingest(
            event(DeclKind::Field, "Missing::x", 2, 2).with_parent(DeclKind::Struct, "Missing"),
        );
        assert_eq!(outcome, IngestOutcome::Orphaned { parent: "Missing".to_string() });

        let tree = builder.finish();
        assert_eq!(tree.len(), 1);
        assert!(tree.find("Missing::x").is_none());
    }

    #[test]
    fn test_included_and_unknown_events_are_skipped() {
        let lines = LineStore::from_source("");
        let mut builder = TreeBuilder::new(&lines);
        let mut included = event(DeclKind::Struct, "Other", 1, 2);
        included.in_main_file = false;
        assert_eq!(
            builder.ingest(included),
            IngestOutcome::Skipped(SkipReason::OutsideMainFile)
        );
        assert_eq!(
            builder.ingest(event(DeclKind::Other, "x", 1, 1)),
            IngestOutcome::Skipped(SkipReason::NotDocumentable)
        );
        assert!(builder.finish().is_empty());
    }

    #[test]
    fn test_snapshot_is_nested() {
        let lines = LineStore::from_source("// A struct\nstruct S {\n\tint x;\n};\n");
        let tree = build_tree(
            &lines,
            vec![
                event(DeclKind::Struct, "S", 2, 4),
                event(DeclKind::Field, "S::x", 3, 3).with_parent(DeclKind::Struct, "S"),
            ],
        );
        let json = serde_json::to_value(tree.snapshot()).unwrap();
        assert_eq!(json[0]["qualified_name"], "S");
        assert_eq!(json[0]["kind"], "struct");
        assert_eq!(json[0]["documentation_range"]["start"], 1);
        assert_eq!(json[0]["children"][0]["name"], "x");
    }
}
