use std::collections::HashMap;
use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::core::declaration::{Access, DeclKind, DeclarationEvent, LineRange, ParentScope};
use crate::error::{HdrdocError, Result};
use super::DeclarationProvider;

/// C and C++ provider using Tree-sitter
pub struct CppProvider {
    parser: Parser,
}

impl CppProvider {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let cpp_language = tree_sitter_cpp::language();
        parser.set_language(&cpp_language)
            .map_err(|e| HdrdocError::Parser(format!("Failed to set C++ language: {}", e)))?;

        Ok(Self { parser })
    }
}

impl DeclarationProvider for CppProvider {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<Vec<DeclarationEvent>> {
        let tree = self.parser.parse(content, None)
            .ok_or_else(|| HdrdocError::Unparseable { path: file_path.to_path_buf() })?;

        let mut collector = EventCollector::new(content);
        collector.visit_children(tree.root_node());
        Ok(collector.events)
    }

    fn file_extensions(&self) -> &[&str] {
        &["h", "hh", "hpp", "hxx", "h++", "inl", "c", "cc", "cpp", "cxx"]
    }

    fn language_name(&self) -> &str {
        "cpp"
    }
}

/// Scope entered while walking the syntax tree
struct Frame {
    kind: DeclKind,
    qualified_name: String,
    /// Access applied to the next member, tracked for records only
    access: Access,
}

/// Declarator reduced to the node carrying its name
struct DeclaratorInfo<'t> {
    node: Node<'t>,
    is_function: bool,
}

/// Walks a syntax tree depth first and records declaration events
struct EventCollector<'s> {
    source: &'s str,
    events: Vec<DeclarationEvent>,
    scopes: Vec<Frame>,
    /// Records and enums seen so far, used to parent out-of-line definitions
    containers: HashMap<String, DeclKind>,
    /// Access reported for each qualified name, reused by out-of-line definitions
    accesses: HashMap<String, Access>,
}

impl<'s> EventCollector<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            events: Vec::new(),
            scopes: Vec::new(),
            containers: HashMap::new(),
            accesses: HashMap::new(),
        }
    }

    fn visit_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit_item(child, None);
        }
    }

    /// Visit one item; `template_start` is the row of an enclosing
    /// `template<...>` header, which belongs to the declaration's extent
    fn visit_item(&mut self, node: Node, template_start: Option<usize>) {
        match node.kind() {
            "namespace_definition" => self.visit_namespace(node),
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                self.visit_record(node, template_start)
            }
            "enum_specifier" => self.visit_enum(node, template_start),
            "function_definition" => self.visit_function_definition(node, template_start),
            "declaration" | "field_declaration" => self.visit_declaration(node, template_start),
            "type_definition" => self.visit_typedef(node),
            "alias_declaration" => self.visit_alias(node, template_start),
            "using_declaration" => self.visit_using(node),
            "template_declaration" => {
                let start = template_start.unwrap_or(node.start_position().row);
                let mut cursor = node.walk();
                let inner: Vec<Node> = node
                    .named_children(&mut cursor)
                    .filter(|child| {
                        !matches!(child.kind(), "template_parameter_list" | "requires_clause")
                    })
                    .collect();
                for child in inner {
                    self.visit_item(child, Some(start));
                }
            }
            "access_specifier" => self.visit_access(node),
            "comment" | "friend_declaration" | "static_assert_declaration"
            | "compound_statement" => {}
            // preprocessor blocks, linkage specifications, declaration lists, errors
            _ => self.visit_children(node),
        }
    }

    fn visit_namespace(&mut self, node: Node) {
        let qualified_name = match node.child_by_field_name("name") {
            Some(name_node) => {
                let text = self.text(name_node);
                let qualified_name = self.qualify(text);
                let name = last_segment(text);
                let parent = self.parent_scope();
                self.emit(
                    DeclKind::Namespace,
                    name,
                    qualified_name.clone(),
                    Access::NotApplicable,
                    line_range(node, None),
                    parent,
                );
                qualified_name
            }
            // anonymous namespaces do not extend qualified names
            None => self.current_prefix().to_string(),
        };

        if let Some(body) = node.child_by_field_name("body") {
            self.enter(DeclKind::Namespace, qualified_name, Access::NotApplicable);
            self.visit_children(body);
            self.scopes.pop();
        }
    }

    fn visit_record(&mut self, node: Node, template_start: Option<usize>) {
        let body = node.child_by_field_name("body");
        if body.is_none() && !is_standalone_specifier(node) {
            // elaborated type use such as `struct Foo *ptr`
            return;
        }

        let (kind, keyword) = match node.kind() {
            "class_specifier" if template_start.is_some() => (DeclKind::ClassTemplate, "class"),
            "class_specifier" => (DeclKind::Class, "class"),
            "struct_specifier" => (DeclKind::Struct, "struct"),
            _ => (DeclKind::Union, "union"),
        };
        let range = line_range(node, template_start);
        let name_text = node.child_by_field_name("name").map(|n| self.text(n));
        let (name, qualified_name, parent) = self.declared_name(name_text, keyword, range.start);
        let access = self.access_for(&qualified_name, parent.as_ref());

        self.emit(kind, &name, qualified_name.clone(), access, range, parent);
        self.containers.insert(qualified_name.clone(), kind);

        if let Some(body) = body {
            let default_access = if kind.is_class() { Access::Private } else { Access::Public };
            self.enter(kind, qualified_name, default_access);
            self.visit_children(body);
            self.scopes.pop();
        }
    }

    fn visit_enum(&mut self, node: Node, template_start: Option<usize>) {
        let body = node.child_by_field_name("body");
        if body.is_none() && !is_standalone_specifier(node) {
            return;
        }

        let range = line_range(node, template_start);
        let name_text = node.child_by_field_name("name").map(|n| self.text(n));
        let (name, qualified_name, parent) = self.declared_name(name_text, "enum", range.start);
        let access = self.access_for(&qualified_name, parent.as_ref());

        self.emit(DeclKind::Enum, &name, qualified_name.clone(), access, range, parent);
        self.containers.insert(qualified_name.clone(), DeclKind::Enum);

        let Some(body) = body else {
            return;
        };
        let enum_scope = ParentScope {
            kind: DeclKind::Enum,
            qualified_name: qualified_name.clone(),
        };
        let mut cursor = body.walk();
        let enumerators: Vec<Node> = body
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "enumerator")
            .collect();

        for enumerator in enumerators {
            let Some(name_node) = enumerator.child_by_field_name("name") else {
                continue;
            };
            let name = self.text(name_node);
            self.emit(
                DeclKind::EnumConstant,
                name,
                format!("{}::{}", qualified_name, name),
                Access::NotApplicable,
                line_range(enumerator, None),
                Some(enum_scope.clone()),
            );
        }
    }

    fn visit_function_definition(&mut self, node: Node, template_start: Option<usize>) {
        let Some(info) = node.child_by_field_name("declarator").and_then(declarator_info) else {
            return;
        };
        if !info.is_function {
            return;
        }

        let range = line_range(node, template_start);
        let function = self.emit_function(info.node, range, template_start.is_some());

        if let Some(body) = node.child_by_field_name("body") {
            self.visit_locals(body, &function);
        }
    }

    /// Report the variables declared directly in a function body. Nested
    /// scopes are not visited.
    fn visit_locals(&mut self, body: Node, function: &ParentScope) {
        let mut cursor = body.walk();
        let statements: Vec<Node> = body
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "declaration")
            .collect();

        for statement in statements {
            let range = line_range(statement, None);
            for declarator in field_children(statement, "declarator") {
                let Some(info) = declarator_info(declarator) else {
                    continue;
                };
                if info.is_function {
                    continue;
                }
                let name = declared_identifier(self.text(info.node));
                self.emit(
                    DeclKind::Variable,
                    name,
                    format!("{}::{}", function.qualified_name, name),
                    Access::NotApplicable,
                    range,
                    Some(function.clone()),
                );
            }
        }
    }

    fn visit_declaration(&mut self, node: Node, template_start: Option<usize>) {
        let declarators = field_children(node, "declarator");

        if let Some(type_node) = node.child_by_field_name("type") {
            if is_type_specifier(type_node)
                && (type_node.child_by_field_name("body").is_some() || declarators.is_empty())
            {
                let start = if declarators.is_empty() { template_start } else { None };
                self.visit_item(type_node, start);
            }
        }

        let is_field = node.kind() == "field_declaration";
        let is_static = has_storage_class(node, "static", self.source);
        let range = line_range(node, template_start);

        for declarator in declarators {
            let Some(info) = declarator_info(declarator) else {
                continue;
            };
            if info.is_function {
                self.emit_function(info.node, range, template_start.is_some());
                continue;
            }

            let kind = if is_field && !is_static { DeclKind::Field } else { DeclKind::Variable };
            let text = self.text(info.node);
            let (name, qualified_name, parent) = self.declared_name(Some(text), "variable", range.start);
            let access = self.access_for(&qualified_name, parent.as_ref());
            self.emit(kind, &name, qualified_name, access, range, parent);
        }
    }

    fn visit_typedef(&mut self, node: Node) {
        if let Some(type_node) = node.child_by_field_name("type") {
            if is_type_specifier(type_node) && type_node.child_by_field_name("body").is_some() {
                self.visit_item(type_node, None);
            }
        }

        let range = line_range(node, None);
        for declarator in field_children(node, "declarator") {
            let Some(info) = declarator_info(declarator) else {
                continue;
            };
            let text = self.text(info.node);
            let (name, qualified_name, parent) = self.declared_name(Some(text), "typedef", range.start);
            let access = self.access_for(&qualified_name, parent.as_ref());
            self.emit(DeclKind::Typedef, &name, qualified_name, access, range, parent);
        }
    }

    fn visit_alias(&mut self, node: Node, template_start: Option<usize>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let kind = if template_start.is_some() {
            DeclKind::TypeAliasTemplate
        } else {
            DeclKind::TypeAlias
        };
        let range = line_range(node, template_start);
        let name = self.text(name_node);
        let qualified_name = self.qualify(name);
        let parent = self.parent_scope();
        let access = self.access_for(&qualified_name, parent.as_ref());
        self.emit(kind, name, qualified_name, access, range, parent);
    }

    fn visit_using(&mut self, node: Node) {
        let mut cursor = node.walk();
        let is_directive = node.children(&mut cursor).any(|child| child.kind() == "namespace");
        let Some(target) = last_named_child(node) else {
            return;
        };

        let kind = if is_directive { DeclKind::UsingDirective } else { DeclKind::Using };
        let name = last_segment(self.text(target));
        let qualified_name = self.qualify(name);
        let parent = self.parent_scope();
        let access = self.access_for(&qualified_name, parent.as_ref());
        self.emit(kind, name, qualified_name, access, line_range(node, None), parent);
    }

    fn visit_access(&mut self, node: Node) {
        let access = match self.text(node).trim_end_matches(':').trim() {
            "public" => Access::Public,
            "protected" => Access::Protected,
            "private" => Access::Private,
            _ => return,
        };
        if let Some(frame) = self.scopes.last_mut() {
            if is_record(frame.kind) {
                frame.access = access;
            }
        }
    }

    /// Emit a function-like event and return it as a scope for its locals
    fn emit_function(&mut self, name_node: Node, range: LineRange, is_template: bool) -> ParentScope {
        let text = self.text(name_node);
        let (name, qualified_name, parent) = self.declared_name(Some(text), "function", range.start);

        let owner = parent
            .as_ref()
            .filter(|scope| is_record(scope.kind))
            .map(|scope| strip_template_args(split_qualified(&scope.qualified_name).1));

        let kind = if name.starts_with('~') {
            DeclKind::Destructor
        } else if owner.as_deref() == Some(strip_template_args(&name).as_str()) {
            DeclKind::Constructor
        } else if is_template {
            DeclKind::FunctionTemplate
        } else if owner.is_some() {
            DeclKind::Method
        } else {
            DeclKind::Function
        };

        let access = self.access_for(&qualified_name, parent.as_ref());
        self.emit(kind, &name, qualified_name.clone(), access, range, parent);
        ParentScope { kind, qualified_name }
    }

    /// Split a declared (possibly qualified) name into its unqualified name,
    /// qualified name and enclosing scope.
    fn declared_name(
        &self,
        text: Option<&str>,
        anonymous_kind: &str,
        line: usize,
    ) -> (String, String, Option<ParentScope>) {
        let Some(text) = text else {
            let synthetic = format!("(anonymous {} at line {})", anonymous_kind, line);
            return (String::new(), self.qualify(&synthetic), self.parent_scope());
        };

        let name = declared_identifier(text);
        let (scope, _) = split_qualified(text.trim());
        let scope = strip_template_args(scope.trim_start_matches("::"));
        if scope.is_empty() {
            return (name.to_string(), self.qualify(name), self.parent_scope());
        }

        // Out-of-line definition: attach to the named record if it is known
        let relative = self.qualify(&scope);
        for candidate in [relative.as_str(), scope.as_str()] {
            if let Some(&kind) = self.containers.get(candidate) {
                let parent = ParentScope {
                    kind,
                    qualified_name: candidate.to_string(),
                };
                return (name.to_string(), format!("{}::{}", candidate, name), Some(parent));
            }
        }
        (name.to_string(), format!("{}::{}", relative, name), self.parent_scope())
    }

    /// Access of a declaration: the current access inside its own record,
    /// otherwise whatever an earlier declaration of the same name reported
    fn access_for(&self, qualified_name: &str, parent: Option<&ParentScope>) -> Access {
        let in_current_scope = match (parent, self.scopes.last()) {
            (Some(parent), Some(frame)) => parent.qualified_name == frame.qualified_name,
            _ => false,
        };
        match self.scopes.last() {
            Some(frame) if in_current_scope && is_record(frame.kind) => frame.access,
            _ => self
                .accesses
                .get(qualified_name)
                .copied()
                .unwrap_or(Access::NotApplicable),
        }
    }

    fn emit(
        &mut self,
        kind: DeclKind,
        name: &str,
        qualified_name: String,
        access: Access,
        range: LineRange,
        parent: Option<ParentScope>,
    ) {
        self.accesses.entry(qualified_name.clone()).or_insert(access);
        self.events.push(DeclarationEvent {
            kind,
            name: name.to_string(),
            qualified_name,
            access,
            range,
            parent,
            in_main_file: true,
        });
    }

    fn enter(&mut self, kind: DeclKind, qualified_name: String, access: Access) {
        self.scopes.push(Frame {
            kind,
            qualified_name,
            access,
        });
    }

    fn current_prefix(&self) -> &str {
        self.scopes
            .last()
            .map(|frame| frame.qualified_name.as_str())
            .unwrap_or_default()
    }

    fn qualify(&self, name: &str) -> String {
        let prefix = self.current_prefix();
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}::{}", prefix, name)
        }
    }

    fn parent_scope(&self) -> Option<ParentScope> {
        self.scopes.last().map(|frame| ParentScope {
            kind: frame.kind,
            qualified_name: frame.qualified_name.clone(),
        })
    }

    fn text(&self, node: Node) -> &'s str {
        let source = self.source;
        &source[node.byte_range()]
    }
}

fn is_record(kind: DeclKind) -> bool {
    matches!(
        kind,
        DeclKind::Class | DeclKind::ClassTemplate | DeclKind::Struct | DeclKind::Union
    )
}

fn is_type_specifier(node: Node) -> bool {
    matches!(
        node.kind(),
        "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier"
    )
}

/// A body-less specifier that stands alone, i.e. a forward declaration
fn is_standalone_specifier(node: Node) -> bool {
    match node.parent() {
        None => true,
        Some(parent) => {
            parent.child_by_field_name("declarator").is_none()
                && matches!(
                    parent.kind(),
                    "translation_unit"
                        | "declaration_list"
                        | "field_declaration_list"
                        | "template_declaration"
                        | "declaration"
                        | "field_declaration"
                        | "linkage_specification"
                        | "preproc_if"
                        | "preproc_ifdef"
                        | "preproc_else"
                        | "preproc_elif"
                )
        }
    }
}

fn has_storage_class(node: Node, specifier: &str, source: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| {
            child.kind() == "storage_class_specifier" && &source[child.byte_range()] == specifier
        });
    found
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children_by_field_name(field, &mut cursor).collect();
    children
}

fn last_named_child(node: Node) -> Option<Node> {
    let count = node.named_child_count();
    node.named_child(count.checked_sub(1)?)
}

/// Follow pointer, reference, array and init declarators down to the name
fn declarator_info(node: Node) -> Option<DeclaratorInfo> {
    let mut current = node;
    let mut is_function = false;

    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" | "qualified_identifier" | "template_function" => {
                return Some(DeclaratorInfo { node: current, is_function });
            }
            "operator_cast" => {
                return Some(DeclaratorInfo { node: current, is_function: true });
            }
            "function_declarator" => {
                let inner = current.child_by_field_name("declarator")?;
                // `void (*callback)(int)` declares a pointer, not a function
                if inner.kind() != "parenthesized_declarator" {
                    is_function = true;
                }
                current = inner;
            }
            "pointer_declarator" | "reference_declarator" | "array_declarator"
            | "init_declarator" | "parenthesized_declarator" | "attributed_declarator" => {
                current = current
                    .child_by_field_name("declarator")
                    .or_else(|| last_named_child(current))?;
            }
            _ => return None,
        }
    }
}

fn line_range(node: Node, template_start: Option<usize>) -> LineRange {
    let start = template_start.unwrap_or(node.start_position().row) + 1;
    let end_position = node.end_position();
    let mut end = end_position.row + 1;
    if end_position.column == 0 && end > start {
        end -= 1;
    }
    LineRange::new(start, end)
}

/// Split `a::B<c::D>::name` at its last top-level `::` into scope and name
fn split_qualified(text: &str) -> (&str, &str) {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut split = None;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b'(' => break,
            b':' if depth == 0 && bytes[i + 1] == b':' => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    match split {
        Some(i) => (&text[..i], &text[i + 2..]),
        None => ("", text),
    }
}

/// Unqualified identifier of a declared name; conversion operators keep
/// only the part before their parameter list
fn declared_identifier(text: &str) -> &str {
    let (_, name) = split_qualified(text.trim());
    match name.find('(') {
        Some(i) if !name[..i].trim_end().ends_with("operator") => name[..i].trim(),
        _ => name.trim(),
    }
}

fn last_segment(text: &str) -> &str {
    text.rsplit("::").next().unwrap_or(text)
}

fn strip_template_args(text: &str) -> String {
    let mut depth = 0usize;
    let mut stripped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }
    stripped.trim().to_string()
}
