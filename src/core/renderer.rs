//! Markdown rendering of a finished declaration tree.

use std::collections::HashSet;
use std::fmt;

use crate::config::RenderConfig;
use super::comment;
use super::declaration::{Access, DeclKind};
use super::lines::LineStore;
use super::signature;
use super::tree::{DeclarationNode, DeclarationTree};

/// Indentation of members inside a container's code block
const MEMBER_INDENT: usize = 4;

/// Renderer switches
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub include_private: bool,
    pub build_toc: bool,
    pub code_language: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            include_private: config.include_private,
            build_toc: config.build_toc,
            code_language: config.code_language.clone(),
        }
    }
}

/// A rendered document as an ordered list of text fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    fragments: Vec<String>,
}

impl Document {
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn into_string(self) -> String {
        self.fragments.concat()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            f.write_str(fragment)?;
        }
        Ok(())
    }
}

/// Anchor target shared by table of contents links and headings
pub fn anchor(label: &str, qualified_name: &str) -> String {
    format!("{}-{}", label, qualified_name).replace(' ', "-")
}

/// Render `tree` as a markdown document titled `title`
pub fn render_document(
    title: &str,
    tree: &DeclarationTree,
    lines: &LineStore,
    options: &RenderOptions,
) -> Document {
    DocumentRenderer::new(tree, lines, options).render(title)
}

pub struct DocumentRenderer<'a> {
    tree: &'a DeclarationTree,
    lines: &'a LineStore,
    options: &'a RenderOptions,
    fragments: Vec<String>,
}

impl<'a> DocumentRenderer<'a> {
    pub fn new(tree: &'a DeclarationTree, lines: &'a LineStore, options: &'a RenderOptions) -> Self {
        Self {
            tree,
            lines,
            options,
            fragments: Vec::new(),
        }
    }

    pub fn render(mut self, title: &str) -> Document {
        self.append(format!("# {}\n\n", title));

        if self.options.build_toc {
            let tree = self.tree;
            self.table_of_contents(tree.roots(), 0);
            self.append("\n---\n\n");
        }

        let tree = self.tree;
        self.body(tree.roots(), 0);

        Document {
            fragments: self.fragments,
        }
    }

    fn append(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    fn is_visible(&self, node: &DeclarationNode) -> bool {
        self.options.include_private || node.access != Access::Private
    }

    fn table_of_contents<'t>(
        &mut self,
        nodes: impl Iterator<Item = &'t DeclarationNode>,
        depth: usize,
    ) {
        let tree = self.tree;
        for node in nodes {
            if !node.is_documented() && !node.kind.is_container() {
                continue;
            }
            // Member variables have no section of their own to link to
            if node.kind == DeclKind::Field || !self.is_visible(node) {
                continue;
            }
            let Some(label) = node.kind.label() else {
                continue;
            };
            if node.name.is_empty() {
                continue;
            }

            self.append(format!(
                "{}* [{}](#{})\n",
                " ".repeat(depth * 4),
                node.name,
                anchor(label, &node.qualified_name)
            ));
            if !node.children.is_empty() {
                self.table_of_contents(tree.children(node), depth + 1);
            }
        }
    }

    fn body<'t>(&mut self, nodes: impl Iterator<Item = &'t DeclarationNode>, depth: usize) {
        let tree = self.tree;
        for node in nodes {
            let Some(label) = node.kind.label() else {
                continue;
            };
            if !self.is_visible(node) {
                continue;
            }

            // A container written on one line, e.g. `enum E { A, B };`, already
            // shows its members in its signature.
            if node.kind.is_container() && !node.declaration_range.is_single_line() {
                self.container(node, label, depth);
                self.body(tree.children(node), depth + 1);
                if depth == 0 {
                    self.append("\n---\n\n");
                }
                continue;
            }

            if node.is_documented() && node.kind != DeclKind::Field {
                self.declaration(node, label, depth);
            }
        }
    }

    fn heading(&mut self, node: &DeclarationNode, label: &str, depth: usize) {
        let level = if depth == 0 { "##" } else { "###" };
        self.append(format!(
            "<a id=\"{}\"></a>\n\n",
            anchor(label, &node.qualified_name)
        ));
        self.append(format!("{} {} `{}`\n\n", level, label, node.qualified_name));
    }

    fn comment_text(&mut self, node: &DeclarationNode) {
        if let Some(range) = node.documentation_range {
            let text = comment::extract_text(self.lines, range);
            self.append(format!("{}\n\n", text));
        }
    }

    fn container(&mut self, node: &DeclarationNode, label: &str, depth: usize) {
        let head = signature::reconstruct(self.lines, node.declaration_range, 0);

        self.heading(node, label, depth);
        self.append(format!("```{}\n", self.options.code_language));
        self.append(format!("{} {{\n", head));
        self.member_list(node);
        self.append("};\n");
        self.append("```\n\n");

        self.comment_text(node);
        self.field_summary(node);
    }

    fn declaration(&mut self, node: &DeclarationNode, label: &str, depth: usize) {
        let head = signature::reconstruct(self.lines, node.declaration_range, 0);
        let terminator = terminator(node.kind);

        self.heading(node, label, depth);
        self.append(format!("```{}\n", self.options.code_language));
        self.append(format!("{}{}\n", head, terminator));
        self.append("```\n\n");
        self.comment_text(node);
    }

    fn member_list(&mut self, parent: &DeclarationNode) {
        let tree = self.tree;
        let mut rendered_lines = HashSet::new();
        let mut current_access: Option<Access> = None;
        let mut wrote_member = false;

        for member in tree.members(parent) {
            if !self.is_visible(member) {
                continue;
            }
            // `float x, y;` yields one node per variable but one line of source
            if !rendered_lines.insert(member.declaration_range.start) {
                continue;
            }

            if current_access != Some(member.access) {
                let header = match member.access {
                    // public is the default for structs and unions
                    Access::Public if !parent.kind.is_class() => None,
                    access => access.header(),
                };
                if let Some(header) = header {
                    self.append(format!("{}\n", header));
                }
                current_access = Some(member.access);
            }

            let text = signature::reconstruct(self.lines, member.declaration_range, MEMBER_INDENT);
            let separator = if member.kind == DeclKind::EnumConstant { "" } else { "\n" };
            self.append(format!("{}{}{}\n", text, terminator(member.kind), separator));
            wrote_member = true;
        }

        if wrote_member {
            if let Some(last) = self.fragments.last_mut() {
                if last.ends_with("\n\n") {
                    last.pop();
                }
            }
        }
    }

    fn field_summary(&mut self, parent: &DeclarationNode) {
        let tree = self.tree;
        let entries: Vec<String> = tree
            .children(parent)
            .filter(|child| child.kind == DeclKind::Field && self.is_visible(child))
            .filter_map(|child| {
                child.documentation_range.map(|range| {
                    format!("* `{}`  {}\n", child.name, comment::extract_text(self.lines, range))
                })
            })
            .collect();

        if entries.is_empty() {
            return;
        }
        self.append("#### Member Variables\n\n");
        self.fragments.extend(entries);
        self.append("\n");
    }
}

fn terminator(kind: DeclKind) -> &'static str {
    if kind == DeclKind::EnumConstant {
        ""
    } else {
        ";"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::declaration::{DeclarationEvent, LineRange};
    use crate::core::tree::build_tree;

    fn event(kind: DeclKind, qname: &str, access: Access, start: usize, end: usize) -> DeclarationEvent {
        DeclarationEvent::new(kind, qname, access, LineRange::new(start, end))
    }

    fn render(source: &str, events: Vec<DeclarationEvent>, options: &RenderOptions) -> String {
        let lines = LineStore::from_source(source);
        let tree = build_tree(&lines, events);
        render_document("test.h", &tree, &lines, options).into_string()
    }

    fn no_toc() -> RenderOptions {
        RenderOptions {
            build_toc: false,
            ..RenderOptions::default()
        }
    }

    const POINT: &str = "// Holds a point\nstruct Point { int x; int y; };\n";

    fn point_events() -> Vec<DeclarationEvent> {
        vec![
            event(DeclKind::Struct, "Point", Access::NotApplicable, 2, 2),
            event(DeclKind::Field, "Point::x", Access::Public, 2, 2)
                .with_parent(DeclKind::Struct, "Point"),
            event(DeclKind::Field, "Point::y", Access::Public, 2, 2)
                .with_parent(DeclKind::Struct, "Point"),
        ]
    }

    #[test]
    fn test_one_line_container_is_not_expanded() {
        let output = render(POINT, point_events(), &RenderOptions::default());

        assert!(output.starts_with("# test.h\n\n* [Point](#Struct-Point)\n\n---\n\n"));
        assert!(output.contains("## Struct `Point`\n\n```cpp\nstruct Point { int x; int y; };\n```\n\nHolds a point\n\n"));
        assert_eq!(output.matches("int x;").count(), 1);
        assert!(!output.contains("Member Variables"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let lines = LineStore::from_source(POINT);
        let tree = build_tree(&lines, point_events());
        let options = RenderOptions::default();
        let first = render_document("test.h", &tree, &lines, &options);
        let second = render_document("test.h", &tree, &lines, &options);
        assert_eq!(first, second);
        assert_eq!(first.fragments()[0], "# test.h\n\n");
        assert_eq!(first.to_string(), second.into_string());
    }

    const CLASS: &str = "\
class Widget {
public:
\t// Draws the widget
\tvoid draw() const;
\tint width, height;
protected:
\t// Layout pass
\tvoid layout();
private:
\t// Internal counter
\tint counter;
};
";

    fn class_events() -> Vec<DeclarationEvent> {
        vec![
            event(DeclKind::Class, "Widget", Access::NotApplicable, 1, 12),
            event(DeclKind::Method, "Widget::draw", Access::Public, 4, 4)
                .with_parent(DeclKind::Class, "Widget"),
            event(DeclKind::Field, "Widget::width", Access::Public, 5, 5)
                .with_parent(DeclKind::Class, "Widget"),
            event(DeclKind::Field, "Widget::height", Access::Public, 5, 5)
                .with_parent(DeclKind::Class, "Widget"),
            event(DeclKind::Method, "Widget::layout", Access::Protected, 8, 8)
                .with_parent(DeclKind::Class, "Widget"),
            event(DeclKind::Field, "Widget::counter", Access::Private, 11, 11)
                .with_parent(DeclKind::Class, "Widget"),
        ]
    }

    #[test]
    fn test_class_member_list() {
        let output = render(CLASS, class_events(), &no_toc());
        let expected = "\
## Class `Widget`

```cpp
class Widget {
public:
    void draw() const;

    int width, height;

protected:
    void layout();
};
```

";
        assert!(output.contains(expected), "{}", output);
        assert!(output.contains("### Function `Widget::draw`\n\n```cpp\nvoid draw() const;\n```\n\nDraws the widget\n\n"));
        assert!(output.contains("### Function `Widget::layout`"));
        assert!(output.ends_with("\n---\n\n"));
    }

    #[test]
    fn test_private_members_are_hidden_by_default() {
        let output = render(CLASS, class_events(), &no_toc());
        assert!(!output.contains("counter"));
        assert!(!output.contains("private:"));
        assert!(!output.contains("Member Variables"));
    }

    #[test]
    fn test_private_members_with_include_private() {
        let options = RenderOptions {
            include_private: true,
            ..no_toc()
        };
        let output = render(CLASS, class_events(), &options);
        assert!(output.contains("private:\n    int counter;\n};\n"));
        assert!(output.contains("#### Member Variables\n\n* `counter`  Internal counter\n\n"));
    }

    #[test]
    fn test_struct_suppresses_public_header() {
        let source = "struct S {\n\tint a;\nprotected:\n\tint b;\n};\n";
        let events = vec![
            event(DeclKind::Struct, "S", Access::NotApplicable, 1, 5),
            event(DeclKind::Field, "S::a", Access::Public, 2, 2).with_parent(DeclKind::Struct, "S"),
            event(DeclKind::Field, "S::b", Access::Protected, 4, 4)
                .with_parent(DeclKind::Struct, "S"),
        ];
        let output = render(source, events, &no_toc());
        assert!(output.contains("struct S {\n    int a;\n\nprotected:\n    int b;\n};\n"), "{}", output);
        assert!(!output.contains("public:"));
    }

    #[test]
    fn test_enum_constants_render_without_terminator() {
        let source = "enum class Color {\n\tRed,\n\t// Same as red\n\tCrimson = Red\n};\n";
        let events = vec![
            event(DeclKind::Enum, "Color", Access::NotApplicable, 1, 5),
            event(DeclKind::EnumConstant, "Color::Red", Access::NotApplicable, 2, 2)
                .with_parent(DeclKind::Enum, "Color"),
            event(DeclKind::EnumConstant, "Color::Crimson", Access::NotApplicable, 4, 4)
                .with_parent(DeclKind::Enum, "Color"),
        ];
        let output = render(source, events, &RenderOptions::default());
        assert!(output.contains("enum class Color {\n    Red,\n    Crimson = Red\n};\n"), "{}", output);
        assert!(output.contains("### Enum Constant `Color::Crimson`\n\n```cpp\nCrimson = Red\n```\n\nSame as red\n\n"));
        assert!(output.contains("* [Color](#Enum-Color)\n    * [Crimson](#Enum-Constant-Color::Crimson)\n    * [Red](#Enum-Constant-Color::Red)\n"));
    }

    #[test]
    fn test_containers_alphabetical_members_source_ordered() {
        let source = "struct Zed {\n\tint b;\n\tint a;\n};\nstruct Alpha {\n\tint z;\n};\n";
        let events = vec![
            event(DeclKind::Struct, "Zed", Access::NotApplicable, 1, 4),
            event(DeclKind::Field, "Zed::b", Access::Public, 2, 2).with_parent(DeclKind::Struct, "Zed"),
            event(DeclKind::Field, "Zed::a", Access::Public, 3, 3).with_parent(DeclKind::Struct, "Zed"),
            event(DeclKind::Struct, "Alpha", Access::NotApplicable, 5, 7),
            event(DeclKind::Field, "Alpha::z", Access::Public, 6, 6)
                .with_parent(DeclKind::Struct, "Alpha"),
        ];
        let output = render(source, events, &no_toc());
        let alpha = output.find("## Struct `Alpha`").unwrap();
        let zed = output.find("## Struct `Zed`").unwrap();
        assert!(alpha < zed);
        assert!(output.contains("    int b;\n\n    int a;\n};"));
    }

    #[test]
    fn test_field_summary_lists_only_documented_fields() {
        let source = "struct S {\n\t// Documented\n\tint a;\n\tint b;\n};\n";
        let events = vec![
            event(DeclKind::Struct, "S", Access::NotApplicable, 1, 5),
            event(DeclKind::Field, "S::a", Access::Public, 3, 3).with_parent(DeclKind::Struct, "S"),
            event(DeclKind::Field, "S::b", Access::Public, 4, 4).with_parent(DeclKind::Struct, "S"),
        ];
        let output = render(source, events, &no_toc());
        assert!(output.contains("#### Member Variables\n\n* `a`  Documented\n\n"));
        assert!(!output.contains("* `b`"));
        assert!(!output.contains("### Field"));
    }

    #[test]
    fn test_undocumented_leaves_are_omitted() {
        let source = "void quiet();\n// Loud\nvoid loud();\n";
        let events = vec![
            event(DeclKind::Function, "quiet", Access::NotApplicable, 1, 1),
            event(DeclKind::Function, "loud", Access::NotApplicable, 3, 3),
        ];
        let output = render(source, events, &RenderOptions::default());
        assert!(output.contains("* [loud](#Function-loud)\n"));
        assert!(!output.contains("quiet"));
        assert!(output.contains("## Function `loud`\n\n```cpp\nvoid loud();\n```\n\nLoud\n\n"));
    }

    #[test]
    fn test_nested_container_uses_subheading_and_single_separator() {
        let source = "class Outer {\npublic:\n\tstruct Inner {\n\t\tint v;\n\t};\n};\n";
        let events = vec![
            event(DeclKind::Class, "Outer", Access::NotApplicable, 1, 6),
            event(DeclKind::Struct, "Outer::Inner", Access::Public, 3, 5)
                .with_parent(DeclKind::Class, "Outer"),
            event(DeclKind::Field, "Outer::Inner::v", Access::Public, 4, 4)
                .with_parent(DeclKind::Struct, "Outer::Inner"),
        ];
        let output = render(source, events, &RenderOptions::default());
        assert!(output.contains("* [Outer](#Class-Outer)\n    * [Inner](#Struct-Outer::Inner)\n"));
        assert!(output.contains("public:\n    struct Inner;\n};"), "{}", output);
        assert!(output.contains("### Struct `Outer::Inner`\n\n```cpp\nstruct Inner {\n    int v;\n};\n```"));
        assert_eq!(output.matches("\n---\n").count(), 2);
    }
}
