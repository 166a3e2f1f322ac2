//! Declaration events reported by an AST provider and the categories used to
//! classify them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declaration kinds understood by the tree builder and renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Namespace,
    Class,
    ClassTemplate,
    Struct,
    Union,
    Enum,
    EnumConstant,
    Method,
    Function,
    FunctionTemplate,
    Constructor,
    Destructor,
    Field,
    Variable,
    Typedef,
    TypeAlias,
    TypeAliasTemplate,
    Using,
    UsingDirective,
    Other,
}

impl DeclKind {
    /// Class kinds, whose members default to private access
    pub fn is_class(self) -> bool {
        matches!(self, DeclKind::Class | DeclKind::ClassTemplate)
    }

    /// Kinds that can own nested declarations
    pub fn is_container(self) -> bool {
        matches!(
            self,
            DeclKind::Class
                | DeclKind::ClassTemplate
                | DeclKind::Struct
                | DeclKind::Union
                | DeclKind::Enum
                | DeclKind::EnumConstant
        )
    }

    pub fn is_function(self) -> bool {
        matches!(
            self,
            DeclKind::Method
                | DeclKind::Function
                | DeclKind::FunctionTemplate
                | DeclKind::Constructor
                | DeclKind::Destructor
        )
    }

    /// Kinds that become nodes in the declaration tree
    pub fn is_documentable(self) -> bool {
        self.is_container()
            || self.is_function()
            || matches!(
                self,
                DeclKind::Field
                    | DeclKind::Variable
                    | DeclKind::Typedef
                    | DeclKind::TypeAlias
                    | DeclKind::TypeAliasTemplate
                    | DeclKind::Using
            )
    }

    /// Category label used in headings and anchors, `None` for kinds that are
    /// never printed
    pub fn label(self) -> Option<&'static str> {
        match self {
            DeclKind::Struct => Some("Struct"),
            DeclKind::Union => Some("Union"),
            DeclKind::Enum => Some("Enum"),
            DeclKind::EnumConstant => Some("Enum Constant"),
            DeclKind::Class | DeclKind::ClassTemplate => Some("Class"),
            DeclKind::Method | DeclKind::Function | DeclKind::FunctionTemplate => {
                Some("Function")
            }
            DeclKind::Constructor => Some("Constructor"),
            DeclKind::Destructor => Some("Destructor"),
            DeclKind::Using => Some("Using"),
            DeclKind::Typedef => Some("Typedef"),
            DeclKind::TypeAlias | DeclKind::TypeAliasTemplate => Some("Type Alias"),
            DeclKind::Variable => Some("Variable"),
            DeclKind::Field => Some("Field"),
            DeclKind::Namespace | DeclKind::UsingDirective | DeclKind::Other => None,
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "{:?}", self),
        }
    }
}

/// C++ member access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Protected,
    Private,
    NotApplicable,
}

impl Access {
    /// Access header emitted inside a member list
    pub fn header(self) -> Option<&'static str> {
        match self {
            Access::Public => Some("public:"),
            Access::Protected => Some("protected:"),
            Access::Private => Some("private:"),
            Access::NotApplicable => None,
        }
    }
}

/// Inclusive range of 1-based source lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Build a range, swapping the bounds if they arrive reversed
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn is_single_line(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// The declaration that lexically encloses an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentScope {
    pub kind: DeclKind,
    pub qualified_name: String,
}

/// One declaration reported by an AST provider, in depth-first document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationEvent {
    pub kind: DeclKind,

    /// Unqualified identifier, empty for anonymous entities
    pub name: String,

    /// Fully scoped identifier, e.g. `ns::Outer::Inner`
    pub qualified_name: String,

    pub access: Access,

    /// Full extent of the declaration, body included
    pub range: LineRange,

    /// Immediate lexical parent, `None` at file scope
    pub parent: Option<ParentScope>,

    /// False for declarations that come from included files
    pub in_main_file: bool,
}

impl DeclarationEvent {
    pub fn new(
        kind: DeclKind,
        qualified_name: impl Into<String>,
        access: Access,
        range: LineRange,
    ) -> Self {
        let qualified_name = qualified_name.into();
        let name = qualified_name
            .rsplit("::")
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            kind,
            name,
            qualified_name,
            access,
            range,
            parent: None,
            in_main_file: true,
        }
    }

    pub fn with_parent(mut self, kind: DeclKind, qualified_name: impl Into<String>) -> Self {
        self.parent = Some(ParentScope {
            kind,
            qualified_name: qualified_name.into(),
        });
        self
    }
}
