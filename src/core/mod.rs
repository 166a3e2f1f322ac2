// Declaration model and source text helpers
mod declaration;
mod lines;
mod comment;
mod signature;

// Tree construction and markdown rendering
mod tree;
mod renderer;

// AST providers
mod languages;

mod parser;
mod differ;
mod engine;

pub use declaration::{Access, DeclKind, DeclarationEvent, LineRange, ParentScope};
pub use lines::LineStore;
pub use comment::{extract_text, locate};
pub use signature::reconstruct;
pub use tree::{
    build_tree, DeclarationNode, DeclarationTree, IngestOutcome, NodeId, NodeSnapshot,
    SkipReason, TreeBuilder,
};
pub use renderer::{anchor, render_document, Document, DocumentRenderer, RenderOptions};
pub use languages::{provider_for, CppProvider, DeclarationProvider};
pub use parser::{CodeParser, ParsedHeader};
pub use differ::ContentDiffer;

// Export the main engine
pub use engine::{
    document_header, output_file_name, Engine, GenerateRequest, GenerateSummary, UnitReport,
    UnitStatus,
};
