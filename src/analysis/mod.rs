pub mod dependencies;
pub mod graph;

pub use dependencies::{DependencyAnalyzer, ReferenceKind, CategoryIndex, IdentifierIndex};
pub use graph::{Dependency, DependencyGraph, DependencyMetadata, Direction, GraphStats};
