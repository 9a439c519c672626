//! Ordered registry of component types, their signature patterns and factories.

use std::fmt;

use tw_graph::{ComponentResult, Steppable};

use crate::error::PatternResult;
use crate::graph::SemanticNode;
use crate::pattern::SignaturePattern;

/// Builds a component from the semantic node its pattern anchored on.
pub type Factory = Box<dyn Fn(&SemanticNode) -> ComponentResult<Box<dyn Steppable>> + Send + Sync>;

pub struct CatalogEntry {
    pub component_type: String,
    pub patterns: Vec<SignaturePattern>,
    factory: Factory,
}

impl CatalogEntry {
    pub fn build(&self, node: &SemanticNode) -> ComponentResult<Box<dyn Steppable>> {
        (self.factory)(node)
    }
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("component_type", &self.component_type)
            .field("patterns", &self.patterns.len())
            .finish_non_exhaustive()
    }
}

/// Component types known to the matcher, in declaration order.
#[derive(Debug, Default)]
pub struct PatternCatalog {
    entries: Vec<CatalogEntry>,
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type. Every pattern is validated first.
    pub fn register<F>(
        &mut self,
        component_type: impl Into<String>,
        patterns: Vec<SignaturePattern>,
        factory: F,
    ) -> PatternResult<&mut Self>
    where
        F: Fn(&SemanticNode) -> ComponentResult<Box<dyn Steppable>> + Send + Sync + 'static,
    {
        for pattern in &patterns {
            pattern.validate()?;
        }
        self.entries.push(CatalogEntry {
            component_type: component_type.into(),
            patterns,
            factory: Box::new(factory),
        });
        Ok(self)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, component_type: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.component_type == component_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
