//! Model registry: a fixed set of slots filled once by the asset loader

use std::fmt;
use std::rc::Rc;

use crate::config::ModelSpec;
use crate::error::{Result, ViewerError};
use crate::geometry::Mesh;

/// Identifier of a model slot, e.g. `fast-charger`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A loaded, pre-scaled mesh shared by every placement of it
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTemplate {
    pub id: ModelId,
    pub mesh: Mesh,
    pub scale: f32,
}

impl ModelTemplate {
    /// Bake `scale` into the geometry
    pub fn new(id: ModelId, mesh: &Mesh, scale: f32) -> Self {
        Self {
            id,
            mesh: mesh.scaled(scale),
            scale,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Slot {
    Pending,
    Loaded(Rc<ModelTemplate>),
    Failed(String),
}

impl Slot {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Slot::Pending)
    }
}

/// Loading indicator shown next to each model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadIndicator {
    Progress(f32),
    Hidden,
}

#[derive(Debug, Clone)]
struct Entry {
    id: ModelId,
    url: String,
    slot: Slot,
}

/// Slots in configured order. A slot settles exactly once; loaded templates
/// are only ever read and cloned afterwards.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: Vec<Entry>,
}

impl ModelRegistry {
    pub fn new(models: &[ModelSpec]) -> Self {
        Self {
            entries: models
                .iter()
                .map(|spec| Entry {
                    id: ModelId::new(spec.id.as_str()),
                    url: spec.url.clone(),
                    slot: Slot::Pending,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers and asset urls, in configured order
    pub fn sources(&self) -> impl Iterator<Item = (&ModelId, &str)> {
        self.entries.iter().map(|e| (&e.id, e.url.as_str()))
    }

    pub fn url(&self, id: &ModelId) -> Option<&str> {
        self.entry(id).map(|e| e.url.as_str())
    }

    pub fn slot(&self, id: &ModelId) -> Option<&Slot> {
        self.entry(id).map(|e| &e.slot)
    }

    pub fn get(&self, id: &ModelId) -> Option<Rc<ModelTemplate>> {
        match self.slot(id)? {
            Slot::Loaded(template) => Some(Rc::clone(template)),
            _ => None,
        }
    }

    /// Loaded templates in configured order; failed and pending slots are skipped
    pub fn loaded(&self) -> impl Iterator<Item = &Rc<ModelTemplate>> {
        self.entries.iter().filter_map(|e| match &e.slot {
            Slot::Loaded(template) => Some(template),
            _ => None,
        })
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded().count()
    }

    /// Ids in configured order, used by round-robin selection
    pub fn ids(&self) -> impl Iterator<Item = &ModelId> {
        self.entries.iter().map(|e| &e.id)
    }

    pub fn insert(&mut self, template: ModelTemplate) -> Result<Rc<ModelTemplate>> {
        let entry = self.pending_entry(&template.id)?;
        let template = Rc::new(template);
        entry.slot = Slot::Loaded(Rc::clone(&template));
        Ok(template)
    }

    pub fn mark_failed(&mut self, id: &ModelId, reason: impl Into<String>) -> Result<()> {
        let entry = self.pending_entry(id)?;
        entry.slot = Slot::Failed(reason.into());
        Ok(())
    }

    fn entry(&self, id: &ModelId) -> Option<&Entry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    fn pending_entry(&mut self, id: &ModelId) -> Result<&mut Entry> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| ViewerError::UnknownModel(id.to_string()))?;
        if entry.slot.is_settled() {
            return Err(ViewerError::SlotSettled(id.to_string()));
        }
        Ok(entry)
    }
}
