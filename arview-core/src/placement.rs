//! Placed model instances and the policies that decide what gets placed

use std::collections::VecDeque;
use std::rc::Rc;

use nalgebra::Point3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::{CapacityPolicy, SelectionPolicy};
use crate::host::NodeId;
use crate::registry::{ModelId, ModelRegistry, ModelTemplate};
use crate::transform::RotationState;

/// One copy of a template in the scene. Position is fixed at creation;
/// only the rotation changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedModel {
    pub node: NodeId,
    pub model: ModelId,
    position: Point3<f32>,
    pub rotation: RotationState,
}

impl PlacedModel {
    pub fn new(node: NodeId, model: ModelId, position: Point3<f32>) -> Self {
        Self {
            node,
            model,
            position,
            rotation: RotationState::zero(),
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }
}

/// Outcome of checking capacity before a placement
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Accept,
    /// Accept after removing this node
    Evict(NodeId),
    Reject,
}

/// Append-only (unless capped) collection of placed models, oldest first
#[derive(Debug, Default)]
pub struct Placements {
    models: VecDeque<PlacedModel>,
    max_models: Option<usize>,
    policy: Option<CapacityPolicy>,
}

impl Placements {
    pub fn new(max_models: Option<usize>, policy: CapacityPolicy) -> Self {
        Self {
            models: VecDeque::new(),
            max_models,
            policy: max_models.map(|_| policy),
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedModel> {
        self.models.iter()
    }

    /// Decide whether one more model fits, evicting the oldest if configured to.
    pub fn admit(&mut self) -> Admission {
        let (Some(max), Some(policy)) = (self.max_models, self.policy) else {
            return Admission::Accept;
        };
        if self.models.len() < max {
            return Admission::Accept;
        }
        match policy {
            CapacityPolicy::RejectNew => Admission::Reject,
            CapacityPolicy::EvictOldest => match self.models.pop_front() {
                Some(oldest) => Admission::Evict(oldest.node),
                None => Admission::Accept,
            },
        }
    }

    pub fn push(&mut self, model: PlacedModel) {
        self.models.push_back(model);
    }

    /// Advance every model's spin by `step` radians around the vertical axis
    pub fn spin_all(&mut self, step: f32) {
        for model in &mut self.models {
            model.rotation.spin(step);
        }
    }
}

/// Chooses which loaded template the next placement uses
#[derive(Debug)]
pub struct ModelPicker {
    policy: SelectionPolicy,
    rng: SmallRng,
    cursor: usize,
}

impl ModelPicker {
    pub fn new(policy: SelectionPolicy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            policy,
            rng,
            cursor: 0,
        }
    }

    /// Pick among loaded templates only; `None` while nothing has loaded.
    pub fn pick(&mut self, registry: &ModelRegistry) -> Option<Rc<ModelTemplate>> {
        match self.policy {
            SelectionPolicy::First => registry.loaded().next().cloned(),
            SelectionPolicy::Random => {
                let count = registry.loaded_count();
                if count == 0 {
                    return None;
                }
                let index = self.rng.gen_range(0..count);
                registry.loaded().nth(index).cloned()
            }
            SelectionPolicy::RoundRobin => {
                let ids: Vec<&ModelId> = registry.ids().collect();
                if ids.is_empty() {
                    return None;
                }
                for offset in 0..ids.len() {
                    let index = (self.cursor + offset) % ids.len();
                    if let Some(template) = registry.get(ids[index]) {
                        self.cursor = index + 1;
                        return Some(template);
                    }
                }
                None
            }
        }
    }
}
