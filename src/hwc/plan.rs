use {
    crate::hwc::{binding::Bound, layer::LayerData, resources::KmsPlane},
    smallvec::SmallVec,
    std::collections::VecDeque,
};

#[derive(Clone, Debug)]
pub struct PlanEntry {
    pub layer: LayerData,
    pub plane: Bound<KmsPlane>,
    pub zpos: u32,
}

/// An assignment of every layer of a frame to a hardware plane.
///
/// Holding a plan keeps its planes claimed.
#[derive(Clone, Debug, Default)]
pub struct CompositionPlan {
    pub entries: SmallVec<[PlanEntry; 4]>,
}

impl CompositionPlan {
    /// A plan that disables all planes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Maps `layers`, bottom-most first, onto `planes`, in order of
    /// preference.
    ///
    /// Planes are taken from the front of the pool. A plane that rejects a
    /// layer is discarded. Returns `None` if the pool runs out before every
    /// layer has been placed.
    pub fn create(layers: &[LayerData], planes: Vec<Bound<KmsPlane>>) -> Option<Self> {
        let mut pool = VecDeque::from(planes);
        let mut entries = SmallVec::new();
        for (zpos, layer) in layers.iter().enumerate() {
            let plane = loop {
                let plane = pool.pop_front()?;
                if plane.is_valid_for_layer(layer) {
                    break plane;
                }
            };
            entries.push(PlanEntry {
                layer: layer.clone(),
                plane,
                zpos: zpos as u32,
            });
        }
        Some(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests;
