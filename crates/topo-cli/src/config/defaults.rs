use topobuilder::engine::config::DEFAULT_LOOP_RANGE;
use topobuilder::engine::connectivity::equivalence::EquivalenceRelation;

pub struct DefaultsConfig {
    pub equivalence: EquivalenceRelation,
    pub limit: Option<usize>,
    pub loop_range: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            equivalence: EquivalenceRelation::LatticeRotation,
            limit: None,
            loop_range: DEFAULT_LOOP_RANGE,
        }
    }
}
