use crate::properties::{DistributionSpec, OrderSpec, PhysicalProp, RewindabilitySpec};

/// All physical properties.
#[derive(Hash, Debug, Clone, Eq, PartialEq, Default)]
pub struct PhysicalPropertySet {
    distribution: DistributionSpec,
    order: OrderSpec,
    rewindability: RewindabilitySpec,
}

impl PhysicalPropertySet {
    pub fn new(
        distribution: DistributionSpec,
        order: OrderSpec,
        rewindability: RewindabilitySpec,
    ) -> Self {
        Self {
            distribution,
            order,
            rewindability,
        }
    }

    pub fn with_distribution(mut self, distribution: DistributionSpec) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order = order;
        self
    }

    pub fn distribution(&self) -> &DistributionSpec {
        &self.distribution
    }

    pub fn order(&self) -> &OrderSpec {
        &self.order
    }

    pub fn rewindability(&self) -> RewindabilitySpec {
        self.rewindability
    }
}

impl PhysicalProp for PhysicalPropertySet {
    fn satisfies(&self, required: &Self) -> bool {
        self.distribution.satisfies(&required.distribution)
            && self.order.satisfies(&required.order)
            && self.rewindability.satisfies(&required.rewindability)
    }
}
