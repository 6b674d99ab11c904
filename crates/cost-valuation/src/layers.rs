//! Cost layers for the FIFO and LIFO policies.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One unconsumed entry tranche: units left and the cost they entered at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLayer {
    pub remaining_units: Decimal,
    pub unit_cost: Decimal,
}

impl CostLayer {
    pub fn new(remaining_units: Decimal, unit_cost: Decimal) -> Self {
        Self {
            remaining_units,
            unit_cost,
        }
    }

    pub fn value(&self) -> Decimal {
        self.remaining_units * self.unit_cost
    }
}

/// End of the layer sequence that withdrawals consume from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeFrom {
    /// Oldest layer first (FIFO).
    Head,
    /// Newest layer first (LIFO).
    Tail,
}

/// Ordered layers, oldest at the head.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerStack {
    layers: VecDeque<CostLayer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: CostLayer) {
        self.layers.push_back(layer);
    }

    /// Units held across all layers.
    pub fn total_units(&self) -> Decimal {
        self.layers.iter().map(|l| l.remaining_units).sum()
    }

    pub fn total_value(&self) -> Decimal {
        self.layers.iter().map(CostLayer::value).sum()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Remove `quantity` units from the chosen end and return their value.
    ///
    /// A layer holding more than what is still needed shrinks in place; a
    /// layer holding less or exactly that much is removed. Returns `None`
    /// without touching any layer when the stack holds fewer than `quantity`
    /// units.
    pub fn consume(&mut self, quantity: Decimal, from: ConsumeFrom) -> Option<Decimal> {
        if quantity > self.total_units() {
            return None;
        }
        let mut outstanding = quantity;
        let mut value = Decimal::ZERO;
        while outstanding > Decimal::ZERO {
            let layer = match from {
                ConsumeFrom::Head => self.layers.front_mut(),
                ConsumeFrom::Tail => self.layers.back_mut(),
            }?;
            if layer.remaining_units > outstanding {
                value += outstanding * layer.unit_cost;
                layer.remaining_units -= outstanding;
                outstanding = Decimal::ZERO;
            } else {
                value += layer.value();
                outstanding -= layer.remaining_units;
                match from {
                    ConsumeFrom::Head => self.layers.pop_front(),
                    ConsumeFrom::Tail => self.layers.pop_back(),
                };
            }
        }
        Some(value)
    }

    pub fn into_vec(self) -> Vec<CostLayer> {
        self.layers.into()
    }
}
