//! Resource ledger and cost engine.
//!
//! The ledger is plain data. Affordability and payment are split on purpose:
//! callers check `can_afford` and then `pay_cost` with nothing in between.

use std::collections::BTreeMap;

use super::state::ResourceId;

pub type Resources = BTreeMap<ResourceId, f64>;

/// Exponential cost growth per building already owned.
pub const COST_SCALE: f64 = 1.15;

pub fn amount(resources: &Resources, id: ResourceId) -> f64 {
    resources.get(&id).copied().unwrap_or(0.0)
}

pub fn add(resources: &mut Resources, id: ResourceId, value: f64) {
    *resources.entry(id).or_insert(0.0) += value;
}

/// Add every entry of `other` into `resources`.
pub fn merge(resources: &mut Resources, other: &Resources) {
    for (id, value) in other {
        add(resources, *id, *value);
    }
}

/// Build a ledger from a static table.
pub fn from_table(table: &[(ResourceId, f64)]) -> Resources {
    let mut out = Resources::new();
    for (id, value) in table {
        add(&mut out, *id, *value);
    }
    out
}

/// True iff every positive cost entry is covered.
pub fn can_afford(resources: &Resources, cost: &Resources) -> bool {
    cost.iter()
        .filter(|(_, need)| **need > 0.0)
        .all(|(id, need)| amount(resources, *id) >= *need)
}

/// Subtract every positive cost entry. No overdraft protection.
pub fn pay_cost(resources: &mut Resources, cost: &Resources) {
    for (id, need) in cost {
        if *need > 0.0 {
            add(resources, *id, -need);
        }
    }
}

/// `ceil(base × 1.15^count)` per resource.
pub fn scaled_cost(base: &Resources, count: u32) -> Resources {
    let factor = COST_SCALE.powi(count as i32);
    base.iter()
        .map(|(id, value)| (*id, (value * factor).ceil()))
        .collect()
}

/// `"12 scrap, 4 wood"`.
pub fn describe_cost(cost: &Resources) -> String {
    let parts: Vec<String> = cost
        .iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|(id, v)| format!("{} {}", format_amount(*v), id.name()))
        .collect();
    if parts.is_empty() {
        "nothing".to_string()
    } else {
        parts.join(", ")
    }
}

/// Whole numbers print without a fraction, everything else with one decimal.
pub fn format_amount(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.1}", value)
    }
}
