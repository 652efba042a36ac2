//! Clamped, regenerating resource meter
//!
//! Health and mana are both meters: a value that never leaves `[0, max]`.

use serde::{Deserialize, Serialize};

/// Result of applying damage to a meter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageReport {
    /// Amount actually removed after clamping at zero
    pub removed: f32,
    /// Meter is at zero after this call
    pub depleted: bool,
}

/// Result of damaging an entity that owns a health meter
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hit {
    /// Health actually removed
    pub removed: f32,
    /// This hit was the killing blow (reported once per entity)
    pub killed: bool,
}

/// A clamped scalar resource with passive regeneration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeter {
    current: f32,
    max: f32,
    /// Amount restored by each `regen()` call
    pub regen_rate: f32,
}

impl ResourceMeter {
    /// A full meter
    pub fn new(max: f32, regen_rate: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            regen_rate,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0.0
    }

    /// Passive regeneration, called once per tick
    pub fn regen(&mut self) {
        self.restore(self.regen_rate);
    }

    /// Add `amount`, clamped to max
    pub fn restore(&mut self, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        self.current = (self.current + amount).min(self.max);
    }

    /// Remove `amount` only if the meter holds at least that much
    ///
    /// Returns false and leaves the meter untouched otherwise.
    pub fn spend(&mut self, amount: f32) -> bool {
        if amount < 0.0 || amount > self.current {
            return false;
        }
        self.current -= amount;
        true
    }

    /// Remove up to `amount`, stopping at zero
    pub fn take_damage(&mut self, amount: f32) -> DamageReport {
        let amount = amount.max(0.0);
        let before = self.current;
        self.current = (self.current - amount).max(0.0);
        DamageReport {
            removed: before - self.current,
            depleted: self.current <= 0.0,
        }
    }

    /// Refill to max
    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// Change the maximum, keeping the current value inside the new bounds
    pub fn set_max(&mut self, max: f32) {
        self.max = max.max(0.0);
        self.current = self.current.min(self.max);
    }

    /// Fill level in [0, 1]
    pub fn fraction_remaining(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_spend_insufficient_is_noop() {
        let mut mana = ResourceMeter::new(50.0, 1.0);
        assert!(mana.spend(30.0));
        assert!(!mana.spend(30.0));
        assert_eq!(mana.current(), 20.0);
    }

    #[test]
    fn test_take_damage_reports_clamped_amount() {
        let mut health = ResourceMeter::new(100.0, 0.0);
        let first = health.take_damage(60.0);
        assert_eq!(first.removed, 60.0);
        assert!(!first.depleted);

        let second = health.take_damage(60.0);
        assert_eq!(second.removed, 40.0);
        assert!(second.depleted);
        assert_eq!(health.fraction_remaining(), 0.0);
    }

    #[test]
    fn test_regen_stops_at_max() {
        let mut mana = ResourceMeter::new(10.0, 4.0);
        mana.spend(5.0);
        mana.regen();
        assert_eq!(mana.current(), 9.0);
        mana.regen();
        assert_eq!(mana.current(), 10.0);
    }

    #[test]
    fn test_set_max_clamps_current() {
        let mut health = ResourceMeter::new(100.0, 0.0);
        health.set_max(80.0);
        assert_eq!(health.current(), 80.0);
        health.set_max(120.0);
        assert_eq!(health.current(), 80.0);
        assert!((health.fraction_remaining() - 80.0 / 120.0).abs() < 1e-6);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Spend(f32),
        Restore(f32),
        Regen,
        Damage(f32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-50.0f32..200.0).prop_map(Op::Spend),
            (-50.0f32..200.0).prop_map(Op::Restore),
            Just(Op::Regen),
            (-50.0f32..200.0).prop_map(Op::Damage),
        ]
    }

    proptest! {
        #[test]
        fn prop_meter_stays_in_bounds(
            max in 1.0f32..500.0,
            regen in 0.0f32..20.0,
            ops in prop::collection::vec(op(), 0..64),
        ) {
            let mut meter = ResourceMeter::new(max, regen);
            for op in ops {
                match op {
                    Op::Spend(a) => { meter.spend(a); }
                    Op::Restore(a) => meter.restore(a),
                    Op::Regen => meter.regen(),
                    Op::Damage(a) => { meter.take_damage(a); }
                }
                prop_assert!(meter.current() >= 0.0);
                prop_assert!(meter.current() <= meter.max());
                let f = meter.fraction_remaining();
                prop_assert!((0.0..=1.0).contains(&f));
            }
        }
    }
}
