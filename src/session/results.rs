use std::collections::BTreeMap;

use crate::analysis::metrics::BurnMetrics;
use crate::analysis::physics::SetPressure;

/// Kinds of scalar results one calculator can hand to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CalcKind {
    Burn,
    MassFlow,
    CdA,
    SetPressure,
}

/// A cached result, tagged by what produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalcResult {
    Burn(BurnMetrics),
    /// kg/s
    MassFlow(f64),
    /// m²
    CdA(f64),
    SetPressure(SetPressure),
}

impl CalcResult {
    pub fn kind(&self) -> CalcKind {
        match self {
            CalcResult::Burn(_) => CalcKind::Burn,
            CalcResult::MassFlow(_) => CalcKind::MassFlow,
            CalcResult::CdA(_) => CalcKind::CdA,
            CalcResult::SetPressure(_) => CalcKind::SetPressure,
        }
    }
}

/// Last result of each calculator, used for copy-forward (ṁ → CdA → set pressure).
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: BTreeMap<CalcKind, CalcResult>,
}

impl ResultCache {
    pub fn store(&mut self, result: CalcResult) {
        self.entries.insert(result.kind(), result);
    }

    pub fn clear(&mut self, kind: CalcKind) {
        self.entries.remove(&kind);
    }

    pub fn burn(&self) -> Option<BurnMetrics> {
        match self.entries.get(&CalcKind::Burn) {
            Some(CalcResult::Burn(m)) => Some(*m),
            _ => None,
        }
    }

    pub fn mass_flow(&self) -> Option<f64> {
        match self.entries.get(&CalcKind::MassFlow) {
            Some(CalcResult::MassFlow(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn cda(&self) -> Option<f64> {
        match self.entries.get(&CalcKind::CdA) {
            Some(CalcResult::CdA(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn set_pressure(&self) -> Option<SetPressure> {
        match self.entries.get(&CalcKind::SetPressure) {
            Some(CalcResult::SetPressure(v)) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_replaces_by_kind() {
        let mut cache = ResultCache::default();
        cache.store(CalcResult::MassFlow(1.0));
        cache.store(CalcResult::MassFlow(2.0));
        cache.store(CalcResult::CdA(3e-6));
        assert_eq!(cache.mass_flow(), Some(2.0));
        assert_eq!(cache.cda(), Some(3e-6));
        assert!(cache.burn().is_none());

        cache.clear(CalcKind::MassFlow);
        assert!(cache.mass_flow().is_none());
        assert_eq!(cache.cda(), Some(3e-6));
    }
}
