//! Feature Dependency Graph & Variant Enumeration
//!
//! Declares, per feature, which features it requires and which it excludes,
//! and enumerates every legal flag set under a whitelist.
//!
//! A flag set is **legal** when:
//! 1. every set bit lies inside the whitelist,
//! 2. every set feature's transitive requirements are also set,
//! 3. no two set features exclude each other.
//!
//! Enumeration is an explicit depth-first search over bit positions. Each
//! stack frame decides one position; the "off" branch is always taken, the
//! "on" branch only when the position is whitelisted, the already-decided
//! requirements are present and no already-set feature excludes it. Leaves are
//! checked against the full legality rule, so requirements declared at higher
//! positions than their dependents are still honored.

use rustc_hash::FxHashMap;

use super::features::{FeatureFlags, MAX_FEATURES, describe, features_of};

/// Why a flag set is illegal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation<F> {
    /// Bits outside the whitelist.
    OutsideWhitelist(F),
    /// `feature` is set but `missing` (part of its closure) is not.
    MissingRequirement { feature: F, missing: F },
    /// Both features are set but exclude each other.
    Excluded { feature: F, conflict: F },
}

impl<F: FeatureFlags> Violation<F> {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::OutsideWhitelist(bits) => format!("{} not whitelisted", describe(*bits)),
            Self::MissingRequirement { feature, missing } => {
                format!("{} requires {}", describe(*feature), describe(*missing))
            }
            Self::Excluded { feature, conflict } => {
                format!("{} excludes {}", describe(*feature), describe(*conflict))
            }
        }
    }
}

/// Requirement / exclusion relations between the features of one family.
#[derive(Debug, Clone)]
pub struct FeatureGraph<F: FeatureFlags> {
    requires: FxHashMap<F, F>,
    excludes: FxHashMap<F, F>,
}

impl<F: FeatureFlags> Default for FeatureGraph<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FeatureFlags> FeatureGraph<F> {
    /// An empty graph: every whitelisted combination is legal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requires: FxHashMap::default(),
            excludes: FxHashMap::default(),
        }
    }

    /// Declares that each feature in `features` requires all of `requirements`.
    #[must_use]
    pub fn require(mut self, features: F, requirements: F) -> Self {
        for feature in features_of(features) {
            let entry = self.requires.entry(feature).or_insert_with(F::empty);
            entry.insert(requirements.difference(feature));
        }
        self
    }

    /// Declares that `a` and `b` can never be active together (symmetric).
    #[must_use]
    pub fn exclude(mut self, a: F, b: F) -> Self {
        for feature in features_of(a) {
            let entry = self.excludes.entry(feature).or_insert_with(F::empty);
            entry.insert(b.difference(feature));
        }
        for feature in features_of(b) {
            let entry = self.excludes.entry(feature).or_insert_with(F::empty);
            entry.insert(a.difference(feature));
        }
        self
    }

    /// Features directly required by a single feature.
    #[must_use]
    pub fn direct_requirements(&self, feature: F) -> F {
        self.requires.get(&feature).copied().unwrap_or_else(F::empty)
    }

    /// Features excluded by a single feature.
    #[must_use]
    pub fn exclusions(&self, feature: F) -> F {
        self.excludes.get(&feature).copied().unwrap_or_else(F::empty)
    }

    /// Every feature reachable through requirement edges from `set`,
    /// excluding `set` itself. Cycles terminate because visited bits are
    /// never pushed twice.
    #[must_use]
    pub fn transitive_requirements(&self, set: F) -> F {
        let mut visited = set;
        let mut found = F::empty();
        let mut stack: Vec<F> = features_of(set).collect();

        while let Some(feature) = stack.pop() {
            let direct = self.direct_requirements(feature);
            for required in features_of(direct) {
                if !visited.contains(required) {
                    visited.insert(required);
                    found.insert(required);
                    stack.push(required);
                }
            }
        }

        found
    }

    /// `set` plus all of its transitive requirements.
    #[must_use]
    pub fn closure(&self, set: F) -> F {
        set.union(self.transitive_requirements(set))
    }

    /// Checks `set` against the whitelist and the graph.
    pub fn validate(&self, set: F, whitelist: F) -> Result<(), Violation<F>> {
        let outside = set.difference(whitelist);
        if !outside.is_empty() {
            return Err(Violation::OutsideWhitelist(outside));
        }

        for feature in features_of(set) {
            let required = self.transitive_requirements(feature);
            let missing = required.difference(set);
            if !missing.is_empty() {
                return Err(Violation::MissingRequirement { feature, missing });
            }

            let conflict = self.exclusions(feature).intersection(set);
            if !conflict.is_empty() {
                return Err(Violation::Excluded { feature, conflict });
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn is_legal(&self, set: F, whitelist: F) -> bool {
        self.validate(set, whitelist).is_ok()
    }

    /// Enumerates every legal flag set under `whitelist`, sorted by bit value.
    #[must_use]
    pub fn enumerate(&self, whitelist: F) -> Vec<F> {
        let wl = whitelist.bits();
        let end = MAX_FEATURES - wl.leading_zeros();

        // Precompute per-position masks once.
        let mut required = [0u32; MAX_FEATURES as usize];
        let mut excluded = [0u32; MAX_FEATURES as usize];
        for pos in 0..end {
            let feature = F::from_bits_retain(1 << pos);
            required[pos as usize] = self.transitive_requirements(feature).bits();
            excluded[pos as usize] = self.exclusions(feature).bits();
        }

        let mut results = Vec::new();
        let mut stack: Vec<(u32, u32)> = vec![(0, 0)];

        while let Some((pos, bits)) = stack.pop() {
            if pos >= end {
                let set = F::from_bits_retain(bits);
                if self.is_legal(set, whitelist) {
                    results.push(set);
                }
                continue;
            }

            stack.push((pos + 1, bits));

            let bit = 1u32 << pos;
            if wl & bit == 0 {
                continue;
            }

            let decided = bit - 1;
            let needed = required[pos as usize] & decided;
            let blocked = excluded[pos as usize] & bits;
            if bits & needed == needed && blocked == 0 {
                stack.push((pos + 1, bits | bit));
            }
        }

        results.sort_by_key(|set| set.bits());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitflags::bitflags;

    bitflags! {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
        struct Feat: u32 {
            const A = 1 << 0;
            const B = 1 << 1;
            const C = 1 << 2;
            const D = 1 << 3;
        }
    }

    #[test]
    fn empty_graph_enumerates_power_set() {
        let graph = FeatureGraph::<Feat>::new();
        let sets = graph.enumerate(Feat::A | Feat::C | Feat::D);
        assert_eq!(sets.len(), 8);
        assert!(sets.iter().all(|s| !s.contains(Feat::B)));
    }

    #[test]
    fn empty_whitelist_yields_only_empty_set() {
        let graph = FeatureGraph::<Feat>::new().require(Feat::B, Feat::A);
        assert_eq!(graph.enumerate(Feat::empty()), vec![Feat::empty()]);
    }

    #[test]
    fn transitive_requirements_follow_chains() {
        let graph = FeatureGraph::new()
            .require(Feat::C, Feat::B)
            .require(Feat::B, Feat::A);
        assert_eq!(graph.transitive_requirements(Feat::C), Feat::A | Feat::B);
        assert_eq!(graph.closure(Feat::C), Feat::A | Feat::B | Feat::C);
    }

    #[test]
    fn cycles_terminate() {
        let graph = FeatureGraph::new()
            .require(Feat::A, Feat::B)
            .require(Feat::B, Feat::A);
        assert_eq!(graph.transitive_requirements(Feat::A), Feat::B);

        let sets = graph.enumerate(Feat::A | Feat::B);
        assert_eq!(sets, vec![Feat::empty(), Feat::A | Feat::B]);
    }

    #[test]
    fn requirement_at_higher_position_is_still_enforced() {
        // A (bit 0) requires D (bit 3): pruning cannot see D yet, the leaf
        // check must reject {A} alone.
        let graph = FeatureGraph::new().require(Feat::A, Feat::D);
        let sets = graph.enumerate(Feat::A | Feat::D);
        assert_eq!(sets, vec![Feat::empty(), Feat::D, Feat::A | Feat::D]);
    }

    #[test]
    fn exclusions_are_symmetric() {
        let graph = FeatureGraph::new().exclude(Feat::A, Feat::B);
        assert_eq!(graph.exclusions(Feat::B), Feat::A);
        let sets = graph.enumerate(Feat::A | Feat::B);
        assert_eq!(sets, vec![Feat::empty(), Feat::A, Feat::B]);
    }

    #[test]
    fn validate_reports_the_cause() {
        let graph = FeatureGraph::new()
            .require(Feat::C, Feat::B)
            .exclude(Feat::A, Feat::D);
        let whitelist = Feat::A | Feat::B | Feat::C;

        assert_eq!(
            graph.validate(Feat::D, whitelist),
            Err(Violation::OutsideWhitelist(Feat::D))
        );
        assert_eq!(
            graph.validate(Feat::C, whitelist),
            Err(Violation::MissingRequirement {
                feature: Feat::C,
                missing: Feat::B
            })
        );
        assert_eq!(
            graph.validate(Feat::A | Feat::D, Feat::all()),
            Err(Violation::Excluded {
                feature: Feat::A,
                conflict: Feat::D
            })
        );
        assert!(graph.validate(Feat::B | Feat::C, whitelist).is_ok());
    }

    #[test]
    fn self_requirement_is_ignored() {
        let graph = FeatureGraph::new().require(Feat::A | Feat::B, Feat::A);
        assert_eq!(graph.direct_requirements(Feat::A), Feat::empty());
        assert_eq!(graph.direct_requirements(Feat::B), Feat::A);
    }
}
