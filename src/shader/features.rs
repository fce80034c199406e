//! Feature Flag Sets
//!
//! A shader family declares its optional capabilities as a `bitflags` type
//! over `u32`. Each named single-bit flag is one **feature**; a value of the
//! type is a **flag set**. Bit position defines the canonical order used for
//! `#define` injection and variant names, so families declare their flags in
//! dependency order (a feature after everything it requires).
//!
//! ```rust,ignore
//! bitflags! {
//!     #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
//!     pub struct MyFeatures: u32 {
//!         const USE_MAP        = 1 << 0;
//!         const USE_NORMAL_MAP = 1 << 1;
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::hash::Hash;

use bitflags::Flags;

/// Fixed maximum number of features per family (width of the bit vector).
pub const MAX_FEATURES: u32 = u32::BITS;

/// Bound satisfied by every feature flag type.
pub trait FeatureFlags:
    Flags<Bits = u32> + Copy + Eq + Hash + Debug + Send + Sync + 'static
{
}

impl<T> FeatureFlags for T where
    T: Flags<Bits = u32> + Copy + Eq + Hash + Debug + Send + Sync + 'static
{
}

/// The single-bit feature at `position`, if the family names it.
#[must_use]
pub fn feature_at<F: FeatureFlags>(position: u32) -> Option<F> {
    if position >= MAX_FEATURES {
        return None;
    }
    let bit = 1u32 << position;
    F::FLAGS
        .iter()
        .find(|flag| flag.value().bits() == bit)
        .map(|flag| *flag.value())
}

/// Symbolic name of a single-bit feature (`USE_NORMAL_MAP`).
#[must_use]
pub fn symbol_of<F: FeatureFlags>(feature: F) -> Option<&'static str> {
    let bits = feature.bits();
    F::FLAGS
        .iter()
        .find(|flag| flag.value().bits() == bits)
        .map(|flag| flag.name())
}

/// Set bit positions in ascending order.
pub fn positions<F: FeatureFlags>(set: F) -> impl Iterator<Item = u32> {
    let bits = set.bits();
    (0..MAX_FEATURES).filter(move |pos| bits & (1u32 << *pos) != 0)
}

/// Single-bit features of `set` in ascending bit order.
pub fn features_of<F: FeatureFlags>(set: F) -> impl Iterator<Item = F> {
    positions(set).map(|pos| F::from_bits_retain(1 << pos))
}

/// Symbols of the active features in canonical (bit) order.
///
/// Bits with no declared name are skipped.
#[must_use]
pub fn active_symbols<F: FeatureFlags>(set: F) -> Vec<&'static str> {
    features_of(set).filter_map(symbol_of).collect()
}

/// Human readable `A|B|C` listing used in error messages and logs.
#[must_use]
pub fn describe<F: FeatureFlags>(set: F) -> String {
    if set.is_empty() {
        return "<none>".to_string();
    }
    features_of(set)
        .map(|feature| {
            symbol_of(feature).map_or_else(
                || format!("bit{}", feature.bits().trailing_zeros()),
                str::to_string,
            )
        })
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitflags::bitflags;

    bitflags! {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
        struct TestFeatures: u32 {
            const A = 1 << 0;
            const B = 1 << 1;
            const D = 1 << 3;
        }
    }

    #[test]
    fn feature_lookup_by_position() {
        assert_eq!(feature_at::<TestFeatures>(0), Some(TestFeatures::A));
        assert_eq!(feature_at::<TestFeatures>(3), Some(TestFeatures::D));
        assert_eq!(feature_at::<TestFeatures>(2), None);
        assert_eq!(feature_at::<TestFeatures>(40), None);
    }

    #[test]
    fn symbols_follow_bit_order() {
        let set = TestFeatures::D | TestFeatures::A;
        assert_eq!(active_symbols(set), vec!["A", "D"]);
        assert_eq!(describe(set), "A|D");
        assert_eq!(describe(TestFeatures::empty()), "<none>");
    }

    #[test]
    fn set_operations() {
        let ab = TestFeatures::A | TestFeatures::B;
        assert!(ab.contains(TestFeatures::A));
        assert_eq!(ab.difference(TestFeatures::A), TestFeatures::B);
        assert_eq!(ab.union(TestFeatures::D).bits(), 0b1011);
        assert_eq!(positions(ab).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn unnamed_bits_are_described_by_position() {
        let set = TestFeatures::from_bits_retain(1 << 5);
        assert_eq!(describe(set), "bit5");
        assert!(active_symbols(set).is_empty());
    }
}
