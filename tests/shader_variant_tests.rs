//! Shader Variant Tests
//!
//! Tests for:
//! - Legal flag-set enumeration under a whitelist and dependency graph
//! - Variant identity, naming and define injection
//! - Parameter table merging per feature
//! - Idempotent bulk linking
//! - Error taxonomy for illegal requests and broken sources

use std::collections::HashSet;
use std::sync::Arc;

use lantern::device::{GraphicsDevice, HeadlessDevice, ShaderStage};
use lantern::errors::LanternError;
use lantern::shader::{
    FeatureFlags, MemoryShaders, ParamValue, PhongFeatures, PhongShader, ShaderDefinition,
    ShaderDescriptor, ShaderFamily, ShaderLibrary,
};

fn phong_with_whitelist(whitelist: PhongFeatures) -> Arc<ShaderDefinition<PhongFeatures>> {
    let library = ShaderLibrary::embedded();
    let descriptor = PhongShader::descriptor().whitelist(whitelist);
    library
        .load(ShaderDescriptor {
            name: "phong_subset".to_string(),
            ..descriptor
        })
        .unwrap()
}

fn small_whitelist() -> PhongFeatures {
    PhongFeatures::USE_ALBEDO_MAP
        | PhongFeatures::USE_NORMAL_MAP
        | PhongFeatures::USE_HEIGHT_MAP
        | PhongFeatures::RECEIVE_SHADOWS
}

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn whitelist_with_height_requiring_normal_yields_twelve_sets() {
    let definition = phong_with_whitelist(small_whitelist());
    let sets = definition.legal_feature_sets();

    assert_eq!(sets.len(), 12, "sets: {sets:?}");
    assert!(sets.contains(&PhongFeatures::empty()));
    assert!(sets.contains(&small_whitelist()));
    assert!(sets.contains(&(PhongFeatures::USE_NORMAL_MAP | PhongFeatures::USE_HEIGHT_MAP)));
    for set in &sets {
        assert!(
            !set.contains(PhongFeatures::USE_HEIGHT_MAP) || set.contains(PhongFeatures::USE_NORMAL_MAP),
            "height without normal: {set:?}"
        );
    }
}

#[test]
fn every_enumerated_set_is_closed_and_whitelisted() {
    let descriptor = PhongShader::descriptor();
    let graph = &descriptor.graph;
    let sets = graph.enumerate(descriptor.whitelist);

    let unique: HashSet<u32> = sets.iter().map(|s| s.bits()).collect();
    assert_eq!(unique.len(), sets.len(), "duplicates in enumeration");

    for set in sets {
        assert_eq!(graph.closure(set), set, "{set:?} is not dependency-closed");
        assert!(descriptor.whitelist.contains(set));
        assert!(graph.is_legal(set, descriptor.whitelist));
    }
}

// ============================================================================
// Variant Identity
// ============================================================================

#[test]
fn same_set_returns_the_same_instance() {
    let definition = phong_with_whitelist(small_whitelist());
    let features = PhongFeatures::USE_ALBEDO_MAP | PhongFeatures::RECEIVE_SHADOWS;

    let a = definition.get_variant(features).unwrap();
    let b = definition.get_variant(features).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(definition.variant_count(), 1);
}

#[test]
fn distinct_sets_get_distinct_variants_and_names() {
    let definition = phong_with_whitelist(small_whitelist());
    let variants = definition.generate_all_variants().unwrap();

    let names: HashSet<&str> = variants.iter().map(|v| v.name()).collect();
    assert_eq!(names.len(), variants.len());
    for (i, a) in variants.iter().enumerate() {
        for b in &variants[i + 1..] {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
}

#[test]
fn concurrent_requests_share_one_variant() {
    let definition = phong_with_whitelist(small_whitelist());
    let features = PhongFeatures::USE_NORMAL_MAP | PhongFeatures::USE_HEIGHT_MAP;

    let variants: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| definition.get_variant(features).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(variants.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(definition.variant_count(), 1);
}

#[test]
fn variant_name_and_defines_follow_bit_order() {
    let definition = phong_with_whitelist(small_whitelist());
    let variant = definition
        .get_variant(PhongFeatures::RECEIVE_SHADOWS | PhongFeatures::USE_ALBEDO_MAP)
        .unwrap();

    assert_eq!(variant.name(), "phong_subset_USE_ALBEDO_MAP_RECEIVE_SHADOWS");
    assert_eq!(variant.base_name(), "phong_subset");
    assert_eq!(variant.defines(), &["USE_ALBEDO_MAP", "RECEIVE_SHADOWS"]);

    let fragment = variant.source(ShaderStage::Fragment).unwrap();
    let mut lines = fragment.lines();
    assert!(lines.next().unwrap().starts_with("#version"));
    assert_eq!(lines.next(), Some("#define USE_ALBEDO_MAP"));
    assert_eq!(lines.next(), Some("#define RECEIVE_SHADOWS"));
    assert!(!fragment.contains("#include"), "includes must be expanded");
}

#[test]
fn base_variant_has_no_suffix() {
    let definition = phong_with_whitelist(small_whitelist());
    let variant = definition.get_variant(PhongFeatures::empty()).unwrap();
    assert_eq!(variant.name(), "phong_subset");
    assert!(variant.defines().is_empty());
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn feature_parameters_are_merged_into_variants() {
    let definition = phong_with_whitelist(small_whitelist());

    let plain = definition.get_variant(PhongFeatures::empty()).unwrap();
    assert!(plain.parameters().contains("u_diffuse"));
    assert!(!plain.parameters().contains("u_albedo_map"));

    let mapped = definition
        .get_variant(PhongFeatures::USE_NORMAL_MAP | PhongFeatures::USE_HEIGHT_MAP)
        .unwrap();
    assert!(mapped.parameters().contains("u_normal_map"));
    assert!(mapped.parameters().contains("u_height_map"));
    assert!(matches!(
        mapped.parameters().get("u_parallax_scale"),
        Some(ParamValue::Float(_))
    ));
}

// ============================================================================
// Linking
// ============================================================================

#[test]
fn link_all_twice_links_only_new_variants() {
    let definition = phong_with_whitelist(small_whitelist());
    let mut device = HeadlessDevice::new();

    definition.get_variant(PhongFeatures::empty()).unwrap();
    definition.get_variant(PhongFeatures::USE_ALBEDO_MAP).unwrap();
    assert_eq!(definition.link_all_variants(&mut device).unwrap(), 2);
    assert_eq!(device.programs_linked(), 2);

    definition.generate_all_variants().unwrap();
    assert_eq!(definition.link_all_variants(&mut device).unwrap(), 10);
    assert_eq!(definition.link_all_variants(&mut device).unwrap(), 0);
    assert_eq!(device.programs_linked(), 12);
}

#[test]
fn linking_one_variant_is_idempotent() {
    let definition = phong_with_whitelist(small_whitelist());
    let mut device = HeadlessDevice::new();
    let variant = definition.get_variant(PhongFeatures::USE_ALBEDO_MAP).unwrap();

    let first = variant.link(&mut device).unwrap();
    let second = variant.link(&mut device).unwrap();
    assert_eq!(first, second);
    assert_eq!(device.programs_linked(), 1);
    assert_eq!(device.program_label(first), Some(variant.name()));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn request_outside_whitelist_is_rejected() {
    let definition = phong_with_whitelist(small_whitelist());
    let err = definition.get_variant(PhongFeatures::USE_PCF).unwrap_err();
    assert!(matches!(err, LanternError::FeatureOutsideWhitelist { .. }), "{err}");
    assert!(err.is_configuration_error());
    assert_eq!(definition.variant_count(), 0);
}

#[test]
fn missing_requirement_is_rejected() {
    let definition = phong_with_whitelist(small_whitelist());
    let err = definition.get_variant(PhongFeatures::USE_HEIGHT_MAP).unwrap_err();
    match err {
        LanternError::IllegalFeatureCombination { shader, reason, .. } => {
            assert_eq!(shader, "phong_subset");
            assert!(reason.contains("USE_NORMAL_MAP"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_source_names_the_file() {
    let library = ShaderLibrary::new(MemoryShaders::new().with("a.vert", "void main() {}"));
    let err = library
        .load(
            ShaderDescriptor::<PhongFeatures>::new("broken")
                .stage(ShaderStage::Vertex, "a.vert")
                .stage(ShaderStage::Fragment, "missing.frag"),
        )
        .unwrap_err();
    match err {
        LanternError::ShaderSourceNotFound { shader, path } => {
            assert_eq!(shader, "broken");
            assert_eq!(path, "missing.frag");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn compile_failure_carries_the_variant_name() {
    let library = ShaderLibrary::new(
        MemoryShaders::new()
            .with("s.vert", "#version 410 core\nvoid main() {}\n")
            .with(
                "s.frag",
                "#version 410 core\n#ifdef USE_ALPHA_TEST\n#error alpha test unsupported\n#endif\nvoid main() {}\n",
            ),
    );
    let definition = library
        .load(
            ShaderDescriptor::<PhongFeatures>::new("strict")
                .stage(ShaderStage::Vertex, "s.vert")
                .stage(ShaderStage::Fragment, "s.frag"),
        )
        .unwrap();
    let mut device = HeadlessDevice::new();

    // The recording device has no preprocessor: every `#error` line fails.
    let err = definition
        .get_variant(PhongFeatures::USE_ALPHA_TEST)
        .unwrap()
        .link(&mut device)
        .unwrap_err();
    match err {
        LanternError::ShaderCompileFailed { shader, stage, .. } => {
            assert_eq!(shader, "strict_USE_ALPHA_TEST");
            assert_eq!(stage, "fragment");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(device.programs_linked(), 0);
}

#[test]
fn feature_flags_blanket_impl_covers_families() {
    fn bits<F: FeatureFlags>(f: F) -> u32 {
        f.bits()
    }
    assert_eq!(bits(PhongFeatures::USE_PCF), 1 << 8);
}

#[test]
fn headless_device_is_object_safe_target() {
    let mut device = HeadlessDevice::new();
    let dynamic: &mut dyn GraphicsDevice = &mut device;
    let definition = phong_with_whitelist(small_whitelist());
    let program = definition
        .get_variant(PhongFeatures::empty())
        .unwrap()
        .link(dynamic)
        .unwrap();
    assert!(device.program_parameters(program).is_some());
}
