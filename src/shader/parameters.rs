//! Named shader parameters.
//!
//! A [`ParameterTable`] maps uniform names to typed default values. Shader
//! definitions carry one base table plus one extra table per feature; a
//! variant's table is the base merged with the tables of its active features.

use std::collections::BTreeMap;

use glam::{Mat4, Vec2, Vec3, Vec4};

/// A typed uniform value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    UInt(u32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    /// A sampler bound to a texture unit.
    Sampler(u32),
}

impl ParamValue {
    /// GLSL type name, used in debug output.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Bool(_) => "bool",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Mat4(_) => "mat4",
            Self::Sampler(_) => "sampler",
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec2> for ParamValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for ParamValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for ParamValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Mat4> for ParamValue {
    fn from(v: Mat4) -> Self {
        Self::Mat4(v)
    }
}

/// Ordered name → value map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterTable {
    entries: BTreeMap<String, ParamValue>,
}

impl ParameterTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.entries.insert(name.to_string(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every entry of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &ParameterTable) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), *value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Sampler parameters as `(name, unit)` pairs.
    pub fn samplers(&self) -> impl Iterator<Item = (&str, u32)> {
        self.iter().filter_map(|(name, value)| match value {
            ParamValue::Sampler(unit) => Some((name, *unit)),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a ParameterTable {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_existing_entries() {
        let mut base = ParameterTable::new()
            .with("u_shininess", 32.0)
            .with("u_diffuse", Vec3::ONE);
        let extra = ParameterTable::new()
            .with("u_shininess", 64.0)
            .with("u_normal_map", ParamValue::Sampler(1));

        base.merge(&extra);

        assert_eq!(base.len(), 3);
        assert_eq!(base.get("u_shininess"), Some(&ParamValue::Float(64.0)));
        assert_eq!(base.get("u_diffuse"), Some(&ParamValue::Vec3(Vec3::ONE)));
    }

    #[test]
    fn samplers_are_listed_by_name() {
        let table = ParameterTable::new()
            .with("u_albedo_map", ParamValue::Sampler(0))
            .with("u_opacity", 1.0)
            .with("u_shadow_map", ParamValue::Sampler(7));

        let samplers: Vec<_> = table.samplers().collect();
        assert_eq!(samplers, vec![("u_albedo_map", 0), ("u_shadow_map", 7)]);
    }
}
