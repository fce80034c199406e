use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Infinitely far light travelling along the node's -Z axis.
    Directional,
    Point { range: f32 },
    /// Cone along the node's -Z axis. Angles are half-angles in radians.
    Spot {
        range: f32,
        inner_cone: f32,
        outer_cone: f32,
    },
}

/// Light component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
    /// Only the first shadow-casting directional light gets a shadow map.
    pub cast_shadows: bool,
}

impl Light {
    #[must_use]
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Directional,
            cast_shadows: false,
        }
    }

    #[must_use]
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Point { range },
            cast_shadows: false,
        }
    }

    #[must_use]
    pub fn spot(color: Vec3, intensity: f32, range: f32, inner_cone: f32, outer_cone: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Spot {
                range,
                inner_cone,
                outer_cone,
            },
            cast_shadows: false,
        }
    }

    #[must_use]
    pub fn with_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }
}
