//! Frame Swap Data (Extract Phase)
//!
//! Before rendering, the logic tick walks the scene and copies out the compact
//! per-frame data the render tick needs. Once extraction is done the scene can
//! be mutated again; nothing in here borrows from it.
//!
//! - Only plain values and handles are copied, never meshes or materials
//! - Light arrays are bounded by the parameter block sizes; overflow is
//!   dropped with a warning
//! - The instance is reused every frame to keep its allocations

use glam::{Mat4, Vec3};

use super::shadow_utils::{self, MAX_CASCADES};
use super::uniforms::{MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS};
use crate::resources::{GeometryHandle, MaterialHandle, Texture};
use crate::scene::{Camera, LightKind, Scene};
use crate::settings::RendererSettings;

/// Camera matrices and clip parameters for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl CameraData {
    #[must_use]
    pub fn new(camera: &Camera, view: Mat4, position: Vec3) -> Self {
        let projection = camera.projection_matrix();
        Self {
            view,
            projection,
            view_projection: projection * view,
            position,
            near: camera.near,
            far: camera.far,
            aspect: camera.aspect,
        }
    }
}

impl Default for CameraData {
    /// A default camera at the origin looking down -Z.
    fn default() -> Self {
        Self::new(&Camera::default(), Mat4::IDENTITY, Vec3::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLightData {
    /// Direction the light travels, normalized.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightData {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLightData {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    /// Cosines of the inner and outer half-angles.
    pub cos_inner: f32,
    pub cos_outer: f32,
}

/// One main-pass draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEntry {
    pub material: MaterialHandle,
    pub geometry: GeometryHandle,
    pub model: Mat4,
    pub cast_shadows: bool,
    /// Squared distance from the camera (translucent sorting).
    pub distance_sq: f32,
}

/// One shadow-pass draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCaster {
    pub geometry: GeometryHandle,
    pub model: Mat4,
}

/// Shadow camera data of the shadow-casting directional light.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowData {
    pub light_direction: Vec3,
    pub cascade_count: u32,
    pub splits: [f32; MAX_CASCADES as usize],
    pub view_projections: [Mat4; MAX_CASCADES as usize],
    pub casters: Vec<ShadowCaster>,
}

/// Value snapshot handed from the logic tick to the render tick.
#[derive(Debug, Clone, Default)]
pub struct FrameSwapData {
    pub frame_index: u64,
    pub camera: CameraData,
    pub ambient: Vec3,
    pub directional_lights: Vec<DirectionalLightData>,
    pub point_lights: Vec<PointLightData>,
    pub spot_lights: Vec<SpotLightData>,
    pub draws: Vec<DrawEntry>,
    pub skybox: Option<Texture>,
    /// `None` when shadows are disabled or no directional light casts them.
    pub shadow: Option<ShadowData>,
}

impl FrameSwapData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the snapshot, keeping allocations.
    pub fn clear(&mut self) {
        self.camera = CameraData::default();
        self.ambient = Vec3::ZERO;
        self.directional_lights.clear();
        self.point_lights.clear();
        self.spot_lights.clear();
        self.draws.clear();
        self.skybox = None;
        self.shadow = None;
    }

    /// Clears and repopulates from `scene`.
    ///
    /// World matrices must be up to date (see
    /// [`Scene::update_world_matrices`]).
    pub fn extract(&mut self, scene: &Scene, settings: &RendererSettings) {
        self.clear();
        self.frame_index += 1;

        self.extract_camera(scene);
        self.ambient = Vec3::from(settings.ambient) + scene.ambient;
        self.skybox = scene.skybox;
        let shadow_light = self.extract_lights(scene);
        self.extract_draws(scene);

        if settings.shadow.enabled
            && let Some(direction) = shadow_light
        {
            self.extract_shadow(direction, settings);
        }

        log::trace!(
            "Frame {}: {} draws, {}/{}/{} lights, shadow: {}",
            self.frame_index,
            self.draws.len(),
            self.directional_lights.len(),
            self.point_lights.len(),
            self.spot_lights.len(),
            self.shadow.is_some()
        );
    }

    /// Number of draws the shadow pass will submit.
    #[must_use]
    pub fn shadow_caster_count(&self) -> usize {
        self.shadow.as_ref().map_or(0, |s| s.casters.len())
    }

    fn extract_camera(&mut self, scene: &Scene) {
        match scene.active_camera() {
            Some((camera, world)) => {
                self.camera = CameraData::new(
                    camera,
                    Camera::view_matrix(world),
                    Camera::position(world),
                );
            }
            None => log::warn!("Scene has no active camera, using the default view"),
        }
    }

    /// Fills the bounded light arrays and returns the direction of the first
    /// shadow-casting directional light that fit.
    fn extract_lights(&mut self, scene: &Scene) -> Option<Vec3> {
        let mut shadow_light = None;
        let mut dropped = 0usize;

        for (_, light, world) in scene.active_lights() {
            let position = Vec3::from(world.translation);
            let forward = shadow_utils::safe_light_direction(world.transform_vector3(-Vec3::Z));

            match light.kind {
                LightKind::Directional => {
                    if self.directional_lights.len() >= MAX_DIRECTIONAL_LIGHTS {
                        dropped += 1;
                        continue;
                    }
                    if light.cast_shadows && shadow_light.is_none() {
                        shadow_light = Some(forward);
                    }
                    self.directional_lights.push(DirectionalLightData {
                        direction: forward,
                        color: light.color,
                        intensity: light.intensity,
                    });
                }
                LightKind::Point { range } => {
                    if self.point_lights.len() >= MAX_POINT_LIGHTS {
                        dropped += 1;
                        continue;
                    }
                    self.point_lights.push(PointLightData {
                        position,
                        color: light.color,
                        intensity: light.intensity,
                        range,
                    });
                }
                LightKind::Spot {
                    range,
                    inner_cone,
                    outer_cone,
                } => {
                    if self.spot_lights.len() >= MAX_SPOT_LIGHTS {
                        dropped += 1;
                        continue;
                    }
                    self.spot_lights.push(SpotLightData {
                        position,
                        direction: forward,
                        color: light.color,
                        intensity: light.intensity,
                        range,
                        cos_inner: inner_cone.cos(),
                        cos_outer: outer_cone.cos(),
                    });
                }
            }
        }

        if dropped > 0 {
            log::warn!("Light arrays are full, {dropped} light(s) ignored this frame");
        }
        shadow_light
    }

    fn extract_draws(&mut self, scene: &Scene) {
        let camera_position = self.camera.position;
        for (_, mesh, world) in scene.visible_meshes() {
            let model = Mat4::from(*world);
            let distance_sq = Vec3::from(world.translation).distance_squared(camera_position);
            self.draws.push(DrawEntry {
                material: mesh.material,
                geometry: mesh.geometry,
                model,
                cast_shadows: mesh.cast_shadows,
                distance_sq,
            });
        }
    }

    fn extract_shadow(&mut self, light_direction: Vec3, settings: &RendererSettings) {
        let cascades = shadow_utils::build_directional_cascades(
            light_direction,
            &self.camera.projection,
            &self.camera.view,
            self.camera.near,
            self.camera.far,
            &settings.shadow,
            settings.shadow.max_distance,
        );

        let casters = self
            .draws
            .iter()
            .filter(|d| d.cast_shadows)
            .map(|d| ShadowCaster {
                geometry: d.geometry,
                model: d.model,
            })
            .collect();

        self.shadow = Some(ShadowData {
            light_direction,
            cascade_count: cascades.count,
            splits: cascades.splits,
            view_projections: cascades.view_projections,
            casters,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::primitives::create_box;
    use crate::resources::{GeometryStore, Material, MaterialStore};
    use crate::scene::{Light, Mesh};
    use crate::shader::ShaderLibrary;

    fn scene_with_meshes(count: usize) -> Scene {
        let library = ShaderLibrary::embedded();
        let mut materials = MaterialStore::new();
        let mut geometries = GeometryStore::new();
        let material = materials.add(Material::unlit(&library).unwrap());
        let geometry = geometries.add("box", create_box(1.0, 1.0, 1.0));

        let mut scene = Scene::new();
        let camera = scene.create_node("camera");
        scene.set_camera(camera, Camera::default());
        for i in 0..count {
            let node = scene.create_node(&format!("mesh{i}"));
            scene.node_mut(node).unwrap().transform.position = Vec3::new(0.0, 0.0, -(i as f32) - 1.0);
            scene.set_mesh(node, Mesh::new(geometry, material));
        }
        scene
    }

    #[test]
    fn extraction_clears_previous_frame() {
        let mut scene = scene_with_meshes(3);
        scene.update_world_matrices();
        let settings = RendererSettings::default();

        let mut swap = FrameSwapData::new();
        swap.extract(&scene, &settings);
        assert_eq!(swap.draws.len(), 3);
        swap.extract(&scene, &settings);
        assert_eq!(swap.draws.len(), 3);
        assert_eq!(swap.frame_index, 2);
    }

    #[test]
    fn light_overflow_is_dropped() {
        let mut scene = scene_with_meshes(0);
        for i in 0..MAX_POINT_LIGHTS + 3 {
            let node = scene.create_node(&format!("light{i}"));
            scene.set_light(node, Light::point(Vec3::ONE, 1.0, 10.0));
        }
        scene.update_world_matrices();

        let mut swap = FrameSwapData::new();
        swap.extract(&scene, &RendererSettings::default());
        assert_eq!(swap.point_lights.len(), MAX_POINT_LIGHTS);
    }

    #[test]
    fn shadow_data_needs_a_casting_directional_light() {
        let mut scene = scene_with_meshes(2);
        let sun = scene.create_node("sun");
        scene.set_light(sun, Light::directional(Vec3::ONE, 3.0));
        scene.update_world_matrices();

        let mut settings = RendererSettings::default();
        let mut swap = FrameSwapData::new();
        swap.extract(&scene, &settings);
        assert!(swap.shadow.is_none());

        *scene.light_mut(sun).unwrap() = Light::directional(Vec3::ONE, 3.0).with_shadows(true);
        swap.extract(&scene, &settings);
        assert_eq!(swap.shadow_caster_count(), 2);
        let shadow = swap.shadow.as_ref().unwrap();
        assert_eq!(shadow.cascade_count, settings.shadow.effective_cascades());

        settings.shadow.enabled = false;
        swap.extract(&scene, &settings);
        assert!(swap.shadow.is_none());
    }

    #[test]
    fn non_casting_meshes_are_skipped_by_shadows() {
        let mut scene = scene_with_meshes(3);
        let first = scene
            .visible_meshes()
            .map(|(handle, _, _)| handle)
            .next()
            .unwrap();
        scene.mesh_mut(first).unwrap().cast_shadows = false;
        let sun = scene.create_node("sun");
        scene.set_light(sun, Light::directional(Vec3::ONE, 1.0).with_shadows(true));
        scene.update_world_matrices();

        let mut swap = FrameSwapData::new();
        swap.extract(&scene, &RendererSettings::default());
        assert_eq!(swap.draws.len(), 3);
        assert_eq!(swap.shadow_caster_count(), 2);
    }
}
