//! Forward Scene Demo
//!
//! Builds a small lit scene (ground plane, a row of boxes, a translucent
//! sphere, a sun and two point lights) and renders a few frames on the
//! recording device, printing per-pass statistics.
//!
//! Run with `RUST_LOG=lantern=debug` to see variant generation and attachment
//! allocation.
//!
//! Pass a settings file path as the first argument to override the defaults:
//!
//! ```text
//! cargo run --example forward_scene -- settings.json
//! ```

use anyhow::Context;
use glam::{Vec3, Vec4};

use lantern::resources::{MaterialKind, PhongMaterial};
use lantern::shader::PhongShader;
use lantern::{
    BlendMode, Camera, Engine, HeadlessDevice, Light, Material, Mesh, PlaneOptions,
    RendererSettings, SphereOptions, Texture, create_box, create_plane, create_sphere,
};

const FRAMES: usize = 3;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("lantern=info"))
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => RendererSettings::from_file(&path)
            .with_context(|| format!("loading settings from {path}"))?,
        None => RendererSettings::default(),
    };

    let mut engine = Engine::new(HeadlessDevice::new(), settings, 1280, 720)?;

    // Geometry
    let ground = engine.geometries.add(
        "ground",
        create_plane(&PlaneOptions {
            width: 40.0,
            depth: 40.0,
            ..Default::default()
        }),
    );
    let cube = engine.geometries.add("cube", create_box(1.0, 1.0, 1.0));
    let ball = engine.geometries.add(
        "ball",
        create_sphere(&SphereOptions {
            radius: 0.75,
            ..Default::default()
        }),
    );

    // Materials
    let phong = engine.library.get::<PhongShader>()?;
    let stone = engine.materials.add(Material::new(MaterialKind::Phong(
        PhongMaterial::new(phong.clone()).with_diffuse(Vec4::new(0.6, 0.6, 0.55, 1.0)),
    )));
    let paint = engine.materials.add(Material::new(MaterialKind::Phong(
        PhongMaterial::new(phong.clone()).with_diffuse(Vec4::new(0.8, 0.2, 0.1, 1.0)),
    )));
    let glass = engine.materials.add(
        Material::new(MaterialKind::Phong(
            PhongMaterial::new(phong).with_diffuse(Vec4::new(0.3, 0.6, 0.9, 0.4)),
        ))
        .with_blend(BlendMode::Translucent),
    );
    let emitter = engine.materials.add(Material::unlit(&engine.library)?);

    // Scene
    let scene = &mut engine.scene;

    let floor = scene.create_node("floor");
    let mut floor_mesh = Mesh::new(ground, stone);
    floor_mesh.cast_shadows = false;
    scene.set_mesh(floor, floor_mesh);

    for i in 0..5 {
        let node = scene.create_node(&format!("box_{i}"));
        scene.set_mesh(node, Mesh::new(cube, paint));
        if let Some(n) = scene.node_mut(node) {
            n.transform.position = Vec3::new(i as f32 * 2.5 - 5.0, 0.5, 0.0);
            n.transform.set_rotation_euler(0.0, i as f32 * 0.3, 0.0);
        }
    }

    let orb = scene.create_node("orb");
    scene.set_mesh(orb, Mesh::new(ball, glass));
    if let Some(n) = scene.node_mut(orb) {
        n.transform.position = Vec3::new(0.0, 1.5, 3.0);
    }

    let sun = scene.create_node("sun");
    scene.set_light(sun, Light::directional(Vec3::new(1.0, 0.95, 0.9), 3.0).with_shadows(true));
    if let Some(n) = scene.node_mut(sun) {
        n.transform.look_at(Vec3::new(-0.5, -1.0, -0.3), Vec3::Y);
    }

    for (name, position, color) in [
        ("lamp_warm", Vec3::new(-4.0, 2.0, 2.0), Vec3::new(1.0, 0.6, 0.3)),
        ("lamp_cool", Vec3::new(4.0, 2.0, 2.0), Vec3::new(0.3, 0.5, 1.0)),
    ] {
        let lamp = scene.create_node(name);
        scene.set_light(lamp, Light::point(color, 8.0, 10.0));
        let bulb = scene.create_child(&format!("{name}_bulb"), lamp);
        let mut bulb_mesh = Mesh::new(ball, emitter);
        bulb_mesh.cast_shadows = false;
        scene.set_mesh(bulb, bulb_mesh);
        if let Some(n) = scene.node_mut(lamp) {
            n.transform.position = position;
        }
        if let Some(n) = scene.node_mut(bulb) {
            n.transform.scale = Vec3::splat(0.2);
        }
    }

    let camera = scene.create_node("camera");
    scene.set_camera(camera, Camera::perspective(50.0, 1280.0 / 720.0, 0.1, 300.0));
    if let Some(n) = scene.node_mut(camera) {
        n.transform.position = Vec3::new(0.0, 6.0, 14.0);
        n.transform.look_at(Vec3::new(0.0, 0.5, 0.0), Vec3::Y);
    }

    let sky_format = engine.settings().color_format;
    engine.scene.skybox = Some(Texture::create_cube(&mut engine.device, "sky", 256, sky_format)?);

    // Frames
    for frame in 0..FRAMES {
        if frame == 1 {
            engine.resize(1920, 1080);
        }
        let stats = engine.frame()?;
        let total = stats.total();
        println!(
            "frame {}: shadow {} / main {} / post {} draws, {} program binds, {} state changes",
            stats.frame_index,
            stats.shadow.draw_calls,
            stats.main.draw_calls,
            stats.postprocess.draw_calls,
            total.program_binds,
            total.state_changes,
        );
    }

    println!(
        "{} variants cached, {} programs linked, {} live textures, {} frames presented",
        engine.library.variant_count(),
        engine.device.programs_linked(),
        engine.device.live_textures(),
        engine.device.frames_presented(),
    );
    Ok(())
}
