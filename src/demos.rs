//! Built-in animated scenes.

use std::sync::Arc;

use crate::raytracing::camera::Camera;
use crate::raytracing::core::{Light, Scene, SceneObject};
use crate::raytracing::error::{SceneError, SceneResult};
use crate::raytracing::material::{Material, MaterialLibrary};
use crate::raytracing::render::SceneDirector;
use crate::raytracing::transform::TransformId;
use crate::raytracing::{Color, Quaternion, Vec3};

pub const NAMES: [&str; 5] = ["minimal", "spheres", "bounce", "cubes", "orbit"];

pub fn by_name(name: &str) -> SceneResult<Box<dyn SceneDirector>> {
    let director: Box<dyn SceneDirector> = match name {
        "minimal" => Box::<MinimalScene>::default(),
        "spheres" => Box::<SpheresScene>::default(),
        "bounce" => Box::<BounceScene>::default(),
        "cubes" => Box::<RotatingCubesScene>::default(),
        "orbit" => Box::<OrbitingScene>::default(),
        _ => return Err(SceneError::UnknownDemo(name.to_string())),
    };
    Ok(director)
}

fn preset(library: &MaterialLibrary, name: &str) -> SceneResult<Arc<Material>> {
    library
        .get(name)
        .ok_or_else(|| SceneError::UnknownMaterial(name.to_string()))
}

fn presets(library: &MaterialLibrary, names: &[&str]) -> SceneResult<Vec<Arc<Material>>> {
    names.iter().map(|name| preset(library, name)).collect()
}

fn setup_camera(camera: &mut Camera, position: Vec3, look_direction: Vec3, fov: f64) {
    *camera = Camera::new(position, look_direction, Vec3::y_axis(), fov);
}

fn add_light(scene: &mut Scene, position: Vec3, color: Color) {
    let light = Light::new(scene.transforms_mut(), position, color);
    scene.add_light(light);
}

fn add_floor(scene: &mut Scene, center: Vec3, side: f64, material: Arc<Material>) {
    let floor = SceneObject::plane(scene.transforms_mut(), center, side, side, material);
    scene.add_object(floor);
}

/// One bouncing sphere while the camera circles it.
#[derive(Debug, Default)]
pub struct MinimalScene {
    sphere: Option<TransformId>,
}

impl SceneDirector for MinimalScene {
    fn name(&self) -> &str {
        "minimal"
    }

    fn initialize(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        library: &MaterialLibrary,
    ) -> SceneResult<()> {
        setup_camera(camera, Vec3::new(0.0, 2.0, -8.0), Vec3::z_axis(), 75.0);
        add_light(scene, Vec3::new(5.0, 5.0, -5.0), Color::one());
        add_floor(scene, Vec3::new(0.0, -1.0, 5.0), 20.0, preset(library, "white_plastic")?);

        let sphere = SceneObject::sphere(
            scene.transforms_mut(),
            Vec3::new(0.0, 2.0, 5.0),
            2.0,
            preset(library, "emerald")?,
        );
        self.sphere = Some(scene.add_object(sphere));
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, camera: &mut Camera, frame: u64, _delta_time: f64) {
        let time = frame as f64 * 0.1;
        if let Some(sphere) = self.sphere {
            let bounce_height = time.sin().abs() * 2.0;
            scene
                .transforms_mut()
                .set_world_position(sphere, Vec3::new(0.0, 1.0 + bounce_height, 5.0));
        }

        let angle = time * 0.2;
        let radius = 8.0;
        camera.position = Vec3::new(angle.cos() * radius, 2.0, angle.sin() * radius - 3.0);
        camera.point_at(Vec3::new(0.0, 1.0, 5.0));
    }
}

/// A 7x7 grid of spheres rippling in a wave.
#[derive(Debug, Default)]
pub struct SpheresScene {
    /// transform, radius, resting x and z
    spheres: Vec<(TransformId, f64, f64, f64)>,
}

impl SceneDirector for SpheresScene {
    fn name(&self) -> &str {
        "spheres"
    }

    fn initialize(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        library: &MaterialLibrary,
    ) -> SceneResult<()> {
        setup_camera(camera, Vec3::new(0.0, 5.0, -15.0), Vec3::z_axis(), 60.0);
        add_light(scene, Vec3::new(5.0, 10.0, -5.0), Color::new(0.9, 0.9, 1.0));
        add_light(scene, Vec3::new(-8.0, 3.0, -3.0), Color::new(0.4, 0.4, 0.6));
        add_floor(scene, Vec3::new(0.0, -2.0, 10.0), 50.0, preset(library, "white_plastic")?);

        let materials = presets(
            library,
            &["ruby", "gold", "silver", "emerald", "glass", "chrome"],
        )?;
        let (rows, cols) = (7, 7);
        let spacing = 3.0;
        let start_x = -((cols - 1) as f64) * spacing / 2.0;
        let start_z = 5.0;
        for row in 0..rows {
            for col in 0..cols {
                let x = start_x + col as f64 * spacing;
                let z = start_z + row as f64 * spacing;
                let radius = 0.4 + ((row + col) % 3) as f64 * 0.2;
                let material = materials[(row + col) % materials.len()].clone();
                let sphere = SceneObject::sphere(
                    scene.transforms_mut(),
                    Vec3::new(x, -1.5 + radius, z),
                    radius,
                    material,
                );
                let id = scene.add_object(sphere);
                self.spheres.push((id, radius, x, z));
            }
        }
        log::debug!("created a grid of {} spheres", self.spheres.len());
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, camera: &mut Camera, frame: u64, _delta_time: f64) {
        let time = frame as f64 * 0.01;
        let radius = 20.0;
        let height = 5.0 + (time * 0.5).sin() * 3.0;
        camera.position = Vec3::new(time.cos() * radius, height, time.sin() * radius - 10.0);
        camera.point_at(Vec3::new(0.0, 0.0, 10.0));

        let wave_time = frame as f64 * 0.05;
        for &(id, sphere_radius, x, z) in &self.spheres {
            let wave = (x * 0.5 + wave_time).sin() * (z * 0.5 + wave_time * 0.7).cos();
            scene
                .transforms_mut()
                .set_world_position(id, Vec3::new(x, -1.5 + sphere_radius + wave, z));
        }
    }
}

struct Bouncer {
    id: TransformId,
    radius: f64,
    speed: f64,
    phase: f64,
}

/// Twelve spheres bouncing on a mirror floor.
#[derive(Default)]
pub struct BounceScene {
    spheres: Vec<Bouncer>,
}

impl SceneDirector for BounceScene {
    fn name(&self) -> &str {
        "bounce"
    }

    fn initialize(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        library: &MaterialLibrary,
    ) -> SceneResult<()> {
        setup_camera(camera, Vec3::new(0.0, 8.0, -12.0), Vec3::new(0.0, -0.3, 1.0), 75.0);
        add_light(scene, Vec3::new(10.0, 10.0, -5.0), Color::new(1.0, 0.9, 0.8));
        add_light(scene, Vec3::new(-8.0, 5.0, -3.0), Color::new(0.4, 0.5, 0.8));
        add_floor(scene, Vec3::new(0.0, -1.0, 5.0), 30.0, preset(library, "chrome")?);

        let materials = presets(
            library,
            &["ruby", "gold", "emerald", "glass", "chrome", "silver"],
        )?;
        let count = 12;
        for i in 0..count {
            let angle = i as f64 / count as f64 * std::f64::consts::TAU;
            let circle = 8.0;
            let radius = 0.5 + (i % 3) as f64 * 0.4;
            let position = Vec3::new(angle.cos() * circle, radius, angle.sin() * circle + 5.0);
            let sphere = SceneObject::sphere(
                scene.transforms_mut(),
                position,
                radius,
                materials[i % materials.len()].clone(),
            );
            self.spheres.push(Bouncer {
                id: scene.add_object(sphere),
                radius,
                speed: 0.5 + (i % 5) as f64 * 0.2,
                phase: i as f64 * 0.5,
            });
        }
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, camera: &mut Camera, frame: u64, _delta_time: f64) {
        let camera_time = frame as f64 * 0.005;
        let radius = 15.0;
        camera.position = Vec3::new(
            camera_time.sin() * radius,
            8.0,
            camera_time.cos() * radius - 8.0,
        );
        camera.point_at(Vec3::new(0.0, 0.0, 5.0));

        for sphere in &self.spheres {
            let time = frame as f64 * 0.05 * sphere.speed + sphere.phase;
            let height = time.sin().abs() * 5.0;
            let transforms = scene.transforms_mut();
            let position = transforms.world_position(sphere.id);
            transforms.set_world_position(
                sphere.id,
                Vec3::new(position.x, sphere.radius + height, position.z),
            );
        }
    }
}

struct Spinner {
    id: TransformId,
    axis: Vec3,
    speed: f64,
    index: usize,
}

/// A spiral of cubes tumbling over a mirror floor.
#[derive(Default)]
pub struct RotatingCubesScene {
    cubes: Vec<Spinner>,
}

impl SceneDirector for RotatingCubesScene {
    fn name(&self) -> &str {
        "cubes"
    }

    fn initialize(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        library: &MaterialLibrary,
    ) -> SceneResult<()> {
        setup_camera(camera, Vec3::new(0.0, 7.0, 1.0), Vec3::new(0.0, -0.8, 1.0), 75.0);
        add_light(scene, Vec3::new(10.0, 15.0, -10.0), Color::new(1.0, 0.98, 0.95));
        add_light(scene, Vec3::new(-8.0, 8.0, -5.0), Color::new(0.3, 0.3, 0.5));
        add_floor(scene, Vec3::new(0.0, -2.0, 10.0), 40.0, preset(library, "chrome")?);

        let materials = presets(library, &["ruby", "gold", "emerald", "silver", "chrome"])?;
        let spiral_radius = 3.0;
        let spiral_height = 4.0;
        for i in 0..7 {
            let angle = i as f64 * 0.4;
            let radius = spiral_radius * angle;
            let position = Vec3::new(
                angle.cos() * radius,
                i as f64 * spiral_height,
                angle.sin() * radius + 10.0,
            );
            let side = 0.8 + (i as f64 * 0.5).sin() * 0.3;
            let cube = SceneObject::cube(
                scene.transforms_mut(),
                position,
                side,
                materials[i % materials.len()].clone(),
            );
            let axis = Vec3::new(
                (i as f64 * 0.7).sin(),
                (i as f64 * 0.3).cos(),
                (i as f64 * 0.5).sin(),
            )
            .normalize();
            self.cubes.push(Spinner {
                id: scene.add_object(cube),
                axis,
                speed: 2.0 + (i % 5) as f64 * 6.0,
                index: i,
            });
        }
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, _camera: &mut Camera, frame: u64, _delta_time: f64) {
        let transforms = scene.transforms_mut();
        for cube in &self.cubes {
            let angle = frame as f64 * 0.01 * cube.speed;
            transforms.set_local_rotation(cube.id, Quaternion::from_axis_angle(cube.axis, angle));

            let base_y = cube.index as f64 * 0.2;
            let offset_y = (frame as f64 * 0.02 + cube.index as f64 * 0.2).sin() * 0.5;
            let position = transforms.world_position(cube.id);
            transforms.set_world_position(
                cube.id,
                Vec3::new(position.x, base_y + offset_y, position.z),
            );
        }
    }
}

struct Planet {
    id: TransformId,
    orbit_radius: f64,
    speed: f64,
    axis: Vec3,
}

/// Six planets orbiting a lit sun.
#[derive(Default)]
pub struct OrbitingScene {
    planets: Vec<Planet>,
}

impl SceneDirector for OrbitingScene {
    fn name(&self) -> &str {
        "orbit"
    }

    fn initialize(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        library: &MaterialLibrary,
    ) -> SceneResult<()> {
        setup_camera(camera, Vec3::new(0.0, 15.0, -20.0), Vec3::new(0.0, -0.5, 1.0), 75.0);

        let sun = SceneObject::sphere(
            scene.transforms_mut(),
            Vec3::zero(),
            3.0,
            preset(library, "yellow_plastic")?,
        );
        scene.add_object(sun);
        // the light sits inside the sun; the sun's surface shadows everything else from it
        add_light(scene, Vec3::zero(), Color::new(1.0, 0.9, 0.7));

        let materials = presets(
            library,
            &["ruby", "gold", "emerald", "silver", "chrome", "glass"],
        )?;
        for i in 0..6 {
            let orbit_radius = 6.0 + i as f64 * 3.0;
            let axis = if i == 0 {
                Vec3::y_axis()
            } else {
                let tilt = (i % 3) as f64 * 0.15;
                Vec3::new(tilt.sin(), 1.0, (tilt + 1.0).sin()).normalize()
            };
            let size = 0.8 + (i % 3) as f64 * 0.4;
            let planet = SceneObject::sphere(
                scene.transforms_mut(),
                Vec3::new(orbit_radius, 0.0, 0.0),
                size,
                materials[i % materials.len()].clone(),
            );
            self.planets.push(Planet {
                id: scene.add_object(planet),
                orbit_radius,
                speed: 0.5 / orbit_radius.sqrt(),
                axis,
            });
        }
        Ok(())
    }

    fn update(&mut self, scene: &mut Scene, camera: &mut Camera, frame: u64, _delta_time: f64) {
        let camera_time = frame as f64 * 0.003;
        let radius = 25.0;
        let height = 15.0 + (camera_time * 0.5).sin() * 5.0;
        camera.position = Vec3::new(
            camera_time.sin() * radius,
            height,
            camera_time.cos() * radius - 5.0,
        );
        camera.point_at(Vec3::zero());

        for planet in &self.planets {
            let angle = frame as f64 * 0.02 * planet.speed;
            let position = if planet.axis == Vec3::y_axis() {
                Vec3::new(angle.cos(), 0.0, angle.sin()) * planet.orbit_radius
            } else {
                Quaternion::from_axis_angle(planet.axis, angle)
                    .rotate(Vec3::new(planet.orbit_radius, 0.0, 0.0))
            };
            scene.transforms_mut().set_world_position(planet.id, position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raytracing::render::{render_frame, RenderConfig};

    fn initialized(name: &str) -> (Box<dyn SceneDirector>, Scene, Camera) {
        let mut director = by_name(name).unwrap();
        let mut scene = Scene::new();
        let mut camera = Camera::default();
        director
            .initialize(&mut scene, &mut camera, &MaterialLibrary::standard())
            .unwrap();
        (director, scene, camera)
    }

    #[test]
    fn test_every_demo_initializes_and_animates() {
        let config = RenderConfig::default().with_size(12, 9).with_max_depth(2);
        for name in NAMES {
            let (mut director, mut scene, mut camera) = initialized(name);
            assert_eq!(director.name(), name);
            assert!(!scene.objects().is_empty(), "{name}");
            assert!(!scene.lights().is_empty(), "{name}");
            for frame in 0..2 {
                director.update(&mut scene, &mut camera, frame, 0.0);
                let image = render_frame(&mut scene, &camera, &config);
                assert_eq!(image.as_bytes().len(), 12 * 9 * 4);
            }
        }
    }

    #[test]
    fn test_unknown_demo() {
        assert!(matches!(by_name("teapot"), Err(SceneError::UnknownDemo(_))));
    }

    #[test]
    fn test_spheres_grid_and_wave() {
        let (mut director, mut scene, mut camera) = initialized("spheres");
        // floor + 7x7 grid
        assert_eq!(scene.objects().len(), 50);
        director.update(&mut scene, &mut camera, 10, 0.0);
        scene.commit();
        for object in &scene.objects()[1..] {
            let center = object.bounding_box().unwrap().center();
            assert!(center.y > -3.0 && center.y < 2.0);
        }
    }

    #[test]
    fn test_bounce_keeps_spheres_above_floor() {
        let (mut director, mut scene, mut camera) = initialized("bounce");
        for frame in [0, 17, 40] {
            director.update(&mut scene, &mut camera, frame, 0.0);
            scene.commit();
            for object in &scene.objects()[1..] {
                let bbox = object.bounding_box().unwrap();
                assert!(bbox.min.y >= -1e-3, "sphere sank to {}", bbox.min.y);
            }
        }
    }

    #[test]
    fn test_orbits_keep_their_radius() {
        let (mut director, mut scene, mut camera) = initialized("orbit");
        director.update(&mut scene, &mut camera, 500, 0.0);
        for (i, object) in scene.objects()[1..].iter().enumerate() {
            let distance = scene.transforms().world_position(object.transform()).len();
            assert!((distance - (6.0 + i as f64 * 3.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cubes_rotate_faces_with_them() {
        let (mut director, mut scene, mut camera) = initialized("cubes");
        let cube = scene.objects()[1].transform();
        let face = scene.transforms().children(cube)[0];
        let before = scene.transforms().world_rotation(face);
        director.update(&mut scene, &mut camera, 30, 0.0);
        let after = scene.transforms().world_rotation(face);
        assert!(!before.approx_eq(&after, 1e-6));
        assert!(scene.transforms().is_dirty(face));
    }
}
