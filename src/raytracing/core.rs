use std::sync::Arc;

use super::material::Material;
use super::model::{Triangle, TrianglePoints, TriangleSet};
use super::transform::{TransformId, TransformTree};
use super::{Box3, Color, Mat3, Quaternion, Ray, Vec3};

/// Padding added around cached bounding boxes so culling never rejects a
/// ray that grazes the geometry.
const BOUNDS_PADDING: f64 = 1e-6;

#[derive(Clone, Copy, Debug)]
pub struct HitResult {
    pub t: f64,
    pub normal: Vec3,
}

/// Infinite plane through `origin` spanned by `v` and `w`.
#[derive(Debug, Clone)]
pub struct Level {
    local_v: Vec3,
    local_w: Vec3,
    origin: Vec3,
    v: Vec3,
    w: Vec3,
    normal: Vec3,
}

impl Level {
    fn new(v: Vec3, w: Vec3) -> Self {
        Level {
            local_v: v,
            local_w: w,
            origin: Vec3::zero(),
            v,
            w,
            normal: v.cross(w).normalize(),
        }
    }

    fn recompute(&mut self, transforms: &TransformTree, id: TransformId) {
        self.origin = transforms.world_position(id);
        self.v = transforms.direction_to_world(id, self.local_v);
        self.w = transforms.direction_to_world(id, self.local_w);
        self.normal = self.v.cross(self.w).normalize();
    }

    fn intersect(&self, ray: &Ray) -> Option<HitResult> {
        // origin + t * d = level_origin + u * v + s * w
        let system = Mat3::from_columns(ray.direction, -self.v, -self.w);
        let solution = system.solve(self.origin - ray.origin)?;
        let t = solution.x;
        if t < 0.0 {
            return None;
        }
        Some(HitResult {
            t,
            normal: self.normal,
        })
    }
}

#[derive(Debug, Clone)]
pub enum Solid {
    Sphere { radius: f64, center: Vec3, world_radius: f64 },
    Triangle(Triangle),
    Plane { width: f64, length: f64, triangles: TriangleSet },
    Cube { side: f64, triangles: TriangleSet },
    Mesh { name: String, triangles: TriangleSet },
    Level(Level),
}

impl Solid {
    pub fn kind(&self) -> &'static str {
        match self {
            Solid::Sphere { .. } => "sphere",
            Solid::Triangle(_) => "triangle",
            Solid::Plane { .. } => "plane",
            Solid::Cube { .. } => "cube",
            Solid::Mesh { .. } => "mesh",
            Solid::Level(_) => "level",
        }
    }

    /// Number of triangles making up the solid (0 for the analytic ones).
    pub fn triangle_count(&self) -> usize {
        match self {
            Solid::Triangle(_) => 1,
            Solid::Plane { triangles, .. }
            | Solid::Cube { triangles, .. }
            | Solid::Mesh { triangles, .. } => triangles.len(),
            Solid::Sphere { .. } | Solid::Level(_) => 0,
        }
    }
}

/// Geometry plus the material it is shaded with.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub solid: Solid,
    pub material: Arc<Material>,
    transform: TransformId,
    bounding_box: Option<Box3>,
}

impl SceneObject {
    fn with_solid(solid: Solid, transform: TransformId, material: Arc<Material>) -> Self {
        SceneObject {
            solid,
            material,
            transform,
            bounding_box: None,
        }
    }

    pub fn sphere(
        transforms: &mut TransformTree,
        center: Vec3,
        radius: f64,
        material: Arc<Material>,
    ) -> Self {
        let id = transforms.insert(center, Quaternion::IDENTITY);
        let solid = Solid::Sphere {
            radius,
            center,
            world_radius: radius,
        };
        Self::with_solid(solid, id, material)
    }

    /// A single triangle whose points are given in world space. Its transform
    /// sits on the centroid, so rotating and scaling pivot around it.
    pub fn triangle(
        transforms: &mut TransformTree,
        points: TrianglePoints,
        material: Arc<Material>,
    ) -> Self {
        let [a, b, c] = points;
        let centroid = (a + b + c) / 3.0;
        let id = transforms.insert(centroid, Quaternion::IDENTITY);
        let triangle = Triangle::new(points.map(|point| point - centroid), id, transforms);
        Self::with_solid(Solid::Triangle(triangle), id, material)
    }

    /// A horizontal rectangle centred on `center`.
    pub fn plane(
        transforms: &mut TransformTree,
        center: Vec3,
        width: f64,
        length: f64,
        material: Arc<Material>,
    ) -> Self {
        let id = transforms.insert(center, Quaternion::IDENTITY);
        let triangles = TriangleSet::plane(transforms, id, width, length);
        let solid = Solid::Plane {
            width,
            length,
            triangles,
        };
        Self::with_solid(solid, id, material)
    }

    pub fn cube(
        transforms: &mut TransformTree,
        center: Vec3,
        side: f64,
        material: Arc<Material>,
    ) -> Self {
        let id = transforms.insert(center, Quaternion::IDENTITY);
        let triangles = TriangleSet::cube(transforms, id, side);
        Self::with_solid(Solid::Cube { side, triangles }, id, material)
    }

    /// A named mesh whose triangles are expressed relative to `position`.
    pub fn mesh(
        transforms: &mut TransformTree,
        name: impl Into<String>,
        position: Vec3,
        triangles: impl IntoIterator<Item = TrianglePoints>,
        material: Arc<Material>,
    ) -> Self {
        let id = transforms.insert(position, Quaternion::IDENTITY);
        let triangles = TriangleSet::from_points(transforms, id, triangles);
        let solid = Solid::Mesh {
            name: name.into(),
            triangles,
        };
        Self::with_solid(solid, id, material)
    }

    pub fn level(
        transforms: &mut TransformTree,
        origin: Vec3,
        v: Vec3,
        w: Vec3,
        material: Arc<Material>,
    ) -> Self {
        let id = transforms.insert(origin, Quaternion::IDENTITY);
        Self::with_solid(Solid::Level(Level::new(v, w)), id, material)
    }

    pub fn transform(&self) -> TransformId {
        self.transform
    }

    pub fn bounding_box(&self) -> Option<Box3> {
        self.bounding_box
    }

    /// True when a transform this object depends on changed since the last refresh.
    pub fn is_stale(&self, transforms: &TransformTree) -> bool {
        if transforms.is_dirty(self.transform) {
            return true;
        }
        match &self.solid {
            Solid::Plane { triangles, .. }
            | Solid::Cube { triangles, .. }
            | Solid::Mesh { triangles, .. } => triangles.is_stale(transforms),
            _ => false,
        }
    }

    /// Rebuilds every world-space cache from the transform tree.
    pub fn refresh(&mut self, transforms: &TransformTree) {
        let id = self.transform;
        self.bounding_box = match &mut self.solid {
            Solid::Sphere {
                radius,
                center,
                world_radius,
            } => {
                *center = transforms.world_position(id);
                *world_radius = *radius * transforms.max_world_scale(id);
                let extent = Vec3::splat(*world_radius);
                Some(Box3::from_min_max(*center - extent, *center + extent))
            }
            Solid::Triangle(triangle) => {
                triangle.recompute(transforms);
                Some(Box3::from_points(triangle.vertices()))
            }
            Solid::Plane { triangles, .. }
            | Solid::Cube { triangles, .. }
            | Solid::Mesh { triangles, .. } => {
                triangles.recompute(transforms);
                Some(triangles.bounding_box())
            }
            Solid::Level(level) => {
                level.recompute(transforms, id);
                None
            }
        }
        .filter(Box3::is_valid)
        .map(|bbox| bbox.padded(BOUNDS_PADDING));
    }

    pub fn collide(&self, ray: &Ray) -> Option<HitResult> {
        match &self.solid {
            Solid::Sphere {
                center,
                world_radius,
                ..
            } => {
                let oc = ray.origin - *center;
                let a = ray.direction.dot(ray.direction);
                let b = 2.0 * ray.direction.dot(oc);
                let c = oc.dot(oc) - world_radius * world_radius;
                let discriminant = b * b - 4.0 * a * c;

                if discriminant < 0.0 || a == 0.0 {
                    return None;
                }

                let root = discriminant.sqrt();
                let near = (-b - root) / (2.0 * a);
                let far = (-b + root) / (2.0 * a);
                // the near root is negative when the origin is inside the sphere
                let t = if near > 0.0 {
                    near
                } else if far > 0.0 {
                    far
                } else {
                    return None;
                };
                let normal = (ray.at(t) - *center).normalize();
                Some(HitResult { t, normal })
            }
            Solid::Triangle(triangle) => triangle.intersect(ray),
            Solid::Plane { triangles, .. }
            | Solid::Cube { triangles, .. }
            | Solid::Mesh { triangles, .. } => triangles.intersect(ray),
            Solid::Level(level) => level.intersect(ray),
        }
    }
}

/// Point light.
#[derive(Debug, Clone)]
pub struct Light {
    pub color: Color,
    transform: TransformId,
    position: Vec3,
}

impl Light {
    pub fn new(transforms: &mut TransformTree, position: Vec3, color: Color) -> Self {
        Light {
            color,
            transform: transforms.insert(position, Quaternion::IDENTITY),
            position,
        }
    }

    pub fn transform(&self) -> TransformId {
        self.transform
    }

    /// World position as of the last commit.
    pub fn position(&self) -> Vec3 {
        self.position
    }
}

/// Outcome of a nearest-hit query.
#[derive(Debug, Clone, Copy)]
pub struct RayHit<'a> {
    pub has_hit: bool,
    pub position: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub distance: f64,
    pub object: Option<&'a SceneObject>,
}

impl<'a> RayHit<'a> {
    pub const NO_HIT: RayHit<'a> = RayHit {
        has_hit: false,
        position: None,
        normal: None,
        distance: f64::INFINITY,
        object: None,
    };
}

/// Objects and lights, in insertion order, plus the transforms they hang from.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    lights: Vec<Light>,
    transforms: TransformTree,
    use_bounds: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn transforms(&self) -> &TransformTree {
        &self.transforms
    }

    /// Mutable access for building objects and animating them.
    /// Changes become visible to [`Scene::trace_ray`] after [`Scene::commit`].
    pub fn transforms_mut(&mut self) -> &mut TransformTree {
        &mut self.transforms
    }

    /// Adds an object and returns its transform handle.
    pub fn add_object(&mut self, mut object: SceneObject) -> TransformId {
        object.refresh(&self.transforms);
        let id = object.transform;
        log::trace!(
            "added {} ({} triangles)",
            object.solid.kind(),
            object.solid.triangle_count()
        );
        self.objects.push(object);
        id
    }

    pub fn add_light(&mut self, mut light: Light) -> TransformId {
        light.position = self.transforms.world_position(light.transform);
        let id = light.transform;
        self.lights.push(light);
        id
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.lights.clear();
        self.transforms.clear();
    }

    pub fn use_bounds(&self) -> bool {
        self.use_bounds
    }

    /// Lets [`Scene::trace_ray`] skip objects whose bounding box the ray misses.
    pub fn set_use_bounds(&mut self, use_bounds: bool) {
        self.use_bounds = use_bounds;
    }

    /// Brings every cached world-space value up to date with the transform tree.
    pub fn commit(&mut self) {
        if !self.transforms.any_dirty() {
            return;
        }
        let mut refreshed = 0;
        for object in &mut self.objects {
            if object.is_stale(&self.transforms) {
                object.refresh(&self.transforms);
                refreshed += 1;
            }
        }
        for light in &mut self.lights {
            light.position = self.transforms.world_position(light.transform);
        }
        self.transforms.clear_dirty();
        log::trace!("commit refreshed {refreshed} objects");
    }

    /// Globally nearest hit, or [`RayHit::NO_HIT`].
    pub fn trace_ray(&self, ray: &Ray) -> RayHit<'_> {
        let mut closest = RayHit::NO_HIT;
        for object in &self.objects {
            if self.use_bounds {
                if let Some(bbox) = &object.bounding_box {
                    if bbox.intersect_ray(ray).is_none() {
                        continue;
                    }
                }
            }
            let Some(result) = object.collide(ray) else {
                continue;
            };
            if result.t < closest.distance {
                closest = RayHit {
                    has_hit: true,
                    position: Some(ray.at(result.t)),
                    normal: Some(result.normal),
                    distance: result.t,
                    object: Some(object),
                };
            }
        }
        closest
    }
}
