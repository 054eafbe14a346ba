use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use obj::raw::object::Polygon;
use obj::raw::parse_obj;

use super::core::HitResult;
use super::error::SceneResult;
use super::transform::{TransformId, TransformTree};
use super::{Box3, Quaternion, Ray, Vec3};

/// Determinants and distances below this are treated as "no intersection".
const TRIANGLE_EPSILON: f64 = 1e-6;

/// Three points expressed in the frame of one transform.
pub type TrianglePoints = [Vec3; 3];

/// A triangle with its world-space data cached.
///
/// The cache is only valid for the transform state it was computed from,
/// call [`Triangle::recompute`] after the owning transform (or one of its
/// ancestors) moved.
#[derive(Debug, Clone)]
pub struct Triangle {
    points: TrianglePoints,
    transform: TransformId,
    vertices: TrianglePoints,
    edge1: Vec3,
    edge2: Vec3,
    normal: Vec3,
}

impl Triangle {
    pub fn new(points: TrianglePoints, transform: TransformId, transforms: &TransformTree) -> Self {
        let mut triangle = Triangle {
            points,
            transform,
            vertices: points,
            edge1: Vec3::zero(),
            edge2: Vec3::zero(),
            normal: Vec3::zero(),
        };
        triangle.recompute(transforms);
        triangle
    }

    /// World-space vertices as of the last recompute.
    pub fn vertices(&self) -> TrianglePoints {
        self.vertices
    }

    pub fn recompute(&mut self, transforms: &TransformTree) {
        let [a, b, c] = self.points.map(|p| transforms.local_to_world(self.transform, p));
        self.vertices = [a, b, c];
        self.edge1 = b - a;
        self.edge2 = c - a;
        self.normal = self.edge1.cross(self.edge2).normalize();
    }

    pub fn intersect(&self, ray: &Ray) -> Option<HitResult> {
        // https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm
        let ray_cross_e2 = ray.direction.cross(self.edge2);
        let determinant = self.edge1.dot(ray_cross_e2);
        // ray and triangle are parallel if det is close to 0
        if determinant.abs() < TRIANGLE_EPSILON {
            return None;
        }
        let inverse_determinant = 1.0 / determinant;
        let tvec = ray.origin - self.vertices[0];
        let u = tvec.dot(ray_cross_e2) * inverse_determinant;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(self.edge1);
        let v = ray.direction.dot(qvec) * inverse_determinant;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = self.edge2.dot(qvec) * inverse_determinant;
        if t < TRIANGLE_EPSILON {
            return None;
        }

        Some(HitResult {
            t,
            normal: self.normal,
        })
    }
}

/// The triangles of a plane, cube or mesh.
#[derive(Debug, Clone, Default)]
pub struct TriangleSet {
    triangles: Vec<Triangle>,
}

impl TriangleSet {
    /// A `width` x `length` rectangle lying in the XZ plane of `owner`, facing +Y.
    pub fn plane(transforms: &TransformTree, owner: TransformId, width: f64, length: f64) -> Self {
        let mut set = TriangleSet::default();
        set.extend(transforms, owner, plane_points(width, length));
        set
    }

    /// Six square faces, each one a child transform of `owner`.
    pub fn cube(transforms: &mut TransformTree, owner: TransformId, side: f64) -> Self {
        use std::f64::consts::{FRAC_PI_2, PI};

        let half = side / 2.0;
        let faces = [
            (Vec3::new(0.0, half, 0.0), Quaternion::IDENTITY),
            (
                Vec3::new(0.0, -half, 0.0),
                Quaternion::from_axis_angle(Vec3::x_axis(), PI),
            ),
            (
                Vec3::new(-half, 0.0, 0.0),
                Quaternion::from_axis_angle(Vec3::z_axis(), FRAC_PI_2),
            ),
            (
                Vec3::new(half, 0.0, 0.0),
                Quaternion::from_axis_angle(Vec3::z_axis(), -FRAC_PI_2),
            ),
            (
                Vec3::new(0.0, 0.0, half),
                Quaternion::from_axis_angle(Vec3::x_axis(), FRAC_PI_2),
            ),
            (
                Vec3::new(0.0, 0.0, -half),
                Quaternion::from_axis_angle(Vec3::x_axis(), -FRAC_PI_2),
            ),
        ];

        let mut set = TriangleSet::default();
        for (offset, rotation) in faces {
            let face = transforms.insert_child(owner, offset, rotation);
            set.extend(transforms, face, plane_points(side, side));
        }
        set
    }

    /// Arbitrary triangles, all expressed in the frame of `owner`.
    pub fn from_points(
        transforms: &TransformTree,
        owner: TransformId,
        triangles: impl IntoIterator<Item = TrianglePoints>,
    ) -> Self {
        let mut set = TriangleSet::default();
        set.extend(transforms, owner, triangles);
        set
    }

    fn extend(
        &mut self,
        transforms: &TransformTree,
        owner: TransformId,
        triangles: impl IntoIterator<Item = TrianglePoints>,
    ) {
        self.triangles.extend(
            triangles
                .into_iter()
                .map(|points| Triangle::new(points, owner, transforms)),
        );
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn is_stale(&self, transforms: &TransformTree) -> bool {
        self.triangles
            .iter()
            .any(|triangle| transforms.is_dirty(triangle.transform))
    }

    pub fn recompute(&mut self, transforms: &TransformTree) {
        for triangle in &mut self.triangles {
            triangle.recompute(transforms);
        }
    }

    pub fn bounding_box(&self) -> Box3 {
        Box3::from_points(self.triangles.iter().flat_map(|t| t.vertices))
    }

    /// Nearest hit among all the triangles.
    pub fn intersect(&self, ray: &Ray) -> Option<HitResult> {
        let mut closest: Option<HitResult> = None;
        for triangle in &self.triangles {
            if let Some(hit) = triangle.intersect(ray) {
                if closest.map_or(true, |best| hit.t < best.t) {
                    closest = Some(hit);
                }
            }
        }
        closest
    }
}

fn plane_points(width: f64, length: f64) -> [TrianglePoints; 2] {
    let (w, l) = (width / 2.0, length / 2.0);
    [
        [
            Vec3::new(-w, 0.0, -l),
            Vec3::new(-w, 0.0, l),
            Vec3::new(w, 0.0, -l),
        ],
        [
            Vec3::new(-w, 0.0, l),
            Vec3::new(w, 0.0, l),
            Vec3::new(w, 0.0, -l),
        ],
    ]
}

/// Reads a Wavefront OBJ file into local-space triangles.
pub fn load_obj_triangles(path: impl AsRef<Path>) -> SceneResult<Vec<TrianglePoints>> {
    let path = path.as_ref();
    let input = BufReader::new(File::open(path)?);
    let triangles = read_obj_triangles(input)?;
    log::debug!("loaded {} triangles from {}", triangles.len(), path.display());
    Ok(triangles)
}

pub fn read_obj_triangles(input: impl BufRead) -> SceneResult<Vec<TrianglePoints>> {
    let raw = parse_obj(input)?;
    let positions: Vec<Vec3> = raw
        .positions
        .iter()
        .map(|&(x, y, z, _)| [x, y, z].into())
        .collect();

    let mut triangles = Vec::new();
    let mut skipped = 0;
    for polygon in &raw.polygons {
        let indices: Vec<usize> = match polygon {
            Polygon::P(indices) => indices.clone(),
            Polygon::PT(indices) => indices.iter().map(|&(p, _)| p).collect(),
            Polygon::PN(indices) => indices.iter().map(|&(p, _)| p).collect(),
            Polygon::PTN(indices) => indices.iter().map(|&(p, _, _)| p).collect(),
        };
        match fan_triangulate(&positions, &indices) {
            Some(fan) => triangles.extend(fan),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("skipped {skipped} faces with missing vertices or fewer than 3 corners");
    }
    Ok(triangles)
}

/// Splits a convex polygon into triangles sharing its first corner.
fn fan_triangulate(positions: &[Vec3], indices: &[usize]) -> Option<Vec<TrianglePoints>> {
    if indices.len() < 3 {
        return None;
    }
    let corners = indices
        .iter()
        .map(|&i| positions.get(i).copied())
        .collect::<Option<Vec<_>>>()?;
    Some(
        corners[1..]
            .windows(2)
            .map(|pair| [corners[0], pair[0], pair[1]])
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(transforms: &mut TransformTree) -> TransformId {
        transforms.insert(Vec3::zero(), Quaternion::IDENTITY)
    }

    fn unit_triangle(transforms: &mut TransformTree) -> Triangle {
        let id = root(transforms);
        Triangle::new(
            [
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
            ],
            id,
            transforms,
        )
    }

    #[test]
    fn test_triangle_hit_at_unit_distance() {
        let mut transforms = TransformTree::new();
        let triangle = unit_triangle(&mut transforms);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::z_axis());
        let hit = triangle.intersect(&ray).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-9);
        assert!((hit.normal.len() - 1.0).abs() < 1e-9);
        assert!(hit.normal.cross(Vec3::z_axis()).len() < 1e-9);
    }

    #[test]
    fn test_triangle_miss_outside_footprint() {
        let mut transforms = TransformTree::new();
        let triangle = unit_triangle(&mut transforms);
        let ray = Ray::new(Vec3::new(2.0, 2.0, -1.0), Vec3::z_axis());
        assert!(triangle.intersect(&ray).is_none());
    }

    #[test]
    fn test_triangle_parallel_and_behind() {
        let mut transforms = TransformTree::new();
        let triangle = unit_triangle(&mut transforms);
        let parallel = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::x_axis());
        assert!(triangle.intersect(&parallel).is_none());
        let behind = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::z_axis());
        assert!(triangle.intersect(&behind).is_none());
    }

    #[test]
    fn test_triangle_follows_its_transform() {
        let mut transforms = TransformTree::new();
        let id = root(&mut transforms);
        let points = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
        ];
        let mut triangle = Triangle::new(points, id, &transforms);
        transforms.set_world_position(id, Vec3::new(0.0, 0.0, 4.0));
        triangle.recompute(&transforms);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::z_axis());
        let hit = triangle.intersect(&ray).unwrap();
        assert!((hit.t - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_plane_faces_up() {
        let mut transforms = TransformTree::new();
        let id = root(&mut transforms);
        let plane = TriangleSet::plane(&transforms, id, 4.0, 4.0);
        assert_eq!(plane.len(), 2);
        for triangle in plane.triangles() {
            let [a, b, c] = triangle.vertices();
            let normal = (b - a).cross(c - a).normalize();
            assert!(normal.approx_eq(Vec3::y_axis(), 1e-9));
        }
        let ray = Ray::new(Vec3::new(1.5, 3.0, -1.5), -Vec3::y_axis());
        let hit = plane.intersect(&ray).unwrap();
        assert!((hit.t - 3.0).abs() < 1e-9);
        assert!(hit.normal.approx_eq(Vec3::y_axis(), 1e-9));
    }

    #[test]
    fn test_cube_nearest_face_wins() {
        let mut transforms = TransformTree::new();
        let id = transforms.insert(Vec3::new(0.0, 0.0, 5.0), Quaternion::IDENTITY);
        let cube = TriangleSet::cube(&mut transforms, id, 2.0);
        assert_eq!(cube.len(), 12);
        assert_eq!(transforms.children(id).len(), 6);

        let ray = Ray::new(Vec3::new(0.1, 0.2, 0.0), Vec3::z_axis());
        let hit = cube.intersect(&ray).unwrap();
        assert!((hit.t - 4.0).abs() < 1e-9);

        let bbox = cube.bounding_box();
        assert!(bbox.min.approx_eq(Vec3::new(-1.0, -1.0, 4.0), 1e-9));
        assert!(bbox.max.approx_eq(Vec3::new(1.0, 1.0, 6.0), 1e-9));
    }

    #[test]
    fn test_cube_faces_marked_stale_when_cube_moves() {
        let mut transforms = TransformTree::new();
        let id = root(&mut transforms);
        let mut cube = TriangleSet::cube(&mut transforms, id, 2.0);
        transforms.clear_dirty();
        assert!(!cube.is_stale(&transforms));

        transforms.rotate(id, Quaternion::from_axis_angle(Vec3::y_axis(), 0.3));
        assert!(cube.is_stale(&transforms));
        cube.recompute(&transforms);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::z_axis());
        assert!(cube.intersect(&ray).is_some());
    }

    #[test]
    fn test_obj_quads_are_fan_triangulated() {
        let source = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
f 1 2 3 4
f 1 2 5
";
        let triangles = read_obj_triangles(source.as_bytes()).unwrap();
        assert_eq!(triangles.len(), 3);
        assert_eq!(triangles[0][0], Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(triangles[1][2], Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(triangles[2][2], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_degenerate_faces_are_skipped() {
        let positions = [Vec3::zero(), Vec3::x_axis()];
        assert!(fan_triangulate(&positions, &[0, 1]).is_none());
        assert!(fan_triangulate(&positions, &[0, 1, 7]).is_none());
    }
}
