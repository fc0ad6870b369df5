//! Picking control points on a mesh.
//!
//! Trial runs need reproducible control points spread over the visible part
//! of a model. Points are first picked by shooting camera rays at the mesh,
//! later rays clustered around the first hit so the four points of a curve
//! stay close; whatever the camera cannot provide is sampled uniformly by
//! area.
//!
//! Ray casting and random numbers are behind the small [`RayIntersector`]
//! and [`RandomSource`] traits so tests can substitute fixed answers.

use log::debug;
use nalgebra::{Point3, Vector2, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, SurfacePoint, TriMesh};

/// Seed shared by all trials; the trial number selects the stream.
pub const SAMPLE_SEED: u64 = 9_867_198_237_913;

/// Rays tried before falling back to area sampling.
pub const DEFAULT_RAY_TRIALS: usize = 10_000;

/// Film width of the sampling camera, in meters.
pub const DEFAULT_FILM: f64 = 0.036;

/// A half-line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start of the ray.
    pub origin: Point3<f64>,
    /// Direction, not necessarily unit length.
    pub direction: Vector3<f64>,
}

/// The closest intersection of a ray with a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Face hit.
    pub face: FaceId,
    /// Hit coordinates in the face, as in [`SurfacePoint`].
    pub uv: Vector2<f64>,
    /// Ray parameter of the hit.
    pub distance: f64,
}

impl RayHit {
    /// The hit as a surface point.
    pub fn point(&self) -> SurfacePoint {
        SurfacePoint {
            face: self.face,
            uv: self.uv,
        }
    }
}

/// Something rays can be cast against.
pub trait RayIntersector {
    /// Closest hit along `ray`, if any.
    fn intersect(&self, ray: &Ray) -> Option<RayHit>;
}

/// A source of uniform random numbers in `[0, 1)`.
pub trait RandomSource {
    /// Next number.
    fn next_float(&mut self) -> f64;

    /// Next pair of numbers.
    fn next_vec2(&mut self) -> Vector2<f64> {
        let x = self.next_float();
        let y = self.next_float();
        Vector2::new(x, y)
    }
}

/// Seeded generator with independent streams.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: StdRng,
}

impl SeededRng {
    /// Generator for stream `stream` of `seed`.
    pub fn new(seed: u64, stream: u64) -> Self {
        let mixed = seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17);
        Self {
            rng: StdRng::seed_from_u64(mixed),
        }
    }
}

impl RandomSource for SeededRng {
    fn next_float(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Brute force ray casting over every face of a mesh.
#[derive(Debug, Clone, Copy)]
pub struct TriangleIntersector<'a> {
    mesh: &'a TriMesh,
}

impl<'a> TriangleIntersector<'a> {
    /// Intersector over `mesh`.
    pub fn new(mesh: &'a TriMesh) -> Self {
        Self { mesh }
    }
}

/// Möller-Trumbore ray/triangle test. Returns `(t, u, v)`.
fn intersect_triangle(ray: &Ray, p: &[Point3<f64>; 3]) -> Option<(f64, f64, f64)> {
    let e1 = p[1] - p[0];
    let e2 = p[2] - p[0];
    let pvec = ray.direction.cross(&e2);
    let det = e1.dot(&pvec);
    if det.abs() < 1e-14 {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - p[0];
    let u = tvec.dot(&pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&e1);
    let v = ray.direction.dot(&qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&qvec) * inv_det;
    (t > 0.0).then_some((t, u, v))
}

impl RayIntersector for TriangleIntersector<'_> {
    fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for f in self.mesh.face_ids() {
            let Some((t, u, v)) = intersect_triangle(ray, &self.mesh.face_positions(f)) else {
                continue;
            };
            if best.map_or(true, |b| t < b.distance) {
                best = Some(RayHit {
                    face: f,
                    uv: Vector2::new(u, v),
                    distance: t,
                });
            }
        }
        best
    }
}

/// A pinhole camera.
///
/// `frame` holds the camera's x, y and z axes followed by its origin; the
/// camera looks down its negative z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    /// Axes and origin, 12 numbers.
    pub frame: [f64; 12],
    /// Focal length.
    pub lens: f64,
    /// Film width over height.
    pub aspect: f64,
    /// Largest film side.
    pub film: f64,
    /// Focus distance.
    pub focus: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::look_at(
            Point3::new(0.0, 0.0, 3.0),
            Point3::origin(),
            Vector3::y(),
            0.1,
            1.0,
        )
    }
}

impl Camera {
    /// Camera at `from` looking at `to`.
    pub fn look_at(
        from: Point3<f64>,
        to: Point3<f64>,
        up: Vector3<f64>,
        lens: f64,
        aspect: f64,
    ) -> Self {
        let w = (from - to).normalize();
        let u = up.cross(&w).normalize();
        let v = w.cross(&u).normalize();
        let mut frame = [0.0; 12];
        for (i, axis) in [u, v, w, from.coords].iter().enumerate() {
            frame[3 * i..3 * i + 3].copy_from_slice(axis.as_slice());
        }
        Self {
            frame,
            lens,
            aspect,
            film: DEFAULT_FILM,
            focus: (from - to).norm(),
        }
    }

    fn axis(&self, i: usize) -> Vector3<f64> {
        Vector3::new(self.frame[3 * i], self.frame[3 * i + 1], self.frame[3 * i + 2])
    }

    /// Camera position.
    pub fn origin(&self) -> Point3<f64> {
        Point3::from(self.axis(3))
    }

    /// Ray through the image coordinate `uv` in `[0, 1]^2`.
    pub fn ray(&self, uv: Vector2<f64>) -> Ray {
        let (fx, fy) = if self.aspect >= 1.0 {
            (self.film, self.film / self.aspect)
        } else {
            (self.film * self.aspect, self.film)
        };
        let q = Vector3::new(fx * (0.5 - uv.x), fy * (uv.y - 0.5), self.lens);
        let d = -q.normalize();
        Ray {
            origin: self.origin(),
            direction: (self.axis(0) * d.x + self.axis(1) * d.y + self.axis(2) * d.z).normalize(),
        }
    }
}

/// Running sum of face areas.
pub fn triangle_cdf(mesh: &TriMesh) -> Vec<f64> {
    let mut sum = 0.0;
    mesh.face_ids()
        .map(|f| {
            sum += mesh.face_area(f);
            sum
        })
        .collect()
}

/// Point picked uniformly by area, from one number for the face and two
/// for the position inside it.
pub fn sample_triangle(cdf: &[f64], r: f64, ruv: Vector2<f64>) -> SurfacePoint {
    let total = cdf.last().copied().unwrap_or(0.0);
    let target = r.clamp(0.0, 1.0) * total;
    let face = cdf
        .partition_point(|&c| c <= target)
        .min(cdf.len().saturating_sub(1));
    let s = ruv.x.max(0.0).sqrt();
    SurfacePoint::new(FaceId::new(face), 1.0 - s, ruv.y * s)
}

/// Pick `num_points` control points with explicit oracles.
pub fn sample_points_with(
    mesh: &TriMesh,
    camera: &Camera,
    intersector: &impl RayIntersector,
    ray_rng: &mut impl RandomSource,
    area_rng: &mut impl RandomSource,
    num_points: usize,
    ray_trials: usize,
) -> Result<Vec<SurfacePoint>> {
    let (min, max) = mesh.bounding_box().ok_or(MeshError::EmptyMesh)?;
    let size = max - min;
    let aspect = if size.y > 0.0 { size.x / size.y } else { 1.0 };
    let spread = if aspect > 0.0 { aspect.min(1.0 / aspect) } else { 1.0 };

    let mut points: Vec<SurfacePoint> = Vec::with_capacity(num_points);
    let mut first_uv: Option<Vector2<f64>> = None;
    let mut tried = 0;
    while points.len() < num_points && tried < ray_trials {
        tried += 1;
        let mut uv = ray_rng.next_vec2();
        if let Some(anchor) = first_uv {
            let centered = (uv * 2.0 - Vector2::repeat(1.0)) * spread + anchor * 2.0
                - Vector2::repeat(1.0);
            uv = centered * 0.5 + Vector2::repeat(0.5);
        }

        let Some(hit) = intersector.intersect(&camera.ray(uv)) else {
            continue;
        };
        let inside = |x: f64| x > 0.0 && x < 1.0;
        if hit.face.index() >= mesh.num_faces() || !inside(hit.uv.x) || !inside(hit.uv.y) {
            continue;
        }
        points.push(hit.point());
        first_uv.get_or_insert(uv);
    }
    let from_camera = points.len();

    let cdf = triangle_cdf(mesh);
    while points.len() < num_points {
        let r = area_rng.next_float();
        let ruv = area_rng.next_vec2();
        points.push(sample_triangle(&cdf, r, ruv));
    }

    debug!(
        "sampled {} points: {} from {} camera rays, {} by area",
        points.len(),
        from_camera,
        tried,
        points.len() - from_camera
    );
    Ok(points)
}

/// Pick `num_points` reproducible control points for trial `trial`.
pub fn sample_points(
    mesh: &TriMesh,
    camera: &Camera,
    intersector: &impl RayIntersector,
    trial: u64,
    num_points: usize,
    ray_trials: usize,
) -> Result<Vec<SurfacePoint>> {
    let mut ray_rng = SeededRng::new(SAMPLE_SEED, trial * 2 + 1);
    let mut area_rng = SeededRng::new(SAMPLE_SEED, 1);
    sample_points_with(
        mesh,
        camera,
        intersector,
        &mut ray_rng,
        &mut area_rng,
        num_points,
        ray_trials,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::shapes;
    use approx::assert_relative_eq;

    /// Cycles through fixed numbers.
    struct Fixed {
        values: Vec<f64>,
        next: usize,
    }

    impl RandomSource for Fixed {
        fn next_float(&mut self) -> f64 {
            let v = self.values[self.next % self.values.len()];
            self.next += 1;
            v
        }
    }

    struct Miss;

    impl RayIntersector for Miss {
        fn intersect(&self, _: &Ray) -> Option<RayHit> {
            None
        }
    }

    #[test]
    fn test_ray_hits_quad() {
        let mesh = shapes::quad();
        let ray = Ray {
            origin: Point3::new(0.75, 0.25, 1.0),
            direction: -Vector3::z(),
        };
        let hit = TriangleIntersector::new(&mesh).intersect(&ray).unwrap();
        assert_eq!(hit.face, FaceId::new(0));
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            mesh.eval_position(&hit.point()),
            Point3::new(0.75, 0.25, 0.0),
            epsilon = 1e-12
        );

        let away = Ray {
            direction: Vector3::z(),
            ..ray
        };
        assert!(TriangleIntersector::new(&mesh).intersect(&away).is_none());
    }

    #[test]
    fn test_camera_center_ray() {
        let camera = Camera::default();
        let ray = camera.ray(Vector2::new(0.5, 0.5));
        assert_relative_eq!(ray.origin, Point3::new(0.0, 0.0, 3.0), epsilon = 1e-12);
        assert_relative_eq!(ray.direction, -Vector3::z(), epsilon = 1e-12);

        // Image x grows to the right of the camera.
        let right = camera.ray(Vector2::new(1.0, 0.5));
        assert!(right.direction.x > 0.0);
    }

    #[test]
    fn test_area_sampling() {
        let mesh = shapes::grid(2);
        let cdf = triangle_cdf(&mesh);
        assert_eq!(cdf.len(), 8);
        assert_relative_eq!(*cdf.last().unwrap(), 1.0, epsilon = 1e-12);
        assert!(cdf.windows(2).all(|w| w[0] <= w[1]));

        let p = sample_triangle(&cdf, 0.99, Vector2::new(0.25, 0.5));
        assert_eq!(p.face, FaceId::new(7));
        assert!(p.uv.x >= 0.0 && p.uv.y >= 0.0 && p.uv.x + p.uv.y <= 1.0);
        assert_eq!(sample_triangle(&cdf, 1.0, Vector2::zeros()).face, FaceId::new(7));
        assert_eq!(sample_triangle(&cdf, 0.0, Vector2::zeros()).face, FaceId::new(0));
    }

    #[test]
    fn test_camera_points_are_reproducible() {
        let mesh = shapes::icosphere(2);
        let camera = Camera::default();
        let intersector = TriangleIntersector::new(&mesh);
        let a = sample_points(&mesh, &camera, &intersector, 3, 4, DEFAULT_RAY_TRIALS).unwrap();
        let b = sample_points(&mesh, &camera, &intersector, 3, 4, DEFAULT_RAY_TRIALS).unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
        // The camera sits on +z, so camera hits face it.
        for p in &a {
            assert!(mesh.eval_position(p).z > 0.0);
        }
    }

    #[test]
    fn test_falls_back_to_area() {
        let mesh = shapes::grid(2);
        let mut ray_rng = Fixed {
            values: vec![0.5],
            next: 0,
        };
        let mut area_rng = Fixed {
            values: vec![0.1, 0.3, 0.3],
            next: 0,
        };
        let points = sample_points_with(
            &mesh,
            &Camera::default(),
            &Miss,
            &mut ray_rng,
            &mut area_rng,
            2,
            10,
        )
        .unwrap();
        assert_eq!(ray_rng.next, 20);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], points[1]);
    }
}
