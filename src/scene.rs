//= IMPORTS ==================================================================

use glam::{vec3, Vec2, Vec3, Vec4};

//= SCENE ====================================================================

/// The fixed scene: one sphere, one directional light, one camera.
/// Kept as plain data so the intersection code can be tested with literal
/// parameters and a multi-primitive scene stays a data change.
pub(crate) struct Scene {
    pub(crate) sphere: Sphere,
    pub(crate) light_dir: Vec3,
    pub(crate) background: Vec3,
    pub(crate) camera: Camera,
}

impl Scene {
    pub(crate) fn new() -> Self {
        Self {
            sphere: Sphere::new(Vec3::ZERO, 0.5, vec3(1.0, 0.0, 1.0)),
            light_dir: vec3(-1.0, -1.0, -1.0).normalize(),
            background: Vec3::ZERO,
            camera: Camera::new(vec3(0.0, 0.0, 1.0)),
        }
    }
}

//= CAMERA ===================================================================

/// Sits on +Z outside the sphere, looking down -Z.
pub(crate) struct Camera {
    pub(crate) origin: Vec3,
}

impl Camera {
    pub(crate) fn new(origin: Vec3) -> Self {
        Self { origin }
    }

    /// Build the ray for a normalized, aspect-corrected screen coordinate.
    /// The coordinate lands on a plane one unit in front of the camera.
    pub(crate) fn ray(&self, coord: Vec2) -> Ray {
        Ray {
            origin: self.origin,
            direction: vec3(coord.x, coord.y, -1.0).normalize(),
        }
    }
}

//= RAY ======================================================================

#[derive(Debug)]
pub(crate) struct Ray {
    pub(crate) origin: Vec3,
    pub(crate) direction: Vec3,
}

impl Ray {
    fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

//= HIT RECORD ===============================================================

/// Carries the full intersection geometry, not just what shading reads.
#[allow(dead_code)]
pub(crate) struct HitRecord {
    /// Near root of the intersection quadratic, the entry point for a camera
    /// outside the sphere.
    pub(crate) t: f32,
    /// Far root. Shading never reads it; kept so a back-face or refraction
    /// pass can tell entry from exit.
    pub(crate) t_far: f32,
    pub(crate) point: Vec3,
    pub(crate) normal: Vec3,
}

//= SPHERE ===================================================================

pub(crate) struct Sphere {
    pub(crate) center: Vec3,
    pub(crate) radius: f32,
    pub(crate) albedo: Vec3,
}

impl Sphere {
    pub(crate) fn new(center: Vec3, radius: f32, albedo: Vec3) -> Self {
        Self {
            center,
            radius,
            albedo,
        }
    }

    /// Solve a*t^2 + b*t + c = 0 for the ray against this sphere.
    /// A negative discriminant or a degenerate direction is a miss.
    pub(crate) fn hit(&self, ray: &Ray) -> Option<HitRecord> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        if a <= f32::EPSILON {
            return None;
        }
        let b = 2.0 * ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();
        let t = (-b - sqrtd) / (2.0 * a);
        let t_far = (-b + sqrtd) / (2.0 * a);

        let point = ray.at(t);
        Some(HitRecord {
            t,
            t_far,
            point,
            normal: (point - self.center) / self.radius,
        })
    }
}

//= SHADER ===================================================================

/// Turns a hit (or miss) into a color. The two revisions of the renderer
/// differ only here, so both live behind one contract.
pub(crate) trait Shade {
    fn shade(&self, scene: &Scene, hit: Option<&HitRecord>) -> Vec4;
}

/// First revision: sphere albedo on hit, background on miss.
pub(crate) struct FlatShader;

impl Shade for FlatShader {
    fn shade(&self, scene: &Scene, hit: Option<&HitRecord>) -> Vec4 {
        match hit {
            Some(_) => scene.sphere.albedo.extend(1.0),
            None => scene.background.extend(1.0),
        }
    }
}

/// Second revision: diffuse term from a fixed directional light.
pub(crate) struct LambertShader;

impl Shade for LambertShader {
    fn shade(&self, scene: &Scene, hit: Option<&HitRecord>) -> Vec4 {
        let Some(rec) = hit else {
            return scene.background.extend(1.0);
        };
        // The dot product is clamped here; relying on the final color clamp
        // would fold negative products into legitimately dark shading.
        let intensity = (-scene.light_dir).dot(rec.normal).max(0.0);
        (scene.sphere.albedo * intensity).extend(1.0)
    }
}

//= TESTS ====================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use glam::{vec2, vec4};

    const EPS: f32 = 1e-5;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn axis_ray_hits_sphere_front() {
        let scene = Scene::new();
        let ray = scene.camera.ray(vec2(0.0, 0.0));
        let rec = scene.sphere.hit(&ray).expect("forward axis ray must hit");

        // Camera at z=1, radius 0.5: entry at z=0.5, exit at z=-0.5.
        assert!(approx(rec.t, 0.5));
        assert!(approx(rec.t_far, 1.5));
        assert!(rec.point.abs_diff_eq(vec3(0.0, 0.0, 0.5), EPS));
        assert!(rec.normal.abs_diff_eq(vec3(0.0, 0.0, 1.0), EPS));
    }

    #[test]
    fn near_root_precedes_far_root() {
        let scene = Scene::new();
        let ray = scene.camera.ray(vec2(0.3, -0.2));
        if let Some(rec) = scene.sphere.hit(&ray) {
            assert!(rec.t < rec.t_far);
        }
    }

    #[test]
    fn hit_normal_is_unit_length() {
        let scene = Scene::new();
        let ray = scene.camera.ray(vec2(0.25, 0.25));
        let rec = scene.sphere.hit(&ray).expect("near-center ray must hit");
        assert!(approx(rec.normal.length(), 1.0));
    }

    #[test]
    fn sideways_ray_misses() {
        let sphere = Sphere::new(Vec3::ZERO, 0.5, Vec3::ONE);
        let ray = Ray {
            origin: vec3(0.0, 0.0, 1.0),
            direction: vec3(1.0, 0.0, 0.0),
        };
        assert!(sphere.hit(&ray).is_none());
    }

    #[test]
    fn degenerate_direction_is_a_miss() {
        let sphere = Sphere::new(Vec3::ZERO, 0.5, Vec3::ONE);
        let ray = Ray {
            origin: vec3(0.0, 0.0, 1.0),
            direction: Vec3::ZERO,
        };
        assert!(sphere.hit(&ray).is_none());
    }

    #[test]
    fn lambert_normal_opposing_light_gives_full_albedo() {
        let scene = Scene::new();
        let rec = HitRecord {
            t: 1.0,
            t_far: 2.0,
            point: Vec3::ZERO,
            normal: -scene.light_dir,
        };
        let color = LambertShader.shade(&scene, Some(&rec));
        assert!(color.abs_diff_eq(scene.sphere.albedo.extend(1.0), EPS));
    }

    #[test]
    fn lambert_perpendicular_normal_gives_black() {
        let scene = Scene::new();
        let normal = vec3(1.0, -1.0, 0.0).normalize();
        assert!(approx(normal.dot(scene.light_dir), 0.0));

        let rec = HitRecord {
            t: 1.0,
            t_far: 2.0,
            point: Vec3::ZERO,
            normal,
        };
        let color = LambertShader.shade(&scene, Some(&rec));
        assert!(color.abs_diff_eq(vec4(0.0, 0.0, 0.0, 1.0), EPS));
    }

    #[test]
    fn lambert_backfacing_normal_clamps_to_black() {
        let scene = Scene::new();
        let rec = HitRecord {
            t: 1.0,
            t_far: 2.0,
            point: Vec3::ZERO,
            normal: scene.light_dir,
        };
        let color = LambertShader.shade(&scene, Some(&rec));
        assert!(color.abs_diff_eq(vec4(0.0, 0.0, 0.0, 1.0), EPS));
    }

    #[test]
    fn shaders_agree_on_miss_color() {
        let scene = Scene::new();
        let flat = FlatShader.shade(&scene, None);
        let lambert = LambertShader.shade(&scene, None);
        assert_eq!(flat, lambert);
        assert!(flat.abs_diff_eq(vec4(0.0, 0.0, 0.0, 1.0), EPS));
    }
}
