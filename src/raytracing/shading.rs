//! Recursive Whitted-style shading.
//!
//! Every camera ray is resolved with Phong direct lighting at the nearest hit,
//! shadow rays toward each light, and Fresnel weighted reflection and
//! refraction sub-rays, each of which re-enters [`Scene::trace_ray`].

use super::core::Scene;
use super::render::RenderConfig;
use super::{Color, Ray, Vec3};

/// Recursion depth past which a ray contributes only black.
pub const MAX_DEPTH: u32 = 6;
/// Offset along the normal applied to secondary ray origins.
pub const SURFACE_EPSILON: f64 = 1e-4;
pub const AIR_REFRACTIVE_INDEX: f64 = 1.0;
const SHININESS: i32 = 32;
const GAMMA: f64 = 2.2;

/// Linear color seen along `ray`. Primary rays start at depth 0.
pub fn shade(scene: &Scene, ray: &Ray, depth: u32, config: &RenderConfig) -> Color {
    if depth > config.max_depth {
        return Color::zero();
    }

    let hit = scene.trace_ray(ray);
    let (Some(object), Some(point), Some(normal)) = (hit.object, hit.position, hit.normal) else {
        return config.background;
    };
    let material = &object.material;

    let entering = ray.direction.dot(normal) < 0.0;
    let normal = if entering { normal } else { -normal };

    let mut result = material.ambient;

    let shadow_origin = point + normal * SURFACE_EPSILON;
    for light in scene.lights() {
        let to_light = light.position() - shadow_origin;
        let light_distance = to_light.len();
        let light_direction = to_light.normalize();

        // an occluder lets through as much light as its transparency, regardless of thickness
        let blocker = scene.trace_ray(&Ray::new(shadow_origin, light_direction));
        let contribution = match blocker.object {
            Some(occluder) if blocker.distance < light_distance => occluder.material.transparency,
            _ => 1.0,
        };
        if contribution <= 0.0 {
            continue;
        }

        let diffuse = normal.dot(light_direction).max(0.0);
        result += material.diffuse
            * light.color
            * (diffuse * contribution * (1.0 - material.transparency));

        let highlight = (-light_direction)
            .reflect(normal)
            .dot(-ray.direction)
            .max(0.0)
            .powi(SHININESS);
        result += material.specular * light.color * (highlight * contribution);
    }

    let (n1, n2) = if entering {
        (AIR_REFRACTIVE_INDEX, material.refractive_index)
    } else {
        (material.refractive_index, AIR_REFRACTIVE_INDEX)
    };
    let reflectance = fresnel(ray.direction, normal, n1, n2);
    let can_recurse = depth < config.max_depth;

    let refraction = if material.is_transparent() && can_recurse {
        try_refract(ray.direction, normal, n1 / n2).map(|direction| {
            let refracted = Ray::new(point - normal * SURFACE_EPSILON, direction);
            shade(scene, &refracted, depth + 1, config)
        })
    } else {
        None
    };

    let reflection = if (material.reflectivity > 0.0 || reflectance > 0.0) && can_recurse {
        let reflected = Ray::new(
            point + normal * SURFACE_EPSILON,
            ray.direction.reflect(normal).normalize(),
        );
        Some(shade(scene, &reflected, depth + 1, config))
    } else {
        None
    };

    let refraction = refraction.unwrap_or_else(Color::zero);
    let reflection = reflection.unwrap_or_else(Color::zero);
    if material.is_transparent() {
        let (surface, refracted, reflected) = blend_weights(material.transparency, reflectance);
        result * surface + refraction * refracted + reflection * reflected
    } else {
        result * (1.0 - material.reflectivity) + reflection * material.reflectivity
    }
}

/// Weights of (local surface color, refraction, reflection) for a transparent material.
/// They are non-negative and sum to 1.
pub fn blend_weights(transparency: f64, reflectance: f64) -> (f64, f64, f64) {
    let refraction = transparency * (1.0 - reflectance);
    let reflection = reflectance;
    let surface = 1.0 - refraction - reflection;
    (surface.max(0.0), refraction, reflection)
}

/// Unpolarised Fresnel reflectance: the mean of the s and p polarised terms.
/// `normal` faces against `incident`. Total internal reflection gives 1.
pub fn fresnel(incident: Vec3, normal: Vec3, n1: f64, n2: f64) -> f64 {
    let cos_i = (-incident.normalize().dot(normal)).clamp(0.0, 1.0);
    let eta = n1 / n2;
    let sin_t2 = eta * eta * (1.0 - cos_i * cos_i);
    if sin_t2 >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t2).sqrt();

    let s_denominator = n1 * cos_i + n2 * cos_t;
    let p_denominator = n2 * cos_i + n1 * cos_t;
    if s_denominator == 0.0 || p_denominator == 0.0 {
        return 1.0;
    }
    let rs = (n1 * cos_i - n2 * cos_t) / s_denominator;
    let rp = (n2 * cos_i - n1 * cos_t) / p_denominator;
    ((rs * rs + rp * rp) * 0.5).clamp(0.0, 1.0)
}

/// Snell refraction of `incident` through a surface whose `normal` faces
/// against it, with `eta = n1 / n2`. `None` on total internal reflection.
pub fn try_refract(incident: Vec3, normal: Vec3, eta: f64) -> Option<Vec3> {
    let incident = incident.normalize();
    let cos_i = -incident.dot(normal);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        return None;
    }
    Some((incident * eta + normal * (eta * cos_i - k.sqrt())).normalize())
}

/// Raises every channel to `1 / 2.2`. Negative channels become 0.
pub fn gamma_correct(color: Color) -> Color {
    color.map(|channel| {
        if channel > 0.0 {
            channel.powf(1.0 / GAMMA)
        } else {
            0.0
        }
    })
}
