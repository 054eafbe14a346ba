use std::collections::HashMap;
use std::sync::Arc;

use super::Color;

/// Phong surface description plus the parameters of the recursive transport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    /// Mirror reflection weight in `[0, 1]`.
    pub reflectivity: f64,
    /// Fraction of light transmitted through the surface, in `[0, 1]`.
    pub transparency: f64,
    /// Index of refraction, `>= 1`.
    pub refractive_index: f64,
}

impl Material {
    /// Builds a material, clamping the scalar parameters into their valid ranges.
    pub fn new(
        ambient: Color,
        diffuse: Color,
        specular: Color,
        reflectivity: f64,
        transparency: f64,
        refractive_index: f64,
    ) -> Material {
        Material {
            ambient,
            diffuse,
            specular,
            reflectivity: reflectivity.clamp(0.0, 1.0),
            transparency: transparency.clamp(0.0, 1.0),
            refractive_index: refractive_index.max(1.0),
        }
    }

    pub fn opaque(ambient: Color, diffuse: Color, specular: Color) -> Material {
        Material::new(ambient, diffuse, specular, 0.0, 0.0, 1.0)
    }

    pub fn single_color(color: Color) -> Material {
        Material::opaque(color, color, color)
    }

    pub fn with_reflectivity(self, reflectivity: f64) -> Material {
        Material {
            reflectivity: reflectivity.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn with_transparency(self, transparency: f64) -> Material {
        Material {
            transparency: transparency.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn with_refractive_index(self, refractive_index: f64) -> Material {
        Material {
            refractive_index: refractive_index.max(1.0),
            ..self
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.transparency > 0.0
    }
}

/// Read-only registry of named material presets.
///
/// Built once up front and shared; every lookup hands out the same `Arc`,
/// so many objects can reference one preset.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    presets: HashMap<&'static str, Arc<Material>>,
}

pub const DEFAULT_MATERIAL: &str = "white_plastic";

impl MaterialLibrary {
    /// The classic OpenGL material table plus a glass preset.
    pub fn standard() -> MaterialLibrary {
        // name, ambient, diffuse, specular, (reflectivity, transparency, refractive index)
        #[rustfmt::skip]
        let presets: [(&'static str, [f64; 3], [f64; 3], [f64; 3], [f64; 3]); 19] = [
            ("emerald", [0.0215, 0.1745, 0.0215], [0.07568, 0.61424, 0.07568], [0.633, 0.727811, 0.633], [0.6, 0.0, 1.0]),
            ("jade", [0.135, 0.2225, 0.1575], [0.54, 0.89, 0.63], [0.316228, 0.316228, 0.316228], [0.1, 0.0, 1.0]),
            ("obsidian", [0.05375, 0.05, 0.06625], [0.18275, 0.17, 0.22525], [0.332741, 0.328634, 0.346435], [0.3, 0.0, 1.0]),
            ("pearl", [0.25, 0.20725, 0.20725], [1.0, 0.829, 0.829], [0.296648, 0.296648, 0.296648], [0.088, 0.0, 1.0]),
            ("ruby", [0.1745, 0.01175, 0.01175], [0.61424, 0.04136, 0.04136], [0.727811, 0.626959, 0.626959], [0.6, 0.3, 1.76]),
            ("turquoise", [0.1, 0.18725, 0.1745], [0.396, 0.74151, 0.69102], [0.297254, 0.30829, 0.306678], [0.1, 0.0, 1.0]),
            ("brass", [0.329412, 0.223529, 0.027451], [0.780392, 0.568627, 0.113725], [0.992157, 0.941176, 0.807843], [0.21794872, 0.0, 1.0]),
            ("bronze", [0.2125, 0.1275, 0.054], [0.714, 0.4284, 0.18144], [0.393548, 0.271906, 0.166721], [0.2, 0.0, 1.0]),
            ("chrome", [0.25, 0.25, 0.25], [0.4, 0.4, 0.4], [0.774597, 0.774597, 0.774597], [0.6, 0.0, 1.0]),
            ("copper", [0.19125, 0.0735, 0.0225], [0.7038, 0.27048, 0.0828], [0.256777, 0.137622, 0.086014], [0.1, 0.0, 1.0]),
            ("gold", [0.24725, 0.1995, 0.0745], [0.75164, 0.60648, 0.22648], [0.628281, 0.555802, 0.366065], [0.4, 0.0, 1.0]),
            ("silver", [0.19225, 0.19225, 0.19225], [0.50754, 0.50754, 0.50754], [0.508273, 0.508273, 0.508273], [0.4, 0.0, 1.0]),
            ("black_plastic", [0.0, 0.0, 0.0], [0.01, 0.01, 0.01], [0.5, 0.5, 0.5], [0.25, 0.0, 1.0]),
            ("cyan_plastic", [0.0, 0.1, 0.06], [0.0, 0.50980392, 0.50980392], [0.50196078, 0.50196078, 0.50196078], [0.25, 0.0, 1.0]),
            ("green_plastic", [0.0, 0.0, 0.0], [0.1, 0.35, 0.1], [0.45, 0.55, 0.45], [0.25, 0.0, 1.0]),
            ("red_plastic", [0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.7, 0.6, 0.6], [0.25, 0.0, 1.0]),
            ("white_plastic", [0.0, 0.0, 0.0], [0.55, 0.55, 0.55], [0.7, 0.7, 0.7], [0.25, 0.0, 1.0]),
            ("yellow_plastic", [0.0, 0.0, 0.0], [0.5, 0.5, 0.0], [0.6, 0.6, 0.5], [0.25, 0.0, 1.0]),
            ("glass", [0.02, 0.05, 0.05], [0.2, 0.2, 0.2], [1.0, 1.0, 1.0], [0.1, 0.95, 1.5]),
        ];

        MaterialLibrary {
            presets: presets
                .into_iter()
                .map(|(name, ambient, diffuse, specular, [reflectivity, transparency, ior])| {
                    let material = Material::new(
                        ambient.into(),
                        diffuse.into(),
                        specular.into(),
                        reflectivity,
                        transparency,
                        ior,
                    );
                    (name, Arc::new(material))
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Material>> {
        self.presets.get(name).cloned()
    }

    /// The preset objects get when nothing else is specified.
    pub fn default_material(&self) -> Arc<Material> {
        self.get(DEFAULT_MATERIAL)
            .unwrap_or_else(|| Arc::new(Material::single_color(Color::splat(0.55))))
    }

    /// Preset names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.presets.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_shared() {
        let library = MaterialLibrary::standard();
        let a = library.get("gold").unwrap();
        let b = library.get("gold").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(library.names().len(), 19);
    }

    #[test]
    fn test_preset_parameters_are_in_range() {
        let library = MaterialLibrary::standard();
        for name in library.names() {
            let material = library.get(name).unwrap();
            assert!((0.0..=1.0).contains(&material.reflectivity), "{name}");
            assert!((0.0..=1.0).contains(&material.transparency), "{name}");
            assert!(material.refractive_index >= 1.0, "{name}");
        }
        let glass = library.get("glass").unwrap();
        assert!(glass.is_transparent());
        assert_eq!(glass.refractive_index, 1.5);
    }

    #[test]
    fn test_constructor_clamps_parameters() {
        let m = Material::single_color(Color::one())
            .with_reflectivity(1.5)
            .with_transparency(-0.2)
            .with_refractive_index(0.5);
        assert_eq!(m.reflectivity, 1.0);
        assert_eq!(m.transparency, 0.0);
        assert_eq!(m.refractive_index, 1.0);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(MaterialLibrary::standard().get("unobtainium").is_none());
    }
}
