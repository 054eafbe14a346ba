use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{
    camera::Camera,
    core::{Light, Scene, SceneObject},
    material::{Material, MaterialLibrary},
    model::load_obj_triangles,
    transform::TransformId,
    Color, Quaternion, Vec3,
};

pub struct SceneParser<'a> {
    content: Vec<char>,
    library: &'a MaterialLibrary,
    base_dir: PathBuf,
    buffer: String,
    position: FilePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePosition {
    pub line: u32,
    pub column: u32,
    index: usize,
}

impl FilePosition {
    fn new() -> Self {
        FilePosition {
            line: 0,
            column: 0,
            index: 0,
        }
    }

    fn on_new_line(&mut self) {
        self.line += 1;
        self.column = 0;
        self.index += 1;
    }

    fn advance(&mut self) {
        self.column += 1;
        self.index += 1;
    }
}

#[derive(Debug, Clone)]
pub struct ParserError {
    pub position: FilePosition,
    pub message: String,
}

impl ParserError {
    fn new(message: &str, position: FilePosition) -> ParserError {
        ParserError {
            position,
            message: message.to_string(),
        }
    }

    /// The offending line followed by a caret under the error column.
    pub fn error_location(&self, content: &str) -> Option<String> {
        let line = content.lines().nth(self.position.line as usize)?;
        let spacing = " ".repeat(self.position.column as usize);
        Some(format!("{line}\n{spacing}^"))
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // lines and columns are stored 0-based
        write!(
            f,
            "{} at {}:{}",
            self.message,
            self.position.line + 1,
            self.position.column + 1
        )
    }
}

impl std::error::Error for ParserError {}

type ParserResult<T> = Result<T, ParserError>;

pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub camera: Camera,
    pub scene: Scene,
}

impl<'a> SceneParser<'a> {
    pub fn new(content: &str, library: &'a MaterialLibrary) -> SceneParser<'a> {
        SceneParser {
            content: content.chars().collect(),
            library,
            base_dir: PathBuf::new(),
            position: FilePosition::new(),
            buffer: String::new(),
        }
    }

    /// Directory `model` paths are resolved against.
    pub fn with_base_dir(self, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..self
        }
    }

    fn get_current_char(&self) -> Option<char> {
        self.content.get(self.position.index).copied()
    }

    fn is_empty(&mut self) -> bool {
        self.peek().is_empty()
    }

    fn advance(&mut self) -> bool {
        if let Some(current_char) = self.get_current_char() {
            if current_char == '\n' {
                self.position.on_new_line();
            } else {
                self.position.advance();
            }
            return true;
        }
        false
    }

    fn advance_until(&mut self, f: impl Fn(char) -> bool) {
        while let Some(current_char) = self.get_current_char() {
            if f(current_char) {
                break;
            }
            self.advance();
        }
    }

    fn eat_spaces(&mut self) {
        // consume all the empty lines, spaces and comments before the next token
        while let Some(current_char) = self.get_current_char() {
            if current_char == '#' {
                // the end-of-line itself is consumed at the end of the loop
                self.advance_until(|c| c == '\n');
            } else if !current_char.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn pop(&mut self) -> String {
        // check if we already peeked without eating the next token
        if !self.buffer.is_empty() {
            return std::mem::take(&mut self.buffer);
        }

        self.eat_spaces();
        let mut result = String::new();
        let Some(mut current_char) = self.get_current_char() else {
            return result;
        };
        // add the current char to the result string and advance
        let enqueue = |parser: &mut SceneParser, result: &mut String| {
            if let Some(current_char) = parser.get_current_char() {
                result.push(current_char);
                parser.advance();
            }
            parser.get_current_char().unwrap_or(' ')
        };

        match current_char {
            ',' | '(' | ')' | ':' | '>' => {
                self.advance();
                result.push(current_char);
            }
            '"' => {
                enqueue(self, &mut result);
                // no escapes: the string ends at the next quote
                while let Some(c) = self.get_current_char() {
                    enqueue(self, &mut result);
                    if c == '"' {
                        break;
                    }
                }
            }
            '.' | '+' | '-' | '0'..='9' => {
                if current_char == '+' || current_char == '-' {
                    current_char = enqueue(self, &mut result);
                }
                while current_char.is_ascii_digit() {
                    current_char = enqueue(self, &mut result);
                }
                if current_char == '.' {
                    current_char = enqueue(self, &mut result);
                    while current_char.is_ascii_digit() {
                        current_char = enqueue(self, &mut result);
                    }
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                while current_char.is_alphanumeric() || current_char == '_' {
                    current_char = enqueue(self, &mut result);
                }
            }
            // a lone unknown symbol becomes its own token so it can be reported
            _ => {
                enqueue(self, &mut result);
            }
        }
        result
    }

    fn peek(&mut self) -> &str {
        // peek always look ahead and save the result to the buffer
        if self.buffer.is_empty() {
            self.buffer = self.pop();
        }
        &self.buffer
    }

    fn error<T>(&self, message: &str) -> ParserResult<T> {
        log::debug!("scene parse error: {message}");
        Err(ParserError::new(message, self.position))
    }

    fn parse_float(&mut self) -> ParserResult<f64> {
        let next_token = self.pop();
        match next_token.parse::<f64>() {
            Ok(num) if num.is_finite() => Ok(num),
            _ => self.error(&format!("cannot interpret '{next_token}' as a number")),
        }
    }

    fn parse_positive(&mut self, what: &str) -> ParserResult<f64> {
        let value = self.parse_float()?;
        if value <= 0.0 {
            return self.error(&format!("{what} must be positive, got {value}"));
        }
        Ok(value)
    }

    fn match_token(&mut self, expected_lexem: &str) -> ParserResult<()> {
        let next_lexem = self.pop();
        if next_lexem != expected_lexem {
            self.error(&format!(
                "expected '{expected_lexem}', getting '{next_lexem}' instead"
            ))
        } else {
            Ok(())
        }
    }

    fn maybe_match(&mut self, expected_lexem: &str) -> bool {
        // if the expected lexem is the next in the stream, consume it and return true,
        // otherwise leave the stream untouched
        if self.peek() == expected_lexem {
            self.pop();
            return true;
        }
        false
    }

    fn parse_header(&mut self) -> ParserResult<(u32, u32)> {
        self.match_token("size")?;
        let width = self.parse_dimension("image width")?;
        let height = self.parse_dimension("image height")?;
        Ok((width, height))
    }

    fn parse_dimension(&mut self, what: &str) -> ParserResult<u32> {
        let next_token = self.pop();
        match next_token.parse::<u32>() {
            Ok(value) if value > 0 => Ok(value),
            _ => self.error(&format!(
                "{what} must be a positive whole number of pixels, got '{next_token}'"
            )),
        }
    }

    fn parse_vec3(&mut self) -> ParserResult<Vec3> {
        self.match_token("(")?;
        let x = self.parse_float()?;
        self.match_token(",")?;
        let y = self.parse_float()?;
        self.match_token(",")?;
        let z = self.parse_float()?;
        self.match_token(")")?;
        Ok(Vec3::new(x, y, z))
    }

    fn parse_color(&mut self) -> ParserResult<Color> {
        let token = self.peek().to_string();
        if let Some(color) = named_color(&token) {
            self.pop();
            Ok(color)
        } else {
            self.parse_vec3()
        }
    }

    fn parse_string(&mut self) -> ParserResult<String> {
        let token = self.pop();
        match token
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            Some(content) => Ok(content.to_string()),
            None => self.error(&format!("expected a quoted string, getting '{token}'")),
        }
    }

    /// `preset | color [reflect f] [transparent f] [ior f]`; defaults to the
    /// library default when nothing material-like follows.
    fn parse_material(&mut self) -> ParserResult<Arc<Material>> {
        let token = self.peek().to_string();
        let base = if let Some(preset) = self.library.get(&token) {
            self.pop();
            preset
        } else if token == "(" || named_color(&token).is_some() {
            let color = self.parse_color()?;
            Arc::new(Material::opaque(color * 0.1, color, Color::splat(0.5)))
        } else if is_word(&token)
            && !STATEMENTS.contains(&token.as_str())
            && !MODIFIERS.contains(&token.as_str())
        {
            return self.error(&format!(
                "unknown material preset '{token}', expected one of: {}",
                self.library.names().join(", ")
            ));
        } else {
            self.library.default_material()
        };

        let mut material = *base;
        let mut modified = false;
        loop {
            if self.maybe_match("reflect") {
                material = material.with_reflectivity(self.parse_float()?);
            } else if self.maybe_match("transparent") {
                material = material.with_transparency(self.parse_float()?);
            } else if self.maybe_match("ior") {
                material = material.with_refractive_index(self.parse_float()?);
            } else {
                break;
            }
            modified = true;
        }
        Ok(if modified { Arc::new(material) } else { base })
    }

    fn parse_camera(&mut self) -> ParserResult<Camera> {
        if !self.maybe_match("camera") {
            return Ok(Camera::default());
        }
        let mut camera = Camera::default();
        if self.maybe_match("from") {
            camera.position = self.parse_vec3()?;
        }
        let point = if self.maybe_match("to") {
            self.parse_vec3()?
        } else {
            camera.position + Vec3::z_axis()
        };
        camera.point_at(point);
        if self.maybe_match("up") {
            camera.up = self.parse_vec3()?;
        }
        if self.maybe_match("fov") {
            camera.fov = self.parse_float()?;
            if !(0.0..180.0).contains(&camera.fov) || camera.fov == 0.0 {
                return self.error("field of view must be between 0 and 180 degrees");
            }
        }
        Ok(camera)
    }

    /// Chain of `> translate (v)`, `> rotate (axis) degrees`, `> scale f|(x,y,z)`.
    fn parse_transformation(&mut self, scene: &mut Scene, id: TransformId) -> ParserResult<()> {
        while self.maybe_match(">") {
            let next_token = self.pop();
            let transforms = scene.transforms_mut();
            match next_token.as_str() {
                "translate" => {
                    let offset = self.parse_vec3()?;
                    transforms.translate(id, offset);
                }
                "rotate" => {
                    let axis = self.parse_vec3()?;
                    let degrees = self.parse_float()?;
                    transforms.rotate(id, Quaternion::from_axis_angle(axis, degrees.to_radians()));
                }
                "scale" => {
                    let factor = if self.peek() == "(" {
                        self.parse_vec3()?
                    } else {
                        Vec3::splat(self.parse_float()?)
                    };
                    let scale = transforms.scale(id) * factor;
                    transforms.set_scale(id, scale);
                }
                _ => {
                    return self.error(&format!(
                        "unexpected transformation '{next_token}', expected translate, rotate or scale"
                    ))
                }
            }
        }
        Ok(())
    }

    fn parse_light(&mut self, scene: &mut Scene) -> ParserResult<()> {
        self.match_token("light")?;
        let position = self.parse_vec3()?;
        let color = self.parse_color()?;
        let light = Light::new(scene.transforms_mut(), position, color);
        let id = scene.add_light(light);
        self.parse_transformation(scene, id)
    }

    fn parse_object(&mut self, kind: &str, scene: &mut Scene) -> ParserResult<()> {
        self.match_token(kind)?;
        let object = match kind {
            "sphere" => {
                let center = self.parse_vec3()?;
                let radius = self.parse_positive("sphere radius")?;
                let material = self.parse_material()?;
                SceneObject::sphere(scene.transforms_mut(), center, radius, material)
            }
            "triangle" => {
                let a = self.parse_vec3()?;
                let b = self.parse_vec3()?;
                let c = self.parse_vec3()?;
                let material = self.parse_material()?;
                SceneObject::triangle(scene.transforms_mut(), [a, b, c], material)
            }
            "plane" => {
                let center = self.parse_vec3()?;
                let width = self.parse_positive("plane width")?;
                let length = self.parse_positive("plane length")?;
                let material = self.parse_material()?;
                SceneObject::plane(scene.transforms_mut(), center, width, length, material)
            }
            "cube" => {
                let center = self.parse_vec3()?;
                let side = self.parse_positive("cube side")?;
                let material = self.parse_material()?;
                SceneObject::cube(scene.transforms_mut(), center, side, material)
            }
            "level" => {
                let origin = self.parse_vec3()?;
                let v = self.parse_vec3()?;
                let w = self.parse_vec3()?;
                let material = self.parse_material()?;
                SceneObject::level(scene.transforms_mut(), origin, v, w, material)
            }
            "model" => {
                let path = self.parse_string()?;
                let material = self.parse_material()?;
                let triangles = self.load_model(&path)?;
                let name = Path::new(&path)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone());
                SceneObject::mesh(scene.transforms_mut(), name, Vec3::zero(), triangles, material)
            }
            _ => return self.error(&format!("unexpected token '{kind}'")),
        };
        let id = scene.add_object(object);
        self.parse_transformation(scene, id)
    }

    fn load_model(&self, path: &str) -> ParserResult<Vec<super::model::TrianglePoints>> {
        let full_path = self.base_dir.join(path);
        load_obj_triangles(&full_path).or_else(|err| {
            log::error!("cannot load model {}: {err}", full_path.display());
            self.error(&format!("cannot load model \"{path}\""))
        })
    }

    /// Parses the whole file.
    pub fn parse_scene(&mut self) -> ParserResult<ImageData> {
        let (width, height) = self.parse_header()?;
        let camera = self.parse_camera()?;

        let mut scene = Scene::new();
        while !self.is_empty() {
            let next_token = self.peek().to_string();
            match next_token.as_str() {
                "light" => self.parse_light(&mut scene)?,
                kind if STATEMENTS.contains(&kind) => self.parse_object(kind, &mut scene)?,
                _ => return self.error(&format!("unexpected token '{next_token}'")),
            }
        }
        scene.commit();
        log::info!(
            "parsed scene: {} objects, {} lights",
            scene.objects().len(),
            scene.lights().len()
        );
        Ok(ImageData {
            width,
            height,
            camera,
            scene,
        })
    }
}

const STATEMENTS: [&str; 7] = ["light", "sphere", "triangle", "plane", "cube", "level", "model"];
const MODIFIERS: [&str; 3] = ["reflect", "transparent", "ior"];

fn is_word(token: &str) -> bool {
    token.starts_with(|c: char| c.is_alphabetic() || c == '_')
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "red" => Color::new(1.0, 0.0, 0.0),
        "blue" => Color::new(0.0, 0.0, 1.0),
        "green" => Color::new(0.0, 1.0, 0.0),
        "white" => Color::new(1.0, 1.0, 1.0),
        "black" => Color::new(0.0, 0.0, 0.0),
        "cyan" => Color::new(0.0, 1.0, 1.0),
        "violet" => Color::new(1.0, 0.0, 1.0),
        "fuchsia" => Color::new(0.96, 0.0, 0.96),
        "yellow" => Color::new(1.0, 1.0, 0.0),
        "orange" => Color::new(0.98, 0.45, 0.02),
        _ => return None,
    };
    Some(color)
}
