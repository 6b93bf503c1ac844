use std::fmt;

/// A primitive uniform value handed to kernels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum UniformValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i32),
    /// Scalar.
    Float(f32),
    /// Two-component vector.
    Vec2([f32; 2]),
    /// Three-component vector.
    Vec3([f32; 3]),
}

impl UniformValue {
    /// Scalar view: floats and ints convert, booleans map to `0`/`1`, vectors yield `x`.
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Bool(b) => f32::from(u8::from(b)),
            Self::Int(i) => i as f32,
            Self::Float(f) => f,
            Self::Vec2(v) => v[0],
            Self::Vec3(v) => v[0],
        }
    }

    /// Boolean view: numbers are `true` when non-zero.
    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            other => other.as_f32() != 0.0,
        }
    }

    /// Two-component view; scalars are splatted.
    pub fn as_vec2(self) -> [f32; 2] {
        match self {
            Self::Vec2(v) => v,
            Self::Vec3(v) => [v[0], v[1]],
            other => {
                let s = other.as_f32();
                [s, s]
            }
        }
    }

    /// Three-component view; scalars are splatted, `Vec2` gets `z = 0`.
    pub fn as_vec3(self) -> [f32; 3] {
        match self {
            Self::Vec3(v) => v,
            Self::Vec2(v) => [v[0], v[1], 0.0],
            other => {
                let s = other.as_f32();
                [s, s, s]
            }
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        Self::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v)
    }
}

/// A uniform parameter: either a constant or a producer re-invoked once per evaluated frame.
///
/// Producers are the only animation mechanism; nodes never read a clock themselves.
pub enum Uniform {
    /// Fixed value.
    Const(UniformValue),
    /// Zero-argument producer evaluated freshly each frame.
    Driven(Box<dyn Fn() -> UniformValue>),
}

impl Uniform {
    /// Wrap a producer closure.
    pub fn driven(f: impl Fn() -> UniformValue + 'static) -> Self {
        Self::Driven(Box::new(f))
    }

    /// Current value.
    pub fn resolve(&self) -> UniformValue {
        match self {
            Self::Const(v) => *v,
            Self::Driven(f) => f(),
        }
    }
}

impl fmt::Debug for Uniform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(v) => f.debug_tuple("Const").field(v).finish(),
            Self::Driven(_) => f.write_str("Driven(..)"),
        }
    }
}

impl From<UniformValue> for Uniform {
    fn from(v: UniformValue) -> Self {
        Self::Const(v)
    }
}

macro_rules! const_uniform_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Uniform {
                fn from(v: $t) -> Self {
                    Self::Const(v.into())
                }
            }
        )*
    };
}

const_uniform_from!(f32, i32, bool, [f32; 2], [f32; 3]);

/// Insertion-ordered uniform parameters of a node.
#[derive(Debug, Default)]
pub struct Uniforms {
    entries: Vec<(String, Uniform)>,
}

impl Uniforms {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<Uniform>) -> Self {
        self.set(name, value.into());
        self
    }

    /// Insert or replace a parameter; replacements keep their original position.
    pub fn set(&mut self, name: &str, value: Uniform) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Constant view of a parameter; driven parameters are resolved on the spot.
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, u)| u.resolve())
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every parameter into `out`, keeping insertion order.
    pub(crate) fn resolve_into(&self, out: &mut ResolvedUniforms) {
        out.values.clear();
        out.values
            .extend(self.entries.iter().map(|(n, u)| (n.clone(), u.resolve())));
    }
}

/// Uniform values frozen for one kernel invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedUniforms {
    values: Vec<(String, UniformValue)>,
}

impl ResolvedUniforms {
    /// Value by name.
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Scalar by name, or `default` when missing.
    pub fn f32_or(&self, name: &str, default: f32) -> f32 {
        self.get(name).map_or(default, UniformValue::as_f32)
    }

    /// Boolean by name, or `default` when missing.
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).map_or(default, UniformValue::as_bool)
    }

    /// Two-component vector by name, or `default` when missing.
    pub fn vec2_or(&self, name: &str, default: [f32; 2]) -> [f32; 2] {
        self.get(name).map_or(default, UniformValue::as_vec2)
    }

    /// Three-component vector by name, or `default` when missing.
    pub fn vec3_or(&self, name: &str, default: [f32; 3]) -> [f32; 3] {
        self.get(name).map_or(default, UniformValue::as_vec3)
    }

    /// Insert or replace a value.
    pub(crate) fn set(&mut self, name: &str, value: UniformValue) {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.values.push((name.to_string(), value)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/uniform.rs"]
mod tests;
