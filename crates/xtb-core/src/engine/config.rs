use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const MAX_ACCURACY: f64 = 1000.0;
// The engine takes the iteration limit as a C int.
const MAX_ITERATIONS: u32 = i32::MAX as u32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Unknown xtb method: '{0}' (expected GFN2-xTB, GFN1-xTB, GFN0-xTB or GFN-FF)")]
    UnknownMethod(String),
    #[error("Unknown verbosity level: '{0}' (expected muted, minimal or full)")]
    UnknownVerbosity(String),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// The tight-binding parametrization loaded into a calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Method {
    #[default]
    Gfn2Xtb,
    Gfn1Xtb,
    Gfn0Xtb,
    GfnFF,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Gfn2Xtb => "GFN2-xTB",
            Method::Gfn1Xtb => "GFN1-xTB",
            Method::Gfn0Xtb => "GFN0-xTB",
            Method::GfnFF => "GFN-FF",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gfn2-xtb" | "gfn2" => Ok(Method::Gfn2Xtb),
            "gfn1-xtb" | "gfn1" => Ok(Method::Gfn1Xtb),
            "gfn0-xtb" | "gfn0" => Ok(Method::Gfn0Xtb),
            "gfn-ff" | "gfnff" => Ok(Method::GfnFF),
            _ => Err(ConfigError::UnknownMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Amount of output the engine writes to its own channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Verbosity {
    Muted,
    #[default]
    Minimal,
    Full,
}

impl FromStr for Verbosity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "muted" => Ok(Verbosity::Muted),
            "minimal" => Ok(Verbosity::Minimal),
            "full" | "verbose" => Ok(Verbosity::Full),
            _ => Err(ConfigError::UnknownVerbosity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Verbosity {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Calculator settings for a single-point evaluation.
///
/// Optional fields left as `None` keep the engine's own defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XtbParameters {
    pub method: Method,
    pub verbosity: Verbosity,
    pub accuracy: Option<f64>,
    pub max_iterations: Option<u32>,
    pub electronic_temperature: Option<f64>,
}

impl XtbParameters {
    /// GFN2-xTB with full engine output, the setup of the fixed single-point entry point.
    pub fn verbose_gfn2() -> Self {
        Self {
            method: Method::Gfn2Xtb,
            verbosity: Verbosity::Full,
            ..Self::default()
        }
    }

    pub fn builder() -> XtbParametersBuilder {
        XtbParametersBuilder::new()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: display.clone(),
            source: e,
        })?;
        Self::parse(&content, &display)
    }

    fn parse(content: &str, path: &str) -> Result<Self, ConfigError> {
        let file: FileParameters = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: path.to_string(),
            source: e,
        })?;
        file.into_builder().build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(accuracy) = self.accuracy {
            if !(accuracy > 0.0 && accuracy <= MAX_ACCURACY) {
                return Err(ConfigError::InvalidValue {
                    field: "accuracy",
                    reason: format!("{accuracy} is outside (0, {MAX_ACCURACY}]"),
                });
            }
        }
        if let Some(iterations) = self.max_iterations {
            if !(1..=MAX_ITERATIONS).contains(&iterations) {
                return Err(ConfigError::InvalidValue {
                    field: "max_iterations",
                    reason: format!("{iterations} is outside 1..={MAX_ITERATIONS}"),
                });
            }
        }
        if let Some(temperature) = self.electronic_temperature {
            if !(temperature.is_finite() && temperature >= 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: "electronic_temperature",
                    reason: format!("{temperature} K is not a non-negative temperature"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct XtbParametersBuilder {
    method: Option<Method>,
    verbosity: Option<Verbosity>,
    accuracy: Option<f64>,
    max_iterations: Option<u32>,
    electronic_temperature: Option<f64>,
}

impl XtbParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }
    pub fn accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
    pub fn max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn electronic_temperature(mut self, kelvin: f64) -> Self {
        self.electronic_temperature = Some(kelvin);
        self
    }

    pub fn build(self) -> Result<XtbParameters, ConfigError> {
        let params = XtbParameters {
            method: self.method.unwrap_or_default(),
            verbosity: self.verbosity.unwrap_or_default(),
            accuracy: self.accuracy,
            max_iterations: self.max_iterations,
            electronic_temperature: self.electronic_temperature,
        };
        params.validate()?;
        Ok(params)
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct FileParameters {
    method: Option<Method>,
    verbosity: Option<Verbosity>,
    accuracy: Option<f64>,
    max_iterations: Option<u32>,
    electronic_temperature: Option<f64>,
}

impl FileParameters {
    fn into_builder(self) -> XtbParametersBuilder {
        XtbParametersBuilder {
            method: self.method,
            verbosity: self.verbosity,
            accuracy: self.accuracy,
            max_iterations: self.max_iterations,
            electronic_temperature: self.electronic_temperature,
        }
    }
}
