use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camera::{Facing, SourceConfig, StreamRequest};
use capture::{CaptureSettings, Dispatch, FallbackPolicy, ShareMetadata};
use lens::params::{MAX_CURVATURE, MAX_RADIUS, MAX_ZOOM, MIN_CURVATURE, MIN_RADIUS, MIN_ZOOM};
use lens::{LensParameters, LensShape, DEFAULT_RADIUS, DEFAULT_STEP};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

pub const CONFIG_VERSION: u32 = 1;
pub const CONFIG_FILE_NAME: &str = "convexcam.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CamConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub lens: LensSection,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub window: WindowSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LensSection {
    pub curvature: f32,
    pub zoom: f32,
    pub radius: f32,
    pub step: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraSection {
    pub facing: Facing,
    pub front_device: u32,
    pub back_device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mirror: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureSection {
    pub quality: u8,
    pub fallback: FallbackPolicy,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub flash: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub share_command: Vec<String>,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for CamConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            lens: LensSection::default(),
            camera: CameraSection::default(),
            capture: CaptureSection::default(),
            window: WindowSection::default(),
        }
    }
}

impl Default for LensSection {
    fn default() -> Self {
        let params = LensParameters::default();
        Self {
            curvature: params.curvature(),
            zoom: params.zoom(),
            radius: DEFAULT_RADIUS,
            step: DEFAULT_STEP,
        }
    }
}

impl Default for CameraSection {
    fn default() -> Self {
        let request = StreamRequest::default();
        Self {
            facing: Facing::User,
            front_device: 0,
            back_device: 1,
            width: request.width,
            height: request.height,
            fps: request.fps,
            mirror: request.mirror,
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        let settings = CaptureSettings::default();
        Self {
            quality: settings.quality,
            fallback: settings.fallback,
            flash: settings.flash,
            download_dir: None,
            share_command: Vec::new(),
            title: settings.metadata.title,
            text: settings.metadata.text,
        }
    }
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Convex Cam".to_string(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || !v.is_finite() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

impl CamConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: CamConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|err| ConfigError::Invalid(format!("failed to serialise configuration: {err}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        let lens = &self.lens;
        if !(MIN_CURVATURE..=MAX_CURVATURE).contains(&lens.curvature) {
            return Err(ConfigError::Invalid(format!(
                "lens.curvature must be within [{MIN_CURVATURE}, {MAX_CURVATURE}], got {}",
                lens.curvature
            )));
        }
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&lens.zoom) {
            return Err(ConfigError::Invalid(format!(
                "lens.zoom must be within [{MIN_ZOOM}, {MAX_ZOOM}], got {}",
                lens.zoom
            )));
        }
        if !(MIN_RADIUS..=MAX_RADIUS).contains(&lens.radius) {
            return Err(ConfigError::Invalid(format!(
                "lens.radius must be within [{MIN_RADIUS}, {MAX_RADIUS}], got {}",
                lens.radius
            )));
        }
        if !(lens.step > 0.0 && lens.step <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "lens.step must be within (0, 1], got {}",
                lens.step
            )));
        }

        let camera = &self.camera;
        if camera.width == 0 || camera.height == 0 {
            return Err(ConfigError::Invalid(
                "camera.width and camera.height must be greater than zero".into(),
            ));
        }
        if camera.fps == 0 {
            return Err(ConfigError::Invalid("camera.fps must be greater than zero".into()));
        }

        let capture = &self.capture;
        if !(1..=100).contains(&capture.quality) {
            return Err(ConfigError::Invalid(format!(
                "capture.quality must be within [1, 100], got {}",
                capture.quality
            )));
        }
        if let Some(program) = capture.share_command.first() {
            if program.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "capture.share_command must start with a program name".into(),
                ));
            }
        }
        if let Some(dir) = &capture.download_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "capture.download_dir may not be empty".into(),
                ));
            }
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(
                "window.width and window.height must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    pub fn lens_parameters(&self) -> LensParameters {
        LensParameters::new(self.lens.curvature, self.lens.zoom)
    }

    pub fn lens_shape(&self) -> LensShape {
        LensShape::with_radius(self.lens.radius)
    }

    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            front_device: self.camera.front_device,
            back_device: self.camera.back_device,
            request: StreamRequest {
                width: self.camera.width,
                height: self.camera.height,
                fps: self.camera.fps,
                mirror: self.camera.mirror,
            },
        }
    }

    pub fn capture_settings(&self, dispatch: Dispatch) -> CaptureSettings {
        CaptureSettings {
            quality: self.capture.quality,
            fallback: self.capture.fallback,
            flash: self.capture.flash,
            metadata: ShareMetadata {
                title: self.capture.title.clone(),
                text: self.capture.text.clone(),
            },
            dispatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[lens]
curvature = 0.7
zoom = 1.5
radius = 0.45
step = 0.1

[camera]
facing = "environment"
front_device = 2
back_device = 0
width = 1280
height = 720
fps = 60
mirror = true

[capture]
quality = 90
fallback = "preview"
flash = "200ms"
download_dir = "/tmp/shots"
share_command = ["xdg-open", "{file}"]
title = "Mirror"
text = "look"

[window]
width = 800
height = 600
title = "Lens"
"#;

    #[test]
    fn parses_sample_config() {
        let config = CamConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.lens.curvature, 0.7);
        assert_eq!(config.lens_shape().radius, 0.45);
        assert_eq!(config.camera.facing, Facing::Environment);
        assert_eq!(config.source_config().device_for(Facing::User), 2);
        assert_eq!(config.capture.flash, Duration::from_millis(200));
        assert_eq!(config.capture.fallback, FallbackPolicy::Preview);
        assert_eq!(config.capture.share_command, vec!["xdg-open", "{file}"]);

        let settings = config.capture_settings(Dispatch::Inline);
        assert_eq!(settings.quality, 90);
        assert_eq!(settings.metadata.title, "Mirror");
        assert_eq!(settings.dispatch, Dispatch::Inline);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = CamConfig::from_toml_str("").unwrap();
        assert_eq!(config, CamConfig::default());
        assert_eq!(config.lens.radius, 0.48);
        assert_eq!(config.lens.step, 0.05);
        assert_eq!(config.capture.quality, 95);
        assert_eq!(config.capture.fallback, FallbackPolicy::Download);
        assert_eq!(config.capture.flash, Duration::from_millis(150));
        let params = config.lens_parameters();
        assert_eq!((params.curvature(), params.zoom()), (0.5, 1.0));
    }

    #[test]
    fn numeric_flash_is_seconds() {
        let config = CamConfig::from_toml_str("[capture]\nflash = 0.25\n").unwrap();
        assert_eq!(config.capture.flash, Duration::from_millis(250));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for input in [
            "version = 2",
            "[lens]\ncurvature = 1.5",
            "[lens]\nzoom = 0.0",
            "[lens]\nradius = 0.3",
            "[lens]\nstep = 0.0",
            "[camera]\nfps = 0",
            "[capture]\nquality = 0",
            "[capture]\nshare_command = [\"\"]",
            "[window]\nheight = 0",
        ] {
            let err = CamConfig::from_toml_str(input).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{input}: {err}");
        }
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = CamConfig::from_toml_str("[lens\ncurvature = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = CamConfig::from_toml_str("[capture]\nflash = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialised_config_round_trips() {
        let config = CamConfig::from_toml_str(SAMPLE).unwrap();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("flash = \"200ms\""));
        assert_eq!(CamConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join(CONFIG_FILE_NAME);
        assert_eq!(CamConfig::load(&missing).unwrap(), CamConfig::default());

        fs::write(&missing, "[lens]\nzoom = 2.0\n").unwrap();
        assert_eq!(CamConfig::load(&missing).unwrap().lens.zoom, 2.0);

        let err = CamConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
