use std::path::PathBuf;

use backdrop_core::asset::CanonicalMode;
use backdrop_pipeline::PipelineConfig;

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
const DEFAULT_OUTPUT_DIR: &str = "./output";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Log output format, from `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Worker configuration loaded from environment variables.
///
/// | Env Var             | Default                                            |
/// |---------------------|----------------------------------------------------|
/// | `GENAI_API_URL`     | `https://generativelanguage.googleapis.com/v1beta` |
/// | `GENAI_API_KEY`     | required                                           |
/// | `GENAI_MODEL`       | `gemini-2.5-flash-image`                           |
/// | `INPUT_DIR`         | required                                           |
/// | `OUTPUT_DIR`        | `./output`                                         |
/// | `CANONICAL_MODE`    | `square`                                           |
/// | `BACKGROUND_PROMPT` | built-in backdrop prompt                           |
/// | `JOB_PROMPT`        | built-in compositing prompt                        |
/// | `LOG_FORMAT`        | `text`                                             |
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mode: CanonicalMode,
    pub pipeline: PipelineConfig,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GENAI_API_KEY").ok_or(ConfigError::Missing("GENAI_API_KEY"))?;
        let input_dir = get("INPUT_DIR")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("INPUT_DIR"))?;

        let mode = match get("CANONICAL_MODE") {
            Some(raw) => raw
                .parse::<CanonicalMode>()
                .map_err(|e| ConfigError::Invalid {
                    var: "CANONICAL_MODE",
                    message: e.to_string(),
                })?,
            None => CanonicalMode::default(),
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            backdrop_instructions: get("BACKGROUND_PROMPT")
                .unwrap_or(defaults.backdrop_instructions),
            job_instructions: get("JOB_PROMPT").unwrap_or(defaults.job_instructions),
        };

        Ok(Self {
            api_url: get("GENAI_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            api_key,
            model: get("GENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            input_dir,
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            mode,
            pipeline,
            log_format: LogFormat::parse(get("LOG_FORMAT").as_deref()),
        })
    }
}
