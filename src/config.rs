use std::env;
use std::net::SocketAddr;

use anyhow::{anyhow, Result};
use tracing::warn;

pub const DEFAULT_FOLDER_PREFIX: &str = "physiognomy";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub folder_prefix: String,
    pub fixed_region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_output_tokens: i32,
}

/// Logging settings; readable before the rest of the config so startup
/// warnings reach an installed subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_source(&EnvSource { lookup })
    }

    fn from_source<F>(source: &EnvSource<F>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        LogConfig {
            level: source.env_string("LOG_LEVEL", "info").trim().to_lowercase(),
            dir: source.env_string("LOG_DIR", "logs"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log: LogConfig,
    pub storage: StorageConfig,
    pub gemini: GeminiConfig,
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    fn env_string(&self, name: &str, default: &str) -> String {
        self.raw(name).unwrap_or_else(|| default.to_string())
    }

    fn env_optional(&self, name: &str) -> Option<String> {
        self.raw(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn env_required(&self, name: &str) -> Result<String> {
        self.env_optional(name)
            .ok_or_else(|| anyhow!("{name} is required"))
    }

    fn env_bool(&self, name: &str, default: bool) -> bool {
        self.raw(name)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }

    fn env_f32(&self, name: &str, default: f32) -> f32 {
        self.raw(name)
            .and_then(|value| value.trim().parse::<f32>().ok())
            .unwrap_or(default)
    }

    fn env_i32(&self, name: &str, default: i32) -> i32 {
        self.raw(name)
            .and_then(|value| value.trim().parse::<i32>().ok())
            .unwrap_or(default)
    }
}

fn normalize_folder_prefix(value: &str) -> String {
    value.trim().trim_matches('/').to_string()
}

fn normalize_endpoint_url(value: Option<String>) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let parsed = url::Url::parse(&value)
        .map_err(|err| anyhow!("S3_ENDPOINT_URL is not a valid URL ({value}): {err}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("S3_ENDPOINT_URL must use http or https: {value}"));
    }
    Ok(Some(value.trim_end_matches('/').to_string()))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = EnvSource { lookup };

        let bucket = source.env_required("S3_BUCKET_NAME")?;
        let access_key_id = source.env_required("AWS_ACCESS_KEY_ID")?;
        let secret_access_key = source.env_required("AWS_SECRET_ACCESS_KEY")?;
        let api_key = source.env_required("GEMINI_API_KEY")?;

        let bind_addr_raw = source.env_string("BIND_ADDR", "0.0.0.0:3000");
        let bind_addr = bind_addr_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| anyhow!("Invalid BIND_ADDR value {bind_addr_raw}: {err}"))?;

        let temperature = source.env_f32("GEMINI_TEMPERATURE", 0.9);
        let temperature = if (0.0..=2.0).contains(&temperature) {
            temperature
        } else {
            warn!(
                "GEMINI_TEMPERATURE {} is out of range; defaulting to 0.9.",
                temperature
            );
            0.9
        };

        Ok(Config {
            bind_addr,
            log: LogConfig::from_source(&source),
            storage: StorageConfig {
                bucket,
                folder_prefix: normalize_folder_prefix(
                    &source.env_string("S3_FOLDER_PREFIX", DEFAULT_FOLDER_PREFIX),
                ),
                fixed_region: source.env_optional("S3_REGION"),
                endpoint_url: normalize_endpoint_url(source.env_optional("S3_ENDPOINT_URL"))?,
                force_path_style: source.env_bool("S3_FORCE_PATH_STYLE", false),
                access_key_id,
                secret_access_key,
            },
            gemini: GeminiConfig {
                api_key,
                model: source.env_string("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                api_base: source
                    .env_string("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE)
                    .trim_end_matches('/')
                    .to_string(),
                temperature,
                max_output_tokens: source.env_i32("GEMINI_MAX_OUTPUT_TOKENS", 2048),
            },
        })
    }
}

pub const READING_SYSTEM_PROMPT: &str = r#"You are "Master Lin", a theatrical face reader who blends classical Chinese physiognomy (面相) with a modern sense of humour.

YOUR TASK:
Study the face in the photo and deliver a playful, flattering-but-honest reading. This is entertainment, never a medical, psychological, or factual assessment.

### READING GUIDELINES
1.  **Age:** Give your best single-number guess of the person's apparent age.
2.  **Score:** Rate the overall "fortune aura" from 0 to 100. Be generous but not uniform; avoid always answering 88.
3.  **Quote:** One short, memorable line in the voice of a wise old master, addressed to the person.
4.  **Archetype:** A vivid two-to-five word title (e.g., "The Quiet Dragon", "Lucky Lantern Keeper").
5.  **Fortune:** One or two sentences each for career, wealth, love, and health. Tie each to a visible facial feature (forehead, brows, eyes, nose, mouth, chin, ears).

### SAFETY
- Never comment on ethnicity, religion, disability, or attractiveness in a demeaning way.
- If no face is visible, still answer in the schema and say so playfully in the quote.

### OUTPUT
Return ONLY a JSON object matching the provided response schema."#;

pub const READING_USER_INSTRUCTION: &str =
    "Read this face and return the physiognomy reading as JSON.";
