use anyhow::{Context, Result};
use bitflags::bitflags;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub main: MainConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MainConfig {
    #[serde(default)]
    pub work_mode: WorkMode,
    /// JSON file holding sites and proxy settings.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WorkMode: u8 {
        const CLI = 1;
        const WEB = 2;
    }
}

const MODE_NAMES: &[&str] = &["Cli", "Web"];

impl WorkMode {
    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("At least one work mode must be specified".to_string());
        }
        Ok(())
    }

    /// Case-insensitive, for the command line.
    pub fn parse_flag(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "cli" => Ok(WorkMode::CLI),
            "web" => Ok(WorkMode::WEB),
            _ => anyhow::bail!("Unknown mode: {} (expected cli or web)", value),
        }
    }

    fn from_mode_name<E: de::Error>(value: &str) -> Result<Self, E> {
        match value {
            "Cli" => Ok(WorkMode::CLI),
            "Web" => Ok(WorkMode::WEB),
            _ => Err(de::Error::unknown_variant(value, MODE_NAMES)),
        }
    }
}

impl Serialize for WorkMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut modes = Vec::new();
        if self.contains(WorkMode::CLI) {
            modes.push("Cli");
        }
        if self.contains(WorkMode::WEB) {
            modes.push("Web");
        }
        modes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WorkMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct WorkModeVisitor;

        impl<'de> Visitor<'de> for WorkModeVisitor {
            type Value = WorkMode;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a mode string or an array of mode strings")
            }

            fn visit_str<E>(self, value: &str) -> Result<WorkMode, E>
            where
                E: de::Error,
            {
                WorkMode::from_mode_name(value)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<WorkMode, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut mode = WorkMode::empty();
                while let Some(value) = seq.next_element::<String>()? {
                    mode |= WorkMode::from_mode_name(&value)?;
                }
                if mode.is_empty() {
                    return Err(de::Error::custom("Empty mode array not allowed"));
                }
                Ok(mode)
            }
        }

        deserializer.deserialize_any(WorkModeVisitor)
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.main.work_mode.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn generate_default_toml() -> String {
        toml::to_string_pretty(&Self::default()).expect("serialize default config")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}

impl Default for WorkMode {
    fn default() -> Self {
        WorkMode::WEB
    }
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            work_mode: WorkMode::default(),
            data_file: default_data_file(),
            verbose: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            static_dir: default_static_dir(),
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
