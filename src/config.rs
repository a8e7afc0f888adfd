//! Configuration management for the DITA PDF server

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::job::RecipeSettings;
use crate::render::OutputFormat;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub renderer: RendererConfig,
    pub fs: FsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Name of the application directory holding job roots
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Header carrying the client correlation id
    pub request_id_header: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    pub executable: PathBuf,
    pub format: OutputFormat,
    pub style: Option<PathBuf>,
    pub verbose: bool,
    pub java_home: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FsConfig {
    pub use_native_temp: bool,
    pub root_path: Option<PathBuf>,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

const DEFAULT_APP_NAME: &str = "dita-pdf-server";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                name: DEFAULT_APP_NAME.to_string(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                request_id_header: "x-request-id".to_string(),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            renderer: RendererConfig {
                executable: PathBuf::from("dita"),
                format: OutputFormat::Pdf,
                style: None,
                verbose: false,
                java_home: None,
                timeout_secs: None,
            },
            fs: FsConfig {
                use_native_temp: true,
                root_path: None,
            },
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let executable = var("RENDERER_EXECUTABLE").ok_or(ConfigError::Missing("RENDERER_EXECUTABLE"))?;

        let use_native_temp = parse_or(&var, "FS_USE_NATIVE_TEMP", defaults.fs.use_native_temp)?;
        let root_path = var("FS_ROOT_PATH").map(PathBuf::from);
        if !use_native_temp && root_path.is_none() {
            return Err(ConfigError::Missing("FS_ROOT_PATH"));
        }

        let format = match var("RENDERER_FORMAT") {
            Some(value) => value.parse().map_err(|e: crate::render::RenderError| {
                ConfigError::Invalid {
                    var: "RENDERER_FORMAT",
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => defaults.renderer.format,
        };

        Ok(Config {
            app: AppConfig {
                name: var("APP_NAME").unwrap_or(defaults.app.name),
            },
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or(&var, "SERVER_PORT", defaults.server.port)?,
                request_id_header: var("REQUEST_ID_HEADER")
                    .map(|h| h.to_ascii_lowercase())
                    .unwrap_or(defaults.server.request_id_header),
                max_upload_bytes: parse_or(
                    &var,
                    "MAX_UPLOAD_BYTES",
                    defaults.server.max_upload_bytes,
                )?,
            },
            renderer: RendererConfig {
                executable: PathBuf::from(executable),
                format,
                style: var("RENDERER_STYLE").map(PathBuf::from),
                verbose: parse_or(&var, "RENDERER_VERBOSE", defaults.renderer.verbose)?,
                java_home: var("RENDERER_JAVA_HOME").map(PathBuf::from),
                timeout_secs: var("RENDERER_TIMEOUT_SECS")
                    .map(|v| parse_value("RENDERER_TIMEOUT_SECS", v))
                    .transpose()?,
            },
            fs: FsConfig {
                use_native_temp,
                root_path,
            },
        })
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl RendererConfig {
    /// Per-job renderer settings
    pub fn recipe_settings(&self) -> RecipeSettings {
        RecipeSettings {
            executable: self.executable.clone(),
            format: self.format,
            style: self.style.clone(),
            verbose: self.verbose,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => parse_value(key, value),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var: key,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("RENDERER_EXECUTABLE", "/opt/dita/bin/dita")]).unwrap();

        assert_eq!(config.app.name, "dita-pdf-server");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.server.request_id_header, "x-request-id");
        assert_eq!(config.server.max_upload_bytes, 64 * 1024 * 1024);
        assert_eq!(config.renderer.format, OutputFormat::Pdf);
        assert_eq!(config.renderer.style, None);
        assert!(!config.renderer.verbose);
        assert_eq!(config.renderer.timeout(), None);
        assert!(config.fs.use_native_temp);
    }

    #[test]
    fn test_executable_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Missing("RENDERER_EXECUTABLE"))
        ));
        assert!(matches!(
            load(&[("RENDERER_EXECUTABLE", "  ")]),
            Err(ConfigError::Missing("RENDERER_EXECUTABLE"))
        ));
    }

    #[test]
    fn test_full_environment() {
        let config = load(&[
            ("APP_NAME", "pdf-jobs"),
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "9000"),
            ("REQUEST_ID_HEADER", "X-Correlation-Id"),
            ("MAX_UPLOAD_BYTES", "1024"),
            ("RENDERER_EXECUTABLE", "/opt/dita/bin/dita"),
            ("RENDERER_FORMAT", "pdf-css-html5"),
            ("RENDERER_STYLE", "custom/main.css"),
            ("RENDERER_VERBOSE", "true"),
            ("RENDERER_JAVA_HOME", "/opt/jdk"),
            ("RENDERER_TIMEOUT_SECS", "120"),
            ("FS_USE_NATIVE_TEMP", "false"),
            ("FS_ROOT_PATH", "/var/lib/pdf"),
        ])
        .unwrap();

        assert_eq!(config.app.name, "pdf-jobs");
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.server.request_id_header, "x-correlation-id");
        assert_eq!(config.server.max_upload_bytes, 1024);
        assert_eq!(config.renderer.format, OutputFormat::PdfCssHtml5);
        assert_eq!(config.renderer.java_home, Some(PathBuf::from("/opt/jdk")));
        assert_eq!(config.renderer.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.fs.root_path, Some(PathBuf::from("/var/lib/pdf")));

        let settings = config.renderer.recipe_settings();
        assert_eq!(settings.style, Some(PathBuf::from("custom/main.css")));
        assert!(settings.verbose);
    }

    #[test]
    fn test_unsupported_format_rejected_at_load() {
        match load(&[
            ("RENDERER_EXECUTABLE", "dita"),
            ("RENDERER_FORMAT", "html5"),
        ]) {
            Err(ConfigError::Invalid { var, value, .. }) => {
                assert_eq!(var, "RENDERER_FORMAT");
                assert_eq!(value, "html5");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(matches!(
            load(&[("RENDERER_EXECUTABLE", "dita"), ("SERVER_PORT", "http")]),
            Err(ConfigError::Invalid { var: "SERVER_PORT", .. })
        ));
        assert!(matches!(
            load(&[("RENDERER_EXECUTABLE", "dita"), ("RENDERER_VERBOSE", "yes")]),
            Err(ConfigError::Invalid { var: "RENDERER_VERBOSE", .. })
        ));
    }

    #[test]
    fn test_root_path_required_without_native_temp() {
        assert!(matches!(
            load(&[
                ("RENDERER_EXECUTABLE", "dita"),
                ("FS_USE_NATIVE_TEMP", "false"),
            ]),
            Err(ConfigError::Missing("FS_ROOT_PATH"))
        ));
    }
}
