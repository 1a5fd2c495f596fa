//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::{IpAddr, SocketAddr, ToSocketAddrs},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "slack-invite";
const ENV_PREFIX: &str = "SLACK_INVITE";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 80;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 10;
pub const DEFAULT_SLACK_API_URL: &str = "https://golangbg.slack.com/api/users.admin.invite";
const DEFAULT_SLACK_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TEMPLATES_DIR: &str = "templates";
const DEFAULT_ASSETS_DIR: &str = "static";

/// Command-line arguments for the slack-invite binary.
#[derive(Debug, Parser)]
#[command(
    name = "slack-invite",
    version,
    about = "Slack workspace invitation form"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SLACK_INVITE_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ServeOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Validate configuration and compile every page template, then exit.
    Check,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Slack API token used to issue invitations.
    #[arg(
        long = "token",
        env = "SI_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub token: Option<String>,

    /// Listen address: `PORT`, `:PORT` or `HOST:PORT`. Hostnames are resolved once at startup.
    #[arg(long = "listen", env = "SI_PORT", value_name = "ADDR", global = true)]
    pub listen: Option<String>,

    /// Override the listener host.
    #[arg(long = "host", value_name = "HOST", global = true)]
    pub host: Option<String>,

    /// Override the graceful shutdown timeout.
    #[arg(
        long = "graceful-shutdown-seconds",
        value_name = "SECONDS",
        global = true
    )]
    pub graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the invitation endpoint.
    #[arg(long = "slack-api-url", value_name = "URL", global = true)]
    pub slack_api_url: Option<String>,

    /// Override the outbound request timeout.
    #[arg(long = "slack-timeout-seconds", value_name = "SECONDS", global = true)]
    pub slack_timeout_seconds: Option<u64>,

    /// Show transport and decode error details to visitors.
    #[arg(
        long = "expose-error-detail",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub expose_error_detail: Option<bool>,

    /// Override the page template directory.
    #[arg(long = "templates-dir", value_name = "PATH", global = true)]
    pub templates_dir: Option<PathBuf>,

    /// Compile every page at startup and refuse to start on failure.
    #[arg(
        long = "precompile-templates",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub precompile_templates: Option<bool>,

    /// Override the static asset directory.
    #[arg(long = "static-dir", value_name = "PATH", global = true)]
    pub static_dir: Option<PathBuf>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub slack: SlackSettings,
    pub templates: TemplateSettings,
    pub assets: AssetSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct SlackSettings {
    pub api_url: Url,
    pub token: SecretString,
    pub timeout: Duration,
    pub expose_error_detail: bool,
}

#[derive(Debug, Clone)]
pub struct TemplateSettings {
    pub directory: PathBuf,
    pub precompile: bool,
}

#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("missing configuration for `{key}` ({hint})")]
    Missing {
        key: &'static str,
        hint: &'static str,
    },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_serve_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    slack: RawSlackSettings,
    templates: RawTemplateSettings,
    assets: RawAssetSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(token) = overrides.token.as_ref() {
            self.slack.token = Some(token.clone());
        }
        if let Some(listen) = overrides.listen.as_ref() {
            self.server.listen = Some(listen.clone());
        }
        if let Some(host) = overrides.host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(seconds) = overrides.graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.slack_api_url.as_ref() {
            self.slack.api_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.slack_timeout_seconds {
            self.slack.timeout_seconds = Some(seconds);
        }
        if let Some(expose) = overrides.expose_error_detail {
            self.slack.expose_error_detail = Some(expose);
        }
        if let Some(dir) = overrides.templates_dir.as_ref() {
            self.templates.directory = Some(dir.clone());
        }
        if let Some(precompile) = overrides.precompile_templates {
            self.templates.precompile = Some(precompile);
        }
        if let Some(dir) = overrides.static_dir.as_ref() {
            self.assets.directory = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            slack,
            templates,
            assets,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            slack: build_slack_settings(slack)?,
            templates: build_template_settings(templates)?,
            assets: build_asset_settings(assets)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let (listen_host, listen_port) = match server.listen.as_deref() {
        Some(listen) => {
            let (host, port) =
                split_listen(listen).map_err(|reason| LoadError::invalid("server.listen", reason))?;
            (host, Some(port))
        }
        None => (None, None),
    };

    let host = listen_host
        .or(server.host)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = listen_port.or(server.port).unwrap_or(DEFAULT_PORT);

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_slack_settings(slack: RawSlackSettings) -> Result<SlackSettings, LoadError> {
    let token = slack
        .token
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(LoadError::Missing {
            key: "slack.token",
            hint: "set SI_TOKEN or pass --token",
        })?;

    let raw_url = slack
        .api_url
        .unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string());
    let api_url = Url::parse(raw_url.trim())
        .map_err(|err| LoadError::invalid("slack.api_url", format!("{err}")))?;
    if !matches!(api_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "slack.api_url",
            "scheme must be http or https",
        ));
    }

    let timeout_secs = slack.timeout_seconds.unwrap_or(DEFAULT_SLACK_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "slack.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(SlackSettings {
        api_url,
        token: SecretString::from(token),
        timeout: Duration::from_secs(timeout_secs),
        expose_error_detail: slack.expose_error_detail.unwrap_or(true),
    })
}

fn build_template_settings(templates: RawTemplateSettings) -> Result<TemplateSettings, LoadError> {
    let directory = templates
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "templates.directory",
            "path must not be empty",
        ));
    }

    Ok(TemplateSettings {
        directory,
        precompile: templates.precompile.unwrap_or(true),
    })
}

fn build_asset_settings(assets: RawAssetSettings) -> Result<AssetSettings, LoadError> {
    let directory = assets
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "assets.directory",
            "path must not be empty",
        ));
    }

    Ok(AssetSettings { directory })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    listen: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSlackSettings {
    api_url: Option<String>,
    token: Option<String>,
    timeout_seconds: Option<u64>,
    expose_error_detail: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTemplateSettings {
    directory: Option<PathBuf>,
    precompile: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAssetSettings {
    directory: Option<PathBuf>,
}

/// Split a listen address (`8080`, `:8080`, `127.0.0.1:8080`, `[::1]:8080`) into host and port.
fn split_listen(value: &str) -> Result<(Option<String>, u16), String> {
    let trimmed = value.trim();
    if let Ok(port) = trimmed.parse::<u16>() {
        return Ok((None, port));
    }

    let Some((host, port)) = trimmed.rsplit_once(':') else {
        return Err(format!("invalid listen address `{trimmed}`"));
    };
    let port = port
        .parse::<u16>()
        .map_err(|err| format!("invalid port in `{trimmed}`: {err}"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    Ok(((!host.is_empty()).then(|| host.to_string()), port))
}

/// IP literals are used as-is; anything else is resolved and the first address wins.
fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|err| format!("invalid host `{host}`: {err}"))?
        .next()
        .ok_or_else(|| format!("host `{host}` did not resolve to any address"))
}
