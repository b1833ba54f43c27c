//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/retrieval-datastore/config.toml` (XDG) or platform config dir
//! 2. Project config: `retrieval.toml` (or the path given to [`AppConfig::load_from`])
//! 3. Environment variables: `RETRIEVAL_*`, nested keys separated by `__`
//!
//! The `[datastore]` table is a tagged union: `kind` selects the backend and
//! the remaining keys are that backend's connection settings.
//!
//! ```toml
//! [datastore]
//! kind = "cloudsql-mysql"
//! project = "my-project"
//! region = "us-central1"
//! instance = "my-instance"
//! user = "retrieval"
//! password = "secret"
//! database = "assistantdemo"
//! ```
//!
//! ```toml
//! [datastore]
//! kind = "neo4j"
//! uri = "neo4j+s://xxxx.databases.neo4j.io"
//!
//! [datastore.auth]
//! username = "neo4j"
//! password = "secret"
//! ```
//!
//! ```toml
//! [datastore]
//! kind = "spanner-gsql"
//! project = "my-project"
//! instance = "my-instance"
//! database = "assistantdemo"
//! ```
//!
//! Environment override example: `RETRIEVAL_DATASTORE__PASSWORD=secret`.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::datastore::Kind;
use crate::error::DatastoreError;

/// Project config file looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "retrieval.toml";

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub datastore: DatastoreConfig,
}

/// Backend selection: one variant per supported datastore kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DatastoreConfig {
    #[serde(rename = "cloudsql-mysql")]
    CloudSqlMysql(MysqlConfig),
    #[serde(rename = "alloydb-postgres")]
    AlloyDbPostgres(PostgresConfig),
    #[serde(rename = "spanner-gsql")]
    SpannerGsql(SpannerConfig),
    #[serde(rename = "neo4j")]
    Neo4j(Neo4jConfig),
}

/// Cloud SQL for MySQL connection settings.
///
/// The instance is reached through the Cloud SQL Auth Proxy listening on
/// `host:port`; `project`, `region` and `instance` name the instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MysqlConfig {
    pub project: String,
    pub region: String,
    pub instance: String,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
}

/// AlloyDB for PostgreSQL connection settings.
///
/// Like [`MysqlConfig`], the instance is reached through a local auth proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub project: String,
    pub region: String,
    pub cluster: String,
    pub instance: String,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
}

/// Cloud Spanner connection settings.
///
/// Without a key file, application default credentials are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpannerConfig {
    pub project: String,
    pub instance: String,
    pub database: String,
    #[serde(default)]
    pub service_account_key_file: Option<String>,
}

/// Neo4j connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// Bolt URI (e.g., `neo4j://localhost:7687`).
    pub uri: String,
    pub auth: Neo4jAuth,
}

/// Neo4j basic-auth credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neo4jAuth {
    pub username: String,
    pub password: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_postgres_port() -> u16 {
    5432
}

impl DatastoreConfig {
    /// Returns the discriminator of this configuration.
    pub fn kind(&self) -> Kind {
        match self {
            DatastoreConfig::CloudSqlMysql(_) => Kind::CloudSqlMysql,
            DatastoreConfig::AlloyDbPostgres(_) => Kind::AlloyDbPostgres,
            DatastoreConfig::SpannerGsql(_) => Kind::SpannerGsql,
            DatastoreConfig::Neo4j(_) => Kind::Neo4j,
        }
    }

    /// Checks connection parameters without touching the network.
    pub fn validate(&self) -> Result<(), DatastoreError> {
        match self {
            DatastoreConfig::CloudSqlMysql(c) => {
                require(&[
                    ("project", &c.project),
                    ("region", &c.region),
                    ("instance", &c.instance),
                    ("user", &c.user),
                    ("database", &c.database),
                    ("host", &c.host),
                ])?;
                require_port(c.port)
            }
            DatastoreConfig::AlloyDbPostgres(c) => {
                require(&[
                    ("project", &c.project),
                    ("region", &c.region),
                    ("cluster", &c.cluster),
                    ("instance", &c.instance),
                    ("user", &c.user),
                    ("database", &c.database),
                    ("host", &c.host),
                ])?;
                require_port(c.port)
            }
            DatastoreConfig::SpannerGsql(c) => {
                require(&[
                    ("project", &c.project),
                    ("instance", &c.instance),
                    ("database", &c.database),
                ])?;
                match &c.service_account_key_file {
                    Some(path) => require(&[("service_account_key_file", path)]),
                    None => Ok(()),
                }
            }
            DatastoreConfig::Neo4j(c) => {
                require(&[("uri", &c.uri), ("auth.username", &c.auth.username)])?;
                if !c.uri.contains("://") {
                    return Err(DatastoreError::InvalidConfig(format!(
                        "neo4j uri '{}' has no scheme",
                        c.uri
                    )));
                }
                Ok(())
            }
        }
    }
}

impl MysqlConfig {
    /// Cloud SQL instance connection name: `project:region:instance`.
    pub fn connection_name(&self) -> String {
        format!("{}:{}:{}", self.project, self.region, self.instance)
    }
}

impl SpannerConfig {
    /// Fully qualified database path.
    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

impl PostgresConfig {
    /// AlloyDB instance URI path.
    pub fn instance_uri(&self) -> String {
        format!(
            "projects/{}/locations/{}/clusters/{}/instances/{}",
            self.project, self.region, self.cluster, self.instance
        )
    }
}

fn require(fields: &[(&str, &String)]) -> Result<(), DatastoreError> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(DatastoreError::InvalidConfig(format!(
            "'{}' must not be empty",
            name
        ))),
        None => Ok(()),
    }
}

fn require_port(port: u16) -> Result<(), DatastoreError> {
    if port == 0 {
        return Err(DatastoreError::InvalidConfig("'port' must not be 0".into()));
    }
    Ok(())
}

impl AppConfig {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(PROJECT_CONFIG_FILE)
    }

    /// Load config using `project_file` as the project layer.
    pub fn load_from(project_file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::figment(project_file.as_ref())
            .extract()
            .map_err(ConfigError::from)
    }

    fn figment(project_file: &Path) -> Figment {
        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(project_file))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("RETRIEVAL_").split("__"))
    }

    /// User config path: ~/.config/retrieval-datastore/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home
                .join(".config")
                .join("retrieval-datastore")
                .join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("retrieval-datastore").join("config.toml"))
            .unwrap_or_default()
    }
}
