use admin_db::DbConnConfig;
use admin_query::{SchemaDecl, SchemaRegistry};
use anyhow::{anyhow, Context, Result};
use entity_admin::config::AdminConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Application configuration: typed global sections plus the schema
/// declarations the admin engine serves.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Store connection; defaults to an in-memory SQLite database.
    #[serde(default)]
    pub database: DbConnConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Listing defaults and facet encoding for the admin service.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Directory of extra YAML files, each holding a list of schemas.
    #[serde(default)]
    pub schemas_dir: Option<String>,
    #[serde(default)]
    pub schemas: Vec<SchemaDecl>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Normalized to an absolute path on load. Empty means the platform default.
    #[serde(default)]
    pub home_dir: String,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Section {
    /// "trace", "debug", "info", "warn", "error" or "off"
    pub console_level: String,
    /// Relative paths are resolved against `server.home_dir`; empty disables the file.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/dbadmin.log".to_string(),
            file_level: "debug".to_string(),
            max_age_days: Some(7),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DbConnConfig::default(),
            logging: Some(default_logging_config()),
            admin: AdminConfig::default(),
            schemas_dir: None,
            schemas: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Layered loading: defaults → YAML file → `APP__` environment variables.
    /// Normalizes `server.home_dir` and merges `schemas_dir` files.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Logging stays None unless YAML/ENV provides it.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let path = config_path.as_ref();
        if !path.exists() {
            return Err(anyhow!("config file not found: {}", path.display()));
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            // APP__DATABASE__DSN=postgres://... maps to database.dsn
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        normalize_home_dir_inplace(&mut config.server)
            .context("Failed to resolve server.home_dir")?;

        if let Some(dir) = config.schemas_dir.clone() {
            merge_schema_files(&mut config.schemas, dir)?;
        }

        Ok(config)
    }

    /// Load configuration from file or fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.server)
                    .context("Failed to resolve server.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(dsn) = &args.dsn {
            self.database.dsn = dsn.clone();
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }

    /// Validate the declared schemas into the shared registry.
    pub fn schema_registry(&self) -> Result<SchemaRegistry> {
        SchemaRegistry::build(self.schemas.clone()).context("Invalid schema declarations")
    }

    /// Database section with a relative SQLite path anchored at `server.home_dir`.
    pub fn resolved_database(&self) -> Result<DbConnConfig> {
        let mut db = self.database.clone();
        db.dsn = absolutize_sqlite_dsn(&db.dsn, Path::new(&self.server.home_dir))?;
        Ok(db)
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub dsn: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
}

const DEFAULT_SUBDIR: &str = ".dbadmin";

#[cfg(windows)]
const HOME_VAR: &str = "APPDATA";
#[cfg(not(windows))]
const HOME_VAR: &str = "HOME";

fn user_home() -> Result<PathBuf> {
    std::env::var_os(HOME_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("{HOME_VAR} is not set; configure server.home_dir explicitly"))
}

/// Resolve a configured home dir: empty → `<home>/.dbadmin`, `~` expanded,
/// relative paths anchored at the current directory.
fn resolve_home_dir(raw: &str, home: impl Fn() -> Result<PathBuf>) -> Result<PathBuf> {
    let raw = raw.trim();
    let path = if raw.is_empty() {
        home()?.join(DEFAULT_SUBDIR)
    } else if raw == "~" {
        home()?
    } else if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        home()?.join(rest)
    } else {
        PathBuf::from(raw)
    };

    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let resolved = resolve_home_dir(&server.home_dir, user_home)?;
    std::fs::create_dir_all(&resolved)
        .with_context(|| format!("Failed to create {}", resolved.display()))?;
    server.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

/// Rewrite a relative SQLite DSN into an absolute one under `base_dir`.
/// Memory DSNs and other engines pass through untouched.
pub fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    let trimmed = dsn.trim();
    if !trimmed.starts_with("sqlite:") || trimmed.contains(":memory:") || trimmed.contains("mode=memory") {
        return Ok(trimmed.to_string());
    }
    let db_path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or_default();

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };
    if path_str.is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }

    let mut p = PathBuf::from(path_str);
    if p.is_relative() {
        p = base_dir.join(p);
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Append the schemas of every `*.yaml`/`*.yml` file in `dir`, sorted by file name.
fn merge_schema_files(schemas: &mut Vec<SchemaDecl>, dir: impl AsRef<Path>) -> Result<()> {
    use std::fs;
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if path.is_file() && (ext == "yml" || ext == "yaml") {
            files.push(path);
        }
    }
    files.sort();

    for path in files {
        let raw = fs::read_to_string(&path)?;
        let decls: Vec<SchemaDecl> = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid schema file {}", path.display()))?;
        schemas.extend(decls);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use admin_query::FacetEncoding;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(dir: &Path, yaml: &str) -> PathBuf {
        let cfg_path = dir.join("cfg.yaml");
        fs::write(&cfg_path, yaml).unwrap();
        cfg_path
    }

    /// Forward slashes keep Windows paths valid inside YAML strings.
    fn yaml_path(p: &Path) -> String {
        p.to_string_lossy().replace('\\', "/")
    }

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        // raw (not yet normalized)
        assert_eq!(config.server.home_dir, "");
        assert_eq!(config.database.dsn, "sqlite::memory:");
        assert_eq!(config.admin.default_page_size, 50);
        assert!(config.schemas.is_empty());

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "info");
        assert_eq!(default_section.file, "logs/dbadmin.log");
    }

    #[test]
    fn test_resolve_home_dir_variants() {
        let tmp = tempdir().unwrap();
        let home = || Ok(tmp.path().to_path_buf());

        assert_eq!(resolve_home_dir("", home).unwrap(), tmp.path().join(".dbadmin"));
        assert_eq!(resolve_home_dir("~", home).unwrap(), tmp.path());
        assert_eq!(
            resolve_home_dir("~/.admin_test", home).unwrap(),
            tmp.path().join(".admin_test")
        );

        let relative = resolve_home_dir("data/admin", home).unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("data/admin"));

        let missing = resolve_home_dir("", || Err(anyhow!("HOME is not set")));
        assert!(missing.is_err());
    }

    #[test]
    fn test_load_layered_reads_all_sections() {
        let tmp = tempdir().unwrap();
        let home = tmp.path().join("home");
        let yaml = format!(
            r#"
server:
  home_dir: "{}"

database:
  dsn: "sqlite://admin.db"
  pool:
    max_conns: 4

admin:
  default_page_size: 20
  max_page_size: 200
  facet_encoding: positional

logging:
  default:
    console_level: debug
    file: "logs/default.log"

schemas:
  - class_name: Person
    table: person
    namespace: people
    fields:
      - name: id
        type: integer
        primary_key: true
      - name: name
        type: string
"#,
            yaml_path(&home)
        );
        let cfg_path = write_config(tmp.path(), &yaml);

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(Path::new(&config.server.home_dir).is_absolute());
        assert!(home.exists(), "home_dir is created on load");
        assert_eq!(config.database.dsn, "sqlite://admin.db");
        assert_eq!(config.database.pool.as_ref().unwrap().max_conns, Some(4));
        assert_eq!(config.admin.default_page_size, 20);
        assert_eq!(config.admin.facet_encoding, FacetEncoding::Positional);
        assert_eq!(config.logging.as_ref().unwrap()["default"].file, "logs/default.log");

        let registry = config.schema_registry().unwrap();
        assert!(registry.find_by_class_name("Person").is_ok());
    }

    #[test]
    fn test_minimal_yaml_config() {
        let tmp = tempdir().unwrap();
        let yaml = format!("server:\n  home_dir: \"{}\"\n", yaml_path(tmp.path()));
        let cfg_path = write_config(tmp.path(), &yaml);

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert_eq!(config.database.dsn, "sqlite::memory:");
        assert!(config.logging.is_none());
        assert!(config.schemas.is_empty());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = AppConfig::load_layered(tmp.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let tmp = tempdir().unwrap();
        let yaml = format!(
            "server:\n  home_dir: \"{}\"\nadmin:\n  page_size: 10\n",
            yaml_path(tmp.path())
        );
        let cfg_path = write_config(tmp.path(), &yaml);

        assert!(AppConfig::load_layered(&cfg_path).is_err());
    }

    #[test]
    fn test_schemas_dir_files_are_merged_in_name_order() {
        let tmp = tempdir().unwrap();
        let schemas_dir = tmp.path().join("schemas");
        fs::create_dir_all(&schemas_dir).unwrap();
        fs::write(
            schemas_dir.join("b_team.yaml"),
            r#"
- class_name: Team
  table: team
  fields:
    - { name: code, type: string, primary_key: true }
"#,
        )
        .unwrap();
        fs::write(
            schemas_dir.join("a_tag.yml"),
            r#"
- class_name: Tag
  table: tag
  fields:
    - { name: id, type: integer, primary_key: true }
"#,
        )
        .unwrap();
        fs::write(schemas_dir.join("notes.txt"), "ignored").unwrap();

        let yaml = format!(
            r#"
server:
  home_dir: "{}"
schemas_dir: "{}"
schemas:
  - class_name: Person
    table: person
    fields:
      - {{ name: id, type: integer, primary_key: true }}
"#,
            yaml_path(tmp.path()),
            yaml_path(&schemas_dir)
        );
        let cfg_path = write_config(tmp.path(), &yaml);

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        let names: Vec<_> = config.schemas.iter().map(|s| s.class_name.as_str()).collect();
        assert_eq!(names, vec!["Person", "Tag", "Team"]);
    }

    #[test]
    fn test_invalid_schema_declarations_fail_registry_build() {
        let config = AppConfig {
            schemas: vec![SchemaDecl::new("Broken", "broken")],
            ..AppConfig::default()
        };

        let err = config.schema_registry().unwrap_err();
        assert!(err.to_string().contains("Invalid schema declarations"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            dsn: Some("postgres://app@localhost/admin".into()),
            verbose: 2,
            ..CliArgs::default()
        };

        config.apply_cli_overrides(&args);

        assert_eq!(config.database.dsn, "postgres://app@localhost/admin");
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "trace");
    }

    #[test]
    fn test_cli_verbose_levels_matrix() {
        for (verbose, expected) in [(0, "info"), (1, "debug"), (2, "trace"), (3, "trace")] {
            let mut config = AppConfig::default();
            config.apply_cli_overrides(&CliArgs {
                verbose,
                ..CliArgs::default()
            });

            let logging = config.logging.as_ref().unwrap();
            assert_eq!(logging["default"].console_level, expected);
        }
    }

    #[test]
    fn test_absolutize_sqlite_dsn() {
        let base = Path::new("/srv/dbadmin");

        assert_eq!(
            absolutize_sqlite_dsn("sqlite://data/admin.db?mode=rwc", base).unwrap(),
            "sqlite:///srv/dbadmin/data/admin.db?mode=rwc"
        );
        assert_eq!(
            absolutize_sqlite_dsn("sqlite::memory:", base).unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            absolutize_sqlite_dsn("postgres://db/admin", base).unwrap(),
            "postgres://db/admin"
        );
        assert!(absolutize_sqlite_dsn("sqlite://", base).is_err());
    }

    #[test]
    fn test_to_yaml_roundtrip_basic() {
        let mut config = AppConfig::default();
        config.schemas.push(SchemaDecl::new("Person", "person"));

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("server:"));
        assert!(yaml.contains("database:"));
        assert!(yaml.contains("logging:"));

        let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip.database, config.database);
        assert_eq!(roundtrip.schemas, config.schemas);
    }
}
