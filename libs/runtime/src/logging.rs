//! Subscriber setup from the `logging` config section.
//!
//! Every key but `default` names a subsystem (a target prefix such as
//! `entity_admin` or `admin_db`). Subsystems get their own console level and
//! optionally their own JSON log file; `default` covers every other target.
//! Console output goes to stderr; stdout belongs to command output.

use crate::config::{LoggingConfig, Section};
use std::{
    collections::HashMap,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{level_filters::LevelFilter, Level, Metadata};
use tracing_subscriber::{
    filter::{FilterFn, Targets},
    fmt,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_KEY: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_crate_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

type DefaultFilter = FilterFn<Box<dyn Fn(&Metadata<'_>) -> bool + Send + Sync + 'static>>;

/// Accepts targets outside every configured subsystem up to `max_level`.
fn default_filter(subsystems: &[String], max_level: Level) -> DefaultFilter {
    let subsystems = subsystems.to_vec();
    FilterFn::new(Box::new(move |meta: &Metadata<'_>| {
        !subsystems
            .iter()
            .any(|s| matches_crate_prefix(meta.target(), s))
            && meta.level() <= &max_level
    }))
}

// -------- rotating file writers --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

/// Writer that drops records with no destination file.
struct RoutedWriter(Option<RotWriter>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Picks the log file for a record by its target prefix.
#[derive(Clone, Default)]
struct MultiFileRouter {
    default: Option<RotWriter>,
    by_prefix: HashMap<String, RotWriter>,
}

impl MultiFileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_crate_prefix(target, prefix))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for MultiFileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.resolve_for(meta.target()))
    }
}

/// Resolve a log file path against `base_dir` (home_dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Keep `max_backups` rotated files when set, otherwise rotate away files
/// older than `max_age_days` (one day by default).
fn file_limit(section: &Section) -> FileLimit {
    match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(
            section.max_age_days.unwrap_or(1).into(),
        )),
    }
}

fn create_rotating_writer(log_path: &Path, section: &Section) -> io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(file_limit(section)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn file_writer_for(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    match create_rotating_writer(&log_path, section) {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!(
                "Failed to open log file for '{}': {} ({})",
                name,
                log_path.display(),
                e
            );
            None
        }
    }
}

// -------- config split --------

/// The `default` section apart from the per-subsystem sections.
struct LogPlan<'a> {
    default: Option<&'a Section>,
    subsystems: Vec<(String, &'a Section)>,
}

impl<'a> LogPlan<'a> {
    fn from_config(cfg: &'a LoggingConfig) -> Self {
        let mut subsystems: Vec<_> = cfg
            .iter()
            .filter(|(k, _)| k.as_str() != DEFAULT_KEY)
            .map(|(k, v)| (k.clone(), v))
            .collect();
        subsystems.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            default: cfg.get(DEFAULT_KEY),
            subsystems,
        }
    }

    fn subsystem_names(&self) -> Vec<String> {
        self.subsystems.iter().map(|(n, _)| n.clone()).collect()
    }

    fn console_targets(&self) -> Targets {
        self.targets(|s| Some(&s.console_level))
    }

    fn file_targets(&self) -> Targets {
        self.targets(|s| (!s.file.trim().is_empty()).then_some(&s.file_level))
    }

    fn targets(&self, level_of: impl Fn(&Section) -> Option<&String>) -> Targets {
        self.subsystems
            .iter()
            .filter_map(|(name, section)| {
                let level = parse_tracing_level(level_of(*section)?)?;
                Some((name.clone(), LevelFilter::from_level(level)))
            })
            .fold(Targets::new().with_default(LevelFilter::OFF), |t, (name, lvl)| {
                t.with_target(name, lvl)
            })
    }

    fn file_router(&self, base_dir: &Path) -> MultiFileRouter {
        MultiFileRouter {
            default: self
                .default
                .and_then(|s| file_writer_for(DEFAULT_KEY, s, base_dir)),
            by_prefix: self
                .subsystems
                .iter()
                .filter_map(|(name, s)| Some((name.clone(), file_writer_for(name, s, base_dir)?)))
                .collect(),
        }
    }
}

// -------- public init --------

/// Install the global subscriber.
/// `base_dir` resolves relative log file paths (usually `server.home_dir`).
/// Calling it again once a subscriber is installed is a no-op.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{prelude::*, Layer, Registry};

    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let plan = LogPlan::from_config(cfg);
    let names = plan.subsystem_names();
    let router = plan.file_router(base_dir);
    let ansi = atty::is(atty::Stream::Stderr);

    let console_layer = || {
        fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(ansi)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };
    let file_layer = || {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router.clone())
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> =
        vec![console_layer().with_filter(plan.console_targets()).boxed()];

    let default_section = plan.default;
    if let Some(lvl) = default_section.and_then(|s| parse_tracing_level(&s.console_level)) {
        layers.push(console_layer().with_filter(default_filter(&names, lvl)).boxed());
    }

    if !router.is_empty() {
        layers.push(file_layer().with_filter(plan.file_targets()).boxed());
    }
    if router.default.is_some() {
        if let Some(lvl) = default_section.and_then(|s| parse_tracing_level(&s.file_level)) {
            layers.push(file_layer().with_filter(default_filter(&names, lvl)).boxed());
        }
    }

    let _ = Registry::default().with(layers).try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_writer(io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}
