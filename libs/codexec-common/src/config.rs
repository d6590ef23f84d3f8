// Executor configuration
// Loaded from config/codexec.json, then overridden from the environment

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/codexec.json";

/// Runtime settings shared by the API, the CLI and the execution core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Whether the HTTP execution routes are mounted at all
    pub enabled: bool,
    /// Directory under which per-request workspaces are created
    pub scratch_root: PathBuf,
    /// Wall-clock deadline for running guest code (compilation is not bounded)
    pub timeout_seconds: u64,
    /// JDK installation; `bin/java` and `bin/javac` are used from here when set
    pub java_home: Option<PathBuf>,
    /// Kotlin compiler installation; provides `bin/kotlinc` and `lib/kotlin-stdlib.jar`
    pub kotlin_home: Option<PathBuf>,
    /// Host support types visible to guest code at compile and run time
    pub host_classpath: Vec<PathBuf>,
    /// Extra flags for the guest JVM
    pub jvm_args: Vec<String>,
    /// Snippets larger than this are rejected before touching the filesystem
    pub max_source_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scratch_root: std::env::temp_dir().join("codexec"),
            timeout_seconds: 10,
            java_home: None,
            kotlin_home: None,
            host_classpath: Vec::new(),
            jvm_args: vec!["-Xss1m".to_string(), "-XX:+UseSerialGC".to_string()],
            max_source_bytes: 1024 * 1024,
        }
    }
}

impl ExecutorConfig {
    /// Load configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Executor config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ExecutorConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from config/codexec.json when present, defaults otherwise,
    /// then apply environment overrides
    pub fn load_default() -> Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let config = if default_path.exists() {
            Self::load(default_path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides through a lookup function.
    ///
    /// Taking the lookup as a parameter keeps tests away from process-wide
    /// environment mutation.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enabled) = lookup("CODEXEC_ENABLED") {
            self.enabled = match enabled.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => bail!("Invalid CODEXEC_ENABLED value: {}", other),
            };
        }
        if let Some(root) = lookup("CODEXEC_SCRATCH_ROOT") {
            self.scratch_root = PathBuf::from(root);
        }
        if let Some(timeout) = lookup("CODEXEC_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid CODEXEC_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Some(home) = lookup("JAVA_HOME") {
            self.java_home = Some(PathBuf::from(home));
        }
        if let Some(home) = lookup("KOTLIN_HOME") {
            self.kotlin_home = Some(PathBuf::from(home));
        }
        let classpath = lookup("CODEXEC_HOST_CLASSPATH").or_else(|| lookup("CLASSPATH"));
        if let Some(classpath) = classpath {
            self.host_classpath = std::env::split_paths(&classpath)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            bail!("timeout_seconds must be greater than zero");
        }
        if self.max_source_bytes == 0 {
            bail!("max_source_bytes must be greater than zero");
        }
        Ok(())
    }

    /// Path of a JDK tool, from `java_home` when configured, else looked up on PATH
    pub fn jdk_tool(&self, tool: &str) -> PathBuf {
        match &self.java_home {
            Some(home) => home.join("bin").join(tool),
            None => PathBuf::from(tool),
        }
    }

    /// Path of the Kotlin compiler
    pub fn kotlinc(&self) -> PathBuf {
        match &self.kotlin_home {
            Some(home) => home.join("bin").join("kotlinc"),
            None => PathBuf::from("kotlinc"),
        }
    }

    /// Kotlin standard library needed on the guest JVM classpath
    pub fn kotlin_stdlib(&self) -> Option<PathBuf> {
        self.kotlin_home
            .as_ref()
            .map(|home| home.join("lib").join("kotlin-stdlib.jar"))
    }
}
