// CLI commands for running snippets and checking the local toolchain
use anyhow::{bail, Context, Result};
use codexec_common::config::{ExecutorConfig, DEFAULT_CONFIG_PATH};
use codexec_common::types::{ExecutionOutcome, ExecutionRequest, Language};
use codexec_core::Engine;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

/// Load the executor config from an explicit file, or the default location
pub fn load_config(path: Option<&Path>) -> Result<ExecutorConfig> {
    match path {
        Some(path) => ExecutorConfig::load(path)?.apply_env(|key| std::env::var(key).ok()),
        None => ExecutorConfig::load_default(),
    }
}

/// Language tag implied by a source file's extension
pub fn infer_language(file: &Path) -> Option<Language> {
    let ext = file.extension()?.to_str()?;
    Language::ALL
        .into_iter()
        .find(|lang| lang.file_extension().eq_ignore_ascii_case(ext))
}

/// Compile and run a snippet file
pub async fn execute_file(
    engine: &Engine,
    file: &Path,
    language: Option<&str>,
) -> Result<ExecutionOutcome> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let inferred = infer_language(file).map(|l| l.to_string());
    let tag = language.or(inferred.as_deref());

    let request = ExecutionRequest::new(source, tag);
    Ok(engine.dispatch(&request).await)
}

pub fn render(outcome: ExecutionOutcome, tagged: bool) -> Result<String> {
    let text = if tagged {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string_pretty(&outcome.into_response())?
    };
    Ok(text)
}

pub async fn run_file(
    config: ExecutorConfig,
    file: &Path,
    language: Option<&str>,
    tagged: bool,
) -> Result<()> {
    let engine = Engine::new(config);
    let outcome = execute_file(&engine, file, language).await?;
    let succeeded = outcome.is_value();

    println!("{}", render(outcome, tagged)?);

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// First line a tool prints for its version flag, `None` when it cannot run
fn probe(tool: &Path, flag: &str) -> Option<String> {
    let output = Command::new(tool)
        .arg(flag)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    // java and javac print their version on stderr
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .or_else(|| Some(String::from("(no version output)")))
}

pub fn doctor(config: &ExecutorConfig) -> Result<()> {
    println!("🩺 Checking JVM toolchain...\n");

    let tools = [
        ("java", config.jdk_tool("java"), "-version", true),
        ("javac", config.jdk_tool("javac"), "-version", true),
        ("kotlinc", config.kotlinc(), "-version", false),
    ];

    let mut missing_required = Vec::new();
    for (name, path, flag, required) in &tools {
        match probe(path, flag) {
            Some(version) => println!("  ✅ {:<8} {}", name, version),
            None if *required => {
                println!("  ❌ {:<8} not found ({})", name, path.display());
                missing_required.push(*name);
            }
            None => println!("  ⚠️  {:<8} not found ({}) - Kotlin snippets unavailable", name, path.display()),
        }
    }

    println!("\n📂 Scratch root: {}", config.scratch_root.display());
    println!("⏱️  Timeout: {}s", config.timeout_seconds);
    if !config.host_classpath.is_empty() {
        println!("📚 Host classpath:");
        for entry in &config.host_classpath {
            println!("  - {}", entry.display());
        }
    }

    if !missing_required.is_empty() {
        bail!(
            "Required tools missing: {} (set JAVA_HOME or fix PATH)",
            missing_required.join(", ")
        );
    }

    println!("\n✅ Toolchain ready");
    Ok(())
}

/// Initialize a project directory with a default executor config
pub fn init_project(path: &Path) -> Result<()> {
    println!("🚀 Initializing Codexec project at: {}", path.display());

    let config_path = path.join(DEFAULT_CONFIG_PATH);
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if config_path.exists() {
        println!("  ⏭️  Kept existing: {}", DEFAULT_CONFIG_PATH);
    } else {
        let content = serde_json::to_string_pretty(&ExecutorConfig::default())?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("  ✅ Created: {}", DEFAULT_CONFIG_PATH);
    }

    println!("\n📋 Next steps:");
    println!("  1. Point java_home / kotlin_home at your toolchains");
    println!("  2. Check the setup: codexec-cli doctor");
    println!("  3. Run a snippet: codexec-cli run --file Main.java");

    Ok(())
}
