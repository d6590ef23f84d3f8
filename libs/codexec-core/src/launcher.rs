/// Guest-side launcher
///
/// **Responsibility:**
/// The JVM has to be told how to load, check and call the guest class. That is
/// `CodexecLauncher`, a small host-provided Java class compiled once per
/// support directory and placed first on every guest classpath.
///
/// **Launcher Protocol:**
/// `java -cp <cp> CodexecLauncher <entry-class> <result-file>`
///
/// The result file starts with a report line `codexec:<status>`, followed by
/// the payload. The process exit code must agree with that status:
/// - exit 0, `ok`: payload is the JSON-encoded return value of `call()`
/// - exit 3, `not-found`: entry class could not be loaded
/// - exit 4, `contract`: entry class does not implement
///   `java.util.concurrent.Callable` (checked before anything is instantiated)
/// - exit 5, `guest-error`: guest code threw, payload describes the throwable
/// - exit 6: the result could not be written, no report
///
/// Guest code can call `System.exit` with any of these codes, but it never
/// reaches `finish`, so no report is written and the exit code alone means
/// nothing.

use crate::compiler::{classify, run_compiler, CompilationOutcome};
use crate::error::{EngineError, Result};
use codexec_common::response::join_diagnostics;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const LAUNCHER_CLASS: &str = "CodexecLauncher";

pub const EXIT_OK: i32 = 0;
pub const EXIT_NOT_FOUND: i32 = 3;
pub const EXIT_CONTRACT: i32 = 4;
pub const EXIT_GUEST_ERROR: i32 = 5;
pub const EXIT_RESULT_WRITE: i32 = 6;

const REPORT_MARKER: &str = "codexec:";

/// Status line the launcher puts at the top of the result file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Ok,
    NotFound,
    Contract,
    GuestError,
}

impl ReportStatus {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ok" => Some(ReportStatus::Ok),
            "not-found" => Some(ReportStatus::NotFound),
            "contract" => Some(ReportStatus::Contract),
            "guest-error" => Some(ReportStatus::GuestError),
            _ => None,
        }
    }

    /// Exit code the launcher halts with after writing this status
    pub fn exit_code(self) -> i32 {
        match self {
            ReportStatus::Ok => EXIT_OK,
            ReportStatus::NotFound => EXIT_NOT_FOUND,
            ReportStatus::Contract => EXIT_CONTRACT,
            ReportStatus::GuestError => EXIT_GUEST_ERROR,
        }
    }
}

/// Split a result file into its status and payload, `None` without a report line
pub fn parse_report(text: &str) -> Option<(ReportStatus, &str)> {
    let (first, payload) = text.split_once('\n').unwrap_or((text, ""));
    let token = first.strip_prefix(REPORT_MARKER)?;
    Some((ReportStatus::from_token(token.trim_end())?, payload))
}

const LAUNCHER_SOURCE: &str = r#"import java.lang.reflect.Array;
import java.lang.reflect.Constructor;
import java.lang.reflect.Field;
import java.lang.reflect.InvocationTargetException;
import java.lang.reflect.Modifier;
import java.math.BigDecimal;
import java.math.BigInteger;
import java.nio.charset.StandardCharsets;
import java.nio.file.Files;
import java.nio.file.Paths;
import java.util.Map;
import java.util.concurrent.Callable;

public final class CodexecLauncher {
    private static final int EXIT_OK = 0;
    private static final int EXIT_NOT_FOUND = 3;
    private static final int EXIT_CONTRACT = 4;
    private static final int EXIT_GUEST_ERROR = 5;
    private static final int EXIT_RESULT_WRITE = 6;
    private static final int MAX_DEPTH = 64;
    private static final String REPORT_MARKER = "codexec:";

    public static void main(String[] args) {
        if (args.length != 2) {
            System.err.println("usage: CodexecLauncher <entry-class> <result-file>");
            Runtime.getRuntime().halt(2);
        }
        String entry = args[0];
        String resultFile = args[1];

        Class<?> type;
        try {
            type = Class.forName(entry, false, CodexecLauncher.class.getClassLoader());
        } catch (ClassNotFoundException | LinkageError e) {
            finish(resultFile, "not-found", entry, EXIT_NOT_FOUND);
            return;
        }

        if (!Callable.class.isAssignableFrom(type)) {
            finish(resultFile, "contract", entry + " does not implement the required callable contract (java.util.concurrent.Callable)", EXIT_CONTRACT);
            return;
        }

        Object value;
        try {
            value = instantiate(type).call();
        } catch (InvocationTargetException e) {
            finish(resultFile, "guest-error", String.valueOf(e.getCause()), EXIT_GUEST_ERROR);
            return;
        } catch (Throwable t) {
            finish(resultFile, "guest-error", String.valueOf(t), EXIT_GUEST_ERROR);
            return;
        }

        StringBuilder out = new StringBuilder();
        encode(value, out, 0);
        finish(resultFile, "ok", out.toString(), EXIT_OK);
    }

    private static Callable<?> instantiate(Class<?> type) throws Exception {
        try {
            Field instance = type.getDeclaredField("INSTANCE");
            if (Modifier.isStatic(instance.getModifiers()) && type.isAssignableFrom(instance.getType())) {
                instance.setAccessible(true);
                return (Callable<?>) instance.get(null);
            }
        } catch (NoSuchFieldException ignored) {
        }
        Constructor<?> constructor = type.getDeclaredConstructor();
        constructor.setAccessible(true);
        return (Callable<?>) constructor.newInstance();
    }

    private static void finish(String resultFile, String status, String text, int code) {
        try {
            String report = REPORT_MARKER + status + "\n" + text;
            Files.write(Paths.get(resultFile), report.getBytes(StandardCharsets.UTF_8));
        } catch (Throwable t) {
            System.err.println("failed to write result: " + t);
            code = EXIT_RESULT_WRITE;
        }
        System.out.flush();
        System.err.flush();
        Runtime.getRuntime().halt(code);
    }

    private static void encode(Object value, StringBuilder out, int depth) {
        if (depth > MAX_DEPTH) {
            string("<nesting too deep>", out);
        } else if (value == null) {
            out.append("null");
        } else if (value instanceof Boolean) {
            out.append(value);
        } else if (value instanceof Double || value instanceof Float) {
            double d = ((Number) value).doubleValue();
            if (Double.isNaN(d) || Double.isInfinite(d)) {
                string(value.toString(), out);
            } else {
                out.append(value);
            }
        } else if (value instanceof Integer || value instanceof Long || value instanceof Short
                || value instanceof Byte || value instanceof BigInteger || value instanceof BigDecimal) {
            out.append(value);
        } else if (value instanceof Map) {
            out.append('{');
            boolean first = true;
            for (Map.Entry<?, ?> e : ((Map<?, ?>) value).entrySet()) {
                if (!first) out.append(',');
                first = false;
                string(String.valueOf(e.getKey()), out);
                out.append(':');
                encode(e.getValue(), out, depth + 1);
            }
            out.append('}');
        } else if (value instanceof Iterable) {
            out.append('[');
            boolean first = true;
            for (Object item : (Iterable<?>) value) {
                if (!first) out.append(',');
                first = false;
                encode(item, out, depth + 1);
            }
            out.append(']');
        } else if (value.getClass().isArray()) {
            out.append('[');
            int length = Array.getLength(value);
            for (int i = 0; i < length; i++) {
                if (i > 0) out.append(',');
                encode(Array.get(value, i), out, depth + 1);
            }
            out.append(']');
        } else {
            string(value.toString(), out);
        }
    }

    private static void string(String s, StringBuilder out) {
        out.append('"');
        for (int i = 0; i < s.length(); i++) {
            char c = s.charAt(i);
            switch (c) {
                case '"': out.append("\\\""); break;
                case '\\': out.append("\\\\"); break;
                case '\n': out.append("\\n"); break;
                case '\r': out.append("\\r"); break;
                case '\t': out.append("\\t"); break;
                default:
                    if (c < 0x20) {
                        out.append(String.format("\\u%04x", (int) c));
                    } else {
                        out.append(c);
                    }
            }
        }
        out.append('"');
    }
}
"#;

/// Compiles the launcher on first use and hands out its class directory
#[derive(Debug)]
pub struct Launcher {
    javac: PathBuf,
    support_dir: PathBuf,
    installed: OnceCell<PathBuf>,
}

impl Launcher {
    pub fn new(javac: PathBuf, support_dir: PathBuf) -> Self {
        Self {
            javac,
            support_dir,
            installed: OnceCell::new(),
        }
    }

    /// A launcher whose class directory is already in place
    pub fn preinstalled(support_dir: PathBuf) -> Self {
        Self {
            javac: PathBuf::from("javac"),
            installed: OnceCell::new_with(Some(support_dir.clone())),
            support_dir,
        }
    }

    /// Directory holding `CodexecLauncher.class`, compiling it if needed
    pub async fn ensure_installed(&self) -> Result<&Path> {
        let dir = self
            .installed
            .get_or_try_init(|| install(&self.javac, &self.support_dir))
            .await?;
        Ok(dir.as_path())
    }
}

/// Compile into a private staging directory, then rename into place so
/// engines sharing a scratch root never observe a half-written class.
async fn install(javac: &Path, support_dir: &Path) -> Result<PathBuf> {
    let class_file = support_dir.join(format!("{}.class", LAUNCHER_CLASS));
    let source_file = support_dir.join(format!("{}.java", LAUNCHER_CLASS));

    let class_present = tokio::fs::metadata(&class_file)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    let up_to_date = class_present
        && tokio::fs::read_to_string(&source_file)
            .await
            .map(|existing| existing == LAUNCHER_SOURCE)
            .unwrap_or(false);
    if up_to_date {
        debug!(support_dir = %support_dir.display(), "Launcher already installed");
        return Ok(support_dir.to_path_buf());
    }

    let staging = support_dir.join(format!(".staging-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&staging).await?;

    let result = compile_into(javac, &staging, support_dir).await;

    if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
        warn!(staging = %staging.display(), error = %e, "Failed to remove launcher staging directory");
    }

    result?;
    info!(support_dir = %support_dir.display(), "Launcher installed");
    Ok(support_dir.to_path_buf())
}

async fn compile_into(javac: &Path, staging: &Path, support_dir: &Path) -> Result<()> {
    let staged_source = staging.join(format!("{}.java", LAUNCHER_CLASS));
    tokio::fs::write(&staged_source, LAUNCHER_SOURCE)
        .await
        .map_err(|source| EngineError::WriteSource {
            path: staged_source.clone(),
            source,
        })?;

    let args = vec![
        "-d".into(),
        staging.into(),
        "-encoding".into(),
        "UTF-8".into(),
        "-nowarn".into(),
        staged_source.clone().into(),
    ];
    let output = run_compiler(javac, args, Vec::new(), staging).await?;

    if let CompilationOutcome::Failure(diagnostics) = classify(output, staging) {
        return Err(EngineError::Launcher(join_diagnostics(&diagnostics)));
    }

    let class_name = format!("{}.class", LAUNCHER_CLASS);
    tokio::fs::rename(staging.join(&class_name), support_dir.join(&class_name)).await?;
    tokio::fs::rename(
        staged_source,
        support_dir.join(format!("{}.java", LAUNCHER_CLASS)),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_launcher_source_declares_protocol_exit_codes() {
        assert!(LAUNCHER_SOURCE.contains(&format!("public final class {}", LAUNCHER_CLASS)));
        for (name, code) in [
            ("EXIT_OK", EXIT_OK),
            ("EXIT_NOT_FOUND", EXIT_NOT_FOUND),
            ("EXIT_CONTRACT", EXIT_CONTRACT),
            ("EXIT_GUEST_ERROR", EXIT_GUEST_ERROR),
            ("EXIT_RESULT_WRITE", EXIT_RESULT_WRITE),
        ] {
            let declaration = format!("{} = {};", name, code);
            assert!(LAUNCHER_SOURCE.contains(&declaration), "missing {}", declaration);
        }
    }

    #[test]
    fn test_launcher_source_writes_every_report_status() {
        for token in ["ok", "not-found", "contract", "guest-error"] {
            assert!(ReportStatus::from_token(token).is_some());
            assert!(
                LAUNCHER_SOURCE.contains(&format!("finish(resultFile, \"{}\"", token)),
                "launcher never reports {}",
                token
            );
        }
    }

    #[test]
    fn test_parse_report() {
        assert_eq!(
            parse_report("codexec:ok\n{\"a\":1}"),
            Some((ReportStatus::Ok, "{\"a\":1}"))
        );
        assert_eq!(
            parse_report("codexec:guest-error\njava.lang.Error: x\nmore"),
            Some((ReportStatus::GuestError, "java.lang.Error: x\nmore"))
        );
        assert_eq!(parse_report("codexec:not-found"), Some((ReportStatus::NotFound, "")));
        assert_eq!(parse_report("{\"a\":1}"), None);
        assert_eq!(parse_report("codexec:bogus\n1"), None);
        assert_eq!(parse_report(""), None);
    }

    #[test]
    fn test_status_exit_codes_match_protocol() {
        assert_eq!(ReportStatus::Ok.exit_code(), EXIT_OK);
        assert_eq!(ReportStatus::NotFound.exit_code(), EXIT_NOT_FOUND);
        assert_eq!(ReportStatus::Contract.exit_code(), EXIT_CONTRACT);
        assert_eq!(ReportStatus::GuestError.exit_code(), EXIT_GUEST_ERROR);
    }

    #[tokio::test]
    async fn test_preinstalled_launcher_skips_compilation() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = Launcher::preinstalled(dir.path().to_path_buf());
        assert_eq!(launcher.ensure_installed().await.unwrap(), dir.path());
    }

    #[tokio::test]
    async fn test_up_to_date_install_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("CodexecLauncher.java"), LAUNCHER_SOURCE).unwrap();
        fs::write(dir.path().join("CodexecLauncher.class"), b"\xca\xfe\xba\xbe").unwrap();

        // javac is never invoked, so a bogus path is fine
        let launcher = Launcher::new(PathBuf::from("/nonexistent/javac"), dir.path().to_path_buf());
        assert_eq!(launcher.ensure_installed().await.unwrap(), dir.path());
    }

    #[tokio::test]
    async fn test_missing_javac_is_an_error_and_leaves_no_staging() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = Launcher::new(PathBuf::from("/nonexistent/javac"), dir.path().to_path_buf());

        let err = launcher.ensure_installed().await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
