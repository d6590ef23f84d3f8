/// End-to-end tests against a real toolchain
///
/// These tests verify the full pipeline with javac, kotlinc and java:
/// 1. Returned values come back as JSON
/// 2. Syntax errors surface as compiler diagnostics
/// 3. Runaway code is killed at the deadline
/// 4. Contract violations and guest exceptions are reported, not propagated
/// 5. Concurrent snippets never see each other's classes
///
/// JAVA_HOME, KOTLIN_HOME and CODEXEC_HOST_CLASSPATH are honoured as usual.

#[cfg(test)]
mod toolchain_tests {
    use crate::dispatcher::Engine;
    use codexec_common::config::ExecutorConfig;
    use codexec_common::response::{
        COMPILE_ERROR_PREFIX, CONTRACT_VIOLATION_PREFIX, RUNTIME_ERROR_PREFIX,
    };
    use codexec_common::types::{ExecutionOutcome, ExecutionRequest};
    use futures_util::future::join_all;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }

    /// Engine rooted in a private scratch directory
    fn create_engine(timeout_seconds: u64) -> (Engine, TempDir) {
        init_tracing();
        let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
        let mut config = ExecutorConfig::default()
            .apply_env(|key| std::env::var(key).ok())
            .expect("Failed to load executor config");
        config.scratch_root = scratch.path().to_path_buf();
        config.timeout_seconds = timeout_seconds;
        (Engine::new(config), scratch)
    }

    fn leftover_workspaces(scratch: &TempDir) -> Vec<String> {
        std::fs::read_dir(scratch.path())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|name| name.starts_with("exec-"))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Test: A literal map comes back as a JSON object
    #[tokio::test]
    #[ignore] // Requires JDK
    async fn test_java_literal_value() {
        let (engine, scratch) = create_engine(10);

        let source = r#"
import java.util.*;
import java.util.concurrent.Callable;

public class Answer implements Callable<Object> {
    public Object call() {
        Map<String, Object> m = new LinkedHashMap<>();
        m.put("answer", 42);
        m.put("tags", Arrays.asList("a", "b"));
        m.put("ok", true);
        return m;
    }
}
"#;
        let response = engine.execute(source, Some("java")).await;

        assert_eq!(response, json!({"answer": 42, "tags": ["a", "b"], "ok": true}));
        assert!(leftover_workspaces(&scratch).is_empty(), "Workspace should be removed");
    }

    /// Test: Packaged classes and helper classes in the same snippet
    #[tokio::test]
    #[ignore] // Requires JDK
    async fn test_java_package_and_helpers() {
        let (engine, _scratch) = create_engine(10);

        let source = r#"
package com.example.jobs;

import java.util.concurrent.Callable;

class Helper { static int twice(int n) { return n * 2; } }

public class Doubler implements Callable<Integer> {
    public Integer call() { return Helper.twice(21); }
}
"#;
        let response = engine.execute(source, None).await;
        assert_eq!(response, json!(42));
    }

    /// Test: Syntax errors are reported with file and line
    #[tokio::test]
    #[ignore] // Requires JDK
    async fn test_java_compilation_error() {
        let (engine, scratch) = create_engine(10);

        let source = r#"
import java.util.concurrent.Callable;
public class Broken implements Callable<Object> {
    public Object call() { return 1 }
}
"#;
        let response = engine.execute(source, Some("java")).await;
        let text = response.as_str().expect("Compile errors render as a string");

        assert!(text.starts_with(COMPILE_ERROR_PREFIX), "got: {}", text);
        assert!(text.contains("Broken.java:4:"), "got: {}", text);
        assert!(leftover_workspaces(&scratch).is_empty());
    }

    /// Test: An infinite loop is killed at the deadline
    #[tokio::test]
    #[ignore] // Requires JDK
    async fn test_java_timeout() {
        let (engine, scratch) = create_engine(2);

        let source = r#"
import java.util.concurrent.Callable;
public class Spin implements Callable<Object> {
    public Object call() { while (true) { } }
}
"#;
        let start = Instant::now();
        let outcome = engine
            .dispatch(&ExecutionRequest::new(source, Some("java")))
            .await;

        // compilation is outside the deadline; give it generous headroom
        assert!(matches!(outcome, ExecutionOutcome::Timeout(_)), "got: {:?}", outcome);
        assert!(start.elapsed() < Duration::from_secs(30));
        assert!(leftover_workspaces(&scratch).is_empty());
    }

    /// Test: A class without the callable contract is never instantiated
    #[tokio::test]
    #[ignore] // Requires JDK
    async fn test_java_contract_violation() {
        let (engine, _scratch) = create_engine(10);

        let source = r#"
public class Plain {
    public Plain() { throw new RuntimeException("constructor must not run"); }
}
"#;
        let response = engine.execute(source, Some("java")).await;
        let text = response.as_str().unwrap();
        assert!(text.starts_with(CONTRACT_VIOLATION_PREFIX), "got: {}", text);
        assert!(text.contains("Plain"));
    }

    /// Test: Guest exceptions become execution errors
    #[tokio::test]
    #[ignore] // Requires JDK
    async fn test_java_runtime_exception() {
        let (engine, _scratch) = create_engine(10);

        let source = r#"
import java.util.concurrent.Callable;
public class Thrower implements Callable<Object> {
    public Object call() { throw new IllegalStateException("boom"); }
}
"#;
        let response = engine.execute(source, Some("java")).await;
        assert_eq!(
            response,
            json!(format!("{}java.lang.IllegalStateException: boom", RUNTIME_ERROR_PREFIX))
        );
    }

    /// Test: Guest code exiting with a launcher status code is still a runtime error
    #[tokio::test]
    #[ignore] // Requires JDK
    async fn test_java_guest_exit_cannot_fake_launcher_status() {
        let (engine, _scratch) = create_engine(10);

        for code in [3, 4, 5] {
            let source = format!(
                "import java.util.concurrent.Callable;\npublic class Quitter implements Callable<Integer> {{ public Integer call() {{ System.exit({}); return 1; }} }}",
                code
            );
            let outcome = engine
                .dispatch(&ExecutionRequest::new(source, Some("java")))
                .await;
            let expected = format!("guest process exited with status {}", code);
            match outcome {
                ExecutionOutcome::RuntimeError(msg) => assert!(msg.starts_with(&expected), "got: {}", msg),
                other => panic!("expected runtime error for exit {}, got {:?}", code, other),
            }
        }
    }

    /// Test: Kotlin objects run through their singleton instance
    #[tokio::test]
    #[ignore] // Requires JDK and Kotlin
    async fn test_kotlin_object() {
        let (engine, _scratch) = create_engine(10);

        let source = r#"
import java.util.concurrent.Callable

object Greeter : Callable<String> {
    override fun call(): String = "hello from kotlin"
}
"#;
        let response = engine.execute(source, Some("kotlin")).await;
        assert_eq!(response, json!("hello from kotlin"));
    }

    /// Test: Kotlin classes with a no-arg constructor
    #[tokio::test]
    #[ignore] // Requires JDK and Kotlin
    async fn test_kotlin_class() {
        let (engine, _scratch) = create_engine(10);

        let source = r#"
import java.util.concurrent.Callable

class Squares : Callable<List<Int>> {
    override fun call() = (1..4).map { it * it }
}
"#;
        let response = engine.execute(source, Some("Kotlin")).await;
        assert_eq!(response, json!([1, 4, 9, 16]));
    }

    /// Test: Top-level declarations resolve to the generated file holder
    #[tokio::test]
    #[ignore] // Requires JDK and Kotlin
    async fn test_kotlin_top_level_holder() {
        let (engine, _scratch) = create_engine(10);

        let source = "fun call(): Int = 1\n";
        let outcome = engine
            .dispatch(&ExecutionRequest::new(source, Some("kotlin")))
            .await;

        match outcome {
            ExecutionOutcome::ContractViolation(msg) => assert!(msg.starts_with("KotlinCodeKt")),
            other => panic!("expected contract violation, got {:?}", other),
        }
    }

    /// Test: 50 concurrent snippets each get their own class back
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    #[ignore] // Requires JDK - slow
    async fn test_concurrent_isolation() {
        let (engine, scratch) = create_engine(30);
        let engine = Arc::new(engine);

        let calls = (0..50).map(|i| {
            let engine = Arc::clone(&engine);
            async move {
                // same class name everywhere; only the workspace tells them apart
                let source = format!(
                    "import java.util.concurrent.Callable;\npublic class Snippet implements Callable<Integer> {{ public Integer call() {{ return {}; }} }}",
                    i
                );
                (i, engine.execute(&source, Some("java")).await)
            }
        });

        for (i, response) in join_all(calls).await {
            assert_eq!(response, json!(i), "Snippet {} saw another request's class", i);
        }
        assert!(leftover_workspaces(&scratch).is_empty());
    }

    /// Test: Blank input is rejected before any toolchain is touched
    #[tokio::test]
    async fn test_blank_input_needs_no_toolchain() {
        let (engine, scratch) = create_engine(10);
        let outcome = engine.dispatch(&ExecutionRequest::new("  \n", Some("java"))).await;

        assert!(matches!(outcome, ExecutionOutcome::EmptyInput(_)));
        assert!(leftover_workspaces(&scratch).is_empty());
    }
}
