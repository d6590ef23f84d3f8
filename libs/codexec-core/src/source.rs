// Best-effort entry-type extraction from guest source text.
// Comments and literal contents are blanked out first, then declarations are
// pattern matched. Nested types and several top-level declarations are left
// to the resolver's artifact scan.

use lazy_static::lazy_static;
use regex::Regex;

pub const JAVA_DEFAULT_NAME: &str = "Main";
pub const KOTLIN_DEFAULT_NAME: &str = "KotlinCode";

lazy_static! {
    static ref PACKAGE_PATTERN: Regex =
        Regex::new(r"(?m)^\s*package\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*;?")
            .unwrap();
    static ref JAVA_PUBLIC_CLASS_PATTERN: Regex = Regex::new(
        r"\bpublic\s+(?:(?:static|final|abstract|strictfp|sealed|non-sealed)\s+)*(?:class|record|enum|interface)\s+([A-Za-z_$][A-Za-z0-9_$]*)"
    )
    .unwrap();
    static ref JAVA_CLASS_PATTERN: Regex =
        Regex::new(r"\b(?:class|record|enum)\s+([A-Za-z_$][A-Za-z0-9_$]*)").unwrap();
    static ref KOTLIN_TYPE_PATTERN: Regex =
        Regex::new(r"\b(?:class|object)\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Expected name of the runnable type, as declared in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryName {
    pub package: Option<String>,
    pub simple: String,
}

impl EntryName {
    pub fn new(package: Option<&str>, simple: &str) -> Self {
        Self {
            package: package.map(str::to_string),
            simple: simple.to_string(),
        }
    }

    /// Fully-qualified binary name, e.g. `com.example.Main`
    pub fn qualified(&self) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, self.simple),
            None => self.simple.clone(),
        }
    }
}

/// Drop `//` and `/* */` comments and empty out string and char literals,
/// keeping line breaks so line-anchored patterns still line up
fn strip_comments_and_literals(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            '"' if source_at_text_block(&chars) => {
                chars.next();
                chars.next();
                let mut quotes = 0;
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    quotes = if next == '"' { quotes + 1 } else { 0 };
                    if quotes == 3 {
                        break;
                    }
                }
                out.push_str("\"\"");
            }
            '"' | '\'' => {
                let mut escaped = false;
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                    if escaped {
                        escaped = false;
                    } else if next == '\\' {
                        escaped = true;
                    } else if next == c {
                        break;
                    }
                }
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}

/// Whether the two characters after an opening quote complete a `"""`
fn source_at_text_block(chars: &std::iter::Peekable<std::str::Chars<'_>>) -> bool {
    let mut ahead = chars.clone();
    ahead.next() == Some('"') && ahead.next() == Some('"')
}

fn extract_package(source: &str) -> Option<&str> {
    PACKAGE_PATTERN
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract the Java entry type, preferring a public declaration (`class`,
/// `record`, `enum` or `interface`) since javac requires the file to be named
/// after it
pub fn extract_java(source: &str) -> Option<EntryName> {
    let source = strip_comments_and_literals(source);
    let source = source.as_str();
    let simple = JAVA_PUBLIC_CLASS_PATTERN
        .captures(source)
        .or_else(|| JAVA_CLASS_PATTERN.captures(source))
        .and_then(|caps| caps.get(1))?
        .as_str();

    Some(EntryName::new(extract_package(source), simple))
}

/// Extract the first Kotlin `class` or `object` declaration
pub fn extract_kotlin(source: &str) -> Option<EntryName> {
    let source = strip_comments_and_literals(source);
    let source = source.as_str();
    let simple = KOTLIN_TYPE_PATTERN
        .captures(source)
        .and_then(|caps| caps.get(1))?
        .as_str();

    Some(EntryName::new(extract_package(source), simple))
}
