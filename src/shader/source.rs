//! Shader Source Loading & Preprocessing
//!
//! Shader sources are plain GLSL text. Two directives are understood:
//!
//! - `#include "relative/path"` is replaced by the referenced file, resolved
//!   relative to the including file and expanded depth-first. A file already
//!   present in the current inclusion chain is skipped with a warning.
//! - `#version ...` is lifted out of the body so feature `#define` lines can
//!   be injected between it and the rest of the source.
//!
//! Files come from a [`SourceProvider`]: the GLSL embedded in the binary,
//! a directory on disk, or an in-memory map.

use std::io::ErrorKind;
use std::path::PathBuf;

use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;

use crate::errors::{LanternError, Result};

/// Version line used when a stage body declares none.
pub const DEFAULT_VERSION: &str = "#version 410 core";

/// Read access to shader source files by `/`-separated relative path.
pub trait SourceProvider {
    /// Returns `Ok(None)` when the file does not exist.
    fn read(&self, path: &str) -> Result<Option<String>>;
}

// ─── Providers ────────────────────────────────────────────────────────────────

#[derive(RustEmbed)]
#[folder = "src/shader/glsl"]
struct ShaderAssets;

/// The built-in GLSL compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedShaders;

impl SourceProvider for EmbeddedShaders {
    fn read(&self, path: &str) -> Result<Option<String>> {
        let Some(file) = ShaderAssets::get(path) else {
            return Ok(None);
        };
        match std::str::from_utf8(file.data.as_ref()) {
            Ok(source) => Ok(Some(source.to_string())),
            Err(e) => Err(LanternError::Device(format!(
                "embedded shader '{path}' is not valid UTF-8: {e}"
            ))),
        }
    }
}

/// Shader files under a directory on disk.
#[derive(Debug, Clone)]
pub struct ShaderDirectory {
    root: PathBuf,
}

impl ShaderDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceProvider for ShaderDirectory {
    fn read(&self, path: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.root.join(path)) {
            Ok(source) => Ok(Some(source)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory sources, mostly for tests and generated shaders.
#[derive(Debug, Default, Clone)]
pub struct MemoryShaders {
    files: FxHashMap<String, String>,
}

impl MemoryShaders {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, path: &str, source: &str) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: &str, source: &str) {
        self.files.insert(normalize_path(path), source.to_string());
    }
}

impl SourceProvider for MemoryShaders {
    fn read(&self, path: &str) -> Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }
}

// ─── Paths ────────────────────────────────────────────────────────────────────

/// Collapses `.` and `..` components of a `/`-separated path.
/// `..` at the root is dropped.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Resolves `include` relative to the directory of `from`.
#[must_use]
pub fn resolve_include(from: &str, include: &str) -> String {
    match from.rfind('/') {
        Some(idx) => normalize_path(&format!("{}/{include}", &from[..idx])),
        None => normalize_path(include),
    }
}

// ─── Include expansion ────────────────────────────────────────────────────────

/// Parses an `#include "path"` line. `None` for any other line.
fn parse_include(line: &str) -> Option<std::result::Result<&str, ()>> {
    let rest = line.trim_start().strip_prefix("#include")?;
    let rest = rest.trim();
    let path = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .filter(|p| !p.is_empty() && !p.contains('"'));
    Some(path.ok_or(()))
}

/// Loads `path` and expands its includes depth-first.
///
/// `shader` names the owning shader for error messages.
pub fn load_expanded(provider: &dyn SourceProvider, shader: &str, path: &str) -> Result<String> {
    let path = normalize_path(path);
    let mut chain = Vec::new();
    let mut out = String::new();
    expand_into(provider, shader, &path, &mut chain, &mut out)?;
    Ok(out)
}

fn expand_into(
    provider: &dyn SourceProvider,
    shader: &str,
    path: &str,
    chain: &mut Vec<String>,
    out: &mut String,
) -> Result<()> {
    let source = provider
        .read(path)?
        .ok_or_else(|| LanternError::ShaderSourceNotFound {
            shader: shader.to_string(),
            path: path.to_string(),
        })?;

    chain.push(path.to_string());

    for (index, line) in source.lines().enumerate() {
        match parse_include(line) {
            None => {
                out.push_str(line);
                out.push('\n');
            }
            Some(Err(())) => {
                return Err(LanternError::MalformedInclude {
                    path: path.to_string(),
                    line: index + 1,
                    text: line.trim().to_string(),
                });
            }
            Some(Ok(include)) => {
                let resolved = resolve_include(path, include);
                if chain.contains(&resolved) {
                    log::warn!(
                        "Shader '{shader}': skipping recursive include of '{resolved}' from '{path}'"
                    );
                    continue;
                }
                expand_into(provider, shader, &resolved, chain, out)?;
            }
        }
    }

    chain.pop();
    Ok(())
}

// ─── Version line ─────────────────────────────────────────────────────────────

/// Splits off the first `#version` line.
///
/// Returns `(version, body)`; the version falls back to [`DEFAULT_VERSION`].
#[must_use]
pub fn split_version(source: &str) -> (String, String) {
    let mut version = None;
    let mut body = String::with_capacity(source.len());
    for line in source.lines() {
        if version.is_none() && line.trim_start().starts_with("#version") {
            version = Some(line.trim().to_string());
            continue;
        }
        body.push_str(line);
        body.push('\n');
    }
    (
        version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        body,
    )
}

/// Assembles a variant source: version line, one `#define` per symbol, body.
#[must_use]
pub fn inject_defines(version: &str, defines: &[&str], body: &str) -> String {
    let mut out = String::with_capacity(version.len() + body.len() + defines.len() * 24 + 1);
    out.push_str(version);
    out.push('\n');
    for symbol in defines {
        out.push_str("#define ");
        out.push_str(symbol);
        out.push('\n');
    }
    out.push_str(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_path("./a/b/../c.glsl"), "a/c.glsl");
        assert_eq!(normalize_path("../x.glsl"), "x.glsl");
        assert_eq!(resolve_include("phong.frag", "chunks/lights.glsl"), "chunks/lights.glsl");
        assert_eq!(
            resolve_include("chunks/lights.glsl", "../common.glsl"),
            "common.glsl"
        );
        assert_eq!(
            resolve_include("chunks/lights.glsl", "shadow.glsl"),
            "chunks/shadow.glsl"
        );
    }

    #[test]
    fn includes_expand_depth_first() {
        let files = MemoryShaders::new()
            .with("main.frag", "#version 330 core\n#include \"lib/a.glsl\"\nvoid main() {}\n")
            .with("lib/a.glsl", "// a\n#include \"b.glsl\"\n")
            .with("lib/b.glsl", "// b\n");

        let source = load_expanded(&files, "test", "main.frag").unwrap();
        assert_eq!(source, "#version 330 core\n// a\n// b\nvoid main() {}\n");
    }

    #[test]
    fn recursive_include_is_skipped() {
        let files = MemoryShaders::new()
            .with("a.glsl", "// a\n#include \"b.glsl\"\n")
            .with("b.glsl", "// b\n#include \"a.glsl\"\n");

        let source = load_expanded(&files, "test", "a.glsl").unwrap();
        assert_eq!(source, "// a\n// b\n");
    }

    #[test]
    fn same_file_may_be_included_twice_outside_the_chain() {
        let files = MemoryShaders::new()
            .with("main.glsl", "#include \"c.glsl\"\n#include \"c.glsl\"\n")
            .with("c.glsl", "// c\n");

        let source = load_expanded(&files, "test", "main.glsl").unwrap();
        assert_eq!(source, "// c\n// c\n");
    }

    #[test]
    fn missing_include_reports_the_path() {
        let files = MemoryShaders::new().with("main.glsl", "#include \"gone.glsl\"\n");
        let err = load_expanded(&files, "phong", "main.glsl").unwrap_err();
        match err {
            LanternError::ShaderSourceNotFound { shader, path } => {
                assert_eq!(shader, "phong");
                assert_eq!(path, "gone.glsl");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_include_is_rejected() {
        let files = MemoryShaders::new().with("main.glsl", "void f();\n#include <oops>\n");
        let err = load_expanded(&files, "test", "main.glsl").unwrap_err();
        assert!(matches!(err, LanternError::MalformedInclude { line: 2, .. }));
    }

    #[test]
    fn version_is_lifted_and_defines_follow_it() {
        let (version, body) = split_version("#version 330 core\nvoid main() {}\n");
        assert_eq!(version, "#version 330 core");
        let source = inject_defines(&version, &["USE_A", "USE_B"], &body);
        assert_eq!(
            source,
            "#version 330 core\n#define USE_A\n#define USE_B\nvoid main() {}\n"
        );

        let (version, _) = split_version("void main() {}\n");
        assert_eq!(version, DEFAULT_VERSION);
    }

    #[test]
    fn embedded_shaders_contain_the_builtin_families() {
        let embedded = EmbeddedShaders;
        assert!(embedded.read("phong.vert").unwrap().is_some());
        assert!(embedded.read("chunks/lights.glsl").unwrap().is_some());
        assert!(embedded.read("missing.glsl").unwrap().is_none());
    }
}
