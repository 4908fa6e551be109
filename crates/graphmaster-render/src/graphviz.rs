//! Layout through the Graphviz `dot` program.

use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use graphmaster_core::render::{BoxFuture, LayoutEngine, LayoutError};

use crate::svg::{SvgArtifact, SvgParser};

/// Environment variable naming the `dot` executable.
pub const DOT_ENV: &str = "GRAPHMASTER_DOT";
/// Program run when [`DOT_ENV`] is unset.
pub const DEFAULT_DOT: &str = "dot";

/// Choose the `dot` executable from an optional override.
pub fn dot_program(override_path: Option<OsString>) -> PathBuf {
    match override_path {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_DOT),
    }
}

/// Runs `dot -Tsvg`, feeding the document on stdin.
#[derive(Clone)]
pub struct GraphvizCli {
    program: PathBuf,
    parser: SvgParser,
}

impl GraphvizCli {
    /// Engine using [`DOT_ENV`] or `dot` from `PATH`.
    pub fn from_env(parser: SvgParser) -> Self {
        Self::new(dot_program(std::env::var_os(DOT_ENV)), parser)
    }

    pub fn new(program: impl Into<PathBuf>, parser: SvgParser) -> Self {
        Self {
            program: program.into(),
            parser,
        }
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Run the layout and return the raw SVG text.
    pub fn layout_svg(&self, source: &str) -> Result<String, LayoutError> {
        log::debug!("Running {} -Tsvg", self.program.display());
        let mut child = Command::new(&self.program)
            .arg("-Tsvg")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => LayoutError::Unavailable(format!(
                    "'{}' not found; install Graphviz or set {}",
                    self.program.display(),
                    DOT_ENV
                )),
                _ => LayoutError::Unavailable(e.to_string()),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // dot may exit early on a syntax error and close its end.
            if let Err(e) = stdin.write_all(source.as_bytes()) {
                log::debug!("Writing to dot stdin failed: {}", e);
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| LayoutError::Failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("dot exited with {}", output.status)
            } else {
                stderr
            };
            return Err(LayoutError::Syntax(detail));
        }

        String::from_utf8(output.stdout).map_err(|e| LayoutError::Failed(e.to_string()))
    }
}

impl LayoutEngine for GraphvizCli {
    type Artifact = SvgArtifact;

    fn render<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<SvgArtifact, LayoutError>> {
        Box::pin(async move {
            let svg = self.layout_svg(source)?;
            self.parser
                .parse(svg)
                .map_err(|e| LayoutError::Failed(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_program_override() {
        assert_eq!(dot_program(None), PathBuf::from("dot"));
        assert_eq!(dot_program(Some(OsString::new())), PathBuf::from("dot"));
        assert_eq!(
            dot_program(Some(OsString::from("/opt/graphviz/bin/dot"))),
            PathBuf::from("/opt/graphviz/bin/dot")
        );
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let engine = GraphvizCli::new(
            "/nonexistent/graphmaster-test/dot",
            SvgParser::with_options(usvg::Options::default()),
        );
        let result = pollster::block_on(engine.render("digraph { a -> b }"));
        assert!(matches!(result, Err(LayoutError::Unavailable(_))));
    }
}
