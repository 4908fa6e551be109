//! Command-line arguments.

use std::path::PathBuf;

use graphmaster_core::config::ConfigError;
use graphmaster_core::geometry::GeometryError;
use graphmaster_core::render::{LayoutError, RenderError};
use graphmaster_core::session::SessionError;
use graphmaster_core::storage::StorageError;
use graphmaster_render::{ExportError, ExportFormat, SvgError};
use kurbo::Size;
use thiserror::Error;

/// Viewport used when `--viewport` is not given.
pub const DEFAULT_VIEWPORT: Size = Size::new(800.0, 600.0);

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{}", .0.user_message())]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Svg(#[from] SvgError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    #[error("The document is empty")]
    EmptyDocument,
}

/// What to do with the session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionAction {
    #[default]
    Show,
    Clear,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Render a DOT file and export it.
    Render {
        input: PathBuf,
        out: Option<PathBuf>,
        format: ExportFormat,
        dpi: Option<f64>,
    },
    /// Fit an SVG into the viewport and print the transform.
    Fit { input: PathBuf },
    /// Render a DOT file and copy it to the clipboard as an image.
    Copy { input: PathBuf },
    /// Inspect or clear the saved session.
    Session(SessionAction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub command: Command,
    pub viewport: Size,
    pub config: Option<PathBuf>,
    /// Keep the session in memory instead of the user data directory.
    pub ephemeral: bool,
}

pub fn usage() -> String {
    "graphmaster\n\
\n\
USAGE:\n\
  graphmaster render <in.dot> [-o <out>] [--format svg|png|pdf] [--dpi <n>] [--viewport <W>x<H>] [--config <file.json>] [--ephemeral]\n\
  graphmaster fit <in.svg> [--viewport <W>x<H>] [--config <file.json>]\n\
  graphmaster copy <in.dot> [--viewport <W>x<H>] [--config <file.json>] [--ephemeral]\n\
  graphmaster session [show|clear] [--config <file.json>]\n\
\n\
NOTES:\n\
  - The Graphviz `dot` program must be installed; set GRAPHMASTER_DOT to override its path.\n\
  - render writes next to the current directory as <input name>.<format> unless -o is given.\n\
  - PNG output defaults to 600 dpi; clipboard images use 300 dpi.\n\
  - Set RUST_LOG=debug for diagnostics.\n"
        .to_string()
}

fn usage_error(message: impl AsRef<str>) -> CliError {
    CliError::Usage(format!("error: {}\n\n{}", message.as_ref(), usage()))
}

/// Parse `WxH`, e.g. `1024x768`.
pub fn parse_viewport(value: &str) -> Option<Size> {
    let (w, h) = value.split_once(['x', 'X'])?;
    let w = w.trim().parse::<f64>().ok()?;
    let h = h.trim().parse::<f64>().ok()?;
    (w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0).then(|| Size::new(w, h))
}

/// Parse `argv` (including the program name).
pub fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut it = argv.iter().skip(1);
    let command_name = match it.next() {
        Some(name) if name == "--help" || name == "-h" => return Err(CliError::Usage(usage())),
        Some(name) => name.clone(),
        None => return Err(CliError::Usage(usage())),
    };

    let mut positional: Vec<String> = Vec::new();
    let mut out = None;
    let mut format = None;
    let mut dpi = None;
    let mut viewport = DEFAULT_VIEWPORT;
    let mut config = None;
    let mut ephemeral = false;

    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| usage_error(format!("{} needs a value", flag)))
        };
        match arg.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "-o" | "--out" => out = Some(PathBuf::from(value(arg.as_str())?)),
            "--format" => {
                let raw = value(arg.as_str())?;
                format = Some(
                    raw.parse::<ExportFormat>()
                        .map_err(|_| usage_error(format!("unknown format '{}'", raw)))?,
                );
            }
            "--dpi" => {
                let raw = value(arg.as_str())?;
                let parsed = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .ok_or_else(|| usage_error(format!("invalid dpi '{}'", raw)))?;
                dpi = Some(parsed);
            }
            "--viewport" => {
                let raw = value(arg.as_str())?;
                viewport = parse_viewport(&raw)
                    .ok_or_else(|| usage_error(format!("invalid viewport '{}'", raw)))?;
            }
            "--config" => config = Some(PathBuf::from(value(arg.as_str())?)),
            "--ephemeral" => ephemeral = true,
            other if other.starts_with('-') && other != "-" => {
                return Err(usage_error(format!("unknown option '{}'", other)));
            }
            other => positional.push(other.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    let input = |p: Option<String>| p.map(PathBuf::from).ok_or_else(|| usage_error("missing input file"));

    let command = match command_name.as_str() {
        "render" => {
            let input = input(positional.next())?;
            // Infer the format from the output name when not given.
            let format = format
                .or_else(|| {
                    out.as_ref()
                        .and_then(|p: &PathBuf| p.extension())
                        .and_then(|e| e.to_str())
                        .and_then(|e| e.parse::<ExportFormat>().ok())
                })
                .unwrap_or(ExportFormat::Svg);
            Command::Render {
                input,
                out,
                format,
                dpi,
            }
        }
        "fit" => Command::Fit {
            input: input(positional.next())?,
        },
        "copy" => Command::Copy {
            input: input(positional.next())?,
        },
        "session" => match positional.next().as_deref() {
            None | Some("show") => Command::Session(SessionAction::Show),
            Some("clear") => Command::Session(SessionAction::Clear),
            Some(other) => return Err(usage_error(format!("unknown session action '{}'", other))),
        },
        other => return Err(usage_error(format!("unknown command '{}'", other))),
    };

    if let Some(extra) = positional.next() {
        return Err(usage_error(format!("unexpected argument '{}'", extra)));
    }

    Ok(Args {
        command,
        viewport,
        config,
        ephemeral,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("graphmaster")
            .chain(args.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_render_defaults() {
        let args = parse_args(&argv(&["render", "flow.dot"])).unwrap();
        assert_eq!(
            args.command,
            Command::Render {
                input: PathBuf::from("flow.dot"),
                out: None,
                format: ExportFormat::Svg,
                dpi: None,
            }
        );
        assert_eq!(args.viewport, DEFAULT_VIEWPORT);
        assert!(!args.ephemeral);
    }

    #[test]
    fn test_render_options() {
        let args = parse_args(&argv(&[
            "render",
            "flow.dot",
            "-o",
            "out/flow.pdf",
            "--dpi",
            "300",
            "--viewport",
            "1024x768",
            "--ephemeral",
        ]))
        .unwrap();
        let Command::Render { format, dpi, out, .. } = args.command else {
            panic!("expected render");
        };
        assert_eq!(format, ExportFormat::Pdf);
        assert_eq!(dpi, Some(300.0));
        assert_eq!(out, Some(PathBuf::from("out/flow.pdf")));
        assert_eq!(args.viewport, Size::new(1024.0, 768.0));
        assert!(args.ephemeral);
    }

    #[test]
    fn test_explicit_format_wins() {
        let args = parse_args(&argv(&["render", "a.dot", "-o", "a.pdf", "--format", "png"])).unwrap();
        assert!(matches!(
            args.command,
            Command::Render {
                format: ExportFormat::Png,
                ..
            }
        ));
    }

    #[test]
    fn test_session_actions() {
        let show = parse_args(&argv(&["session"])).unwrap();
        assert_eq!(show.command, Command::Session(SessionAction::Show));
        let clear = parse_args(&argv(&["session", "clear"])).unwrap();
        assert_eq!(clear.command, Command::Session(SessionAction::Clear));
        assert!(parse_args(&argv(&["session", "drop"])).is_err());
    }

    #[test]
    fn test_usage_errors() {
        assert!(matches!(parse_args(&argv(&[])), Err(CliError::Usage(_))));
        assert!(matches!(parse_args(&argv(&["render"])), Err(CliError::Usage(_))));
        assert!(matches!(
            parse_args(&argv(&["render", "a.dot", "--format", "gif"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&argv(&["fit", "a.svg", "--viewport", "0x10"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(parse_args(&argv(&["render", "a.dot", "--dpi"])), Err(CliError::Usage(_))));
        assert!(matches!(parse_args(&argv(&["frobnicate"])), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("800x600"), Some(Size::new(800.0, 600.0)));
        assert_eq!(parse_viewport("1280X720"), Some(Size::new(1280.0, 720.0)));
        assert_eq!(parse_viewport("800"), None);
        assert_eq!(parse_viewport("-1x5"), None);
    }
}
