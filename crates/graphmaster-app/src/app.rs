//! Command implementations: drive a [`Viewer`] end to end without a window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use graphmaster_core::camera::Camera;
use graphmaster_core::config::ViewerConfig;
use graphmaster_core::geometry::{ArtifactGeometry, valid_bounding_box};
use graphmaster_core::notice::{Notice, NoticeLevel};
use graphmaster_core::platform::Capabilities;
use graphmaster_core::render::RenderOutcome;
use graphmaster_core::session::{LoadedSession, SessionStore};
use graphmaster_core::storage::{KeyValueStore, MemoryStorage, create_default_storage};
use graphmaster_core::viewer::Viewer;
use graphmaster_render::export::{DOWNLOAD_DPI, export};
use graphmaster_render::{COPY_DPI, ExportFormat, GraphvizCli, SvgArtifact, SvgParser, rasterize, sanitize_filename};
use kurbo::Size;
use serde_json::json;

use crate::cli::{Args, CliError, Command, SessionAction};

/// Load the viewer config, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ViewerConfig, CliError> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Ok(ViewerConfig::from_json(&json)?)
        }
        None => Ok(ViewerConfig::default()),
    }
}

/// Where `render` writes when no output path is given.
pub fn default_output_path(input: &Path, format: ExportFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from(sanitize_filename(&stem, format))
}

fn report_notices<A, S>(viewer: &mut Viewer<A, S>)
where
    A: ArtifactGeometry,
    S: KeyValueStore,
{
    for Notice { level, message, .. } in viewer.drain_notices() {
        match level {
            NoticeLevel::Error => log::error!("{}", message),
            NoticeLevel::Warning => log::warn!("{}", message),
            NoticeLevel::Info | NoticeLevel::Success => log::info!("{}", message),
        }
    }
}

/// Render `input` in a fresh viewer and leave the artifact fitted.
fn render_file<S: KeyValueStore>(
    viewer: &mut Viewer<SvgArtifact, S>,
    input: &Path,
) -> Result<(), CliError> {
    let text = std::fs::read_to_string(input)?;
    viewer.set_document(text, Instant::now());

    let engine = GraphvizCli::from_env(SvgParser::new());
    let outcome = pollster::block_on(viewer.render_document(&engine, true));
    report_notices(viewer);

    match outcome? {
        RenderOutcome::Rendered { .. } => {
            let view = viewer.transform();
            log::info!(
                "Rendered {} at {}% ({})",
                input.display(),
                viewer.zoom_percent(),
                view.css()
            );
            Ok(())
        }
        RenderOutcome::Failed(e) => Err(CliError::Layout(e)),
        RenderOutcome::Cleared | RenderOutcome::Stale => Err(CliError::EmptyDocument),
    }
}

fn run_render<S: KeyValueStore>(
    mut viewer: Viewer<SvgArtifact, S>,
    input: &Path,
    out: Option<&Path>,
    format: ExportFormat,
    dpi: Option<f64>,
) -> Result<(), CliError> {
    render_file(&mut viewer, input)?;
    let artifact = viewer.artifact().ok_or(CliError::EmptyDocument)?;

    let bytes = export(artifact, format, dpi.unwrap_or(DOWNLOAD_DPI))?;
    log::debug!("Exported {} bytes of {}", bytes.len(), format.mime_type());
    let out = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input, format));
    if out.as_os_str() == "-" {
        use std::io::Write;
        std::io::stdout().lock().write_all(&bytes)?;
    } else {
        std::fs::write(&out, &bytes)?;
        println!("{}", out.display());
    }
    Ok(())
}

fn run_copy<S: KeyValueStore>(mut viewer: Viewer<SvgArtifact, S>, input: &Path) -> Result<(), CliError> {
    render_file(&mut viewer, input)?;
    let artifact = viewer.artifact().ok_or(CliError::EmptyDocument)?;
    let image = rasterize(artifact, COPY_DPI)?;

    let mut clipboard =
        crate::clipboard::SystemClipboard::new().map_err(|e| CliError::Clipboard(e.to_string()))?;
    let copied = viewer.copy_image(&mut clipboard, &image);
    report_notices(&mut viewer);
    if copied {
        Ok(())
    } else {
        Err(CliError::Clipboard("copy failed".to_string()))
    }
}

/// Fit an SVG file into `viewport` and describe the transform as JSON.
pub fn fit_svg(svg: &str, viewport: Size, config: &ViewerConfig) -> Result<serde_json::Value, CliError> {
    let artifact = SvgParser::new().parse(svg)?;
    let bounds = valid_bounding_box(&artifact)?;

    let mut camera = Camera::with_config(config);
    camera.fit_to_bounds(bounds.rect, viewport, config.fit_padding);
    let view = camera.view();

    Ok(json!({
        "scale": view.scale,
        "offsetX": view.offset.x,
        "offsetY": view.offset.y,
        "zoomPercent": camera.zoom_percent(),
        "css": view.css(),
        "bounds": {
            "x": bounds.rect.x0,
            "y": bounds.rect.y0,
            "width": bounds.rect.width(),
            "height": bounds.rect.height(),
            "source": format!("{:?}", bounds.source),
        },
    }))
}

/// Print or delete the stored session.
pub fn run_session<S: KeyValueStore>(store: &SessionStore<S>, action: SessionAction) -> Result<String, CliError> {
    match action {
        SessionAction::Show => match store.load() {
            LoadedSession::Restored(session) => Ok(serde_json::to_string_pretty(&session)?),
            LoadedSession::Missing => Ok("No saved session".to_string()),
            LoadedSession::Purged => Ok("Saved session was unreadable and has been removed".to_string()),
        },
        SessionAction::Clear => {
            store.clear()?;
            Ok(format!("Cleared session '{}'", store.key()))
        }
    }
}

fn viewer_with<S: KeyValueStore>(
    config: ViewerConfig,
    storage: Arc<S>,
    viewport: Size,
    capabilities: Capabilities,
) -> Result<Viewer<SvgArtifact, S>, CliError> {
    let mut viewer = Viewer::new(config, storage)?.with_capabilities(capabilities);
    viewer.set_viewport(viewport);
    Ok(viewer)
}

fn dispatch<S: KeyValueStore>(args: &Args, config: ViewerConfig, storage: Arc<S>) -> Result<(), CliError> {
    match &args.command {
        Command::Render {
            input,
            out,
            format,
            dpi,
        } => {
            let viewer = viewer_with(config, storage, args.viewport, Capabilities::default())?;
            run_render(viewer, input, out.as_deref(), *format, *dpi)
        }
        Command::Copy { input } => {
            let capabilities = crate::clipboard::probe_capabilities();
            let viewer = viewer_with(config, storage, args.viewport, capabilities)?;
            run_copy(viewer, input)
        }
        Command::Fit { input } => {
            let svg = std::fs::read_to_string(input)?;
            let value = fit_svg(&svg, args.viewport, &config)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Command::Session(action) => {
            let store = SessionStore::new(storage, config.session_key.clone());
            println!("{}", run_session(&store, *action)?);
            Ok(())
        }
    }
}

/// Run a parsed command line.
pub fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    if args.ephemeral {
        dispatch(&args, config, Arc::new(MemoryStorage::new()))
    } else {
        let storage = create_default_storage()?;
        log::debug!("Session storage at {}", storage.base_path().display());
        dispatch(&args, config, Arc::new(storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmaster_core::camera::ViewTransform;
    use graphmaster_core::session::PersistedSession;
    use graphmaster_core::split::PaneSplit;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/tmp/flow chart.dot"), ExportFormat::Png),
            PathBuf::from("flow chart.png")
        );
        assert_eq!(
            default_output_path(Path::new("-"), ExportFormat::Pdf),
            PathBuf::from("-.pdf")
        );
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, r#"{ "max_scale": 4.0, "fit_padding": 0 }"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.max_scale, 4.0);
        assert_eq!(config.fit_padding, 0.0);
        assert_eq!(config.min_scale, ViewerConfig::default().min_scale);
        assert!(matches!(
            load_config(Some(&dir.path().join("missing.json"))),
            Err(CliError::Io(_))
        ));
    }

    #[test]
    fn test_fit_svg_reports_transform() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="200" viewBox="0 0 400 200"><rect width="400" height="200" fill="gray"/></svg>"#;
        let value = fit_svg(svg, Size::new(800.0, 600.0), &ViewerConfig::default()).unwrap();
        assert!((value["scale"].as_f64().unwrap() - 1.9).abs() < 1e-6);
        assert!((value["offsetY"].as_f64().unwrap() - 110.0).abs() < 1e-6);
        assert_eq!(value["zoomPercent"], 190);
        assert_eq!(value["bounds"]["source"], "Intrinsic");
    }

    #[test]
    fn test_session_show_and_clear() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()), "test.session");
        assert_eq!(run_session(&store, SessionAction::Show).unwrap(), "No saved session");

        store
            .save(&PersistedSession::capture(
                "digraph { a }",
                ViewTransform::IDENTITY,
                PaneSplit::default(),
                false,
            ))
            .unwrap();
        let shown = run_session(&store, SessionAction::Show).unwrap();
        assert!(shown.contains("digraph { a }"));
        assert!(shown.contains("\"editorFlex\": \"0 0 25%\""));

        run_session(&store, SessionAction::Clear).unwrap();
        assert_eq!(run_session(&store, SessionAction::Show).unwrap(), "No saved session");
    }
}
