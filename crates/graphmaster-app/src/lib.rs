//! GraphMaster Application
//!
//! Command-line shell that drives the viewer core: render DOT files, fit
//! and export them, copy them to the clipboard and inspect the saved
//! session.

pub mod cli;

#[cfg(feature = "native")]
mod app;
#[cfg(feature = "native")]
mod clipboard;

pub use cli::{Args, CliError, Command, SessionAction, parse_args, usage};

#[cfg(feature = "native")]
pub use app::{default_output_path, fit_svg, load_config, run, run_session};
#[cfg(feature = "native")]
pub use clipboard::{SystemClipboard, probe_capabilities};
