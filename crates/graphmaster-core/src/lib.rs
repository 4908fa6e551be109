//! GraphMaster Core Library
//!
//! Platform-agnostic view engine for the GraphMaster DOT previewer: pan and
//! zoom transforms, gesture reconciliation, render sequencing and session
//! persistence.

pub mod camera;
pub mod config;
pub mod frame;
pub mod geometry;
pub mod gesture;
pub mod keys;
pub mod notice;
pub mod platform;
pub mod render;
pub mod session;
pub mod split;
pub mod storage;
pub mod viewer;

pub use camera::{Camera, ViewTransform};
pub use config::{ConfigError, ViewerConfig};
pub use frame::FrameScheduler;
pub use geometry::{ArtifactGeometry, Bounds, BoundsSource, GeometryError, valid_bounding_box};
pub use gesture::{GestureMode, GestureReconciler, PointerCapture, PointerId, PointerInput, PointerKind};
pub use keys::{KeyAction, Modifiers};
pub use notice::{Notice, NoticeLevel};
pub use platform::{Capabilities, Clipboard, PlatformError, RgbaImage};
pub use render::{BoxFuture, LayoutEngine, LayoutError, RenderError, RenderOutcome, RenderStart};
pub use session::{DEFAULT_DOCUMENT, LoadedSession, PersistedSession, SessionStore};
pub use split::{PaneSplit, SplitAxis};
pub use storage::{KeyValueStore, MemoryStorage, PlatformStorage, StorageError, create_default_storage};
pub use viewer::Viewer;
