//! # Profiling
//!
//! With the `profiling` feature enabled, scene updates, system dispatch and
//! entity manager clones are wrapped in `tracing` spans. [`init_tracing`]
//! installs a subscriber that prints them.
//!
//! ```toml
//! [dependencies]
//! scene_ecs = { version = "0.3", features = ["profiling"] }
//! ```
//!
//! ```ignore
//! let _guard = scene_ecs::profiling::init_tracing(Some(Path::new("logs")))?;
//!
//! let mut scene = Scene::new();
//! scene.update(1.0 / 60.0)?; // emits a `scene.update` span
//! ```
//!
//! Use `RUST_LOG=scene_ecs=trace` to see per-frame dispatch.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{EcsError, Result};

/// Install the global subscriber.
///
/// With `log_dir`, JSON lines go to a daily rolling file there and the
/// returned guard must be held until shutdown to flush it. Without, human
/// readable output goes to stdout. Filtering follows `RUST_LOG`, defaulting
/// to `info`.
pub fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "scene_ecs.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|err| EcsError::ConfigError(err.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .try_init()
                .map_err(|err| EcsError::ConfigError(err.to_string()))?;
            Ok(None)
        }
    }
}
