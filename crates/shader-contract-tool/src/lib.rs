//! Command-line front end for shader contract reflection
//!
//! Reads preset manifests and compiled shader passes from disk and reflects
//! them with [`shader_contract`].

mod error;

pub mod manifest;
pub mod reflected_preset;

pub use error::PresetError;
pub use manifest::{PassSpec, PresetSpec, PresetValidationError};
pub use reflected_preset::{ReflectedPass, ReflectedPreset};

/// Installs the stderr logger used by the binaries
///
/// # Arguments
/// * `verbose` - Log at DEBUG instead of INFO
pub fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {e}");
    }
}
