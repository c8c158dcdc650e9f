//! Locates the directory imgsafe keeps its `config.toml` and `state.json` in.

use std::io;
use std::path::Path;
use std::path::PathBuf;

/// Environment variable that relocates the imgsafe data directory.
pub const IMGSAFE_HOME_ENV: &str = "IMGSAFE_HOME";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATE_FILE_NAME: &str = "state.json";

const DEFAULT_DIR_NAME: &str = ".imgsafe";

/// Resolves the data directory.
///
/// An `IMGSAFE_HOME` override must name an existing directory and is
/// returned canonicalized. Without it the result is `~/.imgsafe`, which may
/// not exist yet; see [`ensure_imgsafe_home`].
pub fn find_imgsafe_home() -> io::Result<PathBuf> {
    let overridden = std::env::var(IMGSAFE_HOME_ENV).ok();
    resolve_home(overridden.as_deref(), dirs::home_dir())
}

fn resolve_home(overridden: Option<&str>, user_home: Option<PathBuf>) -> io::Result<PathBuf> {
    match overridden.filter(|value| !value.is_empty()) {
        Some(value) => checked_override(value),
        None => user_home
            .map(|home| home.join(DEFAULT_DIR_NAME))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no home directory found; set {IMGSAFE_HOME_ENV}"),
                )
            }),
    }
}

fn checked_override(value: &str) -> io::Result<PathBuf> {
    let path = Path::new(value);
    let metadata = std::fs::metadata(path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("{IMGSAFE_HOME_ENV}={value} is unusable: {err}"),
        )
    })?;
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{IMGSAFE_HOME_ENV}={value} is not a directory"),
        ));
    }
    path.canonicalize()
}

/// Creates `home` and any missing parents.
pub fn ensure_imgsafe_home(home: &Path) -> io::Result<()> {
    std::fs::create_dir_all(home)
}

pub fn config_file_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE_NAME)
}

pub fn state_file_path(home: &Path) -> PathBuf {
    home.join(STATE_FILE_NAME)
}
