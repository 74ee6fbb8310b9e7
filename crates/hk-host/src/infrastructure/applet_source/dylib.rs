//! Native applet source: descriptors exported by shared libraries.
//!
//! For an applet named `clock` the source opens `libclock.so` (`clock.dll`,
//! `libclock.dylib`) from its directory and calls two C-ABI symbols:
//!
//! ```text
//! char *housekeeper_applet_descriptor(const char *name);  // JSON, or NULL
//! void  housekeeper_applet_free(char *descriptor);
//! ```
//!
//! Opening a library runs arbitrary native code, so it happens on the
//! blocking thread pool.  Opened libraries are kept until the source is
//! dropped; loading the same name again replaces the old handle.

use std::collections::HashMap;
use std::ffi::{c_char, CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hk_applets::{declarative_factory, AppletDescriptor};
use hk_core::{AppletName, Registrar};
use libloading::Library;
use tracing::{debug, info};

use super::{AppletSource, SourceError};

const DESCRIPTOR_SYMBOL: &[u8] = b"housekeeper_applet_descriptor";
const FREE_SYMBOL: &[u8] = b"housekeeper_applet_free";

type DescriptorFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type FreeFn = unsafe extern "C" fn(*mut c_char);

/// Loads applets from native libraries in one directory.
#[derive(Debug, Clone)]
pub struct DylibSource {
    dir: PathBuf,
    libraries: Arc<Mutex<HashMap<AppletName, Library>>>,
}

impl DylibSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            libraries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Platform-specific path of the library for `name`.
    pub fn library_path(&self, name: &AppletName) -> PathBuf {
        self.dir.join(libloading::library_filename(name.as_str()))
    }

    /// Names whose libraries are currently open.
    pub fn loaded_names(&self) -> Vec<AppletName> {
        let mut names: Vec<AppletName> = self
            .libraries
            .lock()
            .map(|libs| libs.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl AppletSource for DylibSource {
    async fn load(&self, name: &AppletName, registrar: &Registrar) -> Result<(), SourceError> {
        let path = self.library_path(name);
        if !path.is_file() {
            return Err(SourceError::NotFound(name.to_string()));
        }

        let owned_name = name.clone();
        let owned_path = path.clone();
        let (library, raw) =
            tokio::task::spawn_blocking(move || read_descriptor(&owned_path, &owned_name))
                .await
                .map_err(|e| SourceError::Library {
                    path: path.clone(),
                    reason: e.to_string(),
                })??;

        let descriptor = AppletDescriptor::from_json(&raw)?;
        registrar.register(name.clone(), declarative_factory(name.as_str(), descriptor)?);

        let replaced = self
            .libraries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.clone(), library)
            .is_some();
        info!(applet = %name, path = %path.display(), replaced, "native applet loaded");
        Ok(())
    }
}

/// Opens the library at `path` and copies out the descriptor for `name`.
fn read_descriptor(path: &Path, name: &AppletName) -> Result<(Library, String), SourceError> {
    let library_error = |reason: String| SourceError::Library {
        path: path.to_path_buf(),
        reason,
    };

    debug!(path = %path.display(), "opening native applet library");
    // SAFETY: the library is trusted applet code placed in the applet
    // directory by the operator; its initializers run here.
    let library = unsafe { Library::new(path) }.map_err(|e| library_error(e.to_string()))?;

    let raw = {
        // SAFETY: the symbol signatures are the documented applet ABI.
        let describe: libloading::Symbol<DescriptorFn> = unsafe { library.get(DESCRIPTOR_SYMBOL) }
            .map_err(|e| library_error(format!("symbol housekeeper_applet_descriptor: {e}")))?;
        let free: libloading::Symbol<FreeFn> = unsafe { library.get(FREE_SYMBOL) }
            .map_err(|e| library_error(format!("symbol housekeeper_applet_free: {e}")))?;

        let c_name = CString::new(name.as_str()).map_err(|e| library_error(e.to_string()))?;
        let out = unsafe { describe(c_name.as_ptr()) };
        if out.is_null() {
            return Err(library_error("descriptor symbol returned null".to_string()));
        }
        // SAFETY: `out` is a NUL-terminated string owned by the library until
        // it is handed back to `free`.
        let raw = unsafe { CStr::from_ptr(out) }.to_string_lossy().into_owned();
        unsafe { free(out) };
        raw
    };

    Ok((library, raw))
}
