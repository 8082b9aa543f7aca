/*
 *  vid/loader.rs
 *
 *  vidref - renderer module loader
 *  (c) 2020-26 Stuart Hunter
 *
 *  Module loader and the handle slot for the loaded module
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::rc::Rc;
use log::{debug, warn};

use super::binding::Bindings;
use super::error::LoadError;
use super::ffi::{VIDREF_ABI_VERSION_MAJOR, VIDREF_ABI_VERSION_MINOR};
use super::host::HostLink;

/// An opened module. Dropping it closes the underlying unit.
pub trait RendererModule {
    fn name(&self) -> &str;

    /// Resolve every required entry point. Must either produce a complete
    /// set or fail without side effects.
    fn resolve(&self, link: &Rc<HostLink>) -> Result<Bindings, LoadError>;
}

pub type BoxedModule = Box<dyn RendererModule>;

/// Opens modules by name. Keeps the platform mechanism away from the
/// fallback policy.
pub trait ModuleLoader {
    fn open(&mut self, name: &str) -> Result<BoxedModule, LoadError>;
}

/// Accept a module reporting `major.minor`. The major version must match;
/// a newer minor only warns.
pub fn check_abi_version(name: &str, major: u32, minor: u32) -> Result<(), LoadError> {
    debug!("{} ABI version: {}.{}", name, major, minor);

    if major != VIDREF_ABI_VERSION_MAJOR {
        return Err(LoadError::AbiMismatch {
            name: name.to_string(),
            found: major,
            expected: VIDREF_ABI_VERSION_MAJOR,
        });
    }

    if minor > VIDREF_ABI_VERSION_MINOR {
        warn!("{} has newer minor version {}.{} than host {}.{}",
            name, major, minor,
            VIDREF_ABI_VERSION_MAJOR, VIDREF_ABI_VERSION_MINOR
        );
    }

    Ok(())
}

/// Handle slot for the one module that may be loaded at a time
#[derive(Default)]
pub struct LoadedModule {
    handle: Option<BoxedModule>,
    active: bool,
}

impl LoadedModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a freshly opened module. Not yet active.
    pub fn attach(&mut self, handle: BoxedModule) {
        debug_assert!(self.handle.is_none(), "attach over a loaded module");
        self.handle = Some(handle);
        self.active = false;
    }

    pub fn handle(&self) -> Option<&dyn RendererModule> {
        self.handle.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.handle.as_ref().map(|h| h.name())
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mark_active(&mut self) {
        self.active = self.handle.is_some();
    }

    /// Release the module; a no-op on an empty slot.
    ///
    /// Every binding into the module must already be cleared.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("closing {}", handle.name());
            drop(handle);
        }
        self.active = false;
    }
}

#[cfg(feature = "plugin-system")]
pub use native_loader::NativeLoader;

#[cfg(feature = "plugin-system")]
mod native_loader {
    use std::ffi::OsStr;
    use std::path::{Path, PathBuf};
    use log::{debug, info};
    use libloading::Library;

    use super::{BoxedModule, ModuleLoader};
    use crate::vid::error::LoadError;
    use crate::vid::native::NativeModule;

    /// Loads renderer modules from shared objects
    #[derive(Debug, Clone)]
    pub struct NativeLoader {
        search_paths: Vec<PathBuf>,
    }

    impl NativeLoader {
        pub fn new(extra_path: Option<PathBuf>) -> Self {
            Self { search_paths: Self::search_paths(extra_path) }
        }

        /// Directories searched before falling back to the platform
        /// loader, in priority order
        pub fn search_paths(extra_path: Option<PathBuf>) -> Vec<PathBuf> {
            let mut paths = Vec::new();

            // 1. Environment variable override
            if let Ok(path) = std::env::var("VIDREF_DRIVER_PATH") {
                paths.push(PathBuf::from(path));
            }

            // 2. Command line / config file
            if let Some(path) = extra_path {
                paths.push(path);
            }

            // 3. Development directory (relative to cwd)
            paths.push(PathBuf::from("./target/release"));

            // 4. User-local directory
            if let Some(home) = dirs_next::home_dir() {
                paths.push(home.join(".local/lib/vidref"));
            }

            // 5. System directories
            paths.push(PathBuf::from("/usr/local/lib/vidref"));
            paths.push(PathBuf::from("/usr/lib/vidref"));

            paths
        }

        /// Possible file names for a module, e.g. "soft" gives
        /// `libvidref_soft.so` and `libvidref-soft.so` on Linux
        pub fn module_filenames(name: &str) -> Vec<String> {
            let mut names = Vec::new();

            #[cfg(target_os = "macos")]
            {
                names.push(format!("libvidref_{}.dylib", name));
                names.push(format!("libvidref-{}.dylib", name));
            }

            #[cfg(target_os = "windows")]
            {
                names.push(format!("vidref_{}.dll", name));
                names.push(format!("vidref-{}.dll", name));
            }

            #[cfg(not(any(target_os = "macos", target_os = "windows")))]
            {
                names.push(format!("libvidref_{}.so", name));
                names.push(format!("libvidref-{}.so", name));
            }

            names
        }

        /// Find a module file for `name` in the search paths
        pub fn find_module(&self, name: &str) -> Option<PathBuf> {
            // an explicit path bypasses the search
            if name.contains(std::path::MAIN_SEPARATOR) {
                return None;
            }

            let filenames = Self::module_filenames(name);
            for path in self.search_paths.iter().filter(|p| p.is_dir()) {
                for filename in &filenames {
                    let candidate = path.join(filename);
                    if candidate.exists() {
                        debug!("Found module at: {}", candidate.display());
                        return Some(candidate);
                    }
                }
            }
            None
        }

        /// Symbols are made globally visible so the module can resolve
        /// against companion libraries loaded before it.
        #[cfg(unix)]
        fn open_library(target: &OsStr) -> Result<Library, libloading::Error> {
            use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LAZY};
            // SAFETY: running a module's initialisers is the point of loading it
            let library = unsafe { UnixLibrary::open(Some(target), RTLD_LAZY | RTLD_GLOBAL)? };
            Ok(library.into())
        }

        #[cfg(not(unix))]
        fn open_library(target: &OsStr) -> Result<Library, libloading::Error> {
            // SAFETY: as above
            unsafe { Library::new(target) }
        }
    }

    impl ModuleLoader for NativeLoader {
        fn open(&mut self, name: &str) -> Result<BoxedModule, LoadError> {
            info!("------- Loading {} -------", name);

            let found = self.find_module(name);
            let target: &OsStr = match found.as_deref() {
                Some(path) => path.as_os_str(),
                None => Path::new(name).as_os_str(),
            };

            let library = Self::open_library(target).map_err(|e| LoadError::LibraryNotFound {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

            Ok(Box::new(NativeModule::new(name, library)))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_search_paths() {
            let paths = NativeLoader::search_paths(Some(PathBuf::from("/opt/vidref")));
            assert!(paths.iter().any(|p| p == Path::new("/opt/vidref")));
            assert!(paths.iter().any(|p| p.to_string_lossy().contains("target/release")));
            assert_eq!(paths.last().map(PathBuf::as_path), Some(Path::new("/usr/lib/vidref")));
        }

        #[test]
        fn test_module_filenames() {
            let names = NativeLoader::module_filenames("soft");
            assert_eq!(names.len(), 2);

            #[cfg(target_os = "linux")]
            {
                assert!(names.contains(&"libvidref_soft.so".to_string()));
                assert!(names.contains(&"libvidref-soft.so".to_string()));
            }
        }

        #[test]
        fn test_open_missing_module() {
            let mut loader = NativeLoader::new(None);
            let err = loader.open("vidref-definitely-not-installed").err().unwrap();
            assert!(matches!(err, LoadError::LibraryNotFound { ref name, .. } if name == "vidref-definitely-not-installed"));
        }

        #[test]
        fn test_explicit_path_skips_search() {
            let loader = NativeLoader::new(None);
            assert!(loader.find_module("/nowhere/libvidref_soft.so").is_none());
        }
    }
}
