use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::{Airfoil, AirfoilError, LinearAirfoil, load_table_file, normalize_name};

const TABLE_EXTENSIONS: [&str; 4] = ["dat", "csv", "tsv", "txt"];

/// Name-indexed collection of airfoils; lookups ignore case.
#[derive(Debug, Clone, Default)]
pub struct AirfoilCatalog {
    entries: BTreeMap<String, Arc<dyn Airfoil>>,
}

impl AirfoilCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with the built-in linear sections.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(LinearAirfoil::naca0012()));
        catalog.register(Arc::new(LinearAirfoil::naca23012()));
        catalog
    }

    /// Insert an airfoil, replacing any entry with the same name.
    pub fn register(&mut self, airfoil: Arc<dyn Airfoil>) {
        let key = normalize_name(airfoil.name());
        debug!("registering airfoil {key}");
        self.entries.insert(key, airfoil);
    }

    pub fn load(&self, name: &str) -> Result<Arc<dyn Airfoil>, AirfoilError> {
        self.entries
            .get(&normalize_name(name))
            .cloned()
            .ok_or_else(|| AirfoilError::UnknownAirfoil(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_name(name))
    }

    /// Register every table file in `dir`, returning the names that were added.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<Vec<String>, AirfoilError> {
        let dir = dir.as_ref();
        let io_error = |source| AirfoilError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_error)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| TABLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut added = Vec::with_capacity(paths.len());
        for path in paths {
            let airfoil = load_table_file(&path)?;
            added.push(airfoil.name().to_string());
            self.register(Arc::new(airfoil));
        }
        Ok(added)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
