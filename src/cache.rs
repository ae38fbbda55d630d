// cache.rs
//
// Loaders memoized for the lifetime of the process: each input file is read
// at most once no matter how many recompute passes ask for it.

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data::CropTable;
use crate::geo::GeoBoundary;

/// Where and how to read the two inputs.
#[derive(Debug, Clone)]
pub struct Sources {
    pub data_path: PathBuf,
    pub delimiter: u8,
    pub geojson_path: PathBuf,
    pub name_key: String,
}

pub struct DataCache {
    sources: Sources,
    table: OnceCell<Arc<CropTable>>,
    boundary: OnceCell<Arc<GeoBoundary>>,
    loads: AtomicUsize,
}

impl DataCache {
    pub fn new(sources: Sources) -> Self {
        DataCache {
            sources,
            table: OnceCell::new(),
            boundary: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// The crop table, read on first use. A failed read is not cached, so the
    /// next call retries.
    pub fn table(&self) -> Result<Arc<CropTable>> {
        self.table
            .get_or_try_init(|| {
                self.loads.fetch_add(1, Ordering::Relaxed);
                CropTable::load(&self.sources.data_path, self.sources.delimiter).map(Arc::new)
            })
            .cloned()
    }

    pub fn boundary(&self) -> Result<Arc<GeoBoundary>> {
        self.boundary
            .get_or_try_init(|| {
                self.loads.fetch_add(1, Ordering::Relaxed);
                GeoBoundary::load(&self.sources.geojson_path, &self.sources.name_key)
                    .map(Arc::new)
            })
            .cloned()
    }

    /// Number of successful or attempted file reads so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn data_path(&self) -> &Path {
        &self.sources.data_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loaders_run_once() {
        let csv = write_temp(crate::data::tests::SAMPLE);
        let geo = write_temp(crate::geo::tests::SAMPLE);
        let cache = DataCache::new(Sources {
            data_path: csv.path().to_path_buf(),
            delimiter: b',',
            geojson_path: geo.path().to_path_buf(),
            name_key: "NAME_1".to_string(),
        });

        let first = cache.table().unwrap();
        for _ in 0..5 {
            let again = cache.table().unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        let shapes = cache.boundary().unwrap();
        assert!(Arc::ptr_eq(&shapes, &cache.boundary().unwrap()));
        assert_eq!(cache.load_count(), 2);
    }

    #[test]
    fn missing_inputs_surface_errors() {
        let cache = DataCache::new(Sources {
            data_path: PathBuf::from("/nonexistent/crops.csv"),
            delimiter: b',',
            geojson_path: PathBuf::from("/nonexistent/india.json"),
            name_key: "NAME_1".to_string(),
        });
        assert!(cache.table().is_err());
        assert!(cache.boundary().is_err());
    }
}
