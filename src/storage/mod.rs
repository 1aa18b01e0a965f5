pub mod bufferpool;
pub mod disk_manager;
pub mod replacement_strategy;
pub mod page;
pub mod page_allocator;
pub mod dealloc_list;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use log::info;
use serde::{Serialize, Deserialize};
use bufferpool::BufferPool;
use dealloc_list::DeallocList;
use disk_manager::FileDiskManager;
use page::SlottedPage;
use page::alloc_map_page::AllocMapPage;
use page_allocator::PageAllocator;
use replacement_strategy::ReplacementStrategyType;
use crate::error::{OmError, OmResult};
use crate::om::ObjectManager;
use crate::types::{
    FileNo, ObjectId, PageNo, VolNo, CATALOG_FILE, DATA_FILE, DEFAULT_BUCKET_THRESHOLDS_PCT,
    DEFAULT_BUFFERPOOL_SIZE, MAP_FILE, N_BUCKETS,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_dir: PathBuf,
    #[serde(default = "default_vol_no")]
    pub vol_no: VolNo,
    #[serde(default = "default_bufferpool_capacity")]
    pub bufferpool_capacity: usize,
    #[serde(default = "default_replacement_strategy")]
    pub bufferpool_replacement_strategy: ReplacementStrategyType,
    #[serde(default = "default_bucket_thresholds")]
    pub bucket_thresholds_pct: [u8; N_BUCKETS],   // of a page's data area
    #[serde(default)]
    pub dealloc_pool_capacity: Option<usize>,    // None = unbounded
}

fn default_vol_no() -> VolNo {
    1
}

fn default_bufferpool_capacity() -> usize {
    DEFAULT_BUFFERPOOL_SIZE
}

fn default_replacement_strategy() -> ReplacementStrategyType {
    ReplacementStrategyType::LRU
}

fn default_bucket_thresholds() -> [u8; N_BUCKETS] {
    DEFAULT_BUCKET_THRESHOLDS_PCT
}

impl StorageConfig {
    /// Default configuration for a database directory
    pub fn new(database_dir: impl Into<PathBuf>) -> Self {
        StorageConfig {
            database_dir: database_dir.into(),
            vol_no: default_vol_no(),
            bufferpool_capacity: default_bufferpool_capacity(),
            bufferpool_replacement_strategy: default_replacement_strategy(),
            bucket_thresholds_pct: default_bucket_thresholds(),
            dealloc_pool_capacity: None,
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> OmResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: StorageConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OmResult<()> {
        if self.bufferpool_capacity == 0 {
            return Err(OmError::Config("bufferpool_capacity must be positive".into()));
        }
        let pct = &self.bucket_thresholds_pct;
        if pct[0] == 0 || pct[N_BUCKETS - 1] >= 100 || pct.windows(2).any(|w| w[0] >= w[1]) {
            return Err(OmError::Config(format!(
                "bucket thresholds {:?} must ascend strictly within 1..100",
                pct
            )));
        }
        if self.dealloc_pool_capacity == Some(0) {
            return Err(OmError::Config("dealloc_pool_capacity must be positive".into()));
        }
        Ok(())
    }
}

/// Names and catalog objects of the files on the volume, kept in catalog.json
#[derive(Debug, Serialize, Deserialize)]
struct CatalogIndex {
    next_file_no: FileNo,
    catalog_pages: Vec<PageNo>,
    files: BTreeMap<String, ObjectId>,
}

impl Default for CatalogIndex {
    fn default() -> Self {
        CatalogIndex { next_file_no: 1, catalog_pages: Vec::new(), files: BTreeMap::new() }
    }
}

pub struct StorageEngine {
    config: StorageConfig,

    // buffer pool for data and catalog pages
    pub buffer_pool: Arc<BufferPool<SlottedPage>>,

    // physical page allocation for the volume
    pub allocator: Arc<PageAllocator>,

    object_manager: ObjectManager,
    catalog: CatalogIndex,
}

impl StorageEngine {
    /// Open (or create) the volume in `config.database_dir`:
    /// - the data file served through the buffer pool,
    /// - the allocation map file behind the page allocator,
    /// - the catalog index naming the files.
    pub fn new(config: StorageConfig) -> OmResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.database_dir)?;

        let data_disk = Arc::new(FileDiskManager::<SlottedPage>::open(
            &config.database_dir.join(DATA_FILE),
            config.vol_no,
        )?);
        let map_disk = Arc::new(FileDiskManager::<AllocMapPage>::open(
            &config.database_dir.join(MAP_FILE),
            config.vol_no,
        )?);

        let allocator = Arc::new(PageAllocator::new(map_disk)?);
        let buffer_pool = Arc::new(BufferPool::new(
            config.bufferpool_capacity,
            config.bufferpool_replacement_strategy,
            data_disk,
        ));

        let catalog_path = config.database_dir.join(CATALOG_FILE);
        let catalog = if catalog_path.exists() {
            serde_json::from_str(&fs::read_to_string(&catalog_path)?)?
        } else {
            CatalogIndex::default()
        };

        info!(
            "opened volume {} in {} ({} files)",
            config.vol_no,
            config.database_dir.display(),
            catalog.files.len()
        );
        Ok(StorageEngine {
            object_manager: ObjectManager::new(Arc::clone(&buffer_pool), Arc::clone(&allocator)),
            buffer_pool,
            allocator,
            catalog,
            config,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn object_manager(&self) -> &ObjectManager {
        &self.object_manager
    }

    /// Create a named data file. Return its catalog object.
    pub fn create_file(&mut self, name: &str) -> OmResult<ObjectId> {
        if self.catalog.files.contains_key(name) {
            return Err(OmError::FileExists(name.to_string()));
        }
        let file_no = self.catalog.next_file_no;
        let cat = self.object_manager.create_file(
            self.config.vol_no,
            file_no,
            &self.config.bucket_thresholds_pct,
            &mut self.catalog.catalog_pages,
        )?;

        self.catalog.next_file_no += 1;
        self.catalog.files.insert(name.to_string(), cat);
        self.save_catalog()?;
        Ok(cat)
    }

    /// Catalog object of a named file
    pub fn open_file(&self, name: &str) -> OmResult<ObjectId> {
        self.catalog.files
            .get(name)
            .copied()
            .ok_or_else(|| OmError::FileNotFound(name.to_string()))
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.catalog.files.keys().map(String::as_str)
    }

    /// An empty deallocation list drawing on the configured pool size
    pub fn new_dealloc_list(&self) -> DeallocList {
        match self.config.dealloc_pool_capacity {
            Some(capacity) => DeallocList::with_pool_capacity(capacity),
            None => DeallocList::new(),
        }
    }

    /// Perform the deallocations queued on `list`: each page is dropped from
    /// the buffer pool and handed back to the volume. Return the number of
    /// pages freed.
    pub fn free_dealloc_list(&self, list: &mut DeallocList) -> OmResult<usize> {
        let mut freed = 0;
        for elem in list.drain() {
            for page_id in elem.pages() {
                if page_id.vol_no != self.config.vol_no {
                    return Err(OmError::BadVolume(page_id.vol_no));
                }
                self.buffer_pool.discard_page(page_id)?;
                self.allocator.deallocate(page_id.page_no)?;
                freed += 1;
            }
        }
        if freed > 0 {
            info!("returned {} pages to volume {}", freed, self.config.vol_no);
        }
        Ok(freed)
    }

    fn save_catalog(&self) -> OmResult<()> {
        let path = self.config.database_dir.join(CATALOG_FILE);
        fs::write(path, serde_json::to_string_pretty(&self.catalog)?)?;
        Ok(())
    }

    /// Flush dirty pages, the allocation map and the catalog index
    pub fn shutdown(&mut self) -> OmResult<()> {
        self.buffer_pool.flush_all()?;
        self.allocator.flush_all()?;
        self.save_catalog()?;
        info!("volume {} shut down", self.config.vol_no);
        Ok(())
    }
}
