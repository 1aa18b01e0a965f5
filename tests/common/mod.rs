#![allow(dead_code)]

use tempfile::TempDir;
use stratus_om::{ObjectId, StorageConfig, StorageEngine};
use stratus_om::storage::page::SlottedPage;
use stratus_om::storage::bufferpool::PageGuard;
use stratus_om::types::PageId;

pub struct TestDb {
    pub engine: StorageEngine,
    pub cat: ObjectId,
    pub dir: TempDir,
}

impl TestDb {
    pub fn page(&self, page_no: u32) -> PageGuard<SlottedPage> {
        let vol_no = self.engine.config().vol_no;
        self.engine.buffer_pool.fix(PageId::new(vol_no, page_no)).expect("fix page")
    }

    /// Shut the engine down and open the same directory again
    pub fn reopen(self) -> TestDb {
        let TestDb { mut engine, cat, dir } = self;
        let config = engine.config().clone();
        engine.shutdown().expect("shutdown");
        drop(engine);
        TestDb { engine: StorageEngine::new(config).expect("reopen engine"), cat, dir }
    }
}

pub fn setup_db(bufferpool_capacity: usize) -> TestDb {
    let dir = TempDir::new().expect("create temp dir");
    let mut config = StorageConfig::new(dir.path());
    config.bufferpool_capacity = bufferpool_capacity;
    let mut engine = StorageEngine::new(config).expect("open engine");
    let cat = engine.create_file("test").expect("create file");
    TestDb { engine, cat, dir }
}

/// Insert `count` records of `size` bytes, tagged with their insertion index
pub fn insert_records(db: &TestDb, count: usize, size: usize) -> Vec<ObjectId> {
    let om = db.engine.object_manager();
    (0..count)
        .map(|i| {
            let data = vec![(i % 251) as u8; size];
            om.create_object(&db.cat, None, i as u16, &data).expect("create object")
        })
        .collect()
}
