use crate::error::OmResult;
use crate::storage::page::Page;
use crate::types::{PAGE_SIZE, PageNo, VolNo};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

pub trait DiskManager<P: Page>: Send + Sync {
    /// Volume served by this manager
    fn vol_no(&self) -> VolNo;

    /// Read a page; Ok(None) when the page was never written or does not decode
    fn read_page(&self, page_no: PageNo) -> OmResult<Option<P>>;

    fn write_page(&self, page: &P) -> OmResult<()>;

    /// Number of page positions the backing file spans
    fn num_pages(&self) -> OmResult<usize>;
}

pub struct FileDiskManager<P: Page> {
    vol_no: VolNo,
    file: Mutex<File>,
    _phantom: std::marker::PhantomData<P>,
}

impl<P: Page> FileDiskManager<P> {

    // open file on disk
    pub fn open(path: &Path, vol_no: VolNo) -> OmResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        debug!("opened volume {} file {}", vol_no, path.display());

        Ok(FileDiskManager {
            vol_no,
            file: Mutex::new(file),
            _phantom: std::marker::PhantomData,
        })
    }

    // get offset of page in disk
    fn get_offset(page_no: PageNo) -> u64 {
        page_no as u64 * PAGE_SIZE as u64
    }
}

impl<P: Page> DiskManager<P> for FileDiskManager<P> {

    fn vol_no(&self) -> VolNo {
        self.vol_no
    }

    /// Read a page from disk
    fn read_page(&self, page_no: PageNo) -> OmResult<Option<P>> {
        let mut buf = [0u8; PAGE_SIZE];
        let mut file = self.file.lock().unwrap();

        file.seek(SeekFrom::Start(Self::get_offset(page_no)))?;
        match file.read_exact(&mut buf) {
            Ok(()) => Ok(P::deserialize(&buf)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a page to disk
    fn write_page(&self, page: &P) -> OmResult<()> {
        let buf = page.serialize();
        let mut file = self.file.lock().unwrap();

        file.seek(SeekFrom::Start(Self::get_offset(page.get_id().page_no)))?;
        file.write_all(&buf)?;
        file.flush()?;
        Ok(())
    }

    fn num_pages(&self) -> OmResult<usize> {
        let file = self.file.lock().unwrap();
        Ok(file.metadata()?.len() as usize / PAGE_SIZE)
    }
}
