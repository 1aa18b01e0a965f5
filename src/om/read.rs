use crate::error::{OmError, OmResult};
use crate::om::ObjectManager;
use crate::types::{ObjectHeader, ObjectId};

impl ObjectManager {

    /// Read `length` bytes of an object's body from `start`, or up to the
    /// end of the object when `length` is None
    pub fn read_object(&self, oid: &ObjectId, start: usize, length: Option<usize>) -> OmResult<Vec<u8>> {
        if oid.is_nil() {
            return Err(OmError::BadObjectId);
        }
        let guard = self.pool.fix(oid.page_id())?;
        let page = guard.read();
        let (_, body) = page.object(oid)?;

        let end = match length {
            Some(length) => start.checked_add(length).ok_or(OmError::BadLength)?,
            None => body.len(),
        };
        if start > end || end > body.len() {
            return Err(OmError::BadLength);
        }
        Ok(body[start..end].to_vec())
    }

    pub fn object_header(&self, oid: &ObjectId) -> OmResult<ObjectHeader> {
        if oid.is_nil() {
            return Err(OmError::BadObjectId);
        }
        let guard = self.pool.fix(oid.page_id())?;
        let header = guard.read().object(oid)?.0;
        Ok(header)
    }
}
