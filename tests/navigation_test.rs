mod common;

use common::{insert_records, setup_db};
use stratus_om::{DeallocList, ObjectId, OmError};

const RECORD: usize = 1000;     // three records fill a page

/// Page numbers in chain order from the catalog's first page
fn chain(db: &common::TestDb) -> Vec<u32> {
    let entry = db.engine.object_manager().catalog_entry(&db.cat).unwrap();
    let mut pages = vec![entry.first_page];
    let mut cur = entry.first_page;
    while let Some(next) = db.page(cur).read().next_page() {
        pages.push(next);
        cur = next;
    }
    pages
}

fn collect_backward(db: &common::TestDb) -> Vec<ObjectId> {
    let om = db.engine.object_manager();
    let mut seen = Vec::new();
    let mut cur = None;
    while let Some((oid, _)) = om.prev_object(&db.cat, cur.as_ref()).unwrap() {
        seen.push(oid);
        cur = Some(oid);
    }
    seen
}

fn collect_forward(db: &common::TestDb) -> Vec<ObjectId> {
    let om = db.engine.object_manager();
    let mut seen = Vec::new();
    let mut cur = None;
    while let Some((oid, _)) = om.next_object(&db.cat, cur.as_ref()).unwrap() {
        seen.push(oid);
        cur = Some(oid);
    }
    seen
}

#[test]
fn backward_scan_visits_every_object_once() {
    let db = setup_db(16);
    let oids = insert_records(&db, 10, RECORD);
    assert_eq!(chain(&db).len(), 4);

    let seen = collect_backward(&db);
    let expected: Vec<ObjectId> = oids.iter().rev().copied().collect();
    assert_eq!(seen, expected);
    assert_eq!(db.engine.buffer_pool.fixed_count(), 0);
}

#[test]
fn forward_scan_mirrors_backward_scan() {
    let db = setup_db(16);
    let oids = insert_records(&db, 10, RECORD);
    assert_eq!(collect_forward(&db), oids);
}

#[test]
fn prev_crosses_page_boundary() {
    let db = setup_db(16);
    let oids = insert_records(&db, 6, RECORD);
    let pages = chain(&db);
    assert_eq!(oids[3].page_no, pages[1]);
    assert_eq!(oids[3].slot_no, 0);

    let (prev, header) = db.engine.object_manager()
        .prev_object(&db.cat, Some(&oids[3])).unwrap().unwrap();
    assert_eq!(prev.page_no, pages[0]);
    assert_eq!(prev.slot_no, 2);
    assert_eq!(prev, oids[2]);
    assert_eq!(header.length as usize, RECORD);
}

#[test]
fn first_slot_of_first_page_has_no_prev() {
    let db = setup_db(16);
    let oids = insert_records(&db, 4, RECORD);
    let om = db.engine.object_manager();
    assert!(om.prev_object(&db.cat, Some(&oids[0])).unwrap().is_none());
    assert!(om.next_object(&db.cat, Some(&oids[3])).unwrap().is_none());
}

#[test]
fn scan_skips_destroyed_objects_and_pages() {
    let db = setup_db(16);
    let oids = insert_records(&db, 9, RECORD);
    let om = db.engine.object_manager();
    let mut list = DeallocList::new();

    // empty the middle page, punch a hole in the first
    for oid in [&oids[3], &oids[4], &oids[5], &oids[1]] {
        om.destroy_object(&db.cat, oid, &mut list).unwrap();
    }
    assert_eq!(list.len(), 1);
    assert_eq!(chain(&db).len(), 2);

    let live = vec![oids[8], oids[7], oids[6], oids[2], oids[0]];
    assert_eq!(collect_backward(&db), live);
    let mut forward = live.clone();
    forward.reverse();
    assert_eq!(collect_forward(&db), forward);
}

#[test]
fn empty_first_page_is_skipped() {
    let db = setup_db(16);
    let oids = insert_records(&db, 4, RECORD);
    let om = db.engine.object_manager();
    let mut list = DeallocList::new();
    for oid in &oids[..3] {
        om.destroy_object(&db.cat, oid, &mut list).unwrap();
    }

    assert_eq!(collect_forward(&db), vec![oids[3]]);
    assert!(om.prev_object(&db.cat, Some(&oids[3])).unwrap().is_none());
}

#[test]
fn navigation_parameter_errors() {
    let db = setup_db(16);
    let oids = insert_records(&db, 2, 10);
    let om = db.engine.object_manager();

    let result = om.prev_object(&ObjectId::default(), Some(&oids[1]));
    assert!(matches!(result, Err(OmError::BadCatalogObject)));
    let result = om.prev_object(&db.cat, Some(&ObjectId::default()));
    assert!(matches!(result, Err(OmError::BadObjectId)));
    assert_eq!(db.engine.buffer_pool.fixed_count(), 0);
}

#[test]
fn trailing_hole_is_skipped() {
    let db = setup_db(16);
    let oids = insert_records(&db, 3, 10);
    let om = db.engine.object_manager();
    let mut list = DeallocList::new();
    om.destroy_object(&db.cat, &oids[1], &mut list).unwrap();
    om.destroy_object(&db.cat, &oids[2], &mut list).unwrap();

    let (prev, _) = om.prev_object(&db.cat, None).unwrap().unwrap();
    assert_eq!(prev, oids[0]);
    assert!(om.next_object(&db.cat, Some(&oids[0])).unwrap().is_none());
    assert!(om.prev_object(&db.cat, Some(&oids[0])).unwrap().is_none());
    assert_eq!(collect_forward(&db), vec![oids[0]]);
}
