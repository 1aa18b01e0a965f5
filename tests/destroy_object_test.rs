mod common;

use std::collections::{HashMap, HashSet, VecDeque};
use common::{insert_records, setup_db, TestDb};
use stratus_om::{DeallocElem, DeallocList, ObjectId, OmError, PageId};
use stratus_om::storage::page::Page;
use stratus_om::types::{aligned_length, N_BUCKETS, OBJECT_HEADER_SIZE};

const RECORD: usize = 1000;     // three records fill a page

fn accounting(db: &TestDb, page_no: u32) -> (u16, u16, u16) {
    let guard = db.page(page_no);
    let page = guard.read();
    (page.n_slots(), page.free(), page.unused())
}

/// Bucket of every listed page, asserting no page is listed twice
fn bucket_membership(db: &TestDb) -> HashMap<u32, usize> {
    let entry = db.engine.object_manager().catalog_entry(&db.cat).unwrap();
    let mut members = HashMap::new();
    for bucket in 0..N_BUCKETS {
        let mut cur = entry.avail_heads[bucket];
        while let Some(page_no) = cur {
            assert!(members.insert(page_no, bucket).is_none(), "page {page_no} listed twice");
            let guard = db.page(page_no);
            assert_eq!(guard.read().bucket(), Some(bucket as u8));
            cur = guard.read().space_next();
        }
    }
    members
}

/// Page numbers in chain order from a file's first page
fn chain(db: &TestDb, cat: &ObjectId) -> Vec<u32> {
    let entry = db.engine.object_manager().catalog_entry(cat).unwrap();
    let mut pages = vec![entry.first_page];
    let mut cur = entry.first_page;
    while let Some(next) = db.page(cur).read().next_page() {
        pages.push(next);
        cur = next;
    }
    pages
}

#[test]
fn destroy_highest_slot_shrinks_page() {
    let db = setup_db(16);
    let oids = insert_records(&db, 3, 10);
    let page_no = oids[2].page_no;
    let (n_slots, free, unused) = accounting(&db, page_no);

    let mut list = DeallocList::new();
    db.engine.object_manager().destroy_object(&db.cat, &oids[2], &mut list).unwrap();

    let after = accounting(&db, page_no);
    assert_eq!(after.0, n_slots - 1);
    assert_eq!(after.1 as usize, free as usize - (OBJECT_HEADER_SIZE + aligned_length(10)));
    assert_eq!(after.2, unused);
}

#[test]
fn destroy_middle_slot_adds_to_unused() {
    let db = setup_db(16);
    let oids = insert_records(&db, 3, 10);
    let page_no = oids[1].page_no;
    let (n_slots, free, unused) = accounting(&db, page_no);

    let mut list = DeallocList::new();
    db.engine.object_manager().destroy_object(&db.cat, &oids[1], &mut list).unwrap();

    let after = accounting(&db, page_no);
    assert_eq!(after.0, n_slots);
    assert_eq!(after.1, free);
    assert_eq!(after.2 as usize, unused as usize + OBJECT_HEADER_SIZE + aligned_length(10));

    // neighbours are untouched
    let om = db.engine.object_manager();
    assert_eq!(om.read_object(&oids[0], 0, None).unwrap(), vec![0u8; 10]);
    assert_eq!(om.read_object(&oids[2], 0, None).unwrap(), vec![2u8; 10]);
}

#[test]
fn insert_then_destroy_restores_accounting() {
    let db = setup_db(16);
    let oids = insert_records(&db, 2, 40);
    let page_no = oids[0].page_no;
    let before = accounting(&db, page_no);

    let om = db.engine.object_manager();
    let oid = om.create_object(&db.cat, None, 0, b"short lived").unwrap();
    assert_eq!(oid.page_no, page_no);
    om.destroy_object(&db.cat, &oid, &mut DeallocList::new()).unwrap();

    assert_eq!(accounting(&db, page_no), before);
}

#[test]
fn emptied_page_is_unlinked_and_queued() {
    let db = setup_db(16);
    let oids = insert_records(&db, 4, RECORD);
    let om = db.engine.object_manager();
    let first = om.catalog_entry(&db.cat).unwrap().first_page;
    let second = oids[3].page_no;
    assert_ne!(second, first);

    let mut list = DeallocList::new();
    om.destroy_object(&db.cat, &oids[3], &mut list).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list.iter().next(), Some(&DeallocElem::Page(PageId::new(1, second))));
    let entry = om.catalog_entry(&db.cat).unwrap();
    assert_eq!(entry.last_page, first);
    assert_eq!(db.page(first).read().next_page(), None);
    assert!(!bucket_membership(&db).contains_key(&second));
    assert_eq!(db.engine.buffer_pool.fixed_count(), 0);
}

#[test]
fn emptied_first_page_stays_listed() {
    let db = setup_db(16);
    let oids = insert_records(&db, 4, RECORD);
    let om = db.engine.object_manager();
    let first = om.catalog_entry(&db.cat).unwrap().first_page;

    let mut list = DeallocList::new();
    for oid in &oids[..3] {
        om.destroy_object(&db.cat, oid, &mut list).unwrap();
    }

    assert!(list.is_empty());
    assert!(db.page(first).read().is_empty());
    assert_eq!(db.page(first).read().next_page(), Some(oids[3].page_no));
    assert_eq!(bucket_membership(&db).get(&first), Some(&(N_BUCKETS - 1)));
}

#[test]
fn pages_belong_to_at_most_one_bucket() {
    let db = setup_db(16);
    let oids = insert_records(&db, 40, 300);
    let om = db.engine.object_manager();
    let mut list = DeallocList::new();

    for (i, oid) in oids.iter().enumerate() {
        if i % 3 != 1 {
            om.destroy_object(&db.cat, oid, &mut list).unwrap();
        }
        bucket_membership(&db);
    }
    for oid in oids.iter().skip(1).step_by(3) {
        assert_eq!(om.read_object(oid, 0, Some(1)).unwrap().len(), 1);
    }
}

#[test]
fn null_identities_fix_nothing() {
    let db = setup_db(16);
    let oids = insert_records(&db, 2, 10);
    let om = db.engine.object_manager();
    let size = db.engine.buffer_pool.current_size();
    let mut list = DeallocList::new();

    let result = om.destroy_object(&ObjectId::default(), &oids[0], &mut list);
    assert!(matches!(result, Err(OmError::BadCatalogObject)));
    assert!(result.unwrap_err().is_caller_error());

    let result = om.destroy_object(&db.cat, &ObjectId::default(), &mut list);
    assert!(matches!(result, Err(OmError::BadObjectId)));

    assert_eq!(db.engine.buffer_pool.fixed_count(), 0);
    assert_eq!(db.engine.buffer_pool.current_size(), size);
    assert!(list.is_empty());
    assert_eq!(om.read_object(&oids[0], 0, None).unwrap(), vec![0u8; 10]);
}

#[test]
fn exhausted_pool_releases_pages() {
    let db = setup_db(16);
    let oids = insert_records(&db, 4, RECORD);
    let mut list = DeallocList::with_pool_capacity(1);
    list.push(DeallocElem::Page(PageId::new(1, 99))).unwrap();

    let result = db.engine.object_manager().destroy_object(&db.cat, &oids[3], &mut list);
    assert!(matches!(result, Err(OmError::PoolExhausted)));
    assert!(!result.unwrap_err().is_caller_error());
    assert_eq!(db.engine.buffer_pool.fixed_count(), 0);
    assert_eq!(list.len(), 1);
}

#[test]
fn unfixable_page_propagates() {
    let db = setup_db(16);
    insert_records(&db, 1, 10);
    let missing = ObjectId::new(PageId::new(1, 500), 0, 0);

    let result = db.engine.object_manager().destroy_object(&db.cat, &missing, &mut DeallocList::new());
    assert!(matches!(result, Err(OmError::PageNotFound(_))));
    assert_eq!(db.engine.buffer_pool.fixed_count(), 0);
}

#[test]
fn destroy_touches_only_its_page_and_list_neighbours() {
    let mut db = setup_db(32);
    let oids = insert_records(&db, 36, RECORD);
    let other = db.engine.create_file("other").unwrap();
    let om = db.engine.object_manager();
    for i in 0..9u16 {
        om.create_object(&other, None, i, &[7u8; RECORD]).unwrap();
    }

    let target = oids[16];
    let (chain_prev, chain_next, space_prev, space_next) = {
        let guard = db.page(target.page_no);
        let page = guard.read();
        (page.prev_page(), page.next_page(), page.space_prev(), page.space_next())
    };
    let other_entry = om.catalog_entry(&other).unwrap();
    let pages: Vec<u32> = chain(&db, &db.cat).into_iter().chain(chain(&db, &other)).collect();
    let before: HashMap<u32, _> = pages.iter().map(|&p| (p, db.page(p).read().serialize())).collect();

    let mut list = DeallocList::new();
    om.destroy_object(&db.cat, &target, &mut list).unwrap();
    assert!(list.is_empty());

    let mut touched: HashSet<u32> = [Some(target.page_no), chain_prev, chain_next, space_prev, space_next]
        .into_iter()
        .flatten()
        .collect();
    touched.extend(db.page(target.page_no).read().space_next());
    let mut compared = 0;
    for &page_no in &pages {
        if touched.contains(&page_no) {
            continue;
        }
        assert!(db.page(page_no).read().serialize() == before[&page_no], "page {page_no} changed");
        compared += 1;
    }
    assert!(compared >= 9);
    assert_eq!(om.catalog_entry(&other).unwrap(), other_entry);
}

#[test]
fn fifo_churn_reuses_slots() {
    let db = setup_db(16);
    let om = db.engine.object_manager();
    let mut live: VecDeque<ObjectId> = insert_records(&db, 3, 4).into();
    let page_no = live[0].page_no;
    let mut list = DeallocList::new();

    for i in 0..2000u16 {
        let oldest = live.pop_front().unwrap();
        om.destroy_object(&db.cat, &oldest, &mut list).unwrap();
        live.push_back(om.create_object(&db.cat, None, i, &[1u8; 4]).unwrap());
    }

    assert!(list.is_empty());
    assert_eq!(chain(&db, &db.cat), vec![page_no]);
    assert!(live.iter().all(|oid| oid.page_no == page_no));
    assert!(accounting(&db, page_no).0 <= 3);
    for oid in &live {
        assert_eq!(om.read_object(oid, 0, None).unwrap(), vec![1u8; 4]);
    }
}
