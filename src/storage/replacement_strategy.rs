use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use crate::types::PageId;

pub trait ReplacementStrategy: Send + Sync {
    /// Record an access to a page
    fn update(&mut self, page_id: PageId);

    /// Forget a page dropped from the pool
    fn remove(&mut self, page_id: PageId);

    /// Eviction candidates, best victim first
    fn get_evict<'a>(&'a mut self) -> Box<dyn Iterator<Item = PageId> + 'a>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ReplacementStrategyType {
    LRU
}

pub fn replacement_strategy_factory(
    strategy_type: ReplacementStrategyType
) -> Box<dyn ReplacementStrategy + Send + Sync> {
    match strategy_type {
        ReplacementStrategyType::LRU => Box::new(LRUReplacementStrategy {
            map: LinkedHashMap::new()
        })
    }
}

/// LRU replacement strategy
pub struct LRUReplacementStrategy {
    map: LinkedHashMap<PageId, ()>,
}

impl ReplacementStrategy for LRUReplacementStrategy {
    fn update(&mut self, page_id: PageId) {
        self.map.remove(&page_id);
        self.map.insert(page_id, ());
    }

    fn remove(&mut self, page_id: PageId) {
        self.map.remove(&page_id);
    }

    fn get_evict<'a>(&'a mut self) -> Box<dyn Iterator<Item = PageId> + 'a> {
        Box::new(self.map.keys().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_order() {
        let mut lru = replacement_strategy_factory(ReplacementStrategyType::LRU);
        lru.update(PageId::new(1, 1));
        lru.update(PageId::new(1, 2));
        lru.update(PageId::new(1, 3));
        lru.update(PageId::new(1, 1));
        lru.remove(PageId::new(1, 3));

        let order: Vec<_> = lru.get_evict().map(|p| p.page_no).collect();
        assert_eq!(order, vec![2, 1]);
    }
}
