use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Anything a `PriorityQueue` can order and look up by id. Mirrors
/// `internal/queue/queue.go`'s `PriorityItem` interface.
pub trait PriorityItem: Clone {
    fn id(&self) -> &str;
    fn priority(&self) -> i32;
    fn enqueued_at(&self) -> i64;
}

struct HeapEntry<T: PriorityItem> {
    item: T,
}

impl<T: PriorityItem> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.item.priority() == other.item.priority()
            && self.item.enqueued_at() == other.item.enqueued_at()
    }
}
impl<T: PriorityItem> Eq for HeapEntry<T> {}

impl<T: PriorityItem> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: PriorityItem> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first; on a tie, earlier enqueue time first.
        // BinaryHeap is a max-heap, so reverse the enqueued_at comparison
        // to make "earlier" compare as "greater".
        self.item
            .priority()
            .cmp(&other.item.priority())
            .then_with(|| other.item.enqueued_at().cmp(&self.item.enqueued_at()))
    }
}

/// Binary max-heap keyed by (priority desc, enqueued_at asc), with an
/// id index so `remove`/`contains` don't need a linear scan. Grounded on
/// `internal/queue/queue.go`'s generic `PriorityQueue[T]`.
pub struct PriorityQueue<T: PriorityItem> {
    heap: BinaryHeap<HeapEntry<T>>,
    index: HashMap<String, ()>,
}

impl<T: PriorityItem> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self { heap: BinaryHeap::new(), index: HashMap::new() }
    }
}

impl<T: PriorityItem> PriorityQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        self.index.insert(item.id().to_string(), ());
        self.heap.push(HeapEntry { item });
    }

    pub fn pop(&mut self) -> Option<T> {
        loop {
            let entry = self.heap.pop()?;
            if self.index.remove(entry.item.id()).is_some() {
                return Some(entry.item);
            }
            // id was removed via `remove()` after being pushed; skip it.
        }
    }

    /// Marks `id` as removed. The corresponding heap entry is dropped
    /// lazily the next time it would be popped, avoiding an O(n) heap
    /// rebuild on every removal.
    pub fn remove(&mut self, id: &str) -> bool {
        self.index.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn list(&self) -> Vec<T> {
        self.heap
            .iter()
            .filter(|e| self.index.contains_key(e.item.id()))
            .map(|e| e.item.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: String,
        priority: i32,
        enqueued_at: i64,
    }

    impl PriorityItem for Item {
        fn id(&self) -> &str {
            &self.id
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn enqueued_at(&self) -> i64 {
            self.enqueued_at
        }
    }

    #[test]
    fn pops_highest_priority_first() {
        let mut q = PriorityQueue::new();
        q.push(Item { id: "a".into(), priority: 1, enqueued_at: 0 });
        q.push(Item { id: "b".into(), priority: 9, enqueued_at: 1 });
        q.push(Item { id: "c".into(), priority: 5, enqueued_at: 2 });

        assert_eq!(q.pop().unwrap().id, "b");
        assert_eq!(q.pop().unwrap().id, "c");
        assert_eq!(q.pop().unwrap().id, "a");
        assert!(q.pop().is_none());
    }

    #[test]
    fn ties_break_on_enqueue_order() {
        let mut q = PriorityQueue::new();
        q.push(Item { id: "first".into(), priority: 5, enqueued_at: 10 });
        q.push(Item { id: "second".into(), priority: 5, enqueued_at: 20 });

        assert_eq!(q.pop().unwrap().id, "first");
        assert_eq!(q.pop().unwrap().id, "second");
    }

    #[test]
    fn remove_skips_item_on_pop() {
        let mut q = PriorityQueue::new();
        q.push(Item { id: "a".into(), priority: 1, enqueued_at: 0 });
        q.push(Item { id: "b".into(), priority: 2, enqueued_at: 1 });
        assert!(q.remove("b"));
        assert!(!q.contains("b"));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().unwrap().id, "a");
    }

    #[test]
    fn list_reflects_only_live_items() {
        let mut q = PriorityQueue::new();
        q.push(Item { id: "a".into(), priority: 1, enqueued_at: 0 });
        q.push(Item { id: "b".into(), priority: 2, enqueued_at: 1 });
        q.remove("b");
        let items: Vec<String> = q.list().into_iter().map(|i| i.id).collect();
        assert_eq!(items, vec!["a".to_string()]);
    }
}
