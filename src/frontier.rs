//! The BFS frontier: a growable ring buffer of actor codes, queried strictly
//! FIFO. Capacity starts large (real co-starring graphs produce frontiers in
//! the hundreds of thousands) and doubles on overflow.

const INITIAL_CAPACITY: usize = 250_000;

/// FIFO queue of `i32` codes, backed by a `Vec` used as a ring. Grows by
/// doubling; growth re-linearizes the buffer (wrapped entries are copied
/// into the freshly allocated tail) so `head` can simply reset to 0.
pub struct Frontier {
    items: Vec<i32>,
    head: usize,
    len: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            items: vec![0; INITIAL_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn enqueue(&mut self, code: i32) {
        if self.len == self.items.len() {
            self.grow();
        }
        let idx = (self.head + self.len) % self.items.len();
        self.items[idx] = code;
        self.len += 1;
    }

    pub fn dequeue(&mut self) -> i32 {
        debug_assert!(!self.is_empty(), "dequeue on empty frontier");
        let code = self.items[self.head];
        self.head = (self.head + 1) % self.items.len();
        self.len -= 1;
        code
    }

    fn grow(&mut self) {
        let old_capacity = self.items.len();
        let new_capacity = old_capacity * 2;
        let mut new_items = vec![0; new_capacity];

        // Re-linearize: copy the occupied run starting at `head`, wrapping
        // through the end of the old buffer, into the start of the new one.
        for i in 0..self.len {
            new_items[i] = self.items[(self.head + i) % old_capacity];
        }

        log::debug!("BFS frontier resized to capacity {new_capacity}");
        self.items = new_items;
        self.head = 0;
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_is_preserved() {
        let mut q = Frontier::new();
        for i in 0..10 {
            q.enqueue(i);
        }
        for i in 0..10 {
            assert_eq!(q.dequeue(), i);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn grows_and_relinearizes_across_wraparound() {
        // Use a small store of operations to force wraparound before growth
        // by interleaving enqueue/dequeue, then overflow the capacity.
        let mut q = Frontier::new();
        for i in 0..INITIAL_CAPACITY - 1 {
            q.enqueue(i as i32);
        }
        for i in 0..INITIAL_CAPACITY - 1 {
            assert_eq!(q.dequeue(), i as i32);
        }
        // head has now wrapped all the way around; fill past capacity.
        for i in 0..INITIAL_CAPACITY + 5 {
            q.enqueue(i as i32);
        }
        for i in 0..INITIAL_CAPACITY + 5 {
            assert_eq!(q.dequeue(), i as i32);
        }
        assert!(q.is_empty());
    }
}
