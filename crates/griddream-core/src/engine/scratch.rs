use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// A pool of interchangeable working buffers, handed out one per parallel worker.
///
/// Checked-out items return to the pool when their guard drops, so buffers are reused
/// across work items instead of being rebuilt for each one.
pub struct ScratchPool<T> {
    prototype: T,
    free: Mutex<Vec<T>>,
}

impl<T: Clone> ScratchPool<T> {
    pub fn new(prototype: T) -> Self {
        Self {
            prototype,
            free: Mutex::new(Vec::new()),
        }
    }

    pub fn checkout(&self) -> ScratchGuard<'_, T> {
        let reused = self
            .free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();
        ScratchGuard {
            pool: self,
            item: Some(reused.unwrap_or_else(|| self.prototype.clone())),
        }
    }

    /// Number of idle items waiting to be reused.
    pub fn available(&self) -> usize {
        self.free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn give_back(&self, item: T) {
        self.free
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(item);
    }
}

pub struct ScratchGuard<'a, T: Clone> {
    pool: &'a ScratchPool<T>,
    item: Option<T>,
}

impl<T: Clone> Deref for ScratchGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // `item` is only vacated in `drop`.
        self.item.as_ref().unwrap_or(&self.pool.prototype)
    }
}

impl<T: Clone> DerefMut for ScratchGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.get_or_insert_with(|| self.pool.prototype.clone())
    }
}

impl<T: Clone> Drop for ScratchGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.give_back(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_return_to_the_pool_on_drop() {
        let pool = ScratchPool::new(vec![0u8; 4]);
        assert_eq!(pool.available(), 0);
        {
            let mut a = pool.checkout();
            let _b = pool.checkout();
            a[0] = 7;
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn reused_items_keep_their_state() {
        let pool = ScratchPool::new(Vec::<u32>::new());
        pool.checkout().push(1);
        let guard = pool.checkout();
        assert_eq!(guard.as_slice(), &[1]);
        assert_eq!(pool.available(), 0);
    }
}
