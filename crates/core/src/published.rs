//! Observable values with replace-on-publish delivery.
//!
//! A [`Published`] holds only the current value. Publishing overwrites any
//! value a subscriber has not looked at yet; nothing is queued.

use tokio::sync::watch;

/// Latest-value cell with any number of independent subscribers.
#[derive(Debug)]
pub struct Published<T> {
    tx: watch::Sender<T>,
}

impl<T> Published<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the current value and wake every subscriber.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Modify the current value in place and wake every subscriber.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// Subscribe to future values. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Run `f` against the current value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> Published<T> {
    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_latest() {
        let value = Published::new(1);
        value.publish(2);
        value.publish(3);
        assert_eq!(value.get(), 3);
    }

    #[tokio::test]
    async fn test_unconsumed_values_are_replaced() {
        let value = Published::new(0);
        let mut rx = value.subscribe();

        value.publish(1);
        value.publish(2);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_independent_subscribers() {
        let value = Published::new(String::from("a"));
        let mut first = value.subscribe();
        let mut second = value.subscribe();
        assert_eq!(value.subscriber_count(), 2);

        value.update(|s| s.push('b'));

        first.changed().await.unwrap();
        assert_eq!(first.borrow_and_update().as_str(), "ab");
        second.changed().await.unwrap();
        assert_eq!(second.borrow_and_update().as_str(), "ab");
    }
}
