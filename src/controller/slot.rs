//! Single-slot "latest result" handoff between asynchronous producers
//! (pose and segmentation callbacks) and the frame loop.
//!
//! A publish overwrites whatever is in the slot; the consumer sees only the
//! most recent value. Producers hold a weak handle, so results arriving
//! after the session is torn down are dropped silently.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Cell<T> = RefCell<Option<T>>;

pub fn latest_slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let cell = Rc::new(RefCell::new(None));
    (SlotSender { cell: Rc::downgrade(&cell) }, SlotReceiver { cell })
}

pub struct SlotSender<T> {
    cell: Weak<Cell<T>>,
}

impl<T> Clone for SlotSender<T> {
    fn clone(&self) -> Self {
        Self { cell: self.cell.clone() }
    }
}

impl<T> SlotSender<T> {
    /// Replace the slot's content; `false` once the receiver is gone
    pub fn publish(&self, value: T) -> bool {
        match self.cell.upgrade() {
            Some(cell) => {
                *cell.borrow_mut() = Some(value);
                true
            }
            None => false,
        }
    }

    /// Empty the slot, so the consumer falls back to "no result"
    pub fn clear(&self) -> bool {
        match self.cell.upgrade() {
            Some(cell) => {
                cell.borrow_mut().take();
                true
            }
            None => false,
        }
    }
}

pub struct SlotReceiver<T> {
    cell: Rc<Cell<T>>,
}

impl<T> SlotReceiver<T> {
    /// Consume the latest value
    pub fn take(&self) -> Option<T> {
        self.cell.borrow_mut().take()
    }

    pub fn clear(&self) {
        self.cell.borrow_mut().take();
    }
}

impl<T: Clone> SlotReceiver<T> {
    /// Read the latest value and leave it in place
    pub fn latest(&self) -> Option<T> {
        self.cell.borrow().clone()
    }
}
