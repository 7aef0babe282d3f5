//! Ordered, id-keyed lists edited by the wizard.

/// Anything stored in a [`TargetList`].
pub trait Keyed {
    fn id(&self) -> u32;
}

/// An ordered list that always holds at least one element.
///
/// New elements get `max(id) + 1`; removing the last remaining element is
/// refused rather than leaving the list empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetList<T> {
    items: Vec<T>,
}

impl<T: Keyed> TargetList<T> {
    pub fn new(first: T) -> Self {
        Self { items: vec![first] }
    }

    /// Build from an existing list. Returns `None` when `items` is empty.
    pub fn from_vec(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self { items })
        }
    }

    pub fn next_id(&self) -> u32 {
        self.items.iter().map(Keyed::id).max().unwrap_or(0) + 1
    }

    /// Append the element built for the next free id and return that id.
    pub fn push_next(&mut self, build: impl FnOnce(u32) -> T) -> u32 {
        let id = self.next_id();
        self.items.push(build(id));
        id
    }

    /// Remove by id. No-op (returns `false`) for unknown ids or when it
    /// would empty the list.
    pub fn remove(&mut self, id: u32) -> bool {
        if self.items.len() <= 1 {
            return false;
        }
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        self.items.len() != before
    }

    pub fn update(&mut self, id: u32, change: impl FnOnce(&mut T)) -> bool {
        match self.items.iter_mut().find(|item| item.id() == id) {
            Some(item) => {
                change(item);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<TargetList<T>> for Vec<T> {
    fn from(list: TargetList<T>) -> Self {
        list.items
    }
}
