use std::collections::BTreeMap;

/// Identifies the values that end up in one emitted sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub base_name: String,
    pub socket: Option<u32>,
    /// Which repetition of the group, `sub_index / group_size`.
    pub group_number: u32,
}

/// Fixed-width value slots for one group. Unset slots stay `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedValues {
    slots: Vec<Option<i64>>,
}

impl GroupedValues {
    pub fn new(group_size: u32) -> Self {
        Self {
            slots: vec![None; group_size as usize],
        }
    }

    /// Store `value` at `slot`, overwriting any earlier value there.
    ///
    /// # Panics
    ///
    /// If `slot` is outside the group; decoded keys always yield
    /// `slot < group_size`.
    pub fn set(&mut self, slot: usize, value: i64) {
        assert!(
            slot < self.slots.len(),
            "slot {slot} outside group of {}",
            self.slots.len()
        );
        self.slots[slot] = Some(value);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn as_slice(&self) -> &[Option<i64>] {
        &self.slots
    }

    pub fn into_values(self) -> Vec<Option<i64>> {
        self.slots
    }
}

/// Accumulates the values of one record, keyed by [`GroupKey`].
///
/// Rebuilt for every record; iteration order is the key order.
#[derive(Debug, Default)]
pub struct Grouper {
    groups: BTreeMap<GroupKey, GroupedValues>,
}

impl Grouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to its group, creating the group with `group_size` slots.
    pub fn insert(&mut self, key: GroupKey, group_size: u32, slot: usize, value: i64) {
        self.groups
            .entry(key)
            .or_insert_with(|| GroupedValues::new(group_size))
            .set(slot, value);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_groups(self) -> impl Iterator<Item = (GroupKey, GroupedValues)> {
        self.groups.into_iter()
    }
}
