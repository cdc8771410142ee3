/// Player inventory: a fixed number of slots, one of them selected.
/// Keys and potions stack inside a single slot; every sword takes its own.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Item {
    Sword,
    Key,
    HealingPotion,
}

impl Item {
    pub fn is_stackable(self) -> bool {
        matches!(self, Item::Key | Item::HealingPotion)
    }

    pub fn name(self) -> &'static str {
        match self {
            Item::Sword => "Sword",
            Item::Key => "Key",
            Item::HealingPotion => "Potion",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ItemStack {
    pub item: Item,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: Item, count: u32) -> Self {
        ItemStack { item, count }
    }
}

#[derive(Clone, Debug)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    selected: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Inventory { slots: vec![None; capacity.max(1)], selected: 0 }
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<Item> {
        self.slots[self.selected].map(|s| s.item)
    }

    /// Move selection to the next slot, wrapping around.
    pub fn cycle(&mut self) {
        self.selected = (self.selected + 1) % self.slots.len();
    }

    /// Add `count` items. Returns how many did not fit.
    pub fn add(&mut self, item: Item, count: u32) -> u32 {
        if count == 0 { return 0; }

        if item.is_stackable() {
            if let Some(stack) = self.slots.iter_mut().flatten().find(|s| s.item == item) {
                stack.count += count;
                return 0;
            }
            return match self.slots.iter_mut().find(|s| s.is_none()) {
                Some(slot) => {
                    *slot = Some(ItemStack::new(item, count));
                    0
                }
                None => count,
            };
        }

        let mut left = count;
        for slot in self.slots.iter_mut().filter(|s| s.is_none()) {
            if left == 0 { break; }
            *slot = Some(ItemStack::new(item, 1));
            left -= 1;
        }
        left
    }

    /// Remove one item from the selected slot, emptying it when the stack runs out.
    pub fn consume_selected(&mut self) -> Option<Item> {
        let slot = &mut self.slots[self.selected];
        let stack = slot.as_mut()?;
        let item = stack.item;
        stack.count -= 1;
        if stack.count == 0 {
            *slot = None;
        }
        Some(item)
    }

    pub fn count_of(&self, item: Item) -> u32 {
        self.slots.iter().flatten().filter(|s| s.item == item).map(|s| s.count).sum()
    }
}
