//! Signs, chests, and furnaces: structured data bound to one voxel.
//!
//! Tile entities are owned by the chunk containing their position and
//! round-trip through the chunk file's `TileEntities` list. Each record
//! carries an `id` discriminant (`"Sign"`, `"Chest"`, `"Furnace"`), its world
//! `x`/`y`/`z`, and type-specific fields. Inventories are stored sparsely:
//! only non-empty slots are written, each tagged with its `Slot` index.
//! Chests and furnaces placed by a player also carry a `Lockdata` compound
//! naming the owner and whether the container is locked to them.

use quartz_nbt::{NbtCompound, NbtList, NbtTag};

use crate::coords::BlockPos;

/// Number of slots in a chest.
pub const CHEST_SLOTS: usize = 27;

/// Number of slots in a furnace (input, fuel, output).
pub const FURNACE_SLOTS: usize = 3;

/// One inventory slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemSlot {
    pub count: i8,
    /// Damage or remaining health of the item.
    pub damage: i16,
    /// Item type, `-1` when empty.
    pub item: i16,
}

impl ItemSlot {
    /// The canonical empty slot.
    pub const EMPTY: ItemSlot = ItemSlot {
        count: 0,
        damage: 0,
        item: -1,
    };

    pub fn new(item: i16, count: i8, damage: i16) -> Self {
        Self {
            count,
            damage,
            item,
        }
    }

    /// A slot is empty when it has no items or no item type.
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.item == -1
    }
}

impl Default for ItemSlot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A sign with four lines of text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sign {
    pub pos: BlockPos,
    pub lines: [String; 4],
}

/// Ownership of a container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lock {
    /// Name of the player who placed the container.
    pub owner: String,
    pub locked: bool,
}

impl Lock {
    pub fn new(owner: impl Into<String>, locked: bool) -> Self {
        Self {
            owner: owner.into(),
            locked,
        }
    }

    /// Whether `player` may replace the container. An unlocked container
    /// admits anyone; a locked one only its owner.
    pub fn permits(&self, player: Option<&str>) -> bool {
        !self.locked || player == Some(self.owner.as_str())
    }

    fn to_nbt(&self) -> NbtCompound {
        let mut tag = NbtCompound::new();
        tag.insert("player", NbtTag::String(self.owner.clone()));
        tag.insert("locked", NbtTag::Byte(i8::from(self.locked)));
        tag
    }

    fn from_nbt(tag: &NbtCompound) -> Option<Self> {
        let lock = tag.get::<_, &NbtCompound>("Lockdata").ok()?;
        Some(Self {
            owner: lock.get::<_, &str>("player").ok()?.to_owned(),
            locked: lock.get::<_, i8>("locked").ok()? == 1,
        })
    }
}

/// A 27-slot chest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chest {
    pub pos: BlockPos,
    pub slots: [ItemSlot; CHEST_SLOTS],
    pub lock: Option<Lock>,
}

impl Chest {
    pub fn new(pos: BlockPos) -> Self {
        Self {
            pos,
            slots: [ItemSlot::EMPTY; CHEST_SLOTS],
            lock: None,
        }
    }
}

/// A furnace with its three slots and smelting timers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Furnace {
    pub pos: BlockPos,
    pub slots: [ItemSlot; FURNACE_SLOTS],
    pub burn_time: i16,
    pub cook_time: i16,
    pub lock: Option<Lock>,
}

impl Furnace {
    pub fn new(pos: BlockPos) -> Self {
        Self {
            pos,
            slots: [ItemSlot::EMPTY; FURNACE_SLOTS],
            burn_time: 0,
            cook_time: 0,
            lock: None,
        }
    }
}

/// Any tile entity a chunk can own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileEntity {
    Sign(Sign),
    Chest(Chest),
    Furnace(Furnace),
}

impl TileEntity {
    /// World position of the voxel this entity is bound to.
    pub fn pos(&self) -> BlockPos {
        match self {
            TileEntity::Sign(s) => s.pos,
            TileEntity::Chest(c) => c.pos,
            TileEntity::Furnace(f) => f.pos,
        }
    }

    /// The container's lock, if it has one. Signs never do.
    pub fn lock(&self) -> Option<&Lock> {
        match self {
            TileEntity::Sign(_) => None,
            TileEntity::Chest(c) => c.lock.as_ref(),
            TileEntity::Furnace(f) => f.lock.as_ref(),
        }
    }

    /// Mutable access to the lock slot of a chest or furnace; `None` for signs.
    pub fn lock_slot_mut(&mut self) -> Option<&mut Option<Lock>> {
        match self {
            TileEntity::Sign(_) => None,
            TileEntity::Chest(c) => Some(&mut c.lock),
            TileEntity::Furnace(f) => Some(&mut f.lock),
        }
    }

    /// The `id` discriminant written to disk.
    pub fn kind(&self) -> &'static str {
        match self {
            TileEntity::Sign(_) => "Sign",
            TileEntity::Chest(_) => "Chest",
            TileEntity::Furnace(_) => "Furnace",
        }
    }

    /// Encodes this entity as a `TileEntities` list element.
    pub fn to_nbt(&self) -> NbtCompound {
        let pos = self.pos();
        let mut tag = NbtCompound::new();
        tag.insert("id", NbtTag::String(self.kind().to_owned()));
        tag.insert("x", NbtTag::Int(pos.x));
        tag.insert("y", NbtTag::Int(pos.y));
        tag.insert("z", NbtTag::Int(pos.z));

        match self {
            TileEntity::Sign(sign) => {
                for (i, line) in sign.lines.iter().enumerate() {
                    tag.insert(format!("Text{}", i + 1), NbtTag::String(line.clone()));
                }
            }
            TileEntity::Chest(chest) => {
                tag.insert("Items", NbtTag::List(items_to_nbt(&chest.slots)));
            }
            TileEntity::Furnace(furnace) => {
                tag.insert("Items", NbtTag::List(items_to_nbt(&furnace.slots)));
                tag.insert("BurnTime", NbtTag::Short(furnace.burn_time));
                tag.insert("CookTime", NbtTag::Short(furnace.cook_time));
            }
        }
        if let Some(lock) = self.lock() {
            tag.insert("Lockdata", NbtTag::Compound(lock.to_nbt()));
        }
        tag
    }

    /// Decodes a `TileEntities` list element.
    ///
    /// Returns `None` for unknown discriminants and structurally invalid
    /// records; callers skip those rather than failing the whole chunk.
    pub fn from_nbt(tag: &NbtCompound) -> Option<TileEntity> {
        let kind = tag.get::<_, &str>("id").ok()?;
        let pos = BlockPos::new(
            tag.get::<_, i32>("x").ok()?,
            tag.get::<_, i32>("y").ok()?,
            tag.get::<_, i32>("z").ok()?,
        );

        match kind {
            "Sign" => {
                let mut sign = Sign {
                    pos,
                    ..Sign::default()
                };
                for (i, line) in sign.lines.iter_mut().enumerate() {
                    *line = tag.get::<_, &str>(&format!("Text{}", i + 1)).ok()?.to_owned();
                }
                Some(TileEntity::Sign(sign))
            }
            "Chest" => {
                let mut chest = Chest::new(pos);
                items_from_nbt(tag, &mut chest.slots)?;
                chest.lock = Lock::from_nbt(tag);
                Some(TileEntity::Chest(chest))
            }
            "Furnace" => {
                let mut furnace = Furnace::new(pos);
                items_from_nbt(tag, &mut furnace.slots)?;
                furnace.burn_time = tag.get::<_, i16>("BurnTime").ok()?;
                furnace.cook_time = tag.get::<_, i16>("CookTime").ok()?;
                furnace.lock = Lock::from_nbt(tag);
                Some(TileEntity::Furnace(furnace))
            }
            _ => None,
        }
    }
}

fn items_to_nbt(slots: &[ItemSlot]) -> NbtList {
    let items: Vec<NbtTag> = slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| !slot.is_empty())
        .map(|(i, slot)| {
            let mut item = NbtCompound::new();
            item.insert("Slot", NbtTag::Byte(i as i8));
            item.insert("Count", NbtTag::Byte(slot.count));
            item.insert("Damage", NbtTag::Short(slot.damage));
            item.insert("id", NbtTag::Short(slot.item));
            NbtTag::Compound(item)
        })
        .collect();
    NbtList::from(items)
}

/// Fills `slots` from the record's `Items` list. A missing or mistyped
/// list invalidates the record; a malformed item or an out-of-range slot
/// index only drops that item.
fn items_from_nbt(tag: &NbtCompound, slots: &mut [ItemSlot]) -> Option<()> {
    let items = tag.get::<_, &NbtList>("Items").ok()?;
    for entry in items.iter() {
        let NbtTag::Compound(item) = entry else {
            tracing::debug!("skipping non-compound inventory entry");
            continue;
        };
        let Some((index, decoded)) = item_from_nbt(item) else {
            tracing::debug!("skipping malformed inventory item");
            continue;
        };
        match slots.get_mut(index) {
            Some(slot) => *slot = decoded,
            None => tracing::debug!("skipping item in slot {index}, out of range"),
        }
    }
    Some(())
}

fn item_from_nbt(item: &NbtCompound) -> Option<(usize, ItemSlot)> {
    let index = usize::try_from(item.get::<_, i8>("Slot").ok()?).ok()?;
    let slot = ItemSlot {
        count: item.get::<_, i8>("Count").ok()?,
        damage: item.get::<_, i16>("Damage").ok()?,
        item: item.get::<_, i16>("id").ok()?,
    };
    Some((index, slot))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_round_trip() {
        let sign = TileEntity::Sign(Sign {
            pos: BlockPos::new(-5, 70, 12),
            lines: [
                "Welcome".to_owned(),
                String::new(),
                "to the".to_owned(),
                "quarry".to_owned(),
            ],
        });
        let decoded = TileEntity::from_nbt(&sign.to_nbt()).expect("valid sign");
        assert_eq!(decoded, sign);
    }

    #[test]
    fn test_empty_chest_slots_are_not_written() {
        let mut chest = Chest::new(BlockPos::new(1, 2, 3));
        chest.slots[4] = ItemSlot::new(264, 3, 0);
        chest.slots[9] = ItemSlot::new(5, 0, 0);
        chest.slots[10] = ItemSlot::new(-1, 12, 0);
        let tag = TileEntity::Chest(chest.clone()).to_nbt();

        let items = tag.get::<_, &NbtList>("Items").expect("items list");
        assert_eq!(items.len(), 1);

        let TileEntity::Chest(decoded) = TileEntity::from_nbt(&tag).expect("valid chest") else {
            panic!("expected a chest");
        };
        assert_eq!(decoded.slots[4], ItemSlot::new(264, 3, 0));
        assert!(decoded.slots[9].is_empty());
        assert_eq!(decoded.slots[9].count, 0);
        assert!(decoded.slots[10].is_empty());
    }

    #[test]
    fn test_furnace_round_trip() {
        let mut furnace = Furnace::new(BlockPos::new(0, 64, 0));
        furnace.slots[0] = ItemSlot::new(15, 8, 0);
        furnace.slots[1] = ItemSlot::new(263, 2, 0);
        furnace.burn_time = 120;
        furnace.cook_time = 45;
        let entity = TileEntity::Furnace(furnace);
        assert_eq!(TileEntity::from_nbt(&entity.to_nbt()), Some(entity));
    }

    fn raw_item(slot: i8, count: NbtTag, id: i16) -> NbtTag {
        let mut item = NbtCompound::new();
        item.insert("Slot", NbtTag::Byte(slot));
        item.insert("Count", count);
        item.insert("Damage", NbtTag::Short(0));
        item.insert("id", NbtTag::Short(id));
        NbtTag::Compound(item)
    }

    #[test]
    fn test_furnace_keeps_items_beside_out_of_range_slot() {
        let mut tag = TileEntity::Furnace(Furnace::new(BlockPos::new(0, 0, 0))).to_nbt();
        let items = vec![
            raw_item(3, NbtTag::Byte(1), 4),
            raw_item(1, NbtTag::Byte(2), 263),
        ];
        tag.insert("Items", NbtTag::List(NbtList::from(items)));

        let Some(TileEntity::Furnace(furnace)) = TileEntity::from_nbt(&tag) else {
            panic!("furnace dropped");
        };
        assert_eq!(furnace.slots[1], ItemSlot::new(263, 2, 0));
        assert!(furnace.slots[0].is_empty());
        assert!(furnace.slots[2].is_empty());
    }

    #[test]
    fn test_chest_keeps_valid_stacks_beside_malformed_item() {
        let mut chest = Chest::new(BlockPos::new(7, 65, -2));
        chest.slots[0] = ItemSlot::new(4, 64, 0);
        chest.slots[5] = ItemSlot::new(280, 3, 0);
        let mut tag = TileEntity::Chest(chest.clone()).to_nbt();

        let mut items: Vec<NbtTag> = tag
            .get::<_, &NbtList>("Items")
            .expect("items list")
            .iter()
            .cloned()
            .collect();
        items.push(raw_item(7, NbtTag::Int(1), 5));
        items.push(NbtTag::String("junk".to_owned()));
        items.push(raw_item(-1, NbtTag::Byte(1), 5));
        tag.insert("Items", NbtTag::List(NbtList::from(items)));

        assert_eq!(TileEntity::from_nbt(&tag), Some(TileEntity::Chest(chest)));
    }

    #[test]
    fn test_chest_without_items_list_is_rejected() {
        let mut tag = TileEntity::Chest(Chest::new(BlockPos::new(0, 0, 0))).to_nbt();
        tag.insert("Items", NbtTag::Int(0));
        assert!(TileEntity::from_nbt(&tag).is_none());
    }

    #[test]
    fn test_lock_round_trips_as_lockdata() {
        let mut chest = Chest::new(BlockPos::new(3, 70, 3));
        chest.lock = Some(Lock::new("notch", true));
        let entity = TileEntity::Chest(chest);
        let tag = entity.to_nbt();

        let lockdata = tag.get::<_, &NbtCompound>("Lockdata").expect("lockdata");
        assert_eq!(lockdata.get::<_, &str>("player").expect("player"), "notch");
        assert_eq!(lockdata.get::<_, i8>("locked").expect("locked"), 1);
        assert_eq!(TileEntity::from_nbt(&tag), Some(entity));

        let unlocked = TileEntity::Furnace(Furnace::new(BlockPos::new(0, 1, 0))).to_nbt();
        assert!(unlocked.get::<_, &NbtCompound>("Lockdata").is_err());
    }

    #[test]
    fn test_lock_permits_only_owner_when_locked() {
        let locked = Lock::new("alice", true);
        assert!(locked.permits(Some("alice")));
        assert!(!locked.permits(Some("bob")));
        assert!(!locked.permits(None));

        let open = Lock::new("alice", false);
        assert!(open.permits(Some("bob")));
        assert!(open.permits(None));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut tag = NbtCompound::new();
        tag.insert("id", NbtTag::String("MobSpawner".to_owned()));
        tag.insert("x", NbtTag::Int(0));
        tag.insert("y", NbtTag::Int(0));
        tag.insert("z", NbtTag::Int(0));
        assert!(TileEntity::from_nbt(&tag).is_none());
    }

    #[test]
    fn test_missing_coordinate_is_rejected() {
        let mut tag = TileEntity::Sign(Sign::default()).to_nbt();
        tag.insert("y", NbtTag::String("high".to_owned()));
        assert!(TileEntity::from_nbt(&tag).is_none());
    }
}
