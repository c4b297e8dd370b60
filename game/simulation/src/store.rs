use ahash::AHashMap;

use crate::entity::{Entity, EntityId, KindBuckets};
use crate::kind::Kind;

enum SlotState {
    Occupied(u32),
    Free(Option<u32>),
}

struct Slot {
    generation: u32,
    state: SlotState,
}

/// The entity arena: a dense `things` vector plus per-kind buckets, each entity carrying its own
/// back-indices into both. Deletion is swap-and-pop on both lists; a secondary indirection
/// table of generational slots gives callers a stable [`EntityId`] handle that survives the swap.
/// The grid and kind buckets hold these handles rather than owning pointers, so entities can be
/// referenced from multiple places without aliasing.
pub struct EntityStore {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    things: Vec<Entity>,
    by_kind: KindBuckets,
    recycle_pool: AHashMap<Kind, Vec<Entity>>,

    agents: Vec<Option<EntityId>>,
    terminated: Vec<bool>,
}

impl EntityStore {
    pub fn new(max_agents: u32) -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            things: Vec::new(),
            by_kind: AHashMap::default(),
            recycle_pool: AHashMap::default(),
            agents: vec![None; max_agents as usize],
            terminated: vec![false; max_agents as usize],
        }
    }

    /// Inserts `entity`, assigning `thingsIndex`/`kindListIndex` and a fresh (or recycled)
    /// generational handle. Mirrors the entities' dense `agents[MaxAgents]` mirror for agent
    /// kinds.
    pub fn add(&mut self, mut entity: Entity) -> EntityId {
        let slot_index = match self.free_head {
            Some(idx) => {
                let slot = &mut self.slots[idx as usize];
                self.free_head = match slot.state {
                    SlotState::Free(next) => next,
                    SlotState::Occupied(_) => unreachable!("free list pointed at occupied slot"),
                };
                slot.state = SlotState::Occupied(self.things.len() as u32);
                idx
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Occupied(self.things.len() as u32),
                });
                (self.slots.len() - 1) as u32
            }
        };

        let id = EntityId {
            index: slot_index,
            generation: self.slots[slot_index as usize].generation,
        };
        entity.id = id;
        entity.things_index = self.things.len() as u32;

        let bucket = self.by_kind.entry(entity.kind).or_default();
        entity.kind_list_index = bucket.len() as u32;
        bucket.push(id);

        if let Some(agent_id) = entity.agent_id {
            self.agents[agent_id as usize] = Some(id);
        }

        self.things.push(entity);
        id
    }

    /// Removes `id` via swap-and-pop on both `things` and its kind bucket, patching the
    /// displaced entities' back-indices. Recyclable kinds are parked in a free pool instead of
    /// being dropped; agents are never removed from the arena (`terminated` is set
    /// instead — see [`EntityStore::kill_agent`]).
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        if !self.is_valid(id) {
            return None;
        }
        let things_index = self.occupied_index(id)? as usize;

        let last = self.things.len() - 1;
        self.things.swap(things_index, last);
        let mut removed = self.things.pop().expect("checked non-empty above");

        if things_index < self.things.len() {
            let moved = &mut self.things[things_index];
            moved.things_index = things_index as u32;
            self.slots[moved.id.index as usize].state = SlotState::Occupied(things_index as u32);
        }

        self.remove_from_kind_bucket(removed.kind, removed.kind_list_index);

        let slot = &mut self.slots[id.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Free(self.free_head);
        self.free_head = Some(id.index);

        if removed.kind.is_recyclable() {
            removed.reset_for_recycle(crate::entity::DEAD_POS, None);
            self.recycle_pool.entry(removed.kind).or_default().push(removed.clone());
        }

        Some(removed)
    }

    fn remove_from_kind_bucket(&mut self, kind: Kind, index: u32) {
        let bucket = self
            .by_kind
            .get_mut(&kind)
            .expect("entity kind must have a bucket");
        let index = index as usize;
        let last = bucket.len() - 1;
        bucket.swap(index, last);
        bucket.pop();
        if index < bucket.len() {
            let moved_id = bucket[index];
            if let Some(e) = self.get_mut_by_slot(moved_id) {
                e.kind_list_index = index as u32;
            }
        }
    }

    fn get_mut_by_slot(&mut self, id: EntityId) -> Option<&mut Entity> {
        let idx = self.occupied_index(id)?;
        self.things.get_mut(idx as usize)
    }

    fn occupied_index(&self, id: EntityId) -> Option<u32> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match slot.state {
            SlotState::Occupied(idx) => Some(idx),
            SlotState::Free(_) => None,
        }
    }

    pub fn is_valid(&self, id: EntityId) -> bool {
        self.occupied_index(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let idx = self.occupied_index(id)?;
        self.things.get(idx as usize)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let idx = self.occupied_index(id)?;
        self.things.get_mut(idx as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.things.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.things.iter_mut()
    }

    pub fn of_kind(&self, kind: Kind) -> impl Iterator<Item = &Entity> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.get(*id))
    }

    pub fn kind_ids(&self, kind: Kind) -> &[EntityId] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.things.len()
    }

    pub fn is_empty(&self) -> bool {
        self.things.is_empty()
    }

    /// Pops a reset entity of `kind` from the recycle pool, if any is parked, for the caller to
    /// re-initialise and `add` again (avoids reconstructing static per-kind defaults from
    /// scratch).
    pub fn try_recycle(&mut self, kind: Kind) -> Option<Entity> {
        self.recycle_pool.get_mut(&kind).and_then(Vec::pop)
    }

    pub fn agent(&self, agent_id: u32) -> Option<&Entity> {
        self.agents
            .get(agent_id as usize)
            .copied()
            .flatten()
            .and_then(|id| self.get(id))
    }

    pub fn agent_mut(&mut self, agent_id: u32) -> Option<&mut Entity> {
        let id = self.agents.get(agent_id as usize).copied().flatten()?;
        self.get_mut(id)
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = u32> {
        0..self.agents.len() as u32
    }

    pub fn is_terminated(&self, agent_id: u32) -> bool {
        self.terminated.get(agent_id as usize).copied().unwrap_or(true)
    }

    /// Marks `agent_id` terminated without removing it from the arena: agents never leave the
    /// agent list. Respawn later clears the flag and moves `pos` off the
    /// sentinel.
    pub fn set_terminated(&mut self, agent_id: u32, terminated: bool) {
        if let Some(slot) = self.terminated.get_mut(agent_id as usize) {
            *slot = terminated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid::TilePos;

    #[test]
    fn add_then_remove_round_trips_cleanly() {
        let mut store = EntityStore::new(4);
        let a = store.add(Entity::new(Kind::Tree, TilePos::new(1, 1), 10));
        let b = store.add(Entity::new(Kind::Stone, TilePos::new(2, 2), 10));
        assert_eq!(store.len(), 2);

        store.remove(a);
        assert_eq!(store.len(), 1);
        assert!(!store.is_valid(a));
        assert!(store.is_valid(b));
        assert_eq!(store.get(b).unwrap().pos, TilePos::new(2, 2));
    }

    #[test]
    fn swap_pop_patches_displaced_back_indices() {
        let mut store = EntityStore::new(4);
        let a = store.add(Entity::new(Kind::Tree, TilePos::new(0, 0), 10));
        let _b = store.add(Entity::new(Kind::Tree, TilePos::new(1, 0), 10));
        let c = store.add(Entity::new(Kind::Tree, TilePos::new(2, 0), 10));

        store.remove(a);
        // c was the last entity and should have been swapped into a's old slot
        let c_entity = store.get(c).unwrap();
        assert_eq!(c_entity.things_index, 0);
        assert_eq!(c_entity.pos, TilePos::new(2, 0));
    }

    #[test]
    fn stale_handle_is_invalid_after_slot_reuse() {
        let mut store = EntityStore::new(4);
        let a = store.add(Entity::new(Kind::Wall, TilePos::new(0, 0), 10));
        store.remove(a);
        let _b = store.add(Entity::new(Kind::Wall, TilePos::new(1, 1), 10));
        assert!(!store.is_valid(a));
    }

    #[test]
    fn recyclable_kind_is_parked_for_reuse() {
        let mut store = EntityStore::new(4);
        let lantern = store.add(Entity::new(Kind::Lantern, TilePos::new(0, 0), 1));
        store.remove(lantern);
        let recycled = store.try_recycle(Kind::Lantern);
        assert!(recycled.is_some());
        assert!(store.try_recycle(Kind::Lantern).is_none());
    }

    #[test]
    fn non_recyclable_kind_is_not_parked() {
        let mut store = EntityStore::new(4);
        let tree = store.add(Entity::new(Kind::Tree, TilePos::new(0, 0), 10));
        store.remove(tree);
        assert!(store.try_recycle(Kind::Tree).is_none());
    }

    #[test]
    fn agent_mirror_tracks_by_agent_id() {
        let mut store = EntityStore::new(4);
        let mut e = Entity::new(Kind::Agent, TilePos::new(3, 3), 10);
        e.agent_id = Some(2);
        store.add(e);
        assert_eq!(store.agent(2).unwrap().pos, TilePos::new(3, 3));
        assert!(store.agent(0).is_none());
    }
}
