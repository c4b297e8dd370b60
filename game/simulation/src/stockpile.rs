use strum::EnumIter;

use crate::inventory::ItemKey;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter)]
pub enum Resource {
    Food,
    Wood,
    Stone,
    Gold,
    Water,
}

/// Per-team resource counts. Dropoff adds; withdraw fails atomically if any line is short
/// (used for train/build cost payment).
#[derive(Clone, Debug, Default)]
pub struct Stockpile {
    counts: [u32; 5],
}

const RESOURCES: [Resource; 5] = [
    Resource::Food,
    Resource::Wood,
    Resource::Stone,
    Resource::Gold,
    Resource::Water,
];

fn index(r: Resource) -> usize {
    RESOURCES.iter().position(|&x| x == r).unwrap()
}

impl Stockpile {
    pub fn get(&self, r: Resource) -> u32 {
        self.counts[index(r)]
    }

    pub fn add(&mut self, r: Resource, amount: u32) {
        self.counts[index(r)] += amount;
    }

    /// Maps a dropoff-able inventory item key to the stockpile resource it aggregates into.
    /// Food aggregates Wheat/Bread/Fish/Plant/Meat.
    pub fn resource_for_item(key: ItemKey) -> Option<Resource> {
        match key {
            ItemKey::Wheat | ItemKey::Bread | ItemKey::Fish | ItemKey::Plant | ItemKey::Meat => {
                Some(Resource::Food)
            }
            ItemKey::Wood => Some(Resource::Wood),
            ItemKey::Stone => Some(Resource::Stone),
            ItemKey::Gold => Some(Resource::Gold),
            ItemKey::Water => Some(Resource::Water),
            _ => None,
        }
    }

    /// Atomically withdraws every line of `cost`; on any shortfall nothing is deducted.
    pub fn try_withdraw(&mut self, cost: &[(Resource, u32)]) -> bool {
        if cost.iter().any(|&(r, amount)| self.get(r) < amount) {
            return false;
        }
        for &(r, amount) in cost {
            self.counts[index(r)] -= amount;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdraw_fails_atomically_on_short_line() {
        let mut s = Stockpile::default();
        s.add(Resource::Wood, 5);
        s.add(Resource::Stone, 1);
        let paid = s.try_withdraw(&[(Resource::Wood, 5), (Resource::Stone, 10)]);
        assert!(!paid);
        // nothing should have been deducted
        assert_eq!(s.get(Resource::Wood), 5);
        assert_eq!(s.get(Resource::Stone), 1);
    }

    #[test]
    fn withdraw_succeeds_when_every_line_payable() {
        let mut s = Stockpile::default();
        s.add(Resource::Wood, 5);
        assert!(s.try_withdraw(&[(Resource::Wood, 5)]));
        assert_eq!(s.get(Resource::Wood), 0);
    }

    #[test]
    fn food_aggregates_multiple_item_keys() {
        assert_eq!(
            Stockpile::resource_for_item(ItemKey::Wheat),
            Some(Resource::Food)
        );
        assert_eq!(
            Stockpile::resource_for_item(ItemKey::Meat),
            Some(Resource::Food)
        );
        assert_eq!(Stockpile::resource_for_item(ItemKey::Armor), None);
    }
}
