/// Per-team research state the combat pipeline reads: blacksmith attack/armor tiers,
/// masonry/architecture (structure damage reduction) and the siege-engineers damage bonus. Kept
/// as flat opaque tier counters per category rather than a full tech tree.
#[derive(Clone, Debug, Default)]
pub struct TeamUpgrades {
    pub blacksmith_attack_tier: u32,
    pub blacksmith_armor_tier: u32,
    pub masonry_tier: u32,
    pub siege_engineers: bool,
}
