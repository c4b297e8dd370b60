use serde::Deserialize;

/// Every gameplay constant the core reads, grouped into one section per subsystem. Loaded from a
/// RON file via [`crate::load::load_file`], or used as [`SimConfig::default`] when no file is
/// supplied.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub map: Map,
    pub teams: Teams,
    pub observation: Observation,
    pub economy: Economy,
    pub combat: Combat,
    pub rewards: Rewards,
    pub tints: Tints,
    pub controller: Controller,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Map {
    pub width: i32,
    pub height: i32,
    /// Thickness of the wall-only border surrounding the playable rectangle.
    pub border: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Teams {
    pub team_count: u32,
    pub agents_per_team: u32,
    /// Population cap per team before respawn stops queuing.
    pub population_cap: u32,
}

impl Teams {
    pub fn max_agents(&self) -> u32 {
        self.team_count * self.agents_per_team
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Observation {
    pub radius: i32,
}

impl Observation {
    pub fn window_side(&self) -> i32 {
        self.radius * 2 + 1
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Economy {
    /// Max units transferred from a resource node's inventory in one `Use`.
    pub carry_cap: u32,
    /// Global per-entity inventory cap (sum of all item counts).
    pub max_inventory: u32,
    pub altar_hearts_target: u32,
    pub lantern_min_spacing: i32,
    pub divider_door_spacing: i32,
    /// HP/constructed progress a building gains per tick of the construction sub-phase.
    pub construction_progress_per_tick: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Combat {
    pub default_max_hp: u32,
    pub default_attack_damage: u32,
    pub man_at_arms_aura_radius: i32,
    pub knight_aura_radius: i32,
    pub siege_structure_multiplier: f32,
    pub siege_engineers_bonus: f32,
    pub masonry_reduction_per_tier: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub dropoff_per_unit: f32,
    pub tumor_kill: f32,
    pub death: f32,
    pub victory: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tints {
    pub heal_ticks: u32,
    pub death_ticks: u32,
    pub frozen_ticks: u32,
    pub attack_ticks: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Controller {
    pub spiral_max_arcs: u32,
    pub oscillation_ring_size: usize,
    pub stuck_window_builder: usize,
    pub stuck_window_other: usize,
    pub stuck_distinct_threshold: usize,
    pub escape_ticks: u32,
    pub move_blacklist_ticks: u32,
    pub build_lock_ticks: u32,
    pub astar_node_cap: u32,
    pub population_buffer: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            map: Map::default(),
            teams: Teams::default(),
            observation: Observation::default(),
            economy: Economy::default(),
            combat: Combat::default(),
            rewards: Rewards::default(),
            tints: Tints::default(),
            controller: Controller::default(),
        }
    }
}

impl Default for Map {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            border: 2,
        }
    }
}

impl Default for Teams {
    fn default() -> Self {
        Self {
            team_count: 2,
            agents_per_team: 6,
            population_cap: 6,
        }
    }
}

impl Default for Observation {
    fn default() -> Self {
        Self { radius: 5 }
    }
}

impl Default for Economy {
    fn default() -> Self {
        Self {
            carry_cap: 5,
            max_inventory: 20,
            altar_hearts_target: 10,
            lantern_min_spacing: 3,
            divider_door_spacing: 4,
            construction_progress_per_tick: 5,
        }
    }
}

impl Default for Combat {
    fn default() -> Self {
        Self {
            default_max_hp: 10,
            default_attack_damage: 2,
            man_at_arms_aura_radius: 1,
            knight_aura_radius: 2,
            siege_structure_multiplier: 3.0,
            siege_engineers_bonus: 1.2,
            masonry_reduction_per_tier: 1,
        }
    }
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            dropoff_per_unit: 0.1,
            tumor_kill: 1.0,
            death: -1.0,
            victory: 10.0,
        }
    }
}

impl Default for Tints {
    fn default() -> Self {
        Self {
            heal_ticks: 2,
            death_ticks: 3,
            frozen_ticks: 5,
            attack_ticks: 1,
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            spiral_max_arcs: 100,
            oscillation_ring_size: 12,
            stuck_window_builder: 6,
            stuck_window_other: 10,
            stuck_distinct_threshold: 2,
            escape_ticks: 10,
            move_blacklist_ticks: 4,
            build_lock_ticks: 8,
            astar_node_cap: 250,
            population_buffer: 1,
        }
    }
}
