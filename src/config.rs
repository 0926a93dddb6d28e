//! Tunable constants for a training run. Defaults reproduce the classic
//! 25x25 setup; a JSON file may override any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EvoError, Result};
use crate::game::{ACTIONS, SENSES};
use crate::nn::Topology;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub population: PopulationConfig,
    pub network: NetworkConfig,
    pub game: GameConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Agents per generation
    pub size: usize,
    /// Per-cell mutation probability
    pub mutation_rate: f32,
    /// Seeds the master random stream
    pub master_seed: u64,
    /// Shared seed for every initial agent; `None` derives one per agent
    pub agent_seed: Option<u64>,
    /// Update agents of a tick on the rayon pool
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub inputs: usize,
    pub hidden_width: usize,
    pub hidden_layers: usize,
    pub outputs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub board_size: i32,
    pub initial_life: u32,
    /// Life budget granted per food eaten
    pub food_life_bonus: u32,
    /// Cap on the life budget after a bonus
    pub max_life: u32,
    /// Update calls per move while training
    pub training_per_move: u32,
    /// Update calls per move for the displayed agent
    pub display_per_move: u32,
    /// Lifetime beyond this no longer improves fitness
    pub lifetime_cap: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lockstep ticks advanced per host tick while a generation runs
    pub population_steps_per_tick: u32,
    pub auto_progress: bool,
    /// Minimum display lifetime before auto progress may skip ahead
    pub plateau_min_lifetime: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { size: 4000, mutation_rate: 0.05, master_seed: 1919, agent_seed: Some(1919), parallel: false }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { inputs: SENSES, hidden_width: 50, hidden_layers: 5, outputs: ACTIONS }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: 25,
            initial_life: 150,
            food_life_bonus: 100,
            max_life: 500,
            training_per_move: 1,
            display_per_move: 3,
            lifetime_cap: 600,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { population_steps_per_tick: 200, auto_progress: false, plateau_min_lifetime: 12 }
    }
}

impl NetworkConfig {
    pub fn topology(&self) -> Topology {
        Topology::new(self.inputs, self.hidden_width, self.outputs, self.hidden_layers)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.population;
        let n = &self.network;
        let g = &self.game;
        if p.size == 0 {
            return invalid("population size must be positive");
        }
        if !(0.0..=1.0).contains(&p.mutation_rate) {
            return invalid(format!("mutation rate {} outside [0, 1]", p.mutation_rate));
        }
        if n.inputs == 0 || n.hidden_width == 0 || n.outputs == 0 {
            return invalid("network dimensions must be positive");
        }
        if n.inputs != SENSES {
            return invalid(format!("network needs {SENSES} inputs, got {}", n.inputs));
        }
        if n.outputs != ACTIONS {
            return invalid(format!("network needs {ACTIONS} outputs, got {}", n.outputs));
        }
        if g.board_size < 5 {
            return invalid("board must be at least 5x5");
        }
        if g.initial_life == 0 || g.training_per_move == 0 || g.display_per_move == 0 {
            return invalid("life budget and move cadence must be positive");
        }
        if g.max_life < g.initial_life {
            return invalid("max life is below initial life");
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> Result<()> {
    Err(EvoError::Config(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = Config::default();
        c.population.size = 0;
        assert!(matches!(c.validate(), Err(EvoError::Config(_))));

        let mut c = Config::default();
        c.population.mutation_rate = 1.5;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.population.mutation_rate = f32::NAN;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.network.hidden_width = 0;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.network.inputs = 24;
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: Config = serde_json::from_str(r#"{"population":{"size":10}}"#).unwrap();
        assert_eq!(c.population.size, 10);
        assert_eq!(c.population.mutation_rate, 0.05);
        assert_eq!(c.game.board_size, 25);
    }
}
