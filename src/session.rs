//! Host-side driver. A front end calls [`Session::tick`] once per frame; the
//! session either advances the in-flight generation, plays back the last
//! generation's best agent, or launches the next generation.

use log::info;

use crate::config::{Config, SessionConfig};
use crate::error::Result;
use crate::game::{Agent, AgentSnapshot};
use crate::population::Population;

pub struct Session {
    population: Population,
    settings: SessionConfig,
    display_per_move: u32,
    display: Option<Agent>,
    auto_progress: bool,
    next_requested: bool,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_population(Population::from_config(config)?, config))
    }

    pub fn with_population(population: Population, config: &Config) -> Self {
        Self {
            population,
            settings: config.session.clone(),
            display_per_move: config.game.display_per_move,
            display: None,
            auto_progress: config.session.auto_progress,
            next_requested: false,
        }
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn auto_progress(&self) -> bool {
        self.auto_progress
    }

    pub fn toggle_auto_progress(&mut self) {
        self.auto_progress = !self.auto_progress;
    }

    /// Launch the next generation on the next idle tick.
    pub fn request_next_generation(&mut self) {
        self.next_requested = true;
    }

    pub fn display_snapshot(&self) -> Option<AgentSnapshot> {
        self.display.as_ref().map(Agent::snapshot)
    }

    pub fn tick(&mut self) -> Result<()> {
        if self.population.is_running() {
            for _ in 0..self.settings.population_steps_per_tick.max(1) {
                if self.population.step()? == 0 {
                    self.adopt_best();
                    break;
                }
            }
            return Ok(());
        }

        if let Some(display) = self.display.as_mut() {
            if display.is_alive() {
                display.update()?;
            }
        }

        let display_dead = self.display.as_ref().is_some_and(|d| !d.is_alive());
        if display_dead || self.next_requested || self.should_skip_ahead() {
            self.next_requested = false;
            info!("launching generation {}", self.population.generation() + 1);
            self.population.start_generation()?;
        }
        Ok(())
    }

    /// Auto progress skips the playback once the best fitness has stopped
    /// moving between the last two generations.
    fn should_skip_ahead(&self) -> bool {
        if !self.auto_progress {
            return false;
        }
        let Some(display) = self.display.as_ref() else {
            return true;
        };
        let stats = self.population.stats();
        display.lifetime() > self.settings.plateau_min_lifetime
            && stats.len() > 2
            && stats[stats.len() - 1].best_fitness == stats[stats.len() - 2].best_fitness
    }

    fn adopt_best(&mut self) {
        let per_move = self.display_per_move;
        self.display = self.population.best_agent_of_generation().map(|mut best| {
            best.set_per_move(per_move);
            best
        });
    }
}
