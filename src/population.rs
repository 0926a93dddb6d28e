//! Generational controller: simulate every agent in lockstep until all are
//! dead, rank by fitness, keep the best, breed the rest.

use log::{debug, info};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{Config, GameConfig};
use crate::context::SimContext;
use crate::error::Result;
use crate::game::Agent;

/// One record per finished generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: u32,
    pub best_fitness: i64,
    pub average_fitness: i64,
    /// Score of the agent with the best fitness
    pub best_score: u32,
    /// Highest score reached by any agent this generation
    pub highest_score: u32,
}

/// Size of the top-decile pool: every rank below a tenth of the population.
pub fn top_decile_len(population: usize) -> usize {
    population.div_ceil(10)
}

/// Fitness-proportionate pick over a ranked list, bounded by the top-decile
/// sum. Falls back to a uniform pick among the top decile when the walk
/// never passes the draw.
pub fn select_parent<R: Rng + ?Sized>(ranked_fitness: &[i64], top_decile_fitness: i64, rng: &mut R) -> usize {
    let draw = rng.r#gen::<f64>() * top_decile_fitness as f64;
    let mut sum = 0i64;
    for (i, &f) in ranked_fitness.iter().enumerate() {
        sum += f;
        if sum as f64 > draw {
            return i;
        }
    }
    let pool = (ranked_fitness.len() / 10).max(1);
    rng.gen_range(0..pool)
}

pub struct Population {
    rules: GameConfig,
    mutation_rate: f32,
    parallel: bool,
    ctx: SimContext,
    agents: Vec<Agent>,
    generation: u32,
    remaining: usize,
    running: bool,
    aborted: bool,
    ranked: Vec<usize>,
    top_decile_fitness: i64,
    stats: Vec<GenerationStats>,
    best: Option<Agent>,
}

impl Population {
    /// Validates `config` and spawns the first generation from a context
    /// seeded with the configured master seed.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config, SimContext::new(config.population.master_seed))
    }

    pub fn new(config: &Config, mut ctx: SimContext) -> Result<Self> {
        config.validate()?;
        let size = config.population.size;
        let topology = config.network.topology();
        let mut agents = Vec::with_capacity(size);
        for _ in 0..size {
            agents.push(Agent::new(config.population.agent_seed, topology, config.game, &mut ctx)?);
        }
        Ok(Self {
            rules: config.game,
            mutation_rate: config.population.mutation_rate,
            parallel: config.population.parallel,
            ctx,
            agents,
            generation: 0,
            remaining: size,
            running: false,
            aborted: false,
            ranked: Vec::new(),
            top_decile_fitness: 0,
            stats: Vec::new(),
            best: None,
        })
    }

    pub fn size(&self) -> usize { self.agents.len() }
    pub fn generation(&self) -> u32 { self.generation }
    pub fn agents_remaining(&self) -> usize { self.remaining }
    pub fn is_running(&self) -> bool { self.running }
    pub fn stats(&self) -> &[GenerationStats] { &self.stats }
    pub fn high_score(&self) -> u32 { self.ctx.high_score() }
    pub fn context(&self) -> &SimContext { &self.ctx }
    pub fn agents(&self) -> &[Agent] { &self.agents }
    pub fn rules(&self) -> &GameConfig { &self.rules }

    /// Fraction of the in-flight generation already dead.
    pub fn progress(&self) -> f32 {
        let n = self.agents.len();
        (n - self.remaining) as f32 / n as f32
    }

    /// Fresh copy of the last finished generation's fittest agent.
    pub fn best_agent_of_generation(&self) -> Option<Agent> {
        self.best.as_ref().map(Agent::fresh_clone)
    }

    /// Breeds the next generation (after the first) and arms the lockstep
    /// loop. Does nothing while a generation is already in flight. After an
    /// aborted generation the same genomes are restarted from spawn.
    pub fn start_generation(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        if self.aborted {
            self.agents = self.agents.iter().map(Agent::fresh_clone).collect();
            self.aborted = false;
        } else if self.generation > 0 {
            self.breed()?;
        }
        self.remaining = self.agents.len();
        self.running = true;
        Ok(())
    }

    /// Advances every living agent by exactly one tick. Finalises the
    /// generation when the last agent dies. Returns agents still alive.
    ///
    /// An error aborts the generation. Agents already updated in the failed
    /// tick keep their progress; the next [`start_generation`] restarts them.
    ///
    /// [`start_generation`]: Population::start_generation
    pub fn step(&mut self) -> Result<usize> {
        if !self.running {
            return Ok(self.remaining);
        }
        let died = match self.tick() {
            Ok(died) => died,
            Err(e) => {
                self.abort();
                return Err(e);
            }
        };
        self.remaining -= died;
        if self.remaining == 0 {
            self.finish();
        }
        Ok(self.remaining)
    }

    /// Runs a whole generation to completion.
    pub fn run_generation(&mut self) -> Result<GenerationStats> {
        self.start_generation()?;
        while self.running {
            self.step()?;
        }
        let last = self.stats.len() - 1;
        Ok(self.stats[last])
    }

    pub fn export_stats<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(&self.stats)?)?;
        Ok(())
    }

    fn abort(&mut self) {
        self.running = false;
        self.aborted = true;
    }

    fn tick(&mut self) -> Result<usize> {
        if self.parallel {
            self.agents
                .par_iter_mut()
                .filter(|a| a.is_alive())
                .map(|a| a.update().map(|alive| usize::from(!alive)))
                .try_reduce(|| 0, |a, b| Ok(a + b))
        } else {
            let mut died = 0;
            for agent in self.agents.iter_mut().filter(|a| a.is_alive()) {
                if !agent.update()? {
                    died += 1;
                }
            }
            Ok(died)
        }
    }

    fn finish(&mut self) {
        let fitness: Vec<i64> = self.agents.iter().map(Agent::fitness).collect();
        let mut ranked: Vec<usize> = (0..self.agents.len()).collect();
        // stable: equal fitness keeps spawn order
        ranked.sort_by(|&a, &b| fitness[b].cmp(&fitness[a]));

        let best = ranked[0];
        let mut top_scorer = 0;
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.score() > self.agents[top_scorer].score() {
                top_scorer = i;
            }
        }

        let total: i64 = fitness.iter().sum();
        let top = top_decile_len(ranked.len());
        self.top_decile_fitness = ranked[..top].iter().map(|&i| fitness[i]).sum();

        let record = GenerationStats {
            generation: self.generation + 1,
            best_fitness: fitness[best],
            average_fitness: total / self.agents.len() as i64,
            best_score: self.agents[best].score(),
            highest_score: self.agents[top_scorer].score(),
        };
        if self.ctx.record_score(record.highest_score) {
            info!("new high score {}", record.highest_score);
        }
        info!(
            "generation {}: best fitness {} avg {} score {} highest {}",
            record.generation, record.best_fitness, record.average_fitness, record.best_score, record.highest_score
        );

        self.stats.push(record);
        self.best = Some(self.agents[best].fresh_clone());
        self.ranked = ranked;
        self.generation += 1;
        self.running = false;
    }

    fn breed(&mut self) -> Result<()> {
        let n = self.agents.len();
        let ranked_fitness: Vec<i64> = self.ranked.iter().map(|&i| self.agents[i].fitness()).collect();
        debug!(
            "breeding generation {} from top-decile fitness {}",
            self.generation + 1,
            self.top_decile_fitness
        );

        let mut next = Vec::with_capacity(n);
        next.push(self.agents[self.ranked[0]].fresh_clone());
        let rng = self.ctx.rng();
        for _ in 1..n {
            let a = select_parent(&ranked_fitness, self.top_decile_fitness, rng);
            let b = select_parent(&ranked_fitness, self.top_decile_fitness, rng);
            let mut child = self.agents[self.ranked[a]].create_child(&self.agents[self.ranked[b]], rng)?;
            child.mutate(self.mutation_rate, rng);
            next.push(child);
        }
        self.agents = next;
        Ok(())
    }
}
