//! Neuro-evolution of snake controllers.
//!
//! A population of fixed-topology networks plays snake on a square board.
//! Every generation is simulated in lockstep until all agents are dead; the
//! fittest agent is carried over unchanged and the rest of the next
//! generation is bred by 2-D matrix crossover and gaussian mutation.
//!
//! ```rust,no_run
//! use snake_neuroevo::{Config, Population};
//!
//! let mut config = Config::default();
//! config.population.size = 200;
//! let mut population = Population::from_config(&config).unwrap();
//! for _ in 0..10 {
//!     let stats = population.run_generation().unwrap();
//!     println!("gen {} best {}", stats.generation, stats.best_fitness);
//! }
//! ```

pub mod config;
pub mod context;
pub mod draw;
pub mod error;
pub mod game;
pub mod genome;
pub mod matrix;
pub mod nn;
pub mod population;
pub mod pos;
pub mod session;

pub use config::Config;
pub use context::SimContext;
pub use error::{EvoError, Result};
pub use game::{Agent, AgentSnapshot, fitness};
pub use genome::GenomeRecord;
pub use matrix::Matrix;
pub use nn::{NeuralNet, Topology};
pub use population::{GenerationStats, Population};
pub use session::Session;
