use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use snake_neuroevo::draw::{render_board, render_stats};
use snake_neuroevo::{Agent, Config, GenomeRecord, Population, Session};

#[derive(Parser)]
#[command(name = "snake-neuroevo")]
#[command(version)]
#[command(about = "Evolves snake-playing neural networks with a genetic algorithm")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train for a number of generations
    Train {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, default_value = "50")]
        generations: u32,

        /// Override the population size
        #[arg(short, long)]
        population: Option<usize>,

        /// Override the master seed
        #[arg(long)]
        seed: Option<u64>,

        /// Update agents on all cores
        #[arg(long)]
        parallel: bool,

        /// Write per-generation statistics as JSON
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Write the final best genome
        #[arg(long)]
        save_best: Option<PathBuf>,
    },

    /// Train while playing back each generation's best agent
    Watch {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, default_value = "20")]
        generations: u32,

        /// Pause between frames
        #[arg(long, default_value = "30")]
        delay_ms: u64,
    },

    /// Play one game with a saved genome
    Replay {
        #[arg(short, long)]
        genome: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "1")]
        per_move: u32,
    },

    /// Write the default configuration
    InitConfig {
        #[arg(short, long, default_value = "snake.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Train { config, generations, population, seed, parallel, stats, save_best } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(size) = population {
                config.population.size = size;
            }
            if let Some(seed) = seed {
                config.population.master_seed = seed;
            }
            config.population.parallel |= parallel;
            train(&config, generations, stats.as_deref(), save_best.as_deref())
        }
        Commands::Watch { config, generations, delay_ms } => {
            let config = load_config(config.as_deref())?;
            watch(&config, generations, Duration::from_millis(delay_ms))
        }
        Commands::Replay { genome, config, per_move } => {
            let config = load_config(config.as_deref())?;
            replay(&config, &genome, per_move)
        }
        Commands::InitConfig { output } => {
            Config::default().save(&output).with_context(|| format!("writing {}", output.display()))?;
            println!("wrote {}", output.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(p) => Config::load(p).with_context(|| format!("loading {}", p.display()))?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

fn train(config: &Config, generations: u32, stats: Option<&Path>, save_best: Option<&Path>) -> Result<()> {
    let mut population = Population::from_config(config)?;
    info!(
        "training {} agents for {} generations (seed {})",
        config.population.size, generations, config.population.master_seed
    );

    let started = Instant::now();
    for _ in 0..generations {
        population.run_generation()?;
    }
    info!("done in {:.1}s, high score {}", started.elapsed().as_secs_f32(), population.high_score());

    if let Some(path) = stats {
        population.export_stats(path).with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = save_best {
        if let Some(best) = population.best_agent_of_generation() {
            GenomeRecord::from_agent(&best).save(path).with_context(|| format!("writing {}", path.display()))?;
            info!("saved best genome to {}", path.display());
        }
    }
    Ok(())
}

fn watch(config: &Config, generations: u32, delay: Duration) -> Result<()> {
    let mut session = Session::new(config)?;
    if !session.auto_progress() {
        session.toggle_auto_progress();
    }

    loop {
        session.tick()?;
        let population = session.population();
        if population.is_running() {
            print!("\x1b[2J\x1b[H");
            println!(
                "generation {} progress {}/{} ({:.1}%)",
                population.generation() + 1,
                population.size() - population.agents_remaining(),
                population.size(),
                population.progress() * 100.0
            );
            continue;
        }
        if population.generation() >= generations {
            break;
        }
        if let Some(snap) = session.display_snapshot() {
            print!("\x1b[2J\x1b[H");
            for line in render_board(&snap, Some(population.high_score())) {
                println!("{line}");
            }
            for line in render_stats(population.stats()).into_iter().take(10) {
                println!("{line}");
            }
            thread::sleep(delay);
        }
    }
    Ok(())
}

fn replay(config: &Config, genome: &Path, per_move: u32) -> Result<()> {
    let record = GenomeRecord::load(genome).with_context(|| format!("reading {}", genome.display()))?;
    let mut agent = Agent::with_brain(record.seed, record.network, config.game)?;
    agent.set_per_move(per_move);
    while agent.update()? {}

    for line in render_board(&agent.snapshot(), None) {
        println!("{line}");
    }
    println!("fitness {}", agent.fitness());
    Ok(())
}
