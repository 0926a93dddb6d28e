//! End-to-end checks for the evolution engine.

use snake_neuroevo::{Agent, Config, GenerationStats, GenomeRecord, Population};

fn small_config() -> Config {
    let mut config = Config::default();
    config.population.size = 10;
    config.population.master_seed = 2024;
    config.network.hidden_width = 8;
    config.network.hidden_layers = 2;
    config
}

fn run(config: &Config, generations: usize) -> Vec<GenerationStats> {
    let mut population = Population::from_config(config).unwrap();
    for _ in 0..generations {
        population.run_generation().unwrap();
    }
    population.stats().to_vec()
}

#[test]
fn test_runs_are_reproducible() {
    let config = small_config();
    let first = run(&config, 3);
    let second = run(&config, 3);
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[test]
fn test_derived_agent_seeds_are_reproducible() {
    let mut config = small_config();
    config.population.agent_seed = None;
    assert_eq!(run(&config, 3), run(&config, 3));
}

#[test]
fn test_master_seed_changes_the_run() {
    let mut other = small_config();
    other.population.master_seed = 7;
    let a = Population::from_config(&small_config()).unwrap();
    let b = Population::from_config(&other).unwrap();
    assert_ne!(a.agents()[0].brain(), b.agents()[0].brain());
}

#[test]
fn test_population_size_is_constant() {
    let mut population = Population::from_config(&small_config()).unwrap();
    for generation in 1..=4 {
        let stats = population.run_generation().unwrap();
        assert_eq!(stats.generation, generation);
        assert_eq!(population.size(), 10);
    }
    assert_eq!(population.stats().len(), 4);
}

#[test]
fn test_elite_fitness_never_regresses() {
    // the elite replays its game exactly, so the best fitness cannot drop
    let stats = run(&small_config(), 5);
    for pair in stats.windows(2) {
        assert!(pair[1].best_fitness >= pair[0].best_fitness);
    }
}

#[test]
fn test_best_agent_is_an_independent_copy() {
    let mut population = Population::from_config(&small_config()).unwrap();
    population.run_generation().unwrap();
    let mut best = population.best_agent_of_generation().unwrap();
    let before = best.brain().clone();
    while best.update().unwrap() {}
    best.mutate(1.0, &mut rand::thread_rng());
    assert_eq!(population.best_agent_of_generation().unwrap().brain(), &before);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = small_config();
    config.population.size = 0;
    assert!(Population::from_config(&config).is_err());
}

#[test]
fn test_genome_round_trip_replays_same_game() {
    let mut population = Population::from_config(&small_config()).unwrap();
    population.run_generation().unwrap();
    let best = population.best_agent_of_generation().unwrap();
    let expected = population.stats()[0].best_fitness;

    let path = std::env::temp_dir().join(format!("snake_neuroevo_{}.genome", std::process::id()));
    GenomeRecord::from_agent(&best).save(&path).unwrap();
    let record = GenomeRecord::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(record.seed, best.seed());
    let mut agent = Agent::with_brain(record.seed, record.network, small_config().game).unwrap();
    while agent.update().unwrap() {}
    assert_eq!(agent.fitness(), expected);
}

#[test]
fn test_garbage_genome_file_is_rejected() {
    let path = std::env::temp_dir().join(format!("snake_neuroevo_bad_{}.genome", std::process::id()));
    std::fs::write(&path, b"nope").unwrap();
    assert!(GenomeRecord::load(&path).is_err());
    std::fs::remove_file(&path).ok();
}
