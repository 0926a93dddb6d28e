//! The fitness environment: one snake on a square board, steered by its own
//! network, eating food until it hits a wall, itself, or runs out of life.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::GameConfig;
use crate::context::{SimContext, STARTING_SCORE};
use crate::error::{EvoError, Result};
use crate::nn::{NeuralNet, Topology};
use crate::pos::{Dir, Pos};

/// Length of the sensory vector.
pub const SENSES: usize = 18;
/// One output per heading.
pub const ACTIONS: usize = 4;
/// Default lifetime beyond which fitness stops growing.
pub const LIFETIME_CAP: u32 = 600;

/// Ray directions, in sensory-vector order.
const RAYS: [(i32, i32); 8] = [(1, 0), (0, 1), (-1, 0), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Recent tiles kept beyond the current score.
const RECENT_TILE_SLACK: usize = 7;

/// Fitness with the default lifetime cap.
pub fn fitness(score: u32, lifetime: u32) -> i64 {
    capped_fitness(score, lifetime, LIFETIME_CAP)
}

/// Quadratic in lifetime. Below a score of 10 it doubles per point; from 10
/// on it grows linearly so the exponent cannot run away.
pub fn capped_fitness(score: u32, lifetime: u32, lifetime_cap: u32) -> i64 {
    let life = lifetime.min(lifetime_cap) as i64;
    if score < 10 {
        (life * life * (1i64 << score)).max(0)
    } else {
        life * life * (1i64 << 10) * (score as i64 - 9)
    }
}

/// Read-only copy of an agent's visible state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub board_size: i32,
    pub head: Pos,
    pub body: Vec<Pos>,
    pub food: Pos,
    pub dir: Dir,
    pub alive: bool,
    pub score: u32,
    pub lifetime: u32,
    pub life_left: u32,
    pub revisits: u32,
    pub recent_tiles: Vec<Pos>,
}

#[derive(Debug)]
pub struct Agent {
    rules: GameConfig,
    seed: u64,
    rng: ChaCha8Rng,
    brain: NeuralNet,
    head: Pos,
    body: VecDeque<Pos>,
    dir: Dir,
    food: Pos,
    alive: bool,
    score: u32,
    lifetime: u32,
    life_left: u32,
    per_move: u32,
    move_counter: u32,
    recent_tiles: VecDeque<Pos>,
    revisits: u32,
}

impl Agent {
    /// Fresh agent with a random network drawn from the master stream. A
    /// missing seed is derived from the master stream as well.
    pub fn new(seed: Option<u64>, topology: Topology, rules: GameConfig, ctx: &mut SimContext) -> Result<Self> {
        let seed = seed.unwrap_or_else(|| ctx.derive_seed());
        let brain = NeuralNet::new(topology, ctx.rng());
        Self::with_brain(seed, brain, rules)
    }

    /// Fresh agent driven by an existing network.
    pub fn with_brain(seed: u64, brain: NeuralNet, rules: GameConfig) -> Result<Self> {
        let t = brain.topology();
        if t.inputs != SENSES || t.outputs != ACTIONS {
            return Err(EvoError::TopologyMismatch(format!(
                "agent needs {SENSES} inputs and {ACTIONS} outputs, network has {} and {}",
                t.inputs, t.outputs
            )));
        }
        Ok(Self::spawn(seed, brain, rules))
    }

    fn spawn(seed: u64, brain: NeuralNet, rules: GameConfig) -> Self {
        let c = rules.board_size / 2;
        let mut agent = Self {
            rules,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            brain,
            head: Pos::new(c, c),
            body: VecDeque::from([Pos::new(c, c + 1), Pos::new(c, c + 2)]),
            dir: Dir::Up,
            food: Pos::new(0, 0),
            alive: true,
            score: STARTING_SCORE,
            lifetime: 0,
            life_left: rules.initial_life,
            per_move: rules.training_per_move,
            move_counter: 0,
            recent_tiles: VecDeque::new(),
            revisits: 0,
        };
        agent.spawn_food();
        agent
    }

    pub fn seed(&self) -> u64 { self.seed }
    pub fn brain(&self) -> &NeuralNet { &self.brain }
    pub fn head(&self) -> Pos { self.head }
    pub fn food(&self) -> Pos { self.food }
    pub fn dir(&self) -> Dir { self.dir }
    pub fn is_alive(&self) -> bool { self.alive }
    pub fn score(&self) -> u32 { self.score }
    pub fn lifetime(&self) -> u32 { self.lifetime }
    pub fn life_left(&self) -> u32 { self.life_left }
    pub fn revisits(&self) -> u32 { self.revisits }
    pub fn per_move(&self) -> u32 { self.per_move }

    pub fn body(&self) -> impl Iterator<Item = &Pos> {
        self.body.iter()
    }

    pub fn set_per_move(&mut self, per_move: u32) {
        self.per_move = per_move.max(1);
    }

    pub fn fitness(&self) -> i64 {
        capped_fitness(self.score, self.lifetime, self.rules.lifetime_cap)
    }

    /// One simulation step. Returns whether the agent is still alive.
    pub fn update(&mut self) -> Result<bool> {
        if !self.alive {
            return Err(EvoError::AgentTerminal);
        }
        self.decide()?;

        self.move_counter += 1;
        if self.move_counter < self.per_move {
            return Ok(true);
        }
        self.lifetime += 1;
        self.life_left = self.life_left.saturating_sub(1);
        if self.life_left == 0 {
            self.alive = false;
            return Ok(false);
        }
        self.move_counter = 0;
        Ok(self.advance())
    }

    /// Ray casts in the eight directions (body proximity then wall
    /// proximity, as `1/steps`), then closeness to food along each axis.
    pub fn sense(&self) -> [f32; SENSES] {
        let mut out = [0.0f32; SENSES];
        for (k, &(dx, dy)) in RAYS.iter().enumerate() {
            let step = Pos::new(dx, dy);
            let mut probe = self.head + step;
            let mut distance = 1.0f32;
            while probe.in_bounds(self.rules.board_size) {
                if out[2 * k] <= 0.0 && self.body_contains(probe) {
                    out[2 * k] = 1.0 / distance;
                }
                probe = probe + step;
                distance += 1.0;
            }
            out[2 * k + 1] = 1.0 / distance;
        }
        out[16] = 1.0 / ((self.head.x - self.food.x).abs() + 1) as f32;
        out[17] = 1.0 / ((self.head.y - self.food.y).abs() + 1) as f32;
        out
    }

    /// Child sharing this agent's seed, with a crossed network.
    pub fn create_child<R: Rng + ?Sized>(&self, other: &Agent, rng: &mut R) -> Result<Agent> {
        let brain = self.brain.cross_with(&other.brain, rng)?;
        Ok(Self::spawn(self.seed, brain, self.rules))
    }

    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f32, rng: &mut R) {
        self.brain.mutate(rate, rng);
    }

    /// Same seed, same genome, back at the starting position.
    pub fn fresh_clone(&self) -> Agent {
        let mut agent = Self::spawn(self.seed, self.brain.clone(), self.rules);
        agent.per_move = self.per_move;
        agent
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            board_size: self.rules.board_size,
            head: self.head,
            body: self.body.iter().copied().collect(),
            food: self.food,
            dir: self.dir,
            alive: self.alive,
            score: self.score,
            lifetime: self.lifetime,
            life_left: self.life_left,
            revisits: self.revisits,
            recent_tiles: self.recent_tiles.iter().copied().collect(),
        }
    }

    fn body_contains(&self, p: Pos) -> bool {
        self.body.iter().any(|&b| b == p)
    }

    /// Picks the strongest output (first wins ties) unless that heading runs
    /// straight into the body, in which case the old heading is kept.
    fn decide(&mut self) -> Result<()> {
        let outputs = self.brain.forward(&self.sense())?;
        let mut best = 0;
        for (i, &v) in outputs.iter().enumerate() {
            if v > outputs[best] {
                best = i;
            }
        }
        let previous = self.dir;
        if let Some(dir) = Dir::from_action(best) {
            self.dir = dir;
        }
        if self.body_contains(self.head + self.dir.offset()) {
            self.dir = previous;
        }
        Ok(())
    }

    fn advance(&mut self) -> bool {
        let new_head = self.head + self.dir.offset();
        if !new_head.in_bounds(self.rules.board_size) {
            self.alive = false;
            return false;
        }

        let ate = new_head == self.food;
        if ate {
            self.score += 1;
            self.life_left = (self.life_left + self.rules.food_life_bonus).min(self.rules.max_life);
            self.spawn_food();
        }

        self.body.push_front(self.head);
        if !ate {
            self.body.pop_back();
        }
        self.head = new_head;

        if self.body_contains(new_head) {
            self.alive = false;
            return false;
        }

        if self.recent_tiles.contains(&new_head) {
            self.revisits += 1;
        }
        self.recent_tiles.push_front(new_head);
        self.recent_tiles.truncate(self.score as usize + RECENT_TILE_SLACK);
        true
    }

    /// Resamples from the private stream until the tile is off the body.
    fn spawn_food(&mut self) {
        let size = self.rules.board_size;
        if self.body.len() >= (size * size) as usize {
            // no free tile left; leave the food where the head is
            self.food = self.head;
            return;
        }
        loop {
            let p = Pos::new(self.rng.gen_range(0..size), self.rng.gen_range(0..size));
            if !self.body_contains(p) {
                self.food = p;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    /// Network whose output is one-hot on `action`, or all zeros for `None`.
    fn fixed_net(action: Option<usize>) -> NeuralNet {
        let t = Topology::new(SENSES, 1, ACTIONS, 0);
        let mut b0 = Matrix::new(1, 1);
        b0.set(0, 0, 1.0);
        let mut w1 = Matrix::new(ACTIONS, 1);
        if let Some(a) = action {
            w1.set(a, 0, 1.0);
        }
        NeuralNet::from_parts(t, vec![Matrix::new(1, SENSES), w1], vec![b0, Matrix::new(ACTIONS, 1)]).unwrap()
    }

    fn agent(action: Option<usize>) -> Agent {
        Agent::with_brain(9, fixed_net(action), GameConfig::default()).unwrap()
    }

    #[test]
    fn fitness_formula() {
        assert_eq!(fitness(5, 10), 3200);
        assert_eq!(fitness(12, 30), 2_764_800);
        assert_eq!(fitness(3, 700), fitness(3, 600));
        for life in 0..50 {
            assert!(fitness(4, life + 1) >= fitness(4, life));
        }
        for score in 0..30 {
            assert!(fitness(score + 1, 7) > fitness(score, 7));
        }
    }

    #[test]
    fn starting_state() {
        let a = agent(None);
        assert_eq!(a.head(), Pos::new(12, 12));
        assert_eq!(a.body().copied().collect::<Vec<_>>(), vec![Pos::new(12, 13), Pos::new(12, 14)]);
        assert_eq!(a.score(), 2);
        assert_eq!(a.life_left(), 150);
        assert!(a.body().all(|&b| b != a.food()));
        assert!(a.food().in_bounds(25));
    }

    #[test]
    fn food_placement_follows_the_seed() {
        let a = agent(None);
        let b = agent(Some(3));
        assert_eq!(a.food(), b.food());
    }

    #[test]
    fn senses_rays_and_food() {
        let a = agent(None);
        let s = a.sense();
        // straight down: body right below, 12 tiles to the wall
        assert_eq!(s[2], 1.0);
        assert_eq!(s[3], 1.0 / 13.0);
        // straight up: no body
        assert_eq!(s[6], 0.0);
        assert_eq!(s[7], 1.0 / 13.0);
        let f = a.food();
        assert_eq!(s[16], 1.0 / ((12 - f.x).abs() + 1) as f32);
        assert_eq!(s[17], 1.0 / ((12 - f.y).abs() + 1) as f32);
    }

    #[test]
    fn turning_into_the_body_keeps_the_old_heading() {
        let mut a = agent(Some(Dir::Down as usize));
        assert!(a.update().unwrap());
        assert_eq!(a.dir(), Dir::Up);
        assert_eq!(a.head(), Pos::new(12, 11));
    }

    #[test]
    fn running_into_a_wall_kills() {
        let mut a = agent(Some(Dir::Right as usize));
        a.food = Pos::new(0, 0);
        let mut moves = 0;
        while a.update().unwrap() {
            moves += 1;
        }
        assert_eq!(moves, 12);
        assert!(!a.is_alive());
        assert_eq!(a.lifetime(), 13);
        assert!(matches!(a.update(), Err(EvoError::AgentTerminal)));
    }

    #[test]
    fn life_budget_runs_out() {
        let rules = GameConfig { initial_life: 5, ..GameConfig::default() };
        let mut a = Agent::with_brain(1, fixed_net(Some(Dir::Left as usize)), rules).unwrap();
        a.food = Pos::new(24, 24);
        let mut ticks = 0;
        while a.update().unwrap() {
            ticks += 1;
        }
        assert_eq!(ticks, 4);
        assert_eq!(a.lifetime(), 5);
        assert_eq!(a.head(), Pos::new(8, 12));
    }

    #[test]
    fn cadence_delays_movement() {
        let mut a = agent(None);
        a.set_per_move(3);
        a.food = Pos::new(0, 0);
        a.update().unwrap();
        a.update().unwrap();
        assert_eq!(a.head(), Pos::new(12, 12));
        assert_eq!(a.lifetime(), 0);
        a.update().unwrap();
        assert_eq!(a.head(), Pos::new(12, 11));
        assert_eq!(a.lifetime(), 1);
    }

    #[test]
    fn eating_grows_and_feeds() {
        let mut a = agent(None);
        a.food = Pos::new(12, 11);
        assert!(a.update().unwrap());
        assert_eq!(a.score(), 3);
        assert_eq!(a.body().count(), 3);
        assert_eq!(a.life_left(), 249);
        assert_ne!(a.food(), Pos::new(12, 13));
    }

    #[test]
    fn food_bonus_is_capped() {
        let mut a = agent(None);
        a.life_left = 450;
        a.food = Pos::new(12, 11);
        assert!(a.update().unwrap());
        assert_eq!(a.score(), 3);
        assert_eq!(a.life_left(), 500);
    }

    #[test]
    fn boxed_in_head_dies_on_the_body() {
        // both the chosen and the previous heading lead into the body
        let mut a = agent(Some(Dir::Up as usize));
        a.body = VecDeque::from([Pos::new(12, 11), Pos::new(12, 13)]);
        a.food = Pos::new(0, 0);
        assert!(!a.update().unwrap());
        assert!(!a.is_alive());
        assert_eq!(a.head(), Pos::new(12, 11));
        assert_eq!(a.lifetime(), 1);
    }

    #[test]
    fn recent_tiles_hold_visited_heads() {
        let mut a = agent(None);
        a.food = Pos::new(0, 0);
        a.update().unwrap();
        assert_eq!(a.snapshot().recent_tiles, vec![Pos::new(12, 11)]);
        assert_eq!(a.revisits(), 0);
    }

    #[test]
    fn circling_counts_revisits_and_bounds_history() {
        let mut a = agent(None);
        a.food = Pos::new(0, 0);
        let lap = [Dir::Up, Dir::Left, Dir::Down, Dir::Right];
        for _ in 0..3 {
            for dir in lap {
                a.brain = fixed_net(Some(dir as usize));
                assert!(a.update().unwrap());
            }
        }
        // the first lap enters four new tiles, every later move is a revisit
        assert_eq!(a.revisits(), 8);
        assert_eq!(a.head(), Pos::new(12, 12));
        let recent = a.snapshot().recent_tiles;
        assert_eq!(recent.len(), 2 + 7);
        assert_eq!(recent[0], Pos::new(12, 12));
    }

    #[test]
    fn fresh_clone_restarts_with_same_genome() {
        let mut a = agent(None);
        a.food = Pos::new(0, 0);
        a.update().unwrap();
        let c = a.fresh_clone();
        assert_eq!(c.brain(), a.brain());
        assert_eq!(c.head(), Pos::new(12, 12));
        assert_eq!(c.lifetime(), 0);
        assert_eq!(c.food(), agent(None).food());
    }

    #[test]
    fn rejects_wrong_network_shape() {
        let mut rng = rand::thread_rng();
        let net = NeuralNet::new(Topology::new(24, 4, 4, 1), &mut rng);
        assert!(Agent::with_brain(0, net, GameConfig::default()).is_err());
    }
}
