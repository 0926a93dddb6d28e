use serde::{Deserialize, Serialize};
use std::ops::Add;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Inside a `size x size` board with its origin at (0, 0).
    pub fn in_bounds(self, size: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < size && self.y < size
    }
}

impl Add for Pos {
    type Output = Pos;

    fn add(self, rhs: Pos) -> Pos {
        Pos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Heading of an agent. Discriminants are the network's action indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dir {
    Up = 0,
    Left = 1,
    Down = 2,
    Right = 3,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Left, Dir::Down, Dir::Right];

    pub fn from_action(index: usize) -> Option<Dir> {
        Self::ALL.get(index).copied()
    }

    pub fn offset(self) -> Pos {
        match self {
            Dir::Up => Pos::new(0, -1),
            Dir::Left => Pos::new(-1, 0),
            Dir::Down => Pos::new(0, 1),
            Dir::Right => Pos::new(1, 0),
        }
    }
}
