//! Discrete grid world and the snake that lives in it. Headless: the grid
//! is the whole game state, there is no rendering or input layer here.

use crate::agent::{Action, Senses};
use rand::Rng;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn neighbor(self, direction: Direction) -> Point {
        match direction {
            Direction::Up => Point {
                x: self.x,
                y: self.y - 1,
            },
            Direction::Right => Point {
                x: self.x + 1,
                y: self.y,
            },
            Direction::Down => Point {
                x: self.x,
                y: self.y + 1,
            },
            Direction::Left => Point {
                x: self.x - 1,
                y: self.y,
            },
        }
    }
}

impl core::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Absolute heading on the grid (y grows downward). The numeric order makes
/// a clockwise turn a +1 step and a counter-clockwise turn a +3 step, mod 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    pub fn left_of(self) -> Direction {
        Direction::from_index((self as u8 + 3) % 4)
    }

    pub fn right_of(self) -> Direction {
        Direction::from_index((self as u8 + 1) % 4)
    }

    pub fn opposite(self) -> Direction {
        Direction::from_index((self as u8 + 2) % 4)
    }

    fn from_index(i: u8) -> Direction {
        match i {
            0 => Direction::Up,
            1 => Direction::Right,
            2 => Direction::Down,
            _ => Direction::Left,
        }
    }

    /// Apply a relative steering action to this heading.
    pub fn steer(self, action: Action) -> Direction {
        match action {
            Action::TurnLeft => self.left_of(),
            Action::GoStraight => self,
            Action::TurnRight => self.right_of(),
        }
    }
}

/// Content of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Free,
    Food,
    SnakeHead,
    SnakeBody,
    SnakeTail,
}

/// Outcome of advancing the snake by one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Moved,
    Ate,
    Died,
}

/// Square grid of elements plus the current food position.
#[derive(Debug)]
pub struct World {
    side: usize,
    grid: Vec<Element>,
    food: Point,
}

impl World {
    pub fn new(side: usize) -> Self {
        let side = side.max(2);
        Self {
            side,
            grid: vec![Element::Free; side * side],
            food: Point { x: 0, y: 0 },
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.side && (p.y as usize) < self.side
    }

    pub fn element(&self, p: Point) -> Element {
        debug_assert!(self.in_bounds(p));
        self.grid[p.y as usize * self.side + p.x as usize]
    }

    pub fn set_element(&mut self, p: Point, element: Element) {
        debug_assert!(self.in_bounds(p));
        if element == Element::Food {
            self.food = p;
        }
        self.grid[p.y as usize * self.side + p.x as usize] = element;
    }

    /// Place food on a uniformly random free cell. A grid with no free cell
    /// left means the snake occupies everything; the stale food position is
    /// harmless for the round's remainder.
    pub fn grow_food(&mut self, rng: &mut impl Rng) {
        if !self.grid.contains(&Element::Free) {
            return;
        }
        loop {
            let p = Point {
                x: rng.random_range(0..self.side as i32),
                y: rng.random_range(0..self.side as i32),
            };
            if self.element(p) == Element::Free {
                self.set_element(p, Element::Food);
                return;
            }
        }
    }

    /// Clear every cell; food and snake are respawned by the caller.
    pub fn clear(&mut self) {
        self.grid.fill(Element::Free);
    }
}

impl Senses for World {
    fn is_obstacle(&self, p: Point) -> bool {
        !self.in_bounds(p)
            || matches!(self.element(p), Element::SnakeBody | Element::SnakeTail)
    }

    fn food(&self) -> Point {
        self.food
    }
}

/// The snake entity: a deque of occupied cells (head at the front), a
/// heading, and a life flag.
#[derive(Debug)]
pub struct Snake {
    positions: VecDeque<Point>,
    direction: Direction,
    alive: bool,
}

impl Snake {
    /// Spawn a single-segment snake heading up, registering it on the grid.
    pub fn spawn(world: &mut World, start: Point) -> Self {
        world.set_element(start, Element::SnakeHead);
        Self {
            positions: VecDeque::from([start]),
            direction: Direction::Up,
            alive: true,
        }
    }

    pub fn head(&self) -> Point {
        *self.positions.front().expect("snake always has a head")
    }

    pub fn size(&self) -> usize {
        self.positions.len()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Change heading. Reversing straight into the first body segment is
    /// refused, so a too-quick double turn can't kill the snake in place.
    pub fn turn(&mut self, direction: Direction) {
        if direction != self.direction.opposite() {
            self.direction = direction;
        }
    }

    /// Advance one cell in the current heading, updating the world grid.
    /// Eating grows the body and respawns food; hitting the grid edge or a
    /// body part kills the snake.
    pub fn advance(&mut self, world: &mut World, rng: &mut impl Rng) -> Outcome {
        let target = self.head().neighbor(self.direction);
        if world.is_obstacle(target) {
            self.alive = false;
            return Outcome::Died;
        }

        let ate = world.element(target) == Element::Food;
        let old_head = self.head();
        self.positions.push_front(target);
        world.set_element(target, Element::SnakeHead);
        world.set_element(old_head, Element::SnakeBody);

        if ate {
            world.grow_food(rng);
        } else {
            let tail = self.positions.pop_back().expect("snake always has a tail");
            world.set_element(tail, Element::Free);
        }

        if self.positions.len() > 1 {
            let tail = *self.positions.back().expect("snake always has a tail");
            world.set_element(tail, Element::SnakeTail);
        }

        if ate {
            Outcome::Ate
        } else {
            Outcome::Moved
        }
    }
}
