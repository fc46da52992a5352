//! Glue between the world, the MLP controller and the genetic algorithm:
//! sensor construction, action decoding, and the per-round trial lifecycle.

use crate::{
    genalg::GenAlg,
    mlp::Mlp,
    world::{Direction, Point},
};
use rand::Rng;
use std::error::Error;

/// Steering decision relative to the snake's current heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TurnLeft,
    GoStraight,
    TurnRight,
}

/// World geometry queries the pilot needs to build its sensor vector.
/// Implementors must report an obstacle at finite distance in every
/// direction (a bounded grid does, since its edge blocks).
pub trait Senses {
    /// Whether the given cell blocks the snake (outside the grid, or a
    /// body part).
    fn is_obstacle(&self, p: Point) -> bool;

    /// Position of the current food item.
    fn food(&self) -> Point;
}

/// Cells from `from` to the closest obstacle in `direction`, counting the
/// obstacle cell itself: an immediately adjacent obstacle reads 1.
pub fn distance_to_obstacle(view: &impl Senses, from: Point, direction: Direction) -> u32 {
    let mut p = from;
    let mut steps = 0;
    loop {
        p = p.neighbor(direction);
        steps += 1;
        if view.is_obstacle(p) {
            return steps;
        }
    }
}

/// Rotate a grid-frame delta into the agent's frame of reference, with the
/// heading mapped to "up".
pub fn to_agent_frame(delta: Point, heading: Direction) -> Point {
    match heading {
        Direction::Up => delta,
        Direction::Down => Point {
            x: -delta.x,
            y: -delta.y,
        },
        Direction::Right => Point {
            x: delta.y,
            y: -delta.x,
        },
        Direction::Left => Point {
            x: -delta.y,
            y: delta.x,
        },
    }
}

/// The five sensor readings fed to the controller: obstacle distances to
/// the left of, ahead of, and to the right of the heading, then the vector
/// from head to food in the agent frame. Distances are raw cell counts.
pub fn sense(view: &impl Senses, head: Point, heading: Direction) -> [f64; 5] {
    let food = to_agent_frame(view.food() - head, heading);
    [
        distance_to_obstacle(view, head, heading.left_of()) as f64,
        distance_to_obstacle(view, head, heading) as f64,
        distance_to_obstacle(view, head, heading.right_of()) as f64,
        food.x as f64,
        food.y as f64,
    ]
}

/// Decode the controller output (turn-left, go-straight, turn-right) as the
/// argmax action. The comparison chain fixes the tie-break order: an exact
/// tie resolves straight over right over left.
pub fn decode_action(output: &[f64]) -> Result<Action, Box<dyn Error>> {
    match output {
        [left, straight, right] => Ok(if left > straight {
            if left > right {
                Action::TurnLeft
            } else {
                Action::TurnRight
            }
        } else if right > straight {
            Action::TurnRight
        } else {
            Action::GoStraight
        }),
        _ => Err(format!("expected 3 controller outputs, got {}", output.len()).into()),
    }
}

/// Owns the controller network and its optimizer, and runs one optimizer
/// individual's trial per game round.
#[derive(Debug)]
pub struct Pilot<R: Rng> {
    mlp: Mlp,
    genalg: GenAlg<R>,
}

impl<R: Rng> Pilot<R> {
    /// Pair a network with an optimizer whose chromosomes encode exactly
    /// that network's weights, and bind the first individual.
    pub fn new(mlp: Mlp, genalg: GenAlg<R>) -> Result<Self, Box<dyn Error>> {
        if genalg.chromosome_length() != mlp.weights_count() {
            return Err(format!(
                "chromosome length {} doesn't match mlp weight count {}",
                genalg.chromosome_length(),
                mlp.weights_count()
            )
            .into());
        }
        let mut pilot = Self { mlp, genalg };
        pilot.bind()?;
        Ok(pilot)
    }

    /// Load the chromosome on trial into the controller network.
    pub fn bind(&mut self) -> Result<(), Box<dyn Error>> {
        self.mlp.set_weights(self.genalg.current_individual())
    }

    /// One decision step: sense, run the network, decode the action.
    pub fn decide(
        &self,
        view: &impl Senses,
        head: Point,
        heading: Direction,
    ) -> Result<Action, Box<dyn Error>> {
        let output = self.mlp.forward(&sense(view, head, heading))?;
        decode_action(&output)
    }

    /// End the round: grade the individual on trial with the round outcome
    /// and rebind the network to the next one (possibly the first of a fresh
    /// generation).
    pub fn finish_round(&mut self, fitness: f64) -> Result<(), Box<dyn Error>> {
        self.genalg.grade_current_fitness(fitness);
        self.bind()
    }

    pub fn mlp(&self) -> &Mlp {
        &self.mlp
    }

    pub fn genalg(&self) -> &GenAlg<R> {
        &self.genalg
    }
}
