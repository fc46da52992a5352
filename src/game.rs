//! Round orchestration and whole-save-file persistence.
//!
//! A round is one individual's trial: the pilot steers the snake until it
//! dies or starves, the final size becomes the individual's fitness, and
//! the optimizer moves on. The save file captures the best scores, the
//! controller topology, and the full optimizer state so training resumes
//! across process restarts.

use crate::{
    agent::Pilot,
    genalg::GenAlg,
    mlp::Mlp,
    persist::Tokens,
    world::{Outcome, Point, Snake, World},
};
use rand::{Rng, SeedableRng};
use std::{
    error::Error,
    fs::{self, File},
    io::Write,
    path::Path,
};

/// Side length of the square grid, in cells.
pub const GRID_SIDE: usize = 31;
/// Width of the controller's sensor vector.
pub const MLP_INPUT_SIZE: usize = 5;
/// Controller layer sizes, first hidden layer through output layer.
pub const MLP_LAYER_SIZES: [usize; 3] = [5, 5, 3];
/// Individuals per genetic algorithm generation.
pub const GA_POPULATION_SIZE: usize = 1000;
/// Fittest individuals surviving each generation.
pub const GA_SELECTION_SIZE: usize = 50;
/// Independent per-gene mutation probability during crossover.
pub const GA_MUTATION_RATE: f64 = 0.02;
/// Steps without eating before a round is called off; without it a circling
/// agent would never end its trial in a headless run.
const STARVATION_BUDGET: u32 = (GRID_SIDE * GRID_SIDE) as u32;

pub struct Game<R: Rng> {
    world: World,
    snake: Snake,
    pilot: Pilot<R>,
    max_score_player: u32,
    max_score_ai: u32,
    rng: R,
}

impl<R: Rng + SeedableRng> Game<R> {
    /// Fresh game with the default hyperparameters.
    pub fn new(mut rng: R) -> Self {
        let mut world_rng = R::from_rng(&mut rng);
        let mlp = Mlp::new(MLP_INPUT_SIZE, MLP_LAYER_SIZES.to_vec(), &mut world_rng);
        let genalg = GenAlg::new(
            mlp.weights_count(),
            GA_POPULATION_SIZE,
            GA_SELECTION_SIZE,
            GA_MUTATION_RATE,
            rng,
        );
        let pilot = Pilot::new(mlp, genalg).expect("fresh controller matches its optimizer");

        let mut world = World::new(GRID_SIDE);
        let start = Self::start_position(&world);
        let snake = Snake::spawn(&mut world, start);
        world.grow_food(&mut world_rng);

        Self {
            world,
            snake,
            pilot,
            max_score_player: 0,
            max_score_ai: 0,
            rng: world_rng,
        }
    }

    /// Load a stored game, or start fresh when no save file exists yet.
    /// A present-but-malformed file is an error, never a silent reset.
    pub fn load<P: AsRef<Path>>(path: P, mut rng: R) -> Result<Self, Box<dyn Error>> {
        if !path.as_ref().exists() {
            return Ok(Self::new(rng));
        }
        let mut tokens = Tokens::from_reader(File::open(path)?)?;
        let mut world_rng = R::from_rng(&mut rng);

        let max_score_player = tokens.next()?;
        let max_score_ai = tokens.next()?;

        let mut mlp = Mlp::new(MLP_INPUT_SIZE, MLP_LAYER_SIZES.to_vec(), &mut rng);
        mlp.load_config(&mut tokens, &mut rng)?;
        let genalg = GenAlg::load_state(&mut tokens, rng)?;
        // a chromosome length that doesn't fit the loaded topology is
        // rejected here
        let pilot = Pilot::new(mlp, genalg)?;

        let mut world = World::new(GRID_SIDE);
        let start = Self::start_position(&world);
        let snake = Snake::spawn(&mut world, start);
        world.grow_food(&mut world_rng);

        Ok(Self {
            world,
            snake,
            pilot,
            max_score_player,
            max_score_ai,
            rng: world_rng,
        })
    }

    /// Write the full save state; parent directories are created as needed.
    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut w = Vec::new();
        writeln!(w, "{}", self.max_score_player)?;
        writeln!(w, "{}", self.max_score_ai)?;
        self.pilot.mlp().store_config(&mut w)?;
        self.pilot.genalg().store_state(&mut w)?;
        fs::write(path, w)?;
        Ok(())
    }

    /// Run one auto-mode round to completion and grade it. Returns the
    /// round's score (the snake's final size).
    pub fn play_round(&mut self) -> Result<u32, Box<dyn Error>> {
        self.world.clear();
        let start = Self::start_position(&self.world);
        self.snake = Snake::spawn(&mut self.world, start);
        self.world.grow_food(&mut self.rng);
        self.pilot.bind()?;

        let mut hunger = 0;
        while self.snake.is_alive() && hunger < STARVATION_BUDGET {
            let action = self
                .pilot
                .decide(&self.world, self.snake.head(), self.snake.direction())?;
            self.snake.turn(self.snake.direction().steer(action));
            match self.snake.advance(&mut self.world, &mut self.rng) {
                Outcome::Ate => hunger = 0,
                Outcome::Moved => hunger += 1,
                Outcome::Died => {}
            }
        }

        let score = self.snake.size() as u32;
        self.pilot.finish_round(f64::from(score))?;
        self.max_score_ai = self.max_score_ai.max(score);
        Ok(score)
    }

    fn start_position(world: &World) -> Point {
        Point {
            x: (world.side() / 2) as i32,
            y: (world.side() / 2) as i32,
        }
    }

    pub fn pilot(&self) -> &Pilot<R> {
        &self.pilot
    }

    pub fn max_score_player(&self) -> u32 {
        self.max_score_player
    }

    pub fn max_score_ai(&self) -> u32 {
        self.max_score_ai
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use std::path::PathBuf;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x6a3e)
    }

    fn temp_save(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("seviper-test-{name}.txt"))
    }

    #[test]
    fn test_missing_save_file_starts_fresh() {
        let game = Game::load(temp_save("definitely-missing"), rng()).unwrap();
        assert_eq!(game.max_score_ai(), 0);
        assert_eq!(game.pilot().genalg().generation_count(), 0);
        assert_eq!(game.pilot().genalg().individual_count(), 0);
    }

    #[test]
    fn test_save_round_trip() {
        let path = temp_save("round-trip");
        let mut game = Game::new(rng());
        game.play_round().unwrap();
        game.play_round().unwrap();
        game.max_score_player = 9;
        game.store(&path).unwrap();

        let loaded = Game::load(&path, rng()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.max_score_player(), 9);
        assert_eq!(loaded.max_score_ai(), game.max_score_ai());
        let (ga, loaded_ga) = (game.pilot().genalg(), loaded.pilot().genalg());
        assert_eq!(loaded_ga.generation_count(), ga.generation_count());
        assert_eq!(loaded_ga.individual_count(), ga.individual_count());
        assert_eq!(loaded_ga.current_individual(), ga.current_individual());
        // the loaded controller is rebuilt from the stored topology and
        // bound to the resumed individual
        assert_eq!(
            loaded.pilot().mlp().weights_vector(),
            loaded_ga.current_individual()
        );
    }

    #[test]
    fn test_malformed_save_file_is_an_error() {
        let path = temp_save("malformed");
        fs::write(&path, "1 2 not-a-number").unwrap();
        let result = Game::<StdRng>::load(&path, rng());
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_play_round_grades_exactly_one_individual() {
        let mut game = Game::new(rng());
        let before = game.pilot().genalg().individual_count();
        let score = game.play_round().unwrap();
        assert!(score >= 1);
        assert_eq!(game.pilot().genalg().individual_count(), before + 1);
        assert!(game.max_score_ai() >= score);
    }
}
