pub mod agent;
pub mod game;
pub mod genalg;
pub mod mlp;
pub mod persist;
pub mod world;

pub use agent::{decode_action, sense, Action, Pilot, Senses};
pub use game::Game;
pub use genalg::{GenAlg, Individual};
pub use mlp::Mlp;
pub use world::{Direction, Element, Outcome, Point, Snake, World};
