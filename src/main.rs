use rand::{rngs::StdRng, SeedableRng};
use seviper::Game;
use std::{env, error::Error};

const ROUNDS: usize = 100_000;
const REPORT_EVERY: usize = 500;
const STORE_EVERY: usize = 5_000;
const SAVE_PATH: &str = "save/save_state.txt";

fn main() -> Result<(), Box<dyn Error>> {
    let save_path = env::args().nth(1).unwrap_or_else(|| SAVE_PATH.to_string());
    let mut game = Game::<StdRng>::load(&save_path, StdRng::from_os_rng())?;

    let ga = game.pilot().genalg();
    println!(
        "resuming at generation {}.{} (best ai score {})",
        ga.generation_count(),
        ga.individual_count(),
        game.max_score_ai()
    );

    for round in 1..=ROUNDS {
        let score = game.play_round()?;

        if round % REPORT_EVERY == 0 {
            let ga = game.pilot().genalg();
            println!(
                "round {round}: gen {}.{} score {score} best {}",
                ga.generation_count(),
                ga.individual_count(),
                game.max_score_ai()
            );
        }

        if round % STORE_EVERY == 0 {
            game.store(&save_path)?;
        }
    }

    game.store(&save_path)?;
    game.pilot()
        .genalg()
        .champion()
        .to_file(format!("{save_path}.champion.json"))?;
    println!("best ai score {}", game.max_score_ai());

    Ok(())
}
