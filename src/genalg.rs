//! Generational genetic algorithm evolving flat weight chromosomes.
//!
//! The optimizer never interprets gene semantics; chromosomes are opaque
//! real-valued vectors whose length is fixed at construction. One individual
//! is on trial at a time, and grading the last member of a generation rolls
//! the whole population over.

use crate::persist::Tokens;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    error::Error,
    fs,
    io::{self, Write},
    path::Path,
};

/// One chromosome paired with the fitness its latest trial earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub chromosome: Vec<f64>,
    pub fitness: f64,
}

impl Individual {
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

/// The optimizer owns its random source so a test can hand it a seeded
/// [rand::rngs::StdRng] and get fully deterministic evolution.
#[derive(Debug)]
pub struct GenAlg<R: Rng> {
    chromosome_length: usize,
    population_size: usize,
    selection_size: usize,
    mutation_rate: f64,
    generation_count: u32,
    population: Vec<Individual>,
    /// Index of the individual on trial; doubles as the count of already
    /// graded individuals in this generation.
    current: usize,
    rng: R,
}

impl<R: Rng> GenAlg<R> {
    /// Seed a population of standard-normal chromosomes with fitness 0.
    ///
    /// Population and selection sizes are tunables and clamp to their
    /// documented minimum of 1 (selection also to at most the population);
    /// the mutation rate clamps to [0, 1]. A zero chromosome length is not a
    /// tunable extreme but a broken contract, and fails fast.
    pub fn new(
        chromosome_length: usize,
        population_size: usize,
        selection_size: usize,
        mutation_rate: f64,
        mut rng: R,
    ) -> Self {
        assert!(chromosome_length > 0, "chromosome length must be non-zero");
        let population_size = population_size.max(1);

        let population = (0..population_size)
            .map(|_| Individual {
                chromosome: (0..chromosome_length)
                    .map(|_| rng.sample(StandardNormal))
                    .collect(),
                fitness: 0.,
            })
            .collect();

        Self {
            chromosome_length,
            population_size,
            selection_size: selection_size.clamp(1, population_size),
            mutation_rate: mutation_rate.clamp(0., 1.),
            generation_count: 0,
            population,
            current: 0,
            rng,
        }
    }

    pub fn chromosome_length(&self) -> usize {
        self.chromosome_length
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    pub fn generation_count(&self) -> u32 {
        self.generation_count
    }

    /// Count of individuals already graded this generation; also the cursor.
    pub fn individual_count(&self) -> usize {
        self.current
    }

    /// Chromosome of the individual on trial. Callers must copy it if they
    /// need it past the next generation transition.
    pub fn current_individual(&self) -> &[f64] {
        &self.population[self.current].chromosome
    }

    /// The fittest member of the current population.
    pub fn champion(&self) -> &Individual {
        self.population
            .iter()
            .max_by(|l, r| l.fitness.partial_cmp(&r.fitness).unwrap_or(Ordering::Equal))
            .expect("population is never empty")
    }

    /// Record the trial result for the individual on trial and advance the
    /// cursor, rolling over to a new generation once every member has been
    /// graded. Callers must grade exactly once per [Self::current_individual]
    /// retrieval; grading out of sequence is a contract violation and
    /// panics.
    pub fn grade_current_fitness(&mut self, fitness: f64) {
        self.population[self.current].fitness = fitness;
        self.current += 1;
        if self.current == self.population_size {
            self.new_generation();
        }
    }

    fn new_generation(&mut self) {
        // Fittest first; the sort is stable, so equal fitnesses keep their
        // evaluation order.
        self.population
            .sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));
        self.population.truncate(self.selection_size);

        // Survivors keep chromosome and fitness verbatim; the vacated slots
        // are refilled with offspring of survivor pairs drawn uniformly with
        // replacement.
        while self.population.len() < self.population_size {
            let a = self.rng.random_range(0..self.selection_size);
            let b = self.rng.random_range(0..self.selection_size);
            let chromosome = self.crossover(a, b);
            self.population.push(Individual {
                chromosome,
                fitness: 0.,
            });
        }

        self.current = 0;
        self.generation_count += 1;
    }

    /// Uniform per-gene recombination of two survivors: every gene is an
    /// unbiased coin flip between the parents, then independently mutated
    /// with probability `mutation_rate` by adding a standard normal offset.
    fn crossover(&mut self, a: usize, b: usize) -> Vec<f64> {
        (0..self.chromosome_length)
            .map(|i| {
                let gene = if self.rng.random_bool(0.5) {
                    self.population[a].chromosome[i]
                } else {
                    self.population[b].chromosome[i]
                };
                if self.rng.random_bool(self.mutation_rate) {
                    gene + self.rng.sample::<f64, _>(StandardNormal)
                } else {
                    gene
                }
            })
            .collect()
    }

    /// Write hyperparameters, counters, and every (chromosome, fitness)
    /// pair in population order.
    pub fn store_state(&self, mut w: impl Write) -> io::Result<()> {
        writeln!(w, "{}", self.chromosome_length)?;
        writeln!(w, "{}", self.population_size)?;
        writeln!(w, "{}", self.selection_size)?;
        writeln!(w, "{}", self.mutation_rate)?;
        writeln!(w, "{}", self.generation_count)?;
        writeln!(w, "{}", self.current)?;
        for member in &self.population {
            for gene in &member.chromosome {
                write!(w, "{gene} ")?;
            }
            writeln!(w)?;
            writeln!(w, "{}", member.fitness)?;
        }
        Ok(())
    }

    /// Rebuild an optimizer from a stored state, resuming at the individual
    /// that was on trial when the state was written.
    pub fn load_state(tokens: &mut Tokens, rng: R) -> Result<Self, Box<dyn Error>> {
        let chromosome_length: usize = tokens.next()?;
        if chromosome_length == 0 {
            return Err("stored chromosome length is zero".into());
        }
        let population_size = tokens.next::<usize>()?.max(1);
        let selection_size: usize = tokens.next()?;
        let mutation_rate: f64 = tokens.next()?;
        let generation_count: u32 = tokens.next()?;
        let current: usize = tokens.next()?;
        if current >= population_size {
            return Err(
                format!("stored individual count {current} is outside the population").into(),
            );
        }

        let population = (0..population_size)
            .map(|_| {
                let chromosome = (0..chromosome_length)
                    .map(|_| tokens.next())
                    .collect::<Result<Vec<f64>, _>>()?;
                let fitness = tokens.next()?;
                Ok(Individual {
                    chromosome,
                    fitness,
                })
            })
            .collect::<Result<Vec<_>, Box<dyn Error>>>()?;

        Ok(Self {
            chromosome_length,
            population_size,
            selection_size: selection_size.clamp(1, population_size),
            mutation_rate: mutation_rate.clamp(0., 1.),
            generation_count,
            population,
            current,
            rng,
        })
    }
}
