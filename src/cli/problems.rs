//! Demo problems for the `evolve` command.

use clap::ValueEnum;
use sprig::gp::{EvaluationError, FitnessFunction};
use sprig::node::{Bindings, DataType, Function, Primitive};
use sprig::{ConfigError, Individual, Syntax};

/// Number of sample points for the quartic regression.
const QUARTIC_SAMPLES: u32 = 20;

/// A built-in benchmark problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Problem {
    /// Even-N parity over AND, OR and NOT.
    Parity,
    /// Symbolic regression of x^4 + x^3 + x^2 + x.
    Quartic,
}

impl Problem {
    /// Build the syntax and fitness function. `bits` applies to parity only.
    pub(crate) fn build(self, bits: usize) -> Result<(Syntax, Fitness), ConfigError> {
        match self {
            Self::Parity => {
                let parity = EvenParity::new(bits);
                Ok((parity.syntax()?, Fitness::Parity(parity)))
            }
            Self::Quartic => {
                Ok((Quartic::syntax()?, Fitness::Quartic(Quartic::new())))
            }
        }
    }

    /// The ideal fitness for the problem.
    pub(crate) fn target(self) -> f64 {
        match self {
            Self::Parity => 0.0,
            Self::Quartic => 0.01,
        }
    }
}

/// Fitness of one of the demo problems.
#[derive(Debug, Clone)]
pub(crate) enum Fitness {
    Parity(EvenParity),
    Quartic(Quartic),
}

impl FitnessFunction for Fitness {
    fn evaluate(&self, individual: &Individual) -> Result<f64, EvaluationError> {
        match self {
            Self::Parity(parity) => parity.evaluate(individual),
            Self::Quartic(quartic) => quartic.evaluate(individual),
        }
    }
}

/// Even-N parity: true when an even number of inputs are true.
///
/// Fitness is the number of the 2^N cases answered wrongly.
#[derive(Debug, Clone)]
pub(crate) struct EvenParity {
    inputs: Vec<String>,
}

impl EvenParity {
    fn new(bits: usize) -> Self {
        Self {
            inputs: (0..bits).map(|i| format!("D{i}")).collect(),
        }
    }

    fn syntax(&self) -> Result<Syntax, ConfigError> {
        let mut primitives: Vec<Primitive> = vec![Function::And.into(), Function::Or.into(), Function::Not.into()];
        primitives.extend(self.inputs.iter().map(|name| Primitive::variable(name.as_str(), DataType::Boolean)));
        Syntax::new(primitives, DataType::Boolean)
    }

    fn evaluate(&self, individual: &Individual) -> Result<f64, EvaluationError> {
        let bits = self.inputs.len();
        let mut errors = 0.0;
        for case in 0..1_u64 << bits {
            let mut ctx = Bindings::new();
            for (i, name) in self.inputs.iter().enumerate() {
                ctx.set(name.as_str(), (case >> i) & 1 == 1);
            }
            let expected = case.count_ones() % 2 == 0;
            let actual = individual
                .evaluate(&mut ctx)?
                .as_bool()
                .ok_or_else(|| EvaluationError::Failed("parity program did not return a boolean".to_string()))?;
            if actual != expected {
                errors += 1.0;
            }
        }
        Ok(errors)
    }
}

/// Symbolic regression of x^4 + x^3 + x^2 + x on evenly spaced points in [-1, 1].
///
/// Fitness is the sum of absolute errors.
#[derive(Debug, Clone)]
pub(crate) struct Quartic {
    samples: Vec<(f64, f64)>,
}

impl Quartic {
    fn new() -> Self {
        let samples = (0..QUARTIC_SAMPLES)
            .map(|i| {
                let x = -1.0 + 2.0 * f64::from(i) / f64::from(QUARTIC_SAMPLES - 1);
                (x, x.powi(4) + x.powi(3) + x.powi(2) + x)
            })
            .collect();
        Self { samples }
    }

    fn syntax() -> Result<Syntax, ConfigError> {
        Syntax::new(
            vec![
                Function::Add.into(),
                Function::Sub.into(),
                Function::Mul.into(),
                Function::Div.into(),
                Primitive::variable("X", DataType::Double),
            ],
            DataType::Double,
        )
    }

    fn evaluate(&self, individual: &Individual) -> Result<f64, EvaluationError> {
        let mut error = 0.0;
        for &(x, y) in &self.samples {
            let mut ctx = Bindings::new().with("X", x);
            let actual = individual
                .evaluate(&mut ctx)?
                .as_f64()
                .ok_or_else(|| EvaluationError::Failed("quartic program did not return a number".to_string()))?;
            error += (actual - y).abs();
        }
        Ok(error)
    }
}
