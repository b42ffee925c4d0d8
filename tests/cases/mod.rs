#![allow(dead_code)]

use plastics::{Compiler, Error, Path, State};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A year frame to run a script against.
pub struct Case {
    state: State,
    seed: u64,
}

impl Case {
    pub fn year(year: i32) -> Self {
        Self {
            state: State::for_year(year),
            seed: 0,
        }
    }

    pub fn with(mut self, region: &str, attribute: &str, value: f64) -> Self {
        self.state.set_attribute(region, attribute, value);
        self
    }

    pub fn input(mut self, name: &str, value: f64) -> Self {
        self.state.inputs.insert(name.to_string(), value);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Compile `script` and run it once. The first compile error wins.
    pub fn run(self, script: &str) -> Result<State, Error> {
        let result = Compiler::default().compile(script);
        if let Some(error) = result.errors.into_iter().next() {
            return Err(error);
        }
        let mut state = self.state;
        if let Some(program) = result.program {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            program.run(&mut state, &mut rng)?;
        }
        Ok(state)
    }
}

pub fn read(state: &State, path: &str) -> f64 {
    state
        .get(&Path::parse(path))
        .unwrap_or_else(|e| panic!("{}: {}", path, e))
}

/// Declares a test that runs a script against a frame and checks either the
/// resulting values or the kind of error raised.
macro_rules! script_case {
    (
        name: $name:ident,
        given: $given:expr,
        script: $script:expr,
        expect: [$($path:literal => $value:expr),* $(,)?] $(,)?
    ) => {
        #[test]
        fn $name() {
            let state = $given
                .run($script)
                .unwrap_or_else(|e| panic!("script failed: {}", e));
            $(
                pretty_assertions::assert_eq!(
                    crate::cases::read(&state, $path),
                    $value,
                    "{}",
                    $path
                );
            )*
        }
    };
    (
        name: $name:ident,
        given: $given:expr,
        script: $script:expr,
        error: $kind:expr $(,)?
    ) => {
        #[test]
        fn $name() {
            let error = $given.run($script).expect_err("script should fail");
            pretty_assertions::assert_eq!(error.kind(), $kind, "{}", error);
        }
    };
}
