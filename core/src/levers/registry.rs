use std::collections::{BTreeMap, HashMap};

use rand::RngCore;
use tracing::{debug, trace, warn};

use crate::compiler::{CompileResult, Compiler};
use crate::levers::{CompiledLever, LeverDefinition, LeverError, LeverStatus};
use crate::state::State;

#[derive(Debug)]
struct Lever {
    definition: LeverDefinition,
    value: f64,
    enabled: bool,
    compiled: CompileResult,
}

/// Levers in declaration order, each with its cached compile result.
#[derive(Debug)]
pub struct LeverRegistry {
    compiler: Compiler,
    levers: Vec<Lever>,
    index: HashMap<String, usize>,
}

impl LeverRegistry {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
            levers: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a lever, or replace the definition of an existing one in place.
    ///
    /// The lever starts enabled at its default value.
    pub fn register(&mut self, definition: LeverDefinition) -> &CompileResult {
        let compiled = self.compiler.compile(&definition.script);
        debug!(
            variable = %definition.variable,
            errors = compiled.errors.len(),
            "Registered lever"
        );
        let lever = Lever {
            value: definition.default_value,
            enabled: true,
            definition,
            compiled,
        };

        let slot = match self.index.get(&lever.definition.variable) {
            Some(&i) => {
                self.levers[i] = lever;
                i
            }
            None => {
                let i = self.levers.len();
                self.index.insert(lever.definition.variable.clone(), i);
                self.levers.push(lever);
                i
            }
        };
        &self.levers[slot].compiled
    }

    pub fn len(&self) -> usize {
        self.levers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levers.is_empty()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &LeverDefinition> {
        self.levers.iter().map(|l| &l.definition)
    }

    /// Replace a lever's script. The previous program is dropped and the new
    /// text compiled, unless the text is unchanged.
    pub fn update_script(
        &mut self,
        variable: &str,
        script: &str,
    ) -> Result<&CompileResult, LeverError> {
        let compiler = &self.compiler;
        let lever = lookup_mut(&self.index, &mut self.levers, variable)?;
        if lever.definition.script != script {
            lever.definition.script = script.to_string();
            lever.compiled = compiler.compile(script);
            debug!(
                variable,
                errors = lever.compiled.errors.len(),
                "Recompiled lever"
            );
        }
        Ok(&lever.compiled)
    }

    pub fn compile_result(&self, variable: &str) -> Result<&CompileResult, LeverError> {
        self.lookup(variable).map(|l| &l.compiled)
    }

    pub fn value(&self, variable: &str) -> Result<f64, LeverError> {
        self.lookup(variable).map(|l| l.value)
    }

    pub fn set_value(&mut self, variable: &str, value: f64) -> Result<(), LeverError> {
        lookup_mut(&self.index, &mut self.levers, variable)?.value = value;
        Ok(())
    }

    /// Disabled levers still publish their value under `in`, but their
    /// program is not applied.
    pub fn set_enabled(&mut self, variable: &str, enabled: bool) -> Result<(), LeverError> {
        lookup_mut(&self.index, &mut self.levers, variable)?.enabled = enabled;
        Ok(())
    }

    /// Current values of every lever, keyed by variable.
    pub fn inputs(&self) -> BTreeMap<String, f64> {
        self.levers
            .iter()
            .map(|l| (l.definition.variable.clone(), l.value))
            .collect()
    }

    /// Enabled levers with a program, in ascending priority.
    ///
    /// Levers with equal priority keep their declaration order.
    pub fn ordered(&self) -> Vec<CompiledLever> {
        let mut ordered: Vec<CompiledLever> = self
            .levers
            .iter()
            .filter(|l| l.enabled)
            .filter_map(|l| {
                l.compiled.program.as_ref().map(|program| CompiledLever {
                    variable: l.definition.variable.clone(),
                    priority: l.definition.priority,
                    program: program.clone(),
                })
            })
            .collect();
        ordered.sort_by_key(|l| l.priority);
        ordered
    }

    /// Run one lever against a copy of `state`.
    ///
    /// Failures are reported in the returned status; nothing else is
    /// affected.
    pub fn check(
        &self,
        variable: &str,
        state: &State,
        rng: &mut dyn RngCore,
    ) -> Result<LeverStatus, LeverError> {
        let lever = self.lookup(variable)?;
        if !lever.compiled.is_ok() {
            return Ok(LeverStatus::Invalid {
                errors: lever.compiled.error_messages(),
            });
        }
        let Some(program) = &lever.compiled.program else {
            return Ok(LeverStatus::Blank);
        };

        let mut scratch = state.clone();
        scratch.reset_scratch();
        scratch.inputs.extend(self.inputs());
        match program.run(&mut scratch, rng) {
            Ok(()) => {
                trace!(variable, "Lever check passed");
                Ok(LeverStatus::Ok {
                    inspect: scratch.inspect,
                })
            }
            Err(err) => {
                warn!(variable, error = %err, "Lever check failed");
                Ok(LeverStatus::Failed {
                    message: err.to_string(),
                })
            }
        }
    }

    fn lookup(&self, variable: &str) -> Result<&Lever, LeverError> {
        self.index
            .get(variable)
            .map(|&i| &self.levers[i])
            .ok_or_else(|| LeverError::Unknown {
                variable: variable.to_string(),
            })
    }
}

impl Default for LeverRegistry {
    fn default() -> Self {
        Self::new(Compiler::default())
    }
}

fn lookup_mut<'a>(
    index: &HashMap<String, usize>,
    levers: &'a mut [Lever],
    variable: &str,
) -> Result<&'a mut Lever, LeverError> {
    match index.get(variable) {
        Some(&i) => Ok(&mut levers[i]),
        None => Err(LeverError::Unknown {
            variable: variable.to_string(),
        }),
    }
}
