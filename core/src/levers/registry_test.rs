use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::state::State;
use crate::test_utils::init_test_logging;

fn lever(variable: &str, priority: i32, script: &str) -> LeverDefinition {
    LeverDefinition {
        variable: variable.to_string(),
        priority,
        units: "%".to_string(),
        script: script.to_string(),
        default_value: 0.0,
    }
}

fn registry(levers: &[LeverDefinition]) -> LeverRegistry {
    init_test_logging();
    let mut registry = LeverRegistry::default();
    for definition in levers {
        registry.register(definition.clone());
    }
    registry
}

fn order(registry: &LeverRegistry) -> Vec<String> {
    registry.ordered().into_iter().map(|l| l.variable).collect()
}

#[test]
fn test_priority_order_is_stable() {
    let registry = registry(&[
        lever("late", 10, "var x = 1;"),
        lever("first", 1, "var x = 1;"),
        lever("tie_a", 5, "var x = 1;"),
        lever("tie_b", 5, "var x = 1;"),
    ]);
    assert_eq!(order(&registry), vec!["first", "tie_a", "tie_b", "late"]);
}

#[test]
fn test_disabled_blank_and_invalid_levers_are_not_ordered() {
    let mut registry = registry(&[
        lever("ok", 1, "var x = 1;"),
        lever("blank", 1, "   "),
        lever("broken", 1, "var x = ;"),
        lever("off", 1, "var x = 1;"),
    ]);
    registry.set_enabled("off", false).unwrap();
    assert_eq!(order(&registry), vec!["ok"]);
    assert!(registry.inputs().contains_key("off"));
}

#[test]
fn test_default_value_and_set_value() {
    let mut definition = lever("rate", 1, "var x = in.rate;");
    definition.default_value = 25.0;
    let mut registry = registry(&[definition]);
    assert_eq!(registry.value("rate"), Ok(25.0));

    registry.set_value("rate", 40.0).unwrap();
    assert_eq!(registry.inputs().get("rate"), Some(&40.0));
}

#[test]
fn test_update_script_recompiles_only_on_change() {
    let mut registry = registry(&[lever("a", 1, "var x = 1;")]);
    let before = registry.ordered()[0].program.clone();

    registry.update_script("a", "var x = 1;").unwrap();
    assert!(Arc::ptr_eq(&before, &registry.ordered()[0].program));

    registry.update_script("a", "var x = 2;").unwrap();
    assert!(!Arc::ptr_eq(&before, &registry.ordered()[0].program));

    let result = registry.update_script("a", "var x = ").unwrap();
    assert!(!result.is_ok());
    assert!(registry.ordered().is_empty());
}

#[test]
fn test_unknown_lever() {
    let mut registry = registry(&[]);
    assert_eq!(
        registry.set_value("nope", 1.0),
        Err(LeverError::Unknown {
            variable: "nope".to_string()
        })
    );
}

#[test]
fn test_check_reports_status_per_lever() {
    let registry = registry(&[
        lever("good", 1, "inspect in.good * 2;"),
        lever("bad", 2, "out.region.x = 1;"),
        lever("broken", 3, "var = 1;"),
        lever("blank", 4, ""),
    ]);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut state = State::for_year(2030);
    state.local.insert("leftover".to_string(), 1.0);

    let good = registry.check("good", &state, &mut rng).unwrap();
    assert_eq!(
        good,
        LeverStatus::Ok {
            inspect: vec![crate::state::InspectRecord {
                name: "in.good*2".to_string(),
                value: 0.0,
            }]
        }
    );

    let bad = registry.check("bad", &state, &mut rng).unwrap();
    assert_eq!(
        bad,
        LeverStatus::Failed {
            message: "Could not find region (out.region.x)".to_string()
        }
    );

    assert!(matches!(
        registry.check("broken", &state, &mut rng).unwrap(),
        LeverStatus::Invalid { errors } if errors.len() == 1
    ));
    assert_eq!(
        registry.check("blank", &state, &mut rng).unwrap(),
        LeverStatus::Blank
    );

    // The caller's state is never touched.
    assert!(state.inspect.is_empty());
    assert_eq!(state.local.len(), 1);
}
