//! Lever scripts run end to end through the public API.

use indoc::indoc;
use plastics::{Compiler, ErrorKind, State};
use pretty_assertions::assert_eq;

#[macro_use]
mod cases;

use cases::{Case, read};

fn china() -> Case {
    Case::year(2024)
        .with("china", "eolLandfillMT", 40.0)
        .with("china", "eolRecyclingMT", 10.0)
        .with("china", "eolIncinerationMT", 10.0)
        .with("china", "consumptionAgricultureMT", 2.0)
        .with("china", "consumptionPackagingMT", 3.0)
        .with("eu30", "eolLandfillMT", 50.0)
        .with("eu30", "eolIncinerationMT", 20.0)
}

script_case! {
    name: recycling_target_ramp,
    given: china().input("recyclingTarget", 1.0),
    script: indoc! {"
        // Phase in a recycling target and move landfill into recycling.
        var goal = in.recyclingTarget / 4;
        change goal by 0.5 over 2020 to 2028;
        distribute out.china.eolLandfillMT * goal
            across [out.china.eolRecyclingMT] linearly;
        out.china.eolLandfillMT = out.china.eolLandfillMT * (1 - goal);
    "},
    expect: [
        "local.goal" => 0.5,
        "out.china.eolRecyclingMT" => 30.0,
        "out.china.eolLandfillMT" => 20.0,
    ],
}

script_case! {
    name: one_sided_cap_with_hash_comment,
    given: china(),
    script: indoc! {"
        # Cap landfill growth in the EU.
        var landfill = out.eu30.eolLandfillMT * 2;
        limit landfill to [, 70];
        out.eu30.eolLandfillMT = landfill;
    "},
    expect: ["out.eu30.eolLandfillMT" => 70.0],
}

script_case! {
    name: floor_only_limit,
    given: china(),
    script: "var floor = 100; limit floor to [200, ]; out.eu30.eolLandfillMT = floor;",
    expect: ["out.eu30.eolLandfillMT" => 200.0],
}

script_case! {
    name: weighted_shift_across_regions,
    given: china().input("shift", 8.0),
    script: indoc! {"
        distribute in.shift across [
            out.china.eolIncinerationMT by 1,
            out.eu30.eolIncinerationMT by 3,
        ] proportionally;
    "},
    expect: [
        "out.china.eolIncinerationMT" => 12.0,
        "out.eu30.eolIncinerationMT" => 26.0,
    ],
}

script_case! {
    name: consumption_lifecycle_is_weighted_by_magnitude,
    given: china()
        .input("consumptionAgricultureLifecycle", 1.0)
        .input("consumptionPackagingLifecycle", 10.0),
    script: indoc! {"
        var life = lifecycle of [
            out.china.consumptionAgricultureMT,
            out.china.consumptionPackagingMT
        ];
        out.china.averageLifecycle = life;
    "},
    expect: ["out.china.averageLifecycle" => 6.4],
}

script_case! {
    name: waste_lifecycle_uses_recycling_delay,
    given: china().input("recyclingDelay", 3.0),
    script: "out.china.delay = lifecycle of [out.china.eolLandfillMT, out.eu30.eolIncinerationMT];",
    expect: ["out.china.delay" => 3.0],
}

script_case! {
    name: conditional_on_year,
    given: china(),
    script: "out.china.eolRecyclingMT = 1 if meta.year >= 2024 else 2;",
    expect: ["out.china.eolRecyclingMT" => 1.0],
}

script_case! {
    name: averaged_constant_repeats,
    given: china(),
    script: "out.china.eolRecyclingMT = average 4 repeats of (out.china.eolRecyclingMT + 1);",
    expect: ["out.china.eolRecyclingMT" => 11.0],
}

script_case! {
    name: exponent_is_right_associative,
    given: china(),
    script: "out.china.eolRecyclingMT = 2 ^ 3 ^ 2 - -1;",
    expect: ["out.china.eolRecyclingMT" => 513.0],
}

script_case! {
    name: syntax_error_is_reported,
    given: china(),
    script: "var a = ;",
    error: ErrorKind::Syntax,
}

script_case! {
    name: dotted_definition_is_compile_error,
    given: china(),
    script: "var out.china.x = 1;",
    error: ErrorKind::Compile,
}

script_case! {
    name: mixed_lifecycle_fails_at_runtime,
    given: china(),
    script: "var a = lifecycle of [out.china.eolLandfillMT, out.china.consumptionPackagingMT];",
    error: ErrorKind::Runtime,
}

script_case! {
    name: backwards_change_fails_at_runtime,
    given: china(),
    script: "var a = 1; change a by 10 over 2045 to 2025;",
    error: ErrorKind::Runtime,
}

script_case! {
    name: missing_region_fails_at_runtime,
    given: china(),
    script: "out.japan.eolLandfillMT = 1;",
    error: ErrorKind::Runtime,
}

#[test]
fn comment_only_script_has_no_program() {
    let result = Compiler::default().compile(indoc! {"
        // Nothing to do yet.
        # Still nothing.
    "});
    assert!(result.is_ok());
    assert!(result.program.is_none());

    let state = china().run("   \n\t").unwrap();
    assert_eq!(state, *china().state());
}

#[test]
fn inspect_records_source_text() {
    let state = china()
        .run("inspect out.china.eolRecyclingMT * 2;\ninspect 1 + 1;")
        .unwrap();
    let records: Vec<(&str, f64)> = state
        .inspect
        .iter()
        .map(|r| (r.name.as_str(), r.value))
        .collect();
    assert_eq!(
        records,
        vec![("out.china.eolRecyclingMT*2", 20.0), ("1+1", 2.0)]
    );
}

#[test]
fn recompiled_script_gives_identical_state() {
    let script = indoc! {"
        var share = out.china.eolLandfillMT / (out.china.eolLandfillMT + out.eu30.eolLandfillMT);
        distribute 9 * share across [out.china.eolRecyclingMT, out.china.eolIncinerationMT] proportionally;
        limit share to [0, 0.25];
        inspect share;
    "};
    let first: State = china().run(script).unwrap();
    let second: State = china().run(script).unwrap();
    assert_eq!(first, second);
    assert_eq!(read(&first, "local.share"), 0.25);
}

#[test]
fn seeded_draws_repeat() {
    let script = "out.china.eolRecyclingMT = draw uniformly from 0 to 1;";
    let first = china().seed(9).run(script).unwrap();
    let second = china().seed(9).run(script).unwrap();
    let value = read(&first, "out.china.eolRecyclingMT");
    assert!((0.0..=1.0).contains(&value));
    assert_eq!(value, read(&second, "out.china.eolRecyclingMT"));
}
