use std::path::{Path, PathBuf};

use tw_app::{
    AppError, RunOverrides, RunProgressEvent, RunStage, compile_model, execution_order,
    history_csv, list_components, load_project, run, run_with_progress, save_project,
    write_history,
};
use tw_sim::{CancelToken, PortSide};

fn demo(name: &str) -> PathBuf {
    Path::new("../../demos/projects").join(name)
}

#[test]
fn series_demo_doubles_the_source() {
    let project = load_project(&demo("series_gain.yaml")).unwrap();
    let response = run(&project, &RunOverrides::default()).unwrap();

    assert_eq!(response.order, vec!["a", "b"]);
    assert_eq!(response.timing.steps, 1);
    assert!(response.report.is_none());
    assert_eq!(
        response.history.output_scalars("b", "y").unwrap(),
        vec![Some(10.0)]
    );
    assert_eq!(
        history_csv(&response.history, "b", PortSide::Output).unwrap(),
        "time_s,y\n0,10\n"
    );
}

#[test]
fn office_demo_discovers_and_runs_the_loop() {
    let project = load_project(&demo("office_pid.yaml")).unwrap();
    let mut compiled = compile_model(&project).unwrap();

    let report = compiled.report.as_ref().unwrap();
    assert_eq!(report.components.len(), 5);
    assert!(report.unresolved.is_empty());

    let listed = list_components(&compiled.model);
    assert_eq!(listed[0].id, "room_temperature");
    assert!(listed.iter().any(|c| c.id == "ctrl" && c.kind == "PidController" && c.role == "Controller"));

    let order = execution_order(&mut compiled.model).unwrap();
    let rank = |id: &str| order.iter().position(|o| o == id).unwrap();
    assert!(rank("temp_sensor") < rank("ctrl"));
    assert!(rank("ctrl") < rank("supply_damper"));
    assert!(rank("flow_meter") < rank("supply_total"));

    let response = run(&project, &RunOverrides::default()).unwrap();
    assert_eq!(response.timing.steps, 144);
    let signal = response.history.output_scalars("ctrl", "inputSignal").unwrap();
    assert!((signal[0].unwrap() - 0.15).abs() < 1e-12);
    assert!((signal[1].unwrap() - 0.165).abs() < 1e-12);

    let occupancy = response.history.output_scalars("occupancy", "scheduleValue").unwrap();
    assert_eq!(occupancy[41], Some(0.0));
    assert_eq!(occupancy[42], Some(1.0));
    assert_eq!(occupancy[105], Some(0.0));

    let flow = response.history.output_scalars("flow_meter", "measuredValue").unwrap();
    let total = response.history.output_scalars("supply_total", "y").unwrap();
    assert_eq!(flow, total);
}

#[test]
fn overrides_replace_the_simulation_section() {
    let project = load_project(&demo("series_gain.yaml")).unwrap();
    let overrides = RunOverrides {
        step_size_s: Some(10.0),
        ..RunOverrides::default()
    };
    let response = run(&project, &overrides).unwrap();
    assert_eq!(response.history.len(), 6);

    let too_small = RunOverrides {
        step_size_s: Some(1.0),
        max_steps: Some(5),
        ..RunOverrides::default()
    };
    assert!(matches!(run(&project, &too_small), Err(AppError::Simulation(_))));
}

#[test]
fn progress_stages_are_reported_in_order() {
    let project = load_project(&demo("series_gain.yaml")).unwrap();
    let mut events: Vec<RunProgressEvent> = Vec::new();
    run_with_progress(
        &project,
        &RunOverrides::default(),
        Some(&mut |e| events.push(e)),
        None,
    )
    .unwrap();

    let stages: Vec<RunStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&RunStage::CompilingModel));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(events.iter().any(|e| e.sim.is_some_and(|p| p.step == 1)));
}

#[test]
fn cancelled_runs_fail() {
    let project = load_project(&demo("office_pid.yaml")).unwrap();
    let token = CancelToken::new();
    token.cancel();
    let err = run_with_progress(&project, &RunOverrides::default(), None, Some(token)).unwrap_err();
    assert!(err.to_string().contains("cancelled"));
}

#[test]
fn invalid_connections_fail_validation() {
    let mut project = load_project(&demo("series_gain.yaml")).unwrap();
    project.connections[0].to = "missing".into();
    assert!(matches!(compile_model(&project), Err(AppError::Validation(_))));

    let mut project = load_project(&demo("series_gain.yaml")).unwrap();
    project.connections[0].to_port = "nope".into();
    assert!(matches!(compile_model(&project), Err(AppError::Compile(_))));
}

#[test]
fn missing_project_file_is_reported() {
    let err = load_project(Path::new("does/not/exist.yaml")).unwrap_err();
    assert!(matches!(err, AppError::ProjectFileRead { .. }));
}

#[test]
fn json_projects_roundtrip_and_histories_export() {
    let project = load_project(&demo("series_gain.yaml")).unwrap();
    let dir = std::env::temp_dir().join("tw_app_export");
    let json = dir.join("series.json");
    std::fs::create_dir_all(&dir).unwrap();
    save_project(&json, &project).unwrap();
    assert_eq!(load_project(&json).unwrap(), project);

    let response = run(&project, &RunOverrides::default()).unwrap();
    let written = write_history(&dir, &response.history).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a_output.csv", "b_input.csv", "b_output.csv"]);
    assert_eq!(
        std::fs::read_to_string(dir.join("b_input.csv")).unwrap(),
        "time_s,u\n0,5\n"
    );
}
