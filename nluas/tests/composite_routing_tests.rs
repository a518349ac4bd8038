use nluas::templates::TemplateCatalog;
use nluas::transport::InMemoryTransport;
use nluas::{ActionOutput, CapabilityRegistry, CoreSolver, Predicate, SolverConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};

fn new_solver(registry: CapabilityRegistry) -> (CoreSolver, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    let solver = CoreSolver::new(SolverConfig::default(), registry, transport.clone());
    (solver, transport)
}

fn composite(kind: &str, first: &str, second: &str) -> Value {
    json!({
        "predicate_type": "command",
        "eventDescriptor": {
            "eventProcess": {
                "complexKind": kind,
                "process1": {"actionary": first, "template": "MotionPath"},
                "process2": {"actionary": second, "template": "MotionPath"}
            }
        }
    })
}

#[test]
fn test_causal_composite_is_reported_incapable() {
    let registry = CapabilityRegistry::with_handlers(|r| {
        r.register(Predicate::Command, "push", |_| Ok(ActionOutput::none()));
        r.register(Predicate::Command, "fall", |_| Ok(ActionOutput::none()));
    });
    let (mut solver, transport) = new_solver(registry);

    assert!(solver.handle_message(composite("causal", "push", "fall")));

    assert_eq!(
        transport.messages_of_type("id_failure"),
        vec![json!({
            "type": "id_failure",
            "message": "I cannot do that yet.",
            "tag": "FED1_ProblemSolver"
        })]
    );
    assert!(solver.history().is_empty());
}

#[test]
fn test_serial_continues_past_unknown_first_step() {
    let registry = CapabilityRegistry::with_handlers(|r| {
        r.register(Predicate::Command, "stop", |_| Ok(ActionOutput::none()));
    });
    let (mut solver, transport) = new_solver(registry);

    assert!(solver.handle_message(composite("serial", "dance", "stop")));

    assert_eq!(
        transport.messages_of_type("id_failure"),
        vec![json!({
            "type": "id_failure",
            "message": "I cannot solve the 'command_dance' action",
            "tag": "FED1_ProblemSolver"
        })]
    );
    let attempts: Vec<(String, bool)> = solver
        .history()
        .entries()
        .map(|e| (e.parameters.actionary.clone(), e.succeeded))
        .collect();
    assert_eq!(
        attempts,
        vec![("stop".to_string(), true), ("dance".to_string(), false)]
    );
}

#[test]
fn test_unknown_composite_kind_is_malformed() {
    let (mut solver, transport) = new_solver(CapabilityRegistry::new());

    assert!(solver.handle_message(composite("parallel", "a", "b")));

    let failures = transport.messages_of_type("id_failure");
    assert_eq!(failures.len(), 1);
    assert!(failures[0]["message"].as_str().unwrap().contains("parallel"));
    assert!(solver.history().is_empty());
}

#[test]
fn test_handlers_see_scoped_features() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let registry = CapabilityRegistry::with_handlers(move |r| {
        r.register(Predicate::Command, "move", move |call| {
            sink.lock().unwrap().push((
                call.features.lookup("speed").cloned(),
                call.features.lookup("tense").cloned(),
            ));
            Ok(ActionOutput::none())
        });
    });
    let (mut solver, _) = new_solver(registry);

    solver
        .solve(json!({
            "predicate_type": "command",
            "eventDescriptor": {
                "e_features": {"eventFeatures": {"tense": "present", "speed": "normal"}},
                "eventProcess": {
                    "complexKind": "serial",
                    "process1": {
                        "actionary": "move",
                        "template": "MotionPath",
                        "p_features": {"processFeatures": {"speed": "fast"}}
                    },
                    "process2": {"actionary": "move", "template": "MotionPath"}
                }
            }
        }))
        .unwrap();

    // process features of the first step do not leak into the second
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (Some(json!("fast")), Some(json!("present"))),
            (Some(json!("normal")), Some(json!("present"))),
        ]
    );
}

#[test]
fn test_templates_reach_handlers() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"MotionPath": {{"heading": null, "goal": null}}}}"#
    )
    .unwrap();

    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let registry = CapabilityRegistry::with_handlers(move |r| {
        r.register(Predicate::Command, "move", move |call| {
            *sink.lock().unwrap() = call.template.cloned();
            Ok(ActionOutput::none())
        });
    });
    let transport = Arc::new(InMemoryTransport::new());
    let config = SolverConfig {
        templates_path: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let mut solver = CoreSolver::from_config(config, registry, transport).unwrap();

    solver
        .solve(json!({
            "predicate_type": "command",
            "eventDescriptor": {"eventProcess": {"actionary": "move", "template": "MotionPath"}}
        }))
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        Some(json!({"heading": null, "goal": null}))
    );
}

#[test]
fn test_missing_template_file_fails_startup() {
    let config = SolverConfig {
        templates_path: Some("/nonexistent/parameter_templates.json".into()),
        ..Default::default()
    };
    let err = CoreSolver::from_config(
        config,
        CapabilityRegistry::new(),
        Arc::new(InMemoryTransport::new()),
    )
    .unwrap_err();
    assert!(err.to_string().contains("parameter_templates.json"));
}

#[test]
fn test_template_catalog_keeps_declaration_order() {
    let catalog = TemplateCatalog::from_json_str(r#"{"Grasp": {"object": null}, "Lift": {"height": null}}"#).unwrap();
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Grasp", "Lift"]);
}
