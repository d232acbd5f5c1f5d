#![cfg(unix)]

use mc_sweep::{
    extract::TIME_TOKEN, Executor, Extraction, Invocation, InvokeError, ProcessExecutor, Value,
};

fn sh(script: &str, env: &[(&str, &str)]) -> Invocation {
    Invocation {
        program: "sh".to_owned(),
        args: vec!["-c".to_owned(), script.to_owned()],
        env: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
    }
}

#[test]
fn test_stdout_is_captured_and_parsed() {
    let captured = ProcessExecutor
        .execute(&sh("echo avg=1.23 time=0.45", &[]))
        .unwrap();
    assert_eq!(captured.stdout.trim(), "avg=1.23 time=0.45");

    let record = Extraction::positional([("time", TIME_TOKEN)])
        .apply(&captured.stdout)
        .unwrap();
    assert_eq!(record.get("time"), Some(&Value::Float(0.45)));
}

#[test]
fn test_env_overlay_reaches_only_the_child() {
    let captured = ProcessExecutor
        .execute(&sh("echo \"$MC_SWEEP_TEST_SCHEDULE\"", &[("MC_SWEEP_TEST_SCHEDULE", "guided,25")]))
        .unwrap();
    assert_eq!(captured.stdout.trim(), "guided,25");
    assert!(std::env::var("MC_SWEEP_TEST_SCHEDULE").is_err());
}

#[test]
fn test_non_zero_exit_carries_the_code() {
    let err = ProcessExecutor.execute(&sh("exit 3", &[])).unwrap_err();
    assert!(matches!(err, InvokeError::ExitStatus { .. }));
    assert_eq!(err.code(), Some(3));
}

#[test]
fn test_missing_program_fails_to_spawn() {
    let inv = Invocation {
        program: "./definitely-not-a-monte-carlo-binary".to_owned(),
        args: Vec::new(),
        env: Vec::new(),
    };
    let err = ProcessExecutor.execute(&inv).unwrap_err();
    assert!(matches!(err, InvokeError::Spawn { .. }));
    assert_eq!(err.code(), None);
}
