use std::{env, fs, path::PathBuf, process::Command};

const CONFIG: &str = r#"
seed = 2024

[human]
count = 120
infected_fraction = 0.25
recovery_rate = 0.05
transmission_rate = 0.6
move_speed = 1.0
density = 1.0
scale = 10.0

[mosquito]
count = 60
infected_fraction = 0.1
recovery_rate = 0.02
transmission_rate = 0.5
move_speed = 3.0
density = 1.0
scale = 3.0

[bite]
rate = 0.5
length = 1.0

[world]
half_extent = 2000.0
day_length = 5.0
max_speed = 10.0
speed = 2.0

[output]
frame_dt = 0.05
days_per_file = 3
"#;

fn run_bin(args: &[&str]) -> String {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_vectorsim"));

    let output = Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );

    stdout_str.to_string()
}

fn test_dir(name: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(test_dir.join("config.toml"), CONFIG).expect("failed to write config file");
    test_dir
}

#[test]
fn basic_workflow() {
    let test_dir = test_dir("basic_workflow");
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "create"]);
    run_bin(&["--sim-dir", test_dir_str, "create"]);

    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "0"]);
    run_bin(&["--sim-dir", test_dir_str, "resume", "--run-idx", "1"]);

    for run in ["run-0000", "run-0001"] {
        let run_dir = test_dir.join(run);
        assert!(run_dir.join("checkpoint.msgpack").is_file());
        assert!(run_dir.join("trajectory-0000.msgpack").is_file());
        assert!(run_dir.join("trajectory-0001.msgpack").is_file());
    }

    run_bin(&["--sim-dir", test_dir_str, "analyze"]);

    let results = fs::read_to_string(test_dir.join("run-0000").join("results.toml"))
        .expect("failed to read results");
    let results: toml::Table = toml::from_str(&results).expect("failed to parse results");
    assert_eq!(results["run"]["n_days"].as_integer(), Some(6));
    assert!(results.contains_key("human_difference"));
    assert!(results.contains_key("mosquito_fractions"));

    // Same seed, same trajectory.
    let traj_0 = fs::read(test_dir.join("run-0000").join("trajectory-0000.msgpack")).unwrap();
    let traj_1 = fs::read(test_dir.join("run-0001").join("trajectory-0000.msgpack")).unwrap();
    assert_eq!(traj_0, traj_1);

    run_bin(&["--sim-dir", test_dir_str, "clean"]);
    assert!(!test_dir.join("run-0000").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn presets_workflow() {
    let test_dir = test_dir("presets_workflow");
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    run_bin(&["--sim-dir", test_dir_str, "preset", "save", "--name", "fast"]);
    run_bin(&["--sim-dir", test_dir_str, "preset", "save", "--name", "baseline"]);

    let listed = run_bin(&["--sim-dir", test_dir_str, "preset", "list"]);
    assert_eq!(listed.lines().collect::<Vec<_>>(), vec!["baseline", "fast"]);

    run_bin(&["--sim-dir", test_dir_str, "create", "--preset", "fast"]);
    assert!(test_dir.join("run-0000").join("trajectory-0000.msgpack").is_file());

    let bin = PathBuf::from(env!("CARGO_BIN_EXE_vectorsim"));
    let status = Command::new(bin)
        .args(["--sim-dir", test_dir_str, "create", "--preset", "missing"])
        .status()
        .expect("failed to execute command");
    assert!(!status.success());

    fs::remove_dir_all(&test_dir).ok();
}
