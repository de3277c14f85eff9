use std::fs;
use std::path::{Path, PathBuf};

use winecap::capsule::{Capsule, Metadata};
use winecap::error::Error;
use winecap::launch::{self, LaunchEnv, RUNTIME_BIN_ENV};

mod helpers;
use helpers::{unique_test_temp_dir, EnvVarGuard};

fn make_bundle(dir: &Path) -> PathBuf {
    let bundle = dir.join("Game.AppImage");
    fs::create_dir_all(bundle.join("game")).expect("create bundle dirs");
    bundle
}

/// Write an executable shell script standing in for the umu runtime.
fn fake_runtime(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-umu-run");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake runtime");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).expect("stat fake runtime").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod fake runtime");
    }

    path
}

#[test]
fn child_exit_codes_propagate_unchanged() {
    for code in [0, 1, 137] {
        let dir = unique_test_temp_dir(&format!("exit-{code}"));
        let bundle = make_bundle(&dir);
        let runtime = fake_runtime(&dir, &format!("exit {code}"));
        let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, &runtime);

        let got = launch::launch(&bundle, "game.exe", &[]).expect("launch should run");
        assert_eq!(got, code, "exit code {code} must come back unchanged");
    }
}

#[test]
fn first_launch_creates_prefix_and_cache() {
    let dir = unique_test_temp_dir("first-launch");
    let bundle = make_bundle(&dir);
    let runtime = fake_runtime(&dir, "exit 0");
    let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, &runtime);

    launch::launch(&bundle, "game.exe", &[]).expect("first launch");

    let capsule = Capsule::open(&bundle).expect("open capsule");
    assert!(
        capsule.prefix_path().is_dir(),
        "prefix/ must exist after a first launch"
    );
    assert!(
        capsule.cache_path().is_dir(),
        "cache/ must exist after a first launch"
    );
}

#[test]
fn launch_initializes_home_exactly_once() {
    let dir = unique_test_temp_dir("launch-init");
    let bundle = make_bundle(&dir);
    let runtime = fake_runtime(&dir, "exit 0");
    let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, &runtime);

    launch::launch(&bundle, "game.exe", &[]).expect("first launch");

    let capsule = Capsule::open(&bundle).expect("open capsule");
    assert!(capsule.prefix_path().is_dir());
    assert!(capsule.cache_path().is_dir());

    // Dirty the prefix, launch again: initialization must not touch it.
    fs::write(capsule.prefix_path().join("state.marker"), "x").expect("write marker");
    launch::launch(&bundle, "game.exe", &[]).expect("second launch");
    assert!(capsule.prefix_path().join("state.marker").is_file());
}

#[test]
fn arguments_pass_through_verbatim() {
    let dir = unique_test_temp_dir("args");
    let bundle = make_bundle(&dir);
    let out = dir.join("argv.txt");
    let runtime = fake_runtime(&dir, &format!(r#"printf '%s\n' "$@" > "{}""#, out.display()));
    let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, &runtime);

    let args = vec!["--fullscreen".to_string(), "-w 1280".to_string()];
    launch::launch(&bundle, "game.exe", &args).expect("launch");

    let recorded = fs::read_to_string(&out).expect("read recorded argv");
    // Executable name first, then launch args word-for-word; the embedded
    // space survives as a single argument.
    assert_eq!(recorded, "game.exe\n--fullscreen\n-w 1280\n");
}

#[test]
fn sandbox_environment_reaches_the_child() {
    let dir = unique_test_temp_dir("env-contract");
    let bundle = make_bundle(&dir);
    let out = dir.join("env.txt");
    let runtime = fake_runtime(
        &dir,
        &format!(
            r#"printf '%s\n' "$WINEPREFIX" "$WINEDEBUG" "$WINE_LARGE_ADDRESS_AWARE" "$DXVK_STATE_CACHE_PATH" "$__GL_SHADER_DISK_CACHE_PATH" > "{}""#,
            out.display()
        ),
    );
    let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, &runtime);

    launch::launch(&bundle, "game.exe", &[]).expect("launch");

    let capsule = Capsule::open(&bundle).expect("open capsule");
    let lines: Vec<String> = fs::read_to_string(&out)
        .expect("read recorded env")
        .lines()
        .map(str::to_string)
        .collect();

    assert_eq!(lines[0], capsule.prefix_path().display().to_string());
    assert_eq!(lines[1], "-all");
    assert_eq!(lines[2], "1");
    assert_eq!(lines[3], capsule.cache_path().display().to_string());
    assert_eq!(lines[4], capsule.cache_path().display().to_string());
}

#[test]
fn child_runs_in_the_bundled_game_directory() {
    let dir = unique_test_temp_dir("cwd");
    let bundle = make_bundle(&dir);
    let out = dir.join("cwd.txt");
    let runtime = fake_runtime(&dir, &format!(r#"pwd > "{}""#, out.display()));
    let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, &runtime);

    launch::launch(&bundle, "game.exe", &[]).expect("launch");

    let cwd = fs::read_to_string(&out).expect("read recorded cwd");
    let capsule = Capsule::open(&bundle).expect("open capsule");
    assert_eq!(
        PathBuf::from(cwd.trim()),
        capsule.bundle_path().join("game")
    );
}

#[test]
fn missing_runtime_is_fatal_before_any_sandbox_work() {
    let dir = unique_test_temp_dir("runtime-missing");
    let bundle = make_bundle(&dir);
    let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, dir.join("does-not-exist"));

    let err = launch::launch(&bundle, "game.exe", &[]).expect_err("launch must fail");
    let runtime_missing = err
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<Error>(), Some(Error::RuntimeMissing)));
    assert!(runtime_missing, "expected RuntimeMissing, got: {err:#}");

    // One-time home creation is allowed to have happened; the prefix itself
    // must still be untouched.
    let capsule = Capsule::open(&bundle).expect("open capsule");
    let entries = fs::read_dir(capsule.prefix_path()).expect("read prefix").count();
    assert_eq!(entries, 0);
}

#[test]
fn failed_launch_releases_the_prefix_lock() {
    let dir = unique_test_temp_dir("lock-error-path");
    let bundle = make_bundle(&dir);

    {
        let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, dir.join("does-not-exist"));
        launch::launch(&bundle, "game.exe", &[]).expect_err("missing runtime must fail");
    }

    // If the failed launch leaked its lock, this acquisition would block
    // forever instead of running.
    let runtime = fake_runtime(&dir, "exit 0");
    let _env = EnvVarGuard::set(RUNTIME_BIN_ENV, &runtime);
    let code = launch::launch(&bundle, "game.exe", &[]).expect("relaunch after failure");
    assert_eq!(code, 0);
}

#[test]
fn overlay_toggle_flows_into_the_env_contract() {
    let dir = unique_test_temp_dir("hud-toggle");
    let bundle = make_bundle(&dir);
    let capsule = Capsule::open(&bundle).expect("open capsule");
    capsule.init_home().expect("init");

    let off = LaunchEnv::for_capsule(&capsule, &Metadata::default());
    assert!(!off.vars().iter().any(|(k, _)| k == "DXVK_HUD"));

    let metadata = Metadata {
        dxvk_hud: true,
        ..Metadata::default()
    };
    let on = LaunchEnv::for_capsule(&capsule, &metadata);
    assert!(on
        .vars()
        .iter()
        .any(|(k, v)| k == "DXVK_HUD" && v == "fps"));
}
