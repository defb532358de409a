//! End-to-end tests for the inkwell binary
//!
//! Every test points the config layers at a temporary directory so nothing
//! from the host's own configuration leaks in. None of them need a device.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn inkwell(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_inkwell"))
        .args(args)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_STATE_HOME", home.join("state"))
        .env("INKWELL_PROJECT_CONFIG_DIR", home.join("project"))
        .env_remove("INKWELL_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run inkwell")
}

fn add_plugin(root: &Path, name: &str, entry: &str, enabled: bool, config: &str) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("plugin.toml"), format!("entry = \"{entry}\"\n")).unwrap();
    std::fs::write(
        dir.join("config.json"),
        format!("{{\"enabled\": {enabled}, \"config\": {config}}}"),
    )
    .unwrap();
}

/// Writes a config whose plugin dir is `<home>/plugins`, returns its path
fn config_file(home: &Path) -> String {
    let plugins = home.join("plugins");
    std::fs::create_dir_all(&plugins).unwrap();
    let path = home.join("inkwell.toml");
    std::fs::write(
        &path,
        format!("[plugins]\ndir = {:?}\n", plugins.display().to_string()),
    )
    .unwrap();
    path.display().to_string()
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    let output = inkwell(home.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["run", "plugins", "render", "status"] {
        assert!(stdout.contains(command), "missing {command} in:\n{stdout}");
    }
}

#[test]
fn plugins_lists_discovered_plugins() {
    let home = TempDir::new().unwrap();
    let config = config_file(home.path());
    add_plugin(&home.path().join("plugins"), "kitchen", "clock", true, "{}");
    add_plugin(
        &home.path().join("plugins"),
        "notice",
        "message",
        false,
        r#"{"title": "Hello"}"#,
    );

    let output = inkwell(home.path(), &["--config", &config, "plugins"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kitchen"));
    assert!(stdout.contains("notice"));
    assert!(stdout.contains("message"));
}

#[test]
fn render_with_explicit_size_writes_png() {
    let home = TempDir::new().unwrap();
    let config = config_file(home.path());
    add_plugin(
        &home.path().join("plugins"),
        "notice",
        "message",
        true,
        r#"{"title": "Hello", "body": "Back at five"}"#,
    );
    let out = home.path().join("notice.png");

    let output = inkwell(
        home.path(),
        &[
            "--config",
            &config,
            "render",
            "notice",
            "--out",
            &out.display().to_string(),
            "--width",
            "320",
            "--height",
            "200",
        ],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let png = std::fs::read(&out).unwrap();
    assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[test]
fn render_unknown_plugin_fails() {
    let home = TempDir::new().unwrap();
    let config = config_file(home.path());
    let out = home.path().join("missing.png");

    let output = inkwell(
        home.path(),
        &[
            "--config",
            &config,
            "render",
            "missing",
            "--out",
            &out.display().to_string(),
            "--width",
            "10",
            "--height",
            "10",
        ],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No plugin named 'missing'"));
    assert!(!out.exists());
}

#[test]
fn run_without_api_config_fails() {
    let home = TempDir::new().unwrap();
    let config = config_file(home.path());

    let output = inkwell(home.path(), &["--config", &config, "run"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("api.base_url"));
}

#[test]
fn demo_plugins_are_listed_without_template() {
    let home = TempDir::new().unwrap();
    let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/plugins");
    let config = home.path().join("demo.toml");
    std::fs::write(
        &config,
        format!("[plugins]\ndir = {:?}\n", demos.display().to_string()),
    )
    .unwrap();

    let output = inkwell(
        home.path(),
        &["--config", &config.display().to_string(), "plugins"],
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("clock"));
    assert!(stdout.contains("message"));
    assert!(!stdout.contains("example"));
}
