use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_path(label: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir().join(format!("imgclass_cli_{label}_{}_{}.{ext}", std::process::id(), nanos))
}

#[test]
fn help_lists_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_imgclass"))
        .arg("--help")
        .output()
        .expect("run imgclass --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--model", "--image", "--labels", "--top-k", "--json"] {
        assert!(stdout.contains(flag), "help missing {flag}");
    }
}

#[test]
fn missing_model_fails() {
    let image = unique_temp_path("img", "png");
    image::RgbaImage::new(8, 8).save(&image).expect("write image");

    let output = Command::new(env!("CARGO_BIN_EXE_imgclass"))
        .arg("--model")
        .arg("/nonexistent/model.onnx")
        .arg("--image")
        .arg(&image)
        .output()
        .expect("run imgclass");
    std::fs::remove_file(&image).ok();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load model"));
}

#[test]
fn invalid_config_fails() {
    let config = unique_temp_path("cfg", "toml");
    std::fs::write(&config, "class_count = 0\n").expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_imgclass"))
        .args(["--model", "m.onnx", "--image", "i.png", "--config"])
        .arg(&config)
        .output()
        .expect("run imgclass");
    std::fs::remove_file(&config).ok();

    assert_eq!(output.status.code(), Some(7));
}
