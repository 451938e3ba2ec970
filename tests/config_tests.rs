// Tests for configuration loading
//
// Config::load is the only way a Config is built, so these pin the TOML
// shape the service ships with and the error on a missing file.

use anyhow::Result;
use std::fs;
use tempfile::TempDir;
use voiceline::Config;

#[test]
fn test_load_reads_every_section() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("voiceline.toml"),
        r#"
[service]
name = "voiceline-test"

[service.http]
bind = "0.0.0.0"
port = 9900

[audio]
sample_rate = 32000
channels = 2
chunk_samples = 2048
device = "USB Audio"

[stt]
nats_url = "nats://stt.internal:4222"

[session]
stop_grace_secs = 5
"#,
    )?;

    // The CLI passes the path without an extension, as in "config/voiceline".
    let path = dir.path().join("voiceline");
    let config = Config::load(path.to_str().unwrap())?;

    assert_eq!(config.service.name, "voiceline-test");
    assert_eq!(config.service.http.bind, "0.0.0.0");
    assert_eq!(config.service.http.port, 9900);
    assert_eq!(config.audio.sample_rate, 32000);
    assert_eq!(config.audio.channels, 2);
    assert_eq!(config.audio.chunk_samples, 2048);
    assert_eq!(config.audio.device.as_deref(), Some("USB Audio"));
    assert_eq!(config.stt.nats_url, "nats://stt.internal:4222");
    assert_eq!(config.session.stop_grace_secs, 5);
    Ok(())
}

#[test]
fn test_shipped_sample_config_parses() -> Result<()> {
    // Test binaries run from the crate root, where the sample lives.
    let config = Config::load("config/voiceline")?;

    assert_eq!(config.service.name, "voiceline");
    assert_eq!(config.service.http.port, 8745);
    assert_eq!(config.audio.sample_rate, 16000);
    assert_eq!(config.audio.channels, 1);
    assert_eq!(config.audio.device, None);
    assert_eq!(config.session.stop_grace_secs, 3);
    Ok(())
}

#[test]
fn test_load_missing_file_is_an_error() {
    assert!(Config::load("/nonexistent/voiceline").is_err());
}
