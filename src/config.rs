use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub session: SessionTuning,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_samples: usize,
    /// Input device name; system default when omitted
    pub device: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SttConfig {
    pub nats_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionTuning {
    /// Seconds a stop waits for the final result before force-closing
    pub stop_grace_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
