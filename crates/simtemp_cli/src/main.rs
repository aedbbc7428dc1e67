//! # SimTemp CLI
//!
//! Ferramenta de linha de comando para o device `nxp_simtemp`.
//!
//! ## Uso
//! ```bash
//! simtemp_cli                 # lê amostras indefinidamente
//! simtemp_cli --count 10      # lê 10 amostras e sai
//! simtemp_cli get             # limiar atual (milésimos de °C)
//! simtemp_cli set 25000       # grava limiar (milésimos de °C)
//! simtemp_cli stats           # contadores do módulo
//! simtemp_cli --config <path> # config.toml alternativo
//! ```

use simtemp_core::config::AppConfig;
use simtemp_core::source::{KernelDevice, TelemetrySource};
use simtemp_core::store::{ConfigStore, SysfsBackend};
use simtemp_core::Sample;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info};

/// Ação pedida na linha de comando.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Get,
    Set(i32),
    Stats,
    Stream { count: Option<u64> },
}

fn parse_args(args: &[String]) -> Result<Action, String> {
    let mut count = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "get" => return Ok(Action::Get),
            "stats" => return Ok(Action::Stats),
            "set" => {
                let raw = args.get(i + 1).ok_or("set requer um valor")?;
                let value = raw
                    .parse::<i32>()
                    .map_err(|_| format!("Valor inválido para set: {raw}"))?;
                return Ok(Action::Set(value));
            }
            "--count" => {
                let raw = args.get(i + 1).ok_or("--count requer um número")?;
                count = Some(
                    raw.parse::<u64>()
                        .map_err(|_| format!("Valor inválido para --count: {raw}"))?,
                );
                i += 1;
            }
            "--config" => i += 1,
            other => return Err(format!("Argumento desconhecido: {other}")),
        }
        i += 1;
    }
    Ok(Action::Stream { count })
}

/// `2025-01-01T12:00:00.123Z temp=23.4C alert=0`
fn format_sample(now: chrono::DateTime<chrono::Utc>, sample: &Sample) -> String {
    format!(
        "{} temp={:.1}C alert={}",
        now.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        sample.temp_c(),
        sample.alert_flag
    )
}

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let action = match parse_args(&args) {
        Ok(action) => action,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let config = AppConfig::load(&AppConfig::path_from_args(&args));
    let store = ConfigStore::new(SysfsBackend::new(&config.store.dir));

    match action {
        Action::Get => match store.read_threshold_milli() {
            Ok(t) => {
                println!("Threshold atual: {t}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Erro lendo threshold: {e}");
                ExitCode::FAILURE
            }
        },
        Action::Set(t) => match store.write_threshold_milli(t) {
            Ok(()) => {
                println!("Threshold atualizado a {t}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Erro escrevendo threshold: {e}");
                ExitCode::FAILURE
            }
        },
        Action::Stats => match store.read_stats() {
            Ok(s) => {
                println!(
                    "samples={} invalid_writes={} alerts={}",
                    s.samples, s.invalid_writes, s.alerts
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Erro lendo stats: {e}");
                ExitCode::FAILURE
            }
        },
        Action::Stream { count } => stream(&config, &store, count),
    }
}

fn stream(config: &AppConfig, store: &ConfigStore<SysfsBackend>, count: Option<u64>) -> ExitCode {
    if !config.device.path.exists() {
        error!("Erro abrindo o device {}", config.device.path.display());
        return ExitCode::FAILURE;
    }

    let timeout = Duration::from_millis(config.device.read_timeout_ms);
    let mut device = KernelDevice::new(&config.device.path, timeout);

    println!("Lendo de {}...", config.device.path.display());
    if let Ok(t) = store.read_threshold_milli() {
        println!("Threshold atual: {t}");
    }

    // Espera entre tentativas falhas: o período do módulo, se disponível
    let retry = store
        .read_sampling_interval()
        .map(|ms| Duration::from_millis(u64::from(ms)))
        .unwrap_or(timeout);

    let mut reads = 0u64;
    while count.is_none_or(|max| reads < max) {
        match device.poll() {
            Ok(sample) => {
                println!("{}", format_sample(chrono::Utc::now(), &sample));
                reads += 1;
            }
            Err(e) => {
                debug!("{e}");
                std::thread::sleep(retry);
            }
        }
    }

    info!("{reads} amostras lidas");
    ExitCode::SUCCESS
}
