//! Configuração: estado em runtime (com origem) e arquivo TOML.
//!
//! [`Config`] é o que o loop usa e exibe: limiar, amostragem e modo, cada
//! um com a [`Origin`] da última atribuição. [`AppConfig`] é o
//! `config.toml` com paths e períodos dos binários.

use crate::types::{Mode, Origin};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ──────────────────────────────────────────────
// Configuração em runtime
// ──────────────────────────────────────────────

/// Valor com a origem da última atribuição.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tracked<T> {
    pub value: T,
    pub origin: Origin,
}

impl<T> Tracked<T> {
    pub fn default_value(value: T) -> Self {
        Self {
            value,
            origin: Origin::Default,
        }
    }

    /// Valor e origem mudam juntos.
    pub fn set(&mut self, value: T, origin: Origin) {
        *self = Self { value, origin };
    }
}

/// Amostragem padrão do módulo (`DEFAULT_SAMPLING_MS`).
pub const DEFAULT_SAMPLING_MS: u32 = 100;
/// Limiar baixo inicial (°C).
pub const DEFAULT_THRESHOLD_C: f64 = 20.0;

/// Configuração corrente do monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub threshold_c: Tracked<f64>,
    pub sampling_interval_ms: Tracked<u32>,
    pub mode: Tracked<Mode>,
}

impl Config {
    pub fn new(threshold_c: f64) -> Self {
        Self {
            threshold_c: Tracked::default_value(threshold_c),
            sampling_interval_ms: Tracked::default_value(DEFAULT_SAMPLING_MS),
            mode: Tracked::default_value(Mode::default()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_C)
    }
}

/// Texto digitado pelo usuário não é um limiar válido.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Valor inválido: {0:?}")]
pub struct ParseError(pub String);

impl ParseError {
    /// Rótulo curto para a interface.
    pub fn label(&self) -> &'static str {
        "Entrada inválida"
    }
}

/// Converte o texto do usuário em °C. `nan`/`inf` são recusados.
pub fn parse_threshold(text: &str) -> Result<f64, ParseError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError(text.to_string()))
}

// ──────────────────────────────────────────────
// Arquivo de configuração
// ──────────────────────────────────────────────

/// Device de caractere do módulo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Path do device (ausente = simulador)
    pub path: PathBuf,
    /// Tempo máximo de uma leitura (ms).
    ///
    /// O `read` do módulo bloqueia até a próxima amostra; com `sampling`
    /// maior que este valor o tick expira e recebe a amostra só no tick
    /// seguinte.
    pub read_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/nxp_simtemp"),
            read_timeout_ms: 200,
        }
    }
}

/// Diretório dos atributos sysfs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/sys/class/misc/nxp_simtemp"),
        }
    }
}

/// Loop do monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Período do tick (ms)
    pub tick_ms: u64,
    /// Limiar baixo ao iniciar (°C)
    pub initial_threshold_c: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            initial_threshold_c: DEFAULT_THRESHOLD_C,
        }
    }
}

/// Configuração raiz (`config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub store: StoreConfig,
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// `--config <path>` nos argumentos, senão o padrão.
    pub fn path_from_args(args: &[String]) -> PathBuf {
        args.iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1))
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_path)
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.device.path.as_os_str().is_empty() {
            errors.push("Path do device não pode ser vazio".into());
        }
        if self.device.read_timeout_ms == 0 {
            errors.push("Timeout de leitura não pode ser 0".into());
        }
        if self.store.dir.as_os_str().is_empty() {
            errors.push("Diretório sysfs não pode ser vazio".into());
        }
        if self.monitor.tick_ms == 0 {
            errors.push("Período do tick não pode ser 0".into());
        }
        if !self.monitor.initial_threshold_c.is_finite() {
            errors.push(format!(
                "Limiar inicial inválido: {}",
                self.monitor.initial_threshold_c
            ));
        }

        errors
    }
}
