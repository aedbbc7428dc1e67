//! Store de configuração – atributos sysfs do módulo `nxp_simtemp`.
//!
//! Cada atributo é um arquivo texto em `/sys/class/misc/nxp_simtemp/`:
//!
//! | atributo    | conteúdo                                   | acesso |
//! |-------------|--------------------------------------------|--------|
//! | `threshold` | inteiro, milésimos de °C                   | rw     |
//! | `sampling`  | inteiro, ms                                | r      |
//! | `mode`      | `normal` \| `noisy` \| `ramp`              | rw     |
//! | `stats`     | `samples=N invalid_writes=N alerts=N`      | r      |
//!
//! Atributo ausente ([`StoreError::NotAvailable`]) é um resultado normal
//! e distinto de valor malformado ([`StoreError::Malformed`]).

use crate::types::{Attribute, Mode};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Erros do store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Atributo {0} não disponível")]
    NotAvailable(Attribute),

    #[error("Valor malformado em {attr}: {value:?}")]
    Malformed { attr: Attribute, value: String },

    #[error("Erro lendo {attr}: {reason}")]
    Unreadable { attr: Attribute, reason: String },

    #[error("Escrita em {attr} recusada: {reason}")]
    Rejected { attr: Attribute, reason: String },
}

impl StoreError {
    /// Rótulo curto para a interface.
    pub fn label(&self) -> &'static str {
        match self {
            StoreError::NotAvailable(_) => "Sysfs não disponível",
            StoreError::Malformed { .. } => "Valor malformado",
            StoreError::Unreadable { .. } => "Erro lendo sysfs",
            StoreError::Rejected { .. } => "Escrita recusada",
        }
    }

    fn malformed(attr: Attribute, value: &str) -> Self {
        StoreError::Malformed {
            attr,
            value: value.trim().to_string(),
        }
    }

    fn unreadable(attr: Attribute, reason: impl ToString) -> Self {
        StoreError::Unreadable {
            attr,
            reason: reason.to_string(),
        }
    }

    fn rejected(attr: Attribute, reason: impl ToString) -> Self {
        StoreError::Rejected {
            attr,
            reason: reason.to_string(),
        }
    }
}

// ──────────────────────────────────────────────
// Backends
// ──────────────────────────────────────────────

/// Backend chave/valor por trás do [`ConfigStore`].
pub trait AttributeBackend: Send {
    /// Conteúdo cru do atributo.
    fn read(&self, attr: Attribute) -> Result<String, StoreError>;
    /// Substitui o conteúdo do atributo. Nunca cria atributos novos.
    fn write(&self, attr: Attribute, value: &str) -> Result<(), StoreError>;
}

impl<B: AttributeBackend + ?Sized> AttributeBackend for Box<B> {
    fn read(&self, attr: Attribute) -> Result<String, StoreError> {
        (**self).read(attr)
    }

    fn write(&self, attr: Attribute, value: &str) -> Result<(), StoreError> {
        (**self).write(attr, value)
    }
}

/// Atributos como arquivos num diretório (sysfs).
#[derive(Debug, Clone)]
pub struct SysfsBackend {
    dir: PathBuf,
}

impl SysfsBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn attr_path(&self, attr: Attribute) -> PathBuf {
        self.dir.join(attr.file_name())
    }
}

impl AttributeBackend for SysfsBackend {
    fn read(&self, attr: Attribute) -> Result<String, StoreError> {
        let path = self.attr_path(attr);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotAvailable(attr),
            _ => StoreError::unreadable(attr, e),
        })?;
        String::from_utf8(bytes)
            .map_err(|e| StoreError::malformed(attr, &String::from_utf8_lossy(e.as_bytes())))
    }

    fn write(&self, attr: Attribute, value: &str) -> Result<(), StoreError> {
        let path = self.attr_path(attr);
        if !path.exists() {
            return Err(StoreError::NotAvailable(attr));
        }
        // sysfs: um único write com o valor completo; EINVAL = valor recusado
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| StoreError::rejected(attr, e))?;
        file.write_all(value.as_bytes())
            .map_err(|e| StoreError::rejected(attr, e))?;
        debug!("{} ← {value}", path.display());
        Ok(())
    }
}

/// Backend em memória, para testes e execução sem módulo carregado.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<Attribute, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cria (ou substitui) um atributo.
    pub fn with(self, attr: Attribute, value: impl Into<String>) -> Self {
        self.set(attr, value);
        self
    }

    pub fn set(&self, attr: Attribute, value: impl Into<String>) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(attr, value.into());
        }
    }

    pub fn get(&self, attr: Attribute) -> Option<String> {
        self.values.lock().ok()?.get(&attr).cloned()
    }
}

impl AttributeBackend for MemoryBackend {
    fn read(&self, attr: Attribute) -> Result<String, StoreError> {
        self.get(attr).ok_or(StoreError::NotAvailable(attr))
    }

    fn write(&self, attr: Attribute, value: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::rejected(attr, "backend envenenado"))?;
        match values.get_mut(&attr) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(StoreError::NotAvailable(attr)),
        }
    }
}

// ──────────────────────────────────────────────
// Estatísticas do módulo
// ──────────────────────────────────────────────

/// Conteúdo do atributo `stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub samples: u64,
    pub invalid_writes: u64,
    pub alerts: u64,
}

fn parse_stats(raw: &str) -> Option<DeviceStats> {
    let mut stats = DeviceStats::default();
    let mut seen = 0;
    for pair in raw.split_whitespace() {
        let (key, value) = pair.split_once('=')?;
        let value: u64 = value.parse().ok()?;
        match key {
            "samples" => stats.samples = value,
            "invalid_writes" => stats.invalid_writes = value,
            "alerts" => stats.alerts = value,
            _ => continue,
        }
        seen += 1;
    }
    (seen == 3).then_some(stats)
}

// ──────────────────────────────────────────────
// ConfigStore
// ──────────────────────────────────────────────

/// Milésimos de °C inteiros, truncados em direção a zero.
fn truncate_to_milli(celsius: f64) -> f64 {
    (celsius * 1000.0).trunc()
}

/// Valor em °C que o atributo `threshold` guarda após
/// [`ConfigStore::write_threshold`].
pub fn stored_threshold(celsius: f64) -> f64 {
    truncate_to_milli(celsius) / 1000.0
}

/// Leitura/escrita tipada dos atributos, com conversão de unidades.
///
/// Não guarda estado: a origem dos valores é registrada por quem aplica
/// o resultado na [`Config`](crate::config::Config).
pub struct ConfigStore<B: AttributeBackend = Box<dyn AttributeBackend>> {
    backend: B,
}

impl<B: AttributeBackend> ConfigStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn read_parsed<T: std::str::FromStr>(&self, attr: Attribute) -> Result<T, StoreError> {
        let raw = self.backend.read(attr)?;
        raw.trim()
            .parse()
            .map_err(|_| StoreError::malformed(attr, &raw))
    }

    /// Limiar cru, em milésimos de °C.
    pub fn read_threshold_milli(&self) -> Result<i32, StoreError> {
        self.read_parsed(Attribute::Threshold)
    }

    /// Limiar em °C.
    pub fn read_threshold(&self) -> Result<f64, StoreError> {
        Ok(f64::from(self.read_threshold_milli()?) / 1000.0)
    }

    pub fn write_threshold_milli(&self, milli_c: i32) -> Result<(), StoreError> {
        self.backend.write(Attribute::Threshold, &milli_c.to_string())
    }

    /// Converte °C para milésimos truncando em direção a zero
    /// (`12.3456` → `12345`).
    pub fn write_threshold(&self, celsius: f64) -> Result<(), StoreError> {
        let milli = truncate_to_milli(celsius);
        if !milli.is_finite() || milli < f64::from(i32::MIN) || milli > f64::from(i32::MAX) {
            return Err(StoreError::rejected(
                Attribute::Threshold,
                format!("{celsius} °C fora da faixa"),
            ));
        }
        self.write_threshold_milli(milli as i32)
    }

    /// Período de amostragem do módulo, em ms.
    pub fn read_sampling_interval(&self) -> Result<u32, StoreError> {
        self.read_parsed(Attribute::Sampling)
    }

    pub fn read_mode(&self) -> Result<Mode, StoreError> {
        let raw = self.backend.read(Attribute::Mode)?;
        raw.parse()
            .map_err(|_| StoreError::malformed(Attribute::Mode, &raw))
    }

    pub fn write_mode(&self, mode: Mode) -> Result<(), StoreError> {
        self.backend.write(Attribute::Mode, mode.as_str())
    }

    pub fn read_stats(&self) -> Result<DeviceStats, StoreError> {
        let raw = self.backend.read(Attribute::Stats)?;
        parse_stats(&raw).ok_or_else(|| StoreError::malformed(Attribute::Stats, &raw))
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sysfs_dir(attrs: &[(Attribute, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (attr, value) in attrs {
            fs::write(dir.path().join(attr.file_name()), value).unwrap();
        }
        dir
    }

    #[test]
    fn threshold_roundtrip_within_one_thousandth() {
        let dir = sysfs_dir(&[(Attribute::Threshold, "45000\n")]);
        let store = ConfigStore::new(SysfsBackend::new(dir.path()));

        store.write_threshold(12.345).unwrap();
        let back = store.read_threshold().unwrap();
        assert!((back - 12.345).abs() < 1e-3, "lido {back}");
    }

    #[test]
    fn threshold_write_truncates_toward_zero() {
        let store = ConfigStore::new(MemoryBackend::new().with(Attribute::Threshold, "0"));

        store.write_threshold(12.3456).unwrap();
        assert_eq!(store.backend().get(Attribute::Threshold).as_deref(), Some("12345"));

        store.write_threshold(-1.9999).unwrap();
        assert_eq!(store.backend().get(Attribute::Threshold).as_deref(), Some("-1999"));
    }

    #[test]
    fn threshold_reads_kernel_format() {
        let dir = sysfs_dir(&[(Attribute::Threshold, "45000\n")]);
        let store = ConfigStore::new(SysfsBackend::new(dir.path()));
        assert_eq!(store.read_threshold_milli(), Ok(45000));
        assert_eq!(store.read_threshold(), Ok(45.0));
    }

    #[test]
    fn missing_attribute_is_not_available() {
        let dir = sysfs_dir(&[]);
        let store = ConfigStore::new(SysfsBackend::new(dir.path()));

        assert_eq!(
            store.read_mode(),
            Err(StoreError::NotAvailable(Attribute::Mode))
        );
        assert_eq!(
            store.read_sampling_interval(),
            Err(StoreError::NotAvailable(Attribute::Sampling))
        );
        assert_eq!(
            store.write_threshold(10.0),
            Err(StoreError::NotAvailable(Attribute::Threshold))
        );
        // Escrita nunca cria o arquivo
        assert!(!dir.path().join("threshold").exists());
    }

    #[test]
    fn missing_directory_is_not_available() {
        let store = ConfigStore::new(SysfsBackend::new("/nonexistent/nxp_simtemp"));
        assert_eq!(
            store.read_threshold(),
            Err(StoreError::NotAvailable(Attribute::Threshold))
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let store = ConfigStore::new(
            MemoryBackend::new()
                .with(Attribute::Threshold, "abc\n")
                .with(Attribute::Sampling, "-5")
                .with(Attribute::Mode, "turbo\n"),
        );
        assert!(matches!(
            store.read_threshold(),
            Err(StoreError::Malformed { attr: Attribute::Threshold, .. })
        ));
        assert!(matches!(
            store.read_sampling_interval(),
            Err(StoreError::Malformed { attr: Attribute::Sampling, .. })
        ));
        assert_eq!(
            store.read_mode(),
            Err(StoreError::Malformed {
                attr: Attribute::Mode,
                value: "turbo".into()
            })
        );
    }

    #[test]
    fn sampling_and_mode_from_sysfs() {
        let dir = sysfs_dir(&[(Attribute::Sampling, "100\n"), (Attribute::Mode, "noisy\n")]);
        let store = ConfigStore::new(SysfsBackend::new(dir.path()));
        assert_eq!(store.read_sampling_interval(), Ok(100));
        assert_eq!(store.read_mode(), Ok(Mode::Noisy));

        store.write_mode(Mode::Ramp).unwrap();
        assert_eq!(store.read_mode(), Ok(Mode::Ramp));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let store = ConfigStore::new(MemoryBackend::new().with(Attribute::Threshold, "0"));
        assert!(matches!(
            store.write_threshold(f64::NAN),
            Err(StoreError::Rejected { .. })
        ));
        assert!(matches!(
            store.write_threshold(1e12),
            Err(StoreError::Rejected { .. })
        ));
        assert_eq!(store.backend().get(Attribute::Threshold).as_deref(), Some("0"));
    }

    #[test]
    fn stats_are_parsed() {
        let store = ConfigStore::new(
            MemoryBackend::new().with(Attribute::Stats, "samples=120 invalid_writes=2 alerts=7\n"),
        );
        assert_eq!(
            store.read_stats(),
            Ok(DeviceStats {
                samples: 120,
                invalid_writes: 2,
                alerts: 7
            })
        );
    }

    #[test]
    fn truncated_stats_are_malformed() {
        let store = ConfigStore::new(MemoryBackend::new().with(Attribute::Stats, "samples=120"));
        assert!(matches!(
            store.read_stats(),
            Err(StoreError::Malformed { attr: Attribute::Stats, .. })
        ));
    }

    #[test]
    fn labels_are_distinct() {
        let labels = [
            StoreError::NotAvailable(Attribute::Mode).label(),
            StoreError::malformed(Attribute::Mode, "x").label(),
            StoreError::unreadable(Attribute::Mode, "EIO").label(),
            StoreError::rejected(Attribute::Mode, "EINVAL").label(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn non_utf8_content_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("threshold"), [0xff, 0xfe, b'1', b'\n']).unwrap();
        let store = ConfigStore::new(SysfsBackend::new(dir.path()));

        let err = store.read_threshold().unwrap_err();
        assert!(
            matches!(err, StoreError::Malformed { attr: Attribute::Threshold, .. }),
            "{err:?}"
        );
        assert_eq!(err.label(), "Valor malformado");
    }

    #[test]
    fn unreadable_attribute_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        // Diretório no lugar do arquivo: read falha com EISDIR
        fs::create_dir(dir.path().join("mode")).unwrap();
        let store = ConfigStore::new(SysfsBackend::new(dir.path()));

        let err = store.read_mode().unwrap_err();
        assert!(
            matches!(err, StoreError::Unreadable { attr: Attribute::Mode, .. }),
            "{err:?}"
        );
        assert_eq!(err.label(), "Erro lendo sysfs");
    }

    #[test]
    fn stored_threshold_matches_written_text() {
        let store = ConfigStore::new(MemoryBackend::new().with(Attribute::Threshold, "0"));
        store.write_threshold(12.3456).unwrap();
        assert_eq!(store.read_threshold(), Ok(stored_threshold(12.3456)));
        assert_eq!(stored_threshold(-1.9999), -1.999);
    }

    #[test]
    fn boxed_backend_works() {
        let boxed: Box<dyn AttributeBackend> =
            Box::new(MemoryBackend::new().with(Attribute::Sampling, "250"));
        let store: ConfigStore = ConfigStore::new(boxed);
        assert_eq!(store.read_sampling_interval(), Ok(250));
    }
}
