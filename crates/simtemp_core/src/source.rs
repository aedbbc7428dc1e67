//! Fontes de telemetria – device do kernel com fallback para simulador.
//!
//! A escolha da fonte acontece uma única vez, na inicialização, pela
//! existência do path do device. Um device que aparece depois não é
//! detectado sem nova seleção.

use crate::record::{self, RECORD_SIZE};
use crate::types::{Sample, SourceKind};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};
use rand::Rng;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Faixa do simulador em milésimos de °C: `[20.0, 50.0)`.
pub const SIM_MIN_MILLI_C: i32 = 20_000;
pub const SIM_MAX_MILLI_C: i32 = 50_000;

/// Erros de aquisição.
///
/// Device ausente e falha transitória de leitura resultam no mesmo
/// "sem amostra neste ciclo"; o texto só serve para diagnóstico.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Fonte indisponível: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Rótulo curto para a interface.
    pub fn label(&self) -> &'static str {
        match self {
            SourceError::Unavailable(_) => "Erro lendo temperatura",
        }
    }
}

/// Produz uma [`Sample`] por chamada.
pub trait TelemetrySource: Send {
    fn kind(&self) -> SourceKind;
    fn poll(&mut self) -> Result<Sample, SourceError>;
}

// ──────────────────────────────────────────────
// Device do kernel
// ──────────────────────────────────────────────

type ReadResult = Result<Sample, SourceError>;
type Reader = fn(&Path) -> ReadResult;

/// Lê registros de 12 bytes do device de caractere.
///
/// Cada poll abre e fecha o device. O open+read roda numa thread curta e
/// o poll espera no máximo `read_timeout`; enquanto uma leitura antiga
/// continua presa no kernel, nenhuma outra é disparada. Quando a leitura
/// atrasada termina, o poll seguinte entrega o resultado dela.
pub struct KernelDevice {
    path: PathBuf,
    read_timeout: Duration,
    reader: Reader,
    pending: Option<Receiver<ReadResult>>,
}

impl KernelDevice {
    pub fn new(path: impl Into<PathBuf>, read_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            read_timeout,
            reader: read_record,
            pending: None,
        }
    }

    #[cfg(test)]
    fn with_reader(path: impl Into<PathBuf>, read_timeout: Duration, reader: Reader) -> Self {
        Self {
            reader,
            ..Self::new(path, read_timeout)
        }
    }

    fn spawn_read(&self) -> Result<Receiver<ReadResult>, SourceError> {
        let (tx, rx) = bounded::<ReadResult>(1);
        let path = self.path.clone();
        let reader = self.reader;
        std::thread::Builder::new()
            .name("simtemp-read".into())
            .spawn(move || {
                let _ = tx.send(reader(&path));
            })
            .map_err(|e| SourceError::Unavailable(format!("thread de leitura: {e}")))?;
        Ok(rx)
    }
}

impl TelemetrySource for KernelDevice {
    fn kind(&self) -> SourceKind {
        SourceKind::KernelDevice
    }

    fn poll(&mut self) -> Result<Sample, SourceError> {
        if let Some(rx) = self.pending.take() {
            match rx.try_recv() {
                Err(TryRecvError::Empty) => {
                    self.pending = Some(rx);
                    return Err(SourceError::Unavailable(
                        "leitura anterior ainda pendente".into(),
                    ));
                }
                // O read do módulo espera a próxima amostra: ainda é a mais recente
                Ok(result) => return result,
                Err(TryRecvError::Disconnected) => {}
            }
        }

        let rx = self.spawn_read()?;
        match rx.recv_timeout(self.read_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Leitura de {} excedeu {} ms",
                    self.path.display(),
                    self.read_timeout.as_millis()
                );
                self.pending = Some(rx);
                Err(SourceError::Unavailable(format!(
                    "timeout de {} ms",
                    self.read_timeout.as_millis()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Unavailable(
                "thread de leitura encerrada".into(),
            )),
        }
    }
}

fn read_record(path: &Path) -> ReadResult {
    let unavailable = |e: io::Error| SourceError::Unavailable(format!("{}: {e}", path.display()));

    let mut file = open_nonblocking(path).map_err(unavailable)?;
    let mut buf = [0u8; RECORD_SIZE];
    let n = file.read(&mut buf).map_err(unavailable)?;
    if n != RECORD_SIZE {
        return Err(SourceError::Unavailable(format!(
            "leitura curta ({n} de {RECORD_SIZE} bytes)"
        )));
    }

    record::decode(&buf).map_err(|e| SourceError::Unavailable(e.to_string()))
}

#[cfg(unix)]
fn open_nonblocking(path: &Path) -> io::Result<File> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

#[cfg(not(unix))]
fn open_nonblocking(path: &Path) -> io::Result<File> {
    File::open(path)
}

// ──────────────────────────────────────────────
// Simulador
// ──────────────────────────────────────────────

/// Temperatura uniforme em `[20.0, 50.0)` °C, independente a cada poll.
pub struct Simulator {
    started: Instant,
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySource for Simulator {
    fn kind(&self) -> SourceKind {
        SourceKind::Simulator
    }

    fn poll(&mut self) -> Result<Sample, SourceError> {
        let temp_milli_c = rand::rng().random_range(SIM_MIN_MILLI_C..SIM_MAX_MILLI_C);
        Ok(Sample {
            timestamp: self.started.elapsed().as_millis() as u32,
            temp_milli_c,
            alert_flag: 0,
        })
    }
}

// ──────────────────────────────────────────────
// Seleção
// ──────────────────────────────────────────────

/// Detecta a fonte pela existência do device.
pub fn detect_source(device_path: &Path) -> SourceKind {
    if device_path.exists() {
        SourceKind::KernelDevice
    } else {
        SourceKind::Simulator
    }
}

/// Escolhe a fonte uma única vez, na inicialização.
pub fn select_source(device_path: &Path, read_timeout: Duration) -> Box<dyn TelemetrySource> {
    match detect_source(device_path) {
        SourceKind::KernelDevice => {
            info!("✓ Fonte: Kernel ({})", device_path.display());
            Box::new(KernelDevice::new(device_path, read_timeout))
        }
        SourceKind::Simulator => {
            info!(
                "✗ {} não encontrado – usando simulador",
                device_path.display()
            );
            debug!(
                "Simulador: {:.1}–{:.1} °C",
                f64::from(SIM_MIN_MILLI_C) / 1000.0,
                f64::from(SIM_MAX_MILLI_C) / 1000.0
            );
            Box::new(Simulator::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TIMEOUT: Duration = Duration::from_millis(500);

    static SLOW_READS: AtomicUsize = AtomicUsize::new(0);

    /// Simula o `read` do módulo esperando a próxima amostra.
    fn slow_reader(_: &Path) -> ReadResult {
        SLOW_READS.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(300));
        Ok(Sample {
            timestamp: 9,
            temp_milli_c: 21_000,
            alert_flag: 0,
        })
    }

    fn device_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn kernel_device_reads_one_record() {
        let expected = Sample {
            timestamp: 100,
            temp_milli_c: -5000,
            alert_flag: 1,
        };
        let f = device_file(&record::encode(&expected));
        let mut dev = KernelDevice::new(f.path(), TIMEOUT);

        assert_eq!(dev.kind(), SourceKind::KernelDevice);
        assert_eq!(dev.poll(), Ok(expected));
        // Reabre a cada poll: lê o mesmo registro de novo
        assert_eq!(dev.poll(), Ok(expected));
    }

    #[test]
    fn short_read_is_unavailable() {
        let f = device_file(&[1, 2, 3, 4, 5]);
        let mut dev = KernelDevice::new(f.path(), TIMEOUT);
        assert!(matches!(dev.poll(), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn missing_device_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut dev = KernelDevice::new(dir.path().join("nxp_simtemp"), TIMEOUT);
        assert!(matches!(dev.poll(), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn device_that_disappears_is_unavailable() {
        let f = device_file(&[0u8; RECORD_SIZE]);
        let path = f.path().to_path_buf();
        let mut dev = KernelDevice::new(&path, TIMEOUT);
        assert!(dev.poll().is_ok());

        drop(f);
        assert!(matches!(dev.poll(), Err(SourceError::Unavailable(_))));
    }

    #[test]
    fn blocked_read_times_out_without_second_reader() {
        let mut dev =
            KernelDevice::with_reader("/dev/nxp_simtemp", Duration::from_millis(50), slow_reader);

        let start = Instant::now();
        let first = dev.poll();
        assert!(
            matches!(first, Err(SourceError::Unavailable(ref m)) if m.contains("timeout")),
            "{first:?}"
        );
        assert!(start.elapsed() < Duration::from_millis(250));

        let second = dev.poll();
        assert!(
            matches!(second, Err(SourceError::Unavailable(ref m)) if m.contains("pendente")),
            "{second:?}"
        );
        assert_eq!(SLOW_READS.load(Ordering::SeqCst), 1);

        // Leitura atrasada concluída: entregue no poll seguinte, sem nova thread
        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(dev.poll().map(|s| s.timestamp), Ok(9));
        assert_eq!(SLOW_READS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn simulator_stays_in_range() {
        let mut sim = Simulator::new();
        for _ in 0..1000 {
            let s = sim.poll().unwrap();
            let t = s.temp_c();
            assert!((20.0..50.0).contains(&t), "fora da faixa: {t}");
            assert!(!s.device_alert());
        }
    }

    #[test]
    fn missing_path_selects_simulator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nxp_simtemp");
        assert_eq!(detect_source(&path), SourceKind::Simulator);
        assert_eq!(select_source(&path, TIMEOUT).kind(), SourceKind::Simulator);
    }

    #[test]
    fn existing_path_selects_kernel_device() {
        let f = device_file(&[0u8; RECORD_SIZE]);
        assert_eq!(detect_source(f.path()), SourceKind::KernelDevice);
        assert_eq!(
            select_source(f.path(), TIMEOUT).kind(),
            SourceKind::KernelDevice
        );
    }
}
