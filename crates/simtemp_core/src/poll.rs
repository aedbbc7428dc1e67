//! Loop periódico: poll da fonte → avaliação do limiar → snapshot.
//!
//! Single-threaded: o loop é dono do [`AlertEngine`] e da [`Config`].
//! Comandos do usuário chegam por um channel e são drenados entre ticks,
//! então nenhum lock é necessário.

use crate::alerts::{AlertEngine, AlertState};
use crate::config::{AppConfig, Config, ParseError, parse_threshold};
use crate::source::{SourceError, TelemetrySource, select_source};
use crate::store::{
    AttributeBackend, ConfigStore, DeviceStats, StoreError, SysfsBackend, stored_threshold,
};
use crate::types::{Attribute, Mode, Origin, Sample, SourceKind};
use crossbeam_channel::{Receiver, TryRecvError};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

// ──────────────────────────────────────────────
// Snapshot
// ──────────────────────────────────────────────

/// Estado exibido pela camada de apresentação, um por tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sample: Option<Sample>,
    /// Motivo da falha da fonte neste tick
    pub source_error: Option<SourceError>,
    pub alert: AlertState,
    pub config: Config,
    /// Amostragem lida do sysfs neste tick (apenas exibição)
    pub sampling: Result<u32, StoreError>,
    pub source_kind: SourceKind,
}

/// Situação do tick para a interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    LowTemperatureAlert,
    Normal,
    SourceUnavailable,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::LowTemperatureAlert => "⚠️ Alerta de temperatura baixa",
            Status::Normal => "Temperatura normal",
            Status::SourceUnavailable => "Fonte indisponível",
        })
    }
}

impl Snapshot {
    pub fn status(&self) -> Status {
        match (&self.sample, self.alert.is_alert) {
            (None, _) => Status::SourceUnavailable,
            (Some(_), true) => Status::LowTemperatureAlert,
            (Some(_), false) => Status::Normal,
        }
    }

    pub fn temp_c(&self) -> Option<f64> {
        self.sample.as_ref().map(Sample::temp_c)
    }
}

// ──────────────────────────────────────────────
// Comandos do usuário
// ──────────────────────────────────────────────

/// Comandos encaminhados pela camada de apresentação.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Texto digitado no campo de limiar
    SetThreshold(String),
    ApplyMode(Mode),
    StoreRead(Attribute),
    StoreWrite(Attribute),
}

/// Valor lido do store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreValue {
    Threshold(f64),
    Sampling(u32),
    Mode(Mode),
    Stats(DeviceStats),
}

/// Resposta a um comando bem-sucedido.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    ThresholdSet(f64),
    ModeApplied(Mode),
    Read(StoreValue),
    Written(Attribute),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    pub fn label(&self) -> &'static str {
        match self {
            CommandError::Parse(e) => e.label(),
            CommandError::Store(e) => e.label(),
        }
    }
}

/// Recebe snapshots e respostas de comandos.
pub trait Presenter {
    fn render(&mut self, snapshot: &Snapshot);
    fn command_result(&mut self, command: &Command, result: &Result<Reply, CommandError>);
}

// ──────────────────────────────────────────────
// PollLoop
// ──────────────────────────────────────────────

/// Falha na montagem inicial; única condição fatal do sistema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Configuração inválida: {}", .0.join("; "))]
pub struct WiringError(pub Vec<String>);

/// Driver periódico do motor de telemetria.
pub struct PollLoop {
    source: Box<dyn TelemetrySource>,
    store: ConfigStore,
    engine: AlertEngine,
    config: Config,
    source_kind: SourceKind,
    period: Duration,
}

impl PollLoop {
    pub fn new(
        source: Box<dyn TelemetrySource>,
        store: ConfigStore,
        config: Config,
        period: Duration,
    ) -> Self {
        let source_kind = source.kind();
        Self {
            source,
            store,
            engine: AlertEngine::new(config.threshold_c.value),
            config,
            source_kind,
            period,
        }
    }

    /// Monta fonte e store a partir do `config.toml`.
    pub fn from_app_config(app: &AppConfig) -> Result<Self, WiringError> {
        let errors = app.validate();
        if !errors.is_empty() {
            return Err(WiringError(errors));
        }

        let source = select_source(
            &app.device.path,
            Duration::from_millis(app.device.read_timeout_ms),
        );
        let backend: Box<dyn AttributeBackend> = Box::new(SysfsBackend::new(&app.store.dir));
        Ok(Self::new(
            source,
            ConfigStore::new(backend),
            Config::new(app.monitor.initial_threshold_c),
            Duration::from_millis(app.monitor.tick_ms),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Um ciclo: poll, avaliação, leitura da amostragem, snapshot.
    pub fn tick(&mut self) -> Snapshot {
        let polled = self.source.poll();
        let alert = self.engine.evaluate(polled.as_ref().ok().copied());

        let sampling = self.store.read_sampling_interval();
        if let Ok(ms) = sampling {
            self.config.sampling_interval_ms.set(ms, Origin::ExternalStore);
        }

        let (sample, source_error) = match polled {
            Ok(sample) => {
                debug!(
                    "Amostra ts={} {:.3} °C (limiar {:.3}) alerta={}",
                    sample.timestamp,
                    sample.temp_c(),
                    self.engine.threshold_c(),
                    alert.is_alert
                );
                (Some(sample), None)
            }
            Err(e) => {
                debug!("Sem amostra neste ciclo: {e}");
                (None, Some(e))
            }
        };

        Snapshot {
            sample,
            source_error,
            alert,
            config: self.config,
            sampling,
            source_kind: self.source_kind,
        }
    }

    /// Limiar digitado pelo usuário; não toca no store.
    pub fn set_threshold_from_input(&mut self, text: &str) -> Result<f64, ParseError> {
        let threshold = parse_threshold(text)?;
        self.update_threshold(threshold, Origin::UserEdited);
        Ok(threshold)
    }

    /// Modo escolhido pelo usuário; não toca no store.
    pub fn apply_mode(&mut self, mode: Mode) {
        self.config.mode.set(mode, Origin::UserEdited);
    }

    /// Lê um atributo do store e, se bem-sucedido, aplica valor e origem.
    pub fn request_store_read(&mut self, attr: Attribute) -> Result<StoreValue, StoreError> {
        let value = match attr {
            Attribute::Threshold => {
                let threshold = self.store.read_threshold()?;
                self.update_threshold(threshold, Origin::ExternalStore);
                StoreValue::Threshold(threshold)
            }
            Attribute::Sampling => {
                let ms = self.store.read_sampling_interval()?;
                self.config.sampling_interval_ms.set(ms, Origin::ExternalStore);
                StoreValue::Sampling(ms)
            }
            Attribute::Mode => {
                let mode = self.store.read_mode()?;
                self.config.mode.set(mode, Origin::ExternalStore);
                StoreValue::Mode(mode)
            }
            Attribute::Stats => StoreValue::Stats(self.store.read_stats()?),
        };
        info!("SysFS {attr} → {value:?}");
        Ok(value)
    }

    /// Escreve o valor corrente de um atributo gravável no store.
    pub fn request_store_write(&mut self, attr: Attribute) -> Result<(), StoreError> {
        if !attr.is_writable() {
            return Err(StoreError::Rejected {
                attr,
                reason: "atributo somente leitura".into(),
            });
        }
        match attr {
            Attribute::Threshold => {
                let threshold = self.config.threshold_c.value;
                self.store.write_threshold(threshold)?;
                // A config passa a refletir o valor truncado gravado
                self.update_threshold(stored_threshold(threshold), Origin::ExternalStore);
            }
            Attribute::Mode => {
                let mode = self.config.mode.value;
                self.store.write_mode(mode)?;
                self.config.mode.set(mode, Origin::ExternalStore);
            }
            // Filtrados por is_writable acima
            Attribute::Sampling | Attribute::Stats => {}
        }
        info!("SysFS {attr} ← valor corrente");
        Ok(())
    }

    /// Executa um comando da camada de apresentação.
    pub fn handle(&mut self, command: &Command) -> Result<Reply, CommandError> {
        let reply = match command {
            Command::SetThreshold(text) => Reply::ThresholdSet(self.set_threshold_from_input(text)?),
            Command::ApplyMode(mode) => {
                self.apply_mode(*mode);
                Reply::ModeApplied(*mode)
            }
            Command::StoreRead(attr) => Reply::Read(self.request_store_read(*attr)?),
            Command::StoreWrite(attr) => {
                self.request_store_write(*attr)?;
                Reply::Written(*attr)
            }
        };
        Ok(reply)
    }

    /// Drena os comandos pendentes e executa um tick.
    ///
    /// Retorna `false` quando o lado emissor do channel foi fechado.
    pub fn step(&mut self, commands: &Receiver<Command>, presenter: &mut impl Presenter) -> bool {
        let mut connected = true;
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    let result = self.handle(&command);
                    if let Err(e) = &result {
                        warn!("Comando {command:?} falhou: {e}");
                    }
                    presenter.command_result(&command, &result);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    connected = false;
                    break;
                }
            }
        }

        let snapshot = self.tick();
        presenter.render(&snapshot);
        connected
    }

    /// Loop principal; termina apenas com o processo.
    pub fn run(&mut self, commands: &Receiver<Command>, presenter: &mut impl Presenter) -> ! {
        info!(
            "Loop iniciado: fonte {} | tick {} ms | limiar {:.1} °C",
            self.source_kind,
            self.period.as_millis(),
            self.config.threshold_c.value
        );

        let mut input_open = true;
        loop {
            let cycle_start = Instant::now();

            let connected = self.step(commands, presenter);
            if input_open && !connected {
                error!("Channel de comandos fechado; seguindo só com a telemetria");
                input_open = false;
            }

            // Dormir pelo tempo restante do período
            let elapsed = cycle_start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            }
        }
    }

    fn update_threshold(&mut self, threshold: f64, origin: Origin) {
        self.config.threshold_c.set(threshold, origin);
        self.engine.set_threshold(threshold);
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
