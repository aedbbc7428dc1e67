//! # SimTemp Core
//!
//! Motor de aquisição de telemetria de temperatura e alerta de limiar
//! baixo. Lê amostras binárias do device `/dev/nxp_simtemp` (ou de um
//! simulador quando o device não existe), avalia o limiar e troca
//! configuração com os atributos sysfs do módulo.
//!
//! ## Módulos
//! - [`types`] – Amostra, modo, origem e tipo de fonte
//! - [`record`] – Decode/encode do registro binário de 12 bytes
//! - [`source`] – Fontes de telemetria (device do kernel, simulador)
//! - [`store`] – Atributos sysfs (threshold, sampling, mode, stats)
//! - [`alerts`] – Avaliação do limiar e contador de alertas
//! - [`config`] – Configuração em runtime (com origem) e arquivo TOML
//! - [`poll`] – Loop periódico, snapshots e comandos do usuário

pub mod types;
pub mod record;
pub mod source;
pub mod store;
pub mod alerts;
pub mod config;
pub mod poll;

// Re-exports convenientes
pub use types::{Attribute, Mode, Origin, Sample, SourceKind};
pub use record::{decode, encode, RECORD_SIZE};
pub use source::{select_source, TelemetrySource};
pub use store::{ConfigStore, SysfsBackend};
pub use alerts::{AlertEngine, AlertState};
pub use config::{AppConfig, Config};
pub use poll::{Command, PollLoop, Snapshot};
