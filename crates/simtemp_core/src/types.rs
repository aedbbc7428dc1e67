//! Tipos compartilhados: amostra, modo de simulação, origem de valores.

use std::fmt;
use std::str::FromStr;

// ──────────────────────────────────────────────
// Amostra
// ──────────────────────────────────────────────

/// Uma leitura de temperatura já decodificada.
///
/// Imutável depois de construída; vive um ciclo de poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Timestamp do produtor (jiffies no kernel, ms no simulador)
    pub timestamp: u32,
    /// Temperatura em milésimos de grau Celsius
    pub temp_milli_c: i32,
    /// Flag de alerta calculada pelo próprio device (1 = abaixo do limiar)
    pub alert_flag: u8,
}

impl Sample {
    /// Temperatura em °C (`temp_milli_c / 1000.0`).
    pub fn temp_c(&self) -> f64 {
        f64::from(self.temp_milli_c) / 1000.0
    }

    /// `true` se o device marcou a amostra como alerta.
    pub fn device_alert(&self) -> bool {
        self.alert_flag != 0
    }
}

// ──────────────────────────────────────────────
// Modo de simulação do kernel
// ──────────────────────────────────────────────

/// Modo de geração de temperatura do módulo (`normal|noisy|ramp`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    Noisy,
    Ramp,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Normal, Mode::Noisy, Mode::Ramp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Noisy => "noisy",
            Mode::Ramp => "ramp",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Texto que não corresponde a nenhum [`Mode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Modo desconhecido: {0:?} (esperado normal|noisy|ramp)")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    /// Aceita o conteúdo cru do atributo (ex: `"ramp\n"`), igual ao
    /// `mode_store` do módulo, que compara só o prefixo.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Mode::ALL
            .into_iter()
            .find(|m| trimmed.starts_with(m.as_str()))
            .ok_or_else(|| UnknownMode(trimmed.to_string()))
    }
}

// ──────────────────────────────────────────────
// Origem de valores de configuração
// ──────────────────────────────────────────────

/// Como um valor de configuração foi definido pela última vez.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Origin {
    /// Valor de inicialização do processo
    #[default]
    Default,
    /// Editado pelo usuário na interface, sem tocar no backend
    UserEdited,
    /// Lido ou escrito com sucesso no store externo (sysfs)
    ExternalStore,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Default => "Default",
            Origin::UserEdited => "GUI",
            Origin::ExternalStore => "SysFS",
        })
    }
}

// ──────────────────────────────────────────────
// Fonte e atributos
// ──────────────────────────────────────────────

/// Fonte escolhida na inicialização.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    KernelDevice,
    Simulator,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::KernelDevice => "Kernel",
            SourceKind::Simulator => "Simulation",
        })
    }
}

/// Atributos endereçáveis do store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Threshold,
    Sampling,
    Mode,
    Stats,
}

impl Attribute {
    /// Nome do arquivo sysfs correspondente.
    pub fn file_name(&self) -> &'static str {
        match self {
            Attribute::Threshold => "threshold",
            Attribute::Sampling => "sampling",
            Attribute::Mode => "mode",
            Attribute::Stats => "stats",
        }
    }

    /// Atributos que o core pode escrever.
    pub fn is_writable(&self) -> bool {
        matches!(self, Attribute::Threshold | Attribute::Mode)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl FromStr for Attribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "threshold" => Ok(Attribute::Threshold),
            "sampling" => Ok(Attribute::Sampling),
            "mode" => Ok(Attribute::Mode),
            "stats" => Ok(Attribute::Stats),
            other => Err(format!("Atributo desconhecido: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_c_is_milli_over_thousand() {
        let s = Sample {
            timestamp: 0,
            temp_milli_c: -5000,
            alert_flag: 1,
        };
        assert_eq!(s.temp_c(), -5.0);
        assert!(s.device_alert());
    }

    #[test]
    fn mode_parses_raw_attribute_text() {
        assert_eq!("ramp\n".parse::<Mode>(), Ok(Mode::Ramp));
        assert_eq!("noisy".parse::<Mode>(), Ok(Mode::Noisy));
        assert_eq!(" normal \n".parse::<Mode>(), Ok(Mode::Normal));
        assert!("turbo".parse::<Mode>().is_err());
        assert!("".parse::<Mode>().is_err());
    }

    #[test]
    fn mode_display_matches_attribute_values() {
        for m in Mode::ALL {
            assert_eq!(m.to_string().parse::<Mode>(), Ok(m));
        }
    }

    #[test]
    fn only_threshold_and_mode_are_writable() {
        assert!(Attribute::Threshold.is_writable());
        assert!(Attribute::Mode.is_writable());
        assert!(!Attribute::Sampling.is_writable());
        assert!(!Attribute::Stats.is_writable());
    }
}
