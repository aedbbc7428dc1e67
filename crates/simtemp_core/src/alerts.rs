//! Sistema de alertas – limiar baixo de temperatura.

use crate::types::Sample;

/// Resultado da avaliação de um ciclo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    pub is_alert: bool,
    /// Ciclos com temperatura abaixo do limiar desde o início do processo
    pub cumulative_alert_count: u64,
}

/// Avaliador de limiar com contador monotônico.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    threshold_c: f64,
    state: AlertState,
}

impl AlertEngine {
    pub fn new(threshold_c: f64) -> Self {
        Self {
            threshold_c,
            state: AlertState::default(),
        }
    }

    pub fn threshold_c(&self) -> f64 {
        self.threshold_c
    }

    /// Vale a partir da próxima chamada de [`evaluate`](Self::evaluate).
    pub fn set_threshold(&mut self, threshold_c: f64) {
        self.threshold_c = threshold_c;
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Avalia uma amostra contra o limiar atual.
    ///
    /// Sem amostra (fonte falhou) o estado anterior é devolvido intacto.
    pub fn evaluate(&mut self, sample: Option<Sample>) -> AlertState {
        let Some(sample) = sample else {
            return self.state;
        };

        if sample.temp_c() < self.threshold_c {
            self.state.is_alert = true;
            self.state.cumulative_alert_count += 1;
        } else {
            self.state.is_alert = false;
        }
        self.state
    }
}
