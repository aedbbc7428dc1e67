//! Apresentação em console: uma linha de status por tick.

use simtemp_core::poll::{CommandError, Presenter, Reply, Snapshot, StoreValue};
use simtemp_core::Command;

/// Presenter que escreve no stdout.
#[derive(Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn render(&mut self, snapshot: &Snapshot) {
        println!("{}", format_snapshot(snapshot));
    }

    fn command_result(&mut self, command: &Command, result: &Result<Reply, CommandError>) {
        println!("{}", format_reply(command, result));
    }
}

/// Linha exibida a cada tick.
pub fn format_snapshot(s: &Snapshot) -> String {
    let temp = match (&s.sample, &s.source_error) {
        (Some(sample), _) => format!("{:.1} °C", sample.temp_c()),
        (None, Some(e)) => format!("-- °C ({})", e.label()),
        (None, None) => "-- °C".to_string(),
    };
    let sampling = match &s.sampling {
        Ok(ms) => format!("{ms} ms"),
        Err(e) => e.label().to_string(),
    };
    let cfg = &s.config;

    format!(
        "[{}] {temp} | {} | limiar {:.1} °C ({}) | alertas {} | amostragem {sampling} | modo {} ({})",
        s.source_kind,
        s.status(),
        cfg.threshold_c.value,
        cfg.threshold_c.origin,
        s.alert.cumulative_alert_count,
        cfg.mode.value,
        cfg.mode.origin,
    )
}

/// Resposta a um comando do usuário.
pub fn format_reply(command: &Command, result: &Result<Reply, CommandError>) -> String {
    match result {
        Ok(Reply::ThresholdSet(t)) => format!("✓ Limiar baixo: {t:.1} °C (GUI)"),
        Ok(Reply::ModeApplied(m)) => format!("✓ Modo: {m} (GUI)"),
        Ok(Reply::Written(attr)) => format!("✓ SysFS {attr} atualizado"),
        Ok(Reply::Read(value)) => match value {
            StoreValue::Threshold(t) => format!("✓ Limiar baixo: {t:.1} °C (SysFS)"),
            StoreValue::Sampling(ms) => format!("✓ Amostragem: {ms} ms (SysFS)"),
            StoreValue::Mode(m) => format!("✓ Modo: {m} (SysFS)"),
            StoreValue::Stats(st) => format!(
                "✓ Stats: samples={} invalid_writes={} alerts={}",
                st.samples, st.invalid_writes, st.alerts
            ),
        },
        Err(e) => format!("✗ {}: {e} ({command:?})", e.label()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simtemp_core::alerts::AlertState;
    use simtemp_core::config::{Config, ParseError};
    use simtemp_core::source::SourceError;
    use simtemp_core::store::StoreError;
    use simtemp_core::{Attribute, Sample, SourceKind};

    fn snapshot() -> Snapshot {
        Snapshot {
            sample: Some(Sample {
                timestamp: 1,
                temp_milli_c: 18_300,
                alert_flag: 1,
            }),
            source_error: None,
            alert: AlertState {
                is_alert: true,
                cumulative_alert_count: 4,
            },
            config: Config::default(),
            sampling: Ok(100),
            source_kind: SourceKind::KernelDevice,
        }
    }

    #[test]
    fn renders_alert_line() {
        let line = format_snapshot(&snapshot());
        assert!(line.starts_with("[Kernel] 18.3 °C"), "{line}");
        assert!(line.contains("Alerta de temperatura baixa"));
        assert!(line.contains("limiar 20.0 °C (Default)"));
        assert!(line.contains("alertas 4"));
        assert!(line.contains("amostragem 100 ms"));
    }

    #[test]
    fn renders_failures_distinctly() {
        let mut s = snapshot();
        s.sample = None;
        s.source_error = Some(SourceError::Unavailable("EAGAIN".into()));
        s.sampling = Err(StoreError::NotAvailable(Attribute::Sampling));

        let line = format_snapshot(&s);
        assert!(line.contains("Erro lendo temperatura"), "{line}");
        assert!(line.contains("Fonte indisponível"));
        assert!(line.contains("amostragem Sysfs não disponível"));
    }

    #[test]
    fn reply_labels_match_error_kind() {
        let cmd = Command::SetThreshold("abc".into());
        let parse = format_reply(&cmd, &Err(ParseError("abc".into()).into()));
        assert!(parse.starts_with("✗ Entrada inválida"), "{parse}");

        let cmd = Command::StoreRead(Attribute::Mode);
        let malformed = format_reply(
            &cmd,
            &Err(StoreError::Malformed {
                attr: Attribute::Mode,
                value: "turbo".into(),
            }
            .into()),
        );
        assert!(malformed.starts_with("✗ Valor malformado"), "{malformed}");
    }
}
