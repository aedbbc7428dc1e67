//! Registro binário entregue pelo `read()` do device.
//!
//! Formato (12 bytes, little-endian, `struct sample_record` do módulo):
//!
//! ```text
//! ┌───────────────┬────────────────┬──────────┬──────────────┐
//! │ timestamp(4)  │ temp_milli_c(4)│ alert(1) │ reserved(3)  │
//! │ u32           │ i32            │ u8       │ ignorado     │
//! └───────────────┴────────────────┴──────────┴──────────────┘
//! ```
//!
//! Os bytes de padding são lidos e descartados, nunca validados. O
//! encoder os escreve zerados, como faz o kernel.

use crate::types::Sample;

/// Tamanho exato de um registro.
pub const RECORD_SIZE: usize = 12;

const TIMESTAMP: std::ops::Range<usize> = 0..4;
const TEMP: std::ops::Range<usize> = 4..8;
const ALERT: usize = 8;

/// Erros de decodificação.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Registro com tamanho inválido ({0} bytes, esperado {RECORD_SIZE})")]
    BadLength(usize),
}

/// Decodifica um registro de exatamente [`RECORD_SIZE`] bytes.
pub fn decode(bytes: &[u8]) -> Result<Sample, DecodeError> {
    let record: &[u8; RECORD_SIZE] = bytes
        .try_into()
        .map_err(|_| DecodeError::BadLength(bytes.len()))?;

    Ok(Sample {
        timestamp: u32::from_le_bytes(word(record, TIMESTAMP)),
        temp_milli_c: i32::from_le_bytes(word(record, TEMP)),
        alert_flag: record[ALERT],
    })
}

/// Codifica uma amostra no layout do device (padding zerado).
pub fn encode(sample: &Sample) -> [u8; RECORD_SIZE] {
    let mut record = [0u8; RECORD_SIZE];
    record[TIMESTAMP].copy_from_slice(&sample.timestamp.to_le_bytes());
    record[TEMP].copy_from_slice(&sample.temp_milli_c.to_le_bytes());
    record[ALERT] = sample.alert_flag;
    record
}

fn word(record: &[u8; RECORD_SIZE], range: std::ops::Range<usize>) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&record[range]);
    out
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
