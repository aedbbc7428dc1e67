//! Thread que lê comandos do stdin e envia para o loop via channel.
//!
//! Protocolo (uma linha por comando):
//!
//! ```text
//! threshold <°C>               limiar digitado (origem GUI)
//! mode <normal|noisy|ramp>     modo escolhido (origem GUI)
//! read <threshold|sampling|mode|stats>
//! write <threshold|mode>
//! stats                        atalho para `read stats`
//! help
//! ```

use crossbeam_channel::{Receiver, Sender, bounded};
use simtemp_core::{Attribute, Command, Mode};
use std::io::BufRead;
use tracing::{debug, info, warn};

/// Linha não reconhecida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    Empty,
    Help,
    Unknown(String),
}

pub const HELP: &str = "\
Comandos:
  threshold <°C>                    define o limiar (GUI)
  mode <normal|noisy|ramp>          define o modo (GUI)
  read <threshold|sampling|mode|stats>
  write <threshold|mode>
  stats";

/// Converte uma linha digitada em [`Command`].
pub fn parse_line(line: &str) -> Result<Command, LineError> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err(LineError::Empty);
    };
    let arg = parts.next().unwrap_or("");

    match verb {
        // O texto segue cru para o core, que faz o parse numérico
        "threshold" | "t" => Ok(Command::SetThreshold(arg.to_string())),
        "mode" | "m" => arg
            .parse::<Mode>()
            .map(Command::ApplyMode)
            .map_err(|e| LineError::Unknown(e.to_string())),
        "read" | "r" => arg
            .parse::<Attribute>()
            .map(Command::StoreRead)
            .map_err(LineError::Unknown),
        "write" | "w" => arg
            .parse::<Attribute>()
            .map(Command::StoreWrite)
            .map_err(LineError::Unknown),
        "stats" => Ok(Command::StoreRead(Attribute::Stats)),
        "help" | "?" => Err(LineError::Help),
        other => Err(LineError::Unknown(format!("Comando desconhecido: {other}"))),
    }
}

/// Inicia a thread de entrada. Retorna o receiver do channel.
pub fn spawn_input_thread() -> std::io::Result<Receiver<Command>> {
    let (tx, rx) = bounded::<Command>(16);

    std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            input_loop(stdin.lock(), &tx);
        })?;

    Ok(rx)
}

fn input_loop(reader: impl BufRead, tx: &Sender<Command>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Erro lendo stdin: {e}");
                break;
            }
        };

        match parse_line(&line) {
            Ok(cmd) => {
                debug!("→ {cmd:?}");
                // Bloqueia se o loop estiver atrasado: comandos não são descartados
                if tx.send(cmd).is_err() {
                    break;
                }
            }
            Err(LineError::Empty) => {}
            Err(LineError::Help) => println!("{HELP}"),
            Err(LineError::Unknown(msg)) => println!("✗ {msg}\n{HELP}"),
        }
    }
    info!("Entrada encerrada");
}
