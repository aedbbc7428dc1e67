//! # SimTemp Monitor
//!
//! Monitor de temperatura do módulo `nxp_simtemp` em console. Lê uma
//! amostra por tick (device do kernel ou simulador), avalia o limiar
//! baixo e imprime o status. Comandos digitados no stdin alteram o
//! limiar, o modo e os atributos sysfs.
//!
//! ## Uso
//! ```bash
//! simtemp_monitor                         # config.toml ao lado do executável
//! simtemp_monitor --config /etc/simtemp.toml
//! ```

mod console;
mod input;

use console::ConsolePresenter;
use simtemp_core::config::AppConfig;
use simtemp_core::poll::PollLoop;
use tracing::{error, info, warn};

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let args: Vec<String> = std::env::args().collect();
    let config_path = AppConfig::path_from_args(&args);
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    // ── Montagem fonte + store ──
    let mut poll_loop = match PollLoop::from_app_config(&config) {
        Ok(pl) => pl,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let commands = match input::spawn_input_thread() {
        Ok(rx) => rx,
        Err(e) => {
            error!("Falha ao criar thread de entrada: {e}");
            std::process::exit(1);
        }
    };

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌡  SIMTEMP MONITOR");
    println!("══════════════════════════════════════════════");
    println!("  Fonte:   {}", poll_loop.source_kind());
    println!("  Device:  {}", config.device.path.display());
    println!("  Sysfs:   {}", config.store.dir.display());
    println!("  Tick:    {} ms", poll_loop.period().as_millis());
    println!("  Limiar:  {:.1} °C", poll_loop.config().threshold_c.value);
    println!("══════════════════════════════════════════════");
    println!("{}", input::HELP);
    println!();

    info!("Monitor inicializado");

    // ── Loop principal ──
    let mut presenter = ConsolePresenter;
    poll_loop.run(&commands, &mut presenter)
}
