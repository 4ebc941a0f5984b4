//! Interface de linha de comando do startstop baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, plan)
//! e flags globais (--config, --log-level, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// startstop: inicia ou para instâncias em lotes ordenados por tag.
#[derive(Debug, Parser)]
#[command(name = "startstop", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./startstop.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Nível de log; tem precedência sobre o `loglevel` do evento.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Habilita saída detalhada (equivale a --log-level debug).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o evento: transições lote a lote com espera de convergência.
    ///
    /// Em dry-run a espera ainda acontece, a menos que
    /// `skip_wait_on_dry_run = true` esteja na configuração.
    Run {
        /// Arquivo JSON (ou .toml) com o evento de start/stop.
        #[arg(long)]
        event: PathBuf,

        /// Força dry-run, independente do campo `dryrun` do evento.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Mostra os grupos e lotes que seriam processados, sem transições.
    Plan {
        /// Arquivo JSON (ou .toml) com o evento de start/stop.
        #[arg(long)]
        event: PathBuf,
    },
}
