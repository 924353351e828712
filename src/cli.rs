//! Interface de linha de comando do quickapply baseada em clap.
//!
//! Define a struct [`Cli`] com as flags --queue-only, --config, --yes e --verbose.

use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_PATH;

/// quickapply: candidatura automática a vagas de aplicação rápida nas
/// cidades configuradas, filtrando por salário e tipo de contrato.
#[derive(Debug, Parser)]
#[command(name = "quickapply", version, about)]
pub struct Cli {
    /// Apenas adiciona as vagas compatíveis à fila, sem se candidatar.
    #[arg(long)]
    pub queue_only: bool,

    /// Arquivo de configuração; criado interativamente se não existir.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Usa a configuração existente sem perguntar.
    #[arg(long, short)]
    pub yes: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}
