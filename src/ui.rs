//! Interface de terminal do startstop: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`TerminalObserver`] acompanha visualmente
//! cada lote de instâncias durante a execução. Tudo é escrito em stderr;
//! stdout fica reservado para os logs JSON e o relatório.

use console::{Style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use crate::convergence::PollProgress;
use crate::grouping::GroupKey;
use crate::orchestrator::{Plan, RunObserver};
use crate::ordering::BucketKey;
use crate::report::{BatchRecord, RunReport};

/// Indicador visual de progresso para a execução de uma invocação.
///
/// Exibe um spinner animado enquanto um lote aguarda convergência e
/// mensagens coloridas para sucesso (verde), falha (vermelho) e espera (amarelo).
pub struct TerminalObserver {
    // Spinner do lote atual, se houver.
    pb: Option<ProgressBar>,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para mensagens de espera.
    yellow: Style,
}

impl Default for TerminalObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self {
            pb: None,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner atual e exibe a falha da invocação em vermelho.
    pub fn fail(&mut self, reason: &str) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        eprintln!("  {} Run failed: {reason}", self.red.apply_to("✗"));
    }

    /// Imprime o relatório de auditoria formatado em JSON.
    ///
    /// Um relatório sem `completed_at` é parcial: lista apenas os lotes
    /// aplicados antes da falha, que não são revertidos.
    pub fn print_report(&self, report: &RunReport) -> serde_json::Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let summary = format!(
            "{} batches, {} instances",
            report.batches.len(),
            report.instance_count()
        );
        eprintln!();
        if report.completed_at.is_some() {
            eprintln!("{}", self.green.apply_to(format!("─── {summary} ───")));
        } else {
            eprintln!(
                "{}",
                self.red.apply_to(format!("─── partial report: {summary} applied ───"))
            );
        }
        println!("{json}");
        Ok(())
    }
}

impl RunObserver for TerminalObserver {
    fn batch_started(&mut self, group: &GroupKey, bucket: &BucketKey, ids: &[String]) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("{group} / {bucket}: {} instance(s)", ids.len()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        self.pb = Some(pb);
    }

    fn still_waiting(&mut self, progress: &PollProgress<'_>) {
        if let Some(pb) = &self.pb {
            pb.println(format!(
                "  {} Attempt {}: waiting on {:?} ({}ms)",
                self.yellow.apply_to("↻"),
                progress.attempt,
                progress.partition.pending,
                progress.delay.as_millis()
            ));
        }
    }

    fn batch_finished(&mut self, record: &BatchRecord) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        let note = if record.wait_skipped {
            " (wait skipped)".to_string()
        } else {
            format!(" after {} poll(s)", record.attempts)
        };
        eprintln!(
            "  {} {} / {}: {:?}{note}",
            self.green.apply_to("✓"),
            record.group,
            record.bucket,
            record.instance_ids
        );
    }
}

/// Imprime o plano de grupos e lotes sem executar transições.
pub fn print_plan(plan: &Plan) {
    let term = Term::stdout();
    let header = Style::new().cyan().bold();
    for (group, buckets) in plan {
        let _ = term.write_line(&format!("{}", header.apply_to(group)));
        for (position, bucket) in buckets.iter().enumerate() {
            let _ = term.write_line(&format!(
                "  {}. {}: {}",
                position + 1,
                bucket.key,
                bucket.instance_ids().join(", ")
            ));
        }
    }
}
