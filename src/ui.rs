//! Saída de terminal de uma execução do quickapply.
//!
//! Usa `indicatif` para o spinner enquanto uma cidade é pesquisada ou uma
//! vaga avaliada, e `console` para colorir o resultado de cada vaga, a cota
//! restante e o resumo final. Tudo passa pela barra de progresso, então uma
//! barra oculta (testes) não imprime nada.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::orchestrator::{RunQuota, RunSummary};
use crate::state_machine::{ApplicationOutcome, Attempt, JobCandidate};

pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    cyan: Style,
    dim: Style,
}

impl RunProgress {
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(pb)
    }

    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(pb: ProgressBar) -> Self {
        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
            dim: Style::new().dim(),
        }
    }

    pub fn searching(&self, city: &str) {
        self.pb.set_message(format!("Searching in {city}"));
    }

    pub fn evaluating(&self, candidate: &JobCandidate) {
        self.pb
            .set_message(format!("Evaluating {} at {}", candidate.title, candidate.company));
    }

    pub fn outcome(&self, attempt: &Attempt) {
        let job = format!("{} at {}", attempt.candidate.title, attempt.candidate.company);
        let detail = attempt
            .rationale
            .as_ref()
            .map(|r| format!(" {}", self.dim.apply_to(format!("({r})"))))
            .unwrap_or_default();
        let line = match attempt.outcome() {
            Some(ApplicationOutcome::Applied) => {
                let distance = attempt
                    .distance_miles
                    .map(|miles| format!(" ({miles} miles)"))
                    .unwrap_or_default();
                format!("  {} Applied: {job}{distance}", self.green.apply_to("✓"))
            }
            Some(ApplicationOutcome::Queued) => {
                format!("  {} Queued: {job}", self.cyan.apply_to("→"))
            }
            Some(ApplicationOutcome::Skipped) => {
                format!("  {} Skipped: {job}{detail}", self.yellow.apply_to("-"))
            }
            Some(ApplicationOutcome::Error) => {
                format!("  {} Error: {job}{detail}", self.red.apply_to("✗"))
            }
            None => format!("  ? {job} stopped in {}", attempt.state),
        };
        self.pb.println(line);
    }

    pub fn remaining(&self, quota: &RunQuota) {
        self.pb.println(format!(
            "  {}",
            self.dim.apply_to(format!(
                "Remaining applications: {}/{}",
                quota.remaining(),
                quota.max()
            ))
        ));
    }

    pub fn finish(&self, summary: &RunSummary) {
        self.pb.println("");
        self.pb.println(format!(
            "{}",
            self.cyan.apply_to("─── Run summary ───")
        ));
        self.pb.println(format!(
            "  {} processed: {} applied, {} skipped, {} queued, {} errors",
            summary.total(),
            self.green.apply_to(summary.applied),
            self.yellow.apply_to(summary.skipped),
            self.cyan.apply_to(summary.queued),
            self.red.apply_to(summary.errors),
        ));
        self.pb.finish_and_clear();
    }
}
