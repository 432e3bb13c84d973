use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

use crate::simulation::SimulationSummary;

/// Every seed's run of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub description: String,
    pub runs: Vec<SimulationSummary>,
}

impl ScenarioResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.runs.iter().all(SimulationSummary::passed)
    }

    fn passed_runs(&self) -> usize {
        self.runs.iter().filter(|run| run.passed()).count()
    }
}

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let passed = results.iter().filter(|r| r.passed()).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / results.len().max(1) as f64) * 100.0;
    rate
}

fn best_average(run: &SimulationSummary) -> String {
    run.best_average_secs
        .map_or_else(|| "-".to_string(), |secs| format!("{secs:.2}s"))
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=============================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed()).count();
    writeln!(out, "Total scenarios: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", (total - passed).to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed() {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{status} {}", result.scenario_name.bold())?;
        writeln!(
            out,
            "   Seeds: {}/{} clean",
            result.passed_runs(),
            result.runs.len()
        )?;
        for run in &result.runs {
            writeln!(
                out,
                "   seed {:>6}: {} sessions, {} taps, level {}, {} coins, best {}, {} records",
                run.seed,
                run.sessions,
                run.taps,
                run.level,
                run.currency,
                best_average(run),
                run.new_records
            )?;
            for failure in &run.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Tapper's Log Simulation Results\n")?;
    let total = results.len();
    let passed = results.iter().filter(|r| r.passed()).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed() { "✅" } else { "❌" };
        writeln!(out, "### {status} {}\n", result.scenario_name)?;
        writeln!(out, "_{}_\n", result.description)?;
        writeln!(
            out,
            "| Seed | Sessions | Taps | Level | Coins | Best avg | Records | Cycle coverage |"
        )?;
        writeln!(out, "|---|---|---|---|---|---|---|---|")?;
        for run in &result.runs {
            let coverage = run
                .mean_cycle_coverage
                .map_or_else(|| "-".to_string(), |share| format!("{:.0}%", share * 100.0));
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} | {coverage} |",
                run.seed,
                run.sessions,
                run.taps,
                run.level,
                run.currency,
                best_average(run),
                run.new_records
            )?;
        }
        let failures: Vec<_> = result.runs.iter().flat_map(|run| &run.failures).collect();
        if !failures.is_empty() {
            writeln!(out, "\n- **Failures**:")?;
            for failure in failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
