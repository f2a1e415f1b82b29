use console::{Style, style};

use crate::officer::CycleReport;
use crate::package::{Package, PackageState};
use crate::target::Target;

pub struct Display;

impl Display {
    pub fn new() -> Self {
        Self
    }

    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", style(text).bold().cyan());
        println!("{}", style("═".repeat(60)).dim());
        println!();
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", style("error:").bold().red(), message);
    }

    pub fn print_ok(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn print_target_summary(&self, target: &Target) {
        println!(
            "{}  {}  {}",
            style(&target.id).bold(),
            style(&target.name).white(),
            style(format!("[{} p{}]", target.category, target.priority)).dim()
        );
        println!(
            "    Status: {}  Package: {}",
            style(target.status.to_string()).yellow(),
            target.current_package.as_deref().unwrap_or("-")
        );
    }

    pub fn print_package_summary(&self, package: &Package) {
        let status_style = self.state_style(package.state);
        println!(
            "{}  {}  {}",
            style(&package.id).bold(),
            status_style.apply_to(package.state.to_string()),
            style(format!(
                "[{} v{} {}]",
                package.kind, package.version, package.validation_level
            ))
            .dim()
        );
    }

    pub fn print_package_detail(&self, package: &Package) {
        self.print_header(&format!("Package: {}", package.id));

        println!("Target:      {}", package.target_id);
        println!("Kind:        {}", package.kind);
        println!(
            "State:       {}",
            self.state_style(package.state)
                .apply_to(package.state.to_string())
        );
        println!("Validation:  {}", package.validation_level);
        println!("Retries:     {}", package.retry_count);
        println!("Summary:     {}", package.summary);

        if !package.endpoints.is_empty() {
            println!("Endpoints:");
            for endpoint in &package.endpoints {
                println!("    {}", style(endpoint).dim());
            }
        }
        if !package.expected_outputs.is_empty() {
            println!("Expected outputs:");
            for output in &package.expected_outputs {
                let status = package
                    .manifest_entry_for(&output.path)
                    .map(|e| e.status.to_string())
                    .unwrap_or_else(|| "unreconciled".to_string());
                println!("    {} ({})", output.path, status);
            }
        }
        if let Some(handoff) = package.current_handoff() {
            println!(
                "Handoff:     {} ({})",
                handoff.id,
                style(handoff.status.to_string()).yellow()
            );
        }
        println!();
    }

    pub fn print_history(&self, package: &Package) {
        self.print_header(&format!("History: {}", package.id));
        for entry in &package.state_history {
            println!(
                "{}  {} → {}",
                style(entry.at.format("%Y-%m-%d %H:%M:%S").to_string()).dim(),
                entry.from,
                self.state_style(entry.to).apply_to(entry.to.to_string())
            );
            println!("    {}", entry.reason);
        }
        println!();
    }

    pub fn print_report(&self, report: &CycleReport) {
        self.print_header(&format!("Cycle report: {}", report.cycle_id));

        println!("Targets scanned:   {}", report.targets_scanned);
        println!("Transitions:       {}", report.transitions);
        println!("Created:           {}", report.packages_created.join(", "));
        println!("Failed:            {}", report.packages_failed.join(", "));
        println!("Closed:            {}", report.packages_closed.join(", "));

        if !report.state_counts.is_empty() {
            println!("Packages by state:");
            for (state, count) in &report.state_counts {
                println!("    {:18} {}", state, count);
            }
        }
        if !report.stuck.is_empty() {
            println!("{}", style("Stuck candidates:").yellow());
            for candidate in &report.stuck {
                println!(
                    "    {} in {} for {}m (estimate {}m)",
                    candidate.package_id,
                    candidate.state,
                    candidate.minutes_in_flight,
                    candidate.estimated_minutes
                );
            }
        }
        println!();
    }

    fn state_style(&self, state: PackageState) -> Style {
        match state {
            PackageState::Closed => Style::new().green(),
            PackageState::Validated | PackageState::Completed | PackageState::OutputsIngested => {
                Style::new().cyan()
            }
            PackageState::Failed => Style::new().red(),
            PackageState::Draft | PackageState::Ready => Style::new().white(),
            _ => Style::new().yellow(),
        }
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
