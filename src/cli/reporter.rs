// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use super::stats::GeometryStats;
use crate::sop::{Operator, ParameterValue, SopNode};
use colored::*;
use std::time::Duration;

pub struct Reporter;

impl Reporter {
    /// Report geometry statistics with colors
    pub fn report_stats(title: &str, stats: &GeometryStats, duration: Option<Duration>) {
        println!("\n{}", "━".repeat(80).bright_black());
        println!("{} {}", "Geometry:".bold(), title.cyan());
        println!("{}", "━".repeat(80).bright_black());

        Self::print_count("Points", stats.points);
        Self::print_count("Vertices", stats.vertices);
        Self::print_count("Primitives", stats.primitives);
        Self::print_count("Edges", stats.edges);

        let closed = if stats.closed { "closed".green() } else { "open".yellow() };
        println!(
            "  {} {} (V-E+F = {})",
            "Surface:".bright_black(),
            closed,
            stats.euler_characteristic()
        );
        if stats.primitives > 0 {
            println!(
                "  {} {}..{} vertices, {:.2} average",
                "Polygons:".bright_black(),
                stats.topology.min_vertices,
                stats.topology.max_vertices,
                stats.topology.avg_vertices
            );
        }
        if let Some(area) = stats.area {
            println!("  {} {:.4}", "Area:".bright_black(), area);
        }
        if let Some(bounds) = &stats.bounds {
            println!(
                "  {} [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
                "Bounds:".bright_black(),
                bounds.min.x,
                bounds.min.y,
                bounds.min.z,
                bounds.max.x,
                bounds.max.y,
                bounds.max.z
            );
        }

        if !stats.attributes.is_empty() {
            println!("\n{}", "Attributes:".bold());
            for (class, names) in &stats.attributes {
                println!("  {} {}", format!("{class}:").bright_black(), names.join(", "));
            }
        }
        if !stats.groups.is_empty() {
            println!("\n{}", "Groups:".bold());
            for (class, names) in &stats.groups {
                println!("  {} {}", format!("{class}:").bright_black(), names.join(", "));
            }
        }

        if let Some(duration) = duration {
            println!("\n{}", "Performance:".bold());
            println!(
                "  {} {}",
                "Cook:".bright_black(),
                Self::format_duration(duration).yellow()
            );
        }
        println!("{}", "━".repeat(80).bright_black());
    }

    /// One line per cooked node
    pub fn report_node(node: &SopNode) {
        let time = node
            .last_cook_time()
            .map(Self::format_duration)
            .unwrap_or_else(|| "cached".to_string());
        println!(
            "  {} {:<16} {}",
            "✓".green(),
            node.name().cyan(),
            time.bright_black()
        );
    }

    /// Operator kind with its parameters and defaults
    pub fn report_operator(operator: &dyn Operator) {
        println!("{}", operator.kind().bold().cyan());
        for def in operator.parameters() {
            let default = match (&def.default, def.options.is_empty()) {
                (ParameterValue::Int(i), false) => format!("{} of {}", i, def.options.join("|")),
                (ParameterValue::String(s), _) => format!("{s:?}"),
                (ParameterValue::Vector3(v), _) => format!("[{}, {}, {}]", v.x, v.y, v.z),
                (value, _) => match value {
                    ParameterValue::Bool(b) => b.to_string(),
                    ParameterValue::Int(i) => i.to_string(),
                    ParameterValue::Float(f) => f.to_string(),
                    _ => String::new(),
                },
            };
            println!(
                "  {:<18} {}",
                def.name,
                default.bright_black()
            );
        }
    }

    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    pub fn report_warning(message: &str) {
        println!("\n{} {}", "⚠️  Warning:".yellow().bold(), message);
    }

    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    fn print_count(name: &str, value: usize) {
        println!(
            "  {} {}",
            format!("{name}:").bright_black(),
            value.to_string().cyan()
        );
    }

    /// Format duration for display
    fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(
            Reporter::format_duration(Duration::from_micros(500)),
            "500µs"
        );
        assert_eq!(
            Reporter::format_duration(Duration::from_millis(5)),
            "5.00ms"
        );
        assert_eq!(Reporter::format_duration(Duration::from_secs(2)), "2.00s");
    }
}
