// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Presentation helpers shared by the terminal and the dashboard

use std::fmt::Write;

use crate::analysis::AnalysisResult;
use crate::session::{AnalysisPhase, SessionSnapshot};

/// What the results area shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayState<'a> {
    /// Nothing to show yet
    Idle,
    Loading,
    Result(&'a AnalysisResult),
}

impl<'a> DisplayState<'a> {
    /// Derive the results area from session state; errors never show as loading
    pub fn of(snapshot: &'a SessionSnapshot) -> Self {
        if snapshot.phase == AnalysisPhase::Loading {
            return DisplayState::Loading;
        }
        match &snapshot.result {
            Some(result) => DisplayState::Result(result),
            None => DisplayState::Idle,
        }
    }
}

/// Render a result as plain text for the terminal
pub fn render_text(result: &AnalysisResult) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "PRIMARY RECOMMENDATION");
    let _ = writeln!(out, "  {}\n", result.primary_recommendation);

    let _ = writeln!(out, "KEY INSIGHTS");
    for (i, insight) in result.key_insights.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, insight);
    }

    let _ = writeln!(out, "\nRISKS");
    for risk in &result.risks {
        let _ = writeln!(out, "  ! {}", risk);
    }

    let _ = writeln!(out, "\nPROBLEMS ({})", result.problems.len());
    for problem in &result.problems {
        let _ = writeln!(out, "  [{}] {}", problem.severity.as_str(), problem.title);
        let _ = writeln!(out, "      {}", problem.description);
        if !problem.affected_zones.is_empty() {
            let _ = writeln!(out, "      Zones: {}", problem.affected_zones.join(", "));
        }
    }

    let _ = writeln!(out, "\nROOT CAUSES ({})", result.root_causes.len());
    for cause in &result.root_causes {
        let _ = writeln!(out, "  - {}", cause.description);
        let _ = writeln!(out, "      Evidence: {}", cause.data_evidence);
        let _ = writeln!(out, "      Research: {}", cause.research_basis);
    }

    let _ = writeln!(out, "\nSTRATEGIES ({})", result.strategies.len());
    for strategy in &result.strategies {
        let _ = writeln!(out, "  - {}: {}", strategy.title, strategy.details);
        let _ = writeln!(out, "      Source: {}", strategy.source);
    }

    let _ = writeln!(out, "\nPROTOTYPE");
    let _ = writeln!(out, "  Logic: {}", result.prototype.logic);
    let _ = writeln!(out, "  Pseudocode:");
    for line in result.prototype.pseudocode.lines() {
        let _ = writeln!(out, "    {}", line);
    }
    let _ = writeln!(out, "  Notes: {}", result.prototype.implementation_notes);

    out
}
