// Copyright 2023 Remi Bernotavicius

use crate::planner::solver::{BranchAndBound, Solver};
use std::time::Duration;

#[derive(clap::ValueEnum, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum SolverBackend {
    /// Exact search built into the planner.
    #[default]
    BranchAndBound,
    /// Integer programming through good_lp.
    #[cfg(feature = "lp")]
    Lp,
}

/// Knobs for a planning run. Every field has a command-line flag of the same name.
#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Most recipes selected for a single day.
    #[arg(long, default_value_t = 6)]
    pub max_count: usize,

    /// Days already holding this many recipes are left alone.
    #[arg(long, default_value_t = 3)]
    pub min_recipes_per_day: usize,

    #[arg(long, default_value_t = 7)]
    pub horizon_days: u64,

    /// Recipes eaten this many days before the first planned day are not offered again.
    #[arg(long, default_value_t = 7)]
    pub variety_window_days: u64,

    /// Scale of the secondary objective blend. Zero turns it off.
    #[arg(long, default_value_t = 0.001)]
    pub secondary_weight: f64,

    #[arg(long, value_enum, default_value_t)]
    pub backend: SolverBackend,

    #[arg(long, default_value_t = 2_000_000)]
    pub node_limit: u64,

    #[arg(long)]
    pub time_limit_ms: Option<u64>,

    /// The search stops once nothing left can beat the best plan found by more than this
    /// fraction of its score.
    #[arg(long, default_value_t = 1e-3)]
    pub relative_gap: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_count: 6,
            min_recipes_per_day: 3,
            horizon_days: 7,
            variety_window_days: 7,
            secondary_weight: 0.001,
            backend: SolverBackend::BranchAndBound,
            node_limit: 2_000_000,
            time_limit_ms: None,
            relative_gap: 1e-3,
        }
    }
}

impl PlannerConfig {
    pub fn solver(&self) -> Box<dyn Solver> {
        match self.backend {
            SolverBackend::BranchAndBound => Box::new(BranchAndBound {
                node_limit: self.node_limit,
                time_limit: self.time_limit_ms.map(Duration::from_millis),
                relative_gap: self.relative_gap,
            }),
            #[cfg(feature = "lp")]
            SolverBackend::Lp => Box::new(crate::planner::solver::LpSolver),
        }
    }
}

#[test]
fn flags_default_to_default() {
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        config: PlannerConfig,
    }

    let parsed = Wrapper::parse_from(["meal-planner"]);
    assert_eq!(parsed.config, PlannerConfig::default());

    let parsed = Wrapper::parse_from([
        "meal-planner",
        "--max-count",
        "4",
        "--time-limit-ms",
        "250",
        "--relative-gap",
        "0",
    ]);
    assert_eq!(parsed.config.max_count, 4);
    assert_eq!(parsed.config.time_limit_ms, Some(250));
    assert_eq!(parsed.config.relative_gap, 0.0);
}
