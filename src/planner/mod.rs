// Copyright 2023 Remi Bernotavicius

pub mod constraints;
pub mod filter;
pub mod nutrients;
pub mod scheduler;
pub mod solver;
pub mod summary;

pub use scheduler::{run_weekly_plan, DayOutcome, DayStatus};
pub use solver::{solve_selection, SelectionResult};
