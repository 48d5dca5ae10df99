// Copyright 2023 Remi Bernotavicius

use chrono::NaiveDate;
use clap::Parser;
use clap::Subcommand;
use meal_planner::config::PlannerConfig;
use meal_planner::database;
use meal_planner::database::models::{Nutrient, User};
use meal_planner::planner::constraints::DietType;
use meal_planner::planner::{run_weekly_plan, summary};
use meal_planner::{import, query, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(about = "Plans a week of meals within nutrient targets")]
struct Args {
    /// SQLite file to use instead of the one in the user data directory.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Adds the recipes of a plist catalog.
    ImportCatalog { path: PathBuf },
    AddUser { name: String },
    /// Sets the daily range for one nutrient. Zero for either end disables it.
    SetPreference {
        user: String,
        nutrient: Nutrient,
        min: f64,
        max: f64,
    },
    /// `balanced`, or `low_<nutrient>` / `high_<nutrient>`.
    SetDiet { user: String, diet: DietType },
    Dislike { user: String, ingredient: String },
    /// Fills every day of the horizon that does not have enough recipes yet.
    Plan {
        user: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[command(flatten)]
        config: PlannerConfig,
    },
    Show {
        user: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long, default_value_t = 7)]
        days: u64,
    },
    /// Forgets every planned day and all usage history of a user.
    Reset { user: String },
    /// Nutrient totals per day and for the whole horizon.
    Summary {
        user: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long, default_value_t = 7)]
        days: u64,
    },
}

/// This is where the database and other user-data lives on-disk. On Linux it should be like:
/// `~/.local/share/meal_planner/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("meal_planner");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn user_named(conn: &mut database::Connection, name: &str) -> Result<User> {
    Ok(query::find_user(conn, name)?.ok_or_else(|| format!("no user named {name:?}"))?)
}

fn print_week(conn: &mut database::Connection, user: &User, start: NaiveDate, days: u64) -> Result<()> {
    for (day, recipes) in query::week_plan(conn, user.id, start, days)? {
        let titles: Vec<&str> = recipes.iter().map(|r| r.title.as_str()).collect();
        println!(
            "{} {day}: {}",
            summary::full_day_name(chrono::Datelike::weekday(&day)),
            titles.join(", ")
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    simple_logger::SimpleLogger::new().with_level(level).init()?;

    let path = match args.database {
        Some(path) => path,
        None => data_path()?.join("data.sqlite"),
    };
    let mut conn = database::establish_connection(path)?;
    let conn = &mut conn;

    match args.commands {
        Commands::ImportCatalog { path } => {
            let report = import::import_catalog(conn, path)?;
            println!(
                "imported {} recipes, skipped {}",
                report.imported, report.dropped
            );
        }
        Commands::AddUser { name } => {
            let id = query::add_user(conn, &name)?;
            println!("added user {name} ({id})");
        }
        Commands::SetPreference {
            user,
            nutrient,
            min,
            max,
        } => {
            let user = user_named(conn, &user)?;
            query::set_nutrient_bounds(conn, user.id, nutrient, Some(min), Some(max))?;
        }
        Commands::SetDiet { user, diet } => {
            let user = user_named(conn, &user)?;
            query::set_diet_type(conn, user.id, diet)?;
        }
        Commands::Dislike { user, ingredient } => {
            let user = user_named(conn, &user)?;
            let ingredient = query::find_or_add_ingredient(conn, &ingredient)?;
            query::add_disliked_ingredient(conn, user.id, ingredient)?;
        }
        Commands::Plan {
            user,
            start,
            config,
        } => {
            let user = user_named(conn, &user)?;
            let start = start.unwrap_or_else(today);
            for outcome in run_weekly_plan(conn, user.id, start, &config)? {
                println!("{} {}", outcome.day, outcome.status);
            }
            print_week(conn, &user, start, config.horizon_days)?;
        }
        Commands::Show { user, start, days } => {
            let user = user_named(conn, &user)?;
            print_week(conn, &user, start.unwrap_or_else(today), days)?;
        }
        Commands::Reset { user } => {
            let user = user_named(conn, &user)?;
            let removed = query::reset_plan(conn, user.id)?;
            println!("removed {removed} planned recipes");
        }
        Commands::Summary { user, start, days } => {
            let user = user_named(conn, &user)?;
            let week = query::week_plan(conn, user.id, start.unwrap_or_else(today), days)?;
            let catalog = query::load_catalog(conn, None)?;
            println!("{}", summary::summarize(&week, &catalog));
        }
    }
    Ok(())
}
