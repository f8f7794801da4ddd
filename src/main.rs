use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod browser;
mod config;
mod error;
mod ics;
mod info;
mod timetable;
mod utils;

use config::{Config, CONFIG_FILE};
use info::{Semester, Source};

/// Export your weekly PowerSchool schedule as an .ics file
#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Args {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::load(Path::new(CONFIG_FILE))? {
        Some(loaded) => {
            println!("Loaded custom {CONFIG_FILE}");
            if !loaded.missing.is_empty() {
                println!(
                    "Warning: {CONFIG_FILE} is missing {}, defaults are used",
                    loaded.missing.join(", ")
                );
            }
            loaded.config
        }
        None => Config::default(),
    };
    let tz = config.tz()?;

    println!("PowerSchool schedule to ICS");
    println!("1. A browser will open, log in to PowerSchool");
    println!("2. Go to your schedule page if not already there");
    println!("3. Wait until your full weekly schedule is visible");
    println!("4. Switch back here and press ENTER\n");

    let user_agent = format!("ps2ics/{}", env!("CARGO_PKG_VERSION"));
    let html = browser::fetch(
        &config.webdriver_url,
        &config.source_url,
        timetable::TABLE_ID,
        &user_agent,
    )
    .await
    .with_context(|| format!("can't drive the browser through {}", config.webdriver_url))?;

    // Auto-detect semester dates
    let info = info::info(&html, Semester::default());
    let semester = info.semester;
    match info.source {
        Source::Page => println!("Semester: {} to {}", semester.start, semester.end),
        Source::Fallback => println!(
            "Semester dates not found in the page, falling back to {} to {}",
            semester.start, semester.end
        ),
    }

    let courses = match timetable::timetable(&html) {
        Ok(courses) => courses,
        Err(e) => {
            println!("Parsing failed: {e}");
            return Ok(());
        }
    };
    println!("Found {} class entries", courses.len());
    for course in &courses {
        debug!(
            course = course.name,
            day = course.day_name,
            date = course.date,
            column = course.day_index,
            "class found"
        );
    }

    if courses.is_empty() {
        println!("No classes found. Is the schedule visible?");
        return Ok(());
    }

    let events =
        timetable::build(&courses, semester, tz).context("can't build the weekly events")?;

    let path = ics::export(&events, tz, semester, Path::new(ics::OUTPUT_FILE))?;

    println!("\nCalendar with {} events saved to: {}", events.len(), path.display());
    println!("\nTo import into Google Calendar:");
    println!("   1. Go to https://calendar.google.com");
    println!("   2. Click Settings, then 'Import & export'");
    println!("   3. Upload this .ics file");

    Ok(())
}
