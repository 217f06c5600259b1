//! Lesson catalog commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bankwise_lessons::LessonCatalog;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

#[derive(Args, Debug)]
pub struct LessonsArgs {
    #[command(subcommand)]
    pub command: LessonsCommands,
}

#[derive(Subcommand, Debug)]
pub enum LessonsCommands {
    /// Compile a lesson catalog and report problems
    Validate {
        /// Catalog file (.toml or .json)
        catalog: PathBuf,

        /// Fail when any warning is reported
        #[arg(long)]
        strict: bool,
    },
}

pub fn run(args: LessonsArgs) -> Result<()> {
    match args.command {
        LessonsCommands::Validate { catalog, strict } => validate(&catalog, strict),
    }
}

/// Parse a catalog, choosing the format from the file extension.
pub fn load_catalog(path: &Path) -> Result<LessonCatalog> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let catalog = if is_json {
        LessonCatalog::from_json_str(&contents)
    } else {
        LessonCatalog::from_toml_str(&contents)
    };
    catalog.with_context(|| format!("Invalid catalog {}", path.display()))
}

fn validate(path: &Path, strict: bool) -> Result<()> {
    let catalog = load_catalog(path)?;

    if catalog.is_empty() {
        println!("No lessons found in {}.", path.display());
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Lesson").fg(Color::Cyan),
            Cell::new("Title").fg(Color::Cyan),
            Cell::new("Conditions").fg(Color::Cyan),
            Cell::new("Required actions").fg(Color::Cyan),
            Cell::new("Completion").fg(Color::Cyan),
        ]);

        for lesson in catalog.lessons() {
            let completion = match (lesson.is_slider_only(), lesson.requires_quiz()) {
                (true, false) => "slider-only",
                (true, true) => "content + quiz",
                (false, false) => "required actions",
                (false, true) => "required actions + quiz",
            };
            table.add_row(vec![
                Cell::new(lesson.id()),
                Cell::new(lesson.title()),
                Cell::new(lesson.conditions().len()),
                Cell::new(lesson.required_actions().join(", ")),
                Cell::new(completion),
            ]);
        }
        println!("{table}");
    }

    if catalog.warnings().is_empty() {
        println!("{} lesson(s), no warnings.", catalog.len());
        return Ok(());
    }

    println!();
    println!("Warnings:");
    for warning in catalog.warnings() {
        println!("  {warning}");
    }

    if strict {
        bail!("{} warning(s) in {}", catalog.warnings().len(), path.display());
    }
    Ok(())
}
