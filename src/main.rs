//! calibre-filter entry point.

use calibre_filter::{
    AppError, CalibreBook, CalibreFilter, CalibreLibrary,
    calibre::Page,
    config::{Cli, Command, Config, ScopeArgs},
};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calibre_filter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Init and filter never read the config file
    let config = if cli.command.reads_config() {
        load_config(cli.config.as_deref(), cli.library.clone())?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Filter { lang, tag } => cmd_filter(CalibreFilter::new(lang, tag)),
        Command::Books { scope, page, json } => {
            let library = open_library(&config)?;
            let filter = resolve_scope(&library, &config, &scope)?;
            let result = library.books_page(&filter, page, config.catalog.page_size)?;
            print_page(&result, json)
        }
        Command::Recent { scope, limit, json } => {
            let library = open_library(&config)?;
            let filter = resolve_scope(&library, &config, &scope)?;
            let limit = limit.unwrap_or(config.catalog.page_size);
            let books =
                library.recent_books(&filter, config.catalog.title_time_sort, limit)?;
            print_books(&books, json)
        }
        Command::Search {
            term,
            scope,
            page,
            json,
        } => {
            let library = open_library(&config)?;
            let filter = resolve_scope(&library, &config, &scope)?;
            let result = library.search_books(&filter, &term, page, config.catalog.page_size)?;
            print_page(&result, json)
        }
        Command::Show { id, scope } => {
            let library = open_library(&config)?;
            let filter = resolve_scope(&library, &config, &scope)?;
            match library.book(&filter, id)? {
                Some(book) => println!("{}", serde_json::to_string_pretty(&book)?),
                None => println!("Book not found: {}", id),
            }
            Ok(())
        }
        Command::Languages { json } => {
            let languages = open_library(&config)?.languages()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&languages)?);
            } else {
                println!("{:<8} CODE", "ID");
                println!("{}", "-".repeat(20));
                for lang in languages {
                    println!("{:<8} {}", lang.id, lang.lang_code);
                }
            }
            Ok(())
        }
        Command::Tags { json } => {
            let tags = open_library(&config)?.tags()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tags)?);
            } else {
                println!("{:<8} NAME", "ID");
                println!("{}", "-".repeat(40));
                for tag in tags {
                    println!("{:<8} {}", tag.id, tag.name);
                }
            }
            Ok(())
        }
    }
}

/// Load, validate, and apply CLI overrides.
fn load_config(path: Option<&Path>, library: Option<PathBuf>) -> anyhow::Result<Config> {
    let config_path = path.map(Path::to_path_buf).or_else(Config::find_config_file);

    let mut config = if let Some(ref path) = config_path {
        tracing::debug!(path = %path.display(), "Loading config");
        Config::load(path)?
    } else {
        Config::default()
    };
    config.validate()?;

    if let Some(dir) = library {
        config.calibre.dir = Some(dir);
    }
    Ok(config)
}

/// Write the default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("config.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());
    println!("\nSet calibre.dir in config.toml, or pass --library <dir>.");

    Ok(())
}

/// Print a filter expression and its bindings.
fn cmd_filter(filter: CalibreFilter) -> anyhow::Result<()> {
    println!("{}", filter.books_filter());
    for (name, value) in filter.params() {
        println!("  {} = {}", name, value);
    }
    Ok(())
}

fn open_library(config: &Config) -> anyhow::Result<CalibreLibrary> {
    let dir = config.calibre_dir()?;
    Ok(CalibreLibrary::open(dir)?)
}

/// Turn CLI scope (or the configured default) into selector IDs.
fn resolve_scope(
    library: &CalibreLibrary,
    config: &Config,
    scope: &ScopeArgs,
) -> anyhow::Result<CalibreFilter> {
    if scope.all {
        return Ok(CalibreFilter::none());
    }

    let lang_code = scope.lang.as_deref().or(config.catalog.language.as_deref());
    let tag_name = scope.tag.as_deref().or(config.catalog.tag.as_deref());

    let lang = match lang_code {
        Some(code) => Some(
            library
                .language_id(code)?
                .ok_or_else(|| AppError::BadInput(format!("Unknown language: {}", code)))?,
        ),
        None => None,
    };
    let tag = match tag_name {
        Some(name) => Some(
            library
                .tag_id(name)?
                .ok_or_else(|| AppError::BadInput(format!("Unknown tag: {}", name)))?,
        ),
        None => None,
    };

    tracing::debug!(?lang, ?tag, "Resolved scope");
    Ok(CalibreFilter::new(lang, tag))
}

fn print_page(page: &Page<CalibreBook>, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(page)?);
        return Ok(());
    }

    print_books(&page.entries, false)?;
    println!(
        "\nPage {} of {} ({} books)",
        page.page + 1,
        page.pages.max(1),
        page.total
    );
    Ok(())
}

fn print_books(books: &[CalibreBook], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(books)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("No books found.");
        return Ok(());
    }

    println!("{:<8} {:<50} {:<24} ADDED", "ID", "TITLE", "AUTHOR");
    println!("{}", "-".repeat(100));
    for book in books {
        let added = book
            .added_at()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{:<8} {:<50} {:<24} {}",
            book.id,
            book.title,
            book.author_sort.as_deref().unwrap_or(""),
            added
        );
    }
    Ok(())
}
