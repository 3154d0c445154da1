use std::error::Error as StdError;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;

use wordwise::catalog::{CatalogProvider, StaticCatalog, lookup_any};
use wordwise::config::Config;
use wordwise::session::{ReviewSession, Step};
use wordwise::store::{self, JsonStore};
use wordwise::{Grade, Library, stats, web};

type CliResult = Result<(), Box<dyn StdError>>;

const USAGE: &str = "\
Usage: wordwise [--data-dir PATH] [--catalog FILE.csv] <command> [args...]
Commands:
  levels                           List catalog levels
  catalog <level>                  List catalog words for a level
  study <level> <word>             Start learning a catalog or custom word
  add <word> <translation> [level] Add a word to your custom dictionary
  custom                           List your custom words
  remove-custom <id>               Remove a custom word
  list                             List all words in the book
  due                              List words due for review
  learned <word>                   Mark a word as learned
  remove <word>                    Remove a word from the book
  drill                            Review due words in the terminal
  stats                            Show progress statistics
  export <file.json>               Write a backup
  import <file.json>               Merge a backup into the library
  export-csv <file.csv>            Write the word list as CSV
  import-csv <file.csv>            Add words from a CSV word list
  clear --yes                      Delete all words and custom words
  serve [-p PORT]                  Start the JSON API (default port 3000)";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config, rest) = match Config::resolve(&args, |key| std::env::var(key).ok()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    if rest.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }

    if let Err(e) = run(&config, &rest) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(config: &Config, args: &[String]) -> CliResult {
    let store = JsonStore::in_dir(&config.data_dir);
    let arg = |i: usize| args.get(i).map(String::as_str);

    match (args[0].as_str(), arg(1), arg(2), arg(3)) {
        ("levels", ..) => {
            for level in load_catalog(config)?.levels() {
                println!("{level}");
            }
        }
        ("catalog", Some(level), ..) => {
            let catalog = load_catalog(config)?;
            let library = store::load_library(&store)?;
            for entry in catalog.words_for_level(level)? {
                let mark = if library.book.contains(&entry.word) { "*" } else { " " };
                println!("{mark} {:<16} {:<24} {}", entry.word, entry.translation, entry.pos);
            }
        }
        ("study", Some(level), Some(word), _) => {
            let catalog = load_catalog(config)?;
            let mut library = store::load_library(&store)?;
            let providers: [&dyn CatalogProvider; 2] = [&catalog, &library.custom];
            let entry = lookup_any(&providers, level, word)?
                .ok_or_else(|| format!("{word} is not in level {level}"))?;
            library.book.add(&entry.word, &entry.translation, level, Utc::now())?;
            store::save_library(&store, &library, Utc::now())?;
            println!("Added {} ({}).", entry.word, entry.translation);
        }
        ("add", Some(word), Some(translation), level) => {
            let mut library = store::load_library(&store)?;
            let added = library
                .custom
                .add(word, translation, level.unwrap_or("custom"), Utc::now())?
                .clone();
            store::save_library(&store, &library, Utc::now())?;
            println!("Added {} to your dictionary (id {}).", added.word(), added.id());
        }
        ("custom", ..) => {
            let library = store::load_library(&store)?;
            for w in library.custom.words() {
                println!("{:<16} {:<24} {:<8} {}", w.word(), w.translation(), w.level(), w.id());
            }
        }
        ("remove-custom", Some(id), ..) => {
            let mut library = store::load_library(&store)?;
            let removed = library.custom.remove(id)?;
            store::save_library(&store, &library, Utc::now())?;
            println!("Removed {}.", removed.word());
        }
        ("list", ..) => {
            let library = store::load_library(&store)?;
            for r in library.book.records() {
                let status = if r.is_learned() { "learned" } else { "learning" };
                println!(
                    "{:<16} {:<24} {:<6} {:<8} reps {:>2}  next {}",
                    r.word(),
                    r.translation(),
                    r.level(),
                    status,
                    r.schedule().repetitions(),
                    r.schedule().next_review().format("%Y-%m-%d")
                );
            }
        }
        ("due", ..) => {
            let library = store::load_library(&store)?;
            let due = library.book.due(Utc::now());
            println!("{} words due.", due.len());
            for r in due {
                println!("  {:<16} {}", r.word(), r.translation());
            }
        }
        ("learned", Some(word), ..) => {
            let mut library = store::load_library(&store)?;
            library.book.mark_learned(word, Utc::now())?;
            store::save_library(&store, &library, Utc::now())?;
            println!("Marked {word} as learned.");
        }
        ("remove", Some(word), ..) => {
            let mut library = store::load_library(&store)?;
            library.book.remove(word)?;
            store::save_library(&store, &library, Utc::now())?;
            println!("Removed {word}.");
        }
        ("drill", ..) => drill(&store)?,
        ("stats", ..) => {
            let library = store::load_library(&store)?;
            print_stats(&library);
        }
        ("export", Some(path), ..) => {
            let library = store::load_library(&store)?;
            store::write_backup(Path::new(path), &store::export_backup(&library, Utc::now()))?;
            println!(
                "Exported {} words and {} custom words to {path}.",
                library.book.len(),
                library.custom.len()
            );
        }
        ("import", Some(path), ..) => {
            let mut library = store::load_library(&store)?;
            let report = store::import_backup(&mut library, store::read_backup(Path::new(path))?)?;
            store::save_library(&store, &library, Utc::now())?;
            println!(
                "Imported {} words ({} skipped) and {} custom words ({} skipped).",
                report.added, report.skipped, report.custom_added, report.custom_skipped
            );
        }
        ("export-csv", Some(path), ..) => {
            let library = store::load_library(&store)?;
            store::export_word_list(Path::new(path), library.book.records())?;
            println!("Exported {} words to {path}.", library.book.len());
        }
        ("import-csv", Some(path), ..) => {
            let mut library = store::load_library(&store)?;
            let report = store::import_word_list(&mut library.book, Path::new(path), Utc::now())?;
            store::save_library(&store, &library, Utc::now())?;
            println!("Imported {} words, skipped {}.", report.added, report.skipped);
        }
        ("clear", Some("--yes"), ..) => {
            let mut library = store::load_library(&store)?;
            store::clear_all(&store, &mut library)?;
            println!("All data deleted.");
        }
        ("clear", ..) => {
            return Err("this deletes every word and custom word; run 'clear --yes' to confirm".into());
        }
        ("serve", ..) => {
            let library = store::load_library(&store)?;
            let catalog = load_catalog(config)?;
            println!("Loaded {} words from {}.", library.book.len(), store.path().display());
            let state = web::AppState::new(library, Arc::new(store), Arc::new(catalog), Utc::now);
            tokio::runtime::Runtime::new()?.block_on(web::serve(state, config.port))?;
        }
        (cmd, ..) => {
            return Err(format!("bad arguments for '{cmd}'\n{USAGE}").into());
        }
    }
    Ok(())
}

fn load_catalog(config: &Config) -> Result<StaticCatalog, Box<dyn StdError>> {
    Ok(match &config.catalog {
        Some(path) => StaticCatalog::load_csv(path)?,
        None => StaticCatalog::builtin()?,
    })
}

fn print_stats(library: &Library) {
    let now = Utc::now();
    let records = library.book.records();
    let s = stats::statistics(records, now);
    println!("Words: {} ({} learning, {} learned)", s.total, s.learning, s.learned);
    println!("Custom words: {}", library.custom.len());
    println!("Due now: {}", s.due);
    println!("Learned today: {}", s.learned_today);
    match s.accuracy {
        Some(a) => println!(
            "Accuracy: {:.0}% ({}/{})",
            a * 100.0,
            s.correct_answers,
            s.total_answers
        ),
        None => println!("Accuracy: no reviews yet"),
    }
    let levels = stats::level_summaries(records, now);
    if !levels.is_empty() {
        println!("Levels:");
        for l in levels {
            println!(
                "  {:<8} {} total, {} due, {} learned",
                l.name, l.total, l.due, l.learned
            );
        }
    }
}

fn drill(store: &JsonStore) -> CliResult {
    let mut library = store::load_library(store)?;
    let mut session = ReviewSession::start(&library.book, Utc::now());
    if session.is_empty() {
        println!("No words due for review.");
        return Ok(());
    }
    println!("{} words due for review.\n", session.len());

    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    let mut buf = String::new();

    while let Some(id) = session.current().map(str::to_string) {
        let record = library
            .book
            .get_by_id(&id)
            .ok_or_else(|| format!("record {id} disappeared"))?;
        println!("[{}/{}] {}", session.position() + 1, session.len(), record.level());
        println!();
        println!("{}", record.word());
        println!();

        print!("Press Enter to reveal...");
        io::stdout().flush()?;
        buf.clear();
        stdin.read_line(&mut buf)?;
        println!("{}", record.translation());
        println!();

        let grade = loop {
            print!("Rate 0-5 (0=blackout, 3=recalled with effort, 5=perfect), q to stop: ");
            io::stdout().flush()?;
            buf.clear();
            if stdin.read_line(&mut buf)? == 0 || buf.trim() == "q" {
                break None;
            }
            if let Ok(n) = buf.trim().parse::<u8>()
                && let Ok(g) = Grade::new(n)
            {
                break Some(g);
            }
            println!("Please enter a number from 0 to 5.");
        };

        let Some(grade) = grade else {
            let summary = session.cancel();
            store::save_library(store, &library, Utc::now())?;
            println!(
                "Stopped after {} words, {} left for later.",
                summary.reviewed, summary.remaining
            );
            return Ok(());
        };

        let step = session.submit(&mut library.book, grade, Utc::now())?;
        store::save_library(store, &library, Utc::now())?;
        println!();

        if let Step::Complete(summary) = step {
            println!("Session complete!");
            println!(
                "  Reviewed: {}, Correct: {}, Failed: {}",
                summary.reviewed, summary.correct, summary.failed
            );
        }
    }
    Ok(())
}
