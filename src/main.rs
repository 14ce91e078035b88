use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use policy_scraper::config::Settings;
use policy_scraper::parser::{self, ParserOptions, PolicyParser};
use policy_scraper::{crawler, db, sitemap};

#[derive(Parser)]
#[command(name = "policy_scraper", about = "Recover sections from terms and privacy pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one HTML file or URL and print the policy as JSON
    Parse {
        /// Path to an HTML file, or an http(s) URL
        input: String,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
        /// Minimum text length for a block to count as content
        #[arg(long)]
        min_length: Option<usize>,
        /// Treat bold-only paragraphs as headings
        #[arg(long)]
        emphasis: bool,
    },
    /// Crawl a site for policy pages and store them
    Crawl {
        /// Start URL
        url: String,
        /// Follow only links containing one of these (default: terms, privacy, legal, policy)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,
        /// Max pages to fetch
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Also seed the frontier from the site's sitemap.xml
        #[arg(long)]
        sitemap: bool,
    },
    /// Parse stored pages that have not been processed yet
    Process {
        /// Max pages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Print the stored policy JSON for a URL
    Show {
        url: String,
    },
    /// Show crawl and parse statistics
    Stats,
}

const DEFAULT_KEYWORDS: &[&str] = &["terms", "privacy", "legal", "policy"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(settings = ?settings, "Settings loaded");

    let result = match cli.command {
        Commands::Parse {
            input,
            pretty,
            min_length,
            emphasis,
        } => {
            let html = if input.starts_with("http://") || input.starts_with("https://") {
                let client = crawler::build_client(&settings)?;
                crawler::fetch_page(&client, &input).await?
            } else {
                std::fs::read_to_string(&input)
                    .with_context(|| format!("Failed to read {}", input))?
            };
            let mut options = settings.parser_options();
            if let Some(n) = min_length {
                options.min_text_length = n;
            }
            options.emphasis_headings |= emphasis;

            let parser = PolicyParser::with_options(&html, options);
            let policy = match parser.try_parse() {
                Ok(policy) => policy,
                Err(e) => bail!("{}: {}", input, e),
            };
            let json = if pretty {
                policy.to_json_pretty()?
            } else {
                policy.to_json()?
            };
            println!("{}", json);
            Ok(())
        }
        Commands::Crawl {
            url,
            keywords,
            limit,
            sitemap,
        } => {
            let keywords = if keywords.is_empty() {
                DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
            } else {
                keywords
            };
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;

            let client = crawler::build_client(&settings)?;
            let mut crawler = crawler::Crawler::new(&url, client.clone())?;
            if sitemap {
                match sitemap::fetch_policy_urls(&client, crawler.start(), &keywords).await {
                    Ok(urls) => crawler.seed(urls),
                    Err(e) => tracing::warn!("No usable sitemap for {}: {}", crawler.origin(), e),
                }
            }

            let max_pages = limit.unwrap_or(settings.max_pages);
            println!("Crawling {} (up to {} pages)...", crawler.origin(), max_pages);
            let pages = crawler.crawl(&keywords, max_pages).await?;
            let errors = pages.iter().filter(|p| p.error.is_some()).count();
            db::save_fetched(&conn, &pages)?;
            println!("Stored {} pages ({} errors).", pages.len(), errors);
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'crawl' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages, &settings.parser_options())?;
            counts.print();
            Ok(())
        }
        Commands::Show { url } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            match db::fetch_policy(&conn, &url)? {
                Some(Some(json)) => {
                    let policy = parser::ParsedPolicy::from_json(&json)?;
                    println!("{}", policy.to_json_pretty()?);
                }
                Some(None) => println!("{} was processed but no content region was found.", url),
                None => println!("No processed page for {}.", url),
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Pages:     {}", s.pages);
            println!("Fetched:   {}", s.fetched);
            println!("Errors:    {}", s.errors);
            println!("Processed: {}", s.processed);
            println!("Parsed:    {}", s.parsed);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessCounts {
    pages: usize,
    parsed: usize,
    sections: i64,
    text_nodes: i64,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Parsed {} of {} pages: {} sections, {} text blocks.",
            self.parsed, self.pages, self.sections, self.text_nodes,
        );
    }
}

fn process_pages(
    conn: &rusqlite::Connection,
    pages: &[db::StoredPage],
    options: &ParserOptions,
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        pages: 0,
        parsed: 0,
        sections: 0,
        text_nodes: 0,
    };

    for chunk in pages.chunks(500) {
        let rows: Vec<_> = chunk
            .par_iter()
            .map(|page| parser::process_page(page, options))
            .collect();

        counts.pages += rows.len();
        for row in rows.iter().filter(|r| r.json.is_some()) {
            counts.parsed += 1;
            counts.sections += row.sections;
            counts.text_nodes += row.text_nodes;
        }
        db::save_policies(conn, &rows)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
