// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and open the database
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 1 = broken links, 2 = error)
// =============================================================================

mod cli;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use url::Url;

use link_crawler::checker::{LinkChecker, PageAnalyzer};
use link_crawler::{
    logging, AnalysisResult, CrawlError, Crawler, CrawlerConfig, PageFetcher, Store, UrlRecord,
    UrlStatus,
};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.log_level);
    let config = cli.crawler_config();

    match cli.command {
        // analyze is the only command that works without the database
        Commands::Analyze { url, json } => handle_analyze(&config, &url, json).await,
        command => {
            let store = Store::open(&config.db_path)
                .await
                .with_context(|| format!("opening database {}", config.db_path.display()))?;
            handle_command(command, store, &config).await
        }
    }
}

// Handles every subcommand that works on the URL queue
async fn handle_command(command: Commands, store: Store, config: &CrawlerConfig) -> Result<i32> {
    match command {
        Commands::Add { url } => {
            let url = validate_url(&url)?;
            let id = store.add_url(&url).await?;
            println!("✅ URL added with id {}", id);
            Ok(0)
        }
        Commands::List { json } => {
            let records = store.list_urls().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_table(&records);
            }
            Ok(0)
        }
        Commands::Show { id, json } => {
            let record = store
                .get_url(id)
                .await?
                .ok_or_else(|| anyhow!("URL {} not found", id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("🔗 [{}] {} ({})", record.id, record.url, format_status(record.status));
                println!("   Added: {}", record.created_at);
                print_analysis(&record.analysis);
            }
            Ok(0)
        }
        Commands::Delete { id } => {
            require(store.delete_url(id).await?, "URL not found", id)?;
            println!("🗑️  URL {} deleted", id);
            Ok(0)
        }
        Commands::Requeue { id } => {
            require(store.requeue(id).await?, "URL not found", id)?;
            println!("🔁 URL {} queued again", id);
            Ok(0)
        }
        Commands::StartUrl { id } => {
            let moved = store
                .transition(id, &[UrlStatus::Queued, UrlStatus::Stopped], UrlStatus::Running)
                .await?;
            require(moved, "URL not found or cannot be started", id)?;
            println!("▶️  URL {} marked running", id);
            Ok(0)
        }
        Commands::StopUrl { id } => {
            let moved = store
                .transition(id, &[UrlStatus::Running], UrlStatus::Stopped)
                .await?;
            require(moved, "URL not found or not running", id)?;
            println!("⏹️  URL {} marked stopped", id);
            Ok(0)
        }
        Commands::Run => {
            let crawler = Crawler::new(store, config)?;
            crawler.start().await;
            println!("🔍 Crawling every {}s, press Ctrl-C to stop", config.poll_interval.as_secs());

            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;

            println!("\n⏳ Stopping, waiting for the current page to finish...");
            crawler.stop().await;
            Ok(0)
        }
        Commands::Analyze { url, json } => handle_analyze(config, &url, json).await,
    }
}

// Handles the 'analyze' subcommand: fetch, analyze, print
async fn handle_analyze(config: &CrawlerConfig, url: &str, json: bool) -> Result<i32> {
    let url = validate_url(url)?;

    println!("🔍 Analyzing: {}", url);

    let fetcher = PageFetcher::new(config.page_fetch_timeout)?;
    let analyzer = PageAnalyzer::new(
        LinkChecker::new(config.link_check_timeout)?,
        config.max_concurrent_checks,
    );

    let html = fetcher.fetch(&url).await?;
    let result = analyzer.analyze_html(&html, &url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_analysis(&result);
    }

    if result.broken_links > 0 {
        Ok(1) // Exit code 1 = broken links found
    } else {
        Ok(0)
    }
}

// Only absolute http(s) URLs can be crawled
fn validate_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).map_err(|_| CrawlError::InvalidUrl(raw.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(CrawlError::InvalidUrl(raw.to_string()));
    }
    // Keep the user's spelling; it is the prefix used to classify links
    Ok(raw.to_string())
}

fn require(found: bool, message: &str, id: i64) -> Result<()> {
    if found {
        Ok(())
    } else {
        Err(anyhow!("{} (id {})", message, id))
    }
}

// Prints all records as a human-readable table
fn print_table(records: &[UrlRecord]) {
    if records.is_empty() {
        println!("No URLs submitted yet");
        return;
    }

    println!(
        "{:<6} {:<50} {:<12} {:<8} {:<8} {:<8}",
        "ID", "URL", "STATUS", "INT", "EXT", "BROKEN"
    );
    println!("{}", "=".repeat(96));

    for record in records {
        // Truncate URL if too long for display
        let url_display = if record.url.chars().count() > 47 {
            format!("{}...", record.url.chars().take(47).collect::<String>())
        } else {
            record.url.clone()
        };

        println!(
            "{:<6} {:<50} {:<12} {:<8} {:<8} {:<8}",
            record.id,
            url_display,
            format_status(record.status),
            record.analysis.internal_links,
            record.analysis.external_links,
            record.analysis.broken_links
        );
    }
}

fn print_analysis(result: &AnalysisResult) {
    let version = result.html_version.map(|v| v.as_str()).unwrap_or("Unknown");
    println!("   HTML version: {}", version);
    println!("   Title: {}", result.title);

    let headings: Vec<String> = (1..=6)
        .map(|level| format!("h{}={}", level, result.heading_count(level)))
        .collect();
    println!("   Headings: {}", headings.join(" "));
    println!("   Internal links: {}", result.internal_links);
    println!("   External links: {}", result.external_links);
    println!("   Login form: {}", if result.has_login_form { "yes" } else { "no" });

    if result.broken_links == 0 {
        println!("   ✅ No broken links");
        return;
    }

    println!("   ❌ Broken links: {}", result.broken_links);
    for link in &result.broken_links_list {
        let code = if link.status_code == 0 {
            "no response".to_string()
        } else {
            format!("HTTP {}", link.status_code)
        };
        println!("      {} ({})", link.url, code);
    }
}

fn format_status(status: UrlStatus) -> String {
    match status {
        UrlStatus::Queued => "🕒 queued".to_string(),
        UrlStatus::Running => "🏃 running".to_string(),
        UrlStatus::Done => "✅ done".to_string(),
        UrlStatus::Error => "⚠️  error".to_string(),
        UrlStatus::Stopped => "⏹️  stopped".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url("https://example.com").unwrap(), "https://example.com");
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("ftp://example.com/file").is_err());
    }

    #[test]
    fn test_require() {
        assert!(require(true, "x", 1).is_ok());
        let err = require(false, "URL not found", 4).unwrap_err();
        assert_eq!(err.to_string(), "URL not found (id 4)");
    }
}
