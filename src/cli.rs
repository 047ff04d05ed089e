// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There is only one thing this tool does, so there are no subcommands:
//
//   page-harvester https://example.com/gallery 5 -o ./pics
//
// Everything optional is a flag. Flags win over values from --config.
// =============================================================================

use anyhow::Result;
use clap::Parser;
use page_harvester::config::DEFAULT_OUTPUT_DIR;
use page_harvester::HarvestConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "page-harvester",
    version,
    about = "Walk a paginated gallery and download every image on it",
    long_about = "page-harvester starts at a URL, saves all images of the page, finds the \
                  'next page' link and repeats until the requested number of pages is done, \
                  no next link can be found, or a page fails to load."
)]
pub struct Cli {
    /// URL of the first page ("https://" is added if no scheme is given)
    pub url: String,

    /// How many pages to walk, including the first one
    #[arg(default_value_t = 1, value_parser = parse_page_count)]
    pub pages: usize,

    /// Directory the images are saved into (created if missing)
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// JSON file with harvester settings (timeouts, pauses, keywords)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print events as JSON lines and the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Download up to N images of a page at the same time
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: Option<u16>,

    /// Skip all pauses (only for testing against your own server)
    #[arg(long)]
    pub no_delay: bool,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    // Builds the HarvestConfig for this invocation
    //
    // Start from the file given with --config (or the defaults), then apply
    // the flags on top.
    pub fn load_config(&self) -> Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        };

        if let Some(concurrency) = self.concurrency {
            config.download_concurrency = usize::from(concurrency);
        }
        if self.no_delay {
            config = config.without_delays();
        }

        config.validate()?;
        Ok(config)
    }
}

// clap value parser for the page count: a whole number of at least 1
fn parse_page_count(raw: &str) -> Result<usize, String> {
    let pages: usize = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a whole number", raw))?;
    if pages == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(pages)
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Positional arguments with defaults
//    - `url` has no #[arg] at all, so it is a required positional argument
//    - `pages` is positional too, but default_value_t makes it optional
//
// 2. value_parser
//    - clap runs the function on the raw string before storing the value
//    - Returning Err(String) makes clap print a usage error and exit with 2
//
// 3. Option<T> fields
//    - A missing flag becomes None, so we can tell "not given" from a value
//      that happens to equal the default
// -----------------------------------------------------------------------------
