use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches, Parser};
use tracing::{error, info, Level};

use mindtouch2zim::env::{generate_env_docs, EnvConfig};
use mindtouch2zim::library::ContentFilterOptions;
use mindtouch2zim::network::Session;
use mindtouch2zim::{Processor, ScraperError, ScraperOptions, ZimConfig, VERSION};

#[derive(Parser, Debug)]
#[command(name = "mindtouch2zim")]
#[command(about = "Scrape a MindTouch library into an offline archive")]
#[command(version = VERSION)]
struct Cli {
    /// URL of the library, e.g. https://geo.libretexts.org
    #[arg(long)]
    library_url: String,

    /// Name of content creator
    #[arg(long)]
    creator: String,

    #[arg(long, default_value = "openZIM")]
    publisher: String,

    /// Archive file name, supports {name} and {period} placeholders
    #[arg(long, default_value = "{name}_{period}")]
    file_name: String,

    /// Archive name, used as identifier
    #[arg(long)]
    name: String,

    /// Archive title, at most 30 characters
    #[arg(long)]
    title: String,

    /// Archive description, at most 80 characters
    #[arg(long)]
    description: String,

    /// Archive long description, longer than the description and at most 4000 characters
    #[arg(long)]
    long_description: Option<String>,

    /// Semicolon separated list of tags
    #[arg(long, default_value = "")]
    tags: String,

    /// Secondary (background) color of the reader UI
    #[arg(long, default_value = "#FFFFFF")]
    secondary_color: String,

    /// Regex of page titles to include
    #[arg(long)]
    page_title_include: Option<String>,

    /// Comma separated list of page ids to include
    #[arg(long)]
    page_id_include: Option<String>,

    /// Regex of page titles to exclude, applied after inclusions
    #[arg(long)]
    page_title_exclude: Option<String>,

    /// Id of the page used as archive root
    #[arg(long)]
    root_page_id: Option<String>,

    /// URL of the illustration, defaults to the library icons
    #[arg(long)]
    illustration_url: Option<String>,

    /// Output folder [env: MINDTOUCH_OUTPUT]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Temporary folder [env: MINDTOUCH_TMP]
    #[arg(long)]
    tmp: Option<PathBuf>,

    /// Reader UI build directory [env: MINDTOUCH_ZIMUI_DIST]
    #[arg(long)]
    zimui_dist: Option<PathBuf>,

    /// MathJax distribution directory [env: MINDTOUCH_MATHJAX_DIST]
    #[arg(long)]
    mathjax_dist: Option<PathBuf>,

    /// Path of the JSON progress file
    #[arg(long)]
    stats_filename: Option<PathBuf>,

    /// Replace an existing archive
    #[arg(long)]
    overwrite: bool,

    /// Number of asset download workers
    #[arg(long, default_value_t = 10)]
    assets_workers: usize,

    /// Number of asset failures tolerated before aborting
    #[arg(long, default_value_t = 10)]
    bad_assets_threshold: usize,

    /// Regex of asset URLs known to fail, added to the built-in list
    #[arg(long)]
    bad_assets_regex: Option<String>,

    /// Path of the optimized images cache
    #[arg(long)]
    optimization_cache: Option<PathBuf>,

    /// Keep images at their original size
    #[arg(long)]
    no_resize: bool,

    /// Skip pages with unsupported content instead of failing
    #[arg(long)]
    skip_unsupported_pages: bool,

    /// Contact information sent in the user agent
    #[arg(long, default_value = "https://www.kiwix.org")]
    contact_info: String,

    /// Enable verbose output
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn into_options(self, env: EnvConfig) -> ScraperOptions {
        ScraperOptions {
            library_url: self.library_url,
            contact_info: self.contact_info,
            output_folder: self.output.unwrap_or(env.output),
            tmp_folder: self.tmp.unwrap_or(env.tmp),
            zimui_dist: self.zimui_dist.unwrap_or(env.zimui_dist),
            mathjax_dist: self.mathjax_dist.unwrap_or(env.mathjax_dist),
            stats_filename: self.stats_filename,
            overwrite_existing_zim: self.overwrite,
            illustration_url: self.illustration_url,
            assets_workers: self.assets_workers,
            bad_assets_threshold: self.bad_assets_threshold,
            bad_assets_regex: self.bad_assets_regex,
            optimization_cache: self.optimization_cache,
            resize_images: !self.no_resize,
            skip_unsupported_pages: self.skip_unsupported_pages,
            stats_interval: Duration::from_secs(10),
            zim: ZimConfig {
                file_name: self.file_name,
                name: self.name,
                title: self.title,
                publisher: self.publisher,
                creator: self.creator,
                description: self.description,
                long_description: self.long_description,
                tags: self.tags,
                secondary_color: self.secondary_color,
            },
            filter: ContentFilterOptions {
                page_title_include: self.page_title_include,
                page_title_exclude: self.page_title_exclude,
                page_id_include: self.page_id_include,
                root_page_id: self.root_page_id,
            },
            ..ScraperOptions::default()
        }
    }
}

fn init_logging(debug: bool, level: &str) {
    let level = if debug {
        Level::DEBUG
    } else {
        level.parse().unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(options: &ScraperOptions) -> Result<PathBuf, ScraperError> {
    let session = Session::new(options)?;
    Processor::new(options, &session).run()
}

fn main() {
    let matches = Cli::command().after_long_help(generate_env_docs()).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let env = match EnvConfig::from_env() {
        Ok(env) => env,
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(2);
        }
    };
    init_logging(cli.debug, &env.log_level);

    let options = cli.into_options(env);
    info!("Starting mindtouch2zim {}", VERSION);

    match run(&options) {
        Ok(path) => info!("Archive written to {}", path.display()),
        Err(err) => {
            error!("{}", err);
            process::exit(err.exit_code());
        }
    }
}
