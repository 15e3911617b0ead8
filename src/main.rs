/// Command-line front end for the water quality service.
///
/// Each subcommand runs one handler from `tikatu_service::service` and
/// prints its JSON response; `report` writes the PDF to a file instead.
/// Handler failures print `{"detail": ...}` and exit with status 1.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use tikatu_service::config::{Config, DEFAULT_CONFIG_PATH, api_key};
use tikatu_service::db::PgStore;
use tikatu_service::logging::{self, DataSource};
use tikatu_service::model::{AnalysisRequest, IqaFilter, MonitoringFilter, NewsItem, Parameter, SampleKey};
use tikatu_service::quality::compute_wqi;
use tikatu_service::quality::normalize::raw_from_json;
use tikatu_service::report::PdfRenderer;
use tikatu_service::service::{self, IqaResponse, ServiceError};
use tikatu_service::summary::openai::OpenAiGenerator;

#[derive(Parser)]
#[command(name = "tikatu", about = "Water quality index service")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct SampleArgs {
    #[arg(long)]
    city: String,
    #[arg(long)]
    river: String,
    #[arg(long)]
    point: String,
    /// Collection date, YYYY-MM-DD
    #[arg(long)]
    date: String,
}

impl SampleArgs {
    fn key(&self) -> SampleKey {
        SampleKey {
            city: self.city.clone(),
            river: self.river.clone(),
            point: self.point.clone(),
            date: self.date.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Index for one stored sample
    Iqa(SampleArgs),
    /// Index for raw values in a JSON file (no database needed)
    Score {
        #[arg(long)]
        file: PathBuf,
    },
    /// Filtered monitoring rows
    Monitoring {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        river: Option<String>,
        /// Only rows where this parameter was recorded (e.g. OD, turbidity)
        #[arg(long)]
        parameter: Option<Parameter>,
        #[arg(long = "point")]
        points: Vec<String>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
    },
    /// Index for every matching sample
    IqaData {
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        river: Option<String>,
        #[arg(long = "point")]
        points: Vec<String>,
    },
    /// Generated analysis of an analysis request JSON file
    Analyze {
        #[arg(long)]
        file: PathBuf,
    },
    /// PDF report for one stored sample
    Report {
        #[command(flatten)]
        sample: SampleArgs,
        #[arg(long, default_value = "report.pdf")]
        out: PathBuf,
    },
    /// News articles
    #[command(subcommand)]
    News(NewsCommand),
}

#[derive(Subcommand)]
enum NewsCommand {
    List,
    Get { id: i64 },
    Create {
        #[arg(long)]
        file: PathBuf,
    },
    Update {
        id: i64,
        #[arg(long)]
        file: PathBuf,
    },
    Delete { id: i64 },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn open_store(config: &Config) -> Result<PgStore, Box<dyn Error>> {
    Ok(PgStore::connect_with(&config.database_url()?, config.database.tls)?)
}

fn open_generator(config: &Config) -> Result<OpenAiGenerator, Box<dyn Error>> {
    Ok(OpenAiGenerator::new(&config.generation, api_key()?)?)
}

/// Runs a handler, printing its error body when it fails.
fn handle<T: Serialize>(result: Result<T, ServiceError>) -> Result<ExitCode, Box<dyn Error>> {
    match result {
        Ok(body) => {
            print_json(&body)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            print_json(&e.body())?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run(cli: Cli, config: &Config) -> Result<ExitCode, Box<dyn Error>> {
    match cli.command {
        Command::Iqa(sample) => {
            let mut store = open_store(config)?;
            handle(service::sample_iqa(&mut store, &sample.key()))
        }
        Command::Score { file } => {
            let body: serde_json::Map<String, serde_json::Value> = read_json(&file)?;
            let result = compute_wqi(&raw_from_json(&body));
            print_json(&IqaResponse::from(&result))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Monitoring { city, river, parameter, points, start_date, end_date } => {
            let filter = MonitoringFilter { city, river, parameter, points, start_date, end_date };
            let mut store = open_store(config)?;
            handle(service::monitoring_data(&mut store, &filter))
        }
        Command::IqaData { city, river, points } => {
            let filter = IqaFilter { city, river, points };
            let mut store = open_store(config)?;
            handle(service::iqa_data(&mut store, &filter))
        }
        Command::Analyze { file } => {
            let request: AnalysisRequest = read_json(&file)?;
            let generator = open_generator(config)?;
            handle(service::custom_analysis(&generator, &request))
        }
        Command::Report { sample, out } => {
            let mut store = open_store(config)?;
            let generator = open_generator(config)?;
            match service::sample_report(&mut store, &generator, &PdfRenderer::default(), &sample.key()) {
                Ok(bytes) => {
                    std::fs::write(&out, bytes)?;
                    logging::info(DataSource::System, None, &format!("Report written to {}", out.display()));
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => handle::<()>(Err(e)),
            }
        }
        Command::News(command) => {
            let mut store = open_store(config)?;
            match command {
                NewsCommand::List => handle(service::list_news(&mut store)),
                NewsCommand::Get { id } => handle(service::get_news(&mut store, id)),
                NewsCommand::Create { file } => {
                    let item: NewsItem = read_json(&file)?;
                    handle(service::create_news(&mut store, &item))
                }
                NewsCommand::Update { id, file } => {
                    let item: NewsItem = read_json(&file)?;
                    handle(service::update_news(&mut store, id, &item))
                }
                NewsCommand::Delete { id } => handle(service::delete_news(&mut store, id)),
            }
        }
    }
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    logging::init_logger(
        config.logging.min_level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    )?;

    run(cli, &config)
}
