// Visitor check-in kiosk tooling
// Runs the ID text pipeline, the step router and visitor search from the shell

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use kiosk_checkin::{
    models::{CapabilitySet, FlowDecision, ScreenState, SearchBy, ValidationStatus},
    processing::FileOcrEngine,
    CheckInClient, FlowRouter, IdCapture, IdDocumentReader, KioskConfig,
};

#[derive(Parser)]
#[command(name = "kiosk-checkin", version, about = "Visitor check-in kiosk tools")]
struct Cli {
    /// JSON config file; the KIOSK_* environment is used when omitted
    #[arg(long, env = "KIOSK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the fields of an ID document from OCR output (.txt or .json)
    ParseId { file: PathBuf },
    /// Show which screen follows the given stage
    Route {
        #[arg(long)]
        current: String,
        /// Comma-separated stage and field tokens
        #[arg(long, default_value = "")]
        capabilities: String,
        #[arg(long)]
        hint: Option<String>,
    },
    /// Look up visitors for check-out
    Search {
        query: String,
        #[arg(long, value_enum, default_value_t = SearchField::Name)]
        by: SearchField,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SearchField {
    Id,
    Name,
}

impl From<SearchField> for SearchBy {
    fn from(field: SearchField) -> Self {
        match field {
            SearchField::Id => SearchBy::Id,
            SearchField::Name => SearchBy::Name,
        }
    }
}

// Function to print a detailed extraction report
fn print_detailed_report(capture: &IdCapture) {
    println!("\n===============================================");
    println!("        ID DOCUMENT EXTRACTION REPORT");
    println!("===============================================\n");

    println!("RECOGNIZED LINES: {}", capture.lines.len());
    for line in &capture.lines {
        println!("  | {}", line);
    }

    let fields = &capture.fields;
    println!("\nEXTRACTED FIELDS:");
    println!("  Full Name: {}", fields.full_name);
    println!("  Date of Birth: {}", fields.date_of_birth);
    println!("  Gender: {}", fields.gender);
    println!("  Identification Number: {}", fields.identification_number);

    if !capture.report.issues.is_empty() {
        println!("\nADVISORY ISSUES:");
        for issue in &capture.report.issues {
            println!("  - [{}] {}", issue.field.to_uppercase(), issue.message);
        }
    }

    println!(
        "\nID capture status: {}{}",
        capture.report.status,
        if capture.report.status == ValidationStatus::Bad {
            " (visitor may still continue)"
        } else {
            ""
        }
    );
}

fn load_config(path: Option<&PathBuf>) -> kiosk_checkin::Result<KioskConfig> {
    match path {
        Some(path) => KioskConfig::from_file(path),
        None => KioskConfig::load(),
    }
}

async fn run(cli: Cli) -> kiosk_checkin::Result<()> {
    match cli.command {
        Command::ParseId { file } => {
            println!("Reading ID text from: {:?}", file);
            let capture = IdDocumentReader::read(&FileOcrEngine, &file)?;
            print_detailed_report(&capture);
        }
        Command::Route {
            current,
            capabilities,
            hint,
        } => {
            let current: ScreenState = current.parse()?;
            let set: CapabilitySet = capabilities
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .collect();
            let next = FlowRouter::decide_next(current, &set, hint.as_deref())?;
            let decision = FlowDecision::from_parts(hint.as_deref(), Some(set));
            println!("{} -> {} ({:?})", current, next, decision);
        }
        Command::Search { query, by } => {
            let config = load_config(cli.config.as_ref())?;
            let client = CheckInClient::new(&config)?;
            let visitors = client.search_visitors(&query, by.into()).await?;
            if visitors.is_empty() {
                println!("No visitors found for '{}'", query);
            }
            for visitor in visitors {
                println!(
                    "  #{} {} ({})",
                    visitor.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
                    visitor.field("full_name").unwrap_or("unnamed"),
                    visitor.field("company").unwrap_or("no company"),
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
