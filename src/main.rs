//! Command-line interface for constancia signing and validation.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Arg, ArgMatches, Command};
use constancia::{
    ConstanciaWorkflow, Pkcs12SignatureEngine, SignRequest, SignatureValidator, ValidationStore,
    WorkflowConfig,
};
use tracing::{error, info, warn};

fn main() {
    let matches = build_cli().get_matches();
    let verbosity = matches
        .get_one::<String>("verbose")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(verbosity);

    let config = match matches.get_one::<String>("config") {
        Some(path) => match load_config_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!("failed to load config file: {}", e);
                process::exit(1);
            }
        },
        None => WorkflowConfig::default(),
    };

    let exit_code = match matches.subcommand() {
        Some(("sign", sub)) => run_sign(&config, sub),
        Some(("validate", sub)) => run_validate(&config, sub),
        _ => unreachable!("subcommand required"),
    };
    process::exit(exit_code);
}

fn run_sign(config: &WorkflowConfig, matches: &ArgMatches) -> i32 {
    let input = PathBuf::from(matches.get_one::<String>("input").unwrap());
    let credential = PathBuf::from(matches.get_one::<String>("credential").unwrap());
    let password = matches.get_one::<String>("password").unwrap();
    let range = matches.get_one::<String>("pages").unwrap();
    let user = matches.get_one::<String>("user").unwrap();
    let qr_out = matches.get_one::<String>("qr-out");

    if !input.exists() {
        error!("input file does not exist: {}", input.display());
        return 1;
    }

    let workflow = match ConstanciaWorkflow::new(config.clone(), Pkcs12SignatureEngine::new()) {
        Ok(w) => w,
        Err(e) => {
            error!("failed to open ledger: {}", e);
            return 1;
        }
    };

    let request = SignRequest {
        main_document: &input,
        credential_path: &credential,
        credential_password: password,
        page_range: range,
        user,
    };

    match workflow.create_signed_constancia(&request) {
        Ok((record, qr_png)) => {
            info!("constancia signed, validation code {}", record.code);
            info!("constancia file: {}", record.constancia_filename);
            if let Some(path) = qr_out {
                if let Err(e) = fs::write(path, &qr_png) {
                    warn!("could not save QR image to {}: {}", path, e);
                } else {
                    info!("QR image saved to {}", path);
                }
            }
            0
        }
        Err(e) if e.is_user_input() => {
            error!("invalid request: {}", e);
            2
        }
        Err(e) => {
            error!("signing failed: {}", e);
            1
        }
    }
}

fn run_validate(config: &WorkflowConfig, matches: &ArgMatches) -> i32 {
    let document = PathBuf::from(matches.get_one::<String>("document").unwrap());
    let page = match matches.get_one::<String>("page").unwrap().parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => {
            error!("page must be a positive integer");
            return 2;
        }
    };

    let store = match ValidationStore::open(&config.ledger_path) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to open ledger: {}", e);
            return 1;
        }
    };

    let validator = SignatureValidator::new(store);
    match validator.validate(&document, page) {
        Some(record) => {
            info!(
                "page {} of {} is covered by a valid constancia",
                page,
                document.display()
            );
            info!(
                "code {} signed by {} at {}",
                record.code, record.user, record.datetime_utc
            );
            0
        }
        None => {
            warn!(
                "no valid constancia covers page {} of {}",
                page,
                document.display()
            );
            1
        }
    }
}

fn build_cli() -> Command {
    Command::new("constancia")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sign page subsets of PDF documents and validate them against a ledger")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Configuration file (JSON/YAML)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .value_name("LEVEL")
                .value_parser(["error", "warn", "info", "debug", "trace"])
                .global(true)
                .help("Set logging verbosity"),
        )
        .subcommand(
            Command::new("sign")
                .about("Create a signed constancia for selected pages")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("Input PDF file path")
                        .required(true),
                )
                .arg(
                    Arg::new("credential")
                        .short('k')
                        .long("credential")
                        .value_name("FILE")
                        .help("PKCS#12 (.p12/.pfx) credential file")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .short('w')
                        .long("password")
                        .value_name("PASSWORD")
                        .help("Passphrase for the PKCS#12 credential")
                        .required(true),
                )
                .arg(
                    Arg::new("pages")
                        .short('p')
                        .long("pages")
                        .value_name("RANGE")
                        .help("Page range expression, e.g. \"1-3,7\"")
                        .required(true),
                )
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .value_name("NAME")
                        .help("Acting user recorded in the ledger")
                        .required(true),
                )
                .arg(
                    Arg::new("qr-out")
                        .long("qr-out")
                        .value_name("FILE")
                        .help("Also save the validation QR code as a PNG file"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check whether a document page is covered by a valid constancia")
                .arg(
                    Arg::new("document")
                        .short('d')
                        .long("document")
                        .value_name("FILE")
                        .help("Original document path")
                        .required(true),
                )
                .arg(
                    Arg::new("page")
                        .short('p')
                        .long("page")
                        .value_name("N")
                        .help("1-based page number to validate")
                        .required(true),
                ),
        )
}

fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("constancia={}", level)))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging already initialized");
    }
}

fn load_config_file(path: &str) -> Result<WorkflowConfig, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path, e))?;

    // Try JSON first, then YAML
    serde_json::from_str(&content)
        .or_else(|_| serde_yaml::from_str(&content))
        .map_err(|e| format!("config parsing error: {}", e))
}
