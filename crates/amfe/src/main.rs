//! `amfe` - CLI for AMFE matrices
//!
//! This binary provides the command-line interface for logging in to the
//! matrix backend, editing and scoring matrices, and managing accounts.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;

use amfe::accounts::Registration;
use amfe::cli::{
    Cli, Command, ConfigCommand, KindArg, LoginCommand, MatrixArgs, MatrixCommand, OutputFormat,
    RpnCommand, UserCommand,
};
use amfe::document::{ScoreField, DEFAULT_PROCESS_COLOR};
use amfe::form::MatrixForm;
use amfe::store::{self, Collection, MatrixPayload, MatrixRecord, MatrixStore, Page};
use amfe::{
    init_logging, ApiClient, Config, Error, LegacyAssessment, MatrixDocument, RiskScheme, Score,
    Storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // `config validate` reports load errors itself.
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        return handle_validate(file.clone().or_else(|| cli.config.clone()));
    }

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    let result = match cli.command {
        Command::Login(cmd) => handle_login(&config, cmd).await,
        Command::Logout => {
            ApiClient::from_config(&config)?.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami { json } => handle_whoami(&config, json),
        Command::Matrix(args) => handle_matrix(&config, cli.offline, args).await,
        Command::User(cmd) => handle_user(&config, cli.offline, cmd).await,
        Command::Rpn(cmd) => handle_rpn(&cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    };

    result.map_err(|e| {
        if e.downcast_ref::<Error>().is_some_and(Error::is_unauthorized) {
            e.context("run `amfe login` first")
        } else {
            e
        }
    })
}

/// The store matrix commands run against.
fn open_store(config: &Config, offline: bool) -> anyhow::Result<Box<dyn MatrixStore>> {
    if offline {
        let storage = Storage::open(config.database_path())?;
        Ok(Box::new(storage))
    } else {
        Ok(Box::new(ApiClient::from_config(config)?))
    }
}

fn online_client(config: &Config, offline: bool, action: &str) -> anyhow::Result<ApiClient> {
    if offline {
        bail!("{action} needs the backend; drop --offline");
    }
    Ok(ApiClient::from_config(config)?)
}

async fn handle_login(config: &Config, cmd: LoginCommand) -> anyhow::Result<()> {
    let Some(password) = cmd.password else {
        bail!("no password given; pass --password or set AMFE_PASSWORD");
    };
    let api = ApiClient::from_config(config)?;
    let session = api.login(&cmd.username, &password).await?;
    println!(
        "Logged in as {} ({}).",
        session.user.username, session.user.role
    );
    Ok(())
}

fn handle_whoami(config: &Config, json: bool) -> anyhow::Result<()> {
    let api = ApiClient::from_config(config)?;
    match api.current_user()? {
        Some(user) if json => println!("{}", serde_json::to_string_pretty(&user)?),
        Some(user) => println!("{} <{}> ({}, id {})", user.username, user.email, user.role, user.id),
        None => println!("Not logged in."),
    }
    Ok(())
}

async fn handle_matrix(config: &Config, offline: bool, args: MatrixArgs) -> anyhow::Result<()> {
    let collection = Collection::from(args.kind);

    match args.command {
        MatrixCommand::Template => print_template(config, args.kind)?,
        MatrixCommand::Export { id, output } => {
            if args.kind != KindArg::Modular {
                bail!("only modular matrices can be exported");
            }
            let api = online_client(config, offline, "export")?;
            handle_export(&api, id, output.as_deref()).await?;
        }
        MatrixCommand::List { format } => {
            let store = open_store(config, offline)?;
            let records = store
                .list(collection, Page::first(config.api.page_size))
                .await?;
            print_records(&records, format)?;
        }
        MatrixCommand::Show { id, json } => {
            let store = open_store(config, offline)?;
            let record = store.get(collection, id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                show_record(record, args.kind)?;
            }
        }
        MatrixCommand::Create { file } => {
            let store = open_store(config, offline)?;
            let (id, name) = save_draft(config, store.as_ref(), args.kind, &file, None).await?;
            println!("Created {collection} matrix {id} ({name}).");
        }
        MatrixCommand::Update { id, file } => {
            let store = open_store(config, offline)?;
            let (id, name) = save_draft(config, store.as_ref(), args.kind, &file, Some(id)).await?;
            println!("Updated {collection} matrix {id} ({name}).");
        }
        MatrixCommand::Delete { id } => {
            let store = open_store(config, offline)?;
            store.delete(collection, id).await?;
            println!("Deleted {collection} matrix {id}.");
        }
        MatrixCommand::Score { id, scheme } => {
            let store = open_store(config, offline)?;
            match args.kind {
                KindArg::Modular => {
                    let record = store::load::<MatrixDocument>(store.as_ref(), id).await?;
                    let scheme = scheme.map_or(RiskScheme::Modular, RiskScheme::from);
                    print_modular_scores(&record.data, scheme);
                }
                KindArg::Legacy => {
                    let record = store::load::<LegacyAssessment>(store.as_ref(), id).await?;
                    let scheme = scheme.map_or(RiskScheme::Legacy, RiskScheme::from);
                    print_legacy_scores(&record.data, scheme);
                }
            }
        }
    }
    Ok(())
}

fn print_template(config: &Config, kind: KindArg) -> anyhow::Result<()> {
    let draft = match kind {
        KindArg::Modular => serde_json::to_value(MatrixPayload {
            name: String::new(),
            description: None,
            data: MatrixDocument::new(config.new_header(), &config.document.process_color),
        })?,
        KindArg::Legacy => serde_json::to_value(MatrixPayload {
            name: String::new(),
            description: None,
            data: LegacyAssessment::default(),
        })?,
    };
    println!("{}", serde_json::to_string_pretty(&draft)?);
    Ok(())
}

/// Validate a draft file and create or update the matrix it describes.
///
/// Returns the id and name of the stored matrix.
async fn save_draft(
    config: &Config,
    store: &dyn MatrixStore,
    kind: KindArg,
    file: &Path,
    id: Option<i64>,
) -> anyhow::Result<(i64, String)> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading draft {}", file.display()))?;

    match kind {
        KindArg::Modular => {
            let draft: MatrixPayload<MatrixDocument> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing draft {}", file.display()))?;
            let mut form = MatrixForm::from_payload(draft, id)
                .with_process_color(&config.document.process_color)?;
            let record = form.save(store).await?;
            Ok((record.id, record.name))
        }
        KindArg::Legacy => {
            let mut draft: MatrixPayload<LegacyAssessment> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing draft {}", file.display()))?;
            draft.data.recompute();
            draft
                .data
                .validate(&draft.name, draft.description.as_deref().unwrap_or_default())
                .map_err(|e| Error::Validation(vec![e]))?;
            let record = match id {
                Some(id) => store::update(store, id, &draft).await?,
                None => store::create(store, &draft).await?,
            };
            Ok((record.id, record.name))
        }
    }
}

async fn handle_export(api: &ApiClient, id: i64, output: Option<&Path>) -> anyhow::Result<()> {
    let form = MatrixForm::load(api, id).await?;
    let bytes = api.export_matrix(form.export_target()?).await?;
    let path = output.map_or_else(|| form.export_file_name().into(), Path::to_path_buf);
    std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    println!("Exported matrix {id} to {} ({} bytes).", path.display(), bytes.len());
    Ok(())
}

fn print_records(records: &[MatrixRecord], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Plain => {
            for r in records {
                println!("{}\t{}\t{}", r.id, r.name, r.updated_at.format("%Y-%m-%d %H:%M"));
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No matrices.");
                return Ok(());
            }
            let width = records
                .iter()
                .map(|r| r.name.chars().count())
                .max()
                .unwrap_or(0)
                .max(4);
            println!("{:>6}  {:<width$}  UPDATED", "ID", "NAME");
            for r in records {
                println!(
                    "{:>6}  {:<width$}  {}",
                    r.id,
                    r.name,
                    r.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }
    Ok(())
}

fn show_record(record: MatrixRecord, kind: KindArg) -> anyhow::Result<()> {
    println!("Matrix {}: {}", record.id, record.name);
    if let Some(description) = record.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  {description}");
    }
    println!("  Updated {}", record.updated_at.format("%Y-%m-%d %H:%M"));
    println!();

    match kind {
        KindArg::Modular => {
            let doc: MatrixDocument = serde_json::from_value(record.data)?;
            let h = &doc.header;
            println!("{} | {} v{} | {}", h.institution, h.code, h.version, h.issue_date);
            println!("Service: {}  Area: {}", h.service, h.area);
            println!("Equipment: {}  Prepared by: {}", h.equipment, h.prepared_by);
            println!();
            for process in doc.processes.processes() {
                println!("{} [{}]", display_name(&process.name), process.color);
                for sub in &process.subprocesses {
                    println!("  {}", display_name(&sub.name));
                    for failure in &sub.failures {
                        println!(
                            "    - {} (RPN {})",
                            display_name(&failure.description),
                            failure.rpn()
                        );
                    }
                }
            }
        }
        KindArg::Legacy => {
            let mut a: LegacyAssessment = serde_json::from_value(record.data)?;
            a.recompute();
            println!("Equipment: {}  Process: {}", a.equipment, a.process);
            println!("Function: {}", a.function);
            println!("Failure mode: {}", a.failure_mode);
            println!("Effect: {}", a.failure_effect);
            println!("Cause: {}", a.failure_cause);
            println!("Controls: {}", a.current_controls);
            println!("RPN: {} ({})", a.rpn, a.risk());
            println!("Recommended action: {}", a.recommended_action);
            println!("Responsible: {}  Target date: {}", a.responsibility, a.target_date);
            println!("Action taken: {}", a.action_taken);
            println!("New RPN: {} ({})", a.new_rpn, a.residual_risk());
        }
    }
    Ok(())
}

fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        "(untitled)"
    } else {
        name
    }
}

fn print_modular_scores(doc: &MatrixDocument, scheme: RiskScheme) {
    for (path, failure) in doc.processes.failures() {
        let process = doc.processes.process(&path.process).map_or("", |p| p.name.as_str());
        let ev = &failure.evaluation;
        let rpn = failure.rpn();
        println!(
            "{} / {}: S{} D{} O{} = {:>3} {}",
            display_name(process),
            display_name(&failure.description),
            ev.get(ScoreField::Severity),
            ev.get(ScoreField::Detectability),
            ev.get(ScoreField::Occurrence),
            rpn,
            scheme.classify(u32::from(rpn))
        );
    }
    if let Some(max) = doc.processes.max_rpn() {
        println!("Highest RPN: {max} ({})", scheme.classify(u32::from(max)));
    }
}

fn print_legacy_scores(a: &LegacyAssessment, scheme: RiskScheme) {
    println!(
        "Before action: {} x {} x {} = {} ({})",
        a.severity,
        a.occurrence,
        a.detection,
        a.rpn,
        scheme.classify(a.rpn)
    );
    println!(
        "After action:  {} x {} x {} = {} ({})",
        a.new_severity,
        a.new_occurrence,
        a.new_detection,
        a.new_rpn,
        scheme.classify(a.new_rpn)
    );
}

async fn handle_user(config: &Config, offline: bool, cmd: UserCommand) -> anyhow::Result<()> {
    let api = online_client(config, offline, "user management")?;
    match cmd {
        UserCommand::List { json } => {
            let users = api.list_users(Page::first(config.api.page_size)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else {
                for u in users {
                    println!("{:>5}  {:<20}  {:<30}  {}", u.id, u.username, u.email, u.role);
                }
            }
        }
        UserCommand::Add {
            username,
            email,
            password,
            role,
        } => {
            let registration = Registration {
                username,
                email,
                confirm_password: password.clone(),
                password,
                role: role.into(),
            };
            let user = api.register(registration).await?;
            println!("Registered {} (id {}).", user.username, user.id);
        }
        UserCommand::Delete { id } => {
            api.delete_user(id).await?;
            println!("Deleted user {id}.");
        }
    }
    Ok(())
}

fn handle_rpn(cmd: &RpnCommand) -> anyhow::Result<()> {
    let rpn = amfe::rpn(
        Score::new(cmd.severity)?,
        Score::new(cmd.detectability)?,
        Score::new(cmd.occurrence)?,
    );
    let level = RiskScheme::from(cmd.scheme).classify(u32::from(rpn));
    println!("RPN {rpn}: {level} ({})", level.color());
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[API]");
                println!("  Base URL:           {}", config.api.base_url);
                println!("  Timeout (secs):     {}", config.api.timeout_secs);
                println!("  Page size:          {}", config.api.page_size);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Session path:       {}", config.session_path().display());
                println!();
                println!("[Document]");
                println!("  Institution:        {}", config.document.institution);
                println!("  Process color:      {}", config.document.process_color);
                if config.document.process_color != DEFAULT_PROCESS_COLOR {
                    println!("                      (default {DEFAULT_PROCESS_COLOR})");
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_validate(file)?,
    }
    Ok(())
}
