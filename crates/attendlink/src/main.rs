//! `attendlink` - CLI for signed guardian links and follow-up notifications

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use attendlink::cli::{
    Cli, Command, ComposeCommand, ConfigCommand, LinkCommand, NotifyCommand, PhoneCommand,
    RecordCommand, StudentCommand, VerifyCommand,
};
use attendlink::{
    init_logging, ChannelOpener, Config, Error, Notifier, PrintChannel, Storage, StudentRecord,
    SystemBrowser,
};

type CliResult = Result<ExitCode, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Link(cmd) => handle_link(&config, &cmd),
        Command::Verify(cmd) => handle_verify(&config, &cmd),
        Command::Phone(cmd) => Ok(handle_phone(&config, &cmd)),
        Command::Compose(cmd) => handle_compose(&config, &cmd),
        Command::Notify(cmd) => handle_notify(&config, &cmd).await,
        Command::Record(cmd) => handle_record(&config, &cmd),
        Command::Student(cmd) => handle_student(&config, cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage, Error> {
    Storage::open(config.database_path())
}

fn load_student(storage: &Storage, id: &str) -> Result<StudentRecord, Error> {
    storage
        .get_student(id)?
        .ok_or_else(|| Error::student_not_found(id))
}

fn handle_link(config: &Config, cmd: &LinkCommand) -> CliResult {
    let links = config.link_builder()?;
    println!("{}", links.build_url(&cmd.id, cmd.origin.as_deref())?);
    Ok(ExitCode::SUCCESS)
}

fn handle_verify(config: &Config, cmd: &VerifyCommand) -> CliResult {
    let links = config.link_builder()?;

    let accepted = if let Some(url) = &cmd.url {
        links.verify_link(url)
    } else {
        let id = cmd.id.as_deref().unwrap_or_default();
        let signature = cmd.signature.as_deref().unwrap_or_default();
        links
            .signer()
            .verify(id, signature)
            .then(|| id.trim().to_string())
    };

    if let Some(id) = accepted {
        println!("valid: link grants access to student {id}");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("invalid: signature rejected");
        Ok(ExitCode::FAILURE)
    }
}

fn handle_phone(config: &Config, cmd: &PhoneCommand) -> ExitCode {
    match config.phone_validator().validate(Some(&cmd.raw)) {
        Ok(phone) => {
            println!("{phone}");
            ExitCode::SUCCESS
        }
        Err(kind) => {
            eprintln!("{kind}");
            ExitCode::FAILURE
        }
    }
}

fn handle_compose(config: &Config, cmd: &ComposeCommand) -> CliResult {
    let storage = open_storage(config)?;
    let student = load_student(&storage, &cmd.id)?;
    let phone = config
        .phone_validator()
        .validate(student.guardian_phone.as_deref())?;
    let message = config
        .composer()?
        .compose(&student, cmd.week, &phone, cmd.origin.as_deref())?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&message)?);
    } else {
        println!("{}", message.body);
        println!();
        println!("Deep link: {}", message.target_url);
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_notify(config: &Config, cmd: &NotifyCommand) -> CliResult {
    let storage = Arc::new(open_storage(config)?);
    let student = load_student(&storage, &cmd.id)?;

    if cmd.no_open || !config.channel.open_in_browser {
        run_notify(config, cmd, &student, PrintChannel, storage).await
    } else {
        run_notify(config, cmd, &student, SystemBrowser, storage).await
    }
}

async fn run_notify<O: ChannelOpener>(
    config: &Config,
    cmd: &NotifyCommand,
    student: &StudentRecord,
    opener: O,
    storage: Arc<Storage>,
) -> CliResult {
    let notifier = Notifier::from_config(config, opener, storage);
    let report = notifier
        .notify(student, cmd.week, cmd.origin.as_deref())
        .await;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.user_message());
    }

    if report.should_apply_local_update() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn handle_record(config: &Config, cmd: &RecordCommand) -> CliResult {
    let storage = open_storage(config)?;
    let delivered = cmd.delivered;
    storage.write_message_state(&cmd.id, cmd.week, delivered)?;

    let state = if delivered { "delivered" } else { "failed" };
    println!("Week {} of student {} marked {state}", cmd.week, cmd.id.trim());
    Ok(ExitCode::SUCCESS)
}

fn handle_student(config: &Config, cmd: StudentCommand) -> CliResult {
    let storage = open_storage(config)?;

    match cmd {
        StudentCommand::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let students = StudentRecord::parse_many(&json)?;
            for student in &students {
                storage.upsert_student(student)?;
            }
            println!("Imported {} student(s) from {}", students.len(), file.display());
        }
        StudentCommand::Show { id, json } => {
            let student = load_student(&storage, &id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&student)?);
            } else {
                print_student(&student);
            }
        }
        StudentCommand::List { json } => {
            let students = storage.list_students()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&students)?);
            } else if students.is_empty() {
                println!("No students.");
            } else {
                println!("{:<12} {:<28} {:>6} {:>10}", "ID", "NAME", "WEEKS", "DELIVERED");
                for s in &students {
                    println!("{:<12} {:<28} {:>6} {:>10}", s.id, s.name, s.weeks, s.delivered);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_student(student: &StudentRecord) {
    println!("Student {}", student.id);
    println!("  Name:           {}", student.name);
    println!(
        "  Guardian phone: {}",
        student.guardian_phone.as_deref().unwrap_or("-")
    );
    for (number, week) in (1..).zip(&student.weeks) {
        let attendance = if week.attended {
            week.last_attendance.as_deref().unwrap_or("N/A")
        } else {
            "Absent"
        };
        let sent = if week.message_state { "sent" } else { "not sent" };
        println!(
            "  Week {number:>2}: {attendance:<20} homework: {:<14} message: {sent}",
            week.homework_status.to_string()
        );
    }
}

fn handle_status(config: &Config, json: bool) -> CliResult {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "platform": SystemBrowser::platform_name(),
            "database_path": config.database_path(),
            "signing_configured": config.signer().is_ok(),
            "signature_scheme": config.signing.scheme,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("attendlink status");
        println!("-----------------");
        println!("Platform:      {}", SystemBrowser::platform_name());
        println!("Database:      {}", config.database_path().display());
        println!(
            "Signing:       {} ({})",
            if config.signer().is_ok() { "configured" } else { "no secret" },
            config.signing.scheme
        );
        println!("Students:      {}", stats.students);
        println!("Weeks:         {}", stats.weeks);
        println!("Delivered:     {}", stats.delivered);
        if let Some(last) = stats.last_update {
            println!("Last update:   {}", last.to_rfc3339());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            let shown = config.redacted();
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Signing]");
                println!(
                    "  Secret:             {}",
                    shown.signing.secret.as_deref().unwrap_or("(not set)")
                );
                println!("  Scheme:             {}", shown.signing.scheme);
                println!();
                println!("[Links]");
                println!("  Default origin:     {}", shown.links.default_origin);
                println!("  Path:               {}", shown.links.path);
                println!();
                println!("[Phone]");
                println!("  National length:    {}", shown.phone.national_length);
                println!("  Mobile prefix:      {}", shown.phone.mobile_prefix);
                println!("  Country code:       {}", shown.phone.country_code);
                println!();
                println!("[Channel]");
                println!("  Base URL:           {}", shown.channel.base_url);
                println!("  Open in browser:    {}", shown.channel.open_in_browser);
                println!();
                println!("[Message]");
                println!("  Sign-off:           {}", shown.message.sign_off);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", shown.database_path().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
