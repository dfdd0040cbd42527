//! calconnect CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calconnect::cli::{Cli, Command, ConfigAction};
use calconnect::commands;
use calconnect::config::AppConfig;
use calconnect::error::AppResult;
use calconnect::service::CalendarService;
use calconnect_core::{EventQuery, NewEvent, init_tracing};
use calconnect_providers::ProviderKind;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = match cli.config {
        Some(ref path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let tracing_config = config.logging.tracing_config(cli.debug)?;
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: failed to initialise logging: {}", e);
    }

    let provider = config.provider_tag(cli.provider.as_deref()).to_string();

    // Config commands work without a usable provider section.
    let command = match cli.command {
        Command::Config { action } => {
            return match action {
                ConfigAction::Dump => commands::config::dump(&config),
                ConfigAction::Validate => commands::config::validate(&config, &provider),
                ConfigAction::Path => commands::config::path(),
            };
        }
        command => command,
    };

    let kind: ProviderKind = provider.parse()?;
    let credentials = config.provider_credentials(kind)?;
    let service = CalendarService::open(&provider, credentials, &config.store_connection())?;

    match command {
        Command::Connect => commands::calendar::connect(&service),
        Command::Access { user, code } => commands::calendar::access(&service, &user, &code).await,
        Command::Events {
            user,
            start,
            end,
            timezone,
            calendar,
        } => {
            let mut query = EventQuery::new(start, end).with_timezone(timezone);
            if let Some(calendar) = calendar {
                query = query.with_calendar(calendar);
            }
            commands::calendar::events(&service, &user, query).await
        }
        Command::CreateEvent {
            user,
            summary,
            start,
            end,
            timezone,
            description,
            attendee,
            calendar,
        } => {
            let mut event = NewEvent::new(summary, start, end, timezone)
                .with_description(description)
                .with_attendees(attendee);
            if let Some(calendar) = calendar {
                event = event.with_calendar(calendar);
            }
            commands::calendar::create_event(&service, &user, event).await
        }
        Command::Refresh { user } => commands::calendar::refresh(&service, &user).await,
        Command::Run => commands::calendar::run(&service).await,
        Command::Config { .. } => Ok(()),
    }
}
