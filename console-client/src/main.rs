//! admin-console — loads the four console collections and prints them
//!
//! Configuration comes from the environment (see [`ClientConfig::from_env`]).
//! `CONSOLE_EMAIL` / `CONSOLE_PASSWORD`, when both set, log in first;
//! otherwise a token persisted at `CONSOLE_TOKEN_PATH` is reused.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Table};
use std::process::ExitCode;

use console_client::{AdminConsole, ClientConfig, ClientError, CollectionKind};

fn optional<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn print_table(title: &str, headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(headers.iter().map(|h| header_cell(h)).collect::<Vec<_>>());
    for row in rows {
        table.add_row(row);
    }
    println!("{title}");
    println!("{table}");
}

fn print_console(console: &AdminConsole) {
    let store = console.store();

    print_table(
        "Sales",
        &["ID", "Date", "Amount"],
        store
            .sales()
            .iter()
            .map(|s| vec![s.id.to_string(), s.date.clone(), optional(&s.amount)])
            .collect(),
    );
    print_table(
        "Bookings",
        &["ID", "Date", "Member"],
        store
            .bookings()
            .iter()
            .map(|b| vec![b.id.to_string(), b.date.clone(), optional(&b.member)])
            .collect(),
    );
    print_table(
        "Members",
        &["ID", "Name", "Email"],
        store
            .members()
            .iter()
            .map(|m| vec![m.id.to_string(), m.name.clone(), m.email.clone()])
            .collect(),
    );
    print_table(
        "Payments",
        &["ID", "Date", "Amount", "Member"],
        store
            .payments()
            .iter()
            .map(|p| {
                vec![
                    p.id.to_string(),
                    p.date.clone(),
                    optional(&p.amount),
                    optional(&p.member),
                ]
            })
            .collect(),
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "console_client=info,admin_console=info".into()),
        )
        .with_target(false)
        .init();

    let config = ClientConfig::from_env();
    let console = match AdminConsole::connect(&config) {
        Ok(console) => console,
        Err(e) => {
            tracing::error!("Failed to configure console: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let (Ok(email), Ok(password)) = (
        std::env::var("CONSOLE_EMAIL"),
        std::env::var("CONSOLE_PASSWORD"),
    ) && let Err(e) = console.login(&email, &password).await
    {
        tracing::error!("Login failed: {e}");
        return ExitCode::FAILURE;
    }

    match console.open().await {
        Ok(report) => {
            for (kind, error) in report.failures() {
                tracing::warn!(%kind, "Showing last known {kind}: {error}");
            }
        }
        Err(ClientError::NotAuthorized) => {
            tracing::error!("Not logged in; set CONSOLE_EMAIL and CONSOLE_PASSWORD");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing::error!("Failed to load console: {e}");
            return ExitCode::FAILURE;
        }
    }

    print_console(&console);

    let stale = CollectionKind::ALL
        .into_iter()
        .filter(|kind| console.store().last_error(*kind).is_some())
        .count();
    if stale > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
