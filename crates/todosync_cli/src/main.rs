//! CLI probe: run one tagged JSON request against a database file.
//!
//! Usage: `todosync_cli <db-path> <user-id> <request-json>`
//!
//! Prints the status code on the first line and the body (if any) on the
//! second. Exits non-zero when the database cannot be opened or the user
//! cannot be provisioned.

use std::process::ExitCode;
use todosync_core::db::open_db;
use todosync_core::{core_version, dispatch_json, init_logging, LogSettings, MutationEngine};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [db_path, user_id, request] = args.as_slice() else {
        eprintln!(
            "todosync_cli {}\nusage: todosync_cli <db-path> <user-id> <request-json>",
            core_version()
        );
        return ExitCode::from(2);
    };

    let level = std::env::var("TODOSYNC_LOG").unwrap_or_else(|_| "warn".to_string());
    if let Err(err) = init_logging(&LogSettings {
        level: &level,
        log_dir: None,
    }) {
        eprintln!("logging disabled: {err}");
    }

    let conn = match open_db(db_path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open `{db_path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    let engine = MutationEngine::new(&conn);
    if let Err(err) = engine.provision_user(user_id) {
        eprintln!("failed to provision `{user_id}`: {err}");
        return ExitCode::FAILURE;
    }

    let response = dispatch_json(&engine, user_id, request);
    println!("{}", response.status);
    match response.body_json() {
        Ok(Some(body)) => println!("{body}"),
        Ok(None) => {}
        Err(err) => {
            eprintln!("failed to encode response: {err}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
