//! Basic usage example for `switchy_sql_template`.
//!
//! Creates an in-memory `SQLite` database with an `admin` table and walks
//! through the template's query and update operations: record mapping,
//! column maps, scalar queries, row callbacks, typed arguments with list
//! expansion, batches and error reporting.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use switchy_sql_template::{
    ParameterValue, RecordRowMapper, RowRecord, SqlTemplate, SqlTemplateError, SqlType, SqlValue,
    TemplateConfig, TypedArguments, driver::ResultRow, rusqlite::RusqliteDataSource,
};

#[derive(Default, RowRecord)]
struct Admin {
    id: i64,
    username: String,
    password: String,
    last_ip: Option<String>,
    last_time: Option<NaiveDateTime>,
}

/// # Errors
///
/// Returns an error if:
/// * The environment configuration is invalid
/// * The in-memory database cannot be created
/// * Any statement fails to execute
#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let template = SqlTemplate::new(Arc::new(RusqliteDataSource::open_in_memory()?))
        .with_config(TemplateConfig::from_env()?);

    template.execute_sql(
        "CREATE TABLE admin (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL,
            password TEXT NOT NULL,
            last_ip TEXT,
            last_time DATETIME
        )",
    )?;

    let now = Utc::now().naive_utc();
    for (username, last_ip) in [
        ("root", Some("10.0.0.1")),
        ("alice", None),
        ("bob", Some("192.168.1.20")),
    ] {
        template.update(
            "INSERT INTO admin (username, password, last_ip, last_time) VALUES (?, ?, ?, ?)",
            &[
                ParameterValue::from(username),
                ParameterValue::from("secret"),
                ParameterValue::from(last_ip),
                ParameterValue::from(now),
            ],
        )?;
    }
    log::info!("Inserted 3 admins");

    println!("Admins mapped as records:");
    for admin in template.query_rows(
        "SELECT * FROM admin ORDER BY id",
        &(),
        RecordRowMapper::<Admin>::new(),
    )? {
        println!(
            "  #{} {} (password {} chars, last ip {:?}, last login {:?})",
            admin.id,
            admin.username,
            admin.password.len(),
            admin.last_ip,
            admin.last_time
        );
    }

    println!("\nAdmins mapped as column maps:");
    for row in template.query_for_maps("SELECT id, username, last_ip FROM admin", &())? {
        let columns = row
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>();
        println!("  {}", columns.join(", "));
    }

    let count = template.query_for_i64("SELECT count(*) FROM admin", &())?;
    println!("\nAdmin count: {count}");

    let names = template.query_for_list::<String, _>("SELECT username FROM admin ORDER BY id", &())?;
    println!("Usernames: {names:?}");

    let root = template.query_for_object(
        "SELECT username, last_ip FROM admin WHERE id = ?",
        &[ParameterValue::from(1_i64)],
        |row: &dyn ResultRow, _row_num: usize| -> Result<String, SqlTemplateError> {
            Ok(format!(
                "{} from {}",
                row.get_string(0)?.unwrap_or_default(),
                row.get_string(1)?.unwrap_or_else(|| "nowhere".to_string())
            ))
        },
    )?;
    println!("First admin: {root}");

    println!("\nRow callback:");
    let processed = template.query_each(
        "SELECT id, username FROM admin ORDER BY id",
        &(),
        &mut |row: &dyn ResultRow| -> Result<(), SqlTemplateError> {
            println!("  #{} {}", row.get_i64(0)?, row.get_string(1)?.unwrap_or_default());
            Ok(())
        },
    )?;
    println!("  processed {processed} rows");

    let selected = template.query_for_list::<String, _>(
        "SELECT username FROM admin WHERE id IN (?, ?) ORDER BY id",
        &TypedArguments::new(
            vec![SqlValue::List(vec![1_i64.into(), 3_i64.into()]).into()],
            vec![SqlType::INTEGER],
        )?,
    )?;
    println!("\nSelected with an expanded list argument: {selected:?}");

    let deleted = template.update("DELETE FROM admin WHERE id = ?", &[ParameterValue::from(2_i64)])?;
    println!("Deleted {deleted} admin");

    let counts = template.batch_update(&[
        "UPDATE admin SET last_ip = '127.0.0.1' WHERE last_ip IS NULL",
        "UPDATE admin SET password = 'rotated'",
    ])?;
    println!("Batch update counts: {counts:?}");

    match template.query_for_value::<i64, _>("SELECT id, username FROM admin", &()) {
        Ok(value) => println!("Unexpected value: {value}"),
        Err(e) => println!("\nExpected failure: {e}"),
    }

    Ok(())
}
