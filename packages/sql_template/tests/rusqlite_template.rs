#![cfg(all(feature = "sqlite-rusqlite", feature = "macros"))]

use std::{fmt::Debug, sync::Arc};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use switchy_sql_template::{
    ConversionError, DeclaredParameter, DriverError, FromSqlValue, ParameterValue,
    RecordRowMapper, RowRecord, SqlTemplate, SqlTemplateError, SqlType, SqlValue,
    TemplateConfig, TypedArguments, driver::ResultRow, rusqlite::RusqliteDataSource,
};

#[derive(Debug, Default, PartialEq, RowRecord)]
struct Admin {
    id: i64,
    username: String,
    last_ip: Option<String>,
    last_time: Option<NaiveDateTime>,
    #[row(rename = "logins")]
    login_count: i16,
    #[row(skip)]
    session: Option<String>,
}

fn last_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2009, 4, 24)
        .unwrap()
        .and_hms_opt(13, 5, 10)
        .unwrap()
}

fn template() -> SqlTemplate {
    let template = SqlTemplate::new(Arc::new(RusqliteDataSource::open_in_memory().unwrap()));

    template
        .execute_sql(
            "CREATE TABLE admin (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL,
                last_ip TEXT,
                last_time DATETIME,
                logins INTEGER NOT NULL DEFAULT 0,
                balance TEXT
            )",
        )
        .unwrap();

    for (username, last_ip, logins) in [("root", Some("10.0.0.1"), 3), ("alice", None, 40000)] {
        template
            .update(
                "INSERT INTO admin (username, last_ip, last_time, logins) VALUES (?, ?, ?, ?)",
                &[
                    ParameterValue::from(username),
                    ParameterValue::from(last_ip),
                    ParameterValue::from(last_time()),
                    ParameterValue::from(logins),
                ],
            )
            .unwrap();
    }

    template
}

#[test_log::test]
fn maps_rows_into_derived_records() {
    let template = template();

    let admins = template
        .query_rows(
            "SELECT id, username, last_ip AS LAST_IP, last_time, logins, 'x' AS session \
             FROM admin WHERE id = 1",
            &(),
            RecordRowMapper::<Admin>::new(),
        )
        .unwrap();

    assert_eq!(
        admins,
        vec![Admin {
            id: 1,
            username: "root".to_string(),
            last_ip: Some("10.0.0.1".to_string()),
            last_time: Some(last_time()),
            login_count: 3,
            session: None,
        }]
    );
}

#[test_log::test]
fn record_mapping_reports_overflowing_column() {
    let template = template();

    let result = template.query_rows(
        "SELECT id, logins FROM admin WHERE id = 2",
        &(),
        RecordRowMapper::<Admin>::new(),
    );

    let Err(SqlTemplateError::RecordMapping {
        column,
        field,
        source,
    }) = result
    else {
        panic!("expected record mapping error, got {result:?}");
    };
    assert_eq!(column, "logins");
    assert_eq!(field, "logins");
    assert!(matches!(source, ConversionError::Overflow { .. }));
}

#[test_log::test]
fn scalar_queries_narrow_with_overflow_checks() {
    let template = template();

    let sql = "SELECT logins FROM admin WHERE id = ?";

    let small = template
        .query_for_value::<i16, _>(sql, &[ParameterValue::from(1)])
        .unwrap();
    let large = template.query_for_value::<i16, _>(sql, &[ParameterValue::from(2)]);

    assert_eq!(small, 3);
    assert!(matches!(
        large,
        Err(SqlTemplateError::TypeMismatch { row_num: 0, .. })
    ));
}

#[test_log::test]
fn big_integer_text_follows_octal_rule() {
    let template = template();

    assert_eq!(
        template.query_for_value::<i128, _>("SELECT '0500'", &()).unwrap(),
        320
    );
    assert_eq!(
        template.query_for_value::<i128, _>("SELECT '0x1A'", &()).unwrap(),
        26
    );
    assert_eq!(
        template.query_for_value::<i32, _>("SELECT '017'", &()).unwrap(),
        17
    );
}

#[test_log::test]
fn null_scalar_reads_as_zero() {
    let template = template();

    assert_eq!(
        template
            .query_for_i64(
                "SELECT max(id) FROM admin WHERE username = ?",
                &[ParameterValue::from("nobody")]
            )
            .unwrap(),
        0
    );
    assert_eq!(
        template.query_for_i32("SELECT count(*) FROM admin", &()).unwrap(),
        2
    );
}

#[test_log::test]
fn column_maps_keep_select_order_and_ignore_case() {
    let template = template();

    let map = template
        .query_for_map("SELECT username, id, last_ip FROM admin WHERE id = 2", &())
        .unwrap();

    assert_eq!(
        map.keys().collect::<Vec<_>>(),
        vec!["username", "id", "last_ip"]
    );
    assert_eq!(map.get("ID"), Some(&SqlValue::Int64(2)));
    assert_eq!(map.get("last_ip"), Some(&SqlValue::Null));
}

#[test_log::test]
fn list_arguments_expand_into_placeholders() {
    let template = template();

    let names = template
        .query_for_list::<String, _>(
            "SELECT username FROM admin WHERE id IN (?, ?) AND username <> ? ORDER BY id",
            &TypedArguments::new(
                vec![
                    SqlValue::List(vec![1.into(), 2.into()]).into(),
                    "nobody".into(),
                ],
                vec![SqlType::INTEGER, SqlType::VARCHAR],
            )
            .unwrap(),
        )
        .unwrap();

    assert_eq!(names, vec!["root".to_string(), "alice".to_string()]);
}

#[test_log::test]
fn declared_decimal_parameters_round_trip() {
    let template = template();
    let balance = DeclaredParameter::new(SqlType::DECIMAL).with_name("balance");

    template
        .update(
            "UPDATE admin SET balance = ? WHERE id = 1",
            &[balance.value(dec!(1234.50))],
        )
        .unwrap();

    let stored = template
        .query_for_value::<Decimal, _>("SELECT balance FROM admin WHERE id = 1", &())
        .unwrap();

    assert_eq!(stored, dec!(1234.50));
}

#[test_log::test]
fn null_parameters_store_sql_null() {
    let template = template();

    template
        .update(
            "UPDATE admin SET last_ip = ? WHERE id = 1",
            &[ParameterValue::from(None::<String>)],
        )
        .unwrap();

    let last_ip = template
        .query_for_value::<Option<String>, _>("SELECT last_ip FROM admin WHERE id = 1", &())
        .unwrap();

    assert_eq!(last_ip, None);
}

#[test_log::test]
fn single_result_queries_enforce_cardinality() {
    let template = template();

    let none = template.query_for_value::<i64, _>("SELECT id FROM admin WHERE id = 99", &());
    let many = template.query_for_value::<i64, _>("SELECT id FROM admin", &());
    let wide = template.query_for_list::<i64, _>("SELECT id, username FROM admin", &());

    assert!(matches!(none, Err(SqlTemplateError::EmptyResult)));
    assert!(matches!(
        many,
        Err(SqlTemplateError::IncorrectResultSize {
            expected: 1,
            actual: 2
        })
    ));
    assert!(matches!(
        wide,
        Err(SqlTemplateError::IncorrectColumnCount {
            expected: 1,
            actual: 2
        })
    ));
}

#[test_log::test]
fn batch_update_runs_each_statement() {
    let template = template();

    let counts = template
        .batch_update(&[
            "UPDATE admin SET logins = logins + 1",
            "DELETE FROM admin WHERE id = 2",
        ])
        .unwrap();

    assert_eq!(counts, vec![2, 1]);
    assert_eq!(
        template.query_for_i64("SELECT count(*) FROM admin", &()).unwrap(),
        1
    );
}

#[test_log::test]
fn batch_update_rejects_queries() {
    let template = template();

    let result = template.batch_update(&["SELECT * FROM admin"]);

    assert!(result.is_err_and(|e| e.is_configuration_error()));
}

/// Binds `value` plainly and with `sql_type`, reading each back as `T`.
fn assert_round_trip<T>(template: &SqlTemplate, value: T, sql_type: SqlType)
where
    T: FromSqlValue + Into<SqlValue> + Clone + Debug + PartialEq,
{
    let plain = template
        .query_for_value::<T, _>("SELECT ?", &[ParameterValue::plain(value.clone())])
        .unwrap();
    assert_eq!(plain, value, "plain bind");

    let typed = template
        .query_for_value::<T, _>(
            "SELECT ?",
            &TypedArguments::new(vec![ParameterValue::plain(value.clone())], vec![sql_type])
                .unwrap(),
        )
        .unwrap();
    assert_eq!(typed, value, "bind as {sql_type}");
}

#[test_log::test]
fn bound_values_read_back_unchanged() {
    let template = template();
    let date = NaiveDate::from_ymd_opt(2009, 4, 24).unwrap();
    let time = NaiveTime::from_hms_opt(13, 5, 10).unwrap();

    assert_round_trip(&template, "root".to_string(), SqlType::VARCHAR);
    assert_round_trip(&template, true, SqlType::BOOLEAN);
    assert_round_trip(&template, false, SqlType::BIT);
    assert_round_trip(&template, -12_i8, SqlType::TINYINT);
    assert_round_trip(&template, 30000_i16, SqlType::SMALLINT);
    assert_round_trip(&template, -2_000_000_i32, SqlType::INTEGER);
    assert_round_trip(&template, 9_000_000_000_i64, SqlType::BIGINT);
    assert_round_trip(&template, 1.5_f32, SqlType::REAL);
    assert_round_trip(&template, -2.25_f64, SqlType::DOUBLE);
    assert_round_trip(&template, dec!(1234.50), SqlType::DECIMAL);
    assert_round_trip(&template, date, SqlType::DATE);
    assert_round_trip(&template, time, SqlType::TIME);
    assert_round_trip(&template, date.and_time(time), SqlType::TIMESTAMP);
}

#[test_log::test]
fn zero_max_rows_keeps_every_row() {
    let template = template().with_config(TemplateConfig::new().with_max_rows(0));

    assert_eq!(
        template
            .query_for_list::<i64, _>("SELECT id FROM admin ORDER BY id", &())
            .unwrap(),
        vec![1, 2]
    );
    assert_eq!(
        template.query_for_i64("SELECT count(*) FROM admin", &()).unwrap(),
        2
    );
}

#[test_log::test]
fn zero_fetch_size_keeps_every_row() {
    let template = template().with_config(TemplateConfig::new().with_fetch_size(0));

    assert_eq!(
        template
            .query_for_list::<String, _>("SELECT username FROM admin ORDER BY id", &())
            .unwrap(),
        vec!["root".to_string(), "alice".to_string()]
    );
}

#[test_log::test]
fn max_rows_caps_query_results() {
    let template = template().with_config(TemplateConfig::new().with_max_rows(1));

    assert_eq!(
        template
            .query_for_list::<i64, _>("SELECT id FROM admin ORDER BY id", &())
            .unwrap(),
        vec![1]
    );
}

#[test_log::test]
fn nested_query_from_row_callback_reports_busy_connection() {
    let template = template();

    let result = template.query_each(
        "SELECT id FROM admin",
        &(),
        &mut |_row: &dyn ResultRow| -> Result<(), SqlTemplateError> {
            template.query_for_i64("SELECT count(*) FROM admin", &())?;
            Ok(())
        },
    );

    assert!(matches!(
        result,
        Err(SqlTemplateError::Driver(DriverError::Busy(_)))
    ));
    assert_eq!(
        template.query_for_i64("SELECT count(*) FROM admin", &()).unwrap(),
        2
    );
}
