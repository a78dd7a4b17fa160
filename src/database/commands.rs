// deploysync/src/database/commands.rs
use chrono::{DateTime, Local};

use super::adapter::Adapter;
use crate::config::database::DatabaseConfig;

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// `db/<database>_<YYYYMMDD-HHMMSS>.sql.bz2`
pub fn output_file_name(database: &str, at: DateTime<Local>) -> String {
    format!("db/{}_{}.sql.bz2", database, at.format(TIMESTAMP_FORMAT))
}

/// The decompressed sibling `bunzip2` leaves next to an artifact.
pub fn unzipped_path(file: &str) -> String {
    file.strip_suffix(".bz2").unwrap_or(file).to_string()
}

fn with_password(adapter: Adapter, config: &DatabaseConfig, command: String) -> String {
    match adapter.password_env(config) {
        Some(env) => format!("{} {}", env, command),
        None => command,
    }
}

/// Dump command writing plain SQL to stdout.
pub fn dump_command(adapter: Adapter, config: &DatabaseConfig) -> String {
    let credentials = adapter.credentials(config);
    let database = config.database();
    match adapter {
        Adapter::Mysql => format!(
            "mysqldump {} {} --single-transaction --lock-tables=false",
            credentials, database
        ),
        Adapter::Postgresql => with_password(
            adapter,
            config,
            format!("pg_dump --no-acl --no-owner {} {}", credentials, database),
        ),
    }
}

/// Steps leaving a bzip2 artifact at `output_file`, in order. Each step is a
/// plain redirect, never a pipe, so a failing dumper is the step's exit status.
pub fn dump_statements(adapter: Adapter, config: &DatabaseConfig, output_file: &str) -> Vec<String> {
    let sql_file = unzipped_path(output_file);
    let mut statements = match adapter {
        // 50013 DEFINER lines break restores for users without SUPER.
        Adapter::Mysql => {
            let raw_file = format!("{}.raw", sql_file);
            vec![
                format!("{} > {}", dump_command(adapter, config), raw_file),
                format!("grep -v '50013 DEFINER' {} > {}", raw_file, sql_file),
                format!("rm {}", raw_file),
            ]
        }
        Adapter::Postgresql => vec![format!("{} > {}", dump_command(adapter, config), sql_file)],
    };
    statements.push(format!("bzip2 -f {}", sql_file));
    statements
}

/// Dump steps chained so a failed dump never leaves an artifact behind.
pub fn compressed_dump_command(adapter: Adapter, config: &DatabaseConfig, output_file: &str) -> String {
    dump_statements(adapter, config, output_file).join(" && ")
}

/// Statements restoring `file` into the configured database, in order.
pub fn import_statements(adapter: Adapter, config: &DatabaseConfig, file: &str) -> Vec<String> {
    let credentials = adapter.credentials(config);
    let database = config.database();
    match adapter {
        Adapter::Mysql => vec![format!("mysql {} -D {} < {}", credentials, database, file)],
        Adapter::Postgresql => {
            let terminate = format!(
                "SELECT pg_terminate_backend(pg_stat_activity.pid) FROM pg_stat_activity \
                 WHERE pg_stat_activity.datname = '{}' AND pid <> pg_backend_pid();",
                database
            );
            [
                format!("psql -c \"{}\" {} -d postgres", terminate, credentials),
                format!("dropdb --if-exists {} {}", credentials, database),
                format!("createdb {} {}", credentials, database),
                format!("psql {} -d {} < {}", credentials, database, file),
            ]
            .into_iter()
            .map(|statement| with_password(adapter, config, statement))
            .collect()
        }
    }
}

/// Import statements chained so the first failing step stops the rest.
pub fn import_command(adapter: Adapter, config: &DatabaseConfig, file: &str) -> String {
    import_statements(adapter, config, file).join(" && ")
}
