//! chstream - command-line client
//!
//! Runs one query against a ClickHouse server and prints the result as
//! tab-separated text.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chstream::{ClientResult, Connection, ConnectionConfig};
use tracing_subscriber::EnvFilter;

enum Mode {
    Fetch(String),
    Exec(String),
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut host: Option<String> = None;
    let mut port: Option<u16> = None;
    let mut user: Option<String> = None;
    let mut password: Option<String> = None;
    let mut protocol: Option<String> = None;
    let mut compression = false;
    let mut verbose = false;
    let mut mode: Option<Mode> = None;

    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        // Options taking a value.
        if matches!(
            arg,
            "-c" | "--config"
                | "-H"
                | "--host"
                | "-P"
                | "--port"
                | "-u"
                | "--user"
                | "-p"
                | "--password"
                | "--protocol"
                | "-e"
                | "--execute"
                | "-x"
                | "--exec"
        ) {
            i += 1;
            let Some(value) = args.get(i).cloned() else {
                eprintln!("Missing value for {}", arg);
                return ExitCode::FAILURE;
            };
            match arg {
                "-c" | "--config" => config_path = Some(PathBuf::from(value)),
                "-H" | "--host" => host = Some(value),
                "-P" | "--port" => match value.parse() {
                    Ok(p) => port = Some(p),
                    Err(_) => {
                        eprintln!("Invalid port: {}", value);
                        return ExitCode::FAILURE;
                    }
                },
                "-u" | "--user" => user = Some(value),
                "-p" | "--password" => password = Some(value),
                "--protocol" => protocol = Some(value),
                "-e" | "--execute" => mode = Some(Mode::Fetch(value)),
                _ => mode = Some(Mode::Exec(value)),
            }
        } else {
            match arg {
                "-z" | "--compression" => compression = true,
                "-v" | "--verbose" => verbose = true,
                "-h" | "--help" => {
                    print_help();
                    return ExitCode::SUCCESS;
                }
                "--version" => {
                    println!("chstream v{}", env!("CARGO_PKG_VERSION"));
                    return ExitCode::SUCCESS;
                }
                _ => {
                    eprintln!("Unknown option: {}", arg);
                    return ExitCode::FAILURE;
                }
            }
        }
        i += 1;
    }

    init_tracing(verbose);

    let Some(mode) = mode else {
        print_help();
        return ExitCode::FAILURE;
    };

    let mut config = match config_path {
        Some(path) => match ConnectionConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ConnectionConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(user) = user {
        config.user = user;
    }
    if let Some(password) = password {
        config.password = password;
    }
    if let Some(protocol) = protocol {
        config.protocol = protocol;
    }
    if compression {
        config.compression = true;
    }

    let conn = match Connection::new(config) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match mode {
        Mode::Fetch(query) => print_rows(&conn, &query),
        Mode::Exec(query) => conn.exec(&query),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "chstream=debug" } else { "chstream=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_rows(conn: &Connection, query: &str) -> ClientResult<()> {
    let mut rows = conn.fetch(query)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let columns = rows.columns().to_vec();
    writeln!(out, "{}", columns.join("\t"))?;

    let mut count = 0usize;
    while rows.advance() {
        if let Some(row) = rows.row() {
            let cells: Vec<&str> = columns
                .iter()
                .map(|column| row.get(column).unwrap_or_default())
                .collect();
            writeln!(out, "{}", cells.join("\t"))?;
            count += 1;
        }
    }

    if let Some(e) = rows.err() {
        return Err(e.clone());
    }

    eprintln!("({} rows)", count);
    Ok(())
}

fn print_help() {
    println!("chstream - streaming ClickHouse HTTP client");
    println!();
    println!("Usage: chstream [OPTIONS] (-e SQL | -x SQL)");
    println!();
    println!("Options:");
    println!("  -c, --config FILE      JSON connection configuration");
    println!("  -H, --host HOST        Server host (default: localhost)");
    println!("  -P, --port PORT        Server HTTP port (default: 8123)");
    println!("  -u, --user USER        User name (default: default)");
    println!("  -p, --password PASS    Password");
    println!("      --protocol SCHEME  http or https (default: http)");
    println!("  -e, --execute SQL      Run a query and print its rows");
    println!("  -x, --exec SQL         Run a statement without output");
    println!("  -z, --compression      Request gzip-compressed responses");
    println!("  -v, --verbose          Enable debug logging");
    println!("  -h, --help             Show this help message");
    println!("  --version              Show version");
    println!();
    println!("Examples:");
    println!("  chstream -e 'SELECT name FROM system.databases'");
    println!("  chstream -H ch.local -u reader -p secret -e 'SELECT 1'");
}
