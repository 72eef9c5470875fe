use kvstore::{DriverConfig, Registry, Result, Value};
use slog::{error, o, Drain};
use std::process::exit;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "kvstore")]
struct Opts {
    #[structopt(long, help = "DRIVER-NAME")]
    driver: Option<String>,
    #[structopt(long = "opt", number_of_values = 1, help = "KEY=VALUE driver option")]
    options: Vec<DriverConfig>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    Get {
        #[structopt(required = true)]
        key: String,
    },
    Set {
        #[structopt(index = 1, required = true)]
        key: String,
        #[structopt(index = 2, required = true)]
        value: String,
        #[structopt(long, help = "Store VALUE as a JSON document")]
        json: bool,
    },
    Rm {
        #[structopt(required = true)]
        key: String,
    },
    Keys,
    Count,
    Flush,
}

fn main() {
    let decorator = slog_term::PlainDecorator::new(std::io::stderr());
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let log = slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")));

    let opts = Opts::from_args();
    let logger = log.new(o!("driver" => opts.driver.to_owned()));

    if let Err(e) = run(opts, &logger) {
        error!(logger, "command failed"; "error" => e.to_string());
        eprintln!("{}", e);
        // flush the async drain before exiting
        drop(logger);
        drop(log);
        exit(1);
    }
}

fn run(opts: Opts, logger: &slog::Logger) -> Result<()> {
    let mut config = DriverConfig::new();
    for option in opts.options {
        config.extend(option);
    }

    let registry = Registry::with_builtins(logger.clone());
    let driver = registry.open(opts.driver.as_deref(), &config)?;

    let result = match opts.command {
        Command::Get { key } => driver.get(&key).map(|found| match found {
            Some(Value::Text(s)) => println!("{}", s),
            Some(Value::Bytes(b)) => println!("{}", String::from_utf8_lossy(&b)),
            Some(Value::Structured(v)) => println!("{}", v),
            None => println!("Key not found"),
        }),
        Command::Set { key, value, json } => {
            let value = if json {
                Value::Structured(serde_json::from_str(&value).map_err(kvstore::Error::Encoding)?)
            } else {
                Value::Text(value)
            };
            driver.set(&key, value)
        }
        Command::Rm { key } => driver.delete(&key),
        Command::Keys => driver.keys().map(|keys| {
            for key in keys {
                println!("{}", key);
            }
        }),
        Command::Count => driver.count().map(|count| println!("{}", count)),
        Command::Flush => driver.flush(),
    };

    let closed = driver.close();
    result?;
    closed
}
