/*!
This binary grounds a lifted temporal planning task and translates it into finite-domain (SAS+) variables.

# Grounding
The input task is read as JSON, as written by the parser and preprocessor. Every operator is instantiated with all parameter
combinations whose preconditions can become true, quantified goals are expanded and static variables are folded into the actions.

# Translation
Boolean propositions that can never hold at the same time are packed into multi-valued variables. The resulting task is printed
in a textual form, or as JSON with `--json`.

# Usage
```plain
Usage: ground-sas [OPTIONS] <INPUT>

Arguments:
  <INPUT>  Input filename

Options:
      --rust_log <RUST_LOG>        Sets the verbosity to 'warn', 'info', 'debug' or 'trace' if -v and -q are not used [env: RUST_LOG=]
  -v...                            Sets log verbosity (multiple times means more verbose)
  -q                               Sets log verbosity to only errors
      --keep-static                Keep the variables whose value never changes
      --only-mutex                 Only compute the mutexes, every proposition becomes a boolean variable
      --mutex-file [<MUTEX_FILE>]  Write the mutex pairs to the given file [default when given without a value: mutex.txt]
      --split <SPLIT>              Strategy used to group the mutex propositions, 'cliques' or 'components' [default: cliques]
      --pass-limit <PASS_LIMIT>    Maximal number of passes of the mutex computation
      --grounded                   Stop after grounding and print the grounded task
      --stats                      Print the per-level grounding statistics to stderr
      --json                       Print JSON instead of the textual representation
      --output <OUTPUT>            Write the result to the given file instead of stdout
  -h, --help                       Print help
  -V, --version                    Print version
```
 */

#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    variant_size_differences
)]

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::PathBuf,
};

use clap::Parser;
use ground_sas::{datatypes::PreprocessedTask, grounder, translator, Config, SplitStrategy};
use strum::VariantNames;

fn parse_split(value: &str) -> Result<SplitStrategy, String> {
    value.parse().map_err(|_| {
        format!(
            "possible values are {}",
            SplitStrategy::VARIANTS.join(", ")
        )
    })
}

#[derive(Parser, Debug)]
#[command(name = "ground-sas", author, version, about)]
struct App {
    /// Input filename
    input: PathBuf,
    /// Sets the verbosity to 'warn', 'info', 'debug' or 'trace' if -v and -q are not used
    #[arg(long = "rust_log", env)]
    rust_log: Option<String>,
    /// Sets log verbosity (multiple times means more verbose)
    #[arg(short, action = clap::ArgAction::Count, group = "verbosity")]
    verbose: u8,
    /// Sets log verbosity to only errors
    #[arg(short, group = "verbosity")]
    quiet: bool,
    /// Keep the variables whose value never changes
    #[arg(long = "keep-static")]
    keep_static: bool,
    /// Only compute the mutexes, every proposition becomes a boolean variable
    #[arg(long = "only-mutex")]
    only_mutex: bool,
    /// Write the mutex pairs to the given file
    #[arg(long = "mutex-file", num_args = 0..=1, default_missing_value = "mutex.txt")]
    mutex_file: Option<PathBuf>,
    /// Strategy used to group the mutex propositions, 'cliques' or 'components'
    #[arg(long, default_value_t = SplitStrategy::Cliques, value_parser = parse_split)]
    split: SplitStrategy,
    /// Maximal number of passes of the mutex computation
    #[arg(long = "pass-limit")]
    pass_limit: Option<usize>,
    /// Stop after grounding and print the grounded task
    #[arg(long)]
    grounded: bool,
    /// Print the per-level grounding statistics to stderr
    #[arg(long)]
    stats: bool,
    /// Print JSON instead of the textual representation
    #[arg(long)]
    json: bool,
    /// Write the result to the given file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl App {
    fn init_logger(&self) {
        let filter_level = match self.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            3.. => log::LevelFilter::Trace,
            0 => {
                if self.quiet {
                    log::LevelFilter::Error
                } else if let Some(rust_log) = self.rust_log.as_deref() {
                    match rust_log {
                        "error" => log::LevelFilter::Error,
                        "info" => log::LevelFilter::Info,
                        "debug" => log::LevelFilter::Debug,
                        "trace" => log::LevelFilter::Trace,
                        _ => log::LevelFilter::Warn,
                    }
                } else {
                    log::LevelFilter::Warn
                }
            }
        };
        env_logger::builder().filter_level(filter_level).init();
        log::info!("Version: {}", clap::crate_version!());
    }

    fn config(&self) -> Config {
        let mut config = Config {
            keep_static_data: self.keep_static,
            only_generate_mutex: self.only_mutex,
            split: self.split,
            ..Default::default()
        };
        if let Some(path) = &self.mutex_file {
            config.generate_mutex_file = true;
            config.mutex_file = path.clone();
        }
        if let Some(limit) = self.pass_limit {
            config.mutex_pass_limit = limit;
        }
        config
    }

    fn run(&self) -> ground_sas::Result<()> {
        let config = self.config();
        log::debug!("{:?}", config);
        let task = PreprocessedTask::from_reader(BufReader::new(File::open(&self.input)?))?;
        log::info!("[Done] reading {}", self.input.display());

        let grounded = grounder::ground(&task, config.keep_static_data)?;
        if self.stats {
            eprint!("{}", grounded.stats);
        }
        let mut out: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        if self.grounded {
            if self.json {
                serde_json::to_writer_pretty(&mut out, &grounded)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", grounded)?;
            }
        } else {
            let sas = translator::translate(&grounded, &config)?;
            if self.json {
                serde_json::to_writer_pretty(&mut out, &sas)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", sas)?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

fn main() {
    let app = App::parse();
    app.init_logger();
    if let Err(e) = app.run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
