//! Command-line interface for ruby-memcheck.
//!
//! Every subcommand builds one [`Configuration`] from the project file plus
//! CLI overrides, then prints the invocation, lists suppressions, classifies
//! parsed error stacks, or runs the checker.

use crate::report;
use crate::runner;
use crate::stack;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use memcheck_config::{
    Configuration, ConfigurationBuilder, ProjectConfig, ReportSink, RuntimeVersion,
    StructuredOutput, compile_patterns, project, suppressions::suppression_glob,
};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

/// ruby-memcheck - run Ruby native extensions under valgrind and keep only
/// the errors the extension is responsible for
#[derive(Parser)]
#[command(name = "ruby-memcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project config file
    #[arg(long, global = true, value_name = "PATH", default_value = project::DEFAULT_FILE_NAME)]
    pub config: PathBuf,

    /// Set debug log level (overrides RUST_LOG)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Overrides shared by every subcommand. Unset flags fall back to the
/// project file, then to built-in defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Name of the extension under test (e.g. `mygem` for `mygem.so`)
    #[arg(short, long)]
    pub binary_name: Option<String>,

    /// Ruby executable
    #[arg(long, value_name = "PATH")]
    pub ruby: Option<PathBuf>,

    /// Runtime version as <engine>-<version>.<patchlevel>; skips probing Ruby (an unset --ruby is looked up on PATH)
    #[arg(long, value_name = "VERSION")]
    pub runtime_version: Option<String>,

    /// valgrind executable
    #[arg(long, value_name = "PATH")]
    pub valgrind: Option<PathBuf>,

    /// Replace the base valgrind flags (repeatable)
    #[arg(long = "valgrind-option", value_name = "FLAG", allow_hyphen_values = true)]
    pub valgrind_options: Vec<String>,

    /// Directory holding <binary>_<version>.supp files
    #[arg(long, value_name = "DIR")]
    pub suppressions_dir: Option<PathBuf>,

    /// Replace the ignored Ruby function patterns (repeatable regex)
    #[arg(long = "skip-ruby-function", value_name = "REGEX")]
    pub skipped_ruby_functions: Vec<String>,

    /// Keep valgrind's XML report at this path instead of a temp file
    #[arg(long, value_name = "PATH", conflicts_with = "no_xml")]
    pub xml_file: Option<PathBuf>,

    /// Do not ask valgrind for an XML report
    #[arg(long)]
    pub no_xml: bool,

    /// Where to write retained errors: stderr, stdout, or a file path
    #[arg(long, value_name = "SINK")]
    pub output: Option<String>,
}

impl ConfigArgs {
    /// Overlay CLI flags onto a builder.
    pub fn apply(self, mut builder: ConfigurationBuilder) -> Result<ConfigurationBuilder> {
        if let Some(name) = self.binary_name {
            builder = builder.binary_name(name);
        }
        if let Some(ruby) = self.ruby {
            builder = builder.ruby(ruby);
        }
        if let Some(version) = self.runtime_version {
            builder = builder.runtime(RuntimeVersion::parse(&version)?);
        }
        if let Some(valgrind) = self.valgrind {
            builder = builder.valgrind(valgrind);
        }
        if !self.valgrind_options.is_empty() {
            builder = builder.valgrind_options(self.valgrind_options);
        }
        if let Some(dir) = self.suppressions_dir {
            builder = builder.suppressions_dir(dir);
        }
        if !self.skipped_ruby_functions.is_empty() {
            builder = builder.skipped_ruby_functions(compile_patterns(&self.skipped_ruby_functions)?);
        }
        if self.no_xml {
            builder = builder.structured_output(StructuredOutput::Disabled);
        } else if let Some(path) = self.xml_file {
            builder = builder.structured_output(StructuredOutput::File(path));
        }
        if let Some(output) = self.output {
            let Ok(sink) = output.parse::<ReportSink>();
            builder = builder.output(sink);
        }
        Ok(builder)
    }

    /// Project file, then CLI flags, then build.
    pub fn build(self, project_file: &std::path::Path) -> Result<Configuration> {
        let project = ProjectConfig::load(project_file)?;
        let builder = project.apply(Configuration::builder(""))?;
        let config = self
            .apply(builder)?
            .build()
            .context("failed to build checker configuration")?;
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the full valgrind invocation
    Command {
        #[command(flatten)]
        config: ConfigArgs,

        /// Arguments passed to Ruby
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List the suppression files that apply to this runtime
    Suppressions {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Classify parsed error stacks (JSON) and report the retained ones
    Classify {
        #[command(flatten)]
        config: ConfigArgs,

        /// JSON file of reported errors; `-` reads stdin
        #[arg(short, long, value_name = "PATH", default_value = "-")]
        input: PathBuf,
    },

    /// Run Ruby under valgrind
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Arguments passed to Ruby
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// Execute a parsed command line; returns the process exit code.
pub fn execute(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Command { config, args } => {
            let config = config.build(&cli.config)?;
            println!("{}", config.command(&args));
            Ok(0)
        }
        Commands::Suppressions { config } => {
            let config = config.build(&cli.config)?;
            println!("# {} on {}", config.binary_name(), config.runtime());
            for version_id in config.runtime().fallback_chain() {
                println!("#   tried {}", suppression_glob(config.binary_name(), &version_id));
            }
            for file in config.suppression_files() {
                println!("{}", file.display());
            }
            Ok(0)
        }
        Commands::Classify { config, input } => {
            let config = config.build(&cli.config)?;
            let errors = if input.as_os_str() == "-" {
                stack::read_errors(io::stdin().lock())
                    .context("failed to parse reported errors from stdin")?
            } else {
                let file = File::open(&input)
                    .with_context(|| format!("failed to open {}", input.display()))?;
                stack::read_errors(BufReader::new(file))
                    .with_context(|| format!("failed to parse reported errors in {}", input.display()))?
            };
            let summary = report::render_errors(&config, &errors)?;
            Ok(if summary.has_errors() { 1 } else { 0 })
        }
        Commands::Run { config, args } => {
            let config = config.build(&cli.config)?;
            let status = runner::run_checker(&config, &args)?;
            if let Some(xml) = config.xml_file() {
                log::info!("valgrind XML report: {}", xml.display());
            }
            Ok(status.code().unwrap_or(1))
        }
    }
}

/// Parse `std::env::args` and execute.
pub fn process_cli() -> Result<i32> {
    let cli = Cli::parse();
    crate::debug::init_log_bridge(cli.log_level.map(LogLevelArg::to_level_filter));
    execute(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_with_trailing_args() {
        let cli = Cli::try_parse_from([
            "ruby-memcheck",
            "command",
            "--binary-name",
            "mygem",
            "--runtime-version",
            "ruby-3.3.0.0",
            "--",
            "-Ilib",
            "test/run.rb",
        ])
        .unwrap();
        let Commands::Command { config, args } = cli.command else {
            panic!("expected command subcommand");
        };
        assert_eq!(config.binary_name.as_deref(), Some("mygem"));
        assert_eq!(args, ["-Ilib", "test/run.rb"]);
    }

    #[test]
    fn test_version_comes_from_package() {
        use clap::CommandFactory;
        assert_eq!(
            Cli::command().get_version(),
            Some(env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_xml_flags_conflict() {
        let result = Cli::try_parse_from([
            "ruby-memcheck",
            "suppressions",
            "--no-xml",
            "--xml-file",
            "out.xml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_args_build() {
        let args = ConfigArgs {
            binary_name: Some("mygem".to_string()),
            ruby: Some(PathBuf::from("/usr/bin/ruby")),
            runtime_version: Some("ruby-3.3.0.0".to_string()),
            valgrind_options: vec!["--leak-check=full".to_string()],
            suppressions_dir: Some(PathBuf::from("/nonexistent")),
            no_xml: true,
            ..Default::default()
        };
        let config = args
            .build(std::path::Path::new("/nonexistent/.ruby_memcheck.yml"))
            .unwrap();
        assert_eq!(
            config.command(&["t.rb"]),
            "valgrind --leak-check=full /usr/bin/ruby t.rb"
        );
    }

    #[test]
    fn test_config_args_bad_pattern() {
        let args = ConfigArgs {
            binary_name: Some("mygem".to_string()),
            runtime_version: Some("ruby-3.3.0.0".to_string()),
            skipped_ruby_functions: vec!["(".to_string()],
            ..Default::default()
        };
        assert!(args.build(std::path::Path::new("/nonexistent/x.yml")).is_err());
    }
}
