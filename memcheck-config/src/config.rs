//! The immutable checker configuration and its builder.
//!
//! A [`Configuration`] is built once per run. Everything that touches the
//! filesystem (runtime probing, suppression discovery, structured-output temp
//! file) happens inside [`ConfigurationBuilder::build`]; afterwards the value
//! is read-only and safe to share across threads.

use crate::defaults;
use crate::error::ConfigError;
use crate::patterns::FunctionPattern;
use crate::runtime::RuntimeVersion;
use crate::suppressions::resolve_suppression_files;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Where human-readable findings are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportSink {
    #[default]
    Stderr,
    Stdout,
    File(PathBuf),
}

impl ReportSink {
    /// Open the sink for writing. File sinks are truncated.
    pub fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(match self {
            ReportSink::Stderr => Box::new(io::stderr()),
            ReportSink::Stdout => Box::new(io::stdout()),
            ReportSink::File(path) => Box::new(File::create(path)?),
        })
    }
}

impl FromStr for ReportSink {
    type Err = std::convert::Infallible;

    /// `stderr`, `stdout`, `-` (stdout) or a file path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "stderr" => ReportSink::Stderr,
            "stdout" | "-" => ReportSink::Stdout,
            path => ReportSink::File(PathBuf::from(path)),
        })
    }
}

impl fmt::Display for ReportSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportSink::Stderr => f.write_str("stderr"),
            ReportSink::Stdout => f.write_str("stdout"),
            ReportSink::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Whether valgrind writes a machine-readable XML report, and where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StructuredOutput {
    Disabled,
    /// A temp file owned by the configuration, deleted when it is dropped.
    #[default]
    TempFile,
    /// A caller-chosen file that outlives the run.
    File(PathBuf),
}

/// The XML destination held by a built configuration.
#[derive(Debug)]
pub enum XmlOutputFile {
    Temp(NamedTempFile),
    Path(PathBuf),
}

impl XmlOutputFile {
    pub fn path(&self) -> &Path {
        match self {
            XmlOutputFile::Temp(file) => file.path(),
            XmlOutputFile::Path(path) => path,
        }
    }
}

/// Ready-to-run checker invocation plus the inputs the stack classifier needs.
#[derive(Debug)]
pub struct Configuration {
    binary_name: String,
    ruby: PathBuf,
    runtime: RuntimeVersion,
    valgrind: PathBuf,
    valgrind_options: Vec<String>,
    suppression_files: Vec<PathBuf>,
    skipped_ruby_functions: Vec<FunctionPattern>,
    output: ReportSink,
    xml_file: Option<XmlOutputFile>,
}

impl Configuration {
    /// Start building a configuration for the extension `binary_name`.
    pub fn builder(binary_name: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(binary_name)
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// Runtime executable path frames are compared against.
    pub fn ruby(&self) -> &Path {
        &self.ruby
    }

    pub fn runtime(&self) -> &RuntimeVersion {
        &self.runtime
    }

    pub fn valgrind(&self) -> &Path {
        &self.valgrind
    }

    /// Base flags, then one `--suppressions=` per resolved file, then the
    /// XML flags when structured output is on.
    pub fn valgrind_options(&self) -> &[String] {
        &self.valgrind_options
    }

    pub fn suppression_files(&self) -> &[PathBuf] {
        &self.suppression_files
    }

    pub fn skipped_ruby_functions(&self) -> &[FunctionPattern] {
        &self.skipped_ruby_functions
    }

    pub fn output(&self) -> &ReportSink {
        &self.output
    }

    /// Path of the XML report valgrind will write, if structured output is on.
    pub fn xml_file(&self) -> Option<&Path> {
        self.xml_file.as_ref().map(XmlOutputFile::path)
    }

    /// `Init_<binary_name>`, the extension's one-time initialisation function.
    pub fn init_function(&self) -> String {
        format!("Init_{}", self.binary_name)
    }

    /// Render the full invocation as a single space-joined string.
    pub fn command<S: AsRef<str>>(&self, args: &[S]) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.valgrind_options.len() + args.len() + 2);
        parts.push(self.valgrind.display().to_string());
        parts.extend(self.valgrind_options.iter().cloned());
        parts.push(self.ruby.display().to_string());
        parts.extend(args.iter().map(|a| a.as_ref().to_string()));
        parts.join(" ")
    }

    /// Arguments to pass to [`Self::valgrind`] when spawning it directly.
    pub fn command_args<S: AsRef<str>>(&self, args: &[S]) -> Vec<OsString> {
        self.valgrind_options
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(self.ruby.clone().into_os_string()))
            .chain(args.iter().map(|a| OsString::from(a.as_ref())))
            .collect()
    }
}

/// Collects user-level settings and resolves them into a [`Configuration`].
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    binary_name: String,
    ruby: Option<PathBuf>,
    runtime: Option<RuntimeVersion>,
    valgrind: PathBuf,
    valgrind_options: Vec<String>,
    suppressions_dir: PathBuf,
    skipped_ruby_functions: Vec<FunctionPattern>,
    structured_output: StructuredOutput,
    output: ReportSink,
    search_path: Option<OsString>,
}

impl ConfigurationBuilder {
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
            ruby: None,
            runtime: None,
            valgrind: defaults::valgrind(),
            valgrind_options: defaults::valgrind_options(),
            suppressions_dir: defaults::suppressions_dir(),
            skipped_ruby_functions: defaults::skipped_ruby_functions(),
            structured_output: StructuredOutput::default(),
            output: ReportSink::default(),
            search_path: None,
        }
    }

    pub fn binary_name(mut self, binary_name: impl Into<String>) -> Self {
        self.binary_name = binary_name.into();
        self
    }

    /// Runtime executable. Without an explicit [`Self::runtime`] the
    /// executable is probed for its version at build time; with one, an unset
    /// executable is looked up on [`Self::search_path`].
    pub fn ruby(mut self, ruby: impl Into<PathBuf>) -> Self {
        self.ruby = Some(ruby.into());
        self
    }

    /// Skip probing and use this runtime version.
    pub fn runtime(mut self, runtime: RuntimeVersion) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn valgrind(mut self, valgrind: impl Into<PathBuf>) -> Self {
        self.valgrind = valgrind.into();
        self
    }

    /// Replace the base flag set.
    pub fn valgrind_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valgrind_options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn suppressions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.suppressions_dir = dir.into();
        self
    }

    /// Replace the ignore-pattern list.
    pub fn skipped_ruby_functions(mut self, patterns: Vec<FunctionPattern>) -> Self {
        self.skipped_ruby_functions = patterns;
        self
    }

    pub fn structured_output(mut self, structured_output: StructuredOutput) -> Self {
        self.structured_output = structured_output;
        self
    }

    pub fn output(mut self, output: ReportSink) -> Self {
        self.output = output;
        self
    }

    /// Directories searched for the default runtime executable when no
    /// [`Self::ruby`] is set. Defaults to `PATH`.
    pub fn search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Resolve runtime, suppressions and structured output.
    pub fn build(self) -> Result<Configuration, ConfigError> {
        let binary_name = self.binary_name.trim().to_string();
        if binary_name.is_empty() {
            return Err(ConfigError::MissingBinaryName);
        }

        let (ruby, runtime) = match (self.ruby, self.runtime) {
            (Some(ruby), Some(runtime)) => (ruby, runtime),
            (None, Some(runtime)) => {
                let search_path = self.search_path.or_else(|| std::env::var_os("PATH"));
                (locate_default_ruby(search_path.as_deref()), runtime)
            }
            (ruby, None) => {
                let target = ruby.clone().unwrap_or_else(defaults::ruby);
                let probed = RuntimeVersion::probe(&target)?;
                (ruby.unwrap_or(probed.executable), probed.version)
            }
        };

        let suppression_files =
            resolve_suppression_files(&self.suppressions_dir, &binary_name, &runtime);

        let mut valgrind_options = self.valgrind_options;
        valgrind_options.extend(
            suppression_files
                .iter()
                .map(|f| format!("--suppressions={}", f.display())),
        );

        let xml_file = match self.structured_output {
            StructuredOutput::Disabled => None,
            StructuredOutput::TempFile => Some(XmlOutputFile::Temp(
                NamedTempFile::new().map_err(ConfigError::TempFile)?,
            )),
            StructuredOutput::File(path) => Some(XmlOutputFile::Path(path)),
        };
        if let Some(xml) = &xml_file {
            valgrind_options.push("--xml=yes".to_string());
            valgrind_options.push(format!("--xml-file={}", xml.path().display()));
        }

        log::debug!(
            "Configured {} with {} valgrind option(s), {} ignore pattern(s)",
            binary_name,
            valgrind_options.len(),
            self.skipped_ruby_functions.len()
        );

        Ok(Configuration {
            binary_name,
            ruby,
            runtime,
            valgrind: self.valgrind,
            valgrind_options,
            suppression_files,
            skipped_ruby_functions: self.skipped_ruby_functions,
            output: self.output,
            xml_file,
        })
    }
}

/// Absolute `ruby` from `search_path`, so frames valgrind reports against the
/// interpreter still match. Falls back to the bare command name.
fn locate_default_ruby(search_path: Option<&OsStr>) -> PathBuf {
    match search_path.and_then(|path| defaults::find_executable(defaults::RUBY, path)) {
        Some(ruby) => {
            log::debug!("Default runtime resolved to {:?}", ruby);
            ruby
        }
        None => {
            log::warn!(
                "No '{}' executable on the search path; runtime frames will only match libruby",
                defaults::RUBY
            );
            defaults::ruby()
        }
    }
}
