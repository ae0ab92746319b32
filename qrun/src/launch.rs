//! Resolution of a parsed command line into what the runtime is asked to do.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::arguments::{Cmdline, License, ParsedOptions};
use crate::config::Environment;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("--exec-class needs a class name when no program file is given")]
    MissingClassName,
}

impl LaunchError {
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::MissingClassName => 1,
        }
    }
}

/// Where the program comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Expression evaluated and printed (`--eval`).
    Eval(String),
    /// Program text from the command line (`--exec`).
    Text(String),
    File(PathBuf),
    Stdin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub source: Source,
    /// Class instantiated as the application, if running as a class.
    pub exec_class: Option<String>,
    pub charset: String,
    pub time_zone: Option<String>,
    pub module_path: Vec<PathBuf>,
    pub options: ParsedOptions,
    /// Arguments visible to the program.
    pub argv: Vec<String>,
}

impl LaunchPlan {
    pub fn resolve(cmdline: Cmdline, env: &Environment) -> Result<LaunchPlan, LaunchError> {
        let Cmdline {
            options,
            program_file,
            read_stdin: _,
            argv,
        } = cmdline;

        let source = if let Some(expr) = &options.eval {
            Source::Eval(expr.clone())
        } else if let Some(text) = &options.program_text {
            Source::Text(text.clone())
        } else if let Some(file) = &program_file {
            Source::File(PathBuf::from(file))
        } else {
            Source::Stdin
        };

        let exec_class = if options.exec_class {
            let name = options
                .exec_class_name
                .clone()
                .or_else(|| program_file.as_deref().and_then(class_name_from_path));
            Some(name.ok_or(LaunchError::MissingClassName)?)
        } else {
            None
        };

        Ok(LaunchPlan {
            source,
            exec_class,
            charset: options.charset.clone().unwrap_or_else(|| env.charset.clone()),
            time_zone: options.time_zone.clone().or_else(|| env.time_zone.clone()),
            module_path: env.search_path(),
            options,
            argv,
        })
    }
}

/// Class name implied by a program file: its file name without extension.
fn class_name_from_path(file: &str) -> Option<String> {
    Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

impl fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Eval(expr) => writeln!(f, "eval: {}", expr)?,
            Source::Text(text) => writeln!(f, "exec: {}", text)?,
            Source::File(path) => writeln!(f, "file: {}", path.display())?,
            Source::Stdin => writeln!(f, "file: -")?,
        }
        if let Some(class) = &self.exec_class {
            writeln!(f, "class: {}", class)?;
        }
        for module in &self.options.modules {
            writeln!(f, "load: {}", module)?;
        }
        for (name, value) in &self.options.defines {
            match value {
                Some(value) => writeln!(f, "define: {}={}", name, value)?,
                None => writeln!(f, "define: {}", name)?,
            }
        }
        let o = &self.options;
        let parse_options: Vec<String> = o.parse_options.names().collect();
        writeln!(f, "parse-options: {}", parse_options.join(","))?;
        writeln!(f, "warnings: {}", o.warnings)?;
        writeln!(f, "warnings-are-errors: {}", o.warnings_are_errors)?;
        writeln!(f, "lock-options: {}", o.lock_options)?;
        writeln!(f, "charset: {}", self.charset)?;
        if let Some(tz) = &self.time_zone {
            writeln!(f, "time-zone: {}", tz)?;
        }
        let license = match o.license {
            License::Gpl => "GPL",
            License::Lgpl => "LGPL",
            License::Mit => "MIT",
        };
        writeln!(f, "license: {}", license)?;
        writeln!(f, "signals: {}", if o.signals_disabled { "disabled" } else { "enabled" })?;
        writeln!(f, "show-module-errors: {}", o.show_module_errors)?;
        writeln!(f, "only-first-exception: {}", o.only_first_exception)?;
        let module_path: Vec<String> = self
            .module_path
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        writeln!(f, "module-path: {}", module_path.join(":"))?;
        writeln!(f, "argv: {}", self.argv.join(" "))
    }
}
