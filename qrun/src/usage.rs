//! Help text and the other informational pages that end the program.

use std::io::{self, Write};

use crate::catalog::{self, Warnings, CHARSETS};
use crate::config::{self, Environment, MODULE_APIS};

const USAGE: &str = r#"usage: qrun [option(s)]... [-] [program file] [arguments]
Run a program with the embedded script runtime.  With no program file,
or when the program file is -, the program is read from standard input.

Program options:
  -e, --exec=CODE             run CODE instead of a program file
  -X, --eval=EXPR             evaluate EXPR and print the result
  -x, --exec-class[=NAME]     instantiate class NAME (default: taken from the
                              program file name) as the application
  -D, --define=NAME[=VALUE]   create a parse define; NAME may not repeat
  -l, --load=MODULE           load MODULE before parsing; may be repeated

Parse options:
  -p, --set-parse-option=OPT  set parse option OPT (see -o)
  -K, --lock-options          do not allow programs to change parse options
  -H, --parse-option-help     show help for the parse option switches
  -o, --list-parse-options    list all parse options

Warning options:
  -W, --enable-all-warnings   turn on all warnings
  -w, --enable-warning=WARN   turn on warning WARN (see -i)
  -r, --warnings-are-errors   treat warnings as errors (exit status 2)
  -i, --list-warnings         list all warnings

Runtime options:
  -b, --disable-signals       disable signal handling
  -c, --charset=ENC           default character encoding (see -s)
  -z, --time-zone=TZ          default time zone (region name or UTC offset)
  -m, --show-module-errors    report why modules could not be loaded
      --only-first-exception  report only the first unhandled exception
  -G, --lgpl                  the program is licensed under the LGPL
  -T, --mit                   the program is licensed under the MIT license

Information options:
  -a, --show-aliases          list character encoding aliases
  -s, --show-charsets         list character encodings
  -B, --show-build-options    show build options
  -M, --module-dir            show the system module directory
      --user-module-dir       show the user module directory
      --module-path           show the module search path
      --module-api(s)         show supported module APIs
      --latest-module-api     show the latest module API
  -h, --help                  show this help text
  -V, --version               show full version information
  -v, --short-version         show the version number

Environment variables: QRUN_MODULE_DIR, QRUN_USER_MODULE_DIR,
QRUN_MODULE_PATH, QRUN_CHARSET, TZ, QRUN_LOG.

Exit status: 0 on success, 1 for command line errors, 2 for parse errors
or warnings treated as errors, 3 for unhandled exceptions.
"#;

const PARSE_OPTION_USAGE_HEADER: &str = r#"usage: qrun [option(s)]... [-] [program file] [arguments]

Each parse option is also a command line switch.  These switches restrict
what the program may do; programs cannot lift them once set.
"#;

/// Informational output selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoPage {
    Help,
    ParseOptionHelp,
    ListWarnings,
    ListParseOptions,
    ShowCharsets,
    ShowAliases,
    BuildOptions,
    ModuleDir,
    UserModuleDir,
    ModulePath,
    ModuleApis,
    LatestModuleApi,
    Version,
    ShortVersion,
}

impl InfoPage {
    pub fn render<W: Write>(self, env: &Environment, out: &mut W) -> io::Result<()> {
        match self {
            InfoPage::Help => write!(out, "{}", USAGE),
            InfoPage::ParseOptionHelp => {
                write!(out, "{}\n", PARSE_OPTION_USAGE_HEADER)?;
                let width = catalog::parse_options().map(|(name, _)| name.len()).max().unwrap_or(0) + 2;
                for (name, flag) in catalog::parse_options() {
                    writeln!(out, "      --{:width$}  {}", name, flag.description(), width = width)?;
                }
                Ok(())
            }
            InfoPage::ListWarnings => {
                writeln!(out, "recognized warnings:")?;
                for name in Warnings::all().names() {
                    writeln!(out, "   {}", name)?;
                }
                Ok(())
            }
            InfoPage::ListParseOptions => {
                writeln!(out, "recognized parse options:")?;
                for (name, _) in catalog::parse_options() {
                    writeln!(out, "   {}", name)?;
                }
                Ok(())
            }
            InfoPage::ShowCharsets => {
                writeln!(out, "known character encodings:")?;
                for cs in CHARSETS {
                    writeln!(out, "   {:14} {}", cs.name, cs.description)?;
                }
                Ok(())
            }
            InfoPage::ShowAliases => {
                writeln!(out, "character encoding aliases:")?;
                for cs in CHARSETS {
                    for alias in cs.aliases {
                        writeln!(out, "   {:14} = {}", alias, cs.name)?;
                    }
                }
                Ok(())
            }
            InfoPage::BuildOptions => {
                writeln!(out, "version:   {}", env!("CARGO_PKG_VERSION"))?;
                writeln!(out, "target:    {}-{}", std::env::consts::ARCH, std::env::consts::OS)?;
                let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
                writeln!(out, "profile:   {}", profile)?;
                writeln!(out, "module-dir: {}", env.module_dir.display())?;
                let (major, minor) = config::latest_module_api();
                writeln!(out, "module-api: {}.{}", major, minor)
            }
            InfoPage::ModuleDir => writeln!(out, "{}", env.module_dir.display()),
            InfoPage::UserModuleDir => writeln!(out, "{}", env.user_module_dir.display()),
            InfoPage::ModulePath => {
                let path = std::env::join_paths(env.search_path())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                writeln!(out, "{}", path.to_string_lossy())
            }
            InfoPage::ModuleApis => {
                let apis: Vec<String> = MODULE_APIS
                    .iter()
                    .map(|(major, minor)| format!("{}.{}", major, minor))
                    .collect();
                writeln!(out, "{}", apis.join(", "))
            }
            InfoPage::LatestModuleApi => {
                let (major, minor) = config::latest_module_api();
                writeln!(out, "{}.{}", major, minor)
            }
            InfoPage::Version => {
                writeln!(out, "qrun version {}", env!("CARGO_PKG_VERSION"))?;
                writeln!(
                    out,
                    "module API {} on {}-{}",
                    MODULE_APIS
                        .last()
                        .map_or_else(String::new, |(a, b)| format!("{}.{}", a, b)),
                    std::env::consts::ARCH,
                    std::env::consts::OS
                )?;
                writeln!(out, "module directory: {}", env.module_dir.display())
            }
            InfoPage::ShortVersion => writeln!(out, "{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
