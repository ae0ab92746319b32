use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;

use qopt::{Dispatch, Opt, OptionTable, Stop};
use tracing::debug;

use crate::catalog::{self, ParseOptions, Warnings};
use crate::error::{FatalError, Halt};
use crate::usage::InfoPage;

/// License the program declares itself under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum License {
    #[default]
    Gpl,
    Lgpl,
    Mit,
}

/// Boolean settings switched on by an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    DisableSignals,
    ShowModuleErrors,
    WarningsAreErrors,
    OnlyFirstException,
    LockOptions,
}

/// String settings replaced by an option's argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringField {
    Charset,
    ProgramText,
    Eval,
    TimeZone,
}

/// What an option does when it is seen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAction {
    /// Set a fixed parse option bit.
    SetParseOption(ParseOptions),
    /// Set the parse option named by the argument.
    SetParseOptionByName,
    SetFlag(Flag),
    SetString(StringField),
    /// Append the argument to the module load list.
    Load,
    /// Add a `NAME[=VALUE]` parse define.
    Define,
    EnableAllWarnings,
    /// Enable the warning named by the argument.
    EnableWarning,
    /// Run the program as a class, optionally naming the class.
    ExecClass,
    License(License),
    /// Print an informational page and stop.
    Show(InfoPage),
}

use OptionAction as A;

static OPTIONS: &[Opt<OptionAction>] = &[
    Opt::new("show-aliases", A::Show(InfoPage::ShowAliases)).short('a'),
    Opt::new("disable-signals", A::SetFlag(Flag::DisableSignals)).short('b'),
    Opt::new("show-build-options", A::Show(InfoPage::BuildOptions)).short('B'),
    Opt::new("charset", A::SetString(StringField::Charset)).short('c').mandatory(),
    Opt::new("define", A::Define).short('D').mandatory(),
    Opt::new("exec", A::SetString(StringField::ProgramText)).short('e').mandatory(),
    Opt::new("help", A::Show(InfoPage::Help)).short('h'),
    Opt::new("parse-option-help", A::Show(InfoPage::ParseOptionHelp)).short('H'),
    Opt::new("list-warnings", A::Show(InfoPage::ListWarnings)).short('i'),
    Opt::new("load", A::Load).short('l').mandatory(),
    Opt::new("lgpl", A::License(License::Lgpl)).short('G'),
    Opt::new("mit", A::License(License::Mit)).short('T'),
    Opt::new("show-module-errors", A::SetFlag(Flag::ShowModuleErrors)).short('m'),
    Opt::new("module-dir", A::Show(InfoPage::ModuleDir)).short('M'),
    Opt::new("user-module-dir", A::Show(InfoPage::UserModuleDir)),
    Opt::new("module-path", A::Show(InfoPage::ModulePath)),
    Opt::new("module-api", A::Show(InfoPage::ModuleApis)),
    Opt::new("module-apis", A::Show(InfoPage::ModuleApis)),
    Opt::new("latest-module-api", A::Show(InfoPage::LatestModuleApi)),
    Opt::new("list-parse-options", A::Show(InfoPage::ListParseOptions)).short('o'),
    Opt::new("set-parse-option", A::SetParseOptionByName).short('p').mandatory(),
    Opt::new("only-first-exception", A::SetFlag(Flag::OnlyFirstException)),
    Opt::new("warnings-are-errors", A::SetFlag(Flag::WarningsAreErrors)).short('r'),
    Opt::new("show-charsets", A::Show(InfoPage::ShowCharsets)).short('s'),
    Opt::new("version", A::Show(InfoPage::Version)).short('V'),
    Opt::new("short-version", A::Show(InfoPage::ShortVersion)).short('v'),
    Opt::new("enable-all-warnings", A::EnableAllWarnings).short('W'),
    Opt::new("enable-warning", A::EnableWarning).short('w').mandatory(),
    Opt::new("exec-class", A::ExecClass).short('x').optional(),
    Opt::new("eval", A::SetString(StringField::Eval)).short('X').mandatory(),
    Opt::new("time-zone", A::SetString(StringField::TimeZone)).short('z').mandatory(),
    Opt::new("lock-options", A::SetFlag(Flag::LockOptions)).short('K'),
    // parse option switches, documented by --parse-option-help
    Opt::new("no-global-vars", A::SetParseOption(ParseOptions::NO_GLOBAL_VARS)),
    Opt::new("no-subroutine-defs", A::SetParseOption(ParseOptions::NO_SUBROUTINE_DEFS)),
    Opt::new("no-thread-control", A::SetParseOption(ParseOptions::NO_THREAD_CONTROL)),
    Opt::new("no-thread-classes", A::SetParseOption(ParseOptions::NO_THREAD_CLASSES)),
    Opt::new("no-top-level", A::SetParseOption(ParseOptions::NO_TOP_LEVEL)),
    Opt::new("no-class-defs", A::SetParseOption(ParseOptions::NO_CLASS_DEFS)),
    Opt::new("no-namespace-defs", A::SetParseOption(ParseOptions::NO_NAMESPACE_DEFS)),
    Opt::new("no-constant-defs", A::SetParseOption(ParseOptions::NO_CONSTANT_DEFS)),
    Opt::new("no-new", A::SetParseOption(ParseOptions::NO_NEW)),
    Opt::new("no-child-restrictions", A::SetParseOption(ParseOptions::NO_CHILD_RESTRICTIONS)),
    Opt::new("no-external-process", A::SetParseOption(ParseOptions::NO_EXTERNAL_PROCESS)),
    Opt::new("require-our", A::SetParseOption(ParseOptions::REQUIRE_OUR)),
    Opt::new("no-process-control", A::SetParseOption(ParseOptions::NO_PROCESS_CONTROL)),
    Opt::new("no-network", A::SetParseOption(ParseOptions::NO_NETWORK)),
    Opt::new("no-filesystem", A::SetParseOption(ParseOptions::NO_FILESYSTEM)),
    Opt::new("lock-warnings", A::SetParseOption(ParseOptions::LOCK_WARNINGS)),
    Opt::new("no-database", A::SetParseOption(ParseOptions::NO_DATABASE)),
    Opt::new("no-gui", A::SetParseOption(ParseOptions::NO_GUI)),
    Opt::new("no-terminal-io", A::SetParseOption(ParseOptions::NO_TERMINAL_IO)),
    Opt::new("require-types", A::SetParseOption(ParseOptions::REQUIRE_TYPES)),
    Opt::new("require-prototypes", A::SetParseOption(ParseOptions::REQUIRE_PROTOTYPES)),
    Opt::new("no-external-info", A::SetParseOption(ParseOptions::NO_EXTERNAL_INFO)),
    Opt::new("no-thread-info", A::SetParseOption(ParseOptions::NO_THREAD_INFO)),
    Opt::new("no-locale-control", A::SetParseOption(ParseOptions::NO_LOCALE_CONTROL)),
];

pub fn option_table() -> OptionTable<'static, OptionAction> {
    OptionTable::new(OPTIONS)
}

/// Settings collected from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOptions {
    pub parse_options: ParseOptions,
    pub warnings: Warnings,
    /// Modules to load, in command line order.
    pub modules: Vec<String>,
    /// Parse defines; `None` for a define given without a value.
    pub defines: BTreeMap<String, Option<String>>,
    pub license: License,
    pub charset: Option<String>,
    pub exec_class: bool,
    pub exec_class_name: Option<String>,
    /// Program text given with `--exec`.
    pub program_text: Option<String>,
    pub eval: Option<String>,
    pub time_zone: Option<String>,
    pub lock_options: bool,
    pub warnings_are_errors: bool,
    pub show_module_errors: bool,
    pub only_first_exception: bool,
    pub signals_disabled: bool,
}

impl ParsedOptions {
    fn set_flag(&mut self, flag: Flag) {
        let field = match flag {
            Flag::DisableSignals => &mut self.signals_disabled,
            Flag::ShowModuleErrors => &mut self.show_module_errors,
            Flag::WarningsAreErrors => &mut self.warnings_are_errors,
            Flag::OnlyFirstException => &mut self.only_first_exception,
            Flag::LockOptions => &mut self.lock_options,
        };
        *field = true;
    }

    fn set_string(&mut self, field: StringField, value: &str) {
        let value = match field {
            StringField::Charset => catalog::canonical_charset(value),
            _ => value.to_string(),
        };
        let slot = match field {
            StringField::Charset => &mut self.charset,
            StringField::ProgramText => &mut self.program_text,
            StringField::Eval => &mut self.eval,
            StringField::TimeZone => &mut self.time_zone,
        };
        *slot = Some(value);
    }

    fn define(&mut self, arg: &str) -> Result<(), FatalError> {
        let (name, value) = match arg.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (arg, None),
        };
        if name.is_empty() {
            return Err(FatalError::EmptyDefine(arg.to_string()));
        }
        if self.defines.contains_key(name) {
            return Err(FatalError::DuplicateDefine(name.to_string()));
        }
        self.defines.insert(name.to_string(), value);
        Ok(())
    }
}

impl Dispatch<OptionAction> for ParsedOptions {
    type Error = Halt;

    fn dispatch(&mut self, opt: &Opt<OptionAction>, arg: Option<&str>) -> Result<(), Halt> {
        let text = arg.unwrap_or_default();
        match *opt.action() {
            A::SetParseOption(flag) => self.parse_options |= flag,
            A::SetParseOptionByName => match catalog::find_parse_option(text) {
                Some(flag) => self.parse_options |= flag,
                None => return Err(FatalError::UnknownParseOption(text.to_string()).into()),
            },
            A::SetFlag(flag) => self.set_flag(flag),
            A::SetString(field) => self.set_string(field, text),
            A::Load => self.modules.push(text.to_string()),
            A::Define => self.define(text)?,
            A::EnableAllWarnings => self.warnings = Warnings::ALL,
            A::EnableWarning => match catalog::find_warning(text) {
                Some(code) => self.warnings.insert(code),
                None => return Err(FatalError::UnknownWarning(text.to_string()).into()),
            },
            A::ExecClass => {
                self.exec_class = true;
                if let Some(name) = arg {
                    self.exec_class_name = Some(name.to_string());
                }
            }
            A::License(license) => self.license = license,
            A::Show(page) => return Err(Halt::Show(page)),
        }
        Ok(())
    }
}

/// The parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmdline {
    pub options: ParsedOptions,
    /// Program file named by the first positional argument.
    pub program_file: Option<String>,
    /// A lone `-` asked for the program on standard input.
    pub read_stdin: bool,
    /// Arguments handed to the program.
    pub argv: Vec<String>,
}

/// Converts the process arguments to strings. An argument that is not
/// valid UTF-8 cannot be scanned and is a fatal error.
pub fn collect_args<I>(args: I) -> Result<Vec<String>, FatalError>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|bad| FatalError::InvalidEncoding(bad.to_string_lossy().into_owned()))
        })
        .collect()
}

/// Parses `argv` (program name first).
///
/// Command line errors are written to `errors` as they are found; if there
/// were any, `Halt::Usage` is returned once the whole command line has been
/// read. Options that print information or carry an invalid name stop
/// processing at once.
pub fn parse_args<S, W>(argv: &[S], errors: &mut W) -> Result<Cmdline, Halt>
where
    S: AsRef<str>,
    W: Write,
{
    let mut options = ParsedOptions::default();
    let scan = match qopt::scan(option_table(), argv, &mut options) {
        Ok(scan) => scan,
        Err(abort) => {
            report(&abort.diagnostics, errors);
            return Err(abort.error);
        }
    };
    report(&scan.diagnostics, errors);
    if scan.error_count() > 0 {
        return Err(Halt::Usage {
            errors: scan.error_count(),
        });
    }

    let mut rest = scan.rest;
    let mut program_file = None;
    let takes_file = matches!(scan.stop, Stop::Positional | Stop::DoubleDash);
    if takes_file && options.program_text.is_none() {
        if let Some(file) = argv.get(rest) {
            program_file = Some(file.as_ref().to_string());
            rest += 1;
        }
    }
    let argv: Vec<String> = argv
        .iter()
        .skip(rest)
        .map(|a| a.as_ref().to_string())
        .collect();
    debug!(?program_file, ?argv, "command line parsed");

    Ok(Cmdline {
        options,
        program_file,
        read_stdin: scan.stop == Stop::Stdin,
        argv,
    })
}

fn report<W: Write>(diagnostics: &[qopt::Diagnostic], errors: &mut W) {
    for diagnostic in diagnostics {
        let _ = writeln!(errors, "qrun: {}", diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cmdline, Halt> {
        let mut argv = vec!["qrun"];
        argv.extend_from_slice(args);
        parse_args(&argv, &mut std::io::sink())
    }

    fn parse_ok(args: &[&str]) -> Cmdline {
        parse(args).unwrap_or_else(|e| panic!("{:?}: {}", args, e))
    }

    // -- table --

    #[test]
    fn option_table_is_valid() {
        assert_eq!(option_table().validate(), Ok(()));
    }

    #[test]
    fn every_parse_option_has_a_switch() {
        for (name, flag) in catalog::parse_options() {
            let opt = option_table()
                .find_long(&name)
                .unwrap_or_else(|| panic!("no switch for {}", name));
            assert_eq!(*opt.action(), A::SetParseOption(flag));
        }
    }

    #[test]
    fn info_pages_take_no_argument() {
        for opt in option_table().iter() {
            if let A::Show(_) = opt.action() {
                assert_eq!(opt.arity(), qopt::Arity::None, "--{}", opt.long_name());
            }
        }
    }

    // -- examples --

    #[test]
    fn clustered_warning_flags_with_program_text() {
        let cmd = parse_ok(&["-rWe", "print(1);"]);
        assert!(cmd.options.warnings_are_errors);
        assert_eq!(cmd.options.warnings, Warnings::ALL);
        assert_eq!(cmd.options.program_text.as_deref(), Some("print(1);"));
        assert_eq!(cmd.program_file, None);
        assert!(cmd.argv.is_empty());
    }

    #[test]
    fn repeated_load_then_script() {
        let cmd = parse_ok(&["--load=foo", "--load=bar", "script.q"]);
        assert_eq!(cmd.options.modules, vec!["foo", "bar"]);
        assert_eq!(cmd.program_file.as_deref(), Some("script.q"));
    }

    #[test]
    fn load_keeps_duplicates_in_order() {
        let cmd = parse_ok(&["-l", "a", "-lb", "--load", "a", "-l=c"]);
        assert_eq!(cmd.options.modules, vec!["a", "b", "a", "c"]);
    }

    // -- positional handling --

    #[test]
    fn program_text_takes_precedence_over_file() {
        let cmd = parse_ok(&["-e", "print(ARGV);", "one", "two"]);
        assert_eq!(cmd.program_file, None);
        assert_eq!(cmd.argv, vec!["one", "two"]);
    }

    #[test]
    fn arguments_after_script_go_to_program() {
        let cmd = parse_ok(&["-W", "script.q", "-x", "--load=foo"]);
        assert_eq!(cmd.program_file.as_deref(), Some("script.q"));
        assert_eq!(cmd.argv, vec!["-x", "--load=foo"]);
        assert!(!cmd.options.exec_class);
        assert!(cmd.options.modules.is_empty());
    }

    #[test]
    fn double_dash_then_script() {
        let cmd = parse_ok(&["-W", "--", "-script.q", "arg"]);
        assert_eq!(cmd.program_file.as_deref(), Some("-script.q"));
        assert_eq!(cmd.argv, vec!["arg"]);
    }

    #[test]
    fn lone_dash_reads_stdin() {
        let cmd = parse_ok(&["-", "script.q"]);
        assert!(cmd.read_stdin);
        assert_eq!(cmd.program_file, None);
        assert_eq!(cmd.argv, vec!["script.q"]);
    }

    #[test]
    fn no_arguments() {
        let cmd = parse_ok(&[]);
        assert_eq!(cmd.options, ParsedOptions::default());
        assert_eq!(cmd.program_file, None);
        assert!(!cmd.read_stdin);
    }

    // -- settings --

    #[test]
    fn parse_option_switches_and_names_combine() {
        let cmd = parse_ok(&["--no-network", "-p", "no-filesystem", "--set-parse-option=no-locale-control"]);
        let po = cmd.options.parse_options;
        assert!(po.contains(ParseOptions::NO_NETWORK));
        assert!(po.contains(ParseOptions::NO_FILESYSTEM));
        assert!(po.contains(ParseOptions::NO_LOCALE_CONTROL));
        assert!(!po.contains(ParseOptions::NO_GUI));
    }

    #[test]
    fn enable_single_warnings() {
        let cmd = parse_ok(&["-w", "deprecated", "--enable-warning=excess-args"]);
        let w = cmd.options.warnings;
        assert!(w.contains(catalog::find_warning("deprecated").unwrap()));
        assert!(w.contains(catalog::find_warning("excess-args").unwrap()));
        assert!(!w.is_all());
    }

    #[test]
    fn defines_with_and_without_values() {
        let cmd = parse_ok(&["-DDEBUG", "--define=LEVEL=3", "-D", "EMPTY="]);
        let defines = &cmd.options.defines;
        assert_eq!(defines.get("DEBUG"), Some(&None));
        assert_eq!(defines.get("LEVEL"), Some(&Some("3".to_string())));
        assert_eq!(defines.get("EMPTY"), Some(&Some(String::new())));
    }

    #[test]
    fn later_string_options_overwrite() {
        let cmd = parse_ok(&["-z", "UTC", "--time-zone=Europe/Prague", "-clatin1"]);
        assert_eq!(cmd.options.time_zone.as_deref(), Some("Europe/Prague"));
        assert_eq!(cmd.options.charset.as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn exec_class_forms() {
        let bare = parse_ok(&["-x", "Main.q"]);
        assert!(bare.options.exec_class);
        assert_eq!(bare.options.exec_class_name, None);
        assert_eq!(bare.program_file.as_deref(), Some("Main.q"));

        let named = parse_ok(&["--exec-class=App", "-x", "app.q"]);
        assert!(named.options.exec_class);
        assert_eq!(named.options.exec_class_name.as_deref(), Some("App"));

        let short = parse_ok(&["-x:App"]);
        assert_eq!(short.options.exec_class_name.as_deref(), Some("App"));
    }

    #[test]
    fn boolean_switches() {
        let cmd = parse_ok(&["-bmK", "--only-first-exception", "-T"]);
        let o = &cmd.options;
        assert!(o.signals_disabled);
        assert!(o.show_module_errors);
        assert!(o.lock_options);
        assert!(o.only_first_exception);
        assert!(!o.warnings_are_errors);
        assert_eq!(o.license, License::Mit);
    }

    #[test]
    fn license_last_one_wins() {
        assert_eq!(parse_ok(&[]).options.license, License::Gpl);
        assert_eq!(parse_ok(&["--mit", "-G"]).options.license, License::Lgpl);
    }

    #[test]
    fn eval_expression() {
        let cmd = parse_ok(&["-X", "1 + 2"]);
        assert_eq!(cmd.options.eval.as_deref(), Some("1 + 2"));
    }

    // -- errors --

    #[test]
    fn scan_errors_are_all_reported() {
        let mut errors = Vec::new();
        let result = parse_args(
            &["qrun", "--bogus", "-q", "--help=now", "-W", "script.q"],
            &mut errors,
        );
        assert_eq!(result, Err(Halt::Usage { errors: 3 }));
        let errors = String::from_utf8(errors).unwrap();
        assert_eq!(
            errors,
            "qrun: unrecognized option '--bogus'\n\
             qrun: invalid option -- 'q'\n\
             qrun: option '--help' doesn't allow an argument\n"
        );
    }

    #[test]
    fn missing_argument_is_a_usage_error() {
        assert_eq!(parse(&["-W", "--load"]), Err(Halt::Usage { errors: 1 }));
        assert_eq!(parse(&["-l"]), Err(Halt::Usage { errors: 1 }));
    }

    #[test]
    fn unknown_parse_option_is_fatal() {
        let result = parse(&["--set-parse-option=no-such-option", "--bogus"]);
        assert_eq!(
            result,
            Err(Halt::Fatal(FatalError::UnknownParseOption(
                "no-such-option".to_string()
            )))
        );
    }

    #[test]
    fn fatal_error_ignores_error_count() {
        let mut errors = Vec::new();
        let result = parse_args(&["qrun", "--bogus", "-w", "nope"], &mut errors);
        assert_eq!(
            result,
            Err(Halt::Fatal(FatalError::UnknownWarning("nope".to_string())))
        );
        assert_eq!(
            String::from_utf8(errors).unwrap(),
            "qrun: unrecognized option '--bogus'\n"
        );
        assert_eq!(result.unwrap_err().exit_code(), 1);
    }

    #[test]
    fn duplicate_define_is_fatal() {
        assert_eq!(
            parse(&["-DX=1", "-DX=2"]),
            Err(Halt::Fatal(FatalError::DuplicateDefine("X".to_string())))
        );
        assert_eq!(
            parse(&["--define==1"]),
            Err(Halt::Fatal(FatalError::EmptyDefine("=1".to_string())))
        );
    }

    #[test]
    fn empty_exec_class_values() {
        let cmd = parse_ok(&["--exec-class="]);
        assert!(cmd.options.exec_class);
        assert_eq!(cmd.options.exec_class_name, None);

        // the empty inline value reaches for the next slot
        let cmd = parse_ok(&["--exec-class=", "s.q"]);
        assert_eq!(cmd.options.exec_class_name.as_deref(), Some("s.q"));
        assert_eq!(cmd.program_file, None);

        assert_eq!(parse(&["-x="]), Err(Halt::Usage { errors: 1 }));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_argument_is_fatal() {
        use std::os::unix::ffi::OsStringExt;

        let args = vec![
            OsString::from("qrun"),
            OsString::from("-e"),
            OsString::from_vec(vec![0xff, b'x']),
        ];
        assert_eq!(
            collect_args(args),
            Err(FatalError::InvalidEncoding("\u{fffd}x".to_string()))
        );
        let args = vec![OsString::from("qrun"), OsString::from("s.q")];
        assert_eq!(collect_args(args), Ok(vec!["qrun".to_string(), "s.q".to_string()]));
    }

    #[test]
    fn info_options_stop_processing() {
        assert_eq!(parse(&["-W", "-h", "--bogus"]), Err(Halt::Show(InfoPage::Help)));
        assert_eq!(parse(&["-rV"]), Err(Halt::Show(InfoPage::Version)));
        assert_eq!(
            parse(&["--module-apis"]),
            Err(Halt::Show(InfoPage::ModuleApis))
        );
        assert_eq!(Halt::Show(InfoPage::Help).exit_code(), 0);
    }
}
