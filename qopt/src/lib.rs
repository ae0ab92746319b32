//! Table-driven command-line option scanner.
//!
//! getopt-style scanning for a single program's command line:
//! - clustered short options (`-abc`, `-ovalue`, `-o value`, `-x=value`)
//! - long options (`--name=value`, `--name:value`, `--name value`)
//! - options without, with mandatory, or with optional arguments
//!
//! The option table is fixed at compile time. Each descriptor carries an
//! action value of the caller's choosing; the scanner hands the descriptor
//! and its argument to a [`Dispatch`] implementation, which interprets the
//! action. Syntax errors are collected as [`Diagnostic`]s so a whole command
//! line can be reported at once; an error returned by the dispatcher stops
//! the scan immediately.

use tracing::{debug, trace};

// ============================================================================
// Result and Error types
// ============================================================================

pub type Result<T> = std::result::Result<T, Error>;

/// Inconsistencies in an option table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("option table has an entry without a long name")]
    EmptyLongName,

    #[error("long option --{0} appears more than once in the option table")]
    DuplicateLong(&'static str),

    #[error("short option -{0} appears more than once in the option table")]
    DuplicateShort(char),
}

/// A recoverable problem found while scanning the command line.
///
/// Diagnostics do not stop the scan; the caller decides what to do with them
/// once the scan is complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("invalid option -- '{0}'")]
    UnknownShort(char),

    #[error("unrecognized option '--{0}'")]
    UnknownLong(String),

    #[error("option requires an argument -- '{0}'")]
    MissingShortArgument(char),

    #[error("option '--{0}' requires an argument")]
    MissingLongArgument(String),

    #[error("option '--{0}' doesn't allow an argument")]
    UnwantedArgument(String),
}

// ============================================================================
// Arity
// ============================================================================

/// Whether an option takes no argument, a mandatory one, or an optional one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    Mandatory,
    /// The argument is only taken when attached with an assignment
    /// character (`-x=NAME`, `--opt=NAME`).
    Optional,
}

/// Characters that attach an inline value to an option.
pub fn is_assignment(c: char) -> bool {
    c == '=' || c == ':'
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

// ============================================================================
// Opt — option descriptor
// ============================================================================

/// One entry of an option table.
#[derive(Debug, Clone)]
pub struct Opt<A> {
    long_name: &'static str,
    short_name: Option<char>,
    arity: Arity,
    action: A,
}

impl<A> Opt<A> {
    /// A long option taking no argument.
    pub const fn new(long_name: &'static str, action: A) -> Self {
        Opt {
            long_name,
            short_name: None,
            arity: Arity::None,
            action,
        }
    }

    pub const fn short(mut self, c: char) -> Self {
        self.short_name = Some(c);
        self
    }

    pub const fn mandatory(mut self) -> Self {
        self.arity = Arity::Mandatory;
        self
    }

    pub const fn optional(mut self) -> Self {
        self.arity = Arity::Optional;
        self
    }

    pub fn long_name(&self) -> &'static str {
        self.long_name
    }

    pub fn short_name(&self) -> Option<char> {
        self.short_name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn action(&self) -> &A {
        &self.action
    }
}

// ============================================================================
// OptionTable
// ============================================================================

/// A borrowed, fixed set of option descriptors.
///
/// Lookups are linear scans; tables are small and never change after
/// construction.
pub struct OptionTable<'t, A> {
    entries: &'t [Opt<A>],
}

impl<A> Clone for OptionTable<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for OptionTable<'_, A> {}

impl<'t, A> OptionTable<'t, A> {
    pub const fn new(entries: &'t [Opt<A>]) -> Self {
        OptionTable { entries }
    }

    /// Checks that long names are present and unique and that short names,
    /// where given, are unique.
    pub fn validate(&self) -> Result<()> {
        for (i, opt) in self.entries.iter().enumerate() {
            if opt.long_name.is_empty() {
                return Err(Error::EmptyLongName);
            }
            let earlier = &self.entries[..i];
            if earlier.iter().any(|o| o.long_name == opt.long_name) {
                return Err(Error::DuplicateLong(opt.long_name));
            }
            if let Some(c) = opt.short_name {
                if earlier.iter().any(|o| o.short_name == Some(c)) {
                    return Err(Error::DuplicateShort(c));
                }
            }
        }
        Ok(())
    }

    pub fn find_short(&self, c: char) -> Option<&'t Opt<A>> {
        self.entries.iter().find(|opt| opt.short_name == Some(c))
    }

    /// Exact, case-sensitive match. Abbreviations are not accepted.
    pub fn find_long(&self, name: &str) -> Option<&'t Opt<A>> {
        self.entries.iter().find(|opt| opt.long_name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'t, Opt<A>> {
        self.entries.iter()
    }
}

// ============================================================================
// ArgCursor — position within argv
// ============================================================================

/// A read-only cursor over an argument vector: a slot index plus a byte
/// offset within that slot.
#[derive(Debug)]
pub struct ArgCursor<'a, S> {
    args: &'a [S],
    index: usize,
    pos: usize,
}

impl<'a, S: AsRef<str>> ArgCursor<'a, S> {
    pub fn new(args: &'a [S], index: usize) -> Self {
        ArgCursor {
            args,
            index: index.min(args.len()),
            pos: 0,
        }
    }

    /// Index of the current slot; equals `args.len()` once exhausted.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.args.len()
    }

    /// The whole current slot.
    pub fn current(&self) -> Option<&'a str> {
        self.args.get(self.index).map(AsRef::as_ref)
    }

    /// The unread remainder of the current slot.
    pub fn rest(&self) -> &'a str {
        match self.current() {
            Some(slot) => &slot[self.pos.min(slot.len())..],
            None => "",
        }
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consumes one character of the current slot.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes `len` bytes of the current slot. `len` must end on a
    /// character boundary.
    pub(crate) fn skip(&mut self, len: usize) {
        self.pos += len;
    }

    /// Consumes and returns the remainder of the current slot.
    pub fn take_rest(&mut self) -> &'a str {
        let rest = self.rest();
        self.pos += rest.len();
        rest
    }

    /// Moves to the start of the next slot.
    pub fn next_slot(&mut self) {
        if self.index < self.args.len() {
            self.index += 1;
        }
        self.pos = 0;
    }

    /// Fetches an option argument.
    ///
    /// One leading assignment character is skipped. If nothing is left in
    /// the current slot, the whole next slot is the argument. Returns `None`
    /// when argv runs out. Either way the argument's slot is fully consumed.
    pub fn fetch_argument(&mut self) -> Option<&'a str> {
        if self.peek().is_some_and(is_assignment) {
            self.advance();
        }
        if self.peek().is_none() {
            self.next_slot();
            if self.is_exhausted() {
                trace!("argument fetch ran past the end of argv");
                return None;
            }
        }
        let arg = self.take_rest();
        trace!(index = self.index, arg, "fetched argument");
        Some(arg)
    }
}

// ============================================================================
// Dispatch — interpretation of option actions
// ============================================================================

/// Receives every recognised option in command-line order.
pub trait Dispatch<A> {
    /// Error that stops the scan at once.
    type Error;

    fn dispatch(
        &mut self,
        opt: &Opt<A>,
        arg: Option<&str>,
    ) -> std::result::Result<(), Self::Error>;
}

// ============================================================================
// Scan results
// ============================================================================

/// Why the scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// A lone `-`: the program is read from standard input.
    Stdin,
    /// A lone `--`: everything after it is positional.
    DoubleDash,
    /// The first token not starting with `-`; it is not consumed.
    Positional,
    /// argv ran out.
    End,
}

/// Outcome of a completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    pub stop: Stop,
    /// Index of the first argv slot the scanner did not consume.
    pub rest: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl Scan {
    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }
}

/// A scan cut short by the dispatcher.
#[derive(Debug)]
pub struct Abort<E> {
    pub error: E,
    /// Diagnostics collected before the abort, in order.
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Scanner
// ============================================================================

/// Returned by the short option scanner: whether the rest of the current
/// slot still holds option letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Scanner<'t, 'd, A, D> {
    table: OptionTable<'t, A>,
    dispatcher: &'d mut D,
    diagnostics: Vec<Diagnostic>,
}

impl<A, D: Dispatch<A>> Scanner<'_, '_, A, D> {
    fn report(&mut self, diagnostic: Diagnostic) {
        debug!(%diagnostic, "scan error");
        self.diagnostics.push(diagnostic);
    }

    fn dispatch(&mut self, opt: &Opt<A>, arg: Option<&str>) -> std::result::Result<(), D::Error> {
        debug!(option = opt.long_name, arg, "dispatching option");
        self.dispatcher.dispatch(opt, arg)
    }

    /// Scans one letter of a short option cluster. The letter has already
    /// been consumed.
    fn short_option<S: AsRef<str>>(
        &mut self,
        c: char,
        cursor: &mut ArgCursor<'_, S>,
    ) -> std::result::Result<Flow, D::Error> {
        let table = self.table;
        let opt = match table.find_short(c) {
            Some(opt) => opt,
            None => {
                self.report(Diagnostic::UnknownShort(c));
                return Ok(Flow::Continue);
            }
        };

        let wants_arg = match opt.arity {
            Arity::None => false,
            Arity::Mandatory => true,
            Arity::Optional => cursor.peek().is_some_and(is_assignment),
        };
        if !wants_arg {
            self.dispatch(opt, None)?;
            return Ok(Flow::Continue);
        }

        match cursor.fetch_argument() {
            Some(arg) => self.dispatch(opt, Some(arg))?,
            None => self.report(Diagnostic::MissingShortArgument(c)),
        }
        Ok(Flow::Stop)
    }

    /// Scans a cluster of short options; the cursor is just past the `-`.
    fn short_cluster<S: AsRef<str>>(
        &mut self,
        cursor: &mut ArgCursor<'_, S>,
    ) -> std::result::Result<(), D::Error> {
        while let Some(c) = cursor.advance() {
            if is_blank(c) {
                // A long option glued on after a blank, as in "-r --foo"
                // passed as one argument.
                while cursor.peek().is_some_and(is_blank) {
                    cursor.advance();
                }
                if cursor.peek() == Some('-') {
                    cursor.advance();
                    if cursor.peek() == Some('-') {
                        cursor.advance();
                    }
                    return self.long_option(cursor);
                }
                continue;
            }
            if self.short_option(c, cursor)? == Flow::Stop {
                break;
            }
        }
        Ok(())
    }

    /// Scans a long option; the cursor is just past the `--`.
    fn long_option<S: AsRef<str>>(
        &mut self,
        cursor: &mut ArgCursor<'_, S>,
    ) -> std::result::Result<(), D::Error> {
        let text = cursor.rest();
        let (name, inline) = match text.find(is_assignment) {
            Some(p) => (&text[..p], true),
            None => (text, false),
        };
        cursor.skip(name.len());

        let table = self.table;
        let opt = match table.find_long(name) {
            Some(opt) => opt,
            None => {
                self.report(Diagnostic::UnknownLong(name.to_string()));
                return Ok(());
            }
        };

        match opt.arity {
            Arity::None => {
                if inline {
                    self.report(Diagnostic::UnwantedArgument(name.to_string()));
                } else {
                    self.dispatch(opt, None)?;
                }
            }
            Arity::Optional => {
                // Without an inline value the next slot is left alone.
                let arg = if inline { cursor.fetch_argument() } else { None };
                self.dispatch(opt, arg)?;
            }
            Arity::Mandatory => match cursor.fetch_argument() {
                Some(arg) => self.dispatch(opt, Some(arg))?,
                None => self.report(Diagnostic::MissingLongArgument(name.to_string())),
            },
        }
        Ok(())
    }

    /// Runs the scan, returning why it stopped and the first untouched slot.
    fn run<S: AsRef<str>>(
        &mut self,
        argv: &[S],
    ) -> std::result::Result<(Stop, usize), D::Error> {
        let mut cursor = ArgCursor::new(argv, 1);
        let stop = loop {
            let Some(token) = cursor.current() else {
                break Stop::End;
            };
            trace!(index = cursor.index(), token, "scanning argument");
            if token == "-" {
                cursor.next_slot();
                break Stop::Stdin;
            }
            if let Some(long) = token.strip_prefix("--") {
                if long.is_empty() {
                    cursor.next_slot();
                    break Stop::DoubleDash;
                }
                cursor.skip(2);
                self.long_option(&mut cursor)?;
                cursor.next_slot();
                continue;
            }
            if token.starts_with('-') {
                cursor.skip(1);
                self.short_cluster(&mut cursor)?;
                cursor.next_slot();
                continue;
            }
            break Stop::Positional;
        };
        Ok((stop, cursor.index()))
    }
}

/// Scans `argv` (whose first element is the program name) against `table`.
///
/// Scanning stops at a lone `-`, a lone `--`, the first token that does not
/// start with `-`, or the end of argv. Every recognised option is passed to
/// `dispatcher` in order; if it returns an error the scan is abandoned.
pub fn scan<A, D, S>(
    table: OptionTable<'_, A>,
    argv: &[S],
    dispatcher: &mut D,
) -> std::result::Result<Scan, Abort<D::Error>>
where
    D: Dispatch<A>,
    S: AsRef<str>,
{
    let mut scanner = Scanner {
        table,
        dispatcher,
        diagnostics: Vec::new(),
    };
    match scanner.run(argv) {
        Ok((stop, rest)) => Ok(Scan {
            stop,
            rest,
            diagnostics: scanner.diagnostics,
        }),
        Err(error) => Err(Abort {
            error,
            diagnostics: scanner.diagnostics,
        }),
    }
}
