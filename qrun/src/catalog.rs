//! Named parse options, warnings and character encodings known to the
//! command line.

use std::fmt;

use bitflags::bitflags;

// ===========================================================================
// Parse options
// ===========================================================================

bitflags! {
    /// Bitmask of parse options restricting what a program may do.
    ///
    /// Each flag is also a command line switch: `NO_GLOBAL_VARS` is
    /// `--no-global-vars`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParseOptions: u64 {
        const NO_GLOBAL_VARS = 1 << 0;
        const NO_SUBROUTINE_DEFS = 1 << 1;
        const NO_THREAD_CONTROL = 1 << 2;
        const NO_THREAD_CLASSES = 1 << 3;
        const NO_TOP_LEVEL = 1 << 4;
        const NO_CLASS_DEFS = 1 << 5;
        const NO_NAMESPACE_DEFS = 1 << 6;
        const NO_CONSTANT_DEFS = 1 << 7;
        const NO_NEW = 1 << 8;
        const NO_CHILD_RESTRICTIONS = 1 << 9;
        const NO_EXTERNAL_PROCESS = 1 << 10;
        const REQUIRE_OUR = 1 << 11;
        const NO_PROCESS_CONTROL = 1 << 12;
        const NO_NETWORK = 1 << 13;
        const NO_FILESYSTEM = 1 << 14;
        const LOCK_WARNINGS = 1 << 15;
        const NO_DATABASE = 1 << 16;
        const NO_GUI = 1 << 17;
        const NO_TERMINAL_IO = 1 << 18;
        const REQUIRE_TYPES = 1 << 19;
        const REQUIRE_PROTOTYPES = 1 << 20;
        const NO_EXTERNAL_INFO = 1 << 32;
        const NO_THREAD_INFO = 1 << 33;
        const NO_LOCALE_CONTROL = 1 << 34;
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions::empty()
    }
}

static DESCRIPTIONS: &[(ParseOptions, &str)] = &[
    (ParseOptions::NO_GLOBAL_VARS, "make global variable definitions illegal"),
    (ParseOptions::NO_SUBROUTINE_DEFS, "make subroutine definitions illegal"),
    (ParseOptions::NO_THREAD_CONTROL, "make thread control operations illegal"),
    (ParseOptions::NO_THREAD_CLASSES, "disallow access to thread classes"),
    (ParseOptions::NO_TOP_LEVEL, "make top-level statements illegal"),
    (ParseOptions::NO_CLASS_DEFS, "make class definitions illegal"),
    (ParseOptions::NO_NAMESPACE_DEFS, "make namespace declarations illegal"),
    (ParseOptions::NO_CONSTANT_DEFS, "make constant definitions illegal"),
    (ParseOptions::NO_NEW, "make the 'new' operator illegal"),
    (ParseOptions::NO_CHILD_RESTRICTIONS, "do not restrict subprograms' parse options"),
    (ParseOptions::NO_EXTERNAL_PROCESS, "make access to external processes illegal"),
    (ParseOptions::REQUIRE_OUR, "require global variables to be declared with 'our'"),
    (ParseOptions::NO_PROCESS_CONTROL, "make process control illegal (fork(), exit(), etc)"),
    (ParseOptions::NO_NETWORK, "disallow network access"),
    (ParseOptions::NO_FILESYSTEM, "disallow access to the local filesystem"),
    (ParseOptions::LOCK_WARNINGS, "do not allow programs to change the warning mask"),
    (ParseOptions::NO_DATABASE, "disallow access to database functionality"),
    (ParseOptions::NO_GUI, "disallow functionality that draws graphics to the display"),
    (ParseOptions::NO_TERMINAL_IO, "disallow access to the terminal"),
    (ParseOptions::REQUIRE_TYPES, "require type declarations for all parameters and variables"),
    (ParseOptions::REQUIRE_PROTOTYPES, "require return and parameter types in declarations"),
    (ParseOptions::NO_EXTERNAL_INFO, "disallow access to information about the host system"),
    (ParseOptions::NO_THREAD_INFO, "disallow access to thread information"),
    (ParseOptions::NO_LOCALE_CONTROL, "disallow changes to locale settings (time zone, charset)"),
];

impl ParseOptions {
    /// Switch names of the set options, in declaration order.
    pub fn names(self) -> impl Iterator<Item = String> {
        self.iter_names().map(|(name, _)| switch_name(name))
    }

    /// One-line help for a single option.
    pub fn description(self) -> &'static str {
        DESCRIPTIONS
            .iter()
            .find(|(flag, _)| *flag == self)
            .map_or("", |(_, text)| text)
    }
}

/// Every parse option with its switch name, in declaration order.
pub fn parse_options() -> impl Iterator<Item = (String, ParseOptions)> {
    ParseOptions::all()
        .iter_names()
        .map(|(name, flag)| (switch_name(name), flag))
}

pub fn find_parse_option(name: &str) -> Option<ParseOptions> {
    ParseOptions::from_name(&flag_name(name)?)
}

// ===========================================================================
// Warnings
// ===========================================================================

bitflags! {
    /// Bitmask of enabled warnings. `Warnings::ALL` (-1) enables every
    /// warning, including ones added later.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Warnings: i32 {
        const WARNING_MASK_UNCHANGED = 1 << 0;
        const UNKNOWN_WARNING = 1 << 1;
        const UNDECLARED_VARIABLE = 1 << 2;
        const DUPLICATE_LOCAL_VARS = 1 << 3;
        const UNREACHABLE_CODE = 1 << 4;
        const NONEXISTENT_METHOD_CALL = 1 << 5;
        const INVALID_OPERATION = 1 << 6;
        const CALL_WITH_TYPE_ERRORS = 1 << 7;
        const RETURN_VALUE_IGNORED = 1 << 8;
        const DEPRECATED = 1 << 9;
        const EXCESS_ARGS = 1 << 10;
        const DUPLICATE_GLOBAL_VARS = 1 << 11;
        const UNREFERENCED_VARIABLE = 1 << 12;
        const DUPLICATE_BLOCK_VARS = 1 << 13;
        const MODULE_ONLY = 1 << 14;
        const BROKEN_LOGICAL_PRECEDENCE = 1 << 15;
        const INVALID_CATCH = 1 << 16;
        const DUPLICATE_HASH_KEY = 1 << 17;
    }
}

impl Warnings {
    pub const ALL: Warnings = Warnings::from_bits_retain(-1);

    /// Switch names of the known warnings that are set.
    pub fn names(self) -> impl Iterator<Item = String> {
        self.iter_names().map(|(name, _)| switch_name(name))
    }
}

impl Default for Warnings {
    fn default() -> Self {
        Warnings::empty()
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Warnings::ALL {
            write!(f, "all")
        } else {
            write!(f, "{:#x}", self.bits())
        }
    }
}

pub fn find_warning(name: &str) -> Option<Warnings> {
    Warnings::from_name(&flag_name(name)?)
}

/// `NO_GLOBAL_VARS` becomes `no-global-vars`.
fn switch_name(flag: &str) -> String {
    flag.to_ascii_lowercase().replace('_', "-")
}

/// Inverse of `switch_name`; only lower case, dash separated names map
/// to a flag.
fn flag_name(switch: &str) -> Option<String> {
    if switch.bytes().any(|b| b.is_ascii_uppercase() || b == b'_') {
        return None;
    }
    Some(switch.to_ascii_uppercase().replace('-', "_"))
}

// ===========================================================================
// Character encodings
// ===========================================================================

#[derive(Debug)]
pub struct Charset {
    pub name: &'static str,
    pub description: &'static str,
    pub aliases: &'static [&'static str],
}

pub static CHARSETS: &[Charset] = &[
    Charset {
        name: "UTF-8",
        description: "variable-width universal encoding",
        aliases: &["UTF8"],
    },
    Charset {
        name: "US-ASCII",
        description: "7-bit ASCII",
        aliases: &["ASCII", "USASCII"],
    },
    Charset {
        name: "ISO-8859-1",
        description: "latin-1, Western European",
        aliases: &["ISO88591", "ISO8859-1", "LATIN1", "LATIN-1"],
    },
    Charset {
        name: "ISO-8859-2",
        description: "latin-2, Central European",
        aliases: &["ISO88592", "ISO8859-2", "LATIN2", "LATIN-2"],
    },
    Charset {
        name: "ISO-8859-5",
        description: "Cyrillic",
        aliases: &["ISO88595", "ISO8859-5"],
    },
    Charset {
        name: "ISO-8859-15",
        description: "latin-9, Western European with euro symbol",
        aliases: &["ISO885915", "ISO8859-15", "LATIN9", "LATIN-9"],
    },
    Charset {
        name: "UTF-16",
        description: "UTF-16 with byte order mark",
        aliases: &["UTF16"],
    },
    Charset {
        name: "UTF-16BE",
        description: "UTF-16 big endian",
        aliases: &["UTF16BE"],
    },
    Charset {
        name: "UTF-16LE",
        description: "UTF-16 little endian",
        aliases: &["UTF16LE"],
    },
    Charset {
        name: "KOI8-R",
        description: "Russian: Kod Obmena Informatsiey, 8 bit",
        aliases: &["KOI8R"],
    },
    Charset {
        name: "KOI8-U",
        description: "Ukrainian: Kod Obmena Informatsiey, 8 bit",
        aliases: &["KOI8U"],
    },
    Charset {
        name: "WINDOWS-1252",
        description: "Windows latin-1",
        aliases: &["CP1252", "WINDOWS1252"],
    },
];

/// Canonical name for an encoding name or alias, ignoring case.
/// Unknown names are returned as given.
pub fn canonical_charset(name: &str) -> String {
    CHARSETS
        .iter()
        .find(|cs| {
            cs.name.eq_ignore_ascii_case(name)
                || cs.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
        .map_or_else(|| name.to_string(), |cs| cs.name.to_string())
}
