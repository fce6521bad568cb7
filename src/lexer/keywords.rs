//! Keyword-group classification (§4.2 "Keyword classification").
//!
//! Each named keyword group has an `enabled` flag and a `case_sensitive`
//! flag. On identifier lookup the lexer searches every enabled group; a
//! match returns a token carrying that group's id and the index of the word
//! within the group.

/// The named keyword groups from §4.2. `Locals` is the 128-entry
/// single-letter local-variable group, handled specially since its
/// membership changes with the enclosing routine rather than being a fixed
/// word list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordGroupId {
    Directives,
    DirectiveKeywords,
    Statements,
    Conditions,
    SystemFunctions,
    SystemConstants,
    OpcodeNames,
    SegmentMarkers,
    TraceKeywords,
    MiscKeywords,
    OpcodeMacros,
}

pub const ALL_GROUPS: &[KeywordGroupId] = &[
    KeywordGroupId::Directives,
    KeywordGroupId::DirectiveKeywords,
    KeywordGroupId::Statements,
    KeywordGroupId::Conditions,
    KeywordGroupId::SystemFunctions,
    KeywordGroupId::SystemConstants,
    KeywordGroupId::OpcodeNames,
    KeywordGroupId::SegmentMarkers,
    KeywordGroupId::TraceKeywords,
    KeywordGroupId::MiscKeywords,
    KeywordGroupId::OpcodeMacros,
];

/// A fixed word list plus the two flags from §4.2.
#[derive(Debug, Clone)]
pub struct KeywordGroup {
    pub id: KeywordGroupId,
    pub enabled: bool,
    pub case_sensitive: bool,
    pub words: &'static [&'static str],
}

impl KeywordGroup {
    fn matches(&self, text: &str) -> Option<usize> {
        if !self.enabled {
            return None;
        }
        self.words.iter().position(|w| {
            if self.case_sensitive {
                *w == text
            } else {
                w.eq_ignore_ascii_case(text)
            }
        })
    }
}

fn directives() -> &'static [&'static str] {
    &[
        "array",
        "attribute",
        "class",
        "constant",
        "default",
        "dictionary",
        "end",
        "endif",
        "extend",
        "fake_action",
        "global",
        "ifdef",
        "iffalse",
        "ifndef",
        "ifnot",
        "iftrue",
        "ifv3",
        "ifv5",
        "import",
        "include",
        "link",
        "lowstring",
        "message",
        "module",
        "nearby",
        "object",
        "property",
        "release",
        "replace",
        "serial",
        "statusline",
        "stub",
        "switches",
        "system_file",
        "trace",
        "undef",
        "verb",
        "version",
        "zcharacter",
        "routine",
    ]
}

fn directive_keywords() -> &'static [&'static str] {
    &[
        "additive", "alias", "buffer", "class", "creature", "data", "error", "first", "has",
        "held", "initial", "initstr", "invent", "length", "long", "meta", "multi", "multiexcept",
        "multiheld", "multiinside", "name", "noun", "number", "only", "parse_name", "private",
        "replace", "reverse", "scope", "score", "special", "string", "table", "terminating",
        "time", "topic", "with",
    ]
}

fn statements() -> &'static [&'static str] {
    &[
        "box", "break", "continue", "default", "do", "else", "font", "for", "give", "if",
        "inversion", "jump", "move", "new_line", "objectloop", "print", "print_ret", "quit",
        "read", "remove", "restore", "return", "rfalse", "rtrue", "save", "spaces", "string",
        "style", "switch", "until", "while",
    ]
}

fn conditions() -> &'static [&'static str] {
    &["has", "hasnt", "in", "notin", "ofclass", "or", "provides"]
}

fn system_functions() -> &'static [&'static str] {
    &[
        "child", "children", "elder", "eldest", "glk", "indirect", "metaclass", "parent",
        "random", "sibling", "younger", "youngest", "zregion",
    ]
}

fn system_constants() -> &'static [&'static str] {
    &[
        "adjectives_table",
        "actions_table",
        "classes_table",
        "identifiers_table",
        "preactions_table",
        "version_number",
        "largest_object",
        "strings_offset",
        "code_offset",
        "dict_par1",
        "dict_par2",
        "dict_par3",
        "dictionary_table",
        "grammar_table",
    ]
}

fn opcode_names() -> &'static [&'static str] {
    &[
        "add", "and", "call", "dec", "div", "inc", "je", "jg", "jl", "jump", "jz", "load",
        "mod", "mul", "nop", "not", "or", "print", "pull", "push", "put_prop", "quit", "random",
        "read", "rfalse", "rtrue", "ret", "sub", "store", "test", "test_attr",
    ]
}

fn segment_markers() -> &'static [&'static str] {
    &["and", "body", "endif", "from", "has", "to"]
}

fn trace_keywords() -> &'static [&'static str] {
    &[
        "assembly",
        "dictionary",
        "expr",
        "linker",
        "off",
        "on",
        "symbols",
        "tokens",
        "verbs",
    ]
}

fn misc_keywords() -> &'static [&'static str] {
    &["false", "nothing", "true"]
}

fn opcode_macros() -> &'static [&'static str] {
    &["box_stat_line", "display_status_line", "print_num", "read_increase_widechar"]
}

/// Build the default keyword-group table, all enabled, none case-sensitive
/// except none require it by default (matching §4.2: directives and most
/// groups are case-insensitive identifiers).
pub fn default_groups() -> Vec<KeywordGroup> {
    vec![
        KeywordGroup {
            id: KeywordGroupId::Directives,
            enabled: true,
            case_sensitive: false,
            words: directives(),
        },
        KeywordGroup {
            id: KeywordGroupId::DirectiveKeywords,
            enabled: true,
            case_sensitive: false,
            words: directive_keywords(),
        },
        KeywordGroup {
            id: KeywordGroupId::Statements,
            enabled: true,
            case_sensitive: false,
            words: statements(),
        },
        KeywordGroup {
            id: KeywordGroupId::Conditions,
            enabled: true,
            case_sensitive: false,
            words: conditions(),
        },
        KeywordGroup {
            id: KeywordGroupId::SystemFunctions,
            enabled: true,
            case_sensitive: false,
            words: system_functions(),
        },
        KeywordGroup {
            id: KeywordGroupId::SystemConstants,
            enabled: true,
            case_sensitive: false,
            words: system_constants(),
        },
        KeywordGroup {
            id: KeywordGroupId::OpcodeNames,
            enabled: false,
            case_sensitive: false,
            words: opcode_names(),
        },
        KeywordGroup {
            id: KeywordGroupId::SegmentMarkers,
            enabled: true,
            case_sensitive: false,
            words: segment_markers(),
        },
        KeywordGroup {
            id: KeywordGroupId::TraceKeywords,
            enabled: false,
            case_sensitive: false,
            words: trace_keywords(),
        },
        KeywordGroup {
            id: KeywordGroupId::MiscKeywords,
            enabled: true,
            case_sensitive: false,
            words: misc_keywords(),
        },
        KeywordGroup {
            id: KeywordGroupId::OpcodeMacros,
            enabled: false,
            case_sensitive: false,
            words: opcode_macros(),
        },
    ]
}

/// The result of a successful keyword-group match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordMatch {
    pub group: KeywordGroupId,
    pub index: usize,
}

/// Table of keyword groups plus the two context-mode bits from §4.2,
/// together forming the "lexical context" whose snapshot is an integer
/// (here, a plain `u32` bitset built by [`KeywordTable::context_snapshot`]).
#[derive(Debug, Clone)]
pub struct KeywordTable {
    groups: Vec<KeywordGroup>,
    pub dont_enter_into_symbol_table: bool,
    pub return_sp_as_variable: bool,
    /// When `Some`, only the `Locals` special-case 128-entry table should be
    /// searched (not modelled as a word list; see `lexer::mod` local
    /// resolution), matching the "directive-only" mode value of
    /// `dont_enter_into_symbol_table`.
    pub directive_only: bool,
}

impl KeywordTable {
    pub fn new() -> Self {
        KeywordTable {
            groups: default_groups(),
            dont_enter_into_symbol_table: false,
            return_sp_as_variable: false,
            directive_only: false,
        }
    }

    pub fn set_enabled(&mut self, id: KeywordGroupId, enabled: bool) {
        if let Some(g) = self.groups.iter_mut().find(|g| g.id == id) {
            g.enabled = enabled;
        }
    }

    pub fn is_enabled(&self, id: KeywordGroupId) -> bool {
        self.groups.iter().find(|g| g.id == id).is_some_and(|g| g.enabled)
    }

    /// Search every enabled group for `text`, returning the first match.
    /// Groups are searched in declaration order, matching the source's
    /// single combined hash search (the effect of which is "first matching
    /// enabled group wins", since no two default groups overlap).
    pub fn classify(&self, text: &str) -> Option<KeywordMatch> {
        if self.directive_only {
            return self
                .groups
                .iter()
                .find(|g| g.id == KeywordGroupId::Directives)
                .and_then(|g| g.matches(text))
                .map(|index| KeywordMatch {
                    group: KeywordGroupId::Directives,
                    index,
                });
        }
        for group in &self.groups {
            if let Some(index) = group.matches(text) {
                return Some(KeywordMatch {
                    group: group.id,
                    index,
                });
            }
        }
        None
    }

    /// A snapshot of every enabled bit plus the two mode bits, packed into a
    /// single integer so it can be compared cheaply (§4.2 "Lexical
    /// context").
    pub fn context_snapshot(&self) -> u32 {
        let mut bits = 0u32;
        for (i, group) in self.groups.iter().enumerate() {
            if group.enabled {
                bits |= 1 << i;
            }
        }
        if self.dont_enter_into_symbol_table {
            bits |= 1 << 29;
        }
        if self.return_sp_as_variable {
            bits |= 1 << 30;
        }
        if self.directive_only {
            bits |= 1 << 31;
        }
        bits
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        KeywordTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_case_insensitive_by_default() {
        let table = KeywordTable::new();
        assert_eq!(
            table.classify("Global"),
            table.classify("GLOBAL")
        );
        assert!(table.classify("global").is_some());
    }

    #[test]
    fn disabling_a_group_hides_its_words() {
        let mut table = KeywordTable::new();
        assert!(table.classify("add").is_none());
        table.set_enabled(KeywordGroupId::OpcodeNames, true);
        assert!(table.classify("add").is_some());
    }

    #[test]
    fn directive_only_mode_ignores_other_groups() {
        let mut table = KeywordTable::new();
        table.directive_only = true;
        assert!(table.classify("if").is_none());
        assert!(table.classify("global").is_some());
    }

    #[test]
    fn context_snapshot_changes_when_a_group_toggles() {
        let mut table = KeywordTable::new();
        let before = table.context_snapshot();
        table.set_enabled(KeywordGroupId::OpcodeNames, true);
        assert_ne!(before, table.context_snapshot());
    }
}
