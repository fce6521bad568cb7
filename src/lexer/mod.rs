//! The Lexer (§4.2): a character pipeline with three-character lookahead
//! that produces [`Token`]s, honoring nested file inclusion, quoted
//! strings, radix literals, and context-sensitive keyword classification.

pub mod float;
pub mod keywords;

use crate::source::{DebugSegments, FileIndex, SourceLocation, SpanCursor};
use crate::symbol::{SymbolFlags, SymbolTable, SymbolType};
use crate::target::Target;

pub use keywords::{KeywordGroupId, KeywordMatch, KeywordTable};

/// The tagged-union token kind (§3 "Token"). Associated data (numeric value,
/// text, symbol index, keyword match) lives alongside on [`Token`] rather
/// than inside each variant, mirroring the source's flat `struct token_data`
/// layout so every lexer call site can match on `kind` and then reach
/// straight for the field it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Symbol,
    Number,
    DqString,
    SqString,
    BareIdentifier,
    Separator,
    Eof,
    Keyword,
}

/// One of the fixed multi-character separators (§4.2). The six
/// "distinguished" classes additionally consume a following identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorKind {
    Plus,
    Minus,
    MinusMinus,
    Arrow,
    DoubleArrow,
    Star,
    Slash,
    Percent,
    Comma,
    Semicolon,
    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    Assign,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    AndAnd,
    OrOr,
    Not,
    Tilde,
    At,
    Hash,
    HashHash,
    HashA,
    HashG,
    HashN,
    HashR,
    HashW,
    Question,
    QuestionTilde,
}

impl SeparatorKind {
    /// Whether this separator consumes a following bare identifier, per the
    /// "distinguished separator classes" rule in §4.2.
    fn consumes_identifier(self) -> bool {
        matches!(
            self,
            SeparatorKind::HashA
                | SeparatorKind::HashG
                | SeparatorKind::HashN
                | SeparatorKind::HashR
                | SeparatorKind::HashW
                | SeparatorKind::HashHash
                | SeparatorKind::Hash
        )
    }
}

/// The separator table, ordered so that every prefix of a longer entry
/// precedes... actually the lookup below tries longest-first regardless of
/// table order, since longest-prefix-wins is the contract (§8: `--> -- -> -`
/// must lex as four separators in that order).
const SEPARATORS: &[(&str, SeparatorKind)] = &[
    ("-->", SeparatorKind::DoubleArrow),
    ("->", SeparatorKind::Arrow),
    ("--", SeparatorKind::MinusMinus),
    ("-", SeparatorKind::Minus),
    ("+", SeparatorKind::Plus),
    ("*", SeparatorKind::Star),
    ("/", SeparatorKind::Slash),
    ("%", SeparatorKind::Percent),
    (",", SeparatorKind::Comma),
    (";", SeparatorKind::Semicolon),
    (":", SeparatorKind::Colon),
    ("(", SeparatorKind::LParen),
    (")", SeparatorKind::RParen),
    ("{", SeparatorKind::LBrace),
    ("}", SeparatorKind::RBrace),
    ("[", SeparatorKind::LBracket),
    ("]", SeparatorKind::RBracket),
    ("..", SeparatorKind::DotDot),
    (".", SeparatorKind::Dot),
    ("==", SeparatorKind::Eq),
    ("=", SeparatorKind::Assign),
    ("~=", SeparatorKind::Ne),
    ("<=", SeparatorKind::Le),
    (">=", SeparatorKind::Ge),
    ("<", SeparatorKind::Lt),
    (">", SeparatorKind::Gt),
    ("&&", SeparatorKind::AndAnd),
    ("||", SeparatorKind::OrOr),
    ("~~", SeparatorKind::Not),
    ("~", SeparatorKind::Tilde),
    ("@", SeparatorKind::At),
    ("?~", SeparatorKind::QuestionTilde),
    ("?", SeparatorKind::Question),
    ("##", SeparatorKind::HashHash),
    ("#a$", SeparatorKind::HashA),
    ("#g$", SeparatorKind::HashG),
    ("#n$", SeparatorKind::HashN),
    ("#r$", SeparatorKind::HashR),
    ("#w$", SeparatorKind::HashW),
    ("#", SeparatorKind::Hash),
];

/// A lexed token (§3 "Token").
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub numeric_value: i64,
    pub text: String,
    pub location: SourceLocation,
    /// True if classifying this identifier as a symbol just created it.
    pub newsymbol: bool,
    /// Snapshot of the lexical context under which this token was
    /// interpreted (§4.2).
    pub context_snapshot: u32,
    pub symbol_index: Option<usize>,
    pub keyword: Option<KeywordMatch>,
    pub separator: Option<SeparatorKind>,
}

impl Token {
    fn eof(location: SourceLocation, context_snapshot: u32) -> Self {
        Token {
            kind: TokenKind::Eof,
            numeric_value: 0,
            text: String::new(),
            location,
            newsymbol: false,
            context_snapshot,
            symbol_index: None,
            keyword: None,
            separator: None,
        }
    }
}

/// Errors the lexer can raise; all are "recoverable, token restart" except
/// where noted (§4.2 "Failure modes").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    IllegalByte(u8),
    UnterminatedString,
    UnterminatedCharLiteral,
    FloatMissingExponentDigits,
    InvalidFloatLiteral,
    FloatOnUnsupportedTarget,
    /// Put back beyond ring capacity: a fatal internal error (§4.2).
    PutBackRingOverflow,
}

/// One lexical block: a file or synthesized string, with its own line/column
/// counters (GLOSSARY "Lexical block").
struct Block {
    file: FileIndex,
    bytes: Vec<u8>,
    pos: usize,
    line: u32,
    column: u32,
}

impl Block {
    fn byte_at(&self, offset: usize) -> u8 {
        *self.bytes.get(self.pos + offset).unwrap_or(&0)
    }
}

/// Fixed-capacity put-back ring (§4.2 "Put-back ring"). Capacity must be
/// >= 6 to support the worst-case multi-token lookahead the spec calls out.
const PUT_BACK_RING_CAPACITY: usize = 6;

#[derive(Debug, Default)]
struct PutBackRing {
    tokens: Vec<Token>,
}

impl PutBackRing {
    fn push(&mut self, token: Token) -> Result<(), LexError> {
        if self.tokens.len() >= PUT_BACK_RING_CAPACITY {
            return Err(LexError::PutBackRingOverflow);
        }
        self.tokens.push(token);
        Ok(())
    }

    fn pop(&mut self) -> Option<Token> {
        self.tokens.pop()
    }
}

/// The lexer proper.
pub struct Lexer {
    blocks: Vec<Block>,
    pub keywords: KeywordTable,
    put_back: PutBackRing,
    pub debug_segments: DebugSegments,
    /// Local-variable names for the routine currently being lexed, indexed
    /// by their assigned local-variable number (the "128-entry lookup" of
    /// §4.2). Empty when not inside a routine.
    pub locals: Vec<String>,
    target: Target,
}

impl Lexer {
    pub fn new(target: Target) -> Self {
        Lexer {
            blocks: Vec::new(),
            keywords: KeywordTable::new(),
            put_back: PutBackRing::default(),
            debug_segments: DebugSegments::new(),
            locals: Vec::new(),
            target,
        }
    }

    /// Push a new lexical block: a file's bytes (already read and passed
    /// through the character-translation grid) or a synthesized string.
    pub fn push_source(&mut self, file: FileIndex, source: &str) {
        let bytes = translate_source(source);
        self.debug_segments.push(file, 1);
        self.blocks.push(Block {
            file,
            bytes,
            pos: 0,
            line: 1,
            column: 1,
        });
    }

    pub fn begin(&self) -> SpanCursor {
        SpanCursor::new(self.current_location(), None)
    }

    fn current_location(&self) -> SourceLocation {
        match self.blocks.last() {
            Some(b) => SourceLocation {
                file: b.file,
                byte_offset: b.pos as u32,
                line: b.line,
                column: b.column,
                original: None,
            },
            None => SourceLocation::synthetic(),
        }
    }

    fn peek(&self, lookahead: usize) -> u8 {
        match self.blocks.last() {
            Some(b) => b.byte_at(lookahead),
            None => 0,
        }
    }

    fn advance(&mut self) -> u8 {
        let Some(b) = self.blocks.last_mut() else {
            return 0;
        };
        if b.pos >= b.bytes.len() {
            // At end of this block: pop back to the including block, if any.
            self.blocks.pop();
            return self.advance_after_pop();
        }
        let c = b.bytes[b.pos];
        b.pos += 1;
        if c == b'\n' {
            b.line += 1;
            b.column = 1;
        } else {
            b.column += 1;
        }
        c
    }

    fn advance_after_pop(&mut self) -> u8 {
        match self.blocks.last_mut() {
            Some(b) if b.pos < b.bytes.len() => {
                let c = b.bytes[b.pos];
                b.pos += 1;
                c
            }
            _ => 0,
        }
    }

    fn at_eof(&self) -> bool {
        self.blocks.iter().all(|b| b.pos >= b.bytes.len())
    }

    /// Push a token back so the next [`next`](Lexer::next) call returns it
    /// again. If the token was a freshly created symbol, undo that creation
    /// per §4.2/§9 ("Put-back ring vs. the symbol side-effect").
    pub fn put_back(&mut self, token: Token, symbols: &mut SymbolTable) -> Result<(), LexError> {
        if token.newsymbol {
            if let Some(index) = token.symbol_index {
                symbols.end_scope(index, true);
            }
        }
        self.put_back.push(token)
    }

    /// Produce the next token, consulting `symbols` for identifier
    /// resolution (§4.2 "Keyword classification").
    pub fn next(&mut self, symbols: &mut SymbolTable) -> Result<Token, LexError> {
        if let Some(mut token) = self.put_back.pop() {
            let current_context = self.keywords.context_snapshot();
            if token.context_snapshot != current_context && token.kind == TokenKind::BareIdentifier
            {
                let reclassified = self.classify_identifier(&token.text, token.location, symbols);
                return reclassified;
            }
            token.context_snapshot = current_context;
            return Ok(token);
        }
        self.scan(symbols)
    }

    fn scan(&mut self, symbols: &mut SymbolTable) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace_and_comments();
            if self.at_eof() {
                return Ok(Token::eof(
                    self.current_location(),
                    self.keywords.context_snapshot(),
                ));
            }
            let location = self.current_location();
            let c = self.peek(0);

            if c.is_ascii_digit() {
                return Ok(self.lex_number(location));
            }
            if c == b'$' {
                return self.lex_dollar(location);
            }
            if c == b'\'' {
                return self.lex_single_quoted(location);
            }
            if c == b'"' {
                return self.lex_double_quoted(location);
            }
            if c == b'_' || c.is_ascii_alphabetic() {
                return self.lex_identifier(location, symbols);
            }
            return self.lex_separator(location, symbols);
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let c = self.peek(0);
            if c == b' ' || c == b'\t' || c == b'\n' {
                self.advance();
                continue;
            }
            if c == b'!' {
                while !self.at_eof() && self.peek(0) != b'\n' {
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn lex_number(&mut self, location: SourceLocation) -> Token {
        let mut text = String::new();
        while self.peek(0).is_ascii_digit() {
            text.push(self.advance() as char);
        }
        let value: i64 = text.parse().unwrap_or(0);
        Token {
            kind: TokenKind::Number,
            numeric_value: value,
            text,
            location,
            newsymbol: false,
            context_snapshot: self.keywords.context_snapshot(),
            symbol_index: None,
            keyword: None,
            separator: None,
        }
    }

    fn lex_dollar(&mut self, location: SourceLocation) -> Result<Token, LexError> {
        self.advance(); // consume '$'
        let c = self.peek(0);
        if c == b'$' {
            self.advance();
            let mut text = String::new();
            while self.peek(0) == b'0' || self.peek(0) == b'1' {
                text.push(self.advance() as char);
            }
            let value = i64::from_str_radix(&text, 2).unwrap_or(0);
            return Ok(self.make_number_token(value, location));
        }
        if c == b'+' || c == b'-' || c == b'<' || c == b'>' {
            let mut text = String::new();
            while matches!(
                self.peek(0),
                b'+' | b'-' | b'<' | b'>' | b'.' | b'e' | b'E'
            ) || self.peek(0).is_ascii_digit()
            {
                text.push(self.advance() as char);
            }
            if !self.target.supports_float_literals() {
                return Err(LexError::FloatOnUnsupportedTarget);
            }
            return match float::parse_float_literal(&text) {
                Ok(bits) => Ok(self.make_number_token(bits.value() as i64, location)),
                Err(float::FloatError::MissingExponentDigits) => {
                    Err(LexError::FloatMissingExponentDigits)
                }
                Err(float::FloatError::InvalidLiteral) => Err(LexError::InvalidFloatLiteral),
            };
        }
        // Hexadecimal.
        let mut text = String::new();
        while self.peek(0).is_ascii_hexdigit() {
            text.push(self.advance() as char);
        }
        let value = i64::from_str_radix(&text, 16).unwrap_or(0);
        Ok(self.make_number_token(value, location))
    }

    fn make_number_token(&self, value: i64, location: SourceLocation) -> Token {
        Token {
            kind: TokenKind::Number,
            numeric_value: value,
            text: String::new(),
            location,
            newsymbol: false,
            context_snapshot: self.keywords.context_snapshot(),
            symbol_index: None,
            keyword: None,
            separator: None,
        }
    }

    fn lex_single_quoted(&mut self, location: SourceLocation) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            if self.at_eof() {
                return Err(LexError::UnterminatedCharLiteral);
            }
            let c = self.advance();
            if c == b'\'' {
                break;
            }
            if c == b'@' && self.peek(0) == b'\'' {
                text.push('\'');
                self.advance();
                continue;
            }
            text.push(c as char);
        }
        Ok(Token {
            kind: TokenKind::SqString,
            numeric_value: 0,
            text,
            location,
            newsymbol: false,
            context_snapshot: self.keywords.context_snapshot(),
            symbol_index: None,
            keyword: None,
            separator: None,
        })
    }

    fn lex_double_quoted(&mut self, location: SourceLocation) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut text = String::new();
        let mut pending_space = false;
        loop {
            if self.at_eof() {
                return Err(LexError::UnterminatedString);
            }
            let c = self.peek(0);
            if c == b'"' {
                self.advance();
                break;
            }
            if c == b'\\' {
                // Line splice: backslash followed (after whitespace) by newline.
                self.advance();
                let mut only_whitespace = true;
                let mut lookahead = 0usize;
                while matches!(self.peek(lookahead), b' ' | b'\t') {
                    lookahead += 1;
                }
                if self.peek(lookahead) != b'\n' {
                    only_whitespace = false;
                }
                if only_whitespace {
                    while self.peek(0) != b'\n' {
                        self.advance();
                    }
                    self.advance(); // the newline itself
                    continue;
                }
                // Not a splice: treat as a literal escaped character.
                let escaped = self.advance();
                text.push(escaped as char);
                continue;
            }
            if c == b'^' {
                self.advance();
                text.push('\n');
                pending_space = false;
                continue;
            }
            if c == b' ' || c == b'\t' || c == b'\n' {
                // Collapse a run of whitespace (including an embedded
                // newline) into a single space.
                while matches!(self.peek(0), b' ' | b'\t' | b'\n') {
                    self.advance();
                }
                pending_space = true;
                continue;
            }
            if pending_space {
                text.push(' ');
                pending_space = false;
            }
            text.push(self.advance() as char);
        }
        Ok(Token {
            kind: TokenKind::DqString,
            numeric_value: 0,
            text,
            location,
            newsymbol: false,
            context_snapshot: self.keywords.context_snapshot(),
            symbol_index: None,
            keyword: None,
            separator: None,
        })
    }

    fn lex_identifier(
        &mut self,
        location: SourceLocation,
        symbols: &mut SymbolTable,
    ) -> Result<Token, LexError> {
        let mut text = String::new();
        while self.peek(0) == b'_' || self.peek(0).is_ascii_alphanumeric() {
            text.push(self.advance() as char);
        }
        self.classify_identifier(&text, location, symbols)
    }

    fn classify_identifier(
        &mut self,
        text: &str,
        location: SourceLocation,
        symbols: &mut SymbolTable,
    ) -> Result<Token, LexError> {
        let context_snapshot = self.keywords.context_snapshot();

        if let Some(index) = self.locals.iter().position(|l| l.eq_ignore_ascii_case(text)) {
            return Ok(Token {
                kind: TokenKind::Symbol,
                numeric_value: index as i64,
                text: text.to_string(),
                location,
                newsymbol: false,
                context_snapshot,
                symbol_index: None,
                keyword: None,
                separator: None,
            });
        }

        if let Some(m) = self.keywords.classify(text) {
            return Ok(Token {
                kind: TokenKind::Keyword,
                numeric_value: m.index as i64,
                text: text.to_string(),
                location,
                newsymbol: false,
                context_snapshot,
                symbol_index: None,
                keyword: Some(m),
                separator: None,
            });
        }

        if self.keywords.dont_enter_into_symbol_table {
            return Ok(Token {
                kind: TokenKind::BareIdentifier,
                numeric_value: 0,
                text: text.to_string(),
                location,
                newsymbol: false,
                context_snapshot,
                symbol_index: None,
                keyword: None,
                separator: None,
            });
        }

        let (index, created) = symbols.index_or_create(text, None);
        if created {
            let sym = symbols.get_mut(index);
            sym.flags.set(SymbolFlags::UNKNOWN, true);
            sym.value = 0x100;
            sym.symbol_type = SymbolType::Constant;
            sym.first_defined_location = location;
        }
        Ok(Token {
            kind: TokenKind::Symbol,
            numeric_value: 0,
            text: text.to_string(),
            location,
            newsymbol: created,
            context_snapshot,
            symbol_index: Some(index),
            keyword: None,
            separator: None,
        })
    }

    fn lex_separator(
        &mut self,
        location: SourceLocation,
        symbols: &mut SymbolTable,
    ) -> Result<Token, LexError> {
        let window: [u8; 3] = [self.peek(0), self.peek(1), self.peek(2)];
        let window_str: String = window
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect();

        let mut best: Option<(&'static str, SeparatorKind)> = None;
        for &(candidate, kind) in SEPARATORS {
            if window_str.starts_with(candidate) {
                if best.is_none_or(|(b, _)| candidate.len() > b.len()) {
                    best = Some((candidate, kind));
                }
            }
        }

        let Some((matched, kind)) = best else {
            let bad = self.advance();
            return Err(LexError::IllegalByte(bad));
        };

        for _ in 0..matched.len() {
            self.advance();
        }

        let mut token = Token {
            kind: TokenKind::Separator,
            numeric_value: 0,
            text: matched.to_string(),
            location,
            newsymbol: false,
            context_snapshot: self.keywords.context_snapshot(),
            symbol_index: None,
            keyword: None,
            separator: Some(kind),
        };

        if kind.consumes_identifier() {
            let mut ident = String::new();
            while self.peek(0) == b'_' || self.peek(0).is_ascii_alphanumeric() {
                ident.push(self.advance() as char);
            }
            if !ident.is_empty() {
                let (index, created) = symbols.index_or_create(&ident, None);
                token.text = format!("{matched}{ident}");
                token.symbol_index = Some(index);
                token.newsymbol = created;
            }
        }

        Ok(token)
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Lexer::new(Target::Glulx)
    }
}

/// Map host bytes through the internal ISO-Latin-1-like encoding,
/// normalising form-feed and carriage-return to newline and folding a
/// CR-LF pair into a single newline (§4.2 "Character pipeline").
fn translate_source(source: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(source.len());
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\r' => {
                out.push(b'\n');
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    i += 1;
                }
            }
            0x0C => out.push(b'\n'),
            other => out.push(other),
        }
        i += 1;
    }
    out.push(0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_lexer(src: &str) -> (Lexer, SymbolTable) {
        new_lexer_for_target(src, crate::target::Target::Glulx)
    }

    fn new_lexer_for_target(src: &str, target: crate::target::Target) -> (Lexer, SymbolTable) {
        let mut lexer = Lexer::new(target);
        lexer.push_source(0, src);
        (lexer, SymbolTable::new(target))
    }

    #[test]
    fn longest_prefix_wins_for_arrow_separators() {
        let (mut lexer, mut symbols) = new_lexer("--> -- -> -");
        let kinds: Vec<_> = (0..4)
            .map(|_| lexer.next(&mut symbols).unwrap().separator.unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                SeparatorKind::DoubleArrow,
                SeparatorKind::MinusMinus,
                SeparatorKind::Arrow,
                SeparatorKind::Minus,
            ]
        );
    }

    #[test]
    fn decimal_number_lexes_correctly() {
        let (mut lexer, mut symbols) = new_lexer("1234");
        let token = lexer.next(&mut symbols).unwrap();
        assert_eq!(token.kind, TokenKind::Number);
        assert_eq!(token.numeric_value, 1234);
    }

    #[test]
    fn hex_and_binary_literals() {
        let (mut lexer, mut symbols) = new_lexer("$1A $$101");
        let hex = lexer.next(&mut symbols).unwrap();
        assert_eq!(hex.numeric_value, 0x1A);
        let bin = lexer.next(&mut symbols).unwrap();
        assert_eq!(bin.numeric_value, 0b101);
    }

    #[test]
    fn string_literal_collapses_embedded_whitespace() {
        let (mut lexer, mut symbols) = new_lexer("\"hello   \n   world\"");
        let token = lexer.next(&mut symbols).unwrap();
        assert_eq!(token.kind, TokenKind::DqString);
        assert_eq!(token.text, "hello world");
    }

    #[test]
    fn unknown_identifier_creates_a_symbol() {
        let (mut lexer, mut symbols) = new_lexer("frobotz");
        let token = lexer.next(&mut symbols).unwrap();
        assert_eq!(token.kind, TokenKind::Symbol);
        assert!(token.newsymbol);
        assert!(symbols
            .get(token.symbol_index.unwrap())
            .flags
            .get(SymbolFlags::UNKNOWN));
    }

    #[test]
    fn keyword_identifier_does_not_touch_symbol_table() {
        let (mut lexer, mut symbols) = new_lexer("global");
        let before = symbols.len();
        let token = lexer.next(&mut symbols).unwrap();
        assert_eq!(token.kind, TokenKind::Keyword);
        assert_eq!(symbols.len(), before);
    }

    #[test]
    fn put_back_undoes_fresh_symbol_creation() {
        let (mut lexer, mut symbols) = new_lexer("frobotz");
        let token = lexer.next(&mut symbols).unwrap();
        assert!(symbols.index_of("frobotz").is_some());
        lexer.put_back(token, &mut symbols).unwrap();
        assert!(symbols.index_of("frobotz").is_none());
    }

    #[test]
    fn put_back_beyond_capacity_is_fatal() {
        let (mut lexer, mut symbols) = new_lexer("a b c d e f g");
        let mut tokens = Vec::new();
        for _ in 0..7 {
            tokens.push(lexer.next(&mut symbols).unwrap());
        }
        for t in tokens.into_iter().take(PUT_BACK_RING_CAPACITY) {
            lexer.put_back(t, &mut symbols).unwrap();
        }
        let overflow_token = Token::eof(SourceLocation::synthetic(), 0);
        assert_eq!(
            lexer.put_back(overflow_token, &mut symbols),
            Err(LexError::PutBackRingOverflow)
        );
    }

    #[test]
    fn distinguished_hash_separator_consumes_following_identifier() {
        let (mut lexer, mut symbols) = new_lexer("#r$MyRoutine");
        let token = lexer.next(&mut symbols).unwrap();
        assert_eq!(token.separator, Some(SeparatorKind::HashR));
        assert!(token.symbol_index.is_some());
        assert_eq!(
            symbols.name(token.symbol_index.unwrap()),
            "MyRoutine"
        );
    }

    #[test]
    fn float_literal_is_rejected_on_the_16_bit_target() {
        let (mut lexer, mut symbols) =
            new_lexer_for_target("$+1.0", crate::target::Target::ZMachine { version: 5 });
        assert_eq!(
            lexer.next(&mut symbols),
            Err(LexError::FloatOnUnsupportedTarget)
        );
    }

    #[test]
    fn float_literal_is_accepted_on_the_32_bit_target() {
        let (mut lexer, mut symbols) = new_lexer("$+1.0");
        let token = lexer.next(&mut symbols).unwrap();
        assert_eq!(token.kind, TokenKind::Number);
        assert_eq!(token.numeric_value, 0x3F80_0000);
    }

    #[test]
    fn restart_is_deterministic() {
        let src = "Global g = 3; Array a --> 1 2 3;";
        let (mut lexer1, mut symbols1) = new_lexer(src);
        let (mut lexer2, mut symbols2) = new_lexer(src);
        loop {
            let t1 = lexer1.next(&mut symbols1).unwrap();
            let t2 = lexer2.next(&mut symbols2).unwrap();
            assert_eq!(t1.kind, t2.kind);
            assert_eq!(t1.text, t2.text);
            assert_eq!(t1.numeric_value, t2.numeric_value);
            if t1.kind == TokenKind::Eof {
                break;
            }
        }
    }
}
