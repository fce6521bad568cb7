//! Driver logic for the `ficc` command-line tool, kept separate from
//! `main.rs` so the top-level directive loop can be exercised directly in
//! integration tests without spawning the binary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use ficc::context::CompilationContext;
use ficc::globals::{ArrayShape, ArrayValue};
use ficc::lexer::{LexError, SeparatorKind, TokenKind};
use ficc::output::{glulx, zmachine};
use ficc::source::FileIndex;
use ficc::symbol::{SymbolFlags, SymbolType};
use ficc::target::Target;

pub fn parse_target(name: &str) -> Target {
    match name {
        "glulx" => Target::Glulx,
        other => {
            let version = other.trim_start_matches('z').parse().unwrap_or(5);
            Target::ZMachine { version }
        }
    }
}

pub fn default_output_path(input: &Path, target: Target) -> PathBuf {
    let ext = match target {
        Target::ZMachine { version } => format!("z{version}"),
        Target::Glulx => "ulx".to_string(),
    };
    input.with_extension(ext)
}

pub fn parse_name_value(arg: &str) -> Result<(String, i64)> {
    match arg.split_once('=') {
        Some((name, value)) => {
            let value: i64 = value
                .parse()
                .with_context(|| format!("'{value}' is not a valid integer"))?;
            Ok((name.to_string(), value))
        }
        None => Ok((arg.to_string(), 1)),
    }
}

/// Assemble a story file from a context's dynamic-data area. No routine
/// bodies are compiled (out of scope), so the code area is empty and every
/// function record is its own zero-length boundary.
pub fn assemble_story_file(ctx: &CompilationContext) -> Vec<u8> {
    match ctx.target {
        Target::ZMachine { version } => {
            let mut diags = ficc::diagnostics::DiagnosticSink::new();
            let header = zmachine::HeaderFields {
                version,
                release_number: 1,
                serial_number: *b"000000",
                flags1: 0,
                flags2: 0,
                initial_pc: 0,
                dictionary_address: 0,
                object_table_address: 0,
                abbreviations_address: 0,
            };
            zmachine::assemble(
                ctx.target,
                &header,
                ctx.globals.bytes(),
                &[],
                &[],
                ctx.config.module_mode,
                &[],
                &mut diags,
            )
        }
        Target::Glulx => {
            let header = glulx::HeaderFields {
                requested_version: glulx::GlulxVersion { major: 3, minor: 1, sub: 2 },
                stack_size: 4096,
                start_func_offset: 0,
                decoding_table_offset: 0,
            };
            glulx::assemble(&header, &[], ctx.globals.bytes())
        }
    }
}

/// The minimal top-level directive loop (§13 ambient): recognizes the
/// handful of directives this core can act on directly and skips everything
/// else (routine bodies via brace balancing, other directives up to their
/// closing `;`), since expression parsing, grammar, and code generation are
/// out of this crate's scope.
pub fn run_directive_loop(ctx: &mut CompilationContext) -> Result<()> {
    let mut next_global_slot: u16 = 0;

    loop {
        let token = match ctx.lexer.next(&mut ctx.symbols) {
            Ok(t) => t,
            Err(e) => return Err(anyhow!(lex_error_message(e))),
        };

        if token.kind == TokenKind::Eof {
            break;
        }

        if token.kind != TokenKind::Keyword {
            if token.separator == Some(SeparatorKind::Hash) {
                handle_conditional(ctx)?;
            }
            continue;
        }

        match token.text.to_ascii_lowercase().as_str() {
            "global" => directive_global(ctx, &mut next_global_slot)?,
            "array" => directive_array(ctx)?,
            "constant" => directive_constant(ctx)?,
            "replace" => directive_replace(ctx)?,
            "include" => directive_include(ctx)?,
            "system_file" => skip_to_semicolon(ctx)?,
            "routine" => skip_routine_body(ctx)?,
            _ => skip_to_semicolon(ctx)?,
        }
    }
    Ok(())
}

fn lex_error_message(e: LexError) -> String {
    format!("{e:?}")
}

fn directive_global(ctx: &mut CompilationContext, next_slot: &mut u16) -> Result<()> {
    let name_token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    let Some(symbol_index) = name_token.symbol_index else {
        return Err(anyhow!("expected a name after 'Global'"));
    };
    let already_defined = !ctx.symbols.get(symbol_index).flags.get(SymbolFlags::UNKNOWN);

    let mut value = ArrayValue::constant(0);
    let peeked = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    if peeked.separator == Some(SeparatorKind::Assign) {
        value = parse_value(ctx)?;
    } else {
        ctx.lexer.put_back(peeked, &mut ctx.symbols).ok();
    }
    skip_to_semicolon(ctx)?;

    if already_defined {
        ctx.diagnostics.error(
            format!("'{}' is already defined", ctx.symbols.name(symbol_index)),
            Some(name_token.location),
        );
        return Ok(());
    }

    let slot = *next_slot;
    *next_slot += 1;
    ctx.globals
        .define_global(slot, value, &mut ctx.backpatch)
        .map_err(|e| anyhow!(e))?;
    ctx.symbols.assign(symbol_index, slot as i64, SymbolType::GlobalVariable);
    Ok(())
}

fn directive_array(ctx: &mut CompilationContext) -> Result<()> {
    let name_token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    let Some(symbol_index) = name_token.symbol_index else {
        return Err(anyhow!("expected a name after 'Array'"));
    };

    let shape_token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    let shape = match shape_token.separator {
        Some(SeparatorKind::Arrow) => ArrayShape::Byte,
        Some(SeparatorKind::DoubleArrow) => ArrayShape::Word,
        _ => match shape_token.text.to_ascii_lowercase().as_str() {
            "string" => ArrayShape::StringArray,
            "table" => ArrayShape::Table,
            "buffer" => ArrayShape::Buffer,
            other => return Err(anyhow!("unrecognized array shape '{other}'")),
        },
    };

    let mut values = Vec::new();
    loop {
        let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
        if token.separator == Some(SeparatorKind::Semicolon) || token.kind == TokenKind::Eof {
            break;
        }
        if token.kind == TokenKind::DqString {
            // A quoted string literal in a `string`/`buffer` array body
            // expands to one entry per character, not a single value.
            values.extend(token.text.bytes().map(|b| ArrayValue::constant(b as i64)));
            continue;
        }
        ctx.lexer.put_back(token, &mut ctx.symbols).ok();
        values.push(parse_value(ctx)?);
    }

    let location = ficc::source::SourceLocation::synthetic();
    let symbol_value = ctx
        .globals
        .define_array(symbol_index, shape, values, &mut ctx.diagnostics, location, &mut ctx.backpatch)
        .map_err(|e| anyhow!(e))?;
    let symbol_type = match shape {
        ArrayShape::Table | ArrayShape::Buffer | ArrayShape::StringArray => SymbolType::StaticArray,
        _ => SymbolType::Array,
    };
    ctx.symbols.assign(symbol_index, symbol_value as i64, symbol_type);
    Ok(())
}

fn directive_constant(ctx: &mut CompilationContext) -> Result<()> {
    let name_token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    let Some(symbol_index) = name_token.symbol_index else {
        return Err(anyhow!("expected a name after 'Constant'"));
    };
    let assign_token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    let value = if assign_token.separator == Some(SeparatorKind::Assign) {
        parse_value(ctx)?.value
    } else {
        ctx.lexer.put_back(assign_token, &mut ctx.symbols).ok();
        0
    };
    skip_to_semicolon(ctx)?;
    ctx.symbols.assign(symbol_index, value, SymbolType::Constant);
    Ok(())
}

fn directive_replace(ctx: &mut CompilationContext) -> Result<()> {
    let original = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    let replacement = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    skip_to_semicolon(ctx)?;
    if let (Some(a), Some(b)) = (original.symbol_index, replacement.symbol_index) {
        if let Err(msg) = ctx.symbols.add_replacement(a, b) {
            ctx.diagnostics.error(msg, None);
        }
    }
    Ok(())
}

fn directive_include(ctx: &mut CompilationContext) -> Result<()> {
    let name_token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    skip_to_semicolon(ctx)?;
    if name_token.kind != TokenKind::DqString {
        return Ok(());
    }
    let path = resolve_include_path(ctx, name_token.location.file, &name_token.text);
    match fs::read_to_string(&path) {
        Ok(contents) => {
            let file_index = ctx.files.add(path.display().to_string(), true);
            ctx.lexer.push_source(file_index, &contents);
        }
        Err(_) => ctx.diagnostics.warning(
            format!("could not find include file '{}'; skipped", name_token.text),
            Some(name_token.location),
        ),
    }
    Ok(())
}

/// Resolve an `Include` filename. A leading `>` is the distinguished marker
/// meaning "in the same directory as the including file" rather than the
/// process's current working directory; strip it and rebase onto that
/// directory. Any other filename is used as-is.
fn resolve_include_path(ctx: &CompilationContext, including_file: FileIndex, name: &str) -> PathBuf {
    match name.strip_prefix('>') {
        Some(rest) => {
            let including_path = &ctx.files.get(including_file).name;
            Path::new(including_path)
                .parent()
                .map(|dir| dir.join(rest))
                .unwrap_or_else(|| PathBuf::from(rest))
        }
        None => PathBuf::from(name),
    }
}

/// Skip a routine's parameter list and body by tracking brace depth; opcode
/// and statement compilation happens in the (out-of-scope) expression and
/// statement compiler.
fn skip_routine_body(ctx: &mut CompilationContext) -> Result<()> {
    let mut depth = 0i32;
    let mut seen_open = false;
    loop {
        let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
        if token.kind == TokenKind::Eof {
            return Err(anyhow!("unexpected end of file inside a routine body"));
        }
        match token.separator {
            Some(SeparatorKind::LBrace) => {
                depth += 1;
                seen_open = true;
            }
            Some(SeparatorKind::RBrace) => {
                depth -= 1;
                if seen_open && depth == 0 {
                    return Ok(());
                }
            }
            _ => {}
        }
    }
}

fn skip_to_semicolon(ctx: &mut CompilationContext) -> Result<()> {
    loop {
        let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
        if token.separator == Some(SeparatorKind::Semicolon) || token.kind == TokenKind::Eof {
            return Ok(());
        }
    }
}

/// A value is a number literal, an optionally negated number literal, or a
/// reference to an already-defined symbol -- full expression evaluation is
/// out of scope.
fn parse_value(ctx: &mut CompilationContext) -> Result<ArrayValue> {
    let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    if token.separator == Some(SeparatorKind::Minus) {
        let inner = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
        if inner.kind == TokenKind::Number {
            return Ok(ArrayValue::constant(-inner.numeric_value));
        }
        return Err(anyhow!("expected a number after unary '-'"));
    }
    if token.kind == TokenKind::Number {
        return Ok(ArrayValue::constant(token.numeric_value));
    }
    if token.kind == TokenKind::DqString {
        // A quoted character/string entry in a byte/string array: store the
        // first byte, matching the source's "strings in byte contexts"
        // behavior for the single-character case.
        let first = token.text.bytes().next().unwrap_or(0);
        return Ok(ArrayValue::constant(first as i64));
    }
    if let Some(index) = token.symbol_index {
        return Ok(ArrayValue::constant(ctx.symbols.get(index).value));
    }
    Err(anyhow!("expected a value"))
}

/// Handle a `#` directive: conditional compilation (`Ifdef`/`Ifndef`/
/// `Iftrue`/`Ifnot`/`Iffalse`/`Else`/`Endif`). `Ifdef`/`Ifndef` test whether
/// a symbol exists; `Iftrue`/`Ifnot`/`Iffalse` evaluate a constant
/// expression and branch on its truth value.
fn handle_conditional(ctx: &mut CompilationContext) -> Result<()> {
    let keyword = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    let name = keyword.text.to_ascii_lowercase();
    match name.as_str() {
        "ifdef" | "ifndef" => {
            let symbol_token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
            let exists = symbol_token
                .symbol_index
                .is_some_and(|i| !ctx.symbols.get(i).flags.get(SymbolFlags::UNKNOWN));
            skip_to_semicolon(ctx)?;
            let negate = name == "ifndef";
            let condition = exists != negate;
            if !condition {
                skip_until_hash_keyword(ctx, &["else", "endif"])?;
            }
        }
        "iftrue" | "ifnot" | "iffalse" => {
            let value = parse_condition_expr(ctx)?;
            skip_to_semicolon(ctx)?;
            let negate = matches!(name.as_str(), "ifnot" | "iffalse");
            let condition = (value != 0) != negate;
            if !condition {
                skip_until_hash_keyword(ctx, &["else", "endif"])?;
            }
        }
        "else" => {
            skip_until_hash_keyword(ctx, &["endif"])?;
        }
        "endif" => {
            skip_to_semicolon(ctx)?;
        }
        _ => skip_to_semicolon(ctx)?,
    }
    Ok(())
}

/// A small constant-expression evaluator for `#Iftrue`/`#Ifnot`/`#Iffalse`
/// guards: numbers, defined symbols, parenthesised groups, the relational
/// operators `==`/`~=`/`<`/`>`/`<=`/`>=`, the logical operators `&&`/`||`,
/// and unary logical negation `~~`. Everything below relational precedence
/// goes through [`parse_value`], so `-x`, bare numbers, and symbol lookups
/// work the same way they do in an array body.
fn parse_condition_expr(ctx: &mut CompilationContext) -> Result<i64> {
    parse_or_expr(ctx)
}

fn parse_or_expr(ctx: &mut CompilationContext) -> Result<i64> {
    let mut left = parse_and_expr(ctx)?;
    loop {
        let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
        if token.separator == Some(SeparatorKind::OrOr) {
            let right = parse_and_expr(ctx)?;
            left = bool_to_value(left != 0 || right != 0);
        } else {
            ctx.lexer.put_back(token, &mut ctx.symbols).ok();
            break;
        }
    }
    Ok(left)
}

fn parse_and_expr(ctx: &mut CompilationContext) -> Result<i64> {
    let mut left = parse_unary_expr(ctx)?;
    loop {
        let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
        if token.separator == Some(SeparatorKind::AndAnd) {
            let right = parse_unary_expr(ctx)?;
            left = bool_to_value(left != 0 && right != 0);
        } else {
            ctx.lexer.put_back(token, &mut ctx.symbols).ok();
            break;
        }
    }
    Ok(left)
}

fn parse_unary_expr(ctx: &mut CompilationContext) -> Result<i64> {
    let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    if token.separator == Some(SeparatorKind::Not) {
        let inner = parse_unary_expr(ctx)?;
        return Ok(bool_to_value(inner == 0));
    }
    ctx.lexer.put_back(token, &mut ctx.symbols).ok();
    parse_relational_expr(ctx)
}

fn parse_relational_expr(ctx: &mut CompilationContext) -> Result<i64> {
    let left = parse_condition_operand(ctx)?;
    let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    let result = match token.separator {
        Some(SeparatorKind::Eq) => bool_to_value(left == parse_condition_operand(ctx)?),
        Some(SeparatorKind::Ne) => bool_to_value(left != parse_condition_operand(ctx)?),
        Some(SeparatorKind::Le) => bool_to_value(left <= parse_condition_operand(ctx)?),
        Some(SeparatorKind::Ge) => bool_to_value(left >= parse_condition_operand(ctx)?),
        Some(SeparatorKind::Lt) => bool_to_value(left < parse_condition_operand(ctx)?),
        Some(SeparatorKind::Gt) => bool_to_value(left > parse_condition_operand(ctx)?),
        _ => {
            ctx.lexer.put_back(token, &mut ctx.symbols).ok();
            left
        }
    };
    Ok(result)
}

fn parse_condition_operand(ctx: &mut CompilationContext) -> Result<i64> {
    let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
    if token.separator == Some(SeparatorKind::LParen) {
        let value = parse_or_expr(ctx)?;
        let close = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
        if close.separator != Some(SeparatorKind::RParen) {
            return Err(anyhow!("expected ')' in conditional-compilation expression"));
        }
        return Ok(value);
    }
    ctx.lexer.put_back(token, &mut ctx.symbols).ok();
    Ok(parse_value(ctx)?.value)
}

fn bool_to_value(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

fn skip_until_hash_keyword(ctx: &mut CompilationContext, stop_words: &[&str]) -> Result<()> {
    loop {
        let token = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
        if token.kind == TokenKind::Eof {
            return Err(anyhow!("unterminated '#Ifdef'/'#Iftrue' block"));
        }
        if token.separator == Some(SeparatorKind::Hash) {
            let next = ctx.lexer.next(&mut ctx.symbols).map_err(|e| anyhow!(lex_error_message(e)))?;
            let word = next.text.to_ascii_lowercase();
            if stop_words.contains(&word.as_str()) {
                if word == "endif" {
                    skip_to_semicolon(ctx)?;
                }
                return Ok(());
            }
        }
    }
}
