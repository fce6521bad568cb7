use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{command, Arg, ArgAction};
use ficc::config::{Config, SizePreset};
use ficc::context::CompilationContext;

use ficc_cli::{assemble_story_file, default_output_path, parse_name_value, parse_target, run_directive_loop};

fn main() -> Result<()> {
    let matches = command!()
        .max_term_width(100)
        .args(&[
            Arg::new("input")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("The source file to compile"),
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(clap::value_parser!(PathBuf))
                .help("The story file to write. Defaults to the input path with the target's extension"),
            Arg::new("target")
                .long("target")
                .value_parser(["z3", "z4", "z5", "z6", "z7", "z8", "glulx"])
                .default_value("z5")
                .help("The bytecode target"),
            Arg::new("memory")
                .long("memory")
                .value_name("NAME=VALUE")
                .action(ArgAction::Append)
                .help("Override a memory setting"),
            Arg::new("size")
                .long("size")
                .value_parser(["small", "large", "huge"])
                .help("Apply a memory-setting size preset"),
            Arg::new("define")
                .long("define")
                .value_name("NAME[=VALUE]")
                .action(ArgAction::Append)
                .help("Predefine a constant before compilation"),
            Arg::new("transcript")
                .long("transcript")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Write a compilation transcript to this path"),
            Arg::new("debug-file")
                .long("debug-file")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Write a debugging-information sidecar file"),
            Arg::new("module")
                .long("module")
                .action(ArgAction::SetTrue)
                .help("Emit an unresolved module rather than a final story file"),
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose (debug-level) logging"),
        ])
        .get_matches();

    if matches.get_flag("verbose") {
        env_logger::builder()
            .format_level(false)
            .format_target(false)
            .filter_module("ficc", log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::builder().filter_module("ficc", log::LevelFilter::Warn).init();
    }

    let target = parse_target(matches.get_one::<String>("target").unwrap());
    let mut config = Config::new(target);

    if let Some(size) = matches.get_one::<String>("size") {
        let preset = match size.as_str() {
            "small" => SizePreset::Small,
            "large" => SizePreset::Large,
            _ => SizePreset::Huge,
        };
        config.apply_size_preset(preset);
    }

    config.module_mode = matches.get_flag("module");
    config.transcript_path = matches.get_one::<PathBuf>("transcript").cloned();
    config.debug_info_path = matches.get_one::<PathBuf>("debug-file").cloned();

    let in_path = matches.get_one::<PathBuf>("input").unwrap();
    let source = fs::read_to_string(in_path)
        .with_context(|| format!("failed to read input file '{}'", in_path.display()))?;

    let mut ctx = CompilationContext::new(config);

    for arg in matches.get_many::<String>("define").unwrap_or_default() {
        let (name, value) = parse_name_value(arg).with_context(|| format!("invalid --define '{arg}'"))?;
        ctx.config.add_define(name, value);
    }
    for arg in matches.get_many::<String>("memory").unwrap_or_default() {
        let (name, value) = parse_name_value(arg).with_context(|| format!("invalid --memory '{arg}'"))?;
        ctx.config.set_memory(&name, value, &mut ctx.diagnostics);
    }
    ctx.apply_defines();

    let file_index = ctx.files.add(in_path.display().to_string(), false);
    ctx.lexer.push_source(file_index, &source);
    ctx.lexer.keywords.directive_only = true;

    run_directive_loop(&mut ctx)?;

    if ctx.diagnostics.has_errors() {
        for d in ctx.diagnostics.diagnostics() {
            eprintln!("{d}");
        }
        return Err(anyhow!(
            "compilation failed with {} error(s)",
            ctx.diagnostics.error_count()
        ));
    }
    for d in ctx.diagnostics.diagnostics() {
        eprintln!("{d}");
    }

    let out_path = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| default_output_path(in_path, target));

    let file_bytes = assemble_story_file(&ctx);
    fs::write(&out_path, file_bytes)
        .with_context(|| format!("failed to write output file '{}'", out_path.display()))?;

    Ok(())
}
