use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use docx_filler::batch::{count_templates, fill_batch_with_observer, BatchRequest};
use docx_filler::config::{find_default_config, init_default_config, load_config, AppConfig};
use docx_filler::preview::extract_preview_text;
use docx_filler::progress::ConsoleProgress;

#[derive(Parser, Debug)]
#[command(name = "docx-filler")]
#[command(about = "Fill {placeholder} tokens in a folder tree of .docx templates", long_about = None)]
struct Args {
    /// Generate a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Print the plain text of one document, then exit
    #[arg(long, value_name = "DOCX")]
    preview: Option<PathBuf>,

    /// Template folder (searched recursively)
    #[arg(short, long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Output folder (mirrors the template folder tree)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// File name for the first template directly in the template folder
    #[arg(long, value_name = "NAME")]
    output_name: Option<String>,

    /// Placeholder value, repeatable (e.g. --set object_desc="Bridge 7")
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    set: Vec<(String, String)>,

    /// Bold substituted text (`--bold` or `--bold false`)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    bold: Option<bool>,

    /// Italicize substituted text (`--italic` or `--italic false`)
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    italic: Option<bool>,

    /// Font family for substituted text
    #[arg(long, value_name = "NAME")]
    font_family: Option<String>,

    /// Config file path (default: search for docx-filler.toml upwards, or DOCX_FILLER_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the batch summary as JSON
    #[arg(long, value_name = "JSON")]
    summary_json: Option<PathBuf>,

    /// Do not print the text of the first filled document
    #[arg(long)]
    no_preview: bool,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let progress = ConsoleProgress::new(true);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(doc) = args.preview.as_ref() {
        println!("{}", extract_preview_text(doc));
        return Ok(ExitCode::SUCCESS);
    }

    let cfg = match args.config.clone().or_else(find_default_config) {
        Some(path) => {
            log::info!("config: {}", path.display());
            load_config(&path)?
        }
        None => AppConfig::default(),
    };
    if let Some(form) = cfg.form.as_ref() {
        form.validate().context("invalid [form] section")?;
    }

    let (Some(source_dir), Some(output_dir)) = (
        args.source.clone().or_else(|| cfg.batch.source_dir.clone()),
        args.output.clone().or_else(|| cfg.batch.output_dir.clone()),
    ) else {
        let mut cmd = Args::command();
        cmd.print_help().context("print help")?;
        eprintln!(
            "\n\nUSAGE:\n  docx-filler --source <templates> --output <filled> [--set key=value]...\n\nTIPS:\n  - Folders and values can also come from docx-filler.toml (see --init-config).\n"
        );
        return Ok(ExitCode::from(2));
    };

    let mut data = cfg.data_map();
    data.extend(args.set.iter().cloned());

    let mut style = cfg.style_override();
    if let Some(bold) = args.bold {
        style.force_bold = bold;
    }
    if let Some(italic) = args.italic {
        style.force_italic = italic;
    }
    if let Some(font) = args.font_family.as_deref() {
        let font = font.trim();
        style.font_family = (!font.is_empty()).then(|| font.to_string());
    }

    let request = BatchRequest {
        source_dir,
        output_dir,
        output_name: args.output_name.clone().or_else(|| cfg.batch.output_name.clone()),
        data,
        style,
    };

    let total = count_templates(&request.source_dir, Some(&request.output_dir));
    progress.info(format!(
        "Filling {total} template(s): {} -> {} ({} keys)",
        request.source_dir.display(),
        request.output_dir.display(),
        request.data.len()
    ));
    let mut done = 0usize;
    let summary = fill_batch_with_observer(&request, |outcome| {
        done += 1;
        progress.file_done(outcome, done, total);
    })?;

    let status = summary.status();
    println!("{}", status.message());

    if let Some(path) = args.summary_json.as_ref() {
        let json = serde_json::to_string_pretty(&summary).context("serialize summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("write summary: {}", path.display()))?;
    }

    if !args.no_preview {
        println!();
        println!("{}", summary.preview_text());
    }

    Ok(if status.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
