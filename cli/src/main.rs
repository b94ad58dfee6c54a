//! dochtml CLI - document to HTML conversion tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use dochtml::{
    classify, sniff, CommandExtractor, ConversionResult, ConvertOptions, FormatKind, HtmlOptions,
    JsonFormat, ParseOptions, Pipeline, TextExtractor,
};

#[derive(Parser)]
#[command(name = "dochtml")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert .doc, .docx and .pdf documents to HTML", long_about = None)]
struct Cli {
    /// Input document
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    #[command(flatten)]
    convert: ConvertArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document to HTML
    Convert {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Dump the extracted paragraphs and page breaks as JSON
    Json {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Format hint (defaults to the file extension)
        #[arg(long, value_name = "HINT")]
        format: Option<String>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Show document information
    Info {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone, Default)]
struct ConvertArgs {
    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Format hint (defaults to the file extension)
    #[arg(long, value_name = "HINT")]
    format: Option<String>,

    /// Print the JSON response envelope instead of bare HTML
    #[arg(long)]
    json: bool,

    /// Prepend <!DOCTYPE html>
    #[arg(long)]
    doctype: bool,

    /// Document title
    #[arg(long, value_name = "TITLE")]
    title: Option<String>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

impl ConvertArgs {
    fn options(&self) -> ConvertOptions {
        let mut html = HtmlOptions::new().with_doctype(self.doctype);
        if let Some(ref title) = self.title {
            html = html.with_title(title);
        }

        self.pipeline.options().with_html_options(html)
    }

    fn pipeline(&self) -> Pipeline {
        self.pipeline.build(self.options())
    }
}

/// Extraction flags shared by every command that reads a document.
#[derive(Args, Clone, Default)]
struct PipelineArgs {
    /// Never run an external helper for .doc files
    #[arg(long)]
    no_external: bool,

    /// External helper for .doc files (replaces antiword)
    #[arg(long, value_name = "PROGRAM", env = "DOCHTML_TOOL")]
    tool: Option<String>,

    /// Fail on the first unreadable PDF page
    #[arg(long)]
    strict: bool,

    /// Detect the format from the file contents when no hint is available
    #[arg(long)]
    sniff: bool,
}

impl PipelineArgs {
    fn options(&self) -> ConvertOptions {
        let parse = if self.strict {
            ParseOptions::new().strict()
        } else {
            ParseOptions::new().lenient()
        };

        ConvertOptions::new()
            .with_parse_options(parse)
            .with_sniffing(self.sniff)
            .with_external_tools(!self.no_external)
    }

    fn build(&self, options: ConvertOptions) -> Pipeline {
        let pipeline = Pipeline::with_options(options);
        match self.tool {
            Some(ref program) if !self.no_external => {
                let tools: Vec<Box<dyn TextExtractor>> =
                    vec![Box::new(CommandExtractor::new(program.as_str()))];
                pipeline.with_tools(tools)
            }
            _ => pipeline,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert { input, convert }) => cmd_convert(&input, &convert),
        Some(Commands::Json {
            input,
            output,
            format,
            compact,
            pipeline,
        }) => cmd_json(&input, output.as_deref(), format.as_deref(), compact, &pipeline),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, &cli.convert)
            } else {
                println!("{}", "Usage: dochtml <FILE> [-o OUTPUT]".yellow());
                println!("       dochtml --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Format hint: explicit flag first, then the file extension.
fn hint_for(input: &Path, format: Option<&str>) -> String {
    match format {
        Some(hint) => hint.to_string(),
        None => input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string(),
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_convert(input: &Path, args: &ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let hint = hint_for(input, args.format.as_deref());
    log::debug!("Converting {} with hint {:?}", input.display(), hint);

    let result = args.pipeline().run(&bytes, &hint);

    if args.json {
        write_output(args.output.as_deref(), &result.to_json(JsonFormat::Pretty)?)?;
        return if result.is_success() || result.is_unsupported() {
            Ok(())
        } else {
            Err("conversion failed".into())
        };
    }

    match result {
        ConversionResult::Html { html } => write_output(args.output.as_deref(), &html),
        ConversionResult::Unsupported { message, .. } => {
            println!("{}", message.yellow());
            Ok(())
        }
        ConversionResult::Failed { error } => Err(format!(
            "{} ({}, after {})",
            error.message, error.kind, error.stage
        )
        .into()),
    }
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    format: Option<&str>,
    compact: bool,
    args: &PipelineArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let hint = hint_for(input, format);

    let pipeline = args.build(args.options());
    let doc = pipeline.extract(&bytes, &hint)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = dochtml::to_json(&doc, format)?;
    write_output(output, &json)
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let hint = hint_for(input, None);
    let declared = classify(&hint);
    let sniffed = sniff(&bytes);

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Size".bold(), bytes.len());
    println!("{}: {}", "Format".bold(), declared);
    if sniffed != declared {
        println!(
            "{}: {}",
            "Signature".bold(),
            sniffed.to_string().yellow()
        );
    }
    if declared == FormatKind::Pdf {
        if let Some(version) = dochtml::detect::detect_pdf_version(&bytes) {
            println!("{}: {}", "PDF version".bold(), version);
        }
    }

    if !declared.is_supported() {
        return Ok(());
    }

    // Use lenient mode for info - show what can be recovered
    let pipeline = Pipeline::with_options(
        ConvertOptions::new().with_parse_options(ParseOptions::new().lenient()),
    );
    let doc = pipeline.extract(&bytes, &hint)?;

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let text = doc.plain_text();
    let stats = serde_json::json!({
        "paragraphs": doc.paragraph_count(),
        "page_breaks": doc.page_break_count(),
        "words": text.split_whitespace().count(),
        "characters": text.chars().count(),
    });

    if let Some(map) = stats.as_object() {
        for (name, value) in map {
            println!("{}: {}", name.as_str().bold(), value);
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "dochtml".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document to HTML conversion tool");
    println!();
    println!("License: MIT");
}
