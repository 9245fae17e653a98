use clap::Parser;
use earnings_context::text::{DEFAULT_TRANSCRIPT_SEPARATORS, TranscriptSplitter};
use std::fs;
use std::io::{self, Read};

/// A CLI tool to chunk transcript text into JSON output using earnings-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Source identifier attached to every chunk.
    #[arg(short, long, default_value = "unknown_source")]
    source: String,

    /// Maximum length for each text chunk, in bytes.
    #[arg(short = 'c', long, default_value_t = 1000)]
    chunk_size: usize,

    /// Overlap between consecutive chunks, in bytes.
    #[arg(short = 'o', long, default_value_t = 200)]
    overlap: usize,

    /// Comma-separated list of regex patterns for separators.
    /// Defaults to the transcript separators if not provided.
    #[arg(short = 'd', long, value_delimiter = ',')]
    separators: Option<Vec<String>>,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let text = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let separator_patterns_owned: Vec<String> = if let Some(s) = args.separators {
        s
    } else {
        DEFAULT_TRANSCRIPT_SEPARATORS
            .iter()
            .map(|&s| s.to_string())
            .collect()
    };

    let separator_patterns_refs: Vec<&str> = separator_patterns_owned
        .iter()
        .map(|s| s.as_str())
        .collect();

    let splitter = TranscriptSplitter::new(&separator_patterns_refs, args.chunk_size, args.overlap);
    let chunks = splitter.split(&args.source, &text);

    let json_output = serde_json::to_string_pretty(&chunks)?;
    println!("{}", json_output);

    Ok(())
}
