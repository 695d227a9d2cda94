//! # Folio CLI
//!
//! Usage:
//!   folio input.json -o output.pdf
//!   echo '{ ... }' | folio > output.pdf
//!   folio template.json --vars data.json -o output.pdf
//!   folio --example > invoice.json
//!
//! Without `--vars` the input may be a bare descriptor or a
//! `{"pdf_template": ..., "pdfVars": ...}` envelope. With `--vars` the
//! input is raw template text resolved against the variables file.
//! `--strict` fails the build on any warning. Set `RUST_LOG` for more
//! detail than warnings.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;

use folio::error::FolioError;
use folio::{RenderOptions, Rendered};

struct Args {
    input: Option<String>,
    output: Option<String>,
    vars: Option<String>,
    strict: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let raw: Vec<String> = env::args().skip(1).collect();
    if raw.iter().any(|a| a == "--example") {
        print!("{}", example_envelope_json());
        return;
    }

    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("✗ {}", message);
            eprintln!("usage: folio [input.json] [-o output.pdf] [--vars vars.json] [--strict]");
            process::exit(2);
        }
    };

    match run(&args) {
        Ok(rendered) => {
            log::info!("{} warning(s)", rendered.diagnostics.len());
            if let Some(path) = &args.output {
                eprintln!("✓ Written {} bytes to {}", rendered.bytes.len(), path);
            }
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    }
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args {
        input: None,
        output: None,
        vars: None,
        strict: false,
    };
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                args.output = Some(iter.next().ok_or("-o needs a path")?.clone());
            }
            "--vars" => {
                args.vars = Some(iter.next().ok_or("--vars needs a path")?.clone());
            }
            "--strict" => args.strict = true,
            "-" => args.input = None,
            flag if flag.starts_with('-') => return Err(format!("unknown flag '{}'", flag)),
            path => {
                if args.input.is_some() {
                    return Err(format!("unexpected argument '{}'", path));
                }
                args.input = Some(path.to_string());
            }
        }
    }
    Ok(args)
}

fn run(args: &Args) -> Result<Rendered, FolioError> {
    let input = match &args.input {
        Some(path) => folio::template::load_file(path)?,
        None => folio::template::load_reader(io::stdin().lock())?,
    };
    let options = RenderOptions {
        strict: args.strict,
    };

    let rendered = match &args.vars {
        Some(path) => {
            let variables: serde_json::Value =
                serde_json::from_str(&folio::template::load_file(path)?)?;
            folio::render_template_with(&input, &variables, &options)?
        }
        None => folio::render_input_with(&input, &options)?,
    };

    match &args.output {
        Some(path) => fs::write(path, &rendered.bytes).map_err(|source| FolioError::Io {
            path: path.clone(),
            source,
        })?,
        None => io::stdout()
            .lock()
            .write_all(&rendered.bytes)
            .map_err(|source| FolioError::Io {
                path: "<stdout>".to_string(),
                source,
            })?,
    }
    Ok(rendered)
}

fn example_envelope_json() -> &'static str {
    r##"{
  "pdf_template": {
    "page": { "format": "A4", "orientation": "portrait", "margins": [15, 12, 15, 20] },
    "fonts": { "default": "Helvetica" },
    "elements": [
      { "type": "text", "content": "INVOICE {{invoice.number}}", "style": { "size": 20, "bold": true } },
      { "type": "text", "content": "{{company.name}}\n{{company.address}}", "style": { "color": "#666666" } },
      { "type": "line", "style": { "margin": [2, 0] } },
      {
        "type": "grid",
        "gridColumns": 2,
        "children": [
          { "type": "text", "content": "Bill to:\n{{customer.name}}" },
          { "type": "text", "content": "Due: {{invoice.due}}", "style": { "align": "right" } }
        ]
      },
      {
        "type": "table",
        "style": { "bold": true, "fill": true, "bgColor": "#eeeeee" },
        "columns": [
          { "header": "Item", "width": 100 },
          { "header": "Qty", "width": 30, "align": "right" },
          { "header": "Price", "width": 50, "align": "right" }
        ],
        "rows": "{{#items}}{\"cells\": [\"{{name}}\", \"{{qty}}\", \"{{price}}\"]}{{/items}}"
      },
      { "type": "space", "style": { "height": 6 } },
      { "type": "text", "content": "Total: {{invoice.total}}", "style": { "bold": true, "align": "right" } }
    ]
  },
  "pdfVars": {
    "company": { "name": "Acme Corp", "address": "123 Business St, San Francisco" },
    "customer": { "name": "Widget Industries" },
    "invoice": { "number": "INV-2026-001", "due": "2026-11-01", "total": 1249.5 },
    "items": [
      { "name": "Consulting", "qty": 10, "price": 99.95 },
      { "name": "Support plan", "qty": 1, "price": 250 }
    ]
  }
}
"##
}
