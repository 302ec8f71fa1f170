use msexp::experiment::{ElementValue, Experiment, LinkWith};
use msexp::registry::SubsetBy;
use serde::{Deserialize, Serialize};
use std::{env, fs};

const DEFAULT_STATE_PATH: &str = ".msexp_state.json";

/// JSON body of the `link` command, one calling convention per request:
/// explicit index pairs or a declarative join expression.
#[derive(Deserialize)]
struct LinkRequest {
    target: String,
    #[serde(default)]
    sample_index: Option<Vec<usize>>,
    #[serde(default)]
    with_index: Option<Vec<usize>>,
    #[serde(default)]
    join: Option<String>,
    #[serde(default)]
    subset_by: Option<u8>,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  msexp_cli --version\n  \
  msexp_cli [--state PATH] summary\n  \
  msexp_cli [--state PATH] import-samples PATH [DELIMITER]\n  \
  msexp_cli [--state PATH] link '<link-json>'\n  \
  msexp_cli [--state PATH] extract 2,1,2\n  \
  msexp_cli [--state PATH] get ADDRESS\n  \
  msexp_cli [--state PATH] set ADDRESS '<element-json>'\n  \
  msexp_cli [--state PATH] sample-index first|all\n  \
  msexp_cli [--state PATH] export-state PATH\n  \
  msexp_cli [--state PATH] import-state PATH\n\n  \
  Tip: pass @file.json instead of inline JSON"
    );
}

fn load_json_arg(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix('@') {
        fs::read_to_string(path).map_err(|e| format!("Could not read JSON file '{path}': {e}"))
    } else {
        Ok(value.to_string())
    }
}

fn load_state(path: &str) -> Result<Experiment, String> {
    if std::path::Path::new(path).exists() {
        Experiment::load_from_path(path).map_err(|e| e.to_string())
    } else {
        Ok(Experiment::new())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn parse_global_state_arg(args: &[String]) -> (String, usize) {
    if args.len() >= 3 && args[1] == "--state" {
        return (args[2].clone(), 3);
    }
    (DEFAULT_STATE_PATH.to_string(), 1)
}

fn parse_indices(text: &str) -> Result<Vec<usize>, String> {
    text.split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|e| format!("Bad sample index '{part}': {e}"))
        })
        .collect()
}

fn link_with(request: &LinkRequest) -> Result<LinkWith, String> {
    match (&request.join, &request.sample_index, &request.with_index) {
        (Some(join), None, None) => Ok(LinkWith::Join(join.clone())),
        (None, Some(sample_index), Some(with_index)) => Ok(LinkWith::Indices {
            sample_index: sample_index.clone(),
            with_index: with_index.clone(),
        }),
        _ => Err(
            "Link request needs either 'join' or both 'sample_index' and 'with_index'".to_string(),
        ),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        return Err("Missing command".to_string());
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("msexp_cli v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (state_path, cmd_idx) = parse_global_state_arg(&args);
    if args.len() <= cmd_idx {
        usage();
        return Err("Missing command".to_string());
    }

    let command = &args[cmd_idx];

    match command.as_str() {
        "summary" => {
            let experiment = load_state(&state_path)?;
            print_json(&experiment.summary())
        }
        "import-samples" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err("Missing sample sheet path".to_string());
            }
            let source = &args[cmd_idx + 1];
            let delimiter = match args.get(cmd_idx + 2).map(|s| s.as_str()) {
                None | Some("\\t") | Some("tab") => b'\t',
                Some(text) if text.len() == 1 => text.as_bytes()[0],
                Some(text) => return Err(format!("Bad delimiter '{text}'")),
            };
            let mut experiment = load_state(&state_path)?;
            let samples = Experiment::from_sample_sheet(source, delimiter)
                .map_err(|e| e.to_string())?
                .sample_data;
            let n_samples = samples.n_rows();
            experiment.sample_data = samples;
            experiment
                .save_to_path(&state_path)
                .map_err(|e| e.to_string())?;
            println!("Imported {n_samples} samples from '{source}' into '{state_path}'");
            Ok(())
        }
        "link" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err("Missing link JSON".to_string());
            }
            let json = load_json_arg(&args[cmd_idx + 1])?;
            let request: LinkRequest =
                serde_json::from_str(&json).map_err(|e| format!("Invalid link JSON: {e}"))?;
            let with = link_with(&request)?;
            let subset_by = match request.subset_by {
                None => None,
                Some(tag) => Some(
                    SubsetBy::from_tag(tag).ok_or_else(|| format!("Bad subset_by tag {tag}"))?,
                ),
            };
            let experiment = load_state(&state_path)?;
            let linked = experiment
                .add_link(&request.target, with, subset_by)
                .map_err(|e| e.to_string())?;
            linked
                .save_to_path(&state_path)
                .map_err(|e| e.to_string())?;
            print_json(&linked.summary())
        }
        "extract" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err("Missing sample indices".to_string());
            }
            let indices = parse_indices(&args[cmd_idx + 1])?;
            let experiment = load_state(&state_path)?;
            let subset = experiment
                .extract_samples(&indices)
                .map_err(|e| e.to_string())?;
            subset
                .save_to_path(&state_path)
                .map_err(|e| e.to_string())?;
            print_json(&subset.summary())
        }
        "get" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err("Missing address".to_string());
            }
            let experiment = load_state(&state_path)?;
            let element = experiment
                .get_element(&args[cmd_idx + 1])
                .map_err(|e| e.to_string())?;
            print_json(&element)
        }
        "set" => {
            if args.len() <= cmd_idx + 2 {
                usage();
                return Err("set requires: ADDRESS '<element-json>'".to_string());
            }
            let address = &args[cmd_idx + 1];
            let json = load_json_arg(&args[cmd_idx + 2])?;
            let value: ElementValue =
                serde_json::from_str(&json).map_err(|e| format!("Invalid element JSON: {e}"))?;
            let experiment = load_state(&state_path)?;
            let updated = experiment
                .set_element(address, value)
                .map_err(|e| e.to_string())?;
            updated
                .save_to_path(&state_path)
                .map_err(|e| e.to_string())?;
            println!("Set '{address}' in '{state_path}'");
            Ok(())
        }
        "sample-index" => {
            let mode = args.get(cmd_idx + 1).map(|s| s.as_str()).unwrap_or("first");
            let experiment = load_state(&state_path)?;
            match mode {
                "first" => {
                    let lookup = experiment.spectra_sample_index();
                    for warning in &lookup.warnings {
                        eprintln!("Warning: {warning}");
                    }
                    print_json(&lookup.owners)
                }
                "all" => print_json(&experiment.spectra_sample_sets()),
                _ => Err(format!("Unknown mode '{mode}', expected 'first' or 'all'")),
            }
        }
        "import-state" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err(format!("Missing path for {command}"));
            }
            let source = &args[cmd_idx + 1];
            let experiment = Experiment::load_from_path(source).map_err(|e| e.to_string())?;
            experiment
                .save_to_path(&state_path)
                .map_err(|e| e.to_string())?;
            println!("Loaded experiment from '{source}' into '{state_path}'");
            Ok(())
        }
        "export-state" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err(format!("Missing path for {command}"));
            }
            let target = &args[cmd_idx + 1];
            let experiment = load_state(&state_path)?;
            experiment.save_to_path(target).map_err(|e| e.to_string())?;
            println!("Saved experiment from '{state_path}' to '{target}'");
            Ok(())
        }
        _ => {
            usage();
            Err(format!("Unknown command '{command}'"))
        }
    }
}
