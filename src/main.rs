use std::env;
use std::fs;
use std::process;

use erdboard::catalog::Catalog;
use erdboard::store::FileStore;
use erdboard::svg::SvgRenderer;

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} <data-dir> <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  list                          List projects in the catalog");
    eprintln!("  create <name> [description]   Create a project");
    eprintln!("  delete <key>                  Delete a project");
    eprintln!("  export <key> [-o <file>]      Render a project to SVG (default: stdout)");
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage(args.first().map(String::as_str).unwrap_or("erdboard"));
    }

    let data_dir = &args[1];
    let command = args[2].as_str();
    let mut catalog = Catalog::new(FileStore::new(data_dir));

    match command {
        "list" => {
            let projects = match catalog.list() {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Failed to read catalog: {e}");
                    process::exit(1);
                }
            };
            if projects.is_empty() {
                println!("No projects.");
                return;
            }
            for p in projects {
                println!(
                    "{}  {}  ({} tables, updated {})",
                    p.key,
                    p.name,
                    p.tables.len(),
                    p.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        "create" => {
            let Some(name) = args.get(3) else {
                usage(&args[0]);
            };
            let description = args.get(4).map(String::as_str).unwrap_or("");
            match catalog.create(name, description) {
                Ok(p) => println!("{}", p.key),
                Err(e) => {
                    eprintln!("Failed to create project: {e}");
                    process::exit(1);
                }
            }
        }
        "delete" => {
            let Some(key) = args.get(3) else {
                usage(&args[0]);
            };
            if let Err(e) = catalog.delete(key) {
                eprintln!("Failed to delete {key}: {e}");
                process::exit(1);
            }
        }
        "export" => {
            let Some(key) = args.get(3) else {
                usage(&args[0]);
            };

            let mut output_path: Option<String> = None;
            let mut i = 4;
            while i < args.len() {
                match args[i].as_str() {
                    "-o" | "--output" => {
                        i += 1;
                        if i < args.len() {
                            output_path = Some(args[i].clone());
                        }
                    }
                    other => {
                        eprintln!("Unknown option: {other}");
                        process::exit(1);
                    }
                }
                i += 1;
            }

            let project = match catalog.get(key) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Failed to open {key}: {e}");
                    process::exit(1);
                }
            };
            let svg = SvgRenderer::default().render(&project);

            match output_path {
                Some(path) => {
                    if let Err(e) = fs::write(&path, &svg) {
                        eprintln!("Failed to write {path}: {e}");
                        process::exit(1);
                    }
                }
                None => print!("{svg}"),
            }
        }
        _ => {
            eprintln!("Unknown command: {command}");
            usage(&args[0]);
        }
    }
}
