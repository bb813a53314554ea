use ulisp::config::Config;
use ulisp::eval::Machine;
use ulisp::repl;
use ulisp::stream::Console;

fn main() {
    env_logger::init();

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Process command-line flags
    let args: Vec<String> = std::env::args().collect();
    let mut load_files: Vec<String> = Vec::new();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--load" => {
                if i + 1 < args.len() {
                    load_files.push(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("--load requires a file path");
                    std::process::exit(1);
                }
            }
            "--workspace" => {
                let Some(size) = args.get(i + 1) else {
                    eprintln!("--workspace requires a cell count");
                    std::process::exit(1);
                };
                if let Err(e) = config.set_workspace(size) {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
                i += 2;
            }
            "--echo" => {
                config.echo = true;
                i += 1;
            }
            "--quiet" => {
                config = config.quiet();
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: ulisp [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --workspace <n>  Size of the cell arena (default 1000)");
                println!("  --echo           Echo input characters as they are read");
                println!("  --quiet          No banner and no free-space prompt");
                println!("  --load <file>    Evaluate a source file before starting the REPL");
                println!("  --help, -h       Show this help message");
                println!();
                println!("Environment variables:");
                println!("  ULISP_WORKSPACE=<n>  Default arena size");
                println!("  ULISP_ECHO=1         Echo input");
                println!("  RUST_LOG=debug       Log collections and restarts");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("Try 'ulisp --help' for usage information.");
                std::process::exit(1);
            }
        }
    }

    let mut machine = match Machine::new(config, Console::stdio()) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to initialize machine: {}", e);
            std::process::exit(1);
        }
    };

    for path in &load_files {
        if let Err(e) = repl::load_file(&mut machine, path) {
            eprintln!("Error loading {}: {}", path, e);
            std::process::exit(1);
        }
    }

    if let Err(e) = repl::run(&mut machine) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
