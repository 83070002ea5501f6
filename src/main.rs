//! MicroScript command-line host.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use microscript::bytecode::disasm::print_bc;
use microscript::frontend::lines::LineScanner;
use microscript::{
    CompiledStream, DataAccess, DataAccessError, MemoryData, Value, Vm, VmConfig, compile,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// External variable whose writes are echoed to stdout.
const OUTPUT_VAR: &str = "out";

#[derive(Parser)]
#[command(name = "microscript")]
#[command(version)]
#[command(about = "MicroScript - compile and run line-oriented stack scripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a script
    Run {
        /// Script file (.ms)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the disassembly before running
        #[arg(long)]
        disasm: bool,

        #[command(flatten)]
        exec: ExecArgs,
    },

    /// Compile a script and report faults without running it
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the compiled instruction stream
    Disasm {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Compile a script to its binary form
    Build {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file (defaults to FILE with a .msc extension)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Run a stream produced by `build`
    Exec {
        #[arg(value_name = "BYTECODE")]
        file: PathBuf,

        #[command(flatten)]
        exec: ExecArgs,
    },
}

#[derive(Args)]
struct ExecArgs {
    /// Seed an external variable (number, true/false, or text)
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    vars: Vec<(String, Value)>,

    /// Data stack capacity [env: MICROSCRIPT_STACK_CAPACITY]
    #[arg(long)]
    stack_capacity: Option<usize>,

    /// Abort after this many executed instructions [env: MICROSCRIPT_MAX_STEPS]
    #[arg(long)]
    max_steps: Option<usize>,
}

impl ExecArgs {
    fn config(&self) -> VmConfig {
        let mut config = VmConfig::from_env();
        if let Some(capacity) = self.stack_capacity {
            config.stack_capacity = capacity;
        }
        if self.max_steps.is_some() {
            config.max_steps = self.max_steps;
        }
        config
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "microscript=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run { file, disasm, exec } => {
            let stream = compile_file(&file)?;
            if disasm {
                print_bc(&stream);
            }
            execute(&stream, &exec)
        }
        Commands::Check { file } => {
            let stream = compile_file(&file)?;
            println!("{}: ok ({} instructions)", file.display(), stream.len());
            Ok(())
        }
        Commands::Disasm { file } => {
            print_bc(&compile_file(&file)?);
            Ok(())
        }
        Commands::Build { file, output } => {
            let stream = compile_file(&file)?;
            let output = output.unwrap_or_else(|| file.with_extension("msc"));
            let bytes = stream
                .to_bytes()
                .map_err(|e| anyhow!("failed to encode stream: {}", e))?;
            fs::write(&output, &bytes)
                .with_context(|| format!("failed to write '{}'", output.display()))?;
            println!("wrote {} ({} bytes)", output.display(), bytes.len());
            Ok(())
        }
        Commands::Exec { file, exec } => {
            let bytes =
                fs::read(&file).with_context(|| format!("failed to read '{}'", file.display()))?;
            let stream = CompiledStream::from_bytes(&bytes)
                .map_err(|e| anyhow!("'{}' is not a compiled stream: {}", file.display(), e))?;
            execute(&stream, &exec)
        }
    }
}

fn compile_file(path: &Path) -> Result<CompiledStream> {
    if path.extension().and_then(|e| e.to_str()) != Some("ms") {
        debug!(path = %path.display(), "script without .ms extension");
    }
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    compile(&source).map_err(|e| {
        let excerpt = source_excerpt(&source, e.line()).unwrap_or_default();
        anyhow!("compile error in '{}': {}{}", path.display(), e, excerpt)
    })
}

/// The reported source line as `  <n> | <text>` on a line of its own.
fn source_excerpt(source: &str, line: Option<usize>) -> Option<String> {
    let number = line?;
    LineScanner::new(source)
        .find(|l| l.number == number)
        .map(|l| format!("\n  {} | {}", number, l.text.trim()))
}

fn execute(stream: &CompiledStream, exec: &ExecArgs) -> Result<()> {
    let mut data = ConsoleData::default();
    for (name, value) in &exec.vars {
        data.vars.insert(name.as_str(), value.clone());
    }

    let vm = Vm::with_config(exec.config());
    let result = vm.run(stream, &mut data);

    if let Some(error) = result.error() {
        bail!("runtime error: {}", error);
    }
    if let Some(value) = result.result() {
        println!("{}", value);
    }
    Ok(())
}

/// `--var name=value`
fn parse_var(arg: &str) -> Result<(String, Value), String> {
    let Some((name, raw)) = arg.split_once('=') else {
        return Err(format!("expected NAME=VALUE, got `{}`", arg));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err("variable name is empty".to_string());
    }
    Ok((name.to_string(), parse_value(raw)))
}

fn parse_value(raw: &str) -> Value {
    if let Ok(n) = raw.trim().parse::<f64>() {
        return Value::Number(n);
    }
    match raw.trim() {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::from(raw),
    }
}

/// Host variables for CLI runs. Writes to `out` are printed as they happen.
#[derive(Default)]
struct ConsoleData {
    vars: MemoryData,
}

impl DataAccess for ConsoleData {
    fn get_data(&mut self, name: &str) -> Result<Value, DataAccessError> {
        self.vars.get_data(name)
    }

    fn set_data(&mut self, name: &str, value: Value) -> Result<(), DataAccessError> {
        if name == OUTPUT_VAR {
            println!("{}", value);
        }
        self.vars.set_data(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var("a=2.5"), Ok(("a".to_string(), Value::Number(2.5))));
        assert_eq!(parse_var("flag=true"), Ok(("flag".to_string(), Value::Boolean(true))));
        assert_eq!(parse_var("s=hi there"), Ok(("s".to_string(), Value::from("hi there"))));
        assert_eq!(parse_var("e="), Ok(("e".to_string(), Value::from(""))));
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=3").is_err());
    }

    #[test]
    fn test_compile_error_excerpt() {
        let source = "push #1\r\n\r\n   frob $x\n";
        let err = compile(source).unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert_eq!(
            source_excerpt(source, err.line()),
            Some("\n  3 | frob $x".to_string())
        );
        assert_eq!(source_excerpt(source, None), None);
    }

    #[test]
    fn test_cli_shape() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from([
            "microscript", "run", "sum.ms", "--var", "a=1", "--var", "b=2", "--max-steps", "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { exec, disasm, .. } => {
                assert!(!disasm);
                assert_eq!(exec.vars.len(), 2);
                assert_eq!(exec.config().max_steps, Some(10));
            }
            _ => panic!("expected run"),
        }
    }
}
