//! Matte compiler CLI.
//!
//! `mattec` accepts host-compiler pass-through flags alongside its own:
//!
//! ```text
//! mattec prog.m              # compile and run in memory
//! mattec -o prog prog.m     # compile to an executable
//! mattec -c -O2 prog.m      # emit prog.c, forwarding -O2 at link time
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use mattec::{CompileMode, Compiler, CompilerConfig};

#[derive(ClapParser)]
#[command(name = "mattec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Matte compiler - compile .m programs to C, executables, or memory", long_about = None)]
struct Cli {
    /// Forward debug information to the host C compiler
    #[arg(short = 'g')]
    debug: bool,

    /// Forward a codegen flag (-f<OPT>) to the host C compiler
    #[arg(short = 'f', value_name = "OPT", action = clap::ArgAction::Append)]
    codegen_flags: Vec<String>,

    /// Forward a machine flag (-m<OPT>) to the host C compiler
    #[arg(short = 'm', value_name = "OPT", action = clap::ArgAction::Append)]
    machine_flags: Vec<String>,

    /// Forward an optimization level (-O<N>) to the host C compiler
    #[arg(short = 'O', value_name = "LEVEL", action = clap::ArgAction::Append)]
    opt_flags: Vec<String>,

    /// Forward a warning flag (-W<OPT>) to the host C compiler
    #[arg(short = 'W', value_name = "OPT", action = clap::ArgAction::Append)]
    warn_flags: Vec<String>,

    /// Forward a library directory (-L<DIR>) to the host C compiler
    #[arg(short = 'L', value_name = "DIR", action = clap::ArgAction::Append)]
    lib_dirs: Vec<String>,

    /// Forward an include directory (-I<DIR>) to the host C compiler
    #[arg(short = 'I', value_name = "DIR", action = clap::ArgAction::Append)]
    include_dirs: Vec<String>,

    /// Append a directory to the source search path
    #[arg(short = 'P', value_name = "PATH", action = clap::ArgAction::Append)]
    search_paths: Vec<PathBuf>,

    /// Write generated C source instead of compiling it
    #[arg(short = 'c')]
    emit_c: bool,

    /// Output filename (switches in-memory mode to executable mode)
    #[arg(short = 'o', value_name = "NAME")]
    output: Option<PathBuf>,

    /// Source files, compiled in order
    sources: Vec<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders help/version itself; everything else is an
            // unsupported-argument failure
            if e.use_stderr() {
                eprintln!("{e}");
                process::exit(1);
            }
            print!("{e}");
            process::exit(0);
        }
    };

    let mut config = CompilerConfig::new().with_env_path();
    if cli.debug {
        config.cflags.push("-g".to_owned());
    }
    for (prefix, flags) in [
        ("-f", &cli.codegen_flags),
        ("-m", &cli.machine_flags),
        ("-O", &cli.opt_flags),
        ("-W", &cli.warn_flags),
        ("-L", &cli.lib_dirs),
        ("-I", &cli.include_dirs),
    ] {
        for flag in flags {
            config.cflags.push(format!("{prefix}{flag}"));
        }
    }
    config.search_paths.extend(cli.search_paths);

    let mut compiler = Compiler::new(config);

    if cli.emit_c {
        compiler.set_mode(CompileMode::ToC);
    }
    if let Some(output) = cli.output {
        if compiler.config.mode == CompileMode::ToMem {
            compiler.set_mode(CompileMode::ToExe);
        }
        compiler.set_outfile(output);
    }

    for source in &cli.sources {
        if !compiler.add_file(&source.to_string_lossy()) {
            dump_and_exit(&format!("failed to compile '{}'", source.display()));
        }
    }

    if let Err(msg) = compiler.execute() {
        dump_and_exit(&msg);
    }
}

/// Print the pending exception (if any) and the failure message, then
/// exit with status 1.
fn dump_and_exit(msg: &str) -> ! {
    if let Some(e) = matte_core::except::take() {
        eprintln!("{e}");
    }
    eprintln!("error: {msg}");
    process::exit(1);
}
