//! Matte compiler library.
//!
//! Drives the pipeline: parse (scanner + parser) → semantic passes
//! (concatenation simplification, symbol initialization, resolution) →
//! C emission → the selected output mode. The three output modes share
//! one emitted translation unit: write it to disk, hand it to the host C
//! compiler, or compile it to a shared object and run it in-process.
//!
//! The runtime staticlib is embedded at build time (see `build.rs`) so a
//! `mattec` binary is self-contained; it is extracted next to the
//! temporary C file when linking.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod symbols;
pub mod token;

pub use codegen::{CodeGen, CodeGenError};
pub use config::{CompileMode, CompilerConfig};
pub use parser::Parser;
pub use scanner::Scanner;
pub use symbols::{SymbolTable, SymbolType};
pub use token::Tok;

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use matte_core::error;
use matte_core::except::{self, ids};
use tracing::debug;

/// Embedded runtime library (built by build.rs).
static RUNTIME_LIB: &[u8] = include_bytes!(env!("MATTE_RUNTIME_LIB_PATH"));

/// The compiler driver: accumulates sources and configuration, then
/// executes the pipeline.
pub struct Compiler {
    pub config: CompilerConfig,
    parser: Parser,
    sources: Vec<PathBuf>,
    errs: usize,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Compiler {
        Compiler { config, parser: Parser::new(), sources: Vec::new(), errs: 0 }
    }

    pub fn set_mode(&mut self, mode: CompileMode) {
        self.config.mode = mode;
        if mode == CompileMode::ToMem {
            self.config.output = None;
        }
    }

    pub fn set_outfile(&mut self, fname: impl Into<PathBuf>) {
        self.config.output = Some(fname.into());
    }

    pub fn add_cflag(&mut self, flag: impl Into<String>) {
        self.config.cflags.push(flag.into());
    }

    pub fn add_path(&mut self, dir: impl Into<PathBuf>) {
        self.config.search_paths.push(dir.into());
    }

    pub fn errors(&self) -> usize {
        self.errs + self.parser.errors()
    }

    /// Locate `fname` directly or through the search path.
    fn resolve_source(&self, fname: &str) -> PathBuf {
        let direct = PathBuf::from(fname);
        if direct.exists() {
            return direct;
        }
        for dir in &self.config.search_paths {
            let candidate = dir.join(fname);
            if candidate.exists() {
                return candidate;
            }
        }
        direct
    }

    /// Parse a source file into the shared tree.
    pub fn add_file(&mut self, fname: &str) -> bool {
        let path = self.resolve_source(fname);
        debug!(file = %path.display(), "parsing source file");
        if !self.parser.parse_file(&path.to_string_lossy()) {
            self.errs += 1;
            return false;
        }
        self.sources.push(path);
        true
    }

    /// Parse an in-memory string into the shared tree.
    pub fn add_string(&mut self, text: &str) -> bool {
        if !self.parser.parse_string(text) {
            self.errs += 1;
            return false;
        }
        true
    }

    /// Run the semantic passes and the emitter, returning the generated
    /// translation unit.
    pub fn emit(&mut self) -> Result<String, String> {
        let Some(tree) = self.parser.tree() else {
            error!(ids::COMPILER, "no input files supplied");
            return Err("no input files supplied".to_owned());
        };

        debug!("simplifying concatenations");
        resolver::simplify_concats(&mut self.parser.ast, Some(tree));

        debug!("initializing symbol tables");
        if !resolver::init_symbols(&mut self.parser.ast, Some(tree)) {
            return Err("symbol initialization failed".to_owned());
        }

        debug!("resolving symbols");
        if !resolver::resolve_symbols(&mut self.parser.ast, Some(tree)) {
            return Err("symbol resolution failed".to_owned());
        }

        debug!("emitting c source");
        let entry_point = self.config.mode != CompileMode::ToMem;
        CodeGen::new(&self.parser.ast, entry_point)
            .emit(tree)
            .map_err(|e| e.to_string())
    }

    /// Run the full pipeline and dispatch on the output mode.
    pub fn execute(&mut self) -> Result<(), String> {
        // The emitter runs unconditionally; emission-time diagnostics
        // land in the exception slot and are checked afterwards.
        let code = self.emit()?;

        if except::check() {
            return Err("compilation errors occured".to_owned());
        }

        match self.config.mode {
            CompileMode::ToC => self.compile_to_c(&code),
            CompileMode::ToExe => self.compile_to_exe(&code),
            CompileMode::ToMem => self.compile_to_mem(&code),
        }
    }

    /// Output filename, explicit or inferred from the last source.
    fn output_name(&self) -> PathBuf {
        if let Some(out) = &self.config.output {
            return out.clone();
        }

        let suffix = match self.config.mode {
            CompileMode::ToC => ".c",
            _ => "",
        };
        match self.sources.last() {
            Some(src) => {
                let name = src.to_string_lossy();
                let stem = name.strip_suffix(".m").unwrap_or(&name);
                PathBuf::from(format!("{stem}{suffix}"))
            }
            None => PathBuf::from(format!("matte{suffix}")),
        }
    }

    fn compile_to_c(&self, code: &str) -> Result<(), String> {
        let fname = self.output_name();
        fs::write(&fname, code)
            .map_err(|e| format!("unable to open '{}' for writing: {e}", fname.display()))
    }

    /// Extract the embedded runtime staticlib for linking.
    fn extract_runtime(&self) -> Result<PathBuf, String> {
        let path = std::env::temp_dir().join("libmatte_runtime.a");
        let mut file = fs::File::create(&path)
            .map_err(|e| format!("unable to extract runtime library: {e}"))?;
        file.write_all(RUNTIME_LIB)
            .map_err(|e| format!("unable to extract runtime library: {e}"))?;
        Ok(path)
    }

    fn host_compile(&self, args: &[&str]) -> Result<(), String> {
        let mut cc = Command::new(&self.config.cc);
        cc.args(&self.config.cflags);
        cc.args(args);
        debug!(cc = %self.config.cc, "invoking host c compiler");

        let output = cc
            .output()
            .map_err(|e| format!("failed to run {}: {e}", self.config.cc))?;
        if !output.status.success() {
            return Err(format!(
                "host compilation failed:\n{}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        Ok(())
    }

    fn compile_to_exe(&self, code: &str) -> Result<(), String> {
        let out = self.output_name();
        let runtime = self.extract_runtime()?;
        let libdir = runtime.parent().unwrap_or(Path::new("."));

        let tmp = tempfile::Builder::new()
            .prefix("matte")
            .suffix(".c")
            .tempfile()
            .map_err(|e| format!("unable to create temporary file: {e}"))?;
        fs::write(tmp.path(), code)
            .map_err(|e| format!("unable to write temporary file: {e}"))?;

        let result = self.host_compile(&[
            &tmp.path().to_string_lossy(),
            "-o",
            &out.to_string_lossy(),
            "-L",
            &libdir.to_string_lossy(),
            "-lmatte_runtime",
            "-lm",
            "-lpthread",
            "-ldl",
        ]);

        fs::remove_file(&runtime).ok();
        result
    }

    fn compile_to_mem(&self, code: &str) -> Result<(), String> {
        use std::ffi::CString;

        let runtime = self.extract_runtime()?;
        let libdir = runtime.parent().unwrap_or(Path::new("."));

        let tmp = tempfile::Builder::new()
            .prefix("matte")
            .suffix(".c")
            .tempfile()
            .map_err(|e| format!("unable to create temporary file: {e}"))?;
        fs::write(tmp.path(), code)
            .map_err(|e| format!("unable to write temporary file: {e}"))?;

        let so = tempfile::Builder::new()
            .prefix("matte")
            .suffix(".so")
            .tempfile()
            .map_err(|e| format!("unable to create temporary file: {e}"))?;

        let result = self.host_compile(&[
            "-fPIC",
            "-shared",
            "-o",
            &so.path().to_string_lossy(),
            &tmp.path().to_string_lossy(),
            "-L",
            &libdir.to_string_lossy(),
            "-lmatte_runtime",
            "-lm",
            "-lpthread",
            "-ldl",
        ]);
        fs::remove_file(&runtime).ok();
        result?;

        // load the module and run its main function
        let so_path = CString::new(so.path().to_string_lossy().as_bytes())
            .map_err(|e| format!("bad module path: {e}"))?;

        unsafe {
            let lib = libc::dlopen(so_path.as_ptr(), libc::RTLD_LAZY);
            if lib.is_null() {
                return Err(format!(
                    "unable to open '{}' into memory",
                    so.path().display()
                ));
            }

            let main_sym = libc::dlsym(lib, c"matte_main".as_ptr());
            let report_sym = libc::dlsym(lib, c"matte_report_result".as_ptr());
            if main_sym.is_null() || report_sym.is_null() {
                libc::dlclose(lib);
                return Err(format!(
                    "unable to open '{}' into memory",
                    so.path().display()
                ));
            }

            type MainFn = unsafe extern "C" fn(
                *mut libc::c_void,
                *mut libc::c_void,
            ) -> *mut libc::c_void;
            type ReportFn = unsafe extern "C" fn(*mut libc::c_void) -> libc::c_int;

            let main_fn: MainFn = std::mem::transmute(main_sym);
            let report_fn: ReportFn = std::mem::transmute(report_sym);

            let result = main_fn(std::ptr::null_mut(), std::ptr::null_mut());
            report_fn(result);

            libc::dlclose(lib);
        }

        Ok(())
    }
}
