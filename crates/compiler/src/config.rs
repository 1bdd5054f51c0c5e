//! Compiler configuration.

use std::path::PathBuf;

/// Output mode of a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// Write the generated C source to disk.
    ToC,
    /// Compile the generated C to an executable.
    ToExe,
    /// Compile to a shared object, load it, and run it in-process.
    #[default]
    ToMem,
}

/// Driver configuration assembled from the command line and environment.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    pub mode: CompileMode,
    /// Output filename; inferred from the last source when empty.
    pub output: Option<PathBuf>,
    /// Flags forwarded verbatim to the host C compiler.
    pub cflags: Vec<String>,
    /// Directories searched for source files, `-P` plus `MATTEPATH`.
    pub search_paths: Vec<PathBuf>,
    /// Host C compiler binary.
    pub cc: String,
}

impl CompilerConfig {
    pub fn new() -> CompilerConfig {
        CompilerConfig {
            cc: std::env::var("MATTE_CC").unwrap_or_else(|_| "cc".to_owned()),
            ..CompilerConfig::default()
        }
    }

    /// Append the colon-separated `MATTEPATH` directories.
    pub fn with_env_path(mut self) -> CompilerConfig {
        if let Ok(path) = std::env::var("MATTEPATH") {
            for dir in path.split(':').filter(|d| !d.is_empty()) {
                self.search_paths.push(PathBuf::from(dir));
            }
        }
        self
    }
}
