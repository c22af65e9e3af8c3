/// Compiler argument construction.
///
/// Turns a parsed [`ProjectConfig`] plus its [`ProjectContext`] into the exact
/// argument vector handed to the compiler.  The order is fixed:
///
/// ```text
/// <compiler> [-ndebug] [-meta-info] (-I <dir>)* [-triple <triple>] -o <output> <entry>
/// ```
///
/// Debug builds are expressed by leaving out `-ndebug`; there is no `-debug`
/// flag.  Include directories and the entry point are rewritten relative to
/// the project root, because the compiler runs with the root as its working
/// directory.  The output path is passed through untouched.
use std::fmt;

use crate::config::ProjectConfig;
use crate::project::ProjectContext;
use crate::settings;
use crate::util::make_relative_to;

/// An ordered compiler command line: program first, then its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInvocation(Vec<String>);

impl CompilerInvocation {
    /// The executable to launch.
    pub fn program(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    /// Everything after the program.
    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for CompilerInvocation {
    fn from(argv: Vec<String>) -> Self {
        Self(argv)
    }
}

/// Shell-like rendering for logs: arguments containing whitespace are
/// wrapped in double quotes.
impl fmt::Display for CompilerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if arg.chars().any(char::is_whitespace) {
                write!(f, "\"{arg}\"")?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// Build the compiler invocation for `config`.
///
/// Pure: the same inputs always give the same argument vector.  Fields absent
/// from `config` are taken from the context's settings scope.
pub fn build(config: &ProjectConfig, context: &ProjectContext) -> CompilerInvocation {
    let root = &context.workspace_root;

    let compiler_path = config
        .compiler_path
        .clone()
        .unwrap_or_else(|| settings::compiler_path(context.settings.as_ref()));
    let include_paths = config
        .include_paths
        .clone()
        .unwrap_or_else(|| settings::include_paths(context.settings.as_ref()));
    let debug = config.debug.unwrap_or(false);
    let meta_info = config.meta_info.unwrap_or(false);

    let mut args = vec![compiler_path];

    if !debug {
        args.push("-ndebug".to_string());
    }

    if meta_info {
        args.push("-meta-info".to_string());
    }

    for include in &include_paths {
        args.push("-I".to_string());
        args.push(make_relative_to(root, include));
    }

    if let Some(triple) = config.triple.as_deref().filter(|t| !t.is_empty()) {
        args.push("-triple".to_string());
        args.push(triple.to_string());
    }

    args.push("-o".to_string());
    args.push(config.output.clone());
    args.push(make_relative_to(root, &config.entry_point));

    CompilerInvocation(args)
}
