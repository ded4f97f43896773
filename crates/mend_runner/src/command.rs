//! Command descriptions.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A subprocess to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
        }
    }

    /// A command line interpreted by the platform shell.
    pub fn shell(line: impl Into<String>) -> Self {
        if cfg!(windows) {
            Self::new("cmd").arg("/C").arg(line)
        } else {
            Self::new("sh").arg("-c").arg(line)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Format the command for logging.
    pub fn display(&self) -> String {
        let mut cmd = self.program.clone();
        for arg in &self.args {
            if arg.contains(' ') || arg.contains('=') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_spaced_args() {
        let spec = CommandSpec::new("mend").arg("prophet-scan").arg("/srv/my app");
        assert_eq!(spec.display(), "mend prophet-scan '/srv/my app'");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_spec() {
        let spec = CommandSpec::shell("npm run build");
        assert_eq!(spec.program, "sh");
        assert_eq!(spec.args, vec!["-c", "npm run build"]);
    }
}
