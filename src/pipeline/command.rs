/// Equivalent command lines for the reproducibility log
///
/// Each step that touches a file is logged together with the `mrc2tiff`
/// invocation that reproduces it, so an exported shell script can replay a
/// whole session without the original configuration file.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Builder for a single command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub description: String,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            description: String::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Push `flag` only when `enabled`.
    pub fn flag(self, flag: &str, enabled: bool) -> Self {
        if enabled {
            self.arg(flag)
        } else {
            self
        }
    }

    /// Push `flag value`.
    pub fn option(self, flag: &str, value: impl ToString) -> Self {
        self.arg(flag).arg(value.to_string())
    }

    pub fn describe(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    /// Build the command string for logging/display
    pub fn to_command_string(&self) -> String {
        let mut parts = vec![shell_quote(&self.program)];
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

/// Single-quote `arg` when a POSIX shell would otherwise split or expand it.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cmd = ToolCommand::new("mrc2tiff")
            .arg("convert")
            .path(Path::new("/data/a.mrc"))
            .option("-o", "/out")
            .flag("--denoise", true)
            .flag("--smooth", false)
            .describe("convert one file");
        assert_eq!(
            cmd.to_command_string(),
            "mrc2tiff convert /data/a.mrc -o /out --denoise"
        );
        assert_eq!(cmd.description, "convert one file");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(shell_quote("plain-name_1.mrc"), "plain-name_1.mrc");
        assert_eq!(shell_quote("with space.mrc"), "'with space.mrc'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(
            ToolCommand::new("mrcheader").arg("a b").arg("--json").to_command_string(),
            "mrcheader 'a b' --json"
        );
    }
}
