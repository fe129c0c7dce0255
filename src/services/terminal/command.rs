//! Child command description

use std::path::PathBuf;

use portable_pty::CommandBuilder;

/// What an embedded terminal runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl TerminalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Look up an environment override by name
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Human-readable command line, for logs
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the portable-pty command, advertising `term` as `TERM`.
    pub fn to_command_builder(&self, term: &str) -> CommandBuilder {
        let mut cmd = CommandBuilder::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.working_dir {
            cmd.cwd(dir);
        }
        cmd.env("TERM", term);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args_and_env() {
        let cmd = TerminalCommand::new("gh")
            .arg("dash")
            .args(["--config", "/tmp/x.yml"])
            .env("A", "1")
            .env("A", "2");

        assert_eq!(cmd.program, "gh");
        assert_eq!(cmd.args, vec!["dash", "--config", "/tmp/x.yml"]);
        assert_eq!(cmd.env_var("A"), Some("2"));
        assert_eq!(cmd.env_var("B"), None);
        assert_eq!(cmd.display(), "gh dash --config /tmp/x.yml");
    }

    #[test]
    fn test_command_builder_sets_term_and_cwd() {
        let cmd = TerminalCommand::new("lazygit")
            .working_dir(Some(PathBuf::from("/tmp")))
            .env("LG_CONFIG_FILE", "/tmp/lg.yml");

        let builder = cmd.to_command_builder("xterm-256color");
        assert_eq!(
            builder.get_env("TERM").and_then(|v| v.to_str()),
            Some("xterm-256color")
        );
        assert_eq!(
            builder.get_env("LG_CONFIG_FILE").and_then(|v| v.to_str()),
            Some("/tmp/lg.yml")
        );
        assert_eq!(
            builder.get_cwd().and_then(|v| v.to_str()),
            Some("/tmp")
        );
    }
}
