use std::process::Command;

use tracing::{debug, instrument};

use super::CommandRunner;

/// Runs commands through `sh -c`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    #[instrument(skip(self))]
    fn run(&self, command: &str) -> anyhow::Result<String> {
        let output = Command::new("sh").arg("-c").arg(command).output()?;

        if !output.status.success() {
            debug!("command exited with {}", output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_output() {
        let output = ShellRunner.run("printf '  hello\\n\\n'").unwrap();
        assert_eq!(output, "hello");
    }

    #[test]
    fn test_fallback_in_command_line() {
        let output = ShellRunner.run("false || echo 'unknown'").unwrap();
        assert_eq!(output, "unknown");
    }
}
