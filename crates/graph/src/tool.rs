use crate::error::{GraphError, Result};
use buckify_protocol::{BuildTarget, RuleType};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Captured result of one build tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Diagnostics may land on either stream
    pub fn combined(&self) -> String {
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        format!("{}\n{}", self.stderr, self.stdout)
    }
}

/// The external build tool, as seen by the synthesizer
pub trait BuildTool {
    /// Build one target; a failing build is not an error
    fn build(&self, target: &BuildTarget) -> Result<ToolOutput>;

    /// All declared targets of the given rule types
    fn targets_of_type(&self, types: &[RuleType]) -> Result<Vec<BuildTarget>>;

    /// Location of a built target's output, if the tool reports one
    fn output_path(&self, target: &BuildTarget) -> Result<Option<PathBuf>>;

    /// Input files a target claims
    fn audit_inputs(&self, target: &BuildTarget) -> Result<Vec<String>>;

    /// Parse the whole build graph; cycles are reported as a failure
    fn check_graph(&self) -> Result<ToolOutput>;
}

/// Buck driven through its command line
#[derive(Debug, Clone)]
pub struct BuckCli {
    program: PathBuf,
    project_root: PathBuf,
}

impl BuckCli {
    pub fn new(program: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            project_root: project_root.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command_line(&self, args: &[&str]) -> String {
        format!("{} {}", self.program.display(), args.join(" "))
    }

    fn run(&self, args: &[&str]) -> Result<ToolOutput> {
        self.run_with_status(args).map(|(output, _)| output)
    }

    fn run_with_status(&self, args: &[&str]) -> Result<(ToolOutput, ExitStatus)> {
        log::debug!("Running `{}`", self.command_line(args));
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.project_root)
            .output()
            .map_err(|source| GraphError::ToolSpawn {
                command: self.command_line(args),
                source,
            })?;
        let captured = ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        Ok((captured, output.status))
    }

    /// Run and return stdout, failing on a non-zero exit
    fn checked(&self, args: &[&str]) -> Result<String> {
        let (output, status) = self.run_with_status(args)?;
        if !status.success() {
            return Err(GraphError::ToolFailed {
                command: self.command_line(args),
                status: status.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl Default for BuckCli {
    fn default() -> Self {
        Self::new("buck", ".")
    }
}

impl BuildTool for BuckCli {
    fn build(&self, target: &BuildTarget) -> Result<ToolOutput> {
        self.run(&["build", target.as_str()])
    }

    fn targets_of_type(&self, types: &[RuleType]) -> Result<Vec<BuildTarget>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["targets", "--type"];
        args.extend(types.iter().map(|rule_type| rule_type.as_str()));
        let stdout = self.checked(&args)?;
        Ok(parse_target_lines(&stdout))
    }

    fn output_path(&self, target: &BuildTarget) -> Result<Option<PathBuf>> {
        let stdout = self.checked(&["targets", "--show_output", target.as_str()])?;
        Ok(parse_show_output(&stdout).map(|path| self.project_root.join(path)))
    }

    fn audit_inputs(&self, target: &BuildTarget) -> Result<Vec<String>> {
        let stdout = self.checked(&["audit", "input", target.as_str()])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn check_graph(&self) -> Result<ToolOutput> {
        self.run(&["targets"])
    }
}

/// One target per line; anything else is skipped
pub fn parse_target_lines(stdout: &str) -> Vec<BuildTarget> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match BuildTarget::parse(line) {
            Ok(target) => Some(target),
            Err(err) => {
                log::debug!("Skipping target listing line '{line}': {err}");
                None
            }
        })
        .collect()
}

/// `<target> <output path>`; the second field of the first such line
pub fn parse_show_output(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .find_map(|line| line.split_whitespace().nth(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_target_listing() {
        let targets = parse_target_lines("//libs:guava\n\n//libs:support-v4\nnot a target\n");
        let ids: Vec<&str> = targets.iter().map(BuildTarget::as_str).collect();
        assert_eq!(ids, vec!["//libs:guava", "//libs:support-v4"]);
    }

    #[test]
    fn parses_show_output_path() {
        assert_eq!(
            parse_show_output("//libs:guava buck-out/gen/libs/guava.jar\n"),
            Some("buck-out/gen/libs/guava.jar")
        );
        assert_eq!(parse_show_output("//libs:guava\n"), None);
    }

    #[test]
    fn combined_output_keeps_both_streams() {
        let output = ToolOutput {
            success: false,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert_eq!(output.combined(), "err\nout");
        assert_eq!(ToolOutput::failed("err").combined(), "err");
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let buck = BuckCli::new("/nonexistent/buckify-test-buck", ".");
        let target = BuildTarget::parse("//a:a").unwrap();
        assert!(matches!(buck.build(&target), Err(GraphError::ToolSpawn { .. })));
    }
}
