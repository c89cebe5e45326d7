use taskexec::task::{TaskConfiguration, TaskConfigurationBuilder};

/// Shell used by tests. Always present on Unix.
pub const SH: &str = "/bin/sh";

/// PATH handed to test tasks; the executor does not inherit ours.
pub const TEST_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Builder for `/bin/sh -c <script>` with a usable PATH.
pub fn sh(script: &str) -> TaskConfigurationBuilder {
    TaskConfiguration::builder(SH)
        .program_name("sh-test")
        .arg("-c")
        .arg(script)
        .env("PATH", TEST_PATH)
}

/// `sh(script)` built with default settings.
pub fn sh_task(script: &str) -> TaskConfiguration {
    sh(script).build().expect("test shell task must be valid")
}

/// Builder for task file TOML text.
pub struct TaskTomlBuilder {
    task: Vec<String>,
    environment: Vec<String>,
    io: Vec<String>,
}

impl TaskTomlBuilder {
    pub fn new(launch_path: &str) -> Self {
        Self {
            task: vec![format!("launch_path = {launch_path:?}")],
            environment: Vec::new(),
            io: Vec::new(),
        }
    }

    pub fn program_name(mut self, name: &str) -> Self {
        self.task.push(format!("program_name = {name:?}"));
        self
    }

    pub fn arguments(mut self, args: &[&str]) -> Self {
        self.task.push(format!("arguments = {args:?}"));
        self
    }

    pub fn acceptable_exit_codes(mut self, codes: &[i32]) -> Self {
        self.task.push(format!("acceptable_exit_codes = {codes:?}"));
        self
    }

    pub fn grace_period(mut self, duration: &str) -> Self {
        self.task.push(format!("grace_period = {duration:?}"));
        self
    }

    pub fn timeout(mut self, duration: &str) -> Self {
        self.task.push(format!("timeout = {duration:?}"));
        self
    }

    pub fn working_directory(mut self, dir: &str) -> Self {
        self.task.push(format!("working_directory = {dir:?}"));
        self
    }

    pub fn inherit_environment(mut self, val: bool) -> Self {
        self.task.push(format!("inherit_environment = {val}"));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.environment.push(format!("{key} = {value:?}"));
        self
    }

    /// Raw `key = value` line for `[task.io]`.
    pub fn io(mut self, line: &str) -> Self {
        self.io.push(line.to_string());
        self
    }

    pub fn build(self) -> String {
        let mut out = String::from("[task]\n");
        for line in &self.task {
            out.push_str(line);
            out.push('\n');
        }
        if !self.environment.is_empty() {
            out.push_str("\n[task.environment]\n");
            for line in &self.environment {
                out.push_str(line);
                out.push('\n');
            }
        }
        if !self.io.is_empty() {
            out.push_str("\n[task.io]\n");
            for line in &self.io {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}
