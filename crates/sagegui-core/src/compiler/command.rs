use std::fmt::Display;

/// Structured tool invocation. Text is only produced by [`CommandLine::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    passthrough: Option<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            passthrough: None,
        }
    }

    pub fn flag(&mut self, flag: &str) -> &mut Self {
        self.args.push(flag.to_string());
        self
    }

    pub fn option(&mut self, flag: &str, value: impl Display) -> &mut Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    pub fn arg(&mut self, value: impl Into<String>) -> &mut Self {
        self.args.push(value.into());
        self
    }

    /// Free-form user options appended verbatim after every structured argument.
    pub fn passthrough(&mut self, extra: &str) -> &mut Self {
        let trimmed = extra.trim();
        self.passthrough = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn passthrough_text(&self) -> Option<&str> {
        self.passthrough.as_deref()
    }

    pub fn count(&self, flag: &str) -> usize {
        self.args.iter().filter(|a| *a == flag).count()
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.count(flag) > 0
    }

    /// Values following each occurrence of `flag`.
    pub fn values_of(&self, flag: &str) -> Vec<&str> {
        self.args
            .windows(2)
            .filter(|pair| pair[0] == flag)
            .map(|pair| pair[1].as_str())
            .collect()
    }

    pub fn render(&self) -> String {
        let mut line = shell_quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        if let Some(extra) = &self.passthrough {
            line.push(' ');
            line.push_str(extra);
        }
        line
    }
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
}

/// Quote a token for POSIX sh, leaving plain tokens untouched.
pub fn shell_quote(token: &str) -> String {
    if !token.is_empty() && token.chars().all(is_shell_safe) {
        return token.to_string();
    }
    format!("'{}'", token.replace('\'', r"'\''"))
}

/// Plain decimal rendering used for every numeric flag value.
pub fn decimal(value: f64) -> String {
    format!("{}", value)
}
