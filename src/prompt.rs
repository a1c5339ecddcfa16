//! Interactive credential input for the login flow

use std::io::{self, BufRead, Write};

use console::Term;

use crate::error::{Error, Result};

/// Source of the one-time login code and the two-step password.
pub trait CredentialPrompt {
    fn code(&mut self) -> Result<String>;
    fn password(&mut self) -> Result<String>;
}

/// Reads the code from stdin and the password without echo.
///
/// The password prompt goes through stderr so stdout can be redirected to a log.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl CredentialPrompt for ConsolePrompt {
    fn code(&mut self) -> Result<String> {
        print!("Enter code: ");
        io::stdout().flush()?;

        let mut code = String::new();
        io::stdin().lock().read_line(&mut code)?;
        Ok(code.trim().to_string())
    }

    fn password(&mut self) -> Result<String> {
        read_password(&Term::stderr())
    }
}

/// Read a masked password from `term`.
///
/// `read_secure_line` returns an empty string without reading when `term` is
/// not a terminal, so that case is an error rather than an empty password.
pub fn read_password(term: &Term) -> Result<String> {
    if !term.is_term() {
        return Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "a terminal is required to enter the two-step verification password",
        )
        .into());
    }

    term.write_str("Password: ")?;
    let password = term.read_secure_line()?;
    if password.is_empty() {
        return Err(Error::Authentication("empty password".to_string()));
    }
    Ok(password)
}

/// Fixed answers, for driving the login flow without a terminal.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    code: String,
    password: Option<String>,
    pub code_calls: usize,
    pub password_calls: usize,
}

impl ScriptedPrompt {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }
}

impl CredentialPrompt for ScriptedPrompt {
    fn code(&mut self) -> Result<String> {
        self.code_calls += 1;
        Ok(self.code.clone())
    }

    fn password(&mut self) -> Result<String> {
        self.password_calls += 1;
        self.password.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no password available").into()
        })
    }
}
