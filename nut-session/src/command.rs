//! Request lines sent to upsd

use std::fmt;

/// Shape of the reply a command expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// A single line such as `OK` or `VAR ups1 battery.charge "100"`
    Line,
    /// A `BEGIN LIST` ... `END LIST` block
    List,
}

/// A request: verb plus ordered arguments
///
/// Built once per call and never mutated afterwards. The verbs upsd knows
/// have their own constructors; [`Command::new`] and [`Command::arg`] cover
/// anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    args: Vec<String>,
}

impl Command {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Reply shape for this command; every `LIST` verb answers with a list block
    pub fn expect(&self) -> Expect {
        if self.verb == "LIST" {
            Expect::List
        } else {
            Expect::Line
        }
    }

    /// Whether the arguments must be kept out of logs and error messages
    pub fn is_sensitive(&self) -> bool {
        self.verb == "PASSWORD"
    }

    pub fn username(username: &str) -> Self {
        Self::new("USERNAME").arg(username)
    }

    pub fn password(password: &str) -> Self {
        Self::new("PASSWORD").arg(password)
    }

    pub fn logout() -> Self {
        Self::new("LOGOUT")
    }

    pub fn list_ups() -> Self {
        Self::new("LIST").arg("UPS")
    }

    pub fn list_var(ups: &str) -> Self {
        Self::new("LIST").arg("VAR").arg(ups)
    }

    pub fn list_rw(ups: &str) -> Self {
        Self::new("LIST").arg("RW").arg(ups)
    }

    pub fn list_cmd(ups: &str) -> Self {
        Self::new("LIST").arg("CMD").arg(ups)
    }

    pub fn list_enum(ups: &str, var: &str) -> Self {
        Self::new("LIST").arg("ENUM").arg(ups).arg(var)
    }

    pub fn list_client(ups: &str) -> Self {
        Self::new("LIST").arg("CLIENT").arg(ups)
    }

    pub fn get_var(ups: &str, var: &str) -> Self {
        Self::new("GET").arg("VAR").arg(ups).arg(var)
    }

    pub fn get_type(ups: &str, var: &str) -> Self {
        Self::new("GET").arg("TYPE").arg(ups).arg(var)
    }

    pub fn get_desc(ups: &str, var: &str) -> Self {
        Self::new("GET").arg("DESC").arg(ups).arg(var)
    }

    pub fn get_upsdesc(ups: &str) -> Self {
        Self::new("GET").arg("UPSDESC").arg(ups)
    }

    pub fn get_cmddesc(ups: &str, cmd: &str) -> Self {
        Self::new("GET").arg("CMDDESC").arg(ups).arg(cmd)
    }

    pub fn get_numlogins(ups: &str) -> Self {
        Self::new("GET").arg("NUMLOGINS").arg(ups)
    }

    pub fn set_var(ups: &str, var: &str, value: &str) -> Self {
        Self::new("SET").arg("VAR").arg(ups).arg(var).arg(value)
    }

    pub fn instcmd(ups: &str, cmd: &str, param: Option<&str>) -> Self {
        let command = Self::new("INSTCMD").arg(ups).arg(cmd);
        match param {
            Some(param) => command.arg(param),
            None => command,
        }
    }

    pub fn ver() -> Self {
        Self::new("VER")
    }

    pub fn netver() -> Self {
        Self::new("NETVER")
    }
}

/// Renders the request for logs; password arguments are masked
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.verb)?;
        for arg in &self.args {
            if self.is_sensitive() {
                f.write_str(" ***")?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}
