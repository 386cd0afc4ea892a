//! NUT client
//!
//! [`NutClient`] is the public entry point. It can be shared between tasks
//! (wrap it in an `Arc`); operations are serialized on one connection so
//! replies are never interleaved.

use crate::builder::ClientConfig;
use crate::retry::{Request, RetrySupervisor};
use crate::session::Session;
use nut_core::{Client, Device, InstantCommand, NutError, NutResult, Variable, VariableType};
use nut_session::response::strip_prefix;
use nut_session::{
    Command, CommandChannel, ConnectionManager, ConnectionState, Credentials, ListReply, Response,
};
use nut_transport::{TcpTransport, TransportLayer};
use tokio::sync::{Mutex, MutexGuard};

/// Client for a UPS monitoring daemon
#[derive(Debug)]
pub struct NutClient<T: TransportLayer = TcpTransport> {
    session: Mutex<Session<T>>,
    supervisor: RetrySupervisor,
    persistent: bool,
}

impl NutClient<TcpTransport> {
    /// Create a TCP client; the connection is opened lazily
    pub fn new(config: ClientConfig) -> Self {
        let transport = TcpTransport::new(config.tcp_settings());
        Self::with_transport(transport, config)
    }
}

impl<T: TransportLayer> NutClient<T> {
    /// Create a client over a custom transport
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        let channel = CommandChannel::new(transport, config.command_timeout)
            .with_max_line_length(config.max_line_length);
        let manager = ConnectionManager::new(channel);
        Self {
            session: Mutex::new(Session::new(manager, config.credentials)),
            supervisor: RetrySupervisor::new(config.max_retries),
            persistent: config.persistent,
        }
    }

    pub async fn state(&self) -> ConnectionState {
        self.session.lock().await.state()
    }

    /// Lock the session, refusing a shut down client
    async fn session(&self) -> NutResult<MutexGuard<'_, Session<T>>> {
        let session = self.session.lock().await;
        if session.state().is_closed() {
            return Err(NutError::closed());
        }
        Ok(session)
    }

    /// Release the connection after an operation in per-operation mode
    async fn finish<R>(&self, session: &mut Session<T>, result: NutResult<R>) -> NutResult<R> {
        if !self.persistent {
            session.disconnect().await;
        }
        result
    }

    async fn call(&self, request: Request) -> NutResult<Response> {
        let mut session = self.session().await?;
        let result = self.supervisor.run(&mut *session, &request).await;
        self.finish(&mut session, result).await
    }

    async fn line(&self, command: Command) -> NutResult<Vec<String>> {
        self.call(Request::Command(command)).await?.into_fields()
    }

    async fn list(&self, command: Command) -> NutResult<ListReply> {
        let expected: Vec<String> = command.args().to_vec();
        let response = self.call(Request::Command(command)).await?;
        matching_list(&expected, response)
    }

    /// One command inside an operation that already holds the session
    async fn send(&self, session: &mut Session<T>, command: Command) -> NutResult<Response> {
        self.supervisor.run(session, &Request::Command(command)).await
    }

    async fn ok(&self, command: Command) -> NutResult<()> {
        self.call(Request::Command(command)).await?.expect_ok()
    }

    /// Open the connection now instead of on the first operation
    ///
    /// Logs in if credentials were configured.
    pub async fn connect(&self) -> NutResult<()> {
        self.session().await?.connect().await
    }

    /// Log in
    ///
    /// On success the credentials are kept and replayed after every
    /// reconnect. A rejection leaves the client usable for unauthenticated
    /// operations.
    ///
    /// # Errors
    /// - `NutError::Login` if upsd rejects the username or password
    pub async fn login(&self, username: &str, password: &str) -> NutResult<()> {
        self.call(Request::Login(Credentials::new(username, password)))
            .await
            .map(|_| ())
    }

    /// Log out and forget the credentials
    ///
    /// upsd closes the connection after `LOGOUT`; the next operation
    /// reconnects without logging in.
    pub async fn logout(&self) {
        self.session.lock().await.logout().await;
    }

    /// Log out, close the connection and refuse every further operation
    ///
    /// Calling it again does nothing.
    pub async fn shutdown(&self) {
        self.session.lock().await.shutdown().await;
    }

    /// List devices (`LIST UPS`), in the order upsd reports them
    pub async fn list_devices(&self) -> NutResult<Vec<Device>> {
        let list = self.list(Command::list_ups()).await?;
        list.rows
            .iter()
            .map(|row| {
                let rest = strip_prefix(row, &["UPS"])?;
                let (name, description) = field_and_text(row, rest)?;
                Ok(Device::new(name, description))
            })
            .collect()
    }

    /// Description of a device (`GET UPSDESC`)
    pub async fn device_description(&self, device: &str) -> NutResult<String> {
        let fields = self.line(Command::get_upsdesc(device)).await?;
        Ok(strip_prefix(&fields, &["UPSDESC", device])?.join(" "))
    }

    /// All variables of a device with their current values (`LIST VAR`)
    pub async fn list_variables(&self, device: &str) -> NutResult<Vec<Variable>> {
        let list = self.list(Command::list_var(device)).await?;
        parse_variables(&list, "VAR", device)
    }

    /// Writable variables of a device (`LIST RW`)
    pub async fn list_rw_variables(&self, device: &str) -> NutResult<Vec<Variable>> {
        let list = self.list(Command::list_rw(device)).await?;
        parse_variables(&list, "RW", device)
    }

    /// Current value of one variable (`GET VAR`)
    ///
    /// # Errors
    /// - `NutError::NotFound` for an unknown device or variable
    pub async fn get_variable(&self, device: &str, name: &str) -> NutResult<Variable> {
        let fields = self.line(Command::get_var(device, name)).await?;
        let value = strip_prefix(&fields, &["VAR", device, name])?.join(" ");
        Ok(Variable::new(name, value))
    }

    /// Value, description and type of one variable
    ///
    /// Sends `GET VAR`, `GET DESC` and `GET TYPE` back to back on the same
    /// connection.
    pub async fn get_variable_details(&self, device: &str, name: &str) -> NutResult<Variable> {
        let mut session = self.session().await?;
        let result = self.variable_details(&mut session, device, name).await;
        self.finish(&mut session, result).await
    }

    async fn variable_details(
        &self,
        session: &mut Session<T>,
        device: &str,
        name: &str,
    ) -> NutResult<Variable> {
        let fields = self.send(session, Command::get_var(device, name)).await?.into_fields()?;
        let value = strip_prefix(&fields, &["VAR", device, name])?.join(" ");

        let fields = self.send(session, Command::get_desc(device, name)).await?.into_fields()?;
        let description = strip_prefix(&fields, &["DESC", device, name])?.join(" ");

        let fields = self.send(session, Command::get_type(device, name)).await?.into_fields()?;
        let kind = VariableType::from_tokens(strip_prefix(&fields, &["TYPE", device, name])?);

        Ok(Variable::new(name, value)
            .with_description(description)
            .with_kind(kind))
    }

    /// Human readable description of a variable (`GET DESC`)
    pub async fn variable_description(&self, device: &str, name: &str) -> NutResult<String> {
        let fields = self.line(Command::get_desc(device, name)).await?;
        Ok(strip_prefix(&fields, &["DESC", device, name])?.join(" "))
    }

    /// Type and writability of a variable (`GET TYPE`)
    pub async fn variable_type(&self, device: &str, name: &str) -> NutResult<VariableType> {
        let fields = self.line(Command::get_type(device, name)).await?;
        let tokens = strip_prefix(&fields, &["TYPE", device, name])?;
        Ok(VariableType::from_tokens(tokens))
    }

    /// Values an enumerated variable accepts (`LIST ENUM`)
    pub async fn list_enum(&self, device: &str, name: &str) -> NutResult<Vec<String>> {
        let list = self.list(Command::list_enum(device, name)).await?;
        list.rows
            .iter()
            .map(|row| Ok(strip_prefix(row, &["ENUM", device, name])?.join(" ")))
            .collect()
    }

    /// Write a variable (`SET VAR`)
    ///
    /// # Errors
    /// - `NutError::Permission` without a prior login, before anything is sent
    /// - `NutError::Permission` if upsd refuses the write
    pub async fn set_variable(&self, device: &str, name: &str, value: &str) -> NutResult<()> {
        let mut session = self.session().await?;
        if session.credentials().is_none() {
            return Err(NutError::Permission("SET VAR requires a login".to_string()));
        }
        let result = self.send(&mut session, Command::set_var(device, name, value)).await;
        self.finish(&mut session, result).await?.expect_ok()
    }

    /// Instant commands supported by a device (`LIST CMD`)
    pub async fn list_commands(&self, device: &str) -> NutResult<Vec<InstantCommand>> {
        let list = self.list(Command::list_cmd(device)).await?;
        Ok(parse_command_names(&list, device)?
            .into_iter()
            .map(InstantCommand::new)
            .collect())
    }

    /// Instant commands of a device together with their descriptions
    ///
    /// Sends `LIST CMD` followed by one `GET CMDDESC` per command, all on
    /// the same connection.
    pub async fn list_commands_with_descriptions(
        &self,
        device: &str,
    ) -> NutResult<Vec<InstantCommand>> {
        let mut session = self.session().await?;
        let result = self.described_commands(&mut session, device).await;
        self.finish(&mut session, result).await
    }

    async fn described_commands(
        &self,
        session: &mut Session<T>,
        device: &str,
    ) -> NutResult<Vec<InstantCommand>> {
        let command = Command::list_cmd(device);
        let expected = command.args().to_vec();
        let list = matching_list(&expected, self.send(session, command).await?)?;

        let mut commands = Vec::with_capacity(list.rows.len());
        for name in parse_command_names(&list, device)? {
            let fields = self
                .send(session, Command::get_cmddesc(device, &name))
                .await?
                .into_fields()?;
            let description = strip_prefix(&fields, &["CMDDESC", device, name.as_str()])?.join(" ");
            commands.push(InstantCommand::new(name).with_description(description));
        }
        Ok(commands)
    }

    /// Human readable description of an instant command (`GET CMDDESC`)
    pub async fn command_description(&self, device: &str, command: &str) -> NutResult<String> {
        let fields = self.line(Command::get_cmddesc(device, command)).await?;
        Ok(strip_prefix(&fields, &["CMDDESC", device, command])?.join(" "))
    }

    /// Run an instant command (`INSTCMD`), optionally with a parameter
    pub async fn run_command(
        &self,
        device: &str,
        command: &str,
        param: Option<&str>,
    ) -> NutResult<()> {
        self.ok(Command::instcmd(device, command, param)).await
    }

    /// Number of clients logged in to a device (`GET NUMLOGINS`)
    pub async fn num_logins(&self, device: &str) -> NutResult<u32> {
        let fields = self.line(Command::get_numlogins(device)).await?;
        let rest = strip_prefix(&fields, &["NUMLOGINS", device])?;
        rest.first()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| NutError::Protocol(format!("bad NUMLOGINS reply: {}", fields.join(" "))))
    }

    /// Clients attached to a device (`LIST CLIENT`)
    pub async fn list_clients(&self, device: &str) -> NutResult<Vec<Client>> {
        let list = self.list(Command::list_client(device)).await?;
        list.rows
            .iter()
            .map(|row| {
                let rest = strip_prefix(row, &["CLIENT", device])?;
                match rest.first() {
                    Some(address) => Ok(Client {
                        device: device.to_string(),
                        address: address.clone(),
                    }),
                    None => Err(short_row(row)),
                }
            })
            .collect()
    }

    /// Server banner (`VER`)
    pub async fn server_version(&self) -> NutResult<String> {
        Ok(self.line(Command::ver()).await?.join(" "))
    }

    /// Network protocol version (`NETVER`)
    pub async fn protocol_version(&self) -> NutResult<String> {
        Ok(self.line(Command::netver()).await?.join(" "))
    }
}

/// Take the list out of a reply, checking it answers the request
fn matching_list(expected: &[String], response: Response) -> NutResult<ListReply> {
    let list = response.into_list()?;
    if list.subject != expected {
        return Err(NutError::Protocol(format!(
            "list for `{}` answered `{}`",
            expected.join(" "),
            list.subject.join(" ")
        )));
    }
    Ok(list)
}

fn short_row(row: &[String]) -> NutError {
    NutError::Protocol(format!("truncated list row: {}", row.join(" ")))
}

/// Split `<name> <free text>` out of a row remainder
fn field_and_text<'a>(row: &[String], rest: &'a [String]) -> NutResult<(&'a str, String)> {
    match rest.split_first() {
        Some((name, text)) => Ok((name.as_str(), text.join(" "))),
        None => Err(short_row(row)),
    }
}

fn parse_command_names(list: &ListReply, device: &str) -> NutResult<Vec<String>> {
    list.rows
        .iter()
        .map(|row| {
            let rest = strip_prefix(row, &["CMD", device])?;
            rest.first().cloned().ok_or_else(|| short_row(row))
        })
        .collect()
}

fn parse_variables(list: &ListReply, tag: &str, device: &str) -> NutResult<Vec<Variable>> {
    list.rows
        .iter()
        .map(|row| {
            let rest = strip_prefix(row, &[tag, device])?;
            let (name, value) = field_and_text(row, rest)?;
            Ok(Variable::new(name, value))
        })
        .collect()
}
